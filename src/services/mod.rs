pub mod lifecycle_service;
pub mod notification_service;
