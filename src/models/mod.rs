pub mod application;
pub mod history_entry;
pub mod offer;
pub mod status;
