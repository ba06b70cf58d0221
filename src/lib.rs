pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::database::repository::Repository;
use crate::services::{lifecycle_service::LifecycleService, notification_service::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle_service: LifecycleService,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn Repository>,
        notifier: Arc<dyn Notifier>,
        notify_timeout: Duration,
    ) -> Self {
        let lifecycle_service =
            LifecycleService::new(repository, notifier).with_notify_timeout(notify_timeout);
        Self { lifecycle_service }
    }
}
