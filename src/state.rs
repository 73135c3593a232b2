use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::services::notification_service::{DbNotificationSink, NotificationSink};

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub notifier: Arc<dyn NotificationSink>,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, auth: AuthSettings) -> Self {
        let notifier = Arc::new(DbNotificationSink::new(orm.clone()));
        Self {
            orm,
            notifier,
            auth,
        }
    }

    /// Swap the sink the order workflow notifies through.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }
}
