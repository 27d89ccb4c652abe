use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{
        carts::CartService,
        notifications::{DbNotificationSink, NotificationSink},
        orders::OrderService,
    },
};

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifications: Arc<dyn NotificationSink>,
}

impl ServiceFactory {
    /// Notifications default to the `notifications` table.
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        let notifications = Arc::new(DbNotificationSink::new(db.clone()));
        Self {
            db,
            event_sender: Arc::new(event_sender),
            notifications,
        }
    }

    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = sink;
        self
    }

    pub fn cart_service(&self) -> CartService {
        CartService::new(self.db.clone(), self.event_sender.clone())
    }

    pub fn order_service(&self, config: &AppConfig) -> OrderService {
        OrderService::new(
            self.db.clone(),
            self.event_sender.clone(),
            self.notifications.clone(),
        )
        .with_page_sizes(config.default_page_size, config.max_page_size)
    }
}
