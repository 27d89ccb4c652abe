use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::entities::notification;
use crate::errors::ServiceError;

/// Notification about to be delivered to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub kind: String,
}

impl NewNotification {
    pub fn new_order(store_owner: Uuid, order_id: Uuid, store_name: &str) -> Self {
        Self {
            user_id: store_owner,
            order_id: Some(order_id),
            title: "New order".to_string(),
            message: format!("{} received a new order {}", store_name, order_id),
            kind: "order".to_string(),
        }
    }
}

/// Destination for user notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<(), ServiceError>;
}

/// Persists notifications into the `notifications` table as unread.
#[derive(Clone)]
pub struct DbNotificationSink {
    db: Arc<DatabaseConnection>,
}

impl DbNotificationSink {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationSink for DbNotificationSink {
    #[instrument(skip(self, notification), fields(user_id = %notification.user_id))]
    async fn create(&self, notification: NewNotification) -> Result<(), ServiceError> {
        notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(notification.user_id),
            order_id: Set(notification.order_id),
            title: Set(notification.title),
            message: Set(notification.message),
            kind: Set(notification.kind),
            status: Set("unread".to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;
        Ok(())
    }
}

/// Delivers `notification`, logging rather than returning any failure.
pub async fn notify_detached(sink: &dyn NotificationSink, notification: NewNotification) {
    let user_id = notification.user_id;
    if let Err(e) = sink.create(notification).await {
        warn!(%user_id, error = %e, "Failed to create notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn create(&self, _notification: NewNotification) -> Result<(), ServiceError> {
            Err(ServiceError::InternalError("sink offline".into()))
        }
    }

    #[tokio::test]
    async fn detached_delivery_swallows_sink_failures() {
        let notification = NewNotification::new_order(Uuid::new_v4(), Uuid::new_v4(), "Pho 24");
        notify_detached(&FailingSink, notification).await;
    }

    #[test]
    fn new_order_notification_targets_owner() {
        let owner = Uuid::new_v4();
        let order = Uuid::new_v4();
        let n = NewNotification::new_order(owner, order, "Pho 24");
        assert_eq!(n.user_id, owner);
        assert_eq!(n.order_id, Some(order));
        assert_eq!(n.kind, "order");
        assert!(n.message.contains("Pho 24"));
    }
}
