use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    dto::notifications::{CreateNotificationRequest, NotificationList, UnreadCount},
    entity::{
        notifications::{ActiveModel as NotificationActive, Column as NotifCol, Entity as Notifications},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub const NOTIFICATION_KINDS: [&str; 4] = ["info", "success", "warning", "error"];

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
}

/// Append-only per-user message log.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> AppResult<Notification>;
}

pub struct DbNotificationSink {
    orm: DatabaseConnection,
}

impl DbNotificationSink {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl NotificationSink for DbNotificationSink {
    async fn notify(&self, notification: NewNotification) -> AppResult<Notification> {
        let now = Utc::now().fixed_offset();
        let model = NotificationActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(notification.user_id),
            title: Set(notification.title),
            message: Set(notification.message),
            kind: Set(notification.kind),
            is_read: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.orm)
        .await?;

        Ok(model.into())
    }
}

pub async fn create_notification(
    state: &AppState,
    user: &AuthUser,
    payload: CreateNotificationRequest,
) -> AppResult<ApiResponse<Notification>> {
    ensure_admin(user)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    let kind = payload.kind.unwrap_or_else(|| "info".to_string());
    if !NOTIFICATION_KINDS.contains(&kind.as_str()) {
        return Err(AppError::BadRequest(format!("unknown notification kind {kind}")));
    }

    if Users::find_by_id(payload.user_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let notification = state
        .notifier
        .notify(NewNotification {
            user_id: payload.user_id,
            title,
            message: payload.message,
            kind,
        })
        .await?;

    Ok(ApiResponse::success(
        "Notification created",
        notification,
        Some(Meta::empty()),
    ))
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Notifications::find()
        .filter(NotifCol::UserId.eq(user.user_id))
        .order_by_desc(NotifCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "OK",
        NotificationList { items },
        Some(meta),
    ))
}

pub async fn unread_count(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UnreadCount>> {
    let unread = Notifications::find()
        .filter(
            Condition::all()
                .add(NotifCol::UserId.eq(user.user_id))
                .add(NotifCol::IsRead.eq(false)),
        )
        .count(&state.orm)
        .await? as i64;

    Ok(ApiResponse::success(
        "OK",
        UnreadCount { unread },
        Some(Meta::empty()),
    ))
}

pub async fn mark_as_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification = Notifications::find_by_id(id).one(&state.orm).await?;
    let notification = match notification {
        Some(n) => n,
        None => return Err(AppError::NotFound),
    };

    if notification.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    if notification.is_read {
        return Ok(ApiResponse::success(
            "Marked as read",
            notification.into(),
            Some(Meta::empty()),
        ));
    }

    let mut active: NotificationActive = notification.into();
    active.is_read = Set(true);
    active.updated_at = Set(Utc::now().fixed_offset());
    let notification = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Marked as read",
        notification.into(),
        Some(Meta::empty()),
    ))
}

pub async fn mark_all_as_read(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Notifications::update_many()
        .col_expr(NotifCol::IsRead, Expr::value(true))
        .col_expr(NotifCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(
            Condition::all()
                .add(NotifCol::UserId.eq(user.user_id))
                .add(NotifCol::IsRead.eq(false)),
        )
        .exec(&state.orm)
        .await?;

    tracing::debug!(user_id = %user.user_id, updated = result.rows_affected, "notifications marked read");

    Ok(ApiResponse::success(
        "All notifications marked as read",
        serde_json::json!({ "updated": result.rows_affected }),
        Some(Meta::empty()),
    ))
}
