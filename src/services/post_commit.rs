use uuid::Uuid;

use crate::{
    services::{cart_service, notification_service::NewNotification},
    state::AppState,
};

/// Best-effort work queued by a write path and run once its transaction has
/// committed. A failing action is logged and never undoes the commit.
#[derive(Debug, Clone)]
pub enum PostCommit {
    Notify(NewNotification),
    ClearCart { user_id: Uuid },
}

impl PostCommit {
    fn label(&self) -> &'static str {
        match self {
            PostCommit::Notify(_) => "notify",
            PostCommit::ClearCart { .. } => "clear_cart",
        }
    }
}

/// Run each action in order; returns how many of them failed.
pub async fn run_post_commit(state: &AppState, actions: Vec<PostCommit>) -> usize {
    let mut failed = 0;
    for action in actions {
        let label = action.label();
        let result = match action {
            PostCommit::Notify(notification) => {
                state.notifier.notify(notification).await.map(|_| ())
            }
            PostCommit::ClearCart { user_id } => {
                cart_service::clear_cart_for(&state.orm, user_id)
                    .await
                    .map(|_| ())
            }
        };

        if let Err(err) = result {
            failed += 1;
            tracing::warn!(action = label, error = %err, "post-commit action failed");
        }
    }
    failed
}
