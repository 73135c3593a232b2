use std::{future::Future, time::Duration};

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{error::AppResult, models::DailyStats, services::stats_service};

/// Run `job` every `every`, starting immediately. Errors are logged and the
/// loop keeps going; the task ends only when aborted.
pub fn spawn_recurring<F, Fut>(name: &'static str, every: Duration, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(job = name, every_secs = every.as_secs(), "scheduled job started");
        loop {
            interval.tick().await;
            if let Err(err) = job().await {
                tracing::warn!(job = name, error = %err, "scheduled job failed");
            }
        }
    })
}

/// Snapshot today's (UTC) totals into `daily_stats`.
pub async fn run_daily_stats_job(orm: &DatabaseConnection) -> AppResult<DailyStats> {
    let today = Utc::now().date_naive();
    let saved = stats_service::save_daily_stats(orm, today).await?;
    tracing::info!(date = %saved.date, orders = saved.total_orders, "daily stats saved");
    Ok(saved)
}

pub fn spawn_daily_stats_job(orm: DatabaseConnection, every: Duration) -> JoinHandle<()> {
    spawn_recurring("daily_stats", every, move || {
        let orm = orm.clone();
        async move { run_daily_stats_job(&orm).await.map(|_| ()) }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn failing_runs_do_not_stop_the_loop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let handle = spawn_recurring("test", Duration::from_millis(5), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::BadRequest("boom".into()))
            }
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.abort();
        assert!(runs.load(Ordering::SeqCst) >= 2);
    }
}
