use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{
    domain::TaskSession,
    keywords::{KeywordStore, ReconcileOutcome},
};

/// Registers the periodic memory/store keyword reconciliation and starts the scheduler.
pub async fn configure_reconcile_job(
    cron_spec: &str,
    keywords: Arc<KeywordStore>,
    session: Arc<TaskSession>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let job = Job::new_async(cron_spec, move |_id, _l| {
        let keywords = keywords.clone();
        let session = session.clone();
        Box::pin(async move {
            run_reconcile(&keywords, &session).await;
        })
    })?;
    scheduler.add(job).await?;
    tracing::info!(target: "scheduler", cron = %cron_spec, "reconcile job registered");
    scheduler.start().await?;
    Ok(scheduler)
}

pub async fn run_reconcile(keywords: &KeywordStore, session: &TaskSession) {
    match keywords.reconcile(&session.task()).await {
        Ok(ReconcileOutcome::NothingToCheck | ReconcileOutcome::InSync) => {}
        Ok(outcome) => {
            tracing::info!(target: "scheduler", outcome = ?outcome, "keyword store reconciled");
        }
        Err(err) => {
            tracing::warn!(target: "scheduler", error = %err, "keyword reconcile failed");
        }
    }
}
