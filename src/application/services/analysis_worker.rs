use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

use super::{AnalysisService, RunOptions};
use crate::domain::JobId;

#[derive(Debug)]
pub struct AnalysisMessage {
    pub job_id: JobId,
    pub options: RunOptions,
}

/// Supervises background runs. Failures and panics stop at this boundary.
pub struct AnalysisWorker {
    receiver: mpsc::Receiver<AnalysisMessage>,
    analysis_service: Arc<AnalysisService>,
}

impl AnalysisWorker {
    pub fn new(
        receiver: mpsc::Receiver<AnalysisMessage>,
        analysis_service: Arc<AnalysisService>,
    ) -> Self {
        Self {
            receiver,
            analysis_service,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Analysis worker started");
        let mut runs: JoinSet<JobId> = JoinSet::new();
        // Jobs with a run in flight, each holding at most one follow-up run.
        let mut active: HashMap<JobId, Option<RunOptions>> = HashMap::new();

        loop {
            tokio::select! {
                msg = self.receiver.recv() => {
                    let Some(msg) = msg else { break };
                    if let Some(queued) = active.get_mut(&msg.job_id) {
                        tracing::debug!(
                            job_id = %msg.job_id.as_uuid(),
                            "Job already has an active run, queueing follow-up"
                        );
                        *queued = Some(msg.options);
                        continue;
                    }
                    active.insert(msg.job_id, None);
                    self.spawn_run(&mut runs, msg);
                }
                Some(joined) = runs.join_next(), if !runs.is_empty() => {
                    self.on_run_finished(&mut runs, &mut active, joined);
                }
            }
        }

        tracing::info!(in_flight = runs.len(), "Channel closed, draining analysis runs");
        while let Some(joined) = runs.join_next().await {
            self.on_run_finished(&mut runs, &mut active, joined);
        }
        tracing::info!("Analysis worker stopped");
    }

    fn spawn_run(&self, runs: &mut JoinSet<JobId>, msg: AnalysisMessage) {
        let service = Arc::clone(&self.analysis_service);
        let job_id = msg.job_id;
        let span = tracing::info_span!("analysis_job", job_id = %job_id.as_uuid());

        runs.spawn(
            async move {
                let outcome = AssertUnwindSafe(service.run(job_id, msg.options))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(status)) => tracing::info!(status = %status, "Analysis run ended"),
                    Ok(Err(e)) => tracing::error!(error = %e, "Analysis run failed"),
                    Err(_) => tracing::error!("Analysis run panicked"),
                }
                job_id
            }
            .instrument(span),
        );
    }

    /// Starts the queued follow-up for the finished job, if one arrived meanwhile.
    /// A follow-up for a job that is no longer processing is rejected by `run`.
    fn on_run_finished(
        &self,
        runs: &mut JoinSet<JobId>,
        active: &mut HashMap<JobId, Option<RunOptions>>,
        joined: Result<JobId, tokio::task::JoinError>,
    ) {
        let job_id = match joined {
            Ok(job_id) => job_id,
            Err(e) => {
                tracing::error!(error = %e, "Analysis task aborted");
                return;
            }
        };

        if let Some(options) = active.remove(&job_id).flatten() {
            tracing::info!(job_id = %job_id.as_uuid(), "Starting queued follow-up run");
            active.insert(job_id, None);
            self.spawn_run(runs, AnalysisMessage { job_id, options });
        }
    }
}
