use super::Schedule;
use crate::error::ReportError;
use crate::pipeline::{Pipeline, RunReport};
use chrono::Local;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Driver state. A trigger moves Idle to Running; finishing a run, successful
/// or not, moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
}

/// Result of one trigger
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The pipeline ran to the end; the report says whether mail went out
    Completed(RunReport),
    /// The pipeline could not run
    Failed(ReportError),
    /// A run was already active
    Skipped,
}

/// Runs the pipeline on triggers and schedule ticks, never two at once
#[derive(Debug, Clone)]
pub struct Driver {
    pipeline: Arc<Pipeline>,
    state: Arc<Mutex<DriverState>>,
}

/// Puts the driver back to Idle when a run ends, even if the run future is dropped
struct RunningGuard<'a> {
    state: &'a Mutex<DriverState>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = DriverState::Idle;
    }
}

impl Driver {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            state: Arc::new(Mutex::new(DriverState::Idle)),
        }
    }

    pub fn state(&self) -> DriverState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_start(&self) -> Option<RunningGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            DriverState::Running => None,
            DriverState::Idle => {
                *state = DriverState::Running;
                Some(RunningGuard { state: &self.state })
            }
        }
    }

    /// Run the pipeline now unless a run is already active.
    ///
    /// Overlapping triggers are skipped and logged, never queued.
    pub async fn trigger(&self) -> TriggerOutcome {
        let Some(_guard) = self.try_start() else {
            tracing::warn!("Run already in progress, skipping trigger");
            return TriggerOutcome::Skipped;
        };

        match self.pipeline.run(Local::now()).await {
            Ok(report) => {
                if report.is_success() {
                    tracing::info!("Run for {} finished", report.date);
                } else {
                    tracing::error!(
                        "Run for {} finished without sending mail ({:?})",
                        report.date,
                        report.delivery
                    );
                }
                TriggerOutcome::Completed(report)
            }
            Err(e) => {
                tracing::error!("Run failed: {}", e);
                TriggerOutcome::Failed(e)
            }
        }
    }

    /// Drive the pipeline on `schedule` until it is exhausted or `shutdown`
    /// resolves.
    ///
    /// Shutdown is only observed while idle; a run in flight completes first.
    pub async fn run<F>(&self, schedule: Schedule, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut last_start = None;

        tracing::info!("Scheduler started ({})", schedule);

        loop {
            let Some(delay) = schedule.next_delay(Local::now(), last_start) else {
                tracing::info!("Schedule finished");
                break;
            };

            if !delay.is_zero() {
                tracing::debug!("Next run in {}s", delay.as_secs());
            }

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            last_start = Some(Local::now());
            self.trigger().await;
        }
    }
}
