// Pipeline module - one run: plan jobs, render them, mail the results, clean up

mod assembler;

pub use assembler::{
    combined_job, output_path_for, plan_jobs, service_job, Assembler, JobSources, JobSpec,
    SourceSpec, COMBINED_IDENTIFIER,
};

use crate::config::ReportSettings;
use crate::error::Result;
use crate::notify::{body_for, subject_for, Notifier};
use crate::report::Attachment;
use chrono::{DateTime, Local, NaiveDate};

/// What happened to the mail of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Mail sent and report files removed
    Sent,
    /// Nothing was rendered, so nothing was sent
    Skipped,
    /// Sending failed; report files are kept on disk
    Failed(String),
}

/// A job that was left out of the mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub identifier: String,
    pub error: String,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub date: NaiveDate,
    pub attachments: Vec<Attachment>,
    pub failures: Vec<JobFailure>,
    pub delivery: Delivery,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.delivery == Delivery::Sent
    }
}

/// Assembler plus notifier, driven once per trigger
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: ReportSettings,
    assembler: Assembler,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(settings: ReportSettings, notifier: Notifier) -> Self {
        let assembler = Assembler::from_settings(&settings);
        Self {
            settings,
            assembler,
            notifier,
        }
    }

    /// Execute one run.
    ///
    /// Every job is isolated: a job that fails is logged and left out, the
    /// others still go out. Only a missing output directory that cannot be
    /// created fails the whole run.
    ///
    /// # Arguments
    /// * `now` - Run time; its date names the files and the mail
    pub async fn run(&self, now: DateTime<Local>) -> Result<RunReport> {
        let date = now.date_naive();
        tokio::fs::create_dir_all(&self.settings.output_dir).await?;

        let jobs = plan_jobs(&self.settings, date);
        tracing::info!(
            "Starting {} run for {} ({} job(s))",
            self.settings.mode,
            date,
            jobs.len()
        );

        let mut attachments = Vec::new();
        let mut failures = Vec::new();

        for job in &jobs {
            tracing::info!("Building report for {}", job.identifier);
            match self.assembler.assemble(job, now).await {
                Ok(attachment) => {
                    tracing::info!("Report ready: {}", attachment.path.display());
                    attachments.push(attachment);
                }
                Err(e) => {
                    tracing::error!("Report for {} failed: {}", job.identifier, e);
                    failures.push(JobFailure {
                        identifier: job.identifier.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let delivery = if attachments.is_empty() {
            tracing::warn!("No report was produced, skipping mail");
            Delivery::Skipped
        } else {
            let subject = subject_for(date);
            let body = body_for(date, attachments.len());
            match self.notifier.send(&attachments, &subject, &body).await {
                Ok(()) => {
                    remove_attachments(&attachments).await;
                    Delivery::Sent
                }
                Err(e) => {
                    let kept: Vec<String> = attachments
                        .iter()
                        .map(|a| a.path.display().to_string())
                        .collect();
                    tracing::error!("{}; reports kept at {}", e, kept.join(", "));
                    Delivery::Failed(e.to_string())
                }
            }
        };

        Ok(RunReport {
            date,
            attachments,
            failures,
            delivery,
        })
    }
}

async fn remove_attachments(attachments: &[Attachment]) {
    for attachment in attachments {
        if let Err(e) = tokio::fs::remove_file(&attachment.path).await {
            tracing::warn!("Failed to remove {}: {}", attachment.path.display(), e);
        }
    }
    tracing::info!("Removed {} temporary report(s)", attachments.len());
}
