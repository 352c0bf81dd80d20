use super::layout::{layout_report_with_logo, DocumentLayout, PageGeometry};
use super::logo::Logo;
use super::pdf::write_pdf;
use super::ReportJob;
use crate::error::{ReportError, Result};
use chrono::{DateTime, Local};

/// Timestamp format printed under the report title
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders report jobs into PDF files
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    geometry: PageGeometry,
    logo: Option<Logo>,
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `logo` above the title of every report
    pub fn with_logo(mut self, logo: Option<Logo>) -> Self {
        self.logo = logo;
        self
    }

    /// Compute the layout without writing anything
    pub fn layout(&self, job: &ReportJob, generated_at: DateTime<Local>) -> DocumentLayout {
        let stamp = generated_at.format(GENERATED_AT_FORMAT).to_string();
        layout_report_with_logo(job, &stamp, self.geometry, self.logo.as_ref())
    }

    /// Render `job` to `job.output_path`.
    ///
    /// PDF construction runs on the blocking pool. The returned layout
    /// describes what was written.
    pub async fn render(
        &self,
        job: &ReportJob,
        generated_at: DateTime<Local>,
    ) -> Result<DocumentLayout> {
        let layout = self.layout(job, generated_at);
        let output_path = job.output_path.clone();
        let to_write = layout.clone();

        tokio::task::spawn_blocking(move || write_pdf(&to_write, &output_path))
            .await
            .map_err(|e| {
                ReportError::RenderFailure(job.identifier.clone(), format!("render task failed: {}", e))
            })??;

        tracing::debug!(
            "Rendered {} ({} pages) to {}",
            job.identifier,
            layout.page_count(),
            job.output_path.display()
        );

        Ok(layout)
    }
}
