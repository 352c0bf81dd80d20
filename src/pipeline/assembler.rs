use crate::config::{ReportMode, ReportSettings};
use crate::error::{ReportError, Result};
use crate::logs::{compose, parse_combined, read_log, Marker, ReadOptions};
use crate::report::{
    Attachment, LogSection, Logo, ReportJob, ReportRenderer, ReportVariant, SectionContent,
    SectionKind,
};
use chrono::{DateTime, Local, NaiveDate};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Identifier of the single combined report
pub const COMBINED_IDENTIFIER: &str = "combined";

/// One log file feeding one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub title: String,
    pub path: PathBuf,
    pub kind: SectionKind,
}

/// Where the sections of a job come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSources {
    /// Access, error and vhost files joined into a marker blob and split again
    Combined {
        access: PathBuf,
        error: PathBuf,
        vhost: PathBuf,
    },
    /// A combined blob prepared elsewhere
    Blob(PathBuf),
    /// Independent files, one section each
    Files(Vec<SourceSpec>),
}

/// A planned report: what to read and where to write it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub identifier: String,
    pub title: String,
    pub variant: ReportVariant,
    pub sources: JobSources,
    pub output_path: PathBuf,
}

/// Plan every job of a run for `date`.
///
/// Output paths are unique within the plan and never name a file that
/// already exists.
pub fn plan_jobs(settings: &ReportSettings, date: NaiveDate) -> Vec<JobSpec> {
    let mut taken = HashSet::new();
    let mut output_path = |identifier: &str| {
        let path = output_path_for(
            &settings.output_dir,
            &settings.file_prefix,
            identifier,
            date,
            &taken,
        );
        taken.insert(path.clone());
        path
    };

    match settings.mode {
        ReportMode::Combined => {
            let path = output_path(COMBINED_IDENTIFIER);
            vec![combined_job(settings, path)]
        }
        ReportMode::PerService => settings
            .services
            .iter()
            .map(|service| {
                let path = output_path(service);
                service_job(settings, service, path)
            })
            .collect(),
    }
}

/// Combined report over the configured access, error and vhost logs
pub fn combined_job(settings: &ReportSettings, output_path: PathBuf) -> JobSpec {
    JobSpec {
        identifier: COMBINED_IDENTIFIER.to_string(),
        title: settings.title.clone(),
        variant: ReportVariant::Combined,
        sources: JobSources::Combined {
            access: settings.access_log_path(),
            error: settings.error_log_path(),
            vhost: settings.vhost_log_path(),
        },
        output_path,
    }
}

/// Report for one service: its access log, then its error log
pub fn service_job(settings: &ReportSettings, service: &str, output_path: PathBuf) -> JobSpec {
    let upper = service.to_uppercase();
    let (access, error) = settings.service_log_paths(service);

    JobSpec {
        identifier: service.to_string(),
        title: format!("Apache Logs - {}", upper),
        variant: ReportVariant::PerService,
        sources: JobSources::Files(vec![
            SourceSpec {
                title: format!("{} - Access Log", upper),
                path: access,
                kind: SectionKind::Access,
            },
            SourceSpec {
                title: format!("{} - Error Log", upper),
                path: error,
                kind: SectionKind::Error,
            },
        ]),
        output_path,
    }
}

/// `<dir>/<prefix>-<identifier>-<YYYY-MM-DD>.pdf`, suffixed with `-2`, `-3`, ...
/// while that name is on disk or already `taken`
pub fn output_path_for(
    dir: &Path,
    prefix: &str,
    identifier: &str,
    date: NaiveDate,
    taken: &HashSet<PathBuf>,
) -> PathBuf {
    let stem = format!("{}-{}-{}", prefix, identifier, date.format("%Y-%m-%d"));
    let mut candidate = dir.join(format!("{}.pdf", stem));
    let mut n = 2;
    while candidate.exists() || taken.contains(&candidate) {
        candidate = dir.join(format!("{}-{}.pdf", stem, n));
        n += 1;
    }
    candidate
}

/// Gathers the sections of a job and renders it
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    renderer: ReportRenderer,
    read_options: ReadOptions,
}

impl Assembler {
    pub fn new(renderer: ReportRenderer, read_options: ReadOptions) -> Self {
        Self {
            renderer,
            read_options,
        }
    }

    pub fn from_settings(settings: &ReportSettings) -> Self {
        Self::new(
            ReportRenderer::new().with_logo(settings.logo.as_deref().and_then(Logo::load)),
            ReadOptions {
                tail_lines: settings.tail_lines,
            },
        )
    }

    /// Read the sources of a job into sections.
    ///
    /// Unreadable log files become unavailable sections. Only a prepared blob
    /// that cannot be read fails, since there is nothing to split.
    pub async fn gather(&self, spec: &JobSpec) -> Result<Vec<LogSection>> {
        match &spec.sources {
            JobSources::Combined {
                access,
                error,
                vhost,
            } => {
                let paths = [access, error, vhost];
                let mut contents = Vec::with_capacity(paths.len());
                for path in paths {
                    contents.push(read_log(path, &self.read_options).await);
                }

                let text = |content: &SectionContent| content.as_text().unwrap_or("").to_string();
                let blob = compose(&text(&contents[0]), &text(&contents[1]), &text(&contents[2]));
                let parsed = parse_combined(&blob);

                Ok(Marker::ALL
                    .iter()
                    .zip(paths.iter().zip(contents.iter()))
                    .map(|(&marker, (path, content))| {
                        let section = match content {
                            SectionContent::Unavailable => SectionContent::Unavailable,
                            SectionContent::Text(_) => {
                                SectionContent::Text(parsed.get(marker).to_string())
                            }
                        };
                        LogSection::new(marker.title(), path.as_path(), marker.kind(), section)
                    })
                    .collect())
            }
            JobSources::Blob(path) => {
                // Never tail a blob: the markers would be cut off
                let blob = match read_log(path, &ReadOptions::default()).await {
                    SectionContent::Text(text) => text,
                    SectionContent::Unavailable => {
                        return Err(ReportError::SourceUnavailable {
                            path: path.display().to_string(),
                            reason: "combined blob could not be read".to_string(),
                        })
                    }
                };

                let parsed = parse_combined(&blob);
                if !parsed.missing.is_empty() {
                    tracing::warn!(
                        "{}: missing markers {:?}, those sections are empty",
                        path.display(),
                        parsed.missing
                    );
                }
                if !parsed.in_order {
                    tracing::warn!("{}: markers out of order", path.display());
                }

                Ok(Marker::ALL
                    .iter()
                    .map(|&marker| {
                        LogSection::new(
                            marker.title(),
                            path.as_path(),
                            marker.kind(),
                            SectionContent::Text(parsed.get(marker).to_string()),
                        )
                    })
                    .collect())
            }
            JobSources::Files(sources) => {
                let mut sections = Vec::with_capacity(sources.len());
                for source in sources {
                    let content = read_log(&source.path, &self.read_options).await;
                    sections.push(LogSection::new(
                        source.title.clone(),
                        source.path.clone(),
                        source.kind,
                        content,
                    ));
                }
                Ok(sections)
            }
        }
    }

    /// Gather, render and persist one job
    ///
    /// # Returns
    /// The attachment pointing at the written PDF
    pub async fn assemble(&self, spec: &JobSpec, generated_at: DateTime<Local>) -> Result<Attachment> {
        let sections = self.gather(spec).await?;
        let job = ReportJob {
            identifier: spec.identifier.clone(),
            title: spec.title.clone(),
            variant: spec.variant,
            sections,
            output_path: spec.output_path.clone(),
        };

        self.renderer.render(&job, generated_at).await?;
        Ok(Attachment::from_path(&spec.output_path))
    }
}
