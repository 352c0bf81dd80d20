// Report module - log sections, layout and PDF output

mod layout;
mod logo;
mod metrics;
mod pdf;
mod renderer;

pub use layout::{
    layout_report, layout_report_with_logo, DocumentLayout, FontFace, ImagePlacement, PageGeometry,
    PageLayout, RunRole, TextRun,
};
pub use logo::Logo;
pub use metrics::measure_text;
pub use renderer::ReportRenderer;

use std::path::{Path, PathBuf};

/// Drawn when a section has nothing to show
pub const NO_DATA_PLACEHOLDER: &str = "(no data)";

/// Substituted for a log source that could not be read
pub const UNREADABLE_PLACEHOLDER: &str = "(could not read log file)";

/// An RGB color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);
    pub const RED: Rgb = Rgb::new(0xff, 0x00, 0x00);
    pub const TITLE_GRAY: Rgb = Rgb::new(0x33, 0x33, 0x33);

    /// Channels scaled to 0.0..=1.0
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Semantic kind of a log section; decides the heading color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Access,
    Error,
    Vhost,
}

impl SectionKind {
    pub fn color(self) -> Rgb {
        match self {
            SectionKind::Access => Rgb::new(0x31, 0x70, 0x8f),
            SectionKind::Error => Rgb::new(0xa9, 0x44, 0x42),
            SectionKind::Vhost => Rgb::new(0x44, 0xa9, 0x42),
        }
    }
}

/// Text read from a log source, or the marker for an unreadable one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionContent {
    Text(String),
    Unavailable,
}

impl SectionContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SectionContent::Text(text) => Some(text),
            SectionContent::Unavailable => None,
        }
    }
}

/// One titled block of log text inside a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSection {
    pub title: String,
    pub source_path: PathBuf,
    pub kind: SectionKind,
    pub content: SectionContent,
}

impl LogSection {
    pub fn new(
        title: impl Into<String>,
        source_path: impl Into<PathBuf>,
        kind: SectionKind,
        content: SectionContent,
    ) -> Self {
        Self {
            title: title.into(),
            source_path: source_path.into(),
            kind,
            content,
        }
    }

    /// Log lines of readable, non-blank content. Empty otherwise.
    pub fn lines(&self) -> Vec<&str> {
        match self.content.as_text() {
            Some(text) if !text.trim().is_empty() => text.trim_end().lines().collect(),
            _ => Vec::new(),
        }
    }

    /// Lines as drawn in the report, placeholders included
    pub fn display_lines(&self) -> Vec<&str> {
        match &self.content {
            SectionContent::Unavailable => vec![UNREADABLE_PLACEHOLDER],
            SectionContent::Text(_) => {
                let lines = self.lines();
                if lines.is_empty() {
                    vec![NO_DATA_PLACEHOLDER]
                } else {
                    lines
                }
            }
        }
    }
}

/// True if the line mentions "error" in any letter case
pub fn is_error_line(line: &str) -> bool {
    line.to_lowercase().contains("error")
}

/// Line statistics shown at the top of the combined report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSummary {
    pub total_lines: usize,
    pub error_lines: usize,
}

impl ReportSummary {
    pub fn from_sections(sections: &[LogSection]) -> Self {
        sections
            .iter()
            .flat_map(|section| section.lines())
            .fold(Self::default(), |mut summary, line| {
                summary.total_lines += 1;
                if is_error_line(line) {
                    summary.error_lines += 1;
                }
                summary
            })
    }
}

/// Layout flavour of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportVariant {
    /// Summary block, sections separated by vertical space
    Combined,
    /// No summary, each section after the first starts a new page
    PerService,
}

/// One document to render
#[derive(Debug, Clone)]
pub struct ReportJob {
    pub identifier: String,
    pub title: String,
    pub variant: ReportVariant,
    pub sections: Vec<LogSection>,
    pub output_path: PathBuf,
}

/// A rendered document ready to be mailed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub path: PathBuf,
}

impl Attachment {
    pub fn from_path(path: &Path) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.pdf".to_string());
        Self {
            filename,
            path: path.to_path_buf(),
        }
    }
}
