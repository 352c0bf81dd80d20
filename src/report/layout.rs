// Layout - turns a report job into positioned, colored text runs per page

use super::logo::Logo;
use super::metrics::{measure_text, monospace_capacity};
use super::{is_error_line, ReportJob, ReportSummary, ReportVariant, Rgb};
use std::path::PathBuf;

const TITLE_SIZE: f64 = 16.0;
const TIMESTAMP_SIZE: f64 = 10.0;
const SUMMARY_HEADING_SIZE: f64 = 12.0;
const SUMMARY_SIZE: f64 = 10.0;
const HEADING_SIZE: f64 = 12.0;
const BODY_SIZE: f64 = 9.0;
const LINE_FACTOR: f64 = 1.2;
const BODY_LINE_GAP: f64 = 1.0;
const HEADING_INDENT: f64 = 5.0;
const LOGO_BOX: f64 = 100.0;
const LOGO_GAP: f64 = TITLE_SIZE;

/// Page size and margin in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl PageGeometry {
    /// A4 landscape with a 40pt margin
    pub const A4_LANDSCAPE: PageGeometry = PageGeometry {
        width: 841.89,
        height: 595.28,
        margin: 40.0,
    };

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

/// Standard PDF fonts used by reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Helvetica,
    HelveticaBold,
    Courier,
}

/// What a text run represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRole {
    Title,
    Timestamp,
    SummaryHeading,
    SummaryLine,
    SectionHeading { section: usize },
    /// A fragment of log line `line` of section `section`
    LogLine {
        section: usize,
        line: usize,
        highlighted: bool,
    },
    Placeholder { section: usize },
}

/// A single line of text at a fixed position. `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font: FontFace,
    pub size: f64,
    pub color: Rgb,
    pub role: RunRole,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageLayout {
    pub runs: Vec<TextRun>,
}

/// An image on the first page. `y` is the bottom edge, sizes are in points.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    pub path: PathBuf,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Every page of a report, ready for the PDF backend
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub title: String,
    pub geometry: PageGeometry,
    pub logo: Option<ImagePlacement>,
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.pages.iter().flat_map(|page| page.runs.iter())
    }

    /// Section headings in drawing order
    pub fn section_headings(&self) -> Vec<&str> {
        self.runs()
            .filter(|run| matches!(run.role, RunRole::SectionHeading { .. }))
            .map(|run| run.text.as_str())
            .collect()
    }

    /// (section, line) pairs of every highlighted log line
    pub fn highlighted_lines(&self) -> Vec<(usize, usize)> {
        let mut lines: Vec<(usize, usize)> = self
            .runs()
            .filter_map(|run| match run.role {
                RunRole::LogLine {
                    section,
                    line,
                    highlighted: true,
                } => Some((section, line)),
                _ => None,
            })
            .collect();
        lines.dedup();
        lines
    }

    /// Reassembled text of each log line of a section, fragments joined
    pub fn section_text(&self, section_index: usize) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut current: Option<usize> = None;
        for run in self.runs() {
            if let RunRole::LogLine { section, line, .. } = run.role {
                if section != section_index {
                    continue;
                }
                if current == Some(line) {
                    if let Some(last) = lines.last_mut() {
                        last.push_str(&run.text);
                    }
                } else {
                    lines.push(run.text.clone());
                    current = Some(line);
                }
            }
        }
        lines
    }

    /// Placeholder drawn in place of a section's lines, if any
    pub fn placeholder(&self, section_index: usize) -> Option<&str> {
        self.runs().find_map(|run| match run.role {
            RunRole::Placeholder { section } if section == section_index => Some(run.text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left(f64),
    Center,
}

#[derive(Debug, Clone, Copy)]
struct LineStyle {
    font: FontFace,
    size: f64,
    gap: f64,
    color: Rgb,
    align: Align,
}

impl LineStyle {
    const fn new(font: FontFace, size: f64, color: Rgb) -> Self {
        Self {
            font,
            size,
            gap: 0.0,
            color,
            align: Align::Left(0.0),
        }
    }

    const fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    const fn indented(mut self, indent: f64) -> Self {
        self.align = Align::Left(indent);
        self
    }

    const fn gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    const fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }
}

const TITLE_STYLE: LineStyle =
    LineStyle::new(FontFace::Helvetica, TITLE_SIZE, Rgb::TITLE_GRAY).centered();
const TIMESTAMP_STYLE: LineStyle =
    LineStyle::new(FontFace::Helvetica, TIMESTAMP_SIZE, Rgb::BLACK).centered();
const SUMMARY_HEADING_STYLE: LineStyle =
    LineStyle::new(FontFace::Helvetica, SUMMARY_HEADING_SIZE, Rgb::BLACK);
const SUMMARY_STYLE: LineStyle = LineStyle::new(FontFace::Helvetica, SUMMARY_SIZE, Rgb::BLACK);
const HEADING_STYLE: LineStyle =
    LineStyle::new(FontFace::HelveticaBold, HEADING_SIZE, Rgb::BLACK).indented(HEADING_INDENT);
const BODY_STYLE: LineStyle =
    LineStyle::new(FontFace::Courier, BODY_SIZE, Rgb::BLACK).gap(BODY_LINE_GAP);

/// Cursor that places runs top-down and breaks pages
struct LayoutBuilder {
    geometry: PageGeometry,
    pages: Vec<PageLayout>,
    current: PageLayout,
    cursor: f64,
    logo: Option<ImagePlacement>,
}

impl LayoutBuilder {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: PageLayout::default(),
            cursor: geometry.height - geometry.margin,
            logo: None,
        }
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.cursor = self.geometry.height - self.geometry.margin;
    }

    fn at_page_top(&self) -> bool {
        self.cursor >= self.geometry.height - self.geometry.margin
    }

    fn space(&mut self, points: f64) {
        self.cursor -= points;
    }

    /// Break the page unless `points` of content still fit above the margin
    fn keep_together(&mut self, points: f64) {
        if self.cursor - points < self.geometry.margin && !self.at_page_top() {
            self.new_page();
        }
    }

    /// Center the logo at the cursor
    fn logo(&mut self, logo: &Logo) {
        let (width, height) = logo.fit(LOGO_BOX);
        self.logo = Some(ImagePlacement {
            path: logo.path.clone(),
            x: (self.geometry.width - width) / 2.0,
            y: self.cursor - height,
            width,
            height,
        });
        self.cursor -= height + LOGO_GAP;
    }

    /// Place one line, starting a new page if it does not fit
    fn line(&mut self, text: &str, style: LineStyle, role: RunRole) {
        let advance = style.size * LINE_FACTOR + style.gap;
        if self.cursor - advance < self.geometry.margin && !self.at_page_top() {
            self.new_page();
        }

        let x = match style.align {
            Align::Center => {
                let width = measure_text(text, style.font, style.size);
                ((self.geometry.width - width) / 2.0).max(self.geometry.margin)
            }
            Align::Left(indent) => self.geometry.margin + indent,
        };

        self.current.runs.push(TextRun {
            text: text.to_string(),
            x,
            y: self.cursor - style.size,
            font: style.font,
            size: style.size,
            color: style.color,
            role,
        });
        self.cursor -= advance;
    }

    fn finish(mut self, title: String) -> DocumentLayout {
        self.pages.push(self.current);
        DocumentLayout {
            title,
            geometry: self.geometry,
            logo: self.logo,
            pages: self.pages,
        }
    }
}

/// Split a line into chunks of at most `width` characters
fn wrap_chars(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

/// Lay out a report job. `generated_at` is printed under the title.
pub fn layout_report(job: &ReportJob, generated_at: &str, geometry: PageGeometry) -> DocumentLayout {
    layout_report_with_logo(job, generated_at, geometry, None)
}

/// Like [`layout_report`], with `logo` centered above the title
pub fn layout_report_with_logo(
    job: &ReportJob,
    generated_at: &str,
    geometry: PageGeometry,
    logo: Option<&Logo>,
) -> DocumentLayout {
    let mut builder = LayoutBuilder::new(geometry);
    let body_capacity = monospace_capacity(geometry.content_width(), BODY_SIZE);

    if let Some(logo) = logo {
        builder.logo(logo);
    }
    builder.line(&job.title, TITLE_STYLE, RunRole::Title);
    builder.line(
        &format!("Generated: {}", generated_at),
        TIMESTAMP_STYLE,
        RunRole::Timestamp,
    );
    builder.space(TITLE_SIZE * 1.5);

    if job.variant == ReportVariant::Combined {
        let summary = ReportSummary::from_sections(&job.sections);
        builder.line("Summary:", SUMMARY_HEADING_STYLE, RunRole::SummaryHeading);
        builder.line(
            &format!("- Total lines: {}", summary.total_lines),
            SUMMARY_STYLE,
            RunRole::SummaryLine,
        );
        builder.line(
            &format!("- Lines containing \"ERROR\": {}", summary.error_lines),
            SUMMARY_STYLE,
            RunRole::SummaryLine,
        );
        builder.space(SUMMARY_SIZE * LINE_FACTOR * 3.0);
    }

    for (index, section) in job.sections.iter().enumerate() {
        if index > 0 {
            match job.variant {
                ReportVariant::PerService => builder.new_page(),
                ReportVariant::Combined => builder.space(BODY_SIZE * LINE_FACTOR * 4.0),
            }
        }

        // a heading never ends a page on its own
        builder.keep_together(
            HEADING_SIZE * LINE_FACTOR + HEADING_SIZE * 0.5 + BODY_SIZE * LINE_FACTOR + BODY_LINE_GAP,
        );
        builder.line(
            &section.title,
            HEADING_STYLE.color(section.kind.color()),
            RunRole::SectionHeading { section: index },
        );
        builder.space(HEADING_SIZE * 0.5);

        let lines = section.lines();
        if lines.is_empty() {
            builder.line(
                section.display_lines()[0],
                BODY_STYLE,
                RunRole::Placeholder { section: index },
            );
            continue;
        }

        for (line_index, line) in lines.iter().enumerate() {
            let highlighted = is_error_line(line);
            let style = if highlighted {
                BODY_STYLE.color(Rgb::RED)
            } else {
                BODY_STYLE
            };
            let role = RunRole::LogLine {
                section: index,
                line: line_index,
                highlighted,
            };
            for fragment in wrap_chars(line, body_capacity) {
                builder.line(&fragment, style, role);
            }
        }
    }

    builder.finish(job.title.clone())
}
