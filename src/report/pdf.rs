// PDF backend - writes a DocumentLayout with the standard Type 1 fonts

use super::layout::{DocumentLayout, FontFace, ImagePlacement};
use crate::error::{ReportError, Result};
use printpdf::image_crate::{self, DynamicImage};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference,
    Rgb as PdfRgb,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const LAYER_NAME: &str = "Report";

fn pt_to_mm(points: f64) -> Mm {
    Mm((points * 25.4 / 72.0) as f32)
}

fn builtin(face: FontFace) -> BuiltinFont {
    match face {
        FontFace::Helvetica => BuiltinFont::Helvetica,
        FontFace::HelveticaBold => BuiltinFont::HelveticaBold,
        FontFace::Courier => BuiltinFont::Courier,
    }
}

/// Builtin fonts only cover printable ASCII reliably
fn printable(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\t' => ' ',
            ' '..='~' => ch,
            _ => '?',
        })
        .collect()
}

/// Draw the logo at its placement. One image pixel is one point at 72 dpi.
fn draw_logo(layer: &PdfLayerReference, logo: &ImagePlacement, title: &str) -> Result<()> {
    let decoded = image_crate::open(&logo.path).map_err(|e| {
        ReportError::RenderFailure(
            title.to_string(),
            format!("Failed to decode logo {}: {}", logo.path.display(), e),
        )
    })?;
    // alpha channels are not embedded
    let decoded = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let (width_px, height_px) = (decoded.width() as f64, decoded.height() as f64);

    Image::from_dynamic_image(&decoded).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(pt_to_mm(logo.x)),
            translate_y: Some(pt_to_mm(logo.y)),
            scale_x: Some((logo.width / width_px) as f32),
            scale_y: Some((logo.height / height_px) as f32),
            dpi: Some(72.0),
            ..Default::default()
        },
    );
    Ok(())
}

/// Path the document is streamed to before it is moved into place
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

/// Write the layout as a PDF at `path`.
///
/// The file only appears at `path` once it has been written completely; on
/// failure nothing is left behind.
pub fn write_pdf(layout: &DocumentLayout, path: &Path) -> Result<()> {
    let partial = partial_path(path);
    let result = write_to(layout, &partial).and_then(|_| {
        std::fs::rename(&partial, path).map_err(|e| {
            ReportError::OutputError(format!("Failed to move {} into place: {}", path.display(), e))
        })
    });

    if result.is_err() && partial.exists() {
        if let Err(e) = std::fs::remove_file(&partial) {
            tracing::warn!("Failed to remove partial report {}: {}", partial.display(), e);
        }
    }

    result
}

fn write_to(layout: &DocumentLayout, path: &Path) -> Result<()> {
    let render_err = |e| ReportError::RenderFailure(layout.title.clone(), format!("{:?}", e));

    let width = pt_to_mm(layout.geometry.width);
    let height = pt_to_mm(layout.geometry.height);
    let (doc, first_page, first_layer) = PdfDocument::new(&layout.title, width, height, LAYER_NAME);

    let mut fonts: HashMap<FontFace, IndirectFontRef> = HashMap::new();
    for face in [FontFace::Helvetica, FontFace::HelveticaBold, FontFace::Courier] {
        let font = doc.add_builtin_font(builtin(face)).map_err(render_err)?;
        fonts.insert(face, font);
    }

    for (index, page) in layout.pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, LAYER_NAME)
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        if index == 0 {
            if let Some(logo) = &layout.logo {
                draw_logo(&layer, logo, &layout.title)?;
            }
        }

        for run in &page.runs {
            let Some(font) = fonts.get(&run.font) else {
                continue;
            };
            let (r, g, b) = run.color.to_unit();
            layer.set_fill_color(Color::Rgb(PdfRgb::new(r, g, b, None)));
            layer.use_text(
                printable(&run.text),
                run.size as f32,
                pt_to_mm(run.x),
                pt_to_mm(run.y),
                font,
            );
        }
    }

    let file = File::create(path).map_err(|e| {
        ReportError::OutputError(format!("Failed to create {}: {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(render_err)?;
    writer.flush().map_err(|e| {
        ReportError::OutputError(format!("Failed to write {}: {}", path.display(), e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{
        layout_report, LogSection, PageGeometry, ReportJob, ReportVariant, SectionContent,
        SectionKind,
    };
    use tempfile::TempDir;

    fn sample_layout() -> DocumentLayout {
        let job = ReportJob {
            identifier: "combined".to_string(),
            title: "Apache Log Report".to_string(),
            variant: ReportVariant::Combined,
            sections: vec![LogSection::new(
                "Access Log",
                "/var/log/apache2/access.log",
                SectionKind::Access,
                SectionContent::Text("GET / 200\nGET /x 500 Error\n".to_string()),
            )],
            output_path: PathBuf::from("unused.pdf"),
        };
        layout_report(&job, "2024-05-01 06:00:00", PageGeometry::default())
    }

    #[test]
    fn test_printable_replaces_non_ascii() {
        assert_eq!(printable("a\tb"), "a b");
        assert_eq!(printable("GET /ä"), "GET /?");
        assert_eq!(printable("plain"), "plain");
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/apache-combined-2024-05-01.pdf")),
            PathBuf::from("/tmp/apache-combined-2024-05-01.pdf.partial")
        );
    }

    #[test]
    fn test_write_pdf_creates_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.pdf");

        write_pdf(&sample_layout(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_write_pdf_embeds_logo() {
        let temp_dir = TempDir::new().unwrap();
        let logo_path = temp_dir.path().join("logo.png");
        image_crate::RgbImage::new(50, 50).save(&logo_path).unwrap();
        let path = temp_dir.path().join("report.pdf");

        let mut layout = sample_layout();
        let plain_path = temp_dir.path().join("plain.pdf");
        write_pdf(&layout, &plain_path).unwrap();
        layout.logo = Some(ImagePlacement {
            path: logo_path,
            x: 370.0,
            y: 455.0,
            width: 100.0,
            height: 100.0,
        });

        write_pdf(&layout, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > std::fs::read(&plain_path).unwrap().len());
    }

    #[test]
    fn test_vanished_logo_fails_without_output() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.pdf");
        let mut layout = sample_layout();
        layout.logo = Some(ImagePlacement {
            path: temp_dir.path().join("gone.png"),
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        });

        let result = write_pdf(&layout, &path);

        assert!(matches!(result, Err(ReportError::RenderFailure(_, _))));
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_write_pdf_into_missing_directory_fails_cleanly() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("report.pdf");

        let result = write_pdf(&sample_layout(), &path);

        assert!(matches!(result, Err(ReportError::OutputError(_))));
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }
}
