use printpdf::image_crate;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A logo image drawn above the title of every report
#[derive(Debug, Clone, PartialEq)]
pub struct Logo {
    pub path: PathBuf,
    pub width_px: u32,
    pub height_px: u32,
}

impl Logo {
    /// Read the image dimensions at `path`.
    ///
    /// A missing or undecodable logo is not an error: a warning is logged and
    /// reports are rendered without one.
    pub fn load(path: &Path) -> Option<Logo> {
        if !path.is_file() {
            warn!("Logo not found at {}, rendering without it", path.display());
            return None;
        }

        match image_crate::image_dimensions(path) {
            Ok((width_px, height_px)) if width_px > 0 && height_px > 0 => Some(Logo {
                path: path.to_path_buf(),
                width_px,
                height_px,
            }),
            Ok(_) => {
                warn!("Logo {} has no pixels, rendering without it", path.display());
                None
            }
            Err(e) => {
                warn!("Failed to read logo {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Size in points when scaled to fit a `side` x `side` box
    pub fn fit(&self, side: f64) -> (f64, f64) {
        let width = self.width_px as f64;
        let height = self.height_px as f64;
        let scale = (side / width).min(side / height);
        (width * scale, height * scale)
    }
}
