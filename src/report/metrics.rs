// Glyph widths for the standard Type 1 fonts used in reports.
// Widths are in 1/1000 of the font size, indexed from ' ' (0x20) to '~' (0x7E).

use super::layout::FontFace;

const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const COURIER_WIDTH: u16 = 600;

fn char_width(face: FontFace, ch: char) -> u16 {
    let table = match face {
        FontFace::Courier => return COURIER_WIDTH,
        FontFace::Helvetica => &HELVETICA,
        FontFace::HelveticaBold => &HELVETICA_BOLD,
    };
    match ch as u32 {
        code @ 0x20..=0x7E => table[(code - 0x20) as usize],
        // Drawn as '?' by the PDF backend
        _ => table[('?' as u32 - 0x20) as usize],
    }
}

/// Width of `text` in points
pub fn measure_text(text: &str, face: FontFace, size: f64) -> f64 {
    let units: u32 = text.chars().map(|ch| char_width(face, ch) as u32).sum();
    units as f64 / 1000.0 * size
}

/// Number of monospace characters that fit in `width` points
pub fn monospace_capacity(width: f64, size: f64) -> usize {
    let advance = COURIER_WIDTH as f64 * size / 1000.0;
    ((width / advance + 1e-9).floor() as usize).max(1)
}
