//! Combined log blobs.
//!
//! A combined blob carries the access, error and vhost logs one after the
//! other, each introduced by a fixed marker line:
//!
//! ```text
//! === Access Log ===
//! ...
//! === Error Log ===
//! ...
//! === Vhost Log ===
//! ...
//! ```
//!
//! Parsing locates every marker's first occurrence and slices the text between
//! consecutive markers (by offset), trimming surrounding whitespace. A missing
//! marker yields an empty section; markers out of the expected order are still
//! sliced by offset and reported through [`CombinedSections::in_order`].

use crate::report::SectionKind;

/// Section markers of a combined blob, in their expected order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Access,
    Error,
    Vhost,
}

impl Marker {
    pub const ALL: [Marker; 3] = [Marker::Access, Marker::Error, Marker::Vhost];

    pub fn text(self) -> &'static str {
        match self {
            Marker::Access => "=== Access Log ===",
            Marker::Error => "=== Error Log ===",
            Marker::Vhost => "=== Vhost Log ===",
        }
    }

    pub fn kind(self) -> SectionKind {
        match self {
            Marker::Access => SectionKind::Access,
            Marker::Error => SectionKind::Error,
            Marker::Vhost => SectionKind::Vhost,
        }
    }

    /// Section heading used in the combined report
    pub fn title(self) -> &'static str {
        match self {
            Marker::Access => "Access Log",
            Marker::Error => "Error Log",
            Marker::Vhost => "Vhost Log",
        }
    }
}

/// Sections recovered from a combined blob
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CombinedSections {
    pub access: String,
    pub error: String,
    pub vhost: String,
    /// Markers that were not found
    pub missing: Vec<Marker>,
    /// False when the markers found were not in access, error, vhost order
    pub in_order: bool,
}

impl CombinedSections {
    pub fn get(&self, marker: Marker) -> &str {
        match marker {
            Marker::Access => &self.access,
            Marker::Error => &self.error,
            Marker::Vhost => &self.vhost,
        }
    }

    fn slot(&mut self, marker: Marker) -> &mut String {
        match marker {
            Marker::Access => &mut self.access,
            Marker::Error => &mut self.error,
            Marker::Vhost => &mut self.vhost,
        }
    }
}

/// Join three logs into a combined blob
pub fn compose(access: &str, error: &str, vhost: &str) -> String {
    format!(
        "{}\n{}\n\n{}\n{}\n\n{}\n{}",
        Marker::Access.text(),
        access,
        Marker::Error.text(),
        error,
        Marker::Vhost.text(),
        vhost
    )
}

/// Offset of the first line at or after `from` that is exactly `marker`
fn find_marker_line(blob: &str, marker: Marker, from: usize) -> Option<usize> {
    let text = marker.text();
    blob[from..]
        .match_indices(text)
        .map(|(offset, _)| from + offset)
        .find(|&offset| {
            let starts_line = offset == 0 || blob[..offset].ends_with('\n');
            let rest = &blob[offset + text.len()..];
            let ends_line = rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n");
            starts_line && ends_line
        })
}

/// Split a combined blob into its sections.
///
/// A marker only counts when it fills a whole line, so log text that merely
/// mentions one stays inside its section. Markers are searched in expected
/// order, each after the previous one; a marker found only earlier in the blob
/// is still used and the blob is flagged as out of order.
pub fn parse_combined(blob: &str) -> CombinedSections {
    let mut found: Vec<(Marker, usize)> = Vec::with_capacity(Marker::ALL.len());
    let mut cursor = 0;
    for marker in Marker::ALL {
        if let Some(offset) = find_marker_line(blob, marker, cursor) {
            found.push((marker, offset));
            cursor = offset + marker.text().len();
        } else if let Some(offset) = find_marker_line(blob, marker, 0) {
            found.push((marker, offset));
        }
    }

    let mut sections = CombinedSections {
        missing: Marker::ALL
            .iter()
            .copied()
            .filter(|marker| !found.iter().any(|(m, _)| m == marker))
            .collect(),
        // `found` is still in expected order here
        in_order: found.windows(2).all(|pair| pair[0].1 < pair[1].1),
        ..Default::default()
    };

    found.sort_by_key(|&(_, offset)| offset);

    for (index, &(marker, offset)) in found.iter().enumerate() {
        let start = offset + marker.text().len();
        let end = found
            .get(index + 1)
            .map(|&(_, next)| next)
            .unwrap_or(blob.len())
            .max(start);
        *sections.slot(marker) = blob[start..end].trim().to_string();
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(prefix: &str, count: usize) -> String {
        (0..count).map(|i| format!("{} line {}\n", prefix, i)).collect()
    }

    #[test]
    fn test_round_trip_line_counts() {
        for (n, m, k) in [(0, 0, 0), (1, 2, 3), (10, 0, 4), (5, 5, 0)] {
            let blob = compose(
                &numbered("access", n),
                &numbered("error", m),
                &numbered("vhost", k),
            );
            let sections = parse_combined(&blob);

            let count = |s: &str| s.lines().filter(|l| !l.is_empty()).count();
            assert_eq!(count(&sections.access), n);
            assert_eq!(count(&sections.error), m);
            assert_eq!(count(&sections.vhost), k);
            assert!(sections.missing.is_empty());
            assert!(sections.in_order);
        }
    }

    #[test]
    fn test_sections_are_trimmed() {
        let blob = "=== Access Log ===\n\n  GET /  \n\n=== Error Log ===\nboom\n=== Vhost Log ===\n";
        let sections = parse_combined(blob);
        assert_eq!(sections.access, "GET /");
        assert_eq!(sections.error, "boom");
        assert_eq!(sections.vhost, "");
    }

    #[test]
    fn test_missing_marker_gives_empty_section() {
        let blob = "=== Access Log ===\nGET /\n=== Vhost Log ===\nvhost:80 GET /\n";
        let sections = parse_combined(blob);
        assert_eq!(sections.access, "GET /");
        assert_eq!(sections.error, "");
        assert_eq!(sections.vhost, "vhost:80 GET /");
        assert_eq!(sections.missing, vec![Marker::Error]);
        assert!(sections.in_order);
    }

    #[test]
    fn test_no_markers() {
        let sections = parse_combined("just some text");
        assert_eq!(sections.access, "");
        assert_eq!(sections.error, "");
        assert_eq!(sections.vhost, "");
        assert_eq!(sections.missing, Marker::ALL.to_vec());
    }

    #[test]
    fn test_out_of_order_markers_are_sliced_by_offset() {
        let blob = "=== Error Log ===\nE1\n=== Access Log ===\nA1\nA2\n=== Vhost Log ===\nV1";
        let sections = parse_combined(blob);
        assert_eq!(sections.error, "E1");
        assert_eq!(sections.access, "A1\nA2");
        assert_eq!(sections.vhost, "V1");
        assert!(!sections.in_order);
    }

    #[test]
    fn test_text_before_first_marker_is_ignored() {
        let blob = "preamble\n=== Access Log ===\nA\n=== Error Log ===\nE\n=== Vhost Log ===\nV";
        let sections = parse_combined(blob);
        assert_eq!(sections.get(Marker::Access), "A");
        assert_eq!(sections.get(Marker::Error), "E");
        assert_eq!(sections.get(Marker::Vhost), "V");
    }

    #[test]
    fn test_marker_text_inside_a_line_is_content() {
        let access = "1.2.3.4 GET / 200 5 \"-\" \"=== Vhost Log ===\"\n\
                      1.2.3.4 GET /a 200\n\
                      1.2.3.4 GET /b 200\n";
        let blob = compose(access, "ERROR: disk full\n", "vhost:80 GET /\n");

        let sections = parse_combined(&blob);

        assert_eq!(sections.access.lines().count(), 3);
        assert!(sections.access.ends_with("GET /b 200"));
        assert_eq!(sections.error, "ERROR: disk full");
        assert_eq!(sections.vhost, "vhost:80 GET /");
        assert!(sections.in_order);
    }

    #[test]
    fn test_marker_line_inside_earlier_section_is_skipped() {
        let access = "GET /\n=== Vhost Log ===\nGET /x\n";
        let blob = compose(access, "boom\n", "vhost:80 GET /\n");

        let sections = parse_combined(&blob);

        assert_eq!(sections.error, "boom");
        assert_eq!(sections.vhost, "vhost:80 GET /");
        assert!(sections.in_order);
    }

    #[test]
    fn test_marker_with_crlf_line_ending() {
        let blob = "=== Access Log ===\r\nA\r\n=== Error Log ===\r\nE\r\n=== Vhost Log ===\r\nV";
        let sections = parse_combined(blob);
        assert_eq!(sections.access, "A");
        assert_eq!(sections.error, "E");
        assert_eq!(sections.vhost, "V");
    }

    #[test]
    fn test_marker_metadata() {
        assert_eq!(Marker::Error.kind(), SectionKind::Error);
        assert_eq!(Marker::Vhost.title(), "Vhost Log");
    }
}
