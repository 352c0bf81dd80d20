use crate::report::SectionContent;
use std::path::Path;

/// Options for reading a log source
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Keep only the last N lines (all lines when None)
    pub tail_lines: Option<usize>,
}

/// Read the full text of a log source.
///
/// A missing or unreadable file is not an error: a warning is logged and
/// `SectionContent::Unavailable` is returned so the report can still be built
/// from the remaining sources. Invalid UTF-8 is replaced, not rejected.
///
/// # Arguments
/// * `path` - Path to the log file
/// * `options` - Read options
pub async fn read_log(path: &Path, options: &ReadOptions) -> SectionContent {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path.display(), e);
            return SectionContent::Unavailable;
        }
    };

    let text = String::from_utf8_lossy(&bytes).into_owned();

    match options.tail_lines {
        Some(limit) => SectionContent::Text(last_lines(&text, limit)),
        None => SectionContent::Text(text),
    }
}

/// The last `limit` lines of `text`, newline-terminated
fn last_lines(text: &str, limit: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..]
        .iter()
        .map(|line| format!("{}\n", line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("access.log");
        tokio::fs::write(&path, "GET /\nERROR 500\n").await.unwrap();

        let content = read_log(&path, &ReadOptions::default()).await;
        assert_eq!(content, SectionContent::Text("GET /\nERROR 500\n".to_string()));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.log");

        let content = read_log(&path, &ReadOptions::default()).await;
        assert_eq!(content, SectionContent::Unavailable);
    }

    #[tokio::test]
    async fn test_directory_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();

        let content = read_log(temp_dir.path(), &ReadOptions::default()).await;
        assert_eq!(content, SectionContent::Unavailable);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("error.log");
        tokio::fs::write(&path, b"bad \xff byte\n").await.unwrap();

        let content = read_log(&path, &ReadOptions::default()).await;
        let text = content.as_text().unwrap();
        assert!(text.starts_with("bad "));
        assert!(text.contains('\u{fffd}'));
    }

    #[tokio::test]
    async fn test_tail_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("access.log");
        tokio::fs::write(&path, "one\ntwo\nthree\nfour\n").await.unwrap();

        let options = ReadOptions {
            tail_lines: Some(2),
        };
        let content = read_log(&path, &options).await;
        assert_eq!(content, SectionContent::Text("three\nfour\n".to_string()));
    }

    #[test]
    fn test_last_lines_shorter_than_limit() {
        assert_eq!(last_lines("a\nb", 10), "a\nb\n");
        assert_eq!(last_lines("", 3), "");
    }
}
