//! File downloads: filename resolution and where the bytes go.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

use easycrud_core::logging::targets;

use crate::error::Result;

/// Filename used when neither the headers nor the URL provide one.
pub const UNKNOWN_FILENAME: &str = "unknown";

static FILENAME_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?["']?([^"';]+)["']?"#).ok()
});

/// Destination for downloaded files.
pub trait DownloadSink: Send + Sync {
    /// Persist `contents` under `filename`.
    fn save(&self, filename: &str, contents: &[u8]) -> Result<PathBuf>;
}

/// Writes downloads into a directory on disk.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Save into `dir`, creating it on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's download directory, or the system temp directory.
    pub fn user_downloads() -> Self {
        let dir = directories::UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .unwrap_or_else(std::env::temp_dir);
        Self::new(dir)
    }

    /// The target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for DirectorySink {
    fn default() -> Self {
        Self::user_downloads()
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, contents: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(sanitize(filename));
        std::fs::write(&path, contents)?;
        tracing::info!(target: targets::DOWNLOAD, path = %path.display(), bytes = contents.len(), "file saved");
        Ok(path)
    }
}

/// A completed download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Resolved filename.
    pub filename: String,
    /// Where the sink put it.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Resolve the filename for a download.
///
/// With a `Content-Disposition` header the name comes from its `filename` or
/// `filename*` parameter (percent-decoded); a header that yields nothing gives
/// [`UNKNOWN_FILENAME`]. Without the header the last segment of the request
/// URL is used.
pub fn resolve_filename(content_disposition: Option<&str>, request_url: &str) -> String {
    match content_disposition {
        Some(header) => filename_from_disposition(header).unwrap_or_else(|| UNKNOWN_FILENAME.to_string()),
        None => filename_from_url(request_url).unwrap_or_else(|| UNKNOWN_FILENAME.to_string()),
    }
}

fn filename_from_disposition(header: &str) -> Option<String> {
    let pattern = FILENAME_PATTERN.as_ref()?;
    let raw = pattern.captures(header)?.get(1)?.as_str();
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            tracing::warn!(target: targets::DOWNLOAD, "cannot decode filename from Content-Disposition: {}", e);
            None
        }
    }
}

fn filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn sanitize(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "..")
        .unwrap_or(UNKNOWN_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_plain_disposition() {
        let name = resolve_filename(Some(r#"attachment; filename="report.xlsx""#), "/export");
        assert_eq!(name, "report.xlsx");
    }

    #[test]
    fn test_filename_star_is_percent_decoded() {
        let name = resolve_filename(
            Some("attachment; filename*=UTF-8''%E7%94%A8%E6%88%B7%20list.csv"),
            "/export",
        );
        assert_eq!(name, "用户 list.csv");
    }

    #[test]
    fn test_filename_falls_back_to_url() {
        assert_eq!(resolve_filename(None, "/files/archive.zip?v=2"), "archive.zip");
        assert_eq!(resolve_filename(None, "/files/"), UNKNOWN_FILENAME);
    }

    #[test]
    fn test_unmatched_disposition_is_unknown() {
        assert_eq!(resolve_filename(Some("inline"), "/files/a.txt"), UNKNOWN_FILENAME);
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("a.txt"), "a.txt");
        assert_eq!(sanitize(".."), UNKNOWN_FILENAME);
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let path = sink.save("a.txt", b"hello").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
    }
}
