//! Cheap file signatures built from metadata rather than content.
//!
//! A signature is `name:<mtime ns in hex>.<size in hex>`. Reading metadata is
//! fast enough for every cache lookup. An in-place edit that keeps both the
//! size and the modification time is not detected.

use std::path::Path;
use std::time::UNIX_EPOCH;

/// Signature of the file at `path`, or `None` if it cannot be read.
pub fn file_signature(path: &Path) -> Option<String> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    let mtime_ns = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |elapsed| elapsed.as_nanos());
    Some(format!(
        "{}:{:x}.{:x}",
        file_name(path),
        mtime_ns,
        metadata.len()
    ))
}

/// Signature of a configured resource, or `<name>:missing` if it is absent.
pub fn resource_signature(path: &Path) -> String {
    file_signature(path).unwrap_or_else(|| format!("{}:missing", file_name(path)))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_signature_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"0123456789abcdef").unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_nanos(0x1234))
            .unwrap();
        drop(file);

        assert_eq!(file_signature(&path).unwrap(), "index.json:1234.10");
    }

    #[test]
    fn test_signature_tracks_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(60))
            .unwrap();
        let before = file_signature(&path).unwrap();

        file.set_modified(SystemTime::now()).unwrap();
        let after = file_signature(&path).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/braid/keywords.txt");
        assert_eq!(file_signature(path), None);
        assert_eq!(resource_signature(path), "keywords.txt:missing");
    }

    #[test]
    fn test_directory_has_no_signature() {
        let dir = TempDir::new().unwrap();
        assert_eq!(file_signature(dir.path()), None);
    }
}
