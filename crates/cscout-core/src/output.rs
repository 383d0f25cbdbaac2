//! The plain-text links artifact.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tracing::info;

use crate::Result;

/// `udemy_links.txt` → `udemy_links_20261019-070000.txt`.
pub fn timestamped_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("links");
    let stamp = at.format("%Y%m%d-%H%M%S");
    let name = match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{stem}_{stamp}.{ext}"),
        None => format!("{stem}_{stamp}"),
    };
    path.with_file_name(name)
}

/// Overwrite `path` with one link per line (no trailing newline).
pub fn write_links(path: &Path, links: &[String]) -> Result<()> {
    fs::write(path, links.join("\n"))?;
    info!(path = %path.display(), count = links.len(), "Saved links");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn writes_one_link_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        fs::write(&path, "stale contents\nfrom yesterday\nand more").unwrap();

        write_links(&path, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb");
    }

    #[test]
    fn timestamped_name_keeps_directory_and_extension() {
        let at = Local.with_ymd_and_hms(2026, 10, 19, 7, 5, 9).unwrap();
        assert_eq!(
            timestamped_path(Path::new("out/udemy_links.txt"), at),
            PathBuf::from("out/udemy_links_20261019-070509.txt")
        );
        assert_eq!(
            timestamped_path(Path::new("links"), at),
            PathBuf::from("links_20261019-070509")
        );
    }
}
