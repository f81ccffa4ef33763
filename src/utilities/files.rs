use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{DataError, Result};

/// Extensions recognised as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively lists image files below `path`, sorted by path.
///
/// The sort makes enumeration order independent of the filesystem, so a
/// count cap always keeps the same files.
pub fn get_image_files<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let root = path.as_ref();
    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    debug!(dir = %root.display(), count = files.len(), "listed image files");
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| DataError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| DataError::io(dir, e))?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if is_image_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Keeps the first `min(cap, len)` files; `None` keeps everything.
pub fn truncate_files(mut files: Vec<PathBuf>, cap: Option<usize>) -> Vec<PathBuf> {
    if let Some(cap) = cap {
        files.truncate(cap);
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_image_extensions() {
        assert!(is_image_file(Path::new("a/b.PNG")));
        assert!(is_image_file(Path::new("x.jpeg")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("no_extension")));
    }

    #[test]
    fn lists_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        for name in ["b.png", "a.jpg", "sub/c.png", "readme.md"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = get_image_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a.jpg"), PathBuf::from("b.png"), PathBuf::from("sub/c.png")]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = get_image_files(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }

    #[test]
    fn truncation_is_capped_by_length() {
        let files: Vec<PathBuf> = (0..4).map(|i| PathBuf::from(format!("{}.png", i))).collect();
        assert_eq!(truncate_files(files.clone(), Some(2)).len(), 2);
        assert_eq!(truncate_files(files.clone(), Some(10)).len(), 4);
        assert_eq!(truncate_files(files, None).len(), 4);
    }
}
