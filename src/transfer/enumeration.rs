use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::classify::MediaCandidate;
use super::helpers::{display_path, normalize_path};
use crate::UploadError;

/// One picked file. `relative_path` always starts with the root folder's own
/// name, the way a directory picker reports it (`clips/intro/a.mp4`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub relative_path: String,
    pub source: PathBuf,
    pub size: u64,
}

impl SelectedFile {
    pub fn new(relative_path: &str, source: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            relative_path: normalize_path(relative_path, false),
            source: source.into(),
            size,
        }
    }
}

impl MediaCandidate for SelectedFile {
    fn name(&self) -> &str {
        self.relative_path.rsplit('/').next().unwrap_or(&self.relative_path)
    }

    fn relative_path(&self) -> &str {
        &self.relative_path
    }
}

/// Everything captured from one folder selection. Not mutated after capture.
#[derive(Clone, Debug, Default)]
pub struct SelectedFileSet {
    pub root_name: String,
    pub files: Vec<SelectedFile>,
}

impl SelectedFileSet {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Walk `root` recursively (name-sorted, regular files only) and capture it as
/// a selection rooted at the folder's own name.
pub fn scan_folder(root: &Path) -> Result<SelectedFileSet, UploadError> {
    if !root.is_dir() {
        return Err(UploadError::SourceNotDir(display_path(root).to_string()));
    }
    let root_name = root_folder_name(root)?;
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            UploadError::SourceUnreadable(display_path(root).to_string(), e.to_string())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let md = entry.metadata().map_err(|e| {
            UploadError::SourceUnreadable(display_path(path).to_string(), e.to_string())
        })?;
        let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().to_string();
        let rel = format!("{}/{}", root_name, rel);
        files.push(SelectedFile::new(&rel, path, md.len()));
    }
    tracing::debug!("scanned '{}': {} files", root_name, files.len());
    Ok(SelectedFileSet { root_name, files })
}

// "." and ".." have no usable file_name(); canonicalize first
fn root_folder_name(root: &Path) -> Result<String, UploadError> {
    if let Some(name) = root.file_name().and_then(|n| n.to_str()) {
        return Ok(name.to_string());
    }
    let canon = root.canonicalize().map_err(|e| {
        UploadError::SourceUnreadable(display_path(root).to_string(), e.to_string())
    })?;
    canon
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| UploadError::SourceNotDir(display_path(root).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_prefixes_root_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("clips");
        fs::create_dir_all(root.join("outro")).unwrap();
        fs::create_dir_all(root.join("intro")).unwrap();
        fs::write(root.join("outro/b.mov"), b"bb").unwrap();
        fs::write(root.join("intro/a.mp4"), b"a").unwrap();
        fs::write(root.join("notes.txt"), b"n").unwrap();

        let set = scan_folder(&root).unwrap();
        assert_eq!(set.root_name, "clips");
        let rels: Vec<&str> = set.files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["clips/intro/a.mp4", "clips/notes.txt", "clips/outro/b.mov"]);
        assert_eq!(set.total_size(), 4);
        assert_eq!(set.files[0].name(), "a.mp4");
    }

    #[test]
    fn scan_rejects_non_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let f = tmp.path().join("x.mp4");
        fs::write(&f, b"x").unwrap();
        assert!(matches!(scan_folder(&f), Err(UploadError::SourceNotDir(_))));
        assert!(matches!(
            scan_folder(&tmp.path().join("missing")),
            Err(UploadError::SourceNotDir(_))
        ));
    }
}
