use std::path::{Path, PathBuf};

/// Enumerates the regular files under a documents directory, sorted by path.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    /// Missing or unreadable roots yield no files; unreadable entries below
    /// the root are logged and left out.
    pub fn files(&self) -> Vec<PathBuf> {
        if !self.root.is_dir() {
            tracing::warn!(dir = %self.root.display(), "documents folder not found; corpus will be empty");
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    /// Source id for a file: its path relative to the root, `/`-separated.
    pub fn source_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
