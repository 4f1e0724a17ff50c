//! Image discovery.
//!
//! Expands file and directory arguments into a flat, ordered list of
//! images. Directories are walked depth-first; within one directory the
//! files come first in name order, then each subdirectory in name order.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Extensions (lowercase, without the dot) picked up when walking a directory
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Fatal discovery failures
#[derive(Debug, Error)]
pub enum ScanError {
    /// A top-level input does not exist
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),
    /// Nothing to process after expanding every input
    #[error("No images found.")]
    NoImages,
}

impl ScanError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            ScanError::PathNotFound(_) => 2,
            ScanError::NoImages => 1,
        }
    }
}

/// A discovered image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePath {
    /// Path as discovered (relative inputs stay relative)
    pub path: PathBuf,
    /// Lowercase extension without the dot, empty if there is none
    pub extension: String,
}

impl ImagePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = lowercase_extension(&path);
        Self { path, extension }
    }

    /// Final path component, used as the heading in combined output
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Whether the extension is one of [`IMAGE_EXTENSIONS`]
    pub fn has_image_extension(&self) -> bool {
        IMAGE_EXTENSIONS.contains(&self.extension.as_str())
    }
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Lazy depth-first walk over the images below one input path
#[derive(Debug)]
pub struct ImageWalker {
    /// Files of the directory currently being drained
    pending: VecDeque<PathBuf>,
    /// Directories still to visit, next one on top
    dirs: Vec<PathBuf>,
}

impl ImageWalker {
    /// Walk `root`. A regular file is yielded as-is without an extension check.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut walker = Self {
            pending: VecDeque::new(),
            dirs: Vec::new(),
        };
        if root.is_file() {
            walker.pending.push_back(root);
        } else if root.is_dir() {
            walker.dirs.push(root);
        }
        walker
    }

    fn visit(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                return;
            }
        };

        let mut names: Vec<(std::ffi::OsString, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| (entry.file_name(), entry.path()))
            .collect();
        names.sort();

        let mut subdirs = Vec::new();
        for (_, path) in names {
            let is_real_dir = fs::symlink_metadata(&path)
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_real_dir {
                subdirs.push(path);
            } else if path.is_file() && ImagePath::new(&path).has_image_extension() {
                self.pending.push_back(path);
            }
        }

        // Reversed so the first subdirectory is popped first.
        self.dirs.extend(subdirs.into_iter().rev());
    }
}

impl Iterator for ImageWalker {
    type Item = ImagePath;

    fn next(&mut self) -> Option<ImagePath> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                return Some(ImagePath::new(path));
            }
            let dir = self.dirs.pop()?;
            self.visit(&dir);
        }
    }
}

/// Images below a single input path, in discovery order
pub fn iter_images(path: impl Into<PathBuf>) -> ImageWalker {
    ImageWalker::new(path)
}

/// Expand every input in order, failing on the first missing path or
/// when nothing was found at all
pub fn expand_paths<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<ImagePath>, ScanError> {
    let mut images = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if !input.exists() {
            return Err(ScanError::PathNotFound(input.to_path_buf()));
        }
        let before = images.len();
        images.extend(iter_images(input));
        tracing::debug!(input = %input.display(), found = images.len() - before, "Expanded input");
    }

    if images.is_empty() {
        return Err(ScanError::NoImages);
    }
    Ok(images)
}
