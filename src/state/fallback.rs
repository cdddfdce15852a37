use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::FallbackError;

/// Extensions the image widget can show
const PLACEHOLDER_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Placeholders shipped next to the binary
const BUILTIN_PLACEHOLDERS: [&str; 3] = [
    "assets/fallback/fallback-1.png",
    "assets/fallback/fallback-2.png",
    "assets/fallback/fallback-3.png",
];

/// Fixed set of local placeholder images
///
/// Cheap to clone; the set never changes after construction.
#[derive(Debug, Clone)]
pub struct FallbackPool {
    placeholders: Arc<[PathBuf]>,
}

impl FallbackPool {
    pub fn new(placeholders: Vec<PathBuf>) -> Result<Self, FallbackError> {
        if placeholders.is_empty() {
            return Err(FallbackError::EmptyPool);
        }
        Ok(Self {
            placeholders: placeholders.into(),
        })
    }

    /// The placeholders bundled with the application
    pub fn builtin() -> Self {
        Self {
            placeholders: BUILTIN_PLACEHOLDERS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Register every image file found under `dir`
    pub fn discover(dir: &Path) -> Result<Self, FallbackError> {
        let mut placeholders: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
                    .is_some_and(|ext| PLACEHOLDER_EXTENSIONS.contains(&ext.as_str()))
            })
            .collect();

        // Stable order regardless of directory iteration order
        placeholders.sort();

        log::debug!("Found {} placeholder images in {}", placeholders.len(), dir.display());

        Self::new(placeholders)
    }

    /// `discover`, falling back to the bundled set when the directory has none
    pub fn discover_or_builtin(dir: &Path) -> Self {
        Self::discover(dir).unwrap_or_else(|_| {
            log::warn!("No placeholders in {}, using built-in set", dir.display());
            Self::builtin()
        })
    }

    /// Uniformly chosen placeholder; repeats are fine
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> PathBuf {
        let index = rng.random_range(0..self.placeholders.len());
        self.placeholders[index].clone()
    }

    #[cfg(test)]
    pub fn contains(&self, path: &Path) -> bool {
        self.placeholders.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.placeholders.len()
    }
}
