/// Mask asset loader with a language-aware search path
///
/// Masks are resolved in this order:
/// 1. `<root>/<lang>/<file>` for each requested language
/// 2. `<root>/<file>`
/// 3. `<file>` relative to the working directory
/// 4. `<root>/<default_language>/<file>`
///
/// An unresolved mask is an initialization error, never a per-tick one.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::AssetError;

#[derive(Debug, Clone)]
pub struct MaskAssets {
    root: PathBuf,
    languages: Vec<String>,
    default_language: String,
    /// Pre-decoded images that shadow the filesystem (synthetic masks)
    preloaded: HashMap<String, DynamicImage>,
}

impl MaskAssets {
    pub fn new(root: impl Into<PathBuf>, languages: Vec<String>, default_language: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            languages,
            default_language: default_language.into(),
            preloaded: HashMap::new(),
        }
    }

    /// Resolver that only serves preloaded images
    pub fn in_memory() -> Self {
        Self::new(PathBuf::new(), Vec::new(), "ja")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register an already decoded mask under `name`
    pub fn insert(&mut self, name: impl Into<String>, image: DynamicImage) {
        self.preloaded.insert(name.into(), image);
    }

    pub fn with_mask(mut self, name: impl Into<String>, mask: GrayImage) -> Self {
        self.insert(name, DynamicImage::ImageLuma8(mask));
        self
    }

    /// Every path tried for `file`, in search order
    pub fn candidates(&self, file: &str) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .languages
            .iter()
            .map(|lang| self.root.join(lang).join(file))
            .collect();
        paths.push(self.root.join(file));
        paths.push(PathBuf::from(file));
        paths.push(self.root.join(&self.default_language).join(file));
        paths
    }

    /// First existing candidate for `file`
    pub fn resolve(&self, file: &str) -> Result<PathBuf, AssetError> {
        let candidates = self.candidates(file);
        if let Some(found) = candidates.iter().find(|path| path.is_file()) {
            tracing::debug!("Resolved mask {} -> {}", file, found.display());
            return Ok(found.clone());
        }

        Err(AssetError::NotFound {
            name: file.to_string(),
            searched: candidates
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        })
    }

    fn load(&self, file: &str) -> Result<DynamicImage, AssetError> {
        if let Some(image) = self.preloaded.get(file) {
            return Ok(image.clone());
        }

        let path = self.resolve(file)?;
        let image = image::open(&path).map_err(|source| AssetError::DecodeFailed {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(
            "Loaded mask {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(image)
    }

    pub fn load_gray(&self, file: &str) -> Result<GrayImage, AssetError> {
        Ok(self.load(file)?.to_luma8())
    }

    pub fn load_rgb(&self, file: &str) -> Result<RgbImage, AssetError> {
        Ok(self.load(file)?.to_rgb8())
    }
}
