use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::utils::config::RunConfig;

/// Screenshot file pattern inside the photos directory
pub const SCREENSHOT_GLOB: &str = "product_*.png";

/// Run-scoped output locations
pub struct RunContext {
    /// Product screenshots, read back by the HTML report
    pub photos_dir: PathBuf,

    /// results.json and report.html
    pub results_dir: PathBuf,
}

impl RunContext {
    pub fn new(photos_dir: &Path, results_dir: &Path) -> Self {
        Self {
            photos_dir: photos_dir.to_path_buf(),
            results_dir: results_dir.to_path_buf(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(&config.photos_dir, &config.results_dir)
    }

    /// Start from an empty photos directory; failures are only logged
    pub fn reset_photos_dir(&self) {
        if self.photos_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.photos_dir) {
                warn!(
                    "could not clear {}: {}",
                    self.photos_dir.display(),
                    e
                );
            }
        }
        if let Err(e) = std::fs::create_dir_all(&self.photos_dir) {
            warn!(
                "could not create {}: {}",
                self.photos_dir.display(),
                e
            );
        }
    }

    /// Screenshots already in the photos directory, sorted by name
    pub fn existing_screenshots(&self) -> Vec<PathBuf> {
        screenshots_in(&self.photos_dir)
    }

    /// Path for the next product screenshot, numbered from 1
    pub fn next_screenshot_path(&self) -> PathBuf {
        let existing = self.existing_screenshots().len();
        let path = self
            .photos_dir
            .join(format!("product_{}.png", existing + 1));
        debug!("next screenshot: {}", path.display());
        path
    }

    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.results_dir.join(filename)
    }
}

/// `product_*.png` files in `dir`, in numeric order
pub fn screenshots_in(dir: &Path) -> Vec<PathBuf> {
    let pattern = dir.join(SCREENSHOT_GLOB);
    let Some(pattern) = pattern.to_str() else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = match glob::glob(pattern) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(e) => {
            warn!("bad screenshot pattern {}: {}", pattern, e);
            Vec::new()
        }
    };
    files.sort_by_key(|p| screenshot_number(p).unwrap_or(usize::MAX));
    files
}

fn screenshot_number(path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("product_")?
        .parse()
        .ok()
}
