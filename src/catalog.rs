//! # File Discovery
//!
//! Stages find their inputs through the [`FileCatalog`] trait. [`FsCatalog`]
//! expands a shell glob (`*`, `?`, `[...]`) inside one directory with the
//! `glob` crate.

use crate::error::StatsResult;
use glob::{Pattern, glob};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Source of input file lists, keyed by directory and file-name pattern
pub trait FileCatalog {
    /// Returns the matching files, sorted by path
    fn find(&self, dir: &Path, pattern: &str) -> StatsResult<Vec<PathBuf>>;
}

/// Catalog backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCatalog;

impl FileCatalog for FsCatalog {
    fn find(&self, dir: &Path, pattern: &str) -> StatsResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            debug!("Directory {} does not exist, no files match '{}'", dir.display(), pattern);
            return Ok(Vec::new());
        }

        // the directory is literal, only the file name is a pattern
        let full = format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), pattern);
        let mut files = Vec::new();
        for entry in glob(&full)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(path) => debug!("Skipping non-file match {}", path.display()),
                Err(e) => warn!("Unreadable path while listing {}: {:?}", dir.display(), e),
            }
        }
        files.sort();
        debug!("Found {} files matching {}", files.len(), full);
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_fs_catalog_lists_sorted_matches() {
        let dir = tempdir().unwrap();
        for name in ["r2_b.nc", "r1_a.nc", "r1_c.txt", "r3_d.nc", "r10_e.nc"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("r1_subdir.nc")).unwrap();

        let files = FsCatalog.find(dir.path(), "r1_*.nc").unwrap();
        assert_eq!(files, vec![dir.path().join("r1_a.nc")]);

        let all = FsCatalog.find(dir.path(), "*.nc").unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_single_character_and_class_patterns() {
        let dir = tempdir().unwrap();
        for name in ["r1_a.nc", "r2_b.nc", "r3_c.nc", "r10_d.nc"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let any_single = FsCatalog.find(dir.path(), "r?_*.nc").unwrap();
        assert_eq!(any_single.len(), 3);

        let class = FsCatalog.find(dir.path(), "r[12]_*.nc").unwrap();
        assert_eq!(class, vec![dir.path().join("r1_a.nc"), dir.path().join("r2_b.nc")]);
    }

    #[test]
    fn test_metric_pattern_requires_suffix() {
        let dir = tempdir().unwrap();
        for name in [
            "r1_r1i1p1_exceedances_high_CanLEAD_30yr_mean.nc",
            "r1_exceedances_high.nc",
            "r1_r2i1p1_exceedances_extreme_CanLEAD_30yr_mean.nc",
        ] {
            File::create(dir.path().join(name)).unwrap();
        }
        let files = FsCatalog.find(dir.path(), "*_exceedances_high*_30yr_mean.nc").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_directory_with_glob_characters_is_literal() {
        let dir = tempdir().unwrap();
        let odd = dir.path().join("run[1]");
        fs::create_dir(&odd).unwrap();
        File::create(odd.join("r1_a.nc")).unwrap();
        assert_eq!(FsCatalog.find(&odd, "*.nc").unwrap(), vec![odd.join("r1_a.nc")]);
    }

    #[test]
    fn test_missing_directory_yields_no_files() {
        let dir = tempdir().unwrap();
        let files = FsCatalog.find(&dir.path().join("absent"), "*.nc").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(FsCatalog.find(dir.path(), "r[_*.nc").is_err());
    }
}
