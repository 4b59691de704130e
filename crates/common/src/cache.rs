// Relic - Solidity Recompiler
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Cache path utilities.
//!
//! Relic keeps every downloaded compiler under a single root directory so that
//! concurrent instances working on different contracts share the same binaries.

use std::path::PathBuf;

/// Name of the directory (under the user's home) holding Relic's state.
pub const RELIC_HOME_DIR: &str = ".relic";

/// Trait for cache paths.
pub trait CachePath {
    /// Returns the path to relic's cache dir: `~/.relic/cache` by default.
    fn relic_cache_dir(&self) -> Option<PathBuf>;

    /// Check whether the cache is valid.
    fn is_valid(&self) -> bool {
        self.relic_cache_dir().is_some()
    }

    /// Returns the path to relic's compiler cache dir: `<cache_root>/solc`.
    fn compiler_cache_dir(&self) -> Option<PathBuf> {
        Some(self.relic_cache_dir()?.join("solc"))
    }

    /// Returns the path to the compiler cache dir for `platform`:
    /// `<cache_root>/solc/<platform>`
    fn compiler_platform_cache_dir(&self, platform: &str) -> Option<PathBuf> {
        Some(self.compiler_cache_dir()?.join(platform))
    }
}

/// Cache path for relic.
#[derive(Debug, Clone)]
pub struct RelicCachePath {
    root: Option<PathBuf>,
}

impl Default for RelicCachePath {
    fn default() -> Self {
        Self { root: default_cache_root() }
    }
}

impl RelicCachePath {
    /// New cache path. Falls back to `~/.relic/cache` when `root` is `None`.
    pub fn new(root: Option<impl Into<PathBuf>>) -> Self {
        Self { root: root.map(Into::into).or_else(default_cache_root) }
    }

    /// New empty cache path.
    pub fn empty() -> Self {
        Self { root: None }
    }
}

fn default_cache_root() -> Option<PathBuf> {
    dirs_next::home_dir().map(|p| p.join(RELIC_HOME_DIR).join("cache"))
}

impl CachePath for RelicCachePath {
    fn relic_cache_dir(&self) -> Option<PathBuf> {
        self.root.clone()
    }
}

impl CachePath for Option<RelicCachePath> {
    fn relic_cache_dir(&self) -> Option<PathBuf> {
        self.as_ref()?.relic_cache_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relic_cache_path_default() {
        let cache_path = RelicCachePath::default();

        if let Some(cache_dir) = cache_path.relic_cache_dir() {
            assert!(cache_dir.to_string_lossy().contains(".relic"));
            assert!(cache_dir.ends_with("cache"));
        }
    }

    #[test]
    fn test_relic_cache_path_new_with_root() {
        let temp_path = std::env::temp_dir().join("relic_test");
        let cache_path = RelicCachePath::new(Some(&temp_path));

        assert!(cache_path.is_valid());
        assert_eq!(cache_path.relic_cache_dir(), Some(temp_path));
    }

    #[test]
    fn test_relic_cache_path_empty() {
        let cache_path = RelicCachePath::empty();
        assert!(!cache_path.is_valid());
        assert!(cache_path.compiler_cache_dir().is_none());
        assert!(cache_path.compiler_platform_cache_dir("linux-amd64").is_none());
    }

    #[test]
    fn test_compiler_directories() {
        let temp_path = std::env::temp_dir().join("relic_test_2");
        let cache_path = RelicCachePath::new(Some(&temp_path));

        let compiler_dir = cache_path.compiler_cache_dir().unwrap();
        assert_eq!(compiler_dir, temp_path.join("solc"));

        let platform_dir = cache_path.compiler_platform_cache_dir("linux-amd64").unwrap();
        assert_eq!(platform_dir, temp_path.join("solc").join("linux-amd64"));
        assert_ne!(platform_dir, cache_path.compiler_platform_cache_dir("macosx-amd64").unwrap());
    }

    #[test]
    fn test_option_cache_path_none() {
        let cache_path: Option<RelicCachePath> = None;
        assert!(cache_path.relic_cache_dir().is_none());
    }
}
