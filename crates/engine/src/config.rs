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

//! Compiler configuration.
//!
//! A [`CompilerConfig`] is built once per invocation and handed to every
//! component that needs it. Nothing in the engine reads process-wide state
//! to decide which compiler to use.

use std::{path::PathBuf, time::Duration};

use relic_common::{CachePath, RelicCachePath};

/// Default root of the compiler binary repository.
pub const DEFAULT_SOLC_REPOSITORY: &str = "https://binaries.soliditylang.org";

/// Default platform key of the native compiler binaries.
pub const DEFAULT_SOLC_PLATFORM: &str = "linux-amd64";

/// Platform directory of the repository hosting the `soljson` builds.
pub const SOLJSON_PLATFORM: &str = "bin";

/// Default capacity of the compiler's output streams (20 MB).
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 1000 * 1000 * 20;

/// Fallback cache root when no home directory can be determined.
const LOCAL_CACHE_ROOT: &str = "solc-repo";

/// Configuration for compiler acquisition and invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Platform directory of the binary repository, e.g. `linux-amd64`
    pub platform: String,
    /// Root URL of the binary repository
    pub repository_url: String,
    /// Root of the on-disk cache. Compilers live under `<cache_root>/solc/<platform>`
    pub cache_root: PathBuf,
    /// Wall-clock limit for a single native compiler run
    pub timeout: Option<Duration>,
    /// Maximum number of bytes accepted on each compiler output stream
    pub max_output_size: usize,
    /// Runner script driving `soljson` builds on the fallback path
    pub solcjs_runner: Option<PathBuf>,
    /// Always use the fallback path, even if a native binary exists
    pub force_fallback: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            platform: DEFAULT_SOLC_PLATFORM.into(),
            repository_url: DEFAULT_SOLC_REPOSITORY.into(),
            cache_root: RelicCachePath::default()
                .relic_cache_dir()
                .unwrap_or_else(|| PathBuf::from(LOCAL_CACHE_ROOT)),
            timeout: None,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            solcjs_runner: None,
            force_fallback: false,
        }
    }
}

impl CompilerConfig {
    /// Set the platform key
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the root URL of the binary repository
    pub fn with_repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = url.into();
        self
    }

    /// Set the cache root directory
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    /// Set the wall-clock limit of a compiler run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the output stream capacity
    pub fn with_max_output_size(mut self, size: usize) -> Self {
        self.max_output_size = size;
        self
    }

    /// Set the `soljson` runner script
    pub fn with_solcjs_runner(mut self, runner: impl Into<PathBuf>) -> Self {
        self.solcjs_runner = Some(runner.into());
        self
    }

    /// Force the fallback path for every compilation
    pub fn with_force_fallback(mut self, force: bool) -> Self {
        self.force_fallback = force;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();

        assert_eq!(config.platform, "linux-amd64");
        assert_eq!(config.repository_url, "https://binaries.soliditylang.org");
        assert_eq!(config.max_output_size, 20_000_000);
        assert_eq!(config.timeout, None);
        assert!(config.solcjs_runner.is_none());
        assert!(!config.force_fallback);
    }

    #[test]
    fn test_config_builders() {
        let config = CompilerConfig::default()
            .with_platform("macosx-amd64")
            .with_repository_url("http://localhost:1234")
            .with_cache_root("/tmp/relic")
            .with_timeout(Duration::from_secs(60))
            .with_max_output_size(1024)
            .with_solcjs_runner("runner.js")
            .with_force_fallback(true);

        assert_eq!(config.platform, "macosx-amd64");
        assert_eq!(config.repository_url, "http://localhost:1234");
        assert_eq!(config.cache_root, PathBuf::from("/tmp/relic"));
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.max_output_size, 1024);
        assert_eq!(config.solcjs_runner, Some(PathBuf::from("runner.js")));
        assert!(config.force_fallback);
    }
}
