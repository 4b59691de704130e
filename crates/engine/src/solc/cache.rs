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

//! On-disk cache of compiler builds.
//!
//! A build is stored at `<cache_root>/solc/<platform>/<file>` and is reused as
//! long as a file exists at that path. The content is never checked again
//! after the first write: a corrupted file has to be removed by hand.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use relic_common::{CachePath, RelicCachePath};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{CacheError, CompilerConfig, CompilerVersion, RemoteFetcher};

/// Cache of native compiler binaries and `soljson` builds.
#[derive(Debug, Clone)]
pub struct BinaryCache {
    root: PathBuf,
    fetcher: RemoteFetcher,
}

impl BinaryCache {
    /// Cache configured from `config`, fetching from its repository.
    pub fn new(config: &CompilerConfig) -> Self {
        Self::with_fetcher(&config.cache_root, RemoteFetcher::new(&config.repository_url))
    }

    /// Cache rooted at `cache_root` using an existing fetcher.
    pub fn with_fetcher(cache_root: impl AsRef<Path>, fetcher: RemoteFetcher) -> Self {
        let root = RelicCachePath::new(Some(cache_root.as_ref()))
            .compiler_cache_dir()
            .unwrap_or_else(|| cache_root.as_ref().join("solc"));
        Self { root, fetcher }
    }

    /// Directory holding every cached build: `<cache_root>/solc`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path of `file_name` for `platform`.
    pub fn file_path(&self, platform: &str, file_name: &str) -> PathBuf {
        self.root.join(platform).join(file_name)
    }

    /// Local path of the native binary of `version` for `platform`.
    pub fn binary_path(&self, platform: &str, version: &CompilerVersion) -> PathBuf {
        self.file_path(platform, &version.native_file_name(platform))
    }

    /// Resolve the native binary of `version` for `platform`, downloading it on
    /// first use. Returns `None` when the repository does not publish it.
    pub async fn resolve(
        &self,
        platform: &str,
        version: &CompilerVersion,
    ) -> Result<Option<PathBuf>, CacheError> {
        self.resolve_file(platform, &version.native_file_name(platform)).await
    }

    /// Resolve an arbitrary repository file for `platform`, downloading it on
    /// first use. Returns `None` when the repository does not publish it.
    pub async fn resolve_file(
        &self,
        platform: &str,
        file_name: &str,
    ) -> Result<Option<PathBuf>, CacheError> {
        let path = self.file_path(platform, file_name);
        if path.exists() {
            debug!(path = %path.display(), "using cached compiler");
            return Ok(Some(path));
        }

        let Some(bytes) = self.fetcher.fetch(platform, file_name).await else {
            return Ok(None);
        };

        store(&path, &bytes)?;
        info!(path = %path.display(), size = bytes.len(), "cached compiler");
        Ok(Some(path))
    }
}

/// Write `bytes` to `path` with executable permissions, replacing any stale
/// file. The bytes go to a temporary file first and are renamed into place.
fn store(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|source| CacheError::CreateDir { path: dir.to_path_buf(), source })?;

    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale compiler"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(CacheError::RemoveStale { path: path.to_path_buf(), source }),
    }

    let store_err = |source: io::Error| CacheError::Store { path: path.to_path_buf(), source };
    let mut file = NamedTempFile::new_in(dir).map_err(store_err)?;
    file.write_all(bytes).map_err(store_err)?;
    file.as_file().sync_all().map_err(store_err)?;
    set_executable(file.path()).map_err(store_err)?;
    file.persist(path).map_err(|e| store_err(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
