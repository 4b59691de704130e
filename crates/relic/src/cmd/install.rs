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

use eyre::{bail, Result};
use relic_engine::{BinaryCache, CompilerConfig, CompilerVersion};

/// Make sure the native build of `version` is in the cache and print its path.
pub async fn install(config: &CompilerConfig, version: &str) -> Result<()> {
    let version = CompilerVersion::new(version);
    let cache = BinaryCache::new(config);

    match cache.resolve(&config.platform, &version).await? {
        Some(path) => {
            tracing::info!(%version, "compiler available at {}", path.display());
            println!("{}", path.display());
            Ok(())
        }
        None => bail!("no native build of solc {version} for platform {}", config.platform),
    }
}
