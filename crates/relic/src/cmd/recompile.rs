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

use std::path::{Path, PathBuf};

use eyre::{ensure, Result};
use relic_engine::{CompilerConfig, Orchestrator, SolcCompiler, SourcifyVerifier};

/// Recompile every directory in `dirs` in turn, writing artifacts to `out_dir`.
///
/// A failing directory is logged and skipped; the command fails at the end if
/// any directory did.
pub async fn recompile(config: &CompilerConfig, dirs: &[PathBuf], out_dir: &Path) -> Result<()> {
    let orchestrator = Orchestrator::new(SolcCompiler::new(config.clone()), SourcifyVerifier::new());

    let mut failed = 0usize;
    for dir in dirs {
        match orchestrator.recompile_to(dir, out_dir).await {
            Ok(path) => {
                tracing::info!(dir = %dir.display(), "artifact written to {}", path.display());
                println!("{}", path.display());
            }
            Err(e) => {
                tracing::error!(dir = %dir.display(), "recompilation failed: {e}");
                failed += 1;
            }
        }
    }

    ensure!(failed == 0, "{failed} of {} target directories failed", dirs.len());
    Ok(())
}
