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

//! Orchestration of a single recompilation.
//!
//! For a target directory the [`Orchestrator`] asks the verifier for
//! candidates, recompiles the first one, pulls storage layout and ABI out of
//! the synthesized metadata and links the runtime bytecode:
//!
//! ```text
//! check_paths -> is_valid -> recompile -> ContractMetadata -> link -> VerificationArtifact
//! ```
//!
//! Writing the artifact is a separate step ([`save_artifact`]) so that a
//! failed production never leaves a file behind.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    link_and_report, load_library_map, CandidateContract, ContractMetadata, ContractVerifier,
    RecompileError, SolcCompiler,
};

pub mod artifact;
pub use artifact::*;

/// Produces verification artifacts for target directories.
#[derive(Debug, Clone)]
pub struct Orchestrator<V> {
    compiler: SolcCompiler,
    verifier: V,
}

impl<V: ContractVerifier> Orchestrator<V> {
    /// New orchestrator compiling with `compiler` and discovering contracts with `verifier`.
    pub fn new(compiler: SolcCompiler, verifier: V) -> Self {
        Self { compiler, verifier }
    }

    /// The compiler handed to the verifier and its candidates.
    pub fn compiler(&self) -> &SolcCompiler {
        &self.compiler
    }

    /// Produce the verification artifact of `dir`.
    pub async fn produce_artifact(&self, dir: &Path) -> Result<VerificationArtifact, RecompileError> {
        info!(dir = %dir.display(), "recompiling target");

        let candidates = self.verifier.check_paths(&self.compiler, &[dir.to_path_buf()]).await?;
        let candidate =
            candidates.into_iter().next().ok_or_else(|| RecompileError::NoCandidate(dir.into()))?;
        if !candidate.is_valid() {
            return Err(RecompileError::InvalidContract {
                path: dir.into(),
                name: candidate.name().to_string(),
            });
        }

        let recompiled = candidate.recompile(&self.compiler).await?;
        let metadata: ContractMetadata = serde_json::from_str(&recompiled.metadata)?;
        let storage_layout =
            metadata.storage_layout.ok_or_else(|| RecompileError::MissingStorageLayout(dir.into()))?;

        let libraries = load_library_map(dir)?;
        let runtime_bytecode = link_and_report(&recompiled.runtime_bytecode, libraries.as_ref());
        debug!(contract = %candidate.name(), size = runtime_bytecode.len() / 2, "recompiled");

        Ok(VerificationArtifact {
            runtime_bytecode,
            storage_layout,
            abi: metadata.abi.unwrap_or(Value::Null),
        })
    }

    /// Produce the artifact of `dir` and write it under `out_dir`.
    ///
    /// Nothing is written if production fails.
    pub async fn recompile_to(&self, dir: &Path, out_dir: &Path) -> Result<PathBuf, RecompileError> {
        let artifact = self.produce_artifact(dir).await?;
        save_artifact(out_dir, dir, &artifact)
    }
}
