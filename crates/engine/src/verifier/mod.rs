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

//! The contract verifier seam.
//!
//! A verifier turns target directories into [`CandidateContract`]s; the
//! orchestrator only ever looks at the first one.

use std::{future::Future, path::PathBuf};

use crate::{RecompileError, SolcCompiler};

pub mod sourcify;
pub use sourcify::*;

/// Output of recompiling one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecompiledContract {
    /// Synthesized metadata string: `{"storageLayout": ..., "abi": ...}`
    pub metadata: String,
    /// Runtime bytecode as hex, possibly with library placeholders
    pub runtime_bytecode: String,
}

/// A contract found in a target directory, ready to be recompiled.
pub trait CandidateContract: Send + Sync {
    /// Name of the contract.
    fn name(&self) -> &str;

    /// Whether every source of the contract was found and matched.
    fn is_valid(&self) -> bool;

    /// Recompile the contract with `compiler`.
    fn recompile(
        &self,
        compiler: &SolcCompiler,
    ) -> impl Future<Output = Result<RecompiledContract, RecompileError>> + Send;
}

/// Discovers candidate contracts in a set of paths.
pub trait ContractVerifier: Send + Sync {
    /// Candidate type produced by this verifier.
    type Candidate: CandidateContract;

    /// Every candidate contract found under `paths`.
    fn check_paths(
        &self,
        compiler: &SolcCompiler,
        paths: &[PathBuf],
    ) -> impl Future<Output = Result<Vec<Self::Candidate>, RecompileError>> + Send;
}
