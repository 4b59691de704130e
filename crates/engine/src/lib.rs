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

//! Compiler acquisition, invocation and artifact extraction for Relic.
//!
//! [`SolcCompiler`] resolves a native `solc` build through the [`BinaryCache`]
//! (downloading it with the [`RemoteFetcher`] on first use), falls back to a
//! `soljson` [`CompilerModule`] when no native build exists, and normalizes
//! the output. The [`Orchestrator`] drives a [`ContractVerifier`] over a
//! target directory and turns the recompiled contract into a
//! [`VerificationArtifact`].

pub mod config;
pub use config::*;

pub mod diagnostics;
pub use diagnostics::*;

pub mod error;
pub use error::*;

pub mod linker;
pub use linker::*;

pub mod orchestration;
pub use orchestration::*;

pub mod output;
pub use output::*;

pub mod solc;
pub use solc::*;

pub mod verifier;
pub use verifier::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
