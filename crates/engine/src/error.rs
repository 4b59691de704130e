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

//! Error types of the recompilation engine.
//!
//! A binary that is simply not published for a version/platform is not an
//! error: the fetcher and the cache report it as `None`.

use std::{io, path::PathBuf, time::Duration};

use serde_json::Value;
use thiserror::Error;

/// Failures of the on-disk compiler cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be created
    #[error("failed to create compiler cache directory {}: {source}", .path.display())]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
    /// A stale file could not be removed before being replaced
    #[error("failed to remove stale compiler {}: {source}", .path.display())]
    RemoveStale {
        /// Path of the stale file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
    /// The downloaded bytes could not be written
    #[error("failed to store compiler {}: {source}", .path.display())]
    Store {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Failures while running the compiler or interpreting its output.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The compiler cache could not be updated
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The native compiler could not be started
    #[error("failed to spawn compiler {}: {source}", .path.display())]
    Spawn {
        /// Path of the compiler binary
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
    /// The compiler wrote to stderr or exited unsuccessfully
    #[error("compiler process returned with errors:\n {stderr}")]
    Process {
        /// Content of the error stream, or the exit status when it was empty
        stderr: String,
    },
    /// An output stream exceeded the configured capacity
    #[error("compilation output size too large (more than {limit} bytes)")]
    OutputTooLarge {
        /// Configured capacity in bytes
        limit: usize,
    },
    /// The compiler did not exit in time and was killed
    #[error("compiler did not finish within {0:?}")]
    Timeout(Duration),
    /// The isolated worker of a legacy compiler failed without a result
    #[error("legacy compiler worker failed: {0}")]
    Worker(String),
    /// Neither the native nor the fallback path produced any output
    #[error("compilation failed: no output from the compiler")]
    NoOutput,
    /// The compiler output is not valid JSON
    #[error("failed to parse compiler output: {0}")]
    Json(#[from] serde_json::Error),
    /// I/O failure while exchanging data with the compiler
    #[error("I/O error while running the compiler: {0}")]
    Io(#[from] io::Error),
    /// The compiler reported at least one diagnostic of severity `error`
    #[error("compiler error:\n {}", Value::Array(.0.clone()))]
    Diagnostics(Vec<Value>),
}

impl CompileError {
    /// Whether the failure is caused by the size of the contract rather than by
    /// a broken toolchain.
    pub fn is_output_too_large(&self) -> bool {
        matches!(self, Self::OutputTooLarge { .. })
    }

    /// Fatal diagnostics reported by the compiler, if this is a diagnostic error.
    pub fn diagnostics(&self) -> Option<&[Value]> {
        match self {
            Self::Diagnostics(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}

/// Failures while producing a verification artifact for a target directory.
#[derive(Debug, Error)]
pub enum RecompileError {
    /// The compiler failed
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// The verifier found no candidate contract in the directory
    #[error("no candidate contract found in {}", .0.display())]
    NoCandidate(PathBuf),
    /// The first candidate did not pass the verifier's validity check
    #[error("candidate contract {name} in {} is not valid", .path.display())]
    InvalidContract {
        /// Target directory
        path: PathBuf,
        /// Name of the rejected candidate
        name: String,
    },
    /// The recompiled contract carries no storage layout
    #[error("recompilation of {} produced no storage layout", .0.display())]
    MissingStorageLayout(PathBuf),
    /// The source bundle could not be interpreted
    #[error("invalid source bundle: {0}")]
    Bundle(String),
    /// The library map next to the sources is malformed
    #[error("invalid library map {}: {source}", .path.display())]
    LibraryMap {
        /// Path of the library map
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
