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

//! The verification artifact and its on-disk form.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::RecompileError;

/// Name used for directories without a final path component.
const UNNAMED_ARTIFACT: &str = "unnamed";

/// Runtime bytecode and structural metadata of a recompiled contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationArtifact {
    /// Linked runtime bytecode, hex without `0x`
    pub runtime_bytecode: String,
    /// Storage layout as emitted by the compiler
    pub storage_layout: Value,
    /// Contract ABI, `null` if the compiler emitted none
    pub abi: Value,
}

/// Artifact name of a target directory: its last path component.
pub fn artifact_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNNAMED_ARTIFACT.to_string())
}

/// Write `artifact` for target directory `dir` to `<out_dir>/<name>.json`.
pub fn save_artifact(
    out_dir: &Path,
    dir: &Path,
    artifact: &VerificationArtifact,
) -> Result<PathBuf, RecompileError> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}.json", artifact_name(dir)));
    fs::write(&path, serde_json::to_string(artifact)?)?;
    info!(path = %path.display(), "saved verification artifact");
    Ok(path)
}
