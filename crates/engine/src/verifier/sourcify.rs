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

//! Verifier for Sourcify-style target directories.
//!
//! A target directory holds a compiler `metadata.json` and the source files it
//! references, anywhere below the directory. Sources are matched to metadata
//! entries by their `keccak256` hash, so file names and layout do not matter.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

use alloy_primitives::{keccak256, B256};
use serde_json::{json, Map, Value};
use tracing::{debug, trace, warn};

use crate::{
    CandidateContract, ContractVerifier, RecompileError, RecompiledContract, SolcCompiler,
};

/// Keys every compiler metadata document carries.
const METADATA_KEYS: [&str; 4] = ["compiler", "language", "settings", "sources"];

/// Verifier reading compiler metadata and sources from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourcifyVerifier;

impl SourcifyVerifier {
    /// New verifier.
    pub fn new() -> Self {
        Self
    }
}

impl ContractVerifier for SourcifyVerifier {
    type Candidate = SourcifyCandidate;

    async fn check_paths(
        &self,
        _compiler: &SolcCompiler,
        paths: &[PathBuf],
    ) -> Result<Vec<SourcifyCandidate>, RecompileError> {
        let mut files = Vec::new();
        for path in paths {
            collect_files(path, &mut files)?;
        }
        files.sort();

        let mut metadata = Vec::new();
        let mut sources = SourcePool::default();
        for file in &files {
            let Ok(content) = fs::read_to_string(file) else {
                trace!(path = %file.display(), "skipping non-text file");
                continue;
            };
            match serde_json::from_str::<Value>(&content) {
                Ok(json) if is_metadata(&json) => metadata.push((file.clone(), json)),
                _ => sources.insert(content),
            }
        }

        metadata
            .into_iter()
            .map(|(path, json)| SourcifyCandidate::from_metadata(&path, &json, &sources))
            .collect()
    }
}

/// A contract described by one metadata document.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcifyCandidate {
    name: String,
    target_file: String,
    compiler_version: String,
    input: Value,
    missing: Vec<String>,
}

impl SourcifyCandidate {
    fn from_metadata(
        path: &Path,
        metadata: &Value,
        pool: &SourcePool,
    ) -> Result<Self, RecompileError> {
        let invalid = |what: &str| RecompileError::Bundle(format!("{}: {what}", path.display()));

        let compiler_version = metadata
            .pointer("/compiler/version")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing compiler version"))?;
        let settings = metadata
            .get("settings")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("missing settings"))?;
        let (target_file, name) = settings
            .get("compilationTarget")
            .and_then(Value::as_object)
            .and_then(|target| target.iter().next())
            .and_then(|(file, name)| Some((file.clone(), name.as_str()?.to_string())))
            .ok_or_else(|| invalid("missing compilation target"))?;

        let mut sources = Map::new();
        let mut missing = Vec::new();
        let entries = metadata.get("sources").and_then(Value::as_object).into_iter().flatten();
        for (file, entry) in entries {
            match pool.content_for(entry) {
                Some(content) => {
                    sources.insert(file.clone(), json!({ "content": content }));
                }
                None => {
                    debug!(%file, "source not found");
                    missing.push(file.clone());
                }
            }
        }

        let input = json!({
            "language": metadata.get("language").cloned().unwrap_or_else(|| "Solidity".into()),
            "sources": sources,
            "settings": compiler_settings(settings),
        });

        debug!(
            contract = %name,
            version = %compiler_version,
            metadata = %path.display(),
            missing = missing.len(),
            "found candidate contract"
        );
        Ok(Self {
            name,
            target_file,
            compiler_version: compiler_version.to_string(),
            input,
            missing,
        })
    }

    /// Source file declaring the contract.
    pub fn target_file(&self) -> &str {
        &self.target_file
    }

    /// Compiler version recorded in the metadata.
    pub fn compiler_version(&self) -> &str {
        &self.compiler_version
    }

    /// The reconstructed standard-JSON request.
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Sources listed in the metadata that could not be found.
    pub fn missing_sources(&self) -> &[String] {
        &self.missing
    }
}

impl CandidateContract for SourcifyCandidate {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }

    async fn recompile(&self, compiler: &SolcCompiler) -> Result<RecompiledContract, RecompileError> {
        let result = compiler.compile(&self.compiler_version, self.input.clone(), false).await?;

        let missing_output = |what: &str| {
            RecompileError::Bundle(format!(
                "no {what} for {}:{} in compiler output",
                self.target_file, self.name
            ))
        };
        let metadata = result
            .metadata(&self.target_file, &self.name)
            .ok_or_else(|| missing_output("metadata"))?;
        let runtime_bytecode = result
            .deployed_bytecode(&self.target_file, &self.name)
            .ok_or_else(|| missing_output("runtime bytecode"))?;

        Ok(RecompiledContract {
            metadata: metadata.to_string(),
            runtime_bytecode: runtime_bytecode.to_string(),
        })
    }
}

/// Source contents indexed by hash.
#[derive(Debug, Default)]
struct SourcePool {
    by_hash: HashMap<B256, String>,
}

impl SourcePool {
    /// Index `content` under its own hash and under the hashes of its LF and
    /// CRLF renditions.
    fn insert(&mut self, content: String) {
        let lf = content.replace("\r\n", "\n");
        let crlf = lf.replace('\n', "\r\n");
        for variant in [lf, crlf] {
            self.by_hash.entry(keccak256(variant.as_bytes())).or_insert(variant);
        }
        self.by_hash.entry(keccak256(content.as_bytes())).or_insert(content);
    }

    /// Content matching the `keccak256` of a metadata source entry. Inline
    /// `content` is used when it matches the hash.
    fn content_for(&self, entry: &Value) -> Option<String> {
        let hash: B256 = entry.get("keccak256")?.as_str()?.parse().ok()?;
        if let Some(content) = entry.get("content").and_then(Value::as_str) {
            if keccak256(content.as_bytes()) == hash {
                return Some(content.to_string());
            }
            warn!(%hash, "inline source does not match its hash");
        }
        self.by_hash.get(&hash).cloned()
    }
}

fn is_metadata(json: &Value) -> bool {
    json.as_object().is_some_and(|object| METADATA_KEYS.iter().all(|key| object.contains_key(*key)))
}

/// Compiler settings from metadata settings: without `compilationTarget`, with
/// `file:Name` library keys split into the nested form, and with an output
/// selection covering bytecode and metadata.
fn compiler_settings(settings: &Map<String, Value>) -> Value {
    let mut settings = settings.clone();
    settings.remove("compilationTarget");

    let libraries = settings.get("libraries").and_then(Value::as_object).map(|libraries| {
        let mut nested: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
        for (key, address) in libraries {
            let (file, name) = key.rsplit_once(':').unwrap_or(("", key));
            nested.entry(file.to_string()).or_default().insert(name.to_string(), address.clone());
        }
        nested
    });
    if let Some(libraries) = libraries {
        settings.insert("libraries".into(), json!(libraries));
    }

    settings.insert(
        "outputSelection".into(),
        json!({
            "*": {
                "*": ["abi", "evm.bytecode.object", "evm.deployedBytecode.object", "metadata"]
            }
        }),
    );
    Value::Object(settings)
}

fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    if path.is_file() {
        files.push(path.to_path_buf());
        return Ok(());
    }
    for entry in fs::read_dir(path)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
