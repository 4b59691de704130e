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

//! Shaping of compiler requests and outputs.
//!
//! Requests and outputs are handled as untyped JSON so that fields unknown to
//! this crate (or specific to some compiler vintage) pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

/// Outputs every compilation must produce, in the order they are appended.
pub const REQUIRED_OUTPUTS: [&str; 3] = ["storageLayout", "abi", "evm.deployedBytecode.object"];

/// Wildcard selecting every file, and every contract within a file.
const WILDCARD: &str = "*";

/// The structural metadata of one contract, as attached under `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    /// Storage slot assignments
    #[serde(default)]
    pub storage_layout: Option<Value>,
    /// Contract ABI
    #[serde(default)]
    pub abi: Option<Value>,
}

/// Parsed compiler output.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationResult(Value);

impl CompilationResult {
    /// Wrap a parsed output.
    pub fn new(json: Value) -> Self {
        Self(json)
    }

    /// The raw JSON document.
    pub fn json(&self) -> &Value {
        &self.0
    }

    /// Consume the result, returning the raw JSON document.
    pub fn into_json(self) -> Value {
        self.0
    }

    /// The output entry of contract `name` in source `file`.
    pub fn contract(&self, file: &str, name: &str) -> Option<&Value> {
        self.0.get("contracts")?.get(file)?.get(name)
    }

    /// Iterate over `(file, name, entry)` for every contract in the output.
    pub fn contracts(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.0
            .get("contracts")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|files| files.iter())
            .filter_map(|(file, contracts)| Some((file, contracts.as_object()?)))
            .flat_map(|(file, contracts)| {
                contracts.iter().map(move |(name, entry)| (file.as_str(), name.as_str(), entry))
            })
    }

    /// The synthesized `metadata` string of contract `name` in `file`.
    pub fn metadata(&self, file: &str, name: &str) -> Option<&str> {
        self.contract(file, name)?.get("metadata")?.as_str()
    }

    /// The runtime bytecode (`evm.deployedBytecode.object`) of `name` in `file`.
    pub fn deployed_bytecode(&self, file: &str, name: &str) -> Option<&str> {
        self.contract(file, name)?.pointer("/evm/deployedBytecode/object")?.as_str()
    }
}

/// Make sure the `*`/`*` output selection of `request` contains every
/// [`REQUIRED_OUTPUTS`] entry. Existing entries keep their order; missing
/// ones are appended. Applying it twice is the same as applying it once.
pub fn augment_selection(request: &mut Value) {
    let selection = child_object(request, "settings")
        .and_then(|settings| child_object(settings, "outputSelection"))
        .and_then(|output| child_object(output, WILDCARD))
        .and_then(Value::as_object_mut);
    let Some(file_selection) = selection else {
        warn!("compilation request is not a JSON object tree, output selection left untouched");
        return;
    };

    let outputs = file_selection.entry(WILDCARD).or_insert_with(|| Value::Array(Vec::new()));
    if !outputs.is_array() {
        warn!("replacing malformed contract output selection {outputs}");
        *outputs = Value::Array(Vec::new());
    }
    if let Value::Array(outputs) = outputs {
        for required in REQUIRED_OUTPUTS {
            if !outputs.iter().any(|o| o.as_str() == Some(required)) {
                outputs.push(required.into());
            }
        }
    }
}

/// The child object `key` of `value`, created when missing. `None` when
/// `value` or the existing child is not an object.
fn child_object<'a>(value: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    let child = value.as_object_mut()?.entry(key).or_insert_with(|| Value::Object(Map::new()));
    if child.is_object() {
        Some(child)
    } else {
        None
    }
}

/// Every diagnostic of `output` whose severity is `error`.
pub fn fatal_diagnostics(output: &Value) -> Vec<Value> {
    output
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter(|e| e.get("severity").and_then(Value::as_str) == Some("error"))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Attach to every contract of `output` a `metadata` string holding exactly
/// its `storageLayout` and `abi` (`null` when the compiler emitted none).
/// Any previous `metadata` value is overwritten.
pub fn synthesize_metadata(output: &mut Value) {
    let Some(files) = output.get_mut("contracts").and_then(Value::as_object_mut) else {
        return;
    };

    for contract in files
        .values_mut()
        .filter_map(Value::as_object_mut)
        .flat_map(|contracts| contracts.values_mut())
        .filter_map(Value::as_object_mut)
    {
        let metadata = json!({
            "storageLayout": contract.get("storageLayout").cloned().unwrap_or(Value::Null),
            "abi": contract.get("abi").cloned().unwrap_or(Value::Null),
        });
        contract.insert("metadata".into(), Value::String(metadata.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(request: &Value) -> Vec<&str> {
        request["settings"]["outputSelection"]["*"]["*"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_augment_appends_missing_outputs() {
        let mut request = json!({
            "language": "Solidity",
            "settings": { "outputSelection": { "*": { "*": ["metadata", "abi"], "": ["ast"] } } }
        });

        augment_selection(&mut request);

        assert_eq!(
            selection(&request),
            vec!["metadata", "abi", "storageLayout", "evm.deployedBytecode.object"]
        );
        assert_eq!(request["settings"]["outputSelection"]["*"][""], json!(["ast"]));
    }

    #[test]
    fn test_augment_is_idempotent() {
        let mut once = json!({ "settings": { "outputSelection": { "*": { "*": ["evm.bytecode"] } } } });
        augment_selection(&mut once);
        let mut twice = once.clone();
        augment_selection(&mut twice);

        assert_eq!(once, twice);
        assert_eq!(selection(&twice).len(), 4);
    }

    #[test]
    fn test_augment_creates_selection() {
        let mut request = json!({ "language": "Solidity", "sources": {} });
        augment_selection(&mut request);
        assert_eq!(selection(&request), REQUIRED_OUTPUTS.to_vec());
    }

    #[test]
    fn test_augment_leaves_other_files_alone() {
        let mut request = json!({
            "settings": { "outputSelection": { "A.sol": { "A": ["abi"] } } }
        });
        augment_selection(&mut request);

        assert_eq!(request["settings"]["outputSelection"]["A.sol"]["A"], json!(["abi"]));
        assert_eq!(selection(&request), REQUIRED_OUTPUTS.to_vec());
    }

    #[test]
    fn test_augment_ignores_non_object_request() {
        let mut request = json!(["not", "a", "request"]);
        augment_selection(&mut request);
        assert_eq!(request, json!(["not", "a", "request"]));
    }

    #[test]
    fn test_fatal_diagnostics() {
        let output = json!({
            "errors": [
                { "severity": "warning", "message": "unused variable" },
                { "severity": "error", "message": "undeclared identifier" },
                { "severity": "info", "message": "note" }
            ],
            "contracts": { "A.sol": { "A": { "evm": { "deployedBytecode": { "object": "6000" } } } } }
        });

        let fatal = fatal_diagnostics(&output);
        assert_eq!(fatal.len(), 1);
        assert_eq!(fatal[0]["message"], "undeclared identifier");

        assert!(fatal_diagnostics(&json!({ "contracts": {} })).is_empty());
    }

    #[test]
    fn test_synthesized_metadata_has_exactly_two_keys() {
        let mut output = json!({
            "contracts": {
                "A.sol": {
                    "A": {
                        "abi": [{ "type": "function", "name": "f" }],
                        "storageLayout": { "storage": [], "types": null },
                        "metadata": "{\"compiler\":{\"version\":\"0.8.17\"}}",
                        "evm": { "deployedBytecode": { "object": "6000" } }
                    },
                    "L": { "abi": [] }
                }
            }
        });

        synthesize_metadata(&mut output);
        let result = CompilationResult::new(output);

        let metadata: Value = serde_json::from_str(result.metadata("A.sol", "A").unwrap()).unwrap();
        let keys: Vec<&String> = metadata.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["storageLayout", "abi"]);
        assert_eq!(metadata["abi"][0]["name"], "f");
        assert_eq!(metadata["storageLayout"]["storage"], json!([]));

        let library: ContractMetadata =
            serde_json::from_str(result.metadata("A.sol", "L").unwrap()).unwrap();
        assert_eq!(library.storage_layout, None);
        assert_eq!(library.abi, Some(json!([])));

        assert_eq!(result.deployed_bytecode("A.sol", "A"), Some("6000"));
        assert_eq!(result.contracts().count(), 2);
    }

    #[test]
    fn test_synthesize_without_contracts() {
        let mut output = json!({ "errors": [] });
        synthesize_metadata(&mut output);
        assert_eq!(output, json!({ "errors": [] }));
    }
}
