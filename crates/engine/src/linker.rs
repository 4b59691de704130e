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

//! Post-link substitution of library placeholders in runtime bytecode.

use std::{fs, io, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::RecompileError;

/// Name of the optional library map inside a target directory.
pub const LIBRARY_MAP_FILE: &str = "library-map.json";

/// Placeholder styles emitted by the compiler: `__$<34 hex>$__` since 0.5.0,
/// `__<36 chars>__` before.
static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"__\$[0-9a-fA-F]{34}\$__|__.{36}__").expect("valid placeholder pattern")
});

/// Placeholder token to library address, as stored in `library-map.json`.
///
/// Entries keep the order of the file, which is the order substitutions are
/// applied in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct LibraryMap(Vec<(String, String)>);

impl LibraryMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(placeholder, address)| (placeholder.as_str(), address.as_str()))
    }
}

impl TryFrom<Map<String, Value>> for LibraryMap {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        map.into_iter()
            .map(|(placeholder, address)| match address {
                Value::String(address) => Ok((placeholder, address)),
                other => Err(format!("address of `{placeholder}` is not a string: {other}")),
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl FromIterator<(String, String)> for LibraryMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Replace every literal occurrence of each placeholder of `libraries` in
/// `bytecode` with its address. `None` or an empty map leaves it unchanged.
pub fn link(bytecode: &str, libraries: Option<&LibraryMap>) -> String {
    let Some(libraries) = libraries else {
        return bytecode.to_string();
    };

    let mut linked = bytecode.to_string();
    for (placeholder, address) in libraries.iter() {
        if placeholder.is_empty() {
            continue;
        }
        linked = linked.replace(placeholder, address);
    }
    linked
}

/// Load `<dir>/library-map.json`. A missing file is not an error.
pub fn load_library_map(dir: &Path) -> Result<Option<LibraryMap>, RecompileError> {
    let path = dir.join(LIBRARY_MAP_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let libraries: LibraryMap = serde_json::from_str(&content)
        .map_err(|source| RecompileError::LibraryMap { path: path.clone(), source })?;
    debug!(path = %path.display(), libraries = libraries.len(), "loaded library map");
    Ok(Some(libraries))
}

/// Placeholders still present in `bytecode`, in order of appearance.
pub fn unlinked_placeholders(bytecode: &str) -> Vec<&str> {
    PLACEHOLDER_PATTERN.find_iter(bytecode).map(|m| m.as_str()).collect()
}

/// [`link`], then warn about any placeholder left behind.
pub fn link_and_report(bytecode: &str, libraries: Option<&LibraryMap>) -> String {
    let linked = link(bytecode, libraries);
    let unlinked = unlinked_placeholders(&linked);
    if !unlinked.is_empty() {
        warn!(?unlinked, "runtime bytecode still references unlinked libraries");
    }
    linked
}
