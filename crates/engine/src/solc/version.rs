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

//! Compiler version strings.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;

/// Nightly builds are recorded on-chain with a `-ci.` pre-release tag, but the
/// binary repository only publishes them under `-nightly.`.
const CI_TAG: &str = "-ci.";
const NIGHTLY_TAG: &str = "-nightly.";

/// First release whose builds can safely share a process with other builds.
const ISOLATION_THRESHOLD: Version = Version::new(0, 4, 0);

static COERCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid version coercion pattern")
});

/// A compiler version such as `0.8.17+commit.8df45f5f`.
///
/// The canonical form is computed once, on construction: every later use
/// (cache path, download, fallback lookup) sees the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilerVersion(String);

impl CompilerVersion {
    /// Build the canonical version from a raw version string.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().replacen(CI_TAG, NIGHTLY_TAG, 1))
    }

    /// The canonical version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `major.minor.patch` part of the version, ignoring pre-release and
    /// build metadata. Missing components are zero.
    pub fn coerced(&self) -> Option<Version> {
        let caps = COERCE_PATTERN.captures(&self.0)?;
        let part = |i: usize| -> Option<u64> {
            caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        Some(Version::new(part(1)?, part(2)?, part(3)?))
    }

    /// Whether this build must run in an isolated worker on the fallback path.
    ///
    /// Builds older than 0.4.0 leave global state behind after a compilation.
    pub fn requires_isolation(&self) -> bool {
        self.coerced().is_some_and(|v| v < ISOLATION_THRESHOLD)
    }

    /// File name of the native binary for `platform`: `solc-<platform>-v<version>`.
    pub fn native_file_name(&self, platform: &str) -> String {
        format!("solc-{platform}-v{}", self.0)
    }

    /// File name of the `soljson` build: `soljson-v<version>.js`.
    pub fn soljson_file_name(&self) -> String {
        format!("soljson-v{}.js", self.0)
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CompilerVersion {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ci_tag_is_rewritten() {
        let ci = CompilerVersion::new("0.8.17-ci.2022.8.9+commit.6b60524c");
        let nightly = CompilerVersion::new("0.8.17-nightly.2022.8.9+commit.6b60524c");

        assert_eq!(ci, nightly);
        assert_eq!(ci.as_str(), "0.8.17-nightly.2022.8.9+commit.6b60524c");
    }

    #[test]
    fn test_release_is_untouched() {
        let version = CompilerVersion::new("0.8.17+commit.8df45f5f");
        assert_eq!(version.to_string(), "0.8.17+commit.8df45f5f");
    }

    #[test]
    fn test_coerced() {
        assert_eq!(
            CompilerVersion::new("0.4.26+commit.4563c3fc").coerced(),
            Some(Version::new(0, 4, 26))
        );
        assert_eq!(
            CompilerVersion::new("0.8.17-nightly.2022.8.9+commit.6b60524c").coerced(),
            Some(Version::new(0, 8, 17))
        );
        assert_eq!(CompilerVersion::new("v0.3").coerced(), Some(Version::new(0, 3, 0)));
        assert_eq!(CompilerVersion::new("latest").coerced(), None);
    }

    #[test]
    fn test_requires_isolation() {
        assert!(CompilerVersion::new("0.3.6+commit.3fc68da5").requires_isolation());
        assert!(CompilerVersion::new("0.1.1+commit.6ff4cd6").requires_isolation());
        assert!(!CompilerVersion::new("0.4.0+commit.acd334c9").requires_isolation());
        assert!(!CompilerVersion::new("0.8.17+commit.8df45f5f").requires_isolation());
        assert!(!CompilerVersion::new("nonsense").requires_isolation());
    }

    #[test]
    fn test_file_names() {
        let version = CompilerVersion::new("0.8.17+commit.8df45f5f");
        assert_eq!(
            version.native_file_name("linux-amd64"),
            "solc-linux-amd64-v0.8.17+commit.8df45f5f"
        );
        assert_eq!(version.soljson_file_name(), "soljson-v0.8.17+commit.8df45f5f.js");
    }
}
