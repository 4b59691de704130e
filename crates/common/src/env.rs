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

//! Environment variable name constants for Relic configuration.
//!
//! Every environment variable read by Relic is named here, so the CLI, the
//! engine and the tests agree on a single spelling.
//!
//! # Environment Variables
//!
//! - [`RELIC_CACHE_DIR`] - Root of the compiler cache
//! - [`RELIC_SOLC_PLATFORM`] - Platform key of the native compiler binaries
//! - [`RELIC_SOLC_REPOSITORY`] - Root URL of the compiler binary repository
//! - [`RELIC_SOLC_TIMEOUT`] - Wall-clock limit for one compiler run
//! - [`RELIC_SOLCJS_RUNNER`] - Script driving `soljson` builds for the fallback path

/// Environment variable for specifying the cache directory.
///
/// Downloaded compilers are stored under `<dir>/solc/<platform>/`.
///
/// # Default
///
/// When not set, Relic uses `~/.relic/cache` (see
/// [`RelicCachePath`](crate::RelicCachePath)).
///
/// # Examples
///
/// ```bash
/// RELIC_CACHE_DIR=/tmp/relic-cache relic recompile ./contracts/0xabc
/// ```
pub const RELIC_CACHE_DIR: &str = "RELIC_CACHE_DIR";

/// Environment variable selecting the platform directory of the binary
/// repository, e.g. `linux-amd64` or `macosx-amd64`.
///
/// The value is fixed per deployment and is never negotiated at runtime.
pub const RELIC_SOLC_PLATFORM: &str = "RELIC_SOLC_PLATFORM";

/// Environment variable overriding the root URL of the compiler binary
/// repository (defaults to `https://binaries.soliditylang.org`).
pub const RELIC_SOLC_REPOSITORY: &str = "RELIC_SOLC_REPOSITORY";

/// Environment variable limiting, in seconds, how long a single compiler
/// process may run before it is killed.
///
/// # Value Format
///
/// Must be a valid `u64`. When unset there is no limit.
pub const RELIC_SOLC_TIMEOUT: &str = "RELIC_SOLC_TIMEOUT";

/// Environment variable pointing at the runner script used to execute
/// `soljson` builds when no native compiler exists for a version.
///
/// The runner is invoked as `node <runner> <soljson.js>` and must read a
/// standard-JSON request on stdin and write the response on stdout.
pub const RELIC_SOLCJS_RUNNER: &str = "RELIC_SOLCJS_RUNNER";
