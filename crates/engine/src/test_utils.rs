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

//! Test utilities: fake compilers and fake `soljson` modules.
//!
//! These helpers let unit and integration tests drive the whole pipeline
//! without network access or a real Solidity toolchain. The module exists
//! only in test builds and behind the `test-utils` feature.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{CompileError, CompilerModule, CompilerVersion, SolcJsProvider};

/// Write an executable `/bin/sh` script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create script directory");
    }
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    }
    path
}

/// Write a fake native compiler that ignores its input and prints `output`.
///
/// The script is placed where the binary cache of `cache_root` expects the
/// build of `version` for `platform`, so no download happens.
pub fn install_fake_solc(
    cache_root: &Path,
    platform: &str,
    version: &str,
    output: &Value,
) -> PathBuf {
    let version = CompilerVersion::new(version);
    let dir = cache_root.join("solc").join(platform);
    let body = format!("cat > /dev/null\ncat <<'RELIC_EOF'\n{output}\nRELIC_EOF");
    write_script(&dir, &version.native_file_name(platform), &body)
}

/// A compiler module returning a canned output and recording the thread
/// every compilation ran on.
#[derive(Debug, Default)]
pub struct FakeModule {
    output: String,
    threads: Mutex<Vec<Option<String>>>,
}

impl FakeModule {
    /// New module answering every request with `output`.
    pub fn new(output: impl Into<String>) -> Self {
        Self { output: output.into(), threads: Mutex::new(Vec::new()) }
    }

    /// Names of the threads the module was called on, in call order.
    pub fn threads(&self) -> Vec<Option<String>> {
        self.threads.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl CompilerModule for FakeModule {
    fn compile<'a>(&'a self, _input: &'a str) -> BoxFuture<'a, Result<String, CompileError>> {
        Box::pin(async move {
            if let Ok(mut threads) = self.threads.lock() {
                threads.push(std::thread::current().name().map(str::to_owned));
            }
            Ok(self.output.clone())
        })
    }
}

/// A provider handing out the same module for every version, or none at all.
#[derive(Debug, Default)]
pub struct FakeProvider {
    module: Option<Arc<FakeModule>>,
    requests: Mutex<Vec<CompilerVersion>>,
}

impl FakeProvider {
    /// Provider serving `module`.
    pub fn new(module: Arc<FakeModule>) -> Self {
        Self { module: Some(module), requests: Mutex::new(Vec::new()) }
    }

    /// Provider that has no module for any version.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Versions requested so far.
    pub fn requests(&self) -> Vec<CompilerVersion> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl SolcJsProvider for FakeProvider {
    fn module_for<'a>(
        &'a self,
        version: &'a CompilerVersion,
    ) -> BoxFuture<'a, Result<Option<Arc<dyn CompilerModule>>, CompileError>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(version.clone());
        }
        let module = self.module.clone().map(|m| m as Arc<dyn CompilerModule>);
        Box::pin(async move { Ok(module) })
    }
}
