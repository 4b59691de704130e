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

//! The compiler invoker.
//!
//! [`SolcCompiler::compile`] turns a standard-JSON request and a version
//! string into a normalized [`CompilationResult`]. The native binary is
//! preferred; when the binary repository has no build for the version (or the
//! caller forces it) the request goes to a `soljson` module instead.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::{
    augment_selection, fatal_diagnostics, format_diagnostics, run_module, run_standard_json,
    synthesize_metadata, BinaryCache, CompilationResult, CompileError, CompilerConfig,
    CompilerVersion, ProcessLimits, SolcJsProvider, SolcJsRunner,
};

/// Compiles standard-JSON requests with a specific compiler version.
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    config: CompilerConfig,
    cache: BinaryCache,
    solcjs: Arc<dyn SolcJsProvider>,
}

impl SolcCompiler {
    /// Compiler backed by the binary cache and `soljson` runner of `config`.
    pub fn new(config: CompilerConfig) -> Self {
        let cache = BinaryCache::new(&config);
        let solcjs = Arc::new(SolcJsRunner::from_config(cache.clone(), &config));
        Self { config, cache, solcjs }
    }

    /// Replace the provider used on the fallback path.
    pub fn with_solcjs_provider(mut self, provider: Arc<dyn SolcJsProvider>) -> Self {
        self.solcjs = provider;
        self
    }

    /// The configuration this compiler was built with.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// The cache native binaries are resolved from.
    pub fn binary_cache(&self) -> &BinaryCache {
        &self.cache
    }

    /// Compile `request` with compiler `version`.
    ///
    /// The output selection of the request is extended with the outputs every
    /// artifact needs. Any diagnostic of severity `error` fails the call, even
    /// when bytecode was produced. On success each contract carries a
    /// synthesized `metadata` string with its storage layout and ABI.
    pub async fn compile(
        &self,
        version: &str,
        mut request: Value,
        force_fallback: bool,
    ) -> Result<CompilationResult, CompileError> {
        let version = CompilerVersion::new(version);
        augment_selection(&mut request);
        let input = serde_json::to_string(&request)?;

        let raw = if force_fallback || self.config.force_fallback {
            debug!(%version, "fallback forced");
            self.compile_with_module(&version, input).await?
        } else {
            match self.cache.resolve(&self.config.platform, &version).await? {
                Some(binary) => {
                    debug!(%version, binary = %binary.display(), "compiling with native binary");
                    Some(run_standard_json(&binary, input.as_bytes(), self.limits()).await?)
                }
                None => {
                    info!(%version, platform = %self.config.platform, "no native build, falling back to soljson");
                    self.compile_with_module(&version, input).await?
                }
            }
        };

        let raw = raw.filter(|raw| !raw.trim().is_empty()).ok_or(CompileError::NoOutput)?;
        let mut output: Value = serde_json::from_str(&raw)?;

        let fatal = fatal_diagnostics(&output);
        if !fatal.is_empty() {
            error!(%version, "compilation failed:{}", format_diagnostics(&fatal, &request));
            return Err(CompileError::Diagnostics(fatal));
        }

        synthesize_metadata(&mut output);
        Ok(CompilationResult::new(output))
    }

    /// Run `input` through the `soljson` module of `version`, if there is one.
    async fn compile_with_module(
        &self,
        version: &CompilerVersion,
        input: String,
    ) -> Result<Option<String>, CompileError> {
        match self.solcjs.module_for(version).await? {
            Some(module) => Ok(Some(run_module(module, version, input).await?)),
            None => {
                info!(%version, "no soljson build available");
                Ok(None)
            }
        }
    }

    fn limits(&self) -> ProcessLimits {
        ProcessLimits::from(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{install_fake_solc, FakeModule, FakeProvider},
        DEFAULT_SOLC_PLATFORM, LEGACY_WORKER_NAME, SOLJSON_PLATFORM,
    };
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    const VERSION: &str = "0.8.17+commit.8df45f5f";

    fn offline_config(dir: &TempDir) -> CompilerConfig {
        CompilerConfig::default().with_cache_root(dir.path()).with_repository_url("http://127.0.0.1:9")
    }

    fn request() -> Value {
        json!({
            "language": "Solidity",
            "sources": { "A.sol": { "content": "contract A {}" } },
            "settings": { "outputSelection": { "*": { "*": ["abi"] } } }
        })
    }

    fn output() -> Value {
        json!({
            "contracts": {
                "A.sol": {
                    "A": {
                        "abi": [],
                        "storageLayout": { "storage": [], "types": null },
                        "evm": { "deployedBytecode": { "object": "6080" } }
                    }
                }
            },
            "sources": { "A.sol": { "id": 0 } }
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_native_compile_synthesizes_metadata() {
        let dir = TempDir::new().unwrap();
        install_fake_solc(dir.path(), DEFAULT_SOLC_PLATFORM, VERSION, &output());
        let provider = Arc::new(FakeProvider::empty());
        let compiler = SolcCompiler::new(offline_config(&dir)).with_solcjs_provider(provider.clone());

        let result = compiler.compile(VERSION, request(), false).await.unwrap();

        assert_eq!(result.deployed_bytecode("A.sol", "A"), Some("6080"));
        let metadata: Value = serde_json::from_str(result.metadata("A.sol", "A").unwrap()).unwrap();
        assert_eq!(metadata, json!({ "storageLayout": { "storage": [], "types": null }, "abi": [] }));
        assert!(provider.requests().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_error_diagnostic_fails_even_with_bytecode() {
        let dir = TempDir::new().unwrap();
        let mut output = output();
        output["errors"] = json!([
            { "severity": "warning", "message": "shadowing", "type": "Warning", "component": "general" },
            { "severity": "error", "message": "bad", "type": "TypeError", "component": "general" }
        ]);
        install_fake_solc(dir.path(), DEFAULT_SOLC_PLATFORM, VERSION, &output);
        let compiler = SolcCompiler::new(offline_config(&dir));

        let err = compiler.compile(VERSION, request(), false).await.unwrap_err();

        let diagnostics = err.diagnostics().expect("diagnostic error");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0]["message"], "bad");
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_warnings_do_not_fail() {
        let dir = TempDir::new().unwrap();
        let mut output = output();
        output["errors"] = json!([{ "severity": "warning", "message": "unused" }]);
        install_fake_solc(dir.path(), DEFAULT_SOLC_PLATFORM, VERSION, &output);
        let compiler = SolcCompiler::new(offline_config(&dir));

        assert!(compiler.compile(VERSION, request(), false).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_request_selection_is_augmented() {
        let dir = TempDir::new().unwrap();
        // The fake compiler answers with its own input, so the request shows up as output.
        let binary = install_fake_solc(dir.path(), DEFAULT_SOLC_PLATFORM, VERSION, &json!({}));
        crate::test_utils::write_script(
            binary.parent().unwrap(),
            binary.file_name().unwrap().to_str().unwrap(),
            "cat",
        );
        let compiler = SolcCompiler::new(offline_config(&dir));

        let result = compiler.compile(VERSION, request(), false).await.unwrap();

        assert_eq!(
            result.json()["settings"]["outputSelection"]["*"]["*"],
            json!(["abi", "storageLayout", "evm.deployedBytecode.object"])
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_ci_and_nightly_share_binary() {
        let dir = TempDir::new().unwrap();
        install_fake_solc(
            dir.path(),
            DEFAULT_SOLC_PLATFORM,
            "0.8.17-nightly.2022.8.9+commit.6b60524c",
            &output(),
        );
        let provider = Arc::new(FakeProvider::empty());
        let compiler = SolcCompiler::new(offline_config(&dir)).with_solcjs_provider(provider.clone());

        let result = compiler
            .compile("0.8.17-ci.2022.8.9+commit.6b60524c", request(), false)
            .await
            .unwrap();

        assert_eq!(result.deployed_bytecode("A.sol", "A"), Some("6080"));
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_falls_back() {
        let dir = TempDir::new().unwrap();
        let module = Arc::new(FakeModule::new(output().to_string()));
        let provider = Arc::new(FakeProvider::new(module.clone()));
        let compiler = SolcCompiler::new(offline_config(&dir)).with_solcjs_provider(provider.clone());

        let result = compiler.compile(VERSION, request(), false).await.unwrap();

        assert_eq!(result.deployed_bytecode("A.sol", "A"), Some("6080"));
        assert_eq!(provider.requests(), vec![CompilerVersion::new(VERSION)]);
        assert_eq!(module.threads().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_forced_fallback_skips_native() {
        let dir = TempDir::new().unwrap();
        install_fake_solc(dir.path(), DEFAULT_SOLC_PLATFORM, VERSION, &json!({ "contracts": {} }));
        let module = Arc::new(FakeModule::new(output().to_string()));
        let compiler = SolcCompiler::new(offline_config(&dir))
            .with_solcjs_provider(Arc::new(FakeProvider::new(module.clone())));

        let result = compiler.compile(VERSION, request(), true).await.unwrap();
        assert_eq!(result.deployed_bytecode("A.sol", "A"), Some("6080"));

        let forced = SolcCompiler::new(offline_config(&dir).with_force_fallback(true))
            .with_solcjs_provider(Arc::new(FakeProvider::new(module.clone())));
        forced.compile(VERSION, request(), false).await.unwrap();

        assert_eq!(module.threads().len(), 2);
    }

    #[tokio::test]
    async fn test_legacy_fallback_runs_isolated() {
        let dir = TempDir::new().unwrap();
        let module = Arc::new(FakeModule::new(output().to_string()));
        let compiler = SolcCompiler::new(offline_config(&dir))
            .with_solcjs_provider(Arc::new(FakeProvider::new(module.clone())));

        compiler.compile("0.3.6+commit.3fc68da5", request(), false).await.unwrap();

        assert_eq!(module.threads(), vec![Some(LEGACY_WORKER_NAME.to_string())]);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_fallback_honors_configured_timeout() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(&dir)
            .with_timeout(std::time::Duration::from_millis(300))
            .with_solcjs_runner(dir.path().join("runner.js"));
        let cache = BinaryCache::new(&config);
        let version = CompilerVersion::new(VERSION);
        let soljson = cache.file_path(SOLJSON_PLATFORM, &version.soljson_file_name());
        std::fs::create_dir_all(soljson.parent().unwrap()).unwrap();
        std::fs::write(&soljson, "// soljson").unwrap();
        let node = crate::test_utils::write_script(dir.path(), "node", "sleep 3\necho '{}'");

        let runner = SolcJsRunner::from_config(cache, &config).with_interpreter(node);
        let compiler = SolcCompiler::new(config).with_solcjs_provider(Arc::new(runner));

        let started = std::time::Instant::now();
        let err = compiler.compile(VERSION, request(), true).await.unwrap_err();
        assert!(matches!(err, CompileError::Timeout(_)), "{err}");
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_no_build_anywhere() {
        let dir = TempDir::new().unwrap();
        let compiler = SolcCompiler::new(offline_config(&dir))
            .with_solcjs_provider(Arc::new(FakeProvider::empty()));

        let err = compiler.compile(VERSION, request(), false).await.unwrap_err();
        assert!(matches!(err, CompileError::NoOutput), "{err}");
    }

    #[tokio::test]
    async fn test_empty_module_output() {
        let dir = TempDir::new().unwrap();
        let compiler = SolcCompiler::new(offline_config(&dir))
            .with_solcjs_provider(Arc::new(FakeProvider::new(Arc::new(FakeModule::new("  ")))));

        let err = compiler.compile(VERSION, request(), true).await.unwrap_err();
        assert!(matches!(err, CompileError::NoOutput), "{err}");
    }
}
