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

//! Fallback compilation through `soljson` builds.
//!
//! When no native binary exists for a version, the compiler is obtained as a
//! [`CompilerModule`] from a [`SolcJsProvider`]. Builds older than 0.4.0 are
//! run on a dedicated worker thread with its own runtime and answer through a
//! one-shot channel; newer builds are awaited in place.

use std::{fmt, path::PathBuf, sync::Arc, thread};

use futures::future::BoxFuture;
use tokio::{runtime, sync::oneshot};
use tracing::{debug, info};

use crate::{
    run_piped, BinaryCache, CompileError, CompilerConfig, CompilerVersion, ProcessLimits,
    SOLJSON_PLATFORM,
};

/// Name of the worker thread running legacy builds.
pub const LEGACY_WORKER_NAME: &str = "solc-legacy-worker";

/// A compiler that takes a serialized standard-JSON request and returns the
/// serialized response.
pub trait CompilerModule: fmt::Debug + Send + Sync {
    /// Compile `input`.
    fn compile<'a>(&'a self, input: &'a str) -> BoxFuture<'a, Result<String, CompileError>>;
}

/// Source of [`CompilerModule`]s for arbitrary versions.
pub trait SolcJsProvider: fmt::Debug + Send + Sync {
    /// The module for `version`, or `None` if the version is not available.
    fn module_for<'a>(
        &'a self,
        version: &'a CompilerVersion,
    ) -> BoxFuture<'a, Result<Option<Arc<dyn CompilerModule>>, CompileError>>;
}

/// Run `module` on `input`, isolating legacy builds on their own thread.
pub async fn run_module(
    module: Arc<dyn CompilerModule>,
    version: &CompilerVersion,
    input: String,
) -> Result<String, CompileError> {
    if version.requires_isolation() {
        debug!(%version, "running legacy compiler in an isolated worker");
        run_isolated(module, input).await
    } else {
        module.compile(&input).await
    }
}

/// Run one compilation on a fresh thread. The worker sends back exactly one
/// result; a worker that dies first is reported as [`CompileError::Worker`].
async fn run_isolated(
    module: Arc<dyn CompilerModule>,
    input: String,
) -> Result<String, CompileError> {
    let (tx, rx) = oneshot::channel();
    thread::Builder::new()
        .name(LEGACY_WORKER_NAME.into())
        .spawn(move || {
            let result = runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(CompileError::from)
                .and_then(|rt| rt.block_on(module.compile(&input)));
            let _ = tx.send(result);
        })
        .map_err(|e| CompileError::Worker(format!("failed to start worker: {e}")))?;

    rx.await.map_err(|_| CompileError::Worker("worker exited without a result".into()))?
}

/// Provider running `soljson` builds with an external runner script.
///
/// The build is fetched from the repository's `bin` directory through the
/// binary cache, then executed as `node <runner> <soljson>` with the request
/// on stdin and the response on stdout, under the same limits as the native
/// compiler.
#[derive(Debug, Clone)]
pub struct SolcJsRunner {
    cache: BinaryCache,
    runner: Option<PathBuf>,
    node: PathBuf,
    limits: ProcessLimits,
}

impl SolcJsRunner {
    /// New provider with default limits. Without a runner no module is ever
    /// provided.
    pub fn new(cache: BinaryCache, runner: Option<PathBuf>) -> Self {
        let limits = ProcessLimits::from(&CompilerConfig::default());
        Self { cache, runner, node: PathBuf::from("node"), limits }
    }

    /// Provider using the runner script and process limits of `config`.
    pub fn from_config(cache: BinaryCache, config: &CompilerConfig) -> Self {
        Self::new(cache, config.solcjs_runner.clone()).with_limits(config.into())
    }

    /// Limits applied to every runner process.
    pub fn with_limits(mut self, limits: ProcessLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Use a specific JavaScript interpreter instead of `node` from `PATH`.
    pub fn with_interpreter(mut self, node: impl Into<PathBuf>) -> Self {
        self.node = node.into();
        self
    }
}

impl SolcJsProvider for SolcJsRunner {
    fn module_for<'a>(
        &'a self,
        version: &'a CompilerVersion,
    ) -> BoxFuture<'a, Result<Option<Arc<dyn CompilerModule>>, CompileError>> {
        Box::pin(async move {
            let Some(runner) = &self.runner else {
                debug!(%version, "no soljson runner configured");
                return Ok(None);
            };

            let Some(soljson) =
                self.cache.resolve_file(SOLJSON_PLATFORM, &version.soljson_file_name()).await?
            else {
                info!(%version, "no soljson build available");
                return Ok(None);
            };

            let module = RunnerModule {
                node: self.node.clone(),
                runner: runner.clone(),
                soljson,
                limits: self.limits,
            };
            Ok(Some(Arc::new(module) as Arc<dyn CompilerModule>))
        })
    }
}

/// One `soljson` build bound to a runner script.
#[derive(Debug, Clone)]
struct RunnerModule {
    node: PathBuf,
    runner: PathBuf,
    soljson: PathBuf,
    limits: ProcessLimits,
}

impl CompilerModule for RunnerModule {
    fn compile<'a>(&'a self, input: &'a str) -> BoxFuture<'a, Result<String, CompileError>> {
        Box::pin(async move {
            let args = [self.runner.as_os_str(), self.soljson.as_os_str()];
            run_piped(&self.node, &args, input.as_bytes(), self.limits).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_utils::FakeModule, RemoteFetcher};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_legacy_build_runs_in_worker() {
        let module = Arc::new(FakeModule::new("{}"));
        let version = CompilerVersion::new("0.3.6+commit.3fc68da5");

        let output = run_module(module.clone(), &version, "{}".into()).await.unwrap();

        assert_eq!(output, "{}");
        assert_eq!(module.threads(), vec![Some(LEGACY_WORKER_NAME.to_string())]);
    }

    #[tokio::test]
    async fn test_modern_build_runs_in_place() {
        let module = Arc::new(FakeModule::new("{}"));
        let version = CompilerVersion::new("0.4.0+commit.acd334c9");

        run_module(module.clone(), &version, "{}".into()).await.unwrap();

        let threads = module.threads();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0].as_deref(), Some(LEGACY_WORKER_NAME));
    }

    #[derive(Debug)]
    struct PanickingModule;

    impl CompilerModule for PanickingModule {
        fn compile<'a>(&'a self, _input: &'a str) -> BoxFuture<'a, Result<String, CompileError>> {
            panic!("corrupted compiler state")
        }
    }

    #[tokio::test]
    async fn test_dead_worker_is_reported() {
        let version = CompilerVersion::new("0.2.0+commit.4dc2445e");
        let err = run_module(Arc::new(PanickingModule), &version, "{}".into()).await.unwrap_err();
        assert!(matches!(err, CompileError::Worker(_)), "{err}");
    }

    #[tokio::test]
    async fn test_runner_without_script_provides_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = BinaryCache::with_fetcher(dir.path(), RemoteFetcher::new("http://127.0.0.1:9"));
        let provider = SolcJsRunner::new(cache, None);

        let module = provider.module_for(&CompilerVersion::new("0.3.6+commit.3fc68da5")).await;
        assert!(module.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial]
    async fn test_runner_module_uses_cached_soljson() {
        let dir = TempDir::new().unwrap();
        let cache = BinaryCache::with_fetcher(dir.path(), RemoteFetcher::new("http://127.0.0.1:9"));
        let version = CompilerVersion::new("0.4.26+commit.4563c3fc");
        let soljson = cache.file_path(SOLJSON_PLATFORM, &version.soljson_file_name());
        std::fs::create_dir_all(soljson.parent().unwrap()).unwrap();
        std::fs::write(&soljson, "// soljson").unwrap();

        // The "interpreter" prints the soljson path it was given, then echoes stdin.
        let node = crate::test_utils::write_script(dir.path(), "node", "echo \"$2\"\ncat");
        let provider =
            SolcJsRunner::new(cache, Some(PathBuf::from("runner.js"))).with_interpreter(node);

        let module = provider.module_for(&version).await.unwrap().unwrap();
        let output = module.compile("{\"sources\":{}}").await.unwrap();
        assert_eq!(output, format!("{}\n{{\"sources\":{{}}}}", soljson.display()));
    }

    /// A runner whose interpreter sleeps past a 300ms limit.
    #[cfg(unix)]
    fn sleeping_runner(dir: &TempDir, version: &CompilerVersion) -> SolcJsRunner {
        let cache = BinaryCache::with_fetcher(dir.path(), RemoteFetcher::new("http://127.0.0.1:9"));
        let soljson = cache.file_path(SOLJSON_PLATFORM, &version.soljson_file_name());
        std::fs::create_dir_all(soljson.parent().unwrap()).unwrap();
        std::fs::write(&soljson, "// soljson").unwrap();

        let node = crate::test_utils::write_script(dir.path(), "node", "sleep 3\necho '{}'");
        let limits =
            ProcessLimits { max_output_size: 1024, timeout: Some(Duration::from_millis(300)) };
        SolcJsRunner::new(cache, Some(PathBuf::from("runner.js")))
            .with_interpreter(node)
            .with_limits(limits)
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial]
    async fn test_hanging_runner_times_out() {
        let dir = TempDir::new().unwrap();
        let version = CompilerVersion::new("0.4.26+commit.4563c3fc");
        let provider = sleeping_runner(&dir, &version);

        let module = provider.module_for(&version).await.unwrap().unwrap();
        let started = Instant::now();
        let err = run_module(module, &version, "{}".into()).await.unwrap_err();

        assert!(matches!(err, CompileError::Timeout(_)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial]
    async fn test_legacy_runner_times_out_in_worker() {
        let dir = TempDir::new().unwrap();
        let version = CompilerVersion::new("0.3.6+commit.3fc68da5");
        let provider = sleeping_runner(&dir, &version);

        let module = provider.module_for(&version).await.unwrap().unwrap();
        let started = Instant::now();
        let err = run_module(module, &version, "{}".into()).await.unwrap_err();

        assert!(matches!(err, CompileError::Timeout(_)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
