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

//! Compiler subprocesses.
//!
//! Both the native binary and the `soljson` runner speak standard JSON over
//! stdin and stdout. The child is spawned with `kill_on_drop`, so every early return (oversized
//! output, timeout, I/O failure) kills it and leaves reaping to the runtime.
//! Its stdin is closed as soon as the request has been written.

use std::{ffi::OsStr, path::Path, process::Stdio, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStderr, ChildStdin, ChildStdout, Command},
};
use tracing::{debug, trace};

use crate::{CompileError, CompilerConfig};

/// Flag selecting the standard-JSON protocol.
pub const STANDARD_JSON_FLAG: &str = "--standard-json";

/// Limits applied to one compiler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLimits {
    /// Capacity of each output stream in bytes
    pub max_output_size: usize,
    /// Wall-clock limit of the whole exchange
    pub timeout: Option<Duration>,
}

impl From<&CompilerConfig> for ProcessLimits {
    fn from(config: &CompilerConfig) -> Self {
        Self { max_output_size: config.max_output_size, timeout: config.timeout }
    }
}

/// Run `binary --standard-json`, feeding `input` on stdin, and return stdout.
pub async fn run_standard_json(
    binary: &Path,
    input: &[u8],
    limits: ProcessLimits,
) -> Result<String, CompileError> {
    run_piped(binary, &[OsStr::new(STANDARD_JSON_FLAG)], input, limits).await
}

/// Run `program` with `args`, feeding `input` on stdin, and return stdout
/// within `limits`. Anything written to stderr fails the run.
pub async fn run_piped(
    program: &Path,
    args: &[&OsStr],
    input: &[u8],
    limits: ProcessLimits,
) -> Result<String, CompileError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CompileError::Spawn { path: program.to_path_buf(), source })?;
    trace!(program = %program.display(), pid = ?child.id(), "spawned compiler");

    let (Some(stdin), Some(stdout), Some(stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        return Err(CompileError::Process { stderr: "no stdio on compiler process".into() });
    };

    let exchange = exchange(child, stdin, stdout, stderr, input, limits.max_output_size);
    match limits.timeout {
        Some(timeout) => tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| CompileError::Timeout(timeout))?,
        None => exchange.await,
    }
}

async fn exchange(
    mut child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: ChildStderr,
    input: &[u8],
    limit: usize,
) -> Result<String, CompileError> {
    let (written, stdout, stderr) = tokio::try_join!(
        write_input(stdin, input),
        read_limited(stdout, limit),
        read_limited(stderr, limit),
    )?;
    let status = child.wait().await?;
    debug!(%status, stdout = stdout.len(), stderr = stderr.len(), "compiler exited");

    if !stderr.is_empty() {
        return Err(CompileError::Process { stderr: String::from_utf8_lossy(&stderr).into_owned() });
    }
    if !status.success() {
        return Err(CompileError::Process { stderr: format!("compiler exited with {status}") });
    }
    written?;

    String::from_utf8(stdout).map_err(|e| CompileError::Process {
        stderr: format!("compiler output is not valid UTF-8: {e}"),
    })
}

/// Write the request and close stdin. A compiler that exits without reading
/// its input is reported through its exit status, so the write error is
/// handed back instead of aborting the exchange.
async fn write_input(
    mut stdin: ChildStdin,
    input: &[u8],
) -> Result<std::io::Result<()>, CompileError> {
    let result = async {
        stdin.write_all(input).await?;
        stdin.shutdown().await
    }
    .await;
    drop(stdin);
    Ok(result)
}

async fn read_limited<R>(reader: R, limit: usize) -> Result<Vec<u8>, CompileError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    if buf.len() > limit {
        return Err(CompileError::OutputTooLarge { limit });
    }
    Ok(buf)
}
