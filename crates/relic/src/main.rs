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

//! Relic command-line interface.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use eyre::Result;
use relic_common::env::{
    RELIC_CACHE_DIR, RELIC_SOLCJS_RUNNER, RELIC_SOLC_PLATFORM, RELIC_SOLC_REPOSITORY,
    RELIC_SOLC_TIMEOUT,
};
use relic_engine::{CompilerConfig, DEFAULT_SOLC_PLATFORM, DEFAULT_SOLC_REPOSITORY};

mod cmd;

/// Relic command-line arguments
#[derive(Debug, Parser)]
#[command(name = "relic")]
#[command(about = "Relic - Recompile Solidity contracts with the exact historical compiler")]
#[command(version)]
pub struct Cli {
    /// Cache directory for compiler builds (default: ~/.relic/cache)
    #[arg(long, env = RELIC_CACHE_DIR)]
    pub cache_dir: Option<PathBuf>,

    /// Platform directory of the binary repository
    #[arg(long, env = RELIC_SOLC_PLATFORM, default_value = DEFAULT_SOLC_PLATFORM)]
    pub platform: String,

    /// Root URL of the compiler binary repository
    #[arg(long, env = RELIC_SOLC_REPOSITORY, default_value = DEFAULT_SOLC_REPOSITORY)]
    pub repository: String,

    /// Timeout in seconds for a single native compiler run
    #[arg(long, env = RELIC_SOLC_TIMEOUT)]
    pub timeout: Option<u64>,

    /// Runner script for soljson builds, used when no native build exists
    #[arg(long, env = RELIC_SOLCJS_RUNNER)]
    pub solcjs_runner: Option<PathBuf>,

    /// Always compile with soljson builds, even if a native build exists
    #[arg(long)]
    pub force_fallback: bool,

    /// Also write logs to a daily-rotated file
    #[arg(long)]
    pub log_file: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Recompile target directories and write their verification artifacts
    Recompile {
        /// Target directories, each holding a metadata.json and its sources
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Directory receiving <name>.json for every target
        #[arg(long, short, default_value = "out")]
        out_dir: PathBuf,
    },
    /// Download a native compiler build into the cache
    Install {
        /// Compiler version, e.g. 0.8.17+commit.8df45f5f
        version: String,
    },
}

impl Cli {
    /// Compiler configuration from the command-line flags.
    pub fn compiler_config(&self) -> CompilerConfig {
        let mut config = CompilerConfig::default()
            .with_platform(&self.platform)
            .with_repository_url(&self.repository)
            .with_force_fallback(self.force_fallback);
        if let Some(cache_dir) = &self.cache_dir {
            config = config.with_cache_root(cache_dir);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(Duration::from_secs(timeout));
        }
        if let Some(runner) = &self.solcjs_runner {
            config = config.with_solcjs_runner(runner);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();
    relic_common::init_logging("relic", cli.log_file)?;

    let config = cli.compiler_config();
    tracing::debug!(?config, "using compiler configuration");

    match &cli.command {
        Commands::Recompile { dirs, out_dir } => cmd::recompile(&config, dirs, out_dir).await,
        Commands::Install { version } => cmd::install(&config, version).await,
    }
}
