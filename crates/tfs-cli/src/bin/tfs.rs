use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tfs_cli::args::CliArgs;

fn main() -> Result<ExitCode> {
    // Initialize tracing if TFS_LOG or RUST_LOG is set (zero cost otherwise).
    // Supports TFS_LOG_FORMAT=tree|json|text (see src/tracing_config.rs).
    tfs::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let mut out = std::io::stdout().lock();
    let status = tfs_cli::commands::run(&args, &mut out)?;
    Ok(ExitCode::from(status))
}
