use bytes::Bytes;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(EnvFilter::from_env("PDSVIEW_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let archive = read_archive(&args).await?;
    tracing::debug!(bytes = archive.len(), "read archive");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(&args.command, archive, args.json, &mut out)
}

async fn read_archive(args: &Args) -> Result<Bytes> {
    if args.reads_stdin() {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .into_diagnostic()?;
        return Ok(Bytes::from(buf));
    }
    let bytes = pdsview_repo::car::read_car_file(&args.archive)
        .await
        .map_err(|e| e.with_context(format!("reading {}", args.archive.display())))?;
    Ok(bytes)
}
