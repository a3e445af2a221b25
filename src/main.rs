use anyhow::Result;
use clap::Parser;
use gmail_rules::cli::{self, Cli};
use gmail_rules::config::Config;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        eprintln!("\nFor help, run: gmail-rules --help");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Multiple dependencies pull in rustls, so pick the crypto provider explicitly.
    // aws-lc-rs everywhere except Windows, where ring avoids the NASM/CMake build.
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_rules=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_rules=info,warn,error"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Gmail rules engine starting...");

    if cli.init_config {
        cli::init_config(&cli.config, cli.force).await?;
        println!("Created example configuration file at: {:?}", cli.config);
        return Ok(());
    }

    let mut config = Config::load(&cli.config).await?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let report = cli::run_pipeline(&cli, &config).await?;
    let markdown = report.to_markdown();

    match &cli.report {
        Some(path) => {
            tokio::fs::write(path, &markdown).await?;
            tracing::info!("Report written to {:?}", path);
        }
        None => println!("{}", markdown),
    }

    Ok(())
}
