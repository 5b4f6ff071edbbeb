//! gatherlens - investigate a cluster diagnostic capture for autoscaler activity
//!
//! Builds a single-page HTML report from an already-extracted capture tree
//! and either writes it to disk or serves it locally.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use gatherlens::cli::init_logging;
use gatherlens::{render, report, server};

/// Investigate a cluster diagnostic capture for autoscaler activity
#[derive(Parser, Debug)]
#[command(name = "gatherlens")]
#[command(about = "Investigate a cluster diagnostic capture for autoscaler activity", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the root of the capture tree
    path: PathBuf,

    /// Output filename for the rendered report
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run in server mode, rebuilding the report on every request
    #[arg(long)]
    server: bool,

    /// Server host address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server host port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Open a web browser on the report
    #[arg(long)]
    webbrowser: bool,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    // Render to a file whenever an output was requested or we are not in
    // server mode.
    let mut file_url = None;
    if args.output.is_some() || !args.server {
        let report = report::build(&args.path)?;
        let html = render::render_index(&report)?;
        let output = match &args.output {
            Some(output) => output.clone(),
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("gatherlens-")
                    .tempdir()
                    .context("unable to create output directory")?;
                // Keep the directory so the report outlives the process
                dir.into_path().join("index.html")
            }
        };
        fs::write(&output, html)
            .with_context(|| format!("unable to write {}", output.display()))?;
        file_url = Some(format!("file://{}", output.display()));
    }

    let url = if args.server {
        format!("http://{}:{}/", args.host, args.port)
    } else {
        file_url.expect("file report rendered when not serving")
    };
    println!("{url}");

    if args.webbrowser {
        let browse_url = url.clone();
        // Delay the open slightly so the server is listening first
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if let Err(err) = webbrowser::open(&browse_url) {
                tracing::warn!("unable to open browser: {err}");
            }
        });
    }

    if args.server {
        let addr: SocketAddr = format!("{}:{}", args.host, args.port)
            .parse()
            .context("invalid host/port")?;
        server::serve(addr, args.path.clone()).await?;
    } else if args.webbrowser {
        // Give the spawned browser task a chance to run before exiting
        tokio::time::sleep(Duration::from_millis(1500)).await;
    }

    Ok(())
}
