//! mockserv - HTTP server double for servcheck end-to-end tests.
//!
//! Behaves like the server under test from the harness's point of view:
//! takes an optional configuration file path, exits with code 1 when that
//! file is rejected, serves virtual hosts until SIGTERM/SIGINT and logs each
//! request to stdout.

mod config;
mod handler;
mod multipart;

use clap::Parser;
use config::MockConfig;
use handler::Site;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "mockserv")]
#[command(about = "Configurable HTTP server double", long_about = None)]
struct Args {
    /// Configuration file; serves ./html on 127.0.0.1:8000 when omitted
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stdout)
        .init();

    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => MockConfig::load(path),
        None => MockConfig::fallback(),
    };
    let config = match loaded {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            eprintln!("mockserv: {}", e);
            std::process::exit(1);
        }
    };

    if config.startup_delay_ms > 0 {
        info!("Delaying startup by {}ms", config.startup_delay_ms);
        tokio::time::sleep(Duration::from_millis(config.startup_delay_ms)).await;
    }

    let mut by_addr: BTreeMap<SocketAddr, Vec<config::ServerBlock>> = BTreeMap::new();
    for server in config.servers {
        if let Some(addr) = server.addr {
            by_addr.entry(addr).or_default().push(server);
        }
    }

    for (addr, servers) in by_addr {
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind {}: {}", addr, e);
                std::process::exit(1);
            }
        };
        info!("Listening on http://{}", addr);
        tokio::spawn(serve(listener, Arc::new(Site::new(servers))));
    }

    if let Some(path) = &config.pid_file {
        if let Err(e) = std::fs::write(path, std::process::id().to_string()) {
            warn!("Failed to write PID file {}: {}", path.display(), e);
        }
    }

    wait_for_shutdown().await;
    info!("Shutting down");

    if let Some(path) = &config.pid_file {
        let _ = std::fs::remove_file(path);
    }
}

async fn serve(listener: TcpListener, site: Arc<Site>) {
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let site = site.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let site = site.clone();
                async move { site.handle(req).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!("Error serving connection: {}", e);
            }
        });
    }
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(t), Ok(i)) => (t, i),
                _ => {
                    error!("Failed to install signal handlers");
                    std::process::exit(1);
                }
            };
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C");
    }
}
