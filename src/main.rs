use clap::Parser;
use env_logger::Builder;
use log::{error, LevelFilter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use traffic_dns::config;
use traffic_dns::server::DnsServer;

/// Authoritative DNS server that diverts A-record answers by client
/// source address across a weighted endpoint pool
#[derive(Parser, Debug)]
#[command(name = "traffic-dns")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML domain/diversion config file
    #[arg(short = 'c', long = "conf")]
    conf: PathBuf,

    /// Answer TTL in seconds
    #[arg(long, default_value_t = 600)]
    ttl: u32,

    /// DNS bind address, shared by UDP and TCP
    #[arg(short, long, default_value = "0.0.0.0:53")]
    bind: String,

    /// Enable debug-level logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logger
    Builder::from_default_env()
        .filter_level(if args.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    // Print configuration to stdout (always visible)
    println!("traffic-dns v{}", env!("CARGO_PKG_VERSION"));
    println!("Configuration:");
    println!("  Bind address: {}", args.bind);
    println!("  Config file: {}", args.conf.display());
    println!("  TTL: {}s", args.ttl);
    println!();

    let addr: SocketAddr = match args.bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid bind address '{}': {e}", args.bind);
            return ExitCode::FAILURE;
        }
    };

    let config = match config::load(&args.conf) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config {}: {e}", args.conf.display());
            return ExitCode::from(127);
        }
    };
    println!(
        "✓ Loaded {} domain node(s), {} top-level",
        config.nodes.len(),
        config.base.children.len()
    );

    let server = DnsServer::new(Arc::new(config), addr, args.ttl);

    println!("✓ DNS server starting on {}", addr);
    println!("\nServer is running. Press Ctrl+C to stop\n");

    let result = tokio::select! {
        result = server.run() => result,
        _ = signal::ctrl_c() => {
            println!("\nShutdown signal received, stopping server...");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
