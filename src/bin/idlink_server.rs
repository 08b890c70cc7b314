//! idlink gRPC Server
//!
//! A standalone server binary for running identity reconciliation over gRPC.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tonic::transport::Server;

use idlink::storage::InMemoryContactStore;
use idlink::transport::IdentityServiceImpl;
use idlink::ReconciliationEngine;

/// Server configuration
struct Config {
    /// Address to bind to
    addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:50051".parse().unwrap(),
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    let port: u16 = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("error: invalid port number: {}", args[i + 1]);
                        std::process::exit(1);
                    });
                    config.addr.set_port(port);
                    i += 2;
                } else {
                    eprintln!("error: --port requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("idlink-server - Contact identity reconciliation over gRPC");
                println!();
                println!("USAGE:");
                println!("    idlink-server [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -p, --port <PORT>         Port to listen on [default: 50051]");
                println!("    -h, --help                Print help information");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {}", arg);
                std::process::exit(1);
            }
        }
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args();

    println!("idlink Server v{}", env!("CARGO_PKG_VERSION"));

    // The binary ships the in-memory reference store; durable backends plug
    // in through the ContactStore trait.
    let store = Arc::new(InMemoryContactStore::new());
    let engine = Arc::new(ReconciliationEngine::new(store));

    let svc = IdentityServiceImpl::new(engine).into_server();

    println!("Starting gRPC server on {}", config.addr);
    println!("Press Ctrl+C to stop");

    Server::builder()
        .add_service(svc)
        .serve_with_shutdown(config.addr, async {
            let _ = signal::ctrl_c().await;
        })
        .await?;

    println!("Shut down");
    Ok(())
}
