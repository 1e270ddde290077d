//! Tiny backend for trying the balancer by hand.
//!
//! ```text
//! mock-backend --port 3001 --name a &
//! mock-backend --port 3002 --name b &
//! rr-balancer --bind 127.0.0.1:8080 127.0.0.1:3001 127.0.0.1:3002
//! ```

use std::net::SocketAddr;

use axum::{extract::State, http::Method, http::Uri, Router};
use clap::Parser;

#[derive(Parser)]
#[command(name = "mock-backend")]
#[command(about = "Answers every request with its name, method and path", long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 3001)]
    port: u16,

    #[arg(short, long, default_value = "backend")]
    name: String,
}

async fn answer(State(name): State<String>, method: Method, uri: Uri) -> String {
    format!("{} {} {}\n", name, method, uri)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let app = Router::new().fallback(answer).with_state(args.name.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("{} listening on http://{}", args.name, addr);

    axum::serve(listener, app).await?;
    Ok(())
}
