//!
//! xcontact server binary
//! ----------------------
//! Command-line entry point for the dashboard front end. Supports configuration via
//! CLI flags and environment variables.

use anyhow::Result;
use std::env;

use xcontact::config::{has_flag, FrontendConfig};

#[tokio::main]
async fn main() -> Result<()> {
    println!(r"  _  __   ______            __             __
 | |/ /  / ____/___  ____  / /_____ ______/ /_
 |   /  / /   / __ \/ __ \/ __/ __ `/ ___/ __/
/   |  / /___/ /_/ / / / / /_/ /_/ / /__/ /_
/_/|_|  \____/\____/_/ /_/\__/\__,_/\___/\__/  ");

    // Initialize tracing subscriber with env filter if provided, info otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("xcontact Server\n\nUSAGE:\n  xcontact_server [--http-port N] [--api-base URL] [--timeout-ms N]\n\nOPTIONS:\n  --http-port N       HTTP port (env: XCONTACT_HTTP_PORT, default 3000)\n  --api-base URL      Backend API base URL (env: XCONTACT_API_BASE, default http://localhost:8000)\n  --timeout-ms N      Backend request timeout (env: XCONTACT_TIMEOUT_MS, default 10000)\n");
        return Ok(());
    }

    // CLI arguments override environment
    let cfg = FrontendConfig::from_env().with_args(&args);
    println!("xcontact starting: http={}, api_base={}", cfg.http_port, cfg.api_base);
    tracing::info!(target: "startup", "Using port: http={}, api_base={}", cfg.http_port, cfg.api_base);
    xcontact::server::run_with_config(cfg).await
}
