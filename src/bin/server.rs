//! cnc Server Binary
//!
//! Runs a C&C node that executes commands received over UDP.

use std::sync::Arc;

use clap::Parser;
use cnc::network::Server;
use cnc::protocol::{
    DEFAULT_ARG_LEN, DEFAULT_CMD_NAME_LEN, DEFAULT_MAX_ARG_LEN, DEFAULT_MAX_NUM_ARGS, DEFAULT_MTU,
    DEFAULT_RESPONSE_OVERHEAD,
};
use cnc::{Config, ShellEngine};
use tracing_subscriber::{fmt, EnvFilter};

/// cnc Server
#[derive(Parser, Debug)]
#[command(name = "cnc-server")]
#[command(about = "Command-and-control node for MTU-constrained links")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8050")]
    listen: String,

    /// Worker threads executing commands
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Per-command timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    /// Link MTU in bytes
    #[arg(long, default_value_t = DEFAULT_MTU)]
    mtu: usize,

    /// Maximum number of command arguments
    #[arg(long, default_value_t = DEFAULT_MAX_NUM_ARGS)]
    max_num_args: usize,

    /// Longest argument the node will run
    #[arg(long, default_value_t = DEFAULT_MAX_ARG_LEN)]
    max_arg_len: usize,

    /// Command name field width
    #[arg(long, default_value_t = DEFAULT_CMD_NAME_LEN)]
    cmd_name_len: usize,

    /// Argument field width
    #[arg(long, default_value_t = DEFAULT_ARG_LEN)]
    arg_len: usize,

    /// Response bytes reserved for everything but output
    #[arg(long, default_value_t = DEFAULT_RESPONSE_OVERHEAD)]
    response_overhead: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cnc=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("cnc Server v{}", cnc::VERSION);

    // Build config from args
    let config = match Config::builder()
        .listen_addr(&args.listen)
        .workers(args.workers)
        .command_timeout_ms(args.timeout_ms)
        .mtu(args.mtu)
        .max_num_args(args.max_num_args)
        .max_arg_len(args.max_arg_len)
        .cmd_name_len(args.cmd_name_len)
        .arg_len(args.arg_len)
        .response_overhead(args.response_overhead)
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Packet profile: mtu {}, {} args x {} bytes, name {} bytes, output {} bytes",
        config.limits.mtu(),
        config.limits.max_num_args(),
        config.limits.arg_len(),
        config.limits.cmd_name_len(),
        config.limits.stdout_len()
    );

    let engine = Arc::new(ShellEngine::from_config(&config));

    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
