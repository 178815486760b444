//! cnc CLI Client
//!
//! Command-line interface for sending commands to a node.

use std::time::Duration;

use clap::{Parser, Subcommand};
use cnc::network::Client;
use cnc::protocol::{
    DEFAULT_ARG_LEN, DEFAULT_CMD_NAME_LEN, DEFAULT_MAX_ARG_LEN, DEFAULT_MAX_NUM_ARGS, DEFAULT_MTU,
    DEFAULT_RESPONSE_OVERHEAD,
};
use cnc::{CommandPacket, PacketLimits};
use tracing_subscriber::{fmt, EnvFilter};

/// cnc CLI
#[derive(Parser, Debug)]
#[command(name = "cnc-cli")]
#[command(about = "CLI for a cnc node")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8050")]
    server: String,

    /// Response timeout in milliseconds
    #[arg(short, long, default_value = "15000")]
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

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program on the node
    Exec {
        /// Program to run
        program: String,

        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show node status
    Status,

    /// Show node software version
    Version,

    /// Describe available actions
    Help {
        /// Limit help to one action
        topic: Option<String>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let limits = match PacketLimits::builder()
        .mtu(args.mtu)
        .max_num_args(args.max_num_args)
        .max_arg_len(args.max_arg_len)
        .cmd_name_len(args.cmd_name_len)
        .arg_len(args.arg_len)
        .response_overhead(args.response_overhead)
        .build()
    {
        Ok(limits) => limits,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let command = match args.command {
        Commands::Exec { program, args } => CommandPacket::execute(program, args),
        Commands::Status => CommandPacket::status(),
        Commands::Version => CommandPacket::version(),
        Commands::Help { topic } => CommandPacket::help(topic.unwrap_or_default()),
    };

    let response = Client::connect(&args.server, limits, Duration::from_millis(args.timeout_ms))
        .and_then(|client| client.send(&command));

    match response {
        Ok(response) => {
            print!("{}", response.output);
            if !response.output.is_empty() && !response.output.ends_with('\n') {
                println!();
            }
            tracing::info!(
                "return code {} in {:.3}s",
                response.return_code,
                response.execution_time
            );
            std::process::exit(i32::from(response.return_code));
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}
