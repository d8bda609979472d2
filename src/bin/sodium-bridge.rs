//! sodium-bridge CLI - inspect and call native crypto capabilities
//!
//! Lists which capabilities the linked library provides, reads constants,
//! and invokes functions with arguments given on the command line.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use sodium_bridge::native::{BundledLibrary, MaskedLibrary};
use sodium_bridge::{Arg, Bridge, BridgeConfig, BridgeError, ErrorCategory, ErrorKind};

#[derive(Parser)]
#[command(name = "sodium-bridge")]
#[command(version)]
#[command(about = "Inspect and invoke native crypto capabilities.", long_about = None)]
struct Cli {
    /// Force a capability absent (repeatable)
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        env = "SODIUM_BRIDGE_DISABLE",
        value_delimiter = ','
    )]
    disable: Vec<String>,

    /// Pretend the native library does not export SYMBOL (repeatable)
    #[arg(long, global = true, value_name = "SYMBOL")]
    hide_symbol: Vec<String>,

    /// Load even if the native library version is incompatible
    #[arg(
        long,
        global = true,
        env = "SODIUM_BRIDGE_SKIP_VERSION_CHECK",
        value_parser = BoolishValueParser::new()
    )]
    skip_version_check: bool,

    /// Log capability resolution to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capabilities
    #[command(alias = "ls")]
    List {
        /// Include absent capabilities and why they are absent
        #[arg(long)]
        all: bool,
    },

    /// Show the load outcome of one capability
    Describe {
        name: String,
    },

    /// Print the value of a constant
    Value {
        name: String,
    },

    /// Invoke a function. Arguments are b64:<base64>, str:<text>,
    /// int:<number>, file:<path> or null.
    #[command(alias = "i")]
    Invoke {
        name: String,

        #[arg(value_name = "ARG")]
        args: Vec<String>,

        /// Write the output bytes as-is instead of base64
        #[arg(long)]
        raw: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> sodium_bridge::Result<()> {
    let disabled = cli.disable.iter().map(|s| s.trim()).filter(|s| !s.is_empty());
    let mut config = BridgeConfig::with_disabled(disabled);
    config.enforce_version = !cli.skip_version_check;
    let library = MaskedLibrary::new(BundledLibrary::new(), cli.hide_symbol);
    let bridge = Bridge::load(library, config)?;

    match cli.command {
        Commands::List { all } => {
            if all {
                for info in bridge.capabilities() {
                    match &info.absence {
                        None => println!("{}\t{}\tpresent", info.name, info.kind),
                        Some(reason) => {
                            println!("{}\t{}\tabsent ({})", info.name, info.kind, reason)
                        }
                    }
                }
            } else {
                for name in bridge.available() {
                    println!("{}", name);
                }
            }
        }
        Commands::Describe { name } => {
            let info = bridge.describe(&name)?;
            println!("name: {}", info.name);
            println!("kind: {}", info.kind);
            println!("symbol: {}", info.symbol);
            println!("description: {}", info.description);
            match info.absence {
                None => println!("status: present"),
                Some(reason) => println!("status: absent ({})", reason),
            }
        }
        Commands::Value { name } => {
            println!("{}", bridge.value(&name)?);
        }
        Commands::Invoke { name, args, raw } => {
            let args = args
                .iter()
                .map(|a| parse_arg(a))
                .collect::<sodium_bridge::Result<Vec<_>>>()?;
            let output = bridge.invoke(&name, args)?;
            if raw {
                io::stdout().write_all(&output).map_err(io_error)?;
            } else {
                println!("{}", BASE64_STANDARD.encode(&*output));
            }
        }
    }
    Ok(())
}

fn parse_arg(text: &str) -> sodium_bridge::Result<Arg> {
    if text == "null" {
        return Ok(Arg::Null);
    }
    let (prefix, body) = text.split_once(':').ok_or_else(|| bad_arg(text))?;
    match prefix {
        "b64" => BASE64_STANDARD.decode(body).map(Arg::from).map_err(|e| {
            BridgeError::with_source(
                ErrorCategory::User,
                ErrorKind::InvalidArgumentType,
                format!("argument {text:?} is not valid base64"),
                e,
            )
        }),
        "str" => Ok(Arg::from(body.as_bytes())),
        "int" => body.parse::<u64>().map(Arg::Int).map_err(|e| {
            BridgeError::with_source(
                ErrorCategory::User,
                ErrorKind::InvalidArgumentType,
                format!("argument {text:?} is not an unsigned integer"),
                e,
            )
        }),
        "file" => fs::read(body).map(Arg::from).map_err(|e| {
            BridgeError::with_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to read {}: {}", PathBuf::from(body).display(), e),
                e,
            )
        }),
        _ => Err(bad_arg(text)),
    }
}

fn bad_arg(text: &str) -> BridgeError {
    BridgeError::new(
        ErrorCategory::User,
        ErrorKind::InvalidArgumentType,
        format!("argument {text:?} must be b64:, str:, int:, file: or null"),
    )
}

fn io_error(e: io::Error) -> BridgeError {
    BridgeError::with_source(
        ErrorCategory::Internal,
        ErrorKind::Io,
        format!("failed to write output: {}", e),
        e,
    )
}
