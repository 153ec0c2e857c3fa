//! credseal CLI - seal, open and migrate stored credentials
//!
//! The master secret comes from `CREDSEAL_MASTER_SECRET`, or from stdin
//! with `--secret-stdin`.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use credseal::config::Settings;
use credseal::file_ops;
use credseal::secret::{CachingSecret, ReaderSecret, TerminalSecret};
use credseal::Sealer;

#[derive(Parser)]
#[command(name = "credseal")]
#[command(version)]
#[command(about = "At-rest encryption for stored credentials.", long_about = None)]
struct Cli {
    /// Read the master secret from stdin instead of CREDSEAL_MASTER_SECRET
    #[arg(long, global = true, conflicts_with = "secret_prompt")]
    secret_stdin: bool,

    /// Prompt for the master secret on the terminal
    #[arg(long, global = true)]
    secret_prompt: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seal the credential stored in a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file holding the plaintext credential
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the sealed value to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Open a sealed credential stored in a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file holding the sealed value
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the plaintext credential to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print "sealed" or "plain" depending on what a file looks like
    #[command(alias = "c")]
    Check {
        /// Path to the file to inspect
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Seal, in place, every line of a credential file that is still
    /// plaintext
    #[command(alias = "m")]
    Migrate {
        /// Path to the newline-separated credential file
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },
}

enum SecretOrigin {
    Env,
    Stdin,
    Prompt,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let secret = if cli.secret_stdin {
        SecretOrigin::Stdin
    } else if cli.secret_prompt {
        SecretOrigin::Prompt
    } else {
        SecretOrigin::Env
    };

    let result = match cli.command {
        Commands::Encrypt { input, output } => {
            file_ops::encrypt_file(&input, &output, &sealer(&secret))
        }
        Commands::Decrypt { input, output } => {
            file_ops::decrypt_file(&input, &output, &sealer(&secret))
        }
        Commands::Check { input } => file_ops::check_file(&input).map(|sealed| {
            println!("{}", if sealed { "sealed" } else { "plain" });
        }),
        Commands::Migrate { file } => {
            file_ops::migrate_file(&file, &sealer(&secret)).map(|report| {
                eprintln!(
                    "sealed {} value(s), {} already sealed",
                    report.sealed, report.already_sealed
                );
            })
        }
    };

    if let Err(e) = result {
        let mut message = e.to_string();
        let mut source: Option<&(dyn Error + 'static)> =
            e.source_error().map(|s| s as &(dyn Error + 'static));
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        eprintln!("Error: {}", message);
        process::exit(1);
    }
}

fn sealer(origin: &SecretOrigin) -> Sealer {
    match origin {
        SecretOrigin::Stdin => Sealer::with_source(CachingSecret::new(Box::new(
            ReaderSecret::new(Box::new(std::io::stdin())),
        ))),
        SecretOrigin::Prompt => {
            Sealer::with_source(CachingSecret::new(Box::new(TerminalSecret::new())))
        }
        SecretOrigin::Env => Sealer::from_env(),
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `CREDSEAL_LOG_LEVEL`.
fn init_tracing() {
    let default_level = Settings::from_env()
        .map(|s| s.log_level)
        .unwrap_or_else(|_| "warn".into());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
