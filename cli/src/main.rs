//! SOLPAY CLI - payment requests from the command line

use clap::{Parser, Subcommand};
use solpay_cli::{
    build_payment_message, derive_ata, describe_uri, encode_request, load_config, watch_payment,
    RequestArgs,
};
use solpay_core::{PayError, PublicKey};
use solpay_crypto::new_reference;
use solpay_pay::decode;
use solpay_rpc::RpcLedgerClient;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "solpay")]
#[command(about = "SOLPAY - payment request tooling")]
#[command(version)]
struct Cli {
    /// Ledger RPC URL (overrides the config file)
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a payment request URI
    Encode(RequestArgs),

    /// Decode a payment URI and print it as JSON
    Decode {
        uri: String,
    },

    /// Mint a fresh reference key
    Reference,

    /// Derive an associated token account
    Ata {
        #[arg(long)]
        owner: PublicKey,

        #[arg(long)]
        mint: PublicKey,
    },

    /// Wait for a payment and validate it
    Watch(RequestArgs),

    /// Build the unsigned transfer for a payment URI
    Build {
        uri: String,

        /// Paying wallet
        #[arg(short, long)]
        sender: PublicKey,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Encode(args) => {
            println!("{}", encode_request(&args)?);
        }

        Commands::Decode { uri } => {
            println!("{}", describe_uri(&uri)?);
        }

        Commands::Reference => {
            println!("{}", new_reference());
        }

        Commands::Ata { owner, mint } => {
            let account = derive_ata(&owner, &mint)?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }

        Commands::Watch(args) => {
            let config = load_config(cli.config.as_deref(), cli.rpc.as_deref())?;
            let descriptor = args.descriptor()?;
            let client = RpcLedgerClient::new(config.rpc.clone());

            match watch_payment(&client, &descriptor, &config).await {
                Ok(confirmation) => {
                    println!("{}", serde_json::to_string_pretty(&confirmation)?);
                }
                Err(e @ PayError::ValidationMismatch(_)) => {
                    eprintln!("Payment does not match the request: {}", e);
                    std::process::exit(2);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Build { uri, sender } => {
            let config = load_config(cli.config.as_deref(), cli.rpc.as_deref())?;
            let descriptor = decode(&uri)?;
            let client = RpcLedgerClient::new(config.rpc.clone());

            let blockhash = client.latest_blockhash().await?;
            let message = build_payment_message(&descriptor, sender, &client, blockhash).await?;
            println!("{}", message);
        }
    }

    Ok(())
}
