//! Multibank CLI - accounts and payments across Open Banking providers

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use multibank_core::BankAccountRequest;

mod commands;
mod output;

use commands::{accounts, connections, consent, payment};

/// Multibank - accounts and payments across Open Banking providers
#[derive(Parser)]
#[command(name = "mb", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected banks
    Connections {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Connect a bank (replaces an existing connection with the same name)
    Connect {
        /// Bank name, e.g. vbank
        name: String,
        /// Provider API base URL
        #[arg(long)]
        base_url: String,
        /// Team client id
        #[arg(long)]
        client_id: String,
        /// Team client secret
        #[arg(long, env = "MULTIBANK_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Disconnect a bank
    Disconnect {
        /// Bank name
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Request a new account-access consent for a customer
    Consent {
        /// Bank name
        bank: String,
        /// Customer (client) id
        customer: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch accounts, balances and transactions from one bank
    Accounts {
        /// Bank name
        bank: String,
        /// Customer ids (repeat or comma-separate)
        #[arg(long = "customer", short, value_delimiter = ',', required = true)]
        customers: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch accounts from several banks at once
    Bulk {
        /// BANK=CUSTOMER[,CUSTOMER...], repeatable
        #[arg(long = "request", short, value_parser = accounts::parse_bank_request, required = true)]
        requests: Vec<BankAccountRequest>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Request a payment consent from a JSON request file
    PaymentConsent {
        /// Bank name
        bank: String,
        /// Payment consent request (JSON with consent_type)
        #[arg(long, short)]
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a payment under a payment consent
    Pay {
        /// Bank name
        bank: String,
        /// Customer (client) id
        #[arg(long)]
        customer: String,
        /// Payment consent id
        #[arg(long)]
        consent_id: String,
        /// Payment initiation body (JSON)
        #[arg(long, short)]
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Connections { json } => connections::list(json),
        Commands::Connect { name, base_url, client_id, client_secret, json } => {
            connections::connect(&name, &base_url, &client_id, &client_secret, json)
        }
        Commands::Disconnect { name, force, json } => connections::disconnect(&name, force, json),
        Commands::Consent { bank, customer, json } => consent::run(&bank, &customer, json).await,
        Commands::Accounts { bank, customers, json } => accounts::run(&bank, customers, json).await,
        Commands::Bulk { requests, json } => accounts::bulk(requests, json).await,
        Commands::PaymentConsent { bank, file, json } => {
            payment::consent(&bank, &file, json).await
        }
        Commands::Pay { bank, customer, consent_id, file, json } => {
            payment::pay(&bank, &customer, &consent_id, &file, json).await
        }
    }
}
