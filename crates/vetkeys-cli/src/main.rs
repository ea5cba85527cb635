//! vetKeys demo binary.
//!
//! Runs the client flows against an in-process simulated backend. Client
//! randomness comes from the OS; the backend's master key and clock come
//! from `--seed`, so the same seed always yields the same keys.
//!
//! # Usage
//!
//! ```bash
//! # Symmetric encryption with the caller's derived key
//! vetkeys-demo symmetric --message "Hello, World!"
//!
//! # IBE to a principal (hex), decrypted when it is the caller
//! vetkeys-demo --caller 0a0b0c ibe --recipient 0a0b0c --message "hi"
//!
//! # Timelock that unlocks at a given time (UTC)
//! vetkeys-demo timelock --title Test --content secret-42 --unlock 2030-01-01T00:00
//! ```

mod commands;
mod system_env;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vetkeys_client::{
    ClientConfig, DEFAULT_SYMMETRIC_CONTEXT, Environment, MasterKeyPolicy, Principal,
    VetKeyClient, parse_unlock_datetime,
};
use vetkeys_crypto::hex_codec;
use vetkeys_harness::{SimBackend, SimEnv};

use crate::system_env::SystemEnv;

/// vetKeys client demo
#[derive(Parser, Debug)]
#[command(name = "vetkeys-demo")]
#[command(about = "Drive vetKeys client flows against a simulated backend")]
#[command(version)]
struct Args {
    /// Seed for the simulated backend's master key
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Caller principal as hex (anonymous if omitted)
    #[arg(long)]
    caller: Option<String>,

    /// Derived public key caching
    #[arg(long, value_enum, default_value_t = PolicyArg::AlwaysFetch)]
    master_key_policy: PolicyArg,

    /// Application context for symmetric encryption
    #[arg(long, default_value = DEFAULT_SYMMETRIC_CONTEXT)]
    context: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the caller's key and round-trip a message
    Symmetric {
        /// Message to encrypt
        #[arg(short, long)]
        message: String,
    },

    /// Encrypt a message to a principal
    Ibe {
        /// Recipient principal as hex (defaults to the caller)
        #[arg(short, long)]
        recipient: Option<String>,

        /// Message to encrypt
        #[arg(short, long)]
        message: String,
    },

    /// Create a timelock and decrypt it once unlocked
    Timelock {
        /// Title
        #[arg(long)]
        title: String,

        /// Secret content
        #[arg(long)]
        content: String,

        /// Unlock time: RFC 3339 or YYYY-MM-DDTHH:MM (UTC)
        #[arg(long, conflicts_with = "lock_secs")]
        unlock: Option<String>,

        /// Seconds from now until unlock (used when --unlock is absent)
        #[arg(long, default_value_t = 60)]
        lock_secs: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    AlwaysFetch,
    CacheStrict,
    CacheWithRefetch,
}

impl From<PolicyArg> for MasterKeyPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::AlwaysFetch => Self::AlwaysFetch,
            PolicyArg::CacheStrict => Self::CacheStrict,
            PolicyArg::CacheWithRefetch => Self::CacheWithRefetch,
        }
    }
}

fn parse_principal(hex: &str) -> Result<Principal, Box<dyn std::error::Error>> {
    Ok(Principal::from_slice(&hex_codec::decode(hex)?)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let caller = match &args.caller {
        Some(hex) => parse_principal(hex)?,
        None => {
            tracing::warn!("No caller given - using the anonymous principal");
            Principal::anonymous()
        },
    };

    let env = SystemEnv::new();
    let backend_env = SimEnv::with_seed(args.seed);
    backend_env.set_time(env.wall_clock_secs());

    let backend = SimBackend::new(backend_env.clone(), backend_env.random_array(), caller.clone());
    let config = ClientConfig {
        symmetric_context: args.context,
        master_key_policy: args.master_key_policy.into(),
    };
    let client = VetKeyClient::with_config(backend, env.clone(), config);

    tracing::info!(%caller, seed = args.seed, "vetKeys demo starting");

    match args.command {
        Command::Symmetric { message } => commands::symmetric(&client, &message).await?,
        Command::Ibe { recipient, message } => {
            let recipient = match recipient {
                Some(hex) => parse_principal(&hex)?,
                None => caller,
            };
            commands::ibe(&client, &recipient, &message).await?;
        },
        Command::Timelock { title, content, unlock, lock_secs } => {
            let unlock_timestamp = match unlock {
                Some(text) => parse_unlock_datetime(&text)?,
                None => env.wall_clock_secs() + lock_secs,
            };
            commands::timelock(&client, &backend_env, &title, &content, unlock_timestamp).await?;
        },
    }

    Ok(())
}
