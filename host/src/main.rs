//! Untrusted host CLI for the wait-certificate service.
//!
//! Owns the persistent artifacts the trusted subsystem hands back: the
//! sealed validator identity, the signup record, and the pending wait
//! timer all live as files under the configured data directory, and every
//! trusted call goes through the session manager's recovery policy.

mod config;
mod session;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{WrapErr, eyre};
use serde::{Deserialize, Serialize};
use tracing::info;

use shared::HexBytes;
use shared::certificate::certificate_identifier;
use shared::timer::SignedTimer;

use crate::config::Config;
use crate::session::{EnclaveLoader, SessionManager};

const IDENTITY_FILE: &str = "identity.seal";
const SIGNUP_FILE: &str = "signup.json";
const TIMER_FILE: &str = "timer.json";

#[derive(Parser)]
#[command(version, about, long_about=None)]
pub struct Cli {
    #[arg(
        long,
        value_name = "PATH",
        help = "Directory holding the trusted subsystem's persistent state"
    )]
    pub data_dir: Option<String>,
    #[arg(
        long,
        value_name = "HEX",
        help = "Service provider id recorded with signup data (32 hex characters)"
    )]
    pub spid: Option<String>,
    #[arg(
        long,
        value_name = "Integer",
        help = "How many times a busy trusted call is retried"
    )]
    pub retries: Option<u32>,
    #[arg(
        long,
        value_name = "Millis",
        help = "Delay between busy retries, in milliseconds"
    )]
    pub retry_delay: Option<u64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the config file and data directory without loading the trusted subsystem")]
    Init,
    #[command(about = "Create a fresh validator identity and persist its sealed form")]
    Signup {
        #[arg(short, long, help = "Hex encoded hash of the originator's external public key")]
        originator: String,
    },
    #[command(about = "Reload the persisted identity and print its public key")]
    Unseal,
    #[command(about = "Decommission the persisted identity")]
    Release,
    #[command(about = "Request a wait timer for the next block")]
    Timer {
        #[arg(short, long, help = "Address of this validator")]
        address: String,
        #[arg(short, long, help = "Identifier of the previous wait certificate")]
        previous_certificate_id: String,
        #[arg(long, value_name = "Seconds", help = "Local wall-clock time of the request")]
        request_time: f64,
        #[arg(long, value_name = "Seconds", help = "Local mean wait time for the network")]
        local_mean: f64,
    },
    #[command(about = "Redeem the pending wait timer for a wait certificate")]
    Certificate {
        #[arg(short, long, help = "Hash of the block being certified")]
        block_hash: String,
    },
    #[command(about = "Check claimed signup information against this platform's attestation facts")]
    VerifySignup {
        #[arg(short, long, help = "Hex encoded hash of the claimed originator's external public key")]
        originator: String,
        #[arg(short, long, help = "Hex encoded claimed public key")]
        public_key: String,
        #[arg(short, long, help = "Serialized quote from the claimed signup data")]
        quote: String,
        #[arg(short, long, help = "Hex encoded claimed platform manifest hash")]
        manifest_hash: String,
    },
    #[command(about = "Print this platform's attestation facts")]
    Facts,
}

/// Everything from a signup besides the sealed blob, kept around so the
/// registration flow can be replayed without the trusted subsystem.
#[derive(Serialize, Deserialize)]
struct SignupRecord {
    public_key: String,
    quote: String,
    manifest_hash: String,
    spid: String,
}

fn main() -> eyre::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config =
        Config::load_or_init(&cli).map_err(|e| eyre!("could not prepare configuration: {e}"))?;
    config
        .ensure_data_dir()
        .wrap_err("could not create the data directory")?;

    if let Commands::Init = cli.command {
        info!("Configuration written.");
        println!("data directory: {}", config.data_dir.display());
        return Ok(());
    }

    let session = SessionManager::start(
        EnclaveLoader {
            data_dir: config.data_dir.clone(),
        },
        config.retry_count,
        config.retry_delay,
    )?;

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Signup { originator } => {
            let signup = session.create_signup_data(&originator)?;
            write_identity(&config.data_dir, &signup.sealed_identity)?;
            let record = SignupRecord {
                public_key: signup.public_key.encode(),
                quote: signup.quote,
                manifest_hash: signup.manifest_hash.encode(),
                spid: config.spid.clone(),
            };
            fs::write(
                config.data_dir.join(SIGNUP_FILE),
                serde_json::to_string_pretty(&record)?,
            )?;
            println!("public key: {}", record.public_key);
            println!("manifest hash: {}", record.manifest_hash);
        }
        Commands::Unseal => {
            let sealed = read_identity(&config.data_dir)?;
            let public_key = session.unseal_signup_data(&sealed)?;
            println!("public key: {}", public_key.encode());
        }
        Commands::Release => {
            let sealed = read_identity(&config.data_dir)?;
            session.release_signup_data(&sealed)?;
            for file in [IDENTITY_FILE, SIGNUP_FILE, TIMER_FILE] {
                let _ = fs::remove_file(config.data_dir.join(file));
            }
            info!("Identity released.");
        }
        Commands::Timer {
            address,
            previous_certificate_id,
            request_time,
            local_mean,
        } => {
            let sealed = read_identity(&config.data_dir)?;
            let timer = session.create_wait_timer(
                &sealed,
                &address,
                &previous_certificate_id,
                request_time,
                local_mean,
            )?;
            fs::write(
                config.data_dir.join(TIMER_FILE),
                serde_json::to_string(&timer)?,
            )?;
            println!("{}", timer.serialized);
        }
        Commands::Certificate { block_hash } => {
            let sealed = read_identity(&config.data_dir)?;
            let timer_path = config.data_dir.join(TIMER_FILE);
            let timer: SignedTimer = serde_json::from_str(
                &fs::read_to_string(&timer_path).wrap_err("no pending wait timer")?,
            )?;
            let bundle = session.create_wait_certificate(
                &sealed,
                &timer.serialized,
                &timer.signature,
                &block_hash,
            )?;
            // persist the refreshed identity first; the old blob is dead
            // the moment the certificate exists
            write_identity(&config.data_dir, &bundle.refreshed_identity)?;
            let _ = fs::remove_file(timer_path);
            println!("{}", bundle.serialized);
            println!("identifier: {}", certificate_identifier(&bundle.serialized));
            println!("signature: {}", bundle.signature.encode());
        }
        Commands::VerifySignup {
            originator,
            public_key,
            quote,
            manifest_hash,
        } => {
            let public_key = HexBytes::<32>::decode(&public_key)
                .map_err(|e| eyre!("invalid public key: {e}"))?;
            let manifest_hash = HexBytes::<32>::decode(&manifest_hash)
                .map_err(|e| eyre!("invalid manifest hash: {e}"))?;
            session.verify_signup_info(&originator, &public_key, &quote, &manifest_hash)?;
            println!("signup information verified");
        }
        Commands::Facts => {
            let facts = session.attestation_facts()?;
            println!("measurement: {}", facts.measurement.encode());
            println!("basename: {}", facts.basename.encode());
            println!("manifest hash: {}", facts.manifest_hash.encode());
        }
    }

    Ok(())
}

fn read_identity(data_dir: &Path) -> eyre::Result<Vec<u8>> {
    fs::read(data_dir.join(IDENTITY_FILE))
        .wrap_err("no sealed identity found, run the signup command first")
}

fn write_identity(data_dir: &Path, sealed: &[u8]) -> eyre::Result<()> {
    let path = data_dir.join(IDENTITY_FILE);
    let staged: PathBuf = path.with_extension("seal.new");
    fs::write(&staged, sealed)?;
    fs::rename(&staged, &path)?;
    Ok(())
}

fn init_logging() {
    let _ = tracing_log::LogTracer::init();
    tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
