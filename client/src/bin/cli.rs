use clap::{Parser, Subcommand};
use tempo_client::{ExpectedFacts, check_signup_quote, check_wait_certificate, init_logging};

#[derive(Parser)]
#[command(version, about, long_about=None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Verify a broadcast wait certificate against its issuer's public key")]
    VerifyCertificate {
        #[arg(short, long, help = "The serialized wait certificate")]
        certificate: String,
        #[arg(short, long, help = "Hex encoded signature over the serialized certificate")]
        signature: String,
        #[arg(short, long, help = "Hex encoded public key of the issuing validator")]
        public_key: String,
        #[arg(long, help = "Identifier the certificate is expected to chain from")]
        previous_id: Option<String>,
        #[arg(long, help = "Block hash the certificate is expected to cover")]
        block_hash: Option<String>,
    },
    #[command(about = "Check a peer's signup quote against expected platform facts")]
    VerifySignup {
        #[arg(short, long, help = "Hex encoded hash of the peer's external public key")]
        originator: String,
        #[arg(short, long, help = "Hex encoded claimed public key")]
        public_key: String,
        #[arg(short, long, help = "Serialized quote from the claimed signup data")]
        quote: String,
        #[arg(long, help = "Hex encoded expected enclave measurement")]
        measurement: String,
        #[arg(long, help = "Hex encoded expected basename")]
        basename: String,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::VerifyCertificate {
            certificate,
            signature,
            public_key,
            previous_id,
            block_hash,
        } => {
            match check_wait_certificate(
                &certificate,
                &signature,
                &public_key,
                previous_id.as_deref(),
                block_hash.as_deref(),
            ) {
                Ok(checked) => println!("certificate verified, identifier: {}", checked.identifier),
                Err(e) => fail(e),
            }
        }
        Commands::VerifySignup {
            originator,
            public_key,
            quote,
            measurement,
            basename,
        } => {
            let result = ExpectedFacts::decode(&measurement, &basename)
                .and_then(|facts| check_signup_quote(&originator, &public_key, &quote, &facts));
            match result {
                Ok(key) => println!("signup verified, public key: {}", key.encode()),
                Err(e) => fail(e),
            }
        }
    }
}

fn fail(e: tempo_client::error::Error) -> ! {
    tracing::error!("{e}");
    std::process::exit(1);
}
