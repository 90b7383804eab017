//! licgen: issue and check signed license files.
//!
//! Usage:
//!   licgen keygen --out-dir keys
//!   licgen issue --customer "Acme Corp" --days 30
//!   licgen verify --license licencas/ACME\ CORP_20240101_090000.lic
//!
//! Settings come from `<config dir>/licgen/config.toml` unless `--config` is
//! given; command-line flags override them.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use licgen_license::{
    Clock, KeyFiles, KeyPair, LicenseIssuer, LicenseVerifier, LicgenConfig, RetentionPolicy,
    SystemClock, VerificationResult, read_packet,
};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "licgen")]
#[command(about = "Issue and verify RSA-signed license files")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an RSA-2048 key pair
    Keygen {
        /// Directory for chave_privada.pem / chave_publica.pem (default: configured paths)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Replace existing key files
        #[arg(long)]
        force: bool,
    },

    /// Issue a signed license
    Issue {
        /// Customer name
        #[arg(long)]
        customer: String,
        /// Days of validity from today
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,
        /// Output file (default: license directory with a generated name)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Generate a key pair if the private key is missing
        #[arg(long)]
        generate_keys: bool,
    },

    /// Verify a license file
    Verify {
        /// License file to check
        #[arg(long)]
        license: PathBuf,
        /// Public key PEM (default: configured path)
        #[arg(long)]
        public_key: Option<PathBuf>,
        /// Also accept licenses signed by the earlier desktop tool
        #[arg(long)]
        legacy: bool,
    },

    /// List license files, newest first
    List,

    /// Delete all but the newest license files
    Prune {
        /// Number of files to keep
        #[arg(long)]
        keep: Option<usize>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(
        cli.config.as_deref(),
        &LicgenConfig::default_path(),
        cli.verbose,
        std::io::stderr,
    )?;
    init_tracing(cli.verbose, config.log_file.as_deref())?;

    run(cli.command, &config)
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Loads settings under a temporary subscriber writing to `writer`; the
/// configured log file is not known until this returns.
fn load_config<W>(
    explicit: Option<&Path>,
    default_path: &Path,
    verbose: bool,
    writer: W,
) -> Result<LicgenConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_target(false)
        .compact()
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(bootstrap, || match explicit {
        Some(path) => LicgenConfig::try_load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(LicgenConfig::load_from(default_path)),
    })
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

fn run(command: Command, config: &LicgenConfig) -> Result<ExitCode> {
    match command {
        Command::Keygen { out_dir, force } => {
            let files = out_dir.map_or_else(|| config.key_files(), |dir| KeyFiles::in_dir(&dir));
            keygen(&files, force)?;
            println!("Private key: {}", files.private_key.display());
            println!("Public key:  {}", files.public_key.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Issue {
            customer,
            days,
            out,
            generate_keys,
        } => {
            let days = days.unwrap_or(config.default_validity_days);
            let path = issue(
                config,
                &customer,
                days,
                out.as_deref(),
                generate_keys,
                &SystemClock,
            )?;
            println!("License written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify {
            license,
            public_key,
            legacy,
        } => {
            let key_path = public_key.unwrap_or_else(|| config.public_key_path.clone());
            let legacy = legacy || config.accept_legacy_encoding;
            let result = verify(&license, &key_path, legacy)?;
            println!("{}: {result}", license.display());
            Ok(if result.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::List => {
            for path in config.license_store().list()? {
                match read_packet(&path) {
                    Ok(packet) => println!(
                        "{}\t{}\t{}",
                        path.display(),
                        packet.license.customer_name,
                        packet.license.expiry_date
                    ),
                    Err(e) => println!("{}\t(unreadable: {e})", path.display()),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Prune { keep } => {
            let policy = RetentionPolicy::new(keep.unwrap_or(config.retention_keep));
            let removed = policy.prune(&config.license_dir);
            println!("Removed {} license file(s)", removed.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn keygen(files: &KeyFiles, force: bool) -> Result<()> {
    let pair = KeyPair::generate().context("Failed to generate key pair")?;
    files
        .write(&pair, force)
        .context("Failed to write key files (use --force to replace existing keys)")?;
    info!("RSA key pair generated");
    Ok(())
}

fn issue(
    config: &LicgenConfig,
    customer: &str,
    days: i64,
    out: Option<&Path>,
    generate_keys: bool,
    clock: &impl Clock,
) -> Result<PathBuf> {
    let private_key = config
        .key_files()
        .load_private(generate_keys || config.generate_keys_if_missing)
        .context("Failed to load private key")?;
    let issuer = LicenseIssuer::with_clock(private_key, clock);

    let packet = issuer.issue(customer, days).inspect_err(|e| {
        error!(customer = %customer, error = %e, "License issuance failed");
    })?;

    let store = config.license_store();
    let path = match out {
        Some(path) => {
            store.save_as(path, &packet)?;
            path.to_path_buf()
        }
        None => store.save(&packet, clock.now())?,
    };
    info!(
        customer = %packet.license.customer_name,
        days,
        path = %path.display(),
        "License issued"
    );
    Ok(path)
}

fn verify(license: &Path, public_key: &Path, legacy: bool) -> Result<VerificationResult> {
    let packet_bytes = fs::read(license)
        .with_context(|| format!("Failed to read license {}", license.display()))?;
    let key_bytes = fs::read(public_key)
        .with_context(|| format!("Failed to read public key {}", public_key.display()))?;

    let result = match LicenseVerifier::from_public_pem(&key_bytes) {
        Ok(verifier) => verifier
            .accept_legacy_encoding(legacy)
            .verify_bytes(&packet_bytes),
        Err(e) => {
            warn!(path = %public_key.display(), error = %e, "Unusable public key");
            VerificationResult::SignatureInvalid
        }
    };
    info!(path = %license.display(), %result, "License checked");
    Ok(result)
}
