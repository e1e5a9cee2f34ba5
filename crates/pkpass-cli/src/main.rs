//! Command-line interface for building signed Apple Wallet passes.
//!
//! Provides a CLI for packaging a `pass.json` and its images into a signed
//! `.pkpass` using a PKCS#12 Pass Type ID certificate, plus a helper that
//! converts S/MIME detached signatures to DER.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pkpass::crypto::smime_to_der;
use pkpass::{Asset, Credential, Payload, PkPass};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pkpass")]
#[command(about = "Apple Wallet pass signing tool")]
struct Cli {
    /// Log more detail (repeat for trace output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and sign a .pkpass bundle
    Build(BuildArgs),

    /// Convert an S/MIME detached signature (smime.p7s) to DER
    ConvertSignature {
        /// S/MIME input file
        input: PathBuf,

        /// DER output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Pass Type ID certificate (.p12)
    #[arg(short = 'p', long)]
    pkcs12: PathBuf,

    /// Password for the PKCS#12 file
    #[arg(long, env = "PKPASS_PASSWORD", hide_env_values = true, default_value = "")]
    password: String,

    /// Apple WWDR intermediate certificate (PEM or DER)
    #[arg(short = 'w', long)]
    wwdr: Option<PathBuf>,

    /// pass.json payload
    #[arg(short = 'j', long)]
    json: PathBuf,

    /// Asset file, optionally renamed as PATH=NAME (repeatable; icon.png is required)
    #[arg(short = 'a', long = "asset", required = true)]
    assets: Vec<String>,

    /// Directory for per-build scratch space
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Download file name recorded on the package (defaults to the output file name)
    #[arg(long)]
    name: Option<String>,

    /// ZIP compression level (0-9)
    #[arg(short = 'z', long, default_value = "6")]
    zip_level: u32,

    /// Output file (defaults to pass.pkpass)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn initialize_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "pkpass=debug,info",
        _ => "pkpass=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.verbose);

    match cli.command {
        Command::Build(args) => build(args),
        Command::ConvertSignature { input, output } => convert_signature(&input, &output),
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let credential = Credential::from_p12_file(&args.pkcs12, args.password)
        .with_context(|| format!("loading {}", args.pkcs12.display()))?;
    let payload = Payload::from_file(&args.json)
        .with_context(|| format!("loading {}", args.json.display()))?;

    let assets = args
        .assets
        .iter()
        .map(|arg| parse_asset(arg))
        .collect::<Result<Vec<_>>>()?;

    let output = args.output.unwrap_or_else(|| PathBuf::from("pass.pkpass"));
    let name = args.name.unwrap_or_else(|| {
        output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pass.pkpass".to_string())
    });

    let mut pass = PkPass::new(credential, payload)
        .assets(assets)
        .compression_level(args.zip_level)
        .name(name);
    if let Some(wwdr) = args.wwdr {
        pass = pass.wwdr_certificate(wwdr);
    }
    if let Some(temp_dir) = args.temp_dir {
        pass = pass.temp_dir(temp_dir);
    }

    let package = pass.create().context("building pass")?;
    std::fs::write(&output, package.bytes())
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Signed: {} ({} bytes, {})",
        output.display(),
        package.content_length(),
        package.filename()
    );
    Ok(())
}

/// Parse `path` or `path=name`.
fn parse_asset(arg: &str) -> Result<Asset> {
    let asset = match arg.split_once('=') {
        Some((path, name)) => Asset::from_path_named(path, name),
        None => Asset::from_path(arg),
    };
    asset.with_context(|| format!("adding asset {arg}"))
}

fn convert_signature(input: &Path, output: &Path) -> Result<()> {
    let smime = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let der = smime_to_der(&smime).context("converting signature")?;
    std::fs::write(output, &der).with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(bytes = der.len(), "signature converted");
    println!("Converted: {}", output.display());
    Ok(())
}
