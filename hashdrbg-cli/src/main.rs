// SPDX-License-Identifier: MIT
//
// Hash DRBG: Pluggable Entropy and Hash-Based CSPRNG
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara
//
// https://github.com/vbocan/qrng-data-diode

//! hashdrbg - command-line front end for the Hash DRBG engine
//!
//! Writes generated bytes to stdout in the requested encoding, or runs the
//! compressibility self-test and prints its report as JSON. Logs go to stderr
//! as JSON so they never mix with the output.

use anyhow::{Context, Result};
use base64::Engine as _;
use clap::{Parser, ValueEnum};
use hashdrbg_core::{BackendKind, DrbgConfig, Engine, SourceKind};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Hex,
    Base64,
    Binary,
}

#[derive(Parser, Debug)]
#[command(name = "hashdrbg")]
#[command(about = "Hash DRBG - hash-based CSPRNG with pluggable entropy", long_about = None)]
struct Args {
    /// Number of bytes to generate
    #[arg(short, long, default_value = "32")]
    bytes: usize,

    /// Output encoding
    #[arg(short, long, value_enum, default_value = "hex")]
    format: OutputFormat,

    /// Run the compressibility self-test instead of generating output
    #[arg(long, default_value = "false")]
    self_test: bool,

    /// Print engine metrics in Prometheus text format to stderr when done
    #[arg(long, default_value = "false")]
    metrics: bool,

    /// Path to a YAML or TOML configuration file (HASHDRBG_* variables otherwise)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Entropy source override (os, scheduler-jitter)
    #[arg(short, long)]
    source: Option<String>,

    /// Backend override (digest-chain, os)
    #[arg(long)]
    backend: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<DrbgConfig> {
    let mut config = match &args.config {
        Some(path) => DrbgConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => DrbgConfig::from_env().context("Failed to load configuration from environment")?,
    };

    if let Some(source) = &args.source {
        config.source = source.parse::<SourceKind>()?;
    }
    if let Some(backend) = &args.backend {
        config.backend = backend.parse::<BackendKind>()?;
    }
    config.validate()?;
    Ok(config)
}

fn encode(format: OutputFormat, bytes: &[u8]) -> Vec<u8> {
    match format {
        OutputFormat::Hex => format!("{}\n", hex::encode(bytes)).into_bytes(),
        OutputFormat::Base64 => {
            format!("{}\n", base64::engine::general_purpose::STANDARD.encode(bytes)).into_bytes()
        }
        OutputFormat::Binary => bytes.to_vec(),
    }
}

fn run(args: &Args, engine: &Engine) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    if args.self_test {
        let report = engine.self_test().context("Self-test failed to run")?;
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
        if report.suspicious {
            anyhow::bail!("self-test flagged output as compressible (ratio {:.3})", report.ratio);
        }
        return Ok(());
    }

    let bytes = engine
        .next_bytes(args.bytes)
        .context("Failed to generate random bytes")?;
    stdout.write_all(&encode(args.format, &bytes))?;
    stdout.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("Hash DRBG v{}", hashdrbg_core::VERSION);

    let config = load_config(&args)?;
    info!(
        source = config.source.name(),
        backend = ?config.backend,
        algorithm = %config.algorithm,
        "Configuration loaded"
    );

    let engine = Engine::from_config(config).context("Failed to construct engine")?;
    let result = run(&args, &engine);

    if args.metrics {
        eprint!("{}", engine.metrics().prometheus_format());
    }
    engine.close();
    result
}
