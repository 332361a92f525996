//! tfrecord-cli
//!
//! Command-line tool for inspecting TFRecord files.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tfrecord_fast::scan::{self, ScanOutcome};
use tfrecord_fast::{Config, RecordSource, ShuffleReader};
use tracing_subscriber::{fmt, EnvFilter};

/// tfrecord-cli
#[derive(Parser, Debug)]
#[command(name = "tfrecord-cli")]
#[command(about = "Inspect and verify TFRecord files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count records in a file
    Count {
        path: PathBuf,

        /// Skip checksum verification
        #[arg(long)]
        no_verify: bool,
    },

    /// Check every frame and report where the file stops being valid
    Verify {
        path: PathBuf,
    },

    /// Print "<offset> <frame_len>" for every frame
    Index {
        path: PathBuf,
    },

    /// Print record lengths and a hex prefix of each payload
    Cat {
        path: PathBuf,

        /// Stop after this many records
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Shuffle pool size in records (0 = file order)
        #[arg(long, default_value = "0")]
        shuffle: usize,

        /// Seed for the shuffle order
        #[arg(long)]
        seed: Option<u64>,

        /// Payload bytes to show per record
        #[arg(long, default_value = "16")]
        preview: usize,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tfrecord_fast=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args.command) {
        Ok(ExitStatus::Ok) => {}
        Ok(ExitStatus::Damaged) => std::process::exit(2),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Outcome of a command that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitStatus {
    Ok,
    /// The file is truncated or fails a checksum
    Damaged,
}

fn run(command: Commands) -> tfrecord_fast::Result<ExitStatus> {
    match command {
        Commands::Count { path, no_verify } => {
            let report = scan::verify_file(&path, !no_verify)?;
            println!("{}", report.records);
            if !report.is_clean() {
                tracing::warn!("stream ended early: {:?}", report.outcome);
                return Ok(ExitStatus::Damaged);
            }
        }

        Commands::Verify { path } => {
            let report = scan::verify_file(&path, true)?;
            println!("records:     {}", report.records);
            println!("valid bytes: {} / {}", report.valid_bytes, report.total_bytes);
            match report.outcome {
                ScanOutcome::Clean => println!("status:      ok"),
                ScanOutcome::Truncated { offset } => {
                    println!("status:      truncated frame at offset {}", offset);
                    return Ok(ExitStatus::Damaged);
                }
                ScanOutcome::Corrupt { offset, field } => {
                    println!("status:      {} checksum mismatch at offset {}", field, offset);
                    return Ok(ExitStatus::Damaged);
                }
            }
        }

        Commands::Index { path } => {
            let index = scan::build_file_index(&path)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            scan::write_index(&index, &mut out)?;
        }

        Commands::Cat {
            path,
            limit,
            shuffle,
            seed,
            preview,
        } => {
            let mut builder = Config::builder().shuffle_buffer_size(shuffle);
            if let Some(seed) = seed {
                builder = builder.shuffle_seed(seed);
            }
            let config = builder.build();

            let reader = ShuffleReader::open_with_config(&path, &config)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();

            for (i, record) in reader.records().take(limit.unwrap_or(usize::MAX)).enumerate() {
                let record = record?;
                let shown = &record[..record.len().min(preview)];
                let hex: String = shown.iter().map(|b| format!("{:02x}", b)).collect();
                let ellipsis = if record.len() > preview { "..." } else { "" };
                writeln!(out, "{}\t{}\t{}{}", i, record.len(), hex, ellipsis)?;
            }
        }
    }

    Ok(ExitStatus::Ok)
}
