// src/engine.rs
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, info};

use btmeta::bencode::{bvalue_to_json, decode};
use btmeta::config::{Config, DEFAULT_CONFIG_PATH};
use btmeta::download::Downloader;
use btmeta::peer::decode_peers;
use btmeta::torrent::ResourceDescriptor;

#[derive(Debug, Parser)]
#[command(name = "btmeta", version, about = "Inspect .torrent metadata and compact peer lists")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a bencoded value as JSON
    Decode { bencoded: String },
    /// Print the metadata of a .torrent file
    Info {
        torrent: PathBuf,
        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a hex-encoded compact peer list
    Peers {
        hex_blob: String,
        /// Print the peers as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Download the content of a .torrent file
    Download { torrent: PathBuf, output: PathBuf },
}

pub fn use_command<W: Write>(
    command: Command,
    config: &Config,
    downloader: &dyn Downloader,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Command::Decode { bencoded } => {
            let value = decode(bencoded.as_bytes()).context("invalid bencoded value")?;
            writeln!(out, "{}", serde_json::to_string(&bvalue_to_json(&value))?)?;
        }
        Command::Info { torrent, json: true } => {
            let descriptor = load_descriptor(&torrent, config)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&descriptor)?)?;
        }
        Command::Info { torrent, json: false } => {
            let descriptor = load_descriptor(&torrent, config)?;
            writeln!(out, "Tracker URL: {}", descriptor.announce)?;
            writeln!(out, "File Name: {}", descriptor.name)?;
            writeln!(out, "Length: {}", descriptor.length)?;
            writeln!(out, "Info Hash: {}", descriptor.info_hash_hex())?;
            writeln!(out, "Piece Length: {}", descriptor.piece_length)?;
            writeln!(out, "Number of Pieces: {}", descriptor.piece_count())?;
            writeln!(out, "Piece Hashes:")?;
            for piece_hash in &descriptor.piece_hashes {
                writeln!(out, "{}", hex::encode(piece_hash))?;
            }
        }
        Command::Peers { hex_blob, json } => {
            let blob = hex::decode(hex_blob.trim()).context("peer list is not valid hex")?;
            let peers = decode_peers(&blob)?;
            if json {
                writeln!(out, "{}", serde_json::to_string(&peers)?)?;
            } else {
                for peer in peers {
                    writeln!(out, "{}", peer)?;
                }
            }
        }
        Command::Download { torrent, output } => {
            let descriptor = load_descriptor(&torrent, config)?;
            let output = config.resolve_output(output);
            info!(
                "Downloading '{}' ({} bytes, {} pieces) to {}",
                descriptor.name,
                descriptor.length,
                descriptor.piece_count(),
                output.display()
            );
            downloader
                .download_to_file(&descriptor, &output)
                .with_context(|| format!("download of {} failed", torrent.display()))?;
            writeln!(out, "Downloaded {} to {}", descriptor.name, output.display())?;
        }
    }
    Ok(())
}

/// Reads and parses a .torrent, refusing files above the configured size.
fn load_descriptor(path: &Path, config: &Config) -> anyhow::Result<ResourceDescriptor> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let descriptor = ResourceDescriptor::from_reader_limited(file, config.max_torrent_size)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    debug!(
        "Parsed {}: info hash {}, {} pieces of {} bytes",
        path.display(),
        descriptor.info_hash_hex(),
        descriptor.piece_count(),
        descriptor.piece_length
    );
    Ok(descriptor)
}
