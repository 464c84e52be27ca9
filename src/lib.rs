// lib.rs - Library interface for the torrent metadata tools

pub mod bencode;
pub mod config;
pub mod download;
pub mod peer;
pub mod torrent;

// Re-export commonly used types for easier testing
pub use bencode::{decode, encode_bvalue, BValue, BencodeError};
pub use download::{DownloadError, Downloader};
pub use peer::{decode_peers, PeerEndpoint, PeerError};
pub use torrent::{ParseError, ResourceDescriptor};
