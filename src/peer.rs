use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use serde::Serialize;
use thiserror::Error;

/// Bytes per record in the compact peer format: 4 for the IP, 2 for the port.
pub const COMPACT_PEER_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("compact peer list of {0} bytes is not a multiple of 6")]
    Malformed(usize),
}

/// Connection info for one remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeerEndpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl PeerEndpoint {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    fn from_compact(record: &[u8]) -> Self {
        let ip = Ipv4Addr::new(record[0], record[1], record[2], record[3]);
        let port = u16::from_be_bytes([record[4], record[5]]);
        Self { ip, port }
    }
}

impl fmt::Display for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl From<PeerEndpoint> for SocketAddrV4 {
    fn from(peer: PeerEndpoint) -> Self {
        SocketAddrV4::new(peer.ip, peer.port)
    }
}

impl From<PeerEndpoint> for SocketAddr {
    fn from(peer: PeerEndpoint) -> Self {
        SocketAddr::V4(peer.into())
    }
}

/// Parses a compact peer list: `[IP(4), Port(2)]` records back to back.
///
/// Records come out in wire order, with no filtering or deduplication. A blob
/// whose length is not a multiple of 6 is rejected as a whole.
pub fn decode_peers(blob: &[u8]) -> Result<Vec<PeerEndpoint>, PeerError> {
    if blob.len() % COMPACT_PEER_LEN != 0 {
        return Err(PeerError::Malformed(blob.len()));
    }

    Ok(blob
        .chunks_exact(COMPACT_PEER_LEN)
        .map(PeerEndpoint::from_compact)
        .collect())
}
