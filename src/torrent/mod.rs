pub mod error;
pub mod infohash;
pub mod metadata;

pub use error::ParseError;
pub use infohash::info_hash;
pub use metadata::{ResourceDescriptor, split_piece_hashes, PIECE_HASH_LEN};
