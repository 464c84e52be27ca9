use std::{
    collections::BTreeMap,
    fs::File,
    io::Read,
    path::Path,
};

use serde::{Serialize, Serializer};

use crate::bencode::{decode, BValue};
use crate::torrent::error::ParseError;
use crate::torrent::info_hash;

/// Size of one SHA-1 piece hash in the `pieces` blob.
pub const PIECE_HASH_LEN: usize = 20;

/// Flattened, validated view of a single-file .torrent.
///
/// Only built through the parsing constructors, which validate every field.
/// It serializes with the digests as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub announce: String,              // The tracker URL
    #[serde(serialize_with = "hex::serde::serialize")]
    pub info_hash: [u8; 20],           // SHA-1 of the canonical info dict
    #[serde(serialize_with = "serialize_hex_list")]
    pub piece_hashes: Vec<[u8; 20]>,   // index in this vec is the piece index
    pub piece_length: u64,             // Size of each piece but maybe the last
    pub length: u64,                   // Total size of the file
    pub name: String,                  // Suggested file name
}

impl ResourceDescriptor {
    /// Parses raw .torrent bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ParseError> {
        let bvalue = decode(raw)?;
        Self::from_bvalue(&bvalue)
    }

    /// Reads a .torrent to the end and parses it.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ParseError> {
        Self::from_reader_limited(reader, u64::MAX)
    }

    /// Like `from_reader`, but gives up once more than `limit` bytes arrive.
    ///
    /// The cap is enforced while reading, so sources without a meaningful size
    /// (pipes, devices, growing files) cannot get past it.
    pub fn from_reader_limited<R: Read>(reader: R, limit: u64) -> Result<Self, ParseError> {
        let mut buf = Vec::new();
        reader.take(limit.saturating_add(1)).read_to_end(&mut buf)?;
        if buf.len() as u64 > limit {
            return Err(ParseError::TooLarge(limit));
        }
        Self::from_bytes(&buf)
    }

    /// Reads a .torrent file from disk and parses it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        Self::from_reader(File::open(path)?)
    }

    /// Creates a `ResourceDescriptor` from an already decoded tree.
    ///
    /// The root must be a dictionary with a string `announce` and a dictionary
    /// `info` carrying `name`, `length`, `piece length` and `pieces`. The info
    /// hash covers every key under `info`, including ones not read here.
    pub fn from_bvalue(value: &BValue) -> Result<Self, ParseError> {
        let root_dict = match value {
            BValue::Dict(m) => m,
            other => {
                return Err(ParseError::Schema(format!(
                    "root of .torrent must be a dictionary, found {}",
                    other.kind()
                )))
            }
        };

        let announce = get_string(root_dict, "announce")?;

        let info_value = root_dict
            .get("info")
            .ok_or_else(|| ParseError::Schema("missing 'info'".to_string()))?;
        let info_dict = match info_value {
            BValue::Dict(m) => m,
            other => {
                return Err(ParseError::Schema(format!(
                    "'info' must be a dictionary, found {}",
                    other.kind()
                )))
            }
        };

        let name = get_string(info_dict, "name")?;

        let length = get_integer(info_dict, "length")?;
        let length = u64::try_from(length)
            .map_err(|_| ParseError::Schema(format!("'length' must not be negative, got {}", length)))?;

        let piece_length = get_integer(info_dict, "piece length")?;
        if piece_length <= 0 {
            return Err(ParseError::Schema(format!(
                "'piece length' must be positive, got {}",
                piece_length
            )));
        }

        let pieces = lookup_bytestring(info_dict, "pieces")?;
        let piece_hashes = split_piece_hashes(pieces)?;

        Ok(ResourceDescriptor {
            announce,
            info_hash: info_hash(info_value),
            piece_hashes,
            piece_length: piece_length as u64,
            length,
            name,
        })
    }

    pub fn piece_count(&self) -> usize {
        self.piece_hashes.len()
    }

    /// Byte size of piece `index`; the last piece may be shorter than `piece_length`.
    pub fn piece_size(&self, index: usize) -> Option<u64> {
        if index >= self.piece_count() {
            return None;
        }
        let offset = self.piece_length.saturating_mul(index as u64);
        Some(self.length.saturating_sub(offset).min(self.piece_length))
    }

    pub fn info_hash_hex(&self) -> String {
        hex::encode(self.info_hash)
    }
}

fn serialize_hex_list<S: Serializer>(hashes: &[[u8; 20]], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(hashes.iter().map(hex::encode))
}

/// Splits the concatenated `pieces` blob into 20-byte hashes, keeping order.
pub fn split_piece_hashes(pieces: &[u8]) -> Result<Vec<[u8; 20]>, ParseError> {
    if pieces.len() % PIECE_HASH_LEN != 0 {
        return Err(ParseError::Malformed(format!(
            "pieces length not multiple of 20 (got {} bytes)",
            pieces.len()
        )));
    }

    Ok(pieces
        .chunks_exact(PIECE_HASH_LEN)
        .map(|chunk| {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(chunk);
            hash
        })
        .collect())
}

/// Looks up a key in the dictionary and returns a byte slice if the value is a ByteString.
pub fn lookup_bytestring<'a>(
    dict: &'a BTreeMap<String, BValue>,
    key: &str,
) -> Result<&'a [u8], ParseError> {
    let val = dict
        .get(key)
        .ok_or_else(|| ParseError::Schema(format!("missing '{}'", key)))?;

    match val {
        BValue::ByteString(b) => Ok(b),
        other => Err(ParseError::Schema(format!(
            "'{}' must be a byte string, found {}",
            key,
            other.kind()
        ))),
    }
}

/// Gets a ByteString from the dictionary as a UTF-8 `String`.
pub fn get_string(dict: &BTreeMap<String, BValue>, key: &str) -> Result<String, ParseError> {
    let bytes = lookup_bytestring(dict, key)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ParseError::Schema(format!("'{}' value not valid UTF-8", key)))
}

/// Retrieves an integer value from the dictionary.
pub fn get_integer(dict: &BTreeMap<String, BValue>, key: &str) -> Result<i64, ParseError> {
    let val = dict
        .get(key)
        .ok_or_else(|| ParseError::Schema(format!("missing '{}'", key)))?;

    match val {
        BValue::Integer(i) => Ok(*i),
        other => Err(ParseError::Schema(format!(
            "'{}' must be an integer, found {}",
            key,
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::{encode_bvalue, BencodeError};

    fn info_dict(pieces: Vec<u8>) -> BTreeMap<String, BValue> {
        let mut info = BTreeMap::new();
        info.insert("name".to_string(), BValue::string("sample.txt"));
        info.insert("length".to_string(), BValue::Integer(92063));
        info.insert("piece length".to_string(), BValue::Integer(32768));
        info.insert("pieces".to_string(), BValue::ByteString(pieces));
        info
    }

    fn torrent_with_info(info: BValue) -> Vec<u8> {
        let mut root = BTreeMap::new();
        root.insert("announce".to_string(), BValue::string("http://tracker.example.com/announce"));
        root.insert("info".to_string(), info);
        encode_bvalue(&BValue::Dict(root))
    }

    fn torrent_bytes(pieces: Vec<u8>) -> Vec<u8> {
        torrent_with_info(BValue::Dict(info_dict(pieces)))
    }

    fn sample_pieces(count: u8) -> Vec<u8> {
        (0..count).flat_map(|i| [i; 20]).collect()
    }

    #[test]
    fn test_parse_valid_torrent() {
        let pieces = sample_pieces(3);
        let descriptor = ResourceDescriptor::from_bytes(&torrent_bytes(pieces)).unwrap();

        assert_eq!(descriptor.announce, "http://tracker.example.com/announce");
        assert_eq!(descriptor.name, "sample.txt");
        assert_eq!(descriptor.length, 92063);
        assert_eq!(descriptor.piece_length, 32768);
        assert_eq!(descriptor.piece_count(), 3);
        assert_eq!(descriptor.piece_hashes[2], [2u8; 20]);
    }

    #[test]
    fn test_info_hash_covers_only_info_dict() {
        let info = BValue::Dict(info_dict(sample_pieces(1)));
        let descriptor = ResourceDescriptor::from_bytes(&torrent_with_info(info.clone())).unwrap();
        assert_eq!(descriptor.info_hash, info_hash(&info));
    }

    #[test]
    fn test_info_hash_includes_extra_keys() {
        let plain = ResourceDescriptor::from_bytes(&torrent_bytes(sample_pieces(1))).unwrap();

        let mut info = info_dict(sample_pieces(1));
        info.insert("private".to_string(), BValue::Integer(1));
        let private = ResourceDescriptor::from_bytes(&torrent_with_info(BValue::Dict(info))).unwrap();

        assert_ne!(plain.info_hash, private.info_hash);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let raw = torrent_bytes(sample_pieces(2));
        let first = ResourceDescriptor::from_bytes(&raw).unwrap();
        let second = ResourceDescriptor::from_bytes(&raw).unwrap();
        assert_eq!(first.info_hash, second.info_hash);
        assert_eq!(first, second);
    }

    #[test]
    fn test_forty_byte_pieces_split_in_order() {
        let mut pieces = vec![0xAAu8; 20];
        pieces.extend_from_slice(&[0xBBu8; 20]);
        let descriptor = ResourceDescriptor::from_bytes(&torrent_bytes(pieces)).unwrap();

        assert_eq!(descriptor.piece_hashes, vec![[0xAAu8; 20], [0xBBu8; 20]]);
    }

    #[test]
    fn test_empty_pieces_is_valid() {
        let descriptor = ResourceDescriptor::from_bytes(&torrent_bytes(Vec::new())).unwrap();
        assert!(descriptor.piece_hashes.is_empty());
    }

    #[test]
    fn test_pieces_not_multiple_of_20() {
        for len in [1usize, 19, 21, 39, 41] {
            let result = ResourceDescriptor::from_bytes(&torrent_bytes(vec![0u8; len]));
            assert!(
                matches!(result, Err(ParseError::Malformed(_))),
                "length {} should be malformed",
                len
            );
        }
    }

    #[test]
    fn test_missing_info() {
        let raw = b"d8:announce3:urle";
        assert!(matches!(ResourceDescriptor::from_bytes(raw), Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_info_not_a_dict() {
        let raw = b"d8:announce3:url4:infoli1eee";
        assert!(matches!(ResourceDescriptor::from_bytes(raw), Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_missing_announce() {
        let raw = b"d4:infodee";
        assert!(matches!(ResourceDescriptor::from_bytes(raw), Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_root_not_a_dict() {
        assert!(matches!(ResourceDescriptor::from_bytes(b"li1ee"), Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_missing_info_fields() {
        for key in ["name", "length", "piece length", "pieces"] {
            let mut info = info_dict(sample_pieces(1));
            info.remove(key);
            let result = ResourceDescriptor::from_bytes(&torrent_with_info(BValue::Dict(info)));
            assert!(matches!(result, Err(ParseError::Schema(_))), "missing {}", key);
        }
    }

    #[test]
    fn test_wrong_typed_fields() {
        let mut info = info_dict(sample_pieces(1));
        info.insert("length".to_string(), BValue::string("92063"));
        let result = ResourceDescriptor::from_bytes(&torrent_with_info(BValue::Dict(info)));
        assert!(matches!(result, Err(ParseError::Schema(_))));

        let mut info = info_dict(sample_pieces(1));
        info.insert("pieces".to_string(), BValue::Integer(0));
        let result = ResourceDescriptor::from_bytes(&torrent_with_info(BValue::Dict(info)));
        assert!(matches!(result, Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_negative_and_zero_lengths_rejected() {
        let mut info = info_dict(sample_pieces(1));
        info.insert("length".to_string(), BValue::Integer(-1));
        let result = ResourceDescriptor::from_bytes(&torrent_with_info(BValue::Dict(info)));
        assert!(matches!(result, Err(ParseError::Schema(_))));

        let mut info = info_dict(sample_pieces(1));
        info.insert("piece length".to_string(), BValue::Integer(0));
        let result = ResourceDescriptor::from_bytes(&torrent_with_info(BValue::Dict(info)));
        assert!(matches!(result, Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_non_utf8_name_rejected() {
        let mut info = info_dict(sample_pieces(1));
        info.insert("name".to_string(), BValue::ByteString(vec![0xff, 0xfe]));
        let result = ResourceDescriptor::from_bytes(&torrent_with_info(BValue::Dict(info)));
        assert!(matches!(result, Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_non_utf8_announce_rejected() {
        let mut root = BTreeMap::new();
        root.insert("announce".to_string(), BValue::ByteString(vec![b'h', 0xc3, 0x28]));
        root.insert("info".to_string(), BValue::Dict(info_dict(sample_pieces(1))));
        let result = ResourceDescriptor::from_bytes(&encode_bvalue(&BValue::Dict(root)));
        assert!(matches!(result, Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_announce_wrong_type_rejected() {
        let mut raw = b"d8:announcei1e4:info".to_vec();
        raw.extend_from_slice(&encode_bvalue(&BValue::Dict(info_dict(sample_pieces(1)))));
        raw.push(b'e');
        let result = ResourceDescriptor::from_bytes(&raw);
        assert!(matches!(result, Err(ParseError::Schema(msg)) if msg.contains("announce")));
    }

    #[test]
    fn test_non_utf8_info_key_is_encoding_error() {
        let raw = b"d8:announce3:url4:infod2:\xc3\x28i1eee";
        assert!(matches!(
            ResourceDescriptor::from_bytes(raw),
            Err(ParseError::Encoding(BencodeError::InvalidFormat(_)))
        ));
    }

    #[test]
    fn test_invalid_bencode() {
        let result = ResourceDescriptor::from_bytes(b"d8:announce");
        assert!(matches!(result, Err(ParseError::Encoding(_))));

        let mut raw = torrent_bytes(sample_pieces(1));
        raw.push(b'x');
        assert!(matches!(ResourceDescriptor::from_bytes(&raw), Err(ParseError::Encoding(_))));
    }

    #[test]
    fn test_from_reader() {
        let raw = torrent_bytes(sample_pieces(2));
        let descriptor = ResourceDescriptor::from_reader(std::io::Cursor::new(raw)).unwrap();
        assert_eq!(descriptor.piece_count(), 2);
    }

    #[test]
    fn test_from_reader_limited() {
        let raw = torrent_bytes(sample_pieces(2));
        let limit = raw.len() as u64;

        let descriptor = ResourceDescriptor::from_reader_limited(raw.as_slice(), limit).unwrap();
        assert_eq!(descriptor.piece_count(), 2);

        let result = ResourceDescriptor::from_reader_limited(raw.as_slice(), limit - 1);
        assert!(matches!(result, Err(ParseError::TooLarge(n)) if n == limit - 1));
    }

    #[test]
    fn test_from_reader_limited_stops_on_endless_input() {
        let result = ResourceDescriptor::from_reader_limited(std::io::repeat(b'd'), 64);
        assert!(matches!(result, Err(ParseError::TooLarge(64))));
    }

    #[test]
    fn test_serializes_digests_as_hex() {
        let descriptor = ResourceDescriptor::from_bytes(&torrent_bytes(sample_pieces(2))).unwrap();
        let json = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(json["info_hash"], descriptor.info_hash_hex());
        assert_eq!(json["piece_hashes"][0], "00".repeat(20));
        assert_eq!(json["piece_hashes"][1], "01".repeat(20));
        assert_eq!(json["piece_length"], 32768);
        assert_eq!(json["name"], "sample.txt");
    }

    #[test]
    fn test_piece_size() {
        let descriptor = ResourceDescriptor::from_bytes(&torrent_bytes(sample_pieces(3))).unwrap();
        assert_eq!(descriptor.piece_size(0), Some(32768));
        assert_eq!(descriptor.piece_size(1), Some(32768));
        assert_eq!(descriptor.piece_size(2), Some(92063 - 2 * 32768));
        assert_eq!(descriptor.piece_size(3), None);
    }

    #[test]
    fn test_split_piece_hashes_keeps_order() {
        let blob: Vec<u8> = (0..60u8).collect();
        let hashes = split_piece_hashes(&blob).unwrap();
        assert_eq!(hashes.len(), 3);
        assert_eq!(hashes[0][0], 0);
        assert_eq!(hashes[1][0], 20);
        assert_eq!(hashes[2][19], 59);
    }
}
