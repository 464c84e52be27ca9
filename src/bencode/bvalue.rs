use std::collections::BTreeMap;

/// A decoded bencode value.
///
/// Dictionaries use a `BTreeMap` so that iteration order is the canonical
/// (byte-wise lexicographic) key order regardless of how the source was laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BValue {
	ByteString(Vec<u8>), // raw bytes for any string
	Integer(i64),
	List(Vec<BValue>),
	Dict(BTreeMap<String, BValue>) // keys are always UTF-8 in .torrent
}

impl BValue {
	/// Builds a byte string from UTF-8 text.
	pub fn string(s: &str) -> Self {
		BValue::ByteString(s.as_bytes().to_vec())
	}

	pub fn as_integer(&self) -> Option<i64> {
		match self {
			BValue::Integer(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			BValue::ByteString(b) => Some(b),
			_ => None,
		}
	}

	/// Returns the byte string as `&str` if it is valid UTF-8.
	pub fn as_str(&self) -> Option<&str> {
		self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
	}

	pub fn as_list(&self) -> Option<&[BValue]> {
		match self {
			BValue::List(l) => Some(l),
			_ => None,
		}
	}

	pub fn as_dict(&self) -> Option<&BTreeMap<String, BValue>> {
		match self {
			BValue::Dict(d) => Some(d),
			_ => None,
		}
	}

	/// Looks up `key` if this value is a dictionary.
	pub fn get(&self, key: &str) -> Option<&BValue> {
		self.as_dict().and_then(|d| d.get(key))
	}

	/// Short name of the variant, used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			BValue::ByteString(_) => "byte string",
			BValue::Integer(_) => "integer",
			BValue::List(_) => "list",
			BValue::Dict(_) => "dictionary",
		}
	}
}

impl From<i64> for BValue {
	fn from(i: i64) -> Self {
		BValue::Integer(i)
	}
}

impl From<&str> for BValue {
	fn from(s: &str) -> Self {
		BValue::string(s)
	}
}

impl From<Vec<u8>> for BValue {
	fn from(bytes: Vec<u8>) -> Self {
		BValue::ByteString(bytes)
	}
}
