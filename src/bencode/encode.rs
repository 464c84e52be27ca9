use serde_json::{Value, json};
use super::BValue;

/// Encode a `BValue` back into canonical bencoded bytes.
///
/// Dictionary keys come out in byte-wise lexicographic order, so encoding the
/// same value twice always yields identical output.
pub fn encode_bvalue(value: &BValue) -> Vec<u8> {
	let mut out: Vec<u8> = Vec::new();
	write_bvalue(value, &mut out);
	out
}

fn write_bvalue(value: &BValue, out: &mut Vec<u8>) {
	match value {
		BValue::Integer(i) => {
			out.push(b'i');
			out.extend_from_slice(i.to_string().as_bytes());
			out.push(b'e');
		}
		BValue::ByteString(bytes) => write_bytes(bytes, out),
		BValue::List(items) => {
			out.push(b'l');
			for item in items {
				write_bvalue(item, out);
			}
			out.push(b'e');
		}
		BValue::Dict(dict) => {
			out.push(b'd');
			// BTreeMap<String, _> iterates in byte order of the UTF-8 keys
			for (key, val) in dict {
				write_bytes(key.as_bytes(), out);
				write_bvalue(val, out);
			}
			out.push(b'e');
		}
	}
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
	out.extend_from_slice(bytes.len().to_string().as_bytes());
	out.push(b':');
	out.extend_from_slice(bytes);
}

/// Convert a `BValue` into JSON (using Serde JSON `Value`).
///
/// - `Integer(i)` => JSON number
/// - `ByteString(bytes)` => Attempt UTF-8; if invalid, store hex in `"_bytes_hex"`.
/// - `List(...)` => JSON array
/// - `Dict(...)` => JSON object
pub fn bvalue_to_json(bv: &BValue) -> Value {
	match bv {
        BValue::Integer(i) => json!(i),

        BValue::ByteString(bytes) => match std::str::from_utf8(bytes) {
            Ok(utf8_str) => Value::String(utf8_str.to_string()),
            Err(_) => json!({ "_bytes_hex": hex::encode(bytes) }),
        },

		BValue::List(list_items) => {
            Value::Array(list_items.iter().map(bvalue_to_json).collect())
        }

        BValue::Dict(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                json_map.insert(k.clone(), bvalue_to_json(v));
            }
            Value::Object(json_map)
        }
	}
}
