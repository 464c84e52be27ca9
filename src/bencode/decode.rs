use std::collections::BTreeMap;
use super::error::BencodeError;
use crate::bencode::bvalue::BValue;

/// Containers nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 64;

/// Decodes one complete bencoded value. The whole input must be consumed.
pub fn decode(input: &[u8]) -> Result<BValue, BencodeError> {
	let (consumed, value) = decode_bencode(input)?;
	if consumed != input.len() {
		return Err(BencodeError::TrailingData(input.len() - consumed));
	}
	Ok(value)
}

/// Decodes the value at the start of `input`, returning how many bytes it used.
pub fn decode_bencode(input: &[u8]) -> Result<(usize, BValue), BencodeError> {
	decode_value(input, 0)
}

fn decode_value(input: &[u8], depth: usize) -> Result<(usize, BValue), BencodeError> {
    if input.is_empty() {
        return Err(BencodeError::UnexpectedEnd);
    }

    match input[0] {
        b'i' => decode_integer(input),
        b'l' => decode_list(input, depth + 1),
        b'd' => decode_dict(input, depth + 1),
        c if c.is_ascii_digit() => decode_string(input),
        c => Err(BencodeError::InvalidFormat(format!(
            "Unexpected byte: {}",
            c
        ))),
    }
}

/// Decodes a Bencoded integer of the form `i<digits>e`.
fn decode_integer(input: &[u8]) -> Result<(usize, BValue), BencodeError> {
	let end_pos = input
		.iter()
		.position(|&b| b == b'e')
		.ok_or(BencodeError::UnexpectedEnd)?;

	let body = &input[1..end_pos];
	let digits = body.strip_prefix(b"-").unwrap_or(body);

	if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
		return Err(BencodeError::InvalidInteger(format!(
			"Not a number: {:?}",
			String::from_utf8_lossy(body)
		)));
	}

	// Leading zeros and negative zero are not canonical
	if (digits[0] == b'0' && digits.len() > 1) || (digits == b"0" && body.len() > 1) {
        return Err(BencodeError::InvalidInteger(format!(
            "Leading zeros are not allowed: {}",
            String::from_utf8_lossy(body)
        )));
	}

	// only ASCII digits and '-' are left, so this cannot fail
	let num_str = std::str::from_utf8(body)
		.map_err(|_| BencodeError::InvalidInteger("Non-UTF-8 data in integer".to_string()))?;

    let parsed = num_str.parse::<i64>()
		.map_err(|e| {
			BencodeError::InvalidInteger(format!("Failed to parse integer '{}': {}", num_str, e))
	})?;

	// add 1 to account for 'e'
    Ok((end_pos + 1, BValue::Integer(parsed)))
}

/// Decodes a Bencoded string of the form `<length>:<bytes>`.
fn decode_string(encoded: &[u8]) -> Result<(usize, BValue), BencodeError> {
	let digits_end = encoded
		.iter()
		.position(|b| !b.is_ascii_digit())
		.ok_or(BencodeError::UnexpectedEnd)?;

	if encoded[digits_end] != b':' {
		return Err(BencodeError::InvalidLength(format!(
			"Expected ':' after length, found byte {}",
			encoded[digits_end]
		)));
	}

	let prefix = &encoded[..digits_end];
	if prefix.is_empty() {
		return Err(BencodeError::InvalidLength("Empty length prefix".to_string()));
	}
	if prefix[0] == b'0' && prefix.len() > 1 {
		return Err(BencodeError::InvalidLength(format!(
			"Leading zeros in length: {}",
			String::from_utf8_lossy(prefix)
		)));
	}

	let length = String::from_utf8_lossy(prefix)
		.parse::<usize>()
		.map_err(|e| BencodeError::InvalidLength(format!(
			"{}: {}", String::from_utf8_lossy(prefix), e)))?;

	let start_data = digits_end + 1;
	let end_data = start_data
		.checked_add(length)
		.ok_or(BencodeError::UnexpectedEnd)?;

    if end_data > encoded.len() {
        return Err(BencodeError::UnexpectedEnd);
    }

	let data = &encoded[start_data..end_data];
    Ok((end_data, BValue::ByteString(data.to_vec())))
}

/// Decodes a Bencoded list of the form `l<items>e`.
fn decode_list(encoded: &[u8], depth: usize) -> Result<(usize, BValue), BencodeError> {
	if depth > MAX_DEPTH {
		return Err(BencodeError::NestingTooDeep(MAX_DEPTH));
	}

    let mut idx = 1; // skip 'l'
    let mut items = Vec::new();

    while idx < encoded.len() && encoded[idx] != b'e' {
        let (consumed, val) = decode_value(&encoded[idx..], depth)?;
        idx += consumed;
        items.push(val);
    }

    // If we've run out of input, the list is unclosed
    if idx >= encoded.len() {
        return Err(BencodeError::InvalidFormat(
            "Unclosed list (missing 'e')".to_string(),
        ));
    }

	// add 1 to account for 'e'
    Ok((idx + 1, BValue::List(items)))
}

/// Decodes a Bencoded dictionary of the form `d<key><value>...e`.
///
/// Keys are accepted in any order; the map re-sorts them.
fn decode_dict(encoded: &[u8], depth: usize) -> Result<(usize, BValue), BencodeError> {
	if depth > MAX_DEPTH {
		return Err(BencodeError::NestingTooDeep(MAX_DEPTH));
	}

    let mut idx = 1; // Skip the initial 'd'
    let mut map = BTreeMap::new();

    while idx < encoded.len() && encoded[idx] != b'e' {
        if !encoded[idx].is_ascii_digit() {
            return Err(BencodeError::InvalidFormat(
                "Dict key must be a ByteString".to_string(),
            ));
        }

        let (key_length, key_value) = decode_string(&encoded[idx..])?;
        idx += key_length;
        let key_str = match key_value {
            BValue::ByteString(bytes) => {
				String::from_utf8(bytes).map_err(|_| {
					BencodeError::InvalidFormat("Dict key not valid UTF-8".to_string())
				})?
			}
            _ => {
                return Err(BencodeError::InvalidFormat(
                    "Dict key must be a ByteString".to_string(),
                ));
            }
        };

        if map.contains_key(&key_str) {
            return Err(BencodeError::DuplicateKey(key_str));
        }

        let (consumed_val, value) = decode_value(&encoded[idx..], depth)?;
        idx += consumed_val;

        map.insert(key_str, value);
    }

    if idx >= encoded.len() {
        return Err(BencodeError::InvalidFormat(
            "Unclosed dictionary (missing 'e')".to_string(),
        ));
    }

	// add 1 to account for 'e'
    Ok((idx + 1, BValue::Dict(map)))
}
