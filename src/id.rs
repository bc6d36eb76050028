use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::ApiError;

/// Symbols a generated id is drawn from.
const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random bytes at or above this value are discarded to keep the mapping unbiased.
const MAX_ACCEPTED: usize = 256 - (256 % ALPHABET.len());

/// Length of freshly generated ids.
pub const ID_LENGTH: usize = 8;

/// Longest name accepted as an id when reading from the store.
const MAX_ID_LENGTH: usize = 64;

/// A validated paste identifier, safe to use as a file name inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PasteId(String);

impl PasteId {
    pub fn parse(value: &str) -> crate::ApiResult<Self> {
        let valid = !value.is_empty()
            && value.len() <= MAX_ID_LENGTH
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        if valid {
            Ok(PasteId(value.to_owned()))
        } else {
            Err(ApiError::InvalidId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PasteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a new random id from the operating system's secure source.
pub fn generate_id() -> crate::ApiResult<PasteId> {
    generate_id_with(&mut OsRng, ID_LENGTH)
}

fn generate_id_with<R: RngCore>(rng: &mut R, length: usize) -> crate::ApiResult<PasteId> {
    debug_assert!(length > 0, "paste ids cannot be empty");
    let mut id = String::with_capacity(length);
    // pull a few extra bytes per round so rejections rarely need another one
    let mut buf = vec![0u8; length + length / 4];

    while id.len() < length {
        rng.try_fill_bytes(&mut buf)?;
        for &b in &buf {
            let b = b as usize;
            if b >= MAX_ACCEPTED {
                continue;
            }
            id.push(ALPHABET[b % ALPHABET.len()] as char);
            if id.len() == length {
                break;
            }
        }
    }

    Ok(PasteId(id))
}
