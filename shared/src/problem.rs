//! Persisted wire formats: the problem descriptor (`"<headerHex>/<targetHex>"`)
//! and the solution record (`"<digestHex>/<nonceDecimal>"`).

use crate::{
    engine::{Pow, DIGEST_LEN},
    errors::FormatError,
};

/// The shared header+target value defining the current search. Its presence
/// in the store is the global "mining is active" flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub header: Vec<u8>,
    pub target: Pow,
}

impl Problem {
    pub fn parse(value: &[u8]) -> Result<Self, FormatError> {
        let text = std::str::from_utf8(value).map_err(|_| malformed("problem descriptor", value))?;
        let (header_hex, target_hex) =
            text.split_once('/').ok_or_else(|| malformed("problem descriptor", value))?;
        let header = hex::decode(header_hex)?;
        let target_bytes = hex::decode(target_hex)?;
        let target: Pow = target_bytes.try_into().map_err(|v: Vec<u8>| {
            FormatError::TargetWidth { expected: DIGEST_LEN, actual: v.len() }
        })?;
        Ok(Self { header, target })
    }

    pub fn encode(&self) -> String {
        format!("{}/{}", hex::encode(&self.header), hex::encode(self.target))
    }
}

/// A winning nonce and the digest that beat the target. Permanent until the
/// publisher rolls the descriptor forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub digest: Pow,
    pub nonce: u64,
}

impl Solution {
    pub fn parse(value: &[u8]) -> Result<Self, FormatError> {
        let text = std::str::from_utf8(value).map_err(|_| malformed("solution record", value))?;
        let (digest_hex, nonce_dec) =
            text.split_once('/').ok_or_else(|| malformed("solution record", value))?;
        let digest_bytes = hex::decode(digest_hex)?;
        let digest: Pow = digest_bytes.try_into().map_err(|v: Vec<u8>| {
            FormatError::TargetWidth { expected: DIGEST_LEN, actual: v.len() }
        })?;
        let nonce = nonce_dec.parse()?;
        Ok(Self { digest, nonce })
    }

    pub fn encode(&self) -> String {
        format!("{}/{}", hex::encode(self.digest), self.nonce)
    }
}

fn malformed(what: &'static str, value: &[u8]) -> FormatError {
    FormatError::Malformed { what, value: String::from_utf8_lossy(value).into_owned() }
}
