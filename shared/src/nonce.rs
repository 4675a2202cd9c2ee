//! Nonce wire encoding: variable-length base-256, least-significant digit
//! first, using the minimal number of digits for the value. Zero encodes as
//! a single zero digit. The digit count is derived by repeated division, so
//! values at and around powers of 256 always get exactly the digits they
//! need.

pub fn encode(nonce: u64) -> Vec<u8> {
    if nonce == 0 {
        return vec![0];
    }
    let mut out = Vec::with_capacity(8);
    let mut n = nonce;
    while n > 0 {
        out.push((n & 0xff) as u8);
        n >>= 8;
    }
    out
}

pub fn decode(data: &[u8]) -> u64 {
    data.iter().rev().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_across_digit_boundaries() {
        for nonce in [0u64, 1, 255, 256, 65535, 65536, 4_294_967_295, 4_294_967_297] {
            let encoded = encode(nonce);
            assert_eq!(decode(&encoded), nonce, "nonce {nonce}");
        }
    }

    #[test]
    fn minimal_digit_count() {
        assert_eq!(encode(0), vec![0]);
        assert_eq!(encode(1), vec![1]);
        assert_eq!(encode(255), vec![255]);
        assert_eq!(encode(256), vec![0, 1]);
        assert_eq!(encode(65535), vec![255, 255]);
        assert_eq!(encode(65536), vec![0, 0, 1]);
    }

    #[test]
    fn least_significant_digit_first() {
        assert_eq!(encode(0x0102), vec![0x02, 0x01]);
        assert_eq!(encode(0xdeadbeef), vec![0xef, 0xbe, 0xad, 0xde]);
    }
}
