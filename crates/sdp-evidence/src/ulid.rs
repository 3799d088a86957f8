//! A minimal ULID encoder (Crockford base32 over a 48-bit timestamp plus 80
//! bits of randomness). Monotonic-by-timestamp, sortable as a plain string,
//! so `event_id` order agrees with ingestion order even though the actual
//! order authority remains the hash chain's `prev_hash` links.

use chrono::{DateTime, Utc};
use rand::Rng;

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

#[must_use]
pub fn generate(timestamp: DateTime<Utc>) -> String {
    let millis = timestamp.timestamp_millis().max(0) as u64;
    let randomness: [u8; 10] = rand::rng().random();
    encode(millis, randomness)
}

fn encode(timestamp_ms: u64, randomness: [u8; 10]) -> String {
    let mut bytes = [0u8; 16];
    bytes[0] = (timestamp_ms >> 40) as u8;
    bytes[1] = (timestamp_ms >> 32) as u8;
    bytes[2] = (timestamp_ms >> 24) as u8;
    bytes[3] = (timestamp_ms >> 16) as u8;
    bytes[4] = (timestamp_ms >> 8) as u8;
    bytes[5] = timestamp_ms as u8;
    bytes[6..16].copy_from_slice(&randomness);

    let mut value: u128 = 0;
    for b in bytes {
        value = (value << 8) | u128::from(b);
    }

    let mut out = String::with_capacity(26);
    for i in (0..26).rev() {
        let idx = ((value >> (i * 5)) & 0x1F) as usize;
        out.push(CROCKFORD[idx] as char);
    }
    out
}
