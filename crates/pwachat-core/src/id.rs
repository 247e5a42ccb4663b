//! Message id generation: `<prefix>-<base36 millis>-<4 random base36 chars>`.
//!
//! Uniqueness is probabilistic but sufficient at the relay's message rates.
//! Ordering must come from `seq`, never from comparing ids.

use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn next_message_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    format!("{prefix}-{}-{}", base36(millis), random_suffix())
}

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 output is ascii")
}

/// Four base36 chars derived from a fresh v4 UUID.
fn random_suffix() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let mut n = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let mut out = [0u8; 4];
    for slot in out.iter_mut() {
        *slot = ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    String::from_utf8(out.to_vec()).expect("base36 output is ascii")
}
