//! Configuration drift checksum.
//!
//! Both nodes compute a short checksum over the configuration sections they
//! are expected to share; the sleeper carries it on heartbeats so the waker
//! can warn when the two ends have drifted apart. Detection only: a
//! mismatch never rejects a heartbeat.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Length of the emitted hex checksum.
const CHECKSUM_LEN: usize = 16;

/// Compute the drift checksum over the shared configuration sections.
///
/// The sections are canonicalized through `serde_json::Value` (which keeps
/// object keys sorted) before hashing, so field ordering in the source
/// structs cannot change the result.
pub fn config_checksum<T: Serialize>(shared: &T) -> String {
    // Infallible for the plain config structs this is called with; an
    // unserializable input degrades to hashing a null marker rather than
    // failing a heartbeat send.
    let canonical = serde_json::to_value(shared)
        .unwrap_or(Value::Null)
        .to_string();

    let digest = Sha256::digest(canonical.as_bytes());
    let hex = digest.iter().fold(String::new(), |mut out, byte| {
        out.push_str(&format!("{:02x}", byte));
        out
    });
    hex[..CHECKSUM_LEN].to_string()
}
