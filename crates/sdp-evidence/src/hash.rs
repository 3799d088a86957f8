use sdp_types::EvidenceEvent;
use sdp_utils::SdpError;
use sha2::{Digest, Sha256};

/// SHA-256 over the RFC 8785 JCS canonical form of `event` with the `hash`
/// field itself excluded (it cannot hash over its own value).
pub fn compute(event: &EvidenceEvent) -> Result<String, SdpError> {
    let mut value = serde_json::to_value(event).map_err(|e| SdpError::InvalidEvent { reason: e.to_string() })?;
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("hash");
    }
    let canonical = serde_json_canonicalizer::to_vec(&value).map_err(|e| SdpError::InvalidEvent { reason: e.to_string() })?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}
