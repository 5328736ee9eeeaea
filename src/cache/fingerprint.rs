use std::fmt;

use sha1::Digest;

use crate::json_field;
use crate::relay::RelayRequest;

// Every json-rpc id collapses to this before hashing.
const ID_PLACEHOLDER: &[u8] = b"0";

/// Digest of the cache relevant parts of a relay request.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 20]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Builds the fingerprint of a request. Salt, metadata and the request block are
/// not part of it, and for json-rpc payloads neither is the message id.
pub fn fingerprint(request: &RelayRequest) -> Fingerprint {
    let mut extensions: Vec<&str> = request.extensions.iter().map(String::as_str).collect();
    extensions.sort_unstable();

    let payload = if request.is_json_rpc() {
        normalize_json_rpc_payload(&request.data)
    } else {
        None
    };

    let mut hasher = sha1::Sha1::new();
    update_field(&mut hasher, request.connection_type.as_bytes());
    update_field(&mut hasher, request.api_url.as_bytes());
    update_field(&mut hasher, request.api_interface.as_bytes());
    update_field(&mut hasher, request.addon.as_bytes());
    hasher.update((extensions.len() as u64).to_le_bytes());
    for extension in extensions {
        update_field(&mut hasher, extension.as_bytes());
    }
    update_field(&mut hasher, payload.as_deref().unwrap_or(&request.data));

    let mut digest = [0u8; 20];
    digest.copy_from_slice(hasher.finalize().as_slice());
    Fingerprint(digest)
}

// Length prefixed so adjacent fields cannot run into each other.
fn update_field(hasher: &mut sha1::Sha1, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Returns the payload with its top-level id neutralised, or `None` when the
/// payload is not a json object carrying an id and must be hashed as is.
fn normalize_json_rpc_payload(data: &[u8]) -> Option<Vec<u8>> {
    match serde_json::from_slice::<serde_json::Value>(data) {
        Ok(serde_json::Value::Object(_)) => {}
        _ => return None,
    }

    let mut normalized = data.to_vec();
    json_field::write_top_level_field(&mut normalized, "id", ID_PLACEHOLDER).then_some(normalized)
}
