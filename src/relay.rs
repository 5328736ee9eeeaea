use serde::{Deserialize, Serialize};

use crate::block;

pub const API_INTERFACE_JSONRPC: &str = "jsonrpc";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub value: String,
}

/// The relay as seen by the cache: everything a consumer sends to a provider.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayRequest {
    #[serde(default)]
    pub connection_type: String,
    #[serde(default)]
    pub api_url: String,
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(deserialize_with = "block::deserialize_block")]
    pub request_block: i64,
    #[serde(default)]
    pub api_interface: String,
    #[serde(default)]
    pub addon: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    #[serde(default, with = "hex_bytes")]
    pub salt: Vec<u8>,
}

impl RelayRequest {
    pub fn is_json_rpc(&self) -> bool {
        self.api_interface == API_INTERFACE_JSONRPC
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayReply {
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub latest_block: i64,
    #[serde(default, with = "hex_bytes")]
    pub finalized_blocks_hashes: Vec<u8>,
    #[serde(default, with = "hex_bytes")]
    pub sig: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RelayCacheSet {
    pub request: RelayRequest,
    /// Content hash pinning the response to a specific block. Empty means none.
    #[serde(default, with = "hex_bytes")]
    pub block_hash: Vec<u8>,
    pub chain_id: String,
    pub response: RelayReply,
    #[serde(default)]
    pub finalized: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RelayCacheGet {
    pub request: RelayRequest,
    #[serde(default, with = "hex_bytes")]
    pub block_hash: Vec<u8>,
    pub chain_id: String,
    #[serde(default)]
    pub finalized: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CacheRelayReply {
    pub reply: RelayReply,
}

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(|err| de::Error::custom(format!("invalid hex bytes: {err}")))
    }
}
