use anyhow::Context;
use serde::{Deserialize, Deserializer};

// Block sentinels shared with the relay protocol. Anything negative is a marker,
// never a literal height.
pub const NOT_APPLICABLE: i64 = -1;
pub const LATEST_BLOCK: i64 = -2;
pub const EARLIEST_BLOCK: i64 = -3;
pub const PENDING_BLOCK: i64 = -4;
pub const SAFE_BLOCK: i64 = -5;
pub const FINALIZED_BLOCK: i64 = -6;

/// Only literal heights can key a cache entry.
pub fn is_storable_block(block: i64) -> bool {
    block >= 0
}

/// Parses a default block parameter: one of the named tags, or a decimal / `0x` hex height.
pub fn parse_block_param(block: &str) -> anyhow::Result<i64> {
    match block {
        "latest" => return Ok(LATEST_BLOCK),
        "earliest" => return Ok(EARLIEST_BLOCK),
        "pending" => return Ok(PENDING_BLOCK),
        "safe" => return Ok(SAFE_BLOCK),
        "finalized" => return Ok(FINALIZED_BLOCK),
        _ => {}
    }

    let number = match block.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => block.parse::<i64>(),
    }
    .with_context(|| format!("invalid block value, could not parse block {block}"))?;

    if number < 0 {
        return Err(anyhow::anyhow!(
            "invalid block value, block value was negative {number}"
        ));
    }

    Ok(number)
}

/// Accepts a block either as a raw integer (sentinels included) or as a block tag string.
pub fn deserialize_block<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrTag {
        Number(i64),
        Tag(String),
    }

    match NumberOrTag::deserialize(deserializer)? {
        NumberOrTag::Number(number) => Ok(number),
        NumberOrTag::Tag(tag) => parse_block_param(&tag).map_err(serde::de::Error::custom),
    }
}
