use std::time::{Duration, Instant};

use clap::Parser;

use crate::cache::CacheConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, default_value = "127.0.0.1")]
    pub bind: String,

    #[arg(short, long, default_value = "20100")]
    pub port: u16,

    #[arg(
        long,
        default_value = "1h",
        value_parser = duration_parser,
        help = "How long finalized relays are kept, e.g. 30s, 5m, 1h."
    )]
    pub expiration_finalized: Duration,

    #[arg(
        long,
        default_value = "500ms",
        value_parser = duration_parser,
        help = "How long non finalized relays and the latest block are trusted."
    )]
    pub expiration_non_finalized: Duration,

    #[arg(long, help = "Accept every set but never serve a hit.")]
    pub disabled: bool,

    #[arg(
        long,
        default_value = "30s",
        value_parser = duration_parser,
        help = "Interval between sweeps of expired entries."
    )]
    pub purge_interval: Duration,

    #[arg(long, default_value = "relay_cache")]
    pub metrics_prefix: String,
}

impl Args {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            expiration_finalized: self.expiration_finalized,
            expiration_non_finalized: self.expiration_non_finalized,
            disabled: self.disabled,
        }
    }
}

fn duration_parser(s: &str) -> Result<Duration, String> {
    let split_at = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("Missing duration unit: {s}"))?;
    let (amount, unit) = s.split_at(split_at);

    let amount = amount
        .parse::<u64>()
        .map_err(|_| format!("Invalid duration: {s}"))?;

    let duration = match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs),
        "h" => amount.checked_mul(60 * 60).map(Duration::from_secs),
        _ => return Err(format!("Invalid duration unit: {unit}")),
    };

    // entry expiry is computed as now + ttl, which must stay representable
    duration
        .filter(|duration| Instant::now().checked_add(*duration).is_some())
        .ok_or_else(|| format!("Duration too large: {s}"))
}
