use actix_web::{web, Error, HttpResponse};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::cache::latest::Observation;
use crate::cache::patch::PatchOutcome;
use crate::cache::{CacheError, CachedReply, RelayCache, StoreKind};

pub struct Metrics {
    pub registry: Registry,
    pub cache_hit_counter: IntCounterVec,
    pub cache_miss_counter: IntCounter,
    pub cache_set_counter: IntCounter,
    pub invalid_block_counter: IntCounter,
    pub deadline_exceeded_counter: IntCounter,
    pub error_counter: IntCounter,
    pub latest_advanced_counter: IntCounter,
    pub patch_skipped_counter: IntCounter,
    pub cache_entries_gauge: IntGaugeVec,
}

// Function to add a prefix to the metric names
fn add_prefix(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
}

fn register_counter_with_prefix(
    registry: &Registry,
    prefix: &str,
    name: &str,
    description: &str,
) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(add_prefix(prefix, name), description))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn register_int_counter_vec_with_prefix(
    registry: &Registry,
    prefix: &str,
    name: &str,
    description: &str,
    labels: &[&str],
) -> prometheus::Result<IntCounterVec> {
    let counter_vec = IntCounterVec::new(Opts::new(add_prefix(prefix, name), description), labels)?;
    registry.register(Box::new(counter_vec.clone()))?;
    Ok(counter_vec)
}

fn register_gauge_vec_with_prefix(
    registry: &Registry,
    prefix: &str,
    name: &str,
    description: &str,
    labels: &[&str],
) -> prometheus::Result<IntGaugeVec> {
    let gauge_vec = IntGaugeVec::new(Opts::new(add_prefix(prefix, name), description), labels)?;
    registry.register(Box::new(gauge_vec.clone()))?;
    Ok(gauge_vec)
}

impl Metrics {
    pub fn new(prefix: &str) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let cache_hit_counter = register_int_counter_vec_with_prefix(
            &registry,
            prefix,
            "cache_hit_total",
            "Total number of cache hits per store.",
            &["store"],
        )?;
        let cache_miss_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_miss_total",
            "Total number of cache misses, stale latest pointers included.",
        )?;
        let cache_set_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_set_total",
            "Total number of stored relays.",
        )?;
        let invalid_block_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_invalid_block_total",
            "Total number of sets rejected for a non concrete block.",
        )?;
        let deadline_exceeded_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "deadline_exceeded_total",
            "Total number of calls that arrived after their deadline.",
        )?;
        let error_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "error_total",
            "Total number of internal errors.",
        )?;
        let latest_advanced_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "latest_pointer_advanced_total",
            "Total number of sets that moved a chain's latest block forward.",
        )?;
        let patch_skipped_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "patch_skipped_total",
            "Total number of json-rpc hits returned without rewriting the id.",
        )?;
        let cache_entries_gauge = register_gauge_vec_with_prefix(
            &registry,
            prefix,
            "cache_entries",
            "Entries held per store, expired ones not yet purged included.",
            &["store"],
        )?;

        Ok(Self {
            registry,
            cache_hit_counter,
            cache_miss_counter,
            cache_set_counter,
            invalid_block_counter,
            deadline_exceeded_counter,
            error_counter,
            latest_advanced_counter,
            patch_skipped_counter,
            cache_entries_gauge,
        })
    }

    pub fn record_set(&self, latest: Observation) {
        self.cache_set_counter.inc();
        if latest == Observation::Advanced {
            self.latest_advanced_counter.inc();
        }
    }

    pub fn record_hit(&self, cached: &CachedReply) {
        self.cache_hit_counter
            .with_label_values(&[cached.source.as_str()])
            .inc();
        if let Some(PatchOutcome::Skipped(_)) = cached.patch {
            self.patch_skipped_counter.inc();
        }
    }

    pub fn record_error(&self, err: &CacheError) {
        match err {
            CacheError::InvalidBlock(_) => self.invalid_block_counter.inc(),
            CacheError::CacheMiss => self.cache_miss_counter.inc(),
            CacheError::DeadlineExceeded => self.deadline_exceeded_counter.inc(),
            CacheError::Internal(_) => self.error_counter.inc(),
        }
    }

    fn update_entry_gauges(&self, cache: &RelayCache) {
        for kind in [StoreKind::Finalized, StoreKind::NonFinalized] {
            self.cache_entries_gauge
                .with_label_values(&[kind.as_str()])
                .set(cache.entry_count(kind) as i64);
        }
    }
}

// Metrics handler
#[actix_web::get("/metrics")]
async fn metrics(data: web::Data<crate::AppState>) -> Result<HttpResponse, Error> {
    data.metrics.update_entry_gauges(&data.cache);

    let encoder = TextEncoder::new();
    let metric_families = data.metrics.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(buffer))
}
