use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use serde_json::json;

use crate::args::Args;
use crate::cache::{CacheError, Deadline, RelayCache};
use crate::metrics::Metrics;
use crate::relay::{CacheRelayReply, RelayCacheGet, RelayCacheSet};

mod args;
mod block;
mod cache;
mod json_field;
mod metrics;
mod relay;

const TIMEOUT_HEADER: &str = "x-relay-timeout-ms";

pub struct AppState {
    cache: RelayCache,
    metrics: Metrics,
}

#[actix_web::post("/set_relay")]
async fn set_relay(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<RelayCacheSet>,
) -> HttpResponse {
    let deadline = request_deadline(&req);
    let relay = body.into_inner();

    match guarded(|| data.cache.set_relay(deadline, relay)) {
        Ok(outcome) => {
            data.metrics.record_set(outcome.latest);
            HttpResponse::Ok().json(json!({}))
        }
        Err(err) => error_response(&data.metrics, err),
    }
}

#[actix_web::post("/get_relay")]
async fn get_relay(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<RelayCacheGet>,
) -> HttpResponse {
    let deadline = request_deadline(&req);

    match guarded(|| data.cache.get_relay(deadline, &body)) {
        Ok(cached) => {
            data.metrics.record_hit(&cached);
            tracing::debug!(
                chain_id = %body.chain_id,
                block = cached.block,
                source = cached.source.as_str(),
                "serving cached relay"
            );
            HttpResponse::Ok().json(CacheRelayReply {
                reply: cached.reply,
            })
        }
        Err(err) => error_response(&data.metrics, err),
    }
}

#[actix_web::get("/latest/{chain_id}")]
async fn latest_block(path: web::Path<(String,)>, data: web::Data<AppState>) -> HttpResponse {
    let (chain_id,) = path.into_inner();

    match data.cache.latest_block(&chain_id) {
        Some(block) => HttpResponse::Ok().json(json!({
            "chain_id": chain_id,
            "latest_block": block,
        })),
        None => HttpResponse::NotFound().json(json!({ "error": "latest block unknown or stale" })),
    }
}

#[actix_web::get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

// A panic while serving one relay must not take the worker down with it.
fn guarded<T>(f: impl FnOnce() -> Result<T, CacheError>) -> Result<T, CacheError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(CacheError::Internal(reason))
    })
}

fn request_deadline(req: &HttpRequest) -> Deadline {
    req.headers()
        .get(TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(|timeout| Deadline::after(Duration::from_millis(timeout)))
        .unwrap_or_else(Deadline::none)
}

fn error_response(metrics: &Metrics, err: CacheError) -> HttpResponse {
    metrics.record_error(&err);

    let status = match err {
        CacheError::InvalidBlock(_) => StatusCode::BAD_REQUEST,
        CacheError::CacheMiss => StatusCode::NOT_FOUND,
        CacheError::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
        CacheError::Internal(_) => {
            tracing::error!("fail to serve relay cache request: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    HttpResponse::build(status).json(json!({ "error": err.to_string() }))
}

fn spawn_purge_task(data: web::Data<AppState>, period: Duration) {
    if period.is_zero() {
        tracing::info!("Expired entry sweeping disabled");
        return;
    }

    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(period);
        loop {
            interval.tick().await;
            let purged = data.cache.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "purged expired relay cache entries");
            }
        }
    });
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();
    let config = args.cache_config();

    tracing::info!(
        "Relay cache configured with finalized ttl {:?}, non finalized ttl {:?}, disabled: {}",
        config.expiration_finalized,
        config.expiration_non_finalized,
        config.disabled
    );

    let app_state = web::Data::new(AppState {
        cache: RelayCache::new(&config),
        metrics: Metrics::new(&args.metrics_prefix).context("fail to register metrics")?,
    });

    spawn_purge_task(app_state.clone(), args.purge_interval);

    tracing::info!("Server listening on {}:{}", args.bind, args.port);

    {
        let app_state = app_state.clone();

        HttpServer::new(move || {
            App::new()
                .app_data(app_state.clone())
                .service(set_relay)
                .service(get_relay)
                .service(latest_block)
                .service(health)
                .service(metrics::metrics)
        })
        .bind((args.bind.as_str(), args.port))
        .context("fail to bind server address")?
        .run()
        .await?;
    }

    tracing::info!("Server stopped");

    Ok(())
}
