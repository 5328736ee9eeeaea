pub mod expiring_store;
pub mod fingerprint;
pub mod latest;
pub mod patch;

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::block;
use crate::relay::{RelayCacheGet, RelayCacheSet, RelayReply};
use expiring_store::ExpiringStore;
use fingerprint::Fingerprint;
use latest::{LatestBlockTracker, Observation};
use patch::PatchOutcome;

pub const DEFAULT_EXPIRATION_FINALIZED: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_EXPIRATION_NON_FINALIZED: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub expiration_finalized: Duration,
    /// Also bounds how long the latest block pointer is trusted.
    pub expiration_non_finalized: Duration,
    /// Every entry gets a zero ttl: sets succeed, gets always miss.
    pub disabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiration_finalized: DEFAULT_EXPIRATION_FINALIZED,
            expiration_non_finalized: DEFAULT_EXPIRATION_NON_FINALIZED,
            disabled: false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("invalid request block {0}, only concrete blocks can be cached")]
    InvalidBlock(i64),

    #[error("cache miss")]
    CacheMiss,

    #[error("deadline exceeded before the cache was consulted")]
    DeadlineExceeded,

    #[error("internal cache error: {0}")]
    Internal(String),
}

/// Point in time after which a call is not worth serving anymore.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    pub fn check(&self) -> Result<(), CacheError> {
        match self.0 {
            Some(deadline) if Instant::now() >= deadline => Err(CacheError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    chain_id: String,
    fingerprint: Fingerprint,
    block: i64,
    content_hash: Vec<u8>,
}

#[derive(Debug)]
pub struct CacheEntry {
    pub reply: RelayReply,
    pub latest_block: i64,
    pub stored_at: Instant,
    pub finalized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Finalized,
    NonFinalized,
}

impl StoreKind {
    fn from_finalized(finalized: bool) -> Self {
        if finalized {
            StoreKind::Finalized
        } else {
            StoreKind::NonFinalized
        }
    }

    fn other(self) -> Self {
        match self {
            StoreKind::Finalized => StoreKind::NonFinalized,
            StoreKind::NonFinalized => StoreKind::Finalized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Finalized => "finalized",
            StoreKind::NonFinalized => "non_finalized",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SetOutcome {
    pub latest: Observation,
}

#[derive(Debug, Clone)]
pub struct CachedReply {
    pub reply: RelayReply,
    pub source: StoreKind,
    /// The concrete block the entry was found at, after resolving `latest`.
    pub block: i64,
    /// `None` when the request is not json-rpc and no patching was attempted.
    pub patch: Option<PatchOutcome>,
}

/// Shared relay response cache.
///
/// Entries live in one of two stores depending on finality. Requests for the
/// latest block are answered through a per chain pointer to the highest block
/// seen, which is then looked up like any concrete block.
pub struct RelayCache {
    finalized: ExpiringStore<CacheKey, Arc<CacheEntry>>,
    non_finalized: ExpiringStore<CacheKey, Arc<CacheEntry>>,
    latest: LatestBlockTracker,
}

impl RelayCache {
    pub fn new(config: &CacheConfig) -> Self {
        let (finalized_ttl, non_finalized_ttl) = match config.disabled {
            true => (Duration::ZERO, Duration::ZERO),
            false => (config.expiration_finalized, config.expiration_non_finalized),
        };

        Self {
            finalized: ExpiringStore::new(finalized_ttl),
            non_finalized: ExpiringStore::new(non_finalized_ttl),
            latest: LatestBlockTracker::new(non_finalized_ttl),
        }
    }

    pub fn set_relay(
        &self,
        deadline: Deadline,
        relay: RelayCacheSet,
    ) -> Result<SetOutcome, CacheError> {
        deadline.check()?;

        let RelayCacheSet {
            request,
            block_hash,
            chain_id,
            response,
            finalized,
        } = relay;

        if !block::is_storable_block(request.request_block) {
            tracing::debug!(
                %chain_id,
                request_block = request.request_block,
                "rejecting cache set for non concrete block"
            );
            return Err(CacheError::InvalidBlock(request.request_block));
        }

        let fingerprint = fingerprint::fingerprint(&request);
        let pinned_by_hash = !block_hash.is_empty();
        let key = CacheKey {
            chain_id: chain_id.clone(),
            fingerprint,
            block: request.request_block,
            content_hash: block_hash,
        };

        // a stored request block is itself proof that the chain got that far
        let observed_block = response.latest_block.max(request.request_block);
        let entry = Arc::new(CacheEntry {
            latest_block: response.latest_block,
            reply: response,
            stored_at: Instant::now(),
            finalized,
        });

        match (finalized, pinned_by_hash) {
            (true, _) => self.finalized.put(key, entry),
            // a block hash cannot be reorged away, so it may outlive the short ttl
            (false, true) => self
                .non_finalized
                .put_with_ttl(key, entry, self.finalized.ttl()),
            (false, false) => self.non_finalized.put(key, entry),
        }
        let latest = self.latest.observe(&chain_id, observed_block);

        tracing::debug!(
            %fingerprint,
            finalized,
            observed_block,
            latest = ?latest,
            "cache set"
        );

        Ok(SetOutcome { latest })
    }

    pub fn get_relay(
        &self,
        deadline: Deadline,
        relay: &RelayCacheGet,
    ) -> Result<CachedReply, CacheError> {
        deadline.check()?;

        let request = &relay.request;
        let block = match request.request_block {
            block::LATEST_BLOCK => match self.latest.latest(&relay.chain_id) {
                Some(latest) => latest,
                None => {
                    tracing::debug!(chain_id = %relay.chain_id, "latest block unknown or stale");
                    return Err(CacheError::CacheMiss);
                }
            },
            block if block::is_storable_block(block) => block,
            _ => return Err(CacheError::CacheMiss),
        };

        let fingerprint = fingerprint::fingerprint(request);
        let key = CacheKey {
            chain_id: relay.chain_id.clone(),
            fingerprint,
            block,
            content_hash: relay.block_hash.clone(),
        };

        let (entry, source) = match self.lookup(&key, relay.finalized) {
            Some(found) => found,
            None => {
                tracing::debug!(%fingerprint, block, "cache miss");
                return Err(CacheError::CacheMiss);
            }
        };

        tracing::debug!(
            %fingerprint,
            block,
            source = source.as_str(),
            stored_finalized = entry.finalized,
            stored_latest_block = entry.latest_block,
            age_ms = entry.stored_at.elapsed().as_millis() as u64,
            "cache hit"
        );

        let mut reply = entry.reply.clone();
        let patch = request
            .is_json_rpc()
            .then(|| patch::patch_response_id(&request.data, &mut reply.data));

        if let Some(PatchOutcome::Skipped(reason)) = patch {
            tracing::debug!(%fingerprint, ?reason, "response id left untouched");
        }

        Ok(CachedReply {
            reply,
            source,
            block,
            patch,
        })
    }

    // The store matching the caller's view of finality is asked first: an entry
    // written under the other classification is still a valid answer.
    fn lookup(&self, key: &CacheKey, finalized: bool) -> Option<(Arc<CacheEntry>, StoreKind)> {
        let primary = StoreKind::from_finalized(finalized);

        [primary, primary.other()]
            .into_iter()
            .find_map(|kind| self.store(kind).get(key).map(|entry| (entry, kind)))
    }

    fn store(&self, kind: StoreKind) -> &ExpiringStore<CacheKey, Arc<CacheEntry>> {
        match kind {
            StoreKind::Finalized => &self.finalized,
            StoreKind::NonFinalized => &self.non_finalized,
        }
    }

    /// Drops expired entries from both stores, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.finalized.purge_expired() + self.non_finalized.purge_expired()
    }

    pub fn entry_count(&self, kind: StoreKind) -> usize {
        self.store(kind).len()
    }

    pub fn latest_block(&self, chain_id: &str) -> Option<i64> {
        self.latest.latest(chain_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::relay::{RelayRequest, API_INTERFACE_JSONRPC};
    use std::thread::sleep;

    const CHAIN_ID: &str = "stub-chain";
    const NON_FINALIZED_TTL: Duration = Duration::from_millis(100);
    const AFTER_NON_FINALIZED_TTL: Duration = Duration::from_millis(130);
    const HASH: &[u8] = &[1, 2, 3];

    fn new_cache() -> RelayCache {
        RelayCache::new(&CacheConfig {
            expiration_finalized: Duration::from_secs(60),
            expiration_non_finalized: NON_FINALIZED_TTL,
            disabled: false,
        })
    }

    fn request(block: i64, data: &[u8], api_interface: &str) -> RelayRequest {
        RelayRequest {
            connection_type: "stub-conn".to_string(),
            api_url: "stub-api".to_string(),
            data: data.to_vec(),
            request_block: block,
            api_interface: api_interface.to_string(),
            addon: "".to_string(),
            extensions: vec![],
            metadata: vec![],
            salt: vec![1, 2],
        }
    }

    fn stub_request(block: i64) -> RelayRequest {
        request(block, b"stub-sig", "stub-interface")
    }

    fn reply(latest_block: i64) -> RelayReply {
        RelayReply {
            data: b"stub-reply".to_vec(),
            latest_block,
            ..Default::default()
        }
    }

    fn set(
        cache: &RelayCache,
        request: &RelayRequest,
        hash: &[u8],
        response: RelayReply,
        finalized: bool,
    ) -> Result<SetOutcome, CacheError> {
        cache.set_relay(
            Deadline::none(),
            RelayCacheSet {
                request: request.clone(),
                block_hash: hash.to_vec(),
                chain_id: CHAIN_ID.to_string(),
                response,
                finalized,
            },
        )
    }

    fn get(
        cache: &RelayCache,
        request: &RelayRequest,
        hash: &[u8],
        finalized: bool,
    ) -> Result<CachedReply, CacheError> {
        cache.get_relay(
            Deadline::none(),
            &RelayCacheGet {
                request: request.clone(),
                block_hash: hash.to_vec(),
                chain_id: CHAIN_ID.to_string(),
                finalized,
            },
        )
    }

    fn json_rpc_payload(id: u64) -> Vec<u8> {
        format!(r#"{{"jsonrpc":"2.0","method":"status","params":[],"id":{id}}}"#).into_bytes()
    }

    fn json_rpc_response(id: u64) -> Vec<u8> {
        format!(r#"{{"jsonrpc":"2.0","result":0x12345,"id":{id}}}"#).into_bytes()
    }

    #[test]
    fn test_set_get() {
        struct Case {
            name: &'static str,
            valid: bool,
            delay: Duration,
            finalized: bool,
            hash: &'static [u8],
        }

        let ms = Duration::from_millis(1);
        let cases = [
            Case { name: "finalized no hash", valid: true, delay: ms, finalized: true, hash: &[] },
            Case { name: "finalized after delay no hash", valid: true, delay: AFTER_NON_FINALIZED_TTL, finalized: true, hash: &[] },
            Case { name: "non finalized no hash", valid: true, delay: ms, finalized: false, hash: &[] },
            Case { name: "non finalized after delay no hash", valid: false, delay: AFTER_NON_FINALIZED_TTL, finalized: false, hash: &[] },
            Case { name: "finalized with hash", valid: true, delay: ms, finalized: true, hash: HASH },
            Case { name: "finalized after delay with hash", valid: true, delay: AFTER_NON_FINALIZED_TTL, finalized: true, hash: HASH },
            Case { name: "non finalized with hash", valid: true, delay: ms, finalized: false, hash: HASH },
            Case { name: "non finalized after delay with hash", valid: true, delay: AFTER_NON_FINALIZED_TTL, finalized: false, hash: HASH },
        ];

        for case in cases {
            let cache = new_cache();
            let request = stub_request(1230);
            let response = reply(0);

            set(&cache, &request, case.hash, response.clone(), case.finalized).unwrap();
            sleep(case.delay);

            let result = get(&cache, &request, case.hash, case.finalized);
            if case.valid {
                let cached = result.unwrap_or_else(|err| panic!("{}: {err}", case.name));
                assert_eq!(cached.reply, response, "{}", case.name);
                assert_eq!(cached.patch, None, "{}", case.name);
            } else {
                assert_eq!(result.unwrap_err(), CacheError::CacheMiss, "{}", case.name);
            }
        }
    }

    #[test]
    fn test_get_without_set() {
        let cache = new_cache();
        for finalized in [true, false] {
            for hash in [&[][..], HASH] {
                let err = get(&cache, &stub_request(1230), hash, finalized).unwrap_err();
                assert_eq!(err, CacheError::CacheMiss);

                let err = get(&cache, &stub_request(block::LATEST_BLOCK), hash, finalized)
                    .unwrap_err();
                assert_eq!(err, CacheError::CacheMiss);
            }
        }
    }

    #[test]
    fn test_set_invalid_block() {
        let cache = new_cache();
        let sentinels = [
            block::NOT_APPLICABLE,
            block::LATEST_BLOCK,
            block::EARLIEST_BLOCK,
            block::PENDING_BLOCK,
            block::SAFE_BLOCK,
            block::FINALIZED_BLOCK,
        ];

        for sentinel in sentinels {
            for finalized in [true, false] {
                for hash in [&[][..], HASH] {
                    let err = set(&cache, &stub_request(sentinel), hash, reply(0), finalized)
                        .unwrap_err();
                    assert_eq!(err, CacheError::InvalidBlock(sentinel));
                }
            }
        }

        assert_eq!(cache.entry_count(StoreKind::Finalized), 0);
        assert_eq!(cache.entry_count(StoreKind::NonFinalized), 0);
        assert_eq!(cache.latest_block(CHAIN_ID), None);
    }

    #[test]
    fn test_json_rpc_id_is_rewritten() {
        for finalized in [true, false] {
            for hash in [&[][..], HASH] {
                let cache = new_cache();
                let id = 8_141_001;
                let mut request = request(1230, &json_rpc_payload(id), API_INTERFACE_JSONRPC);
                let response = RelayReply {
                    data: json_rpc_response(id),
                    ..Default::default()
                };

                set(&cache, &request, hash, response, finalized).unwrap();

                request.data = json_rpc_payload(id + 1);
                let cached = get(&cache, &request, hash, finalized).unwrap();
                assert_eq!(cached.patch, Some(PatchOutcome::Patched));
                assert_eq!(cached.reply.data, json_rpc_response(id + 1));

                let value = crate::json_field::read_top_level_field(&cached.reply.data, "id");
                assert_eq!(value, Some(format!("{}", id + 1).as_bytes()));
            }
        }
    }

    #[test]
    fn test_stored_reply_is_not_mutated() {
        let cache = new_cache();
        let request_a = request(10, &json_rpc_payload(1), API_INTERFACE_JSONRPC);
        let request_b = request(10, &json_rpc_payload(2), API_INTERFACE_JSONRPC);
        let response = RelayReply {
            data: json_rpc_response(1),
            ..Default::default()
        };

        set(&cache, &request_a, &[], response, true).unwrap();

        let cached = get(&cache, &request_b, &[], true).unwrap();
        assert_eq!(cached.reply.data, json_rpc_response(2));
        let cached = get(&cache, &request_a, &[], true).unwrap();
        assert_eq!(cached.reply.data, json_rpc_response(1));
    }

    #[test]
    fn test_json_rpc_response_without_id() {
        let cache = new_cache();
        let request = request(10, &json_rpc_payload(1), API_INTERFACE_JSONRPC);
        let response = RelayReply {
            data: b"not a json response".to_vec(),
            ..Default::default()
        };

        set(&cache, &request, &[], response.clone(), true).unwrap();

        let cached = get(&cache, &request, &[], true).unwrap();
        assert_eq!(
            cached.patch,
            Some(PatchOutcome::Skipped(patch::SkipReason::ResponseWithoutId))
        );
        assert_eq!(cached.reply, response);
    }

    #[test]
    fn test_content_hash_is_part_of_the_key() {
        let cache = new_cache();
        let request = stub_request(1230);
        set(&cache, &request, HASH, reply(1230), true).unwrap();

        assert!(get(&cache, &request, HASH, true).is_ok());
        assert_eq!(get(&cache, &request, &[], true).unwrap_err(), CacheError::CacheMiss);
        assert_eq!(
            get(&cache, &request, &[9, 9], true).unwrap_err(),
            CacheError::CacheMiss
        );
    }

    #[test]
    fn test_lookup_falls_back_to_other_store() {
        let cache = new_cache();
        let finalized_request = stub_request(100);
        let non_finalized_request = stub_request(200);

        set(&cache, &finalized_request, &[], reply(100), true).unwrap();
        set(&cache, &non_finalized_request, &[], reply(200), false).unwrap();

        let cached = get(&cache, &finalized_request, &[], false).unwrap();
        assert_eq!(cached.source, StoreKind::Finalized);
        let cached = get(&cache, &non_finalized_request, &[], true).unwrap();
        assert_eq!(cached.source, StoreKind::NonFinalized);

        sleep(AFTER_NON_FINALIZED_TTL);
        assert!(get(&cache, &finalized_request, &[], false).is_ok());
        assert_eq!(
            get(&cache, &non_finalized_request, &[], true).unwrap_err(),
            CacheError::CacheMiss
        );
    }

    #[test]
    fn test_latest_follows_highest_set() {
        let cache = new_cache();

        for block in [1230, 1240, 1250, 1300] {
            let outcome = set(&cache, &stub_request(block), &[], reply(block), true).unwrap();
            assert_eq!(outcome.latest, Observation::Advanced);

            let cached = get(&cache, &stub_request(block::LATEST_BLOCK), &[], true).unwrap();
            assert_eq!(cached.block, block);
            assert_eq!(cached.reply.latest_block, block);
        }

        // an older block is stored but "latest" still points at 1300
        let outcome = set(&cache, &stub_request(1250), &[], reply(1250), false).unwrap();
        assert_eq!(outcome.latest, Observation::Ignored);
        let cached = get(&cache, &stub_request(block::LATEST_BLOCK), &[], false).unwrap();
        assert_eq!(cached.reply.latest_block, 1300);
        assert!(get(&cache, &stub_request(1250), &[], false).is_ok());
    }

    #[test]
    fn test_latest_expires() {
        let cache = new_cache();
        set(&cache, &stub_request(1230), &[], reply(1230), true).unwrap();
        sleep(AFTER_NON_FINALIZED_TTL);

        // the finalized entry itself is still there
        assert!(get(&cache, &stub_request(1230), &[], true).is_ok());
        assert_eq!(
            get(&cache, &stub_request(block::LATEST_BLOCK), &[], true).unwrap_err(),
            CacheError::CacheMiss
        );

        // seeing the same block again makes the pointer usable again
        let outcome = set(&cache, &stub_request(1230), &[], reply(1230), true).unwrap();
        assert_eq!(outcome.latest, Observation::Refreshed);
        assert!(get(&cache, &stub_request(block::LATEST_BLOCK), &[], true).is_ok());
    }

    #[test]
    fn test_latest_moved_by_other_fingerprint() {
        let cache = new_cache();
        let request_a = stub_request(1230);
        let mut request_b = stub_request(1410);
        request_b.data = b"stub-data-non-relevant".to_vec();

        set(&cache, &request_a, &[], reply(1230), true).unwrap();
        let mut latest_a = request_a.clone();
        latest_a.request_block = block::LATEST_BLOCK;
        let cached = get(&cache, &latest_a, &[], true).unwrap();
        assert_eq!(cached.reply.latest_block, 1230);

        set(&cache, &request_b, &[], reply(1410), true).unwrap();
        assert_eq!(cache.latest_block(CHAIN_ID), Some(1410));
        assert_eq!(get(&cache, &latest_a, &[], true).unwrap_err(), CacheError::CacheMiss);
    }

    #[test]
    fn test_latest_advanced_by_request_block() {
        let cache = new_cache();
        let request_a = stub_request(1230);
        set(&cache, &request_a, &[], reply(1230), true).unwrap();

        // the reply reports an old latest block, the request block is still newer
        let mut request_b = stub_request(1231);
        request_b.data = b"stub-data-non-relevant".to_vec();
        let outcome = set(&cache, &request_b, &[], reply(1230), true).unwrap();
        assert_eq!(outcome.latest, Observation::Advanced);

        let mut latest_a = request_a;
        latest_a.request_block = block::LATEST_BLOCK;
        assert_eq!(get(&cache, &latest_a, &[], true).unwrap_err(), CacheError::CacheMiss);
    }

    #[test]
    fn test_latest_is_shared_per_chain() {
        let cache = new_cache();
        let request_a = stub_request(1300);
        set(&cache, &request_a, HASH, reply(1300), false).unwrap();

        let mut request_b = stub_request(1400);
        request_b.data = b"another-call".to_vec();
        set(&cache, &request_b, &[], reply(1400), true).unwrap();

        let mut latest_a = request_a.clone();
        latest_a.request_block = block::LATEST_BLOCK;
        assert_eq!(get(&cache, &latest_a, HASH, false).unwrap_err(), CacheError::CacheMiss);

        // other chains are unaffected
        let other_chain = RelayCacheGet {
            request: latest_a,
            block_hash: vec![],
            chain_id: "other-chain".to_string(),
            finalized: true,
        };
        assert_eq!(
            cache.get_relay(Deadline::none(), &other_chain).unwrap_err(),
            CacheError::CacheMiss
        );
    }

    #[test]
    fn test_get_with_other_sentinels_misses() {
        let cache = new_cache();
        set(&cache, &stub_request(1230), &[], reply(1230), true).unwrap();

        for sentinel in [block::EARLIEST_BLOCK, block::PENDING_BLOCK, block::NOT_APPLICABLE] {
            let err = get(&cache, &stub_request(sentinel), &[], true).unwrap_err();
            assert_eq!(err, CacheError::CacheMiss);
        }
    }

    #[test]
    fn test_deadline() {
        let cache = new_cache();
        let expired = Deadline::after(Duration::ZERO);
        let relay = RelayCacheSet {
            request: stub_request(1),
            block_hash: vec![],
            chain_id: CHAIN_ID.to_string(),
            response: reply(1),
            finalized: true,
        };

        assert_eq!(
            cache.set_relay(expired, relay.clone()).unwrap_err(),
            CacheError::DeadlineExceeded
        );
        assert_eq!(cache.entry_count(StoreKind::Finalized), 0);

        assert!(cache
            .set_relay(Deadline::after(Duration::from_secs(10)), relay)
            .is_ok());
    }

    #[test]
    fn test_disabled() {
        let cache = RelayCache::new(&CacheConfig {
            disabled: true,
            ..Default::default()
        });

        for finalized in [true, false] {
            set(&cache, &stub_request(1230), HASH, reply(1230), finalized).unwrap();
            assert_eq!(
                get(&cache, &stub_request(1230), HASH, finalized).unwrap_err(),
                CacheError::CacheMiss
            );
            assert_eq!(
                get(&cache, &stub_request(block::LATEST_BLOCK), HASH, finalized).unwrap_err(),
                CacheError::CacheMiss
            );
        }
    }

    #[test]
    fn test_purge_expired() {
        let cache = new_cache();
        set(&cache, &stub_request(1), &[], reply(1), false).unwrap();
        set(&cache, &stub_request(2), &[], reply(2), false).unwrap();
        set(&cache, &stub_request(3), &[], reply(3), true).unwrap();
        sleep(AFTER_NON_FINALIZED_TTL);

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.entry_count(StoreKind::NonFinalized), 0);
        assert_eq!(cache.entry_count(StoreKind::Finalized), 1);
    }

    #[test]
    fn test_concurrent_set_get() {
        let cache = new_cache();

        std::thread::scope(|scope| {
            for worker in 0..8i64 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..200i64 {
                        let block = worker * 1000 + i;
                        let request = stub_request(block);
                        set(cache, &request, &[], reply(block), true).unwrap();
                        let cached = get(cache, &request, &[], true).unwrap();
                        assert_eq!(cached.reply.latest_block, block);
                    }
                });
            }
        });

        assert_eq!(cache.entry_count(StoreKind::Finalized), 1600);
        assert_eq!(cache.latest_block(CHAIN_ID), Some(7199));
    }
}
