use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
pub struct LatestPointer {
    pub block: i64,
    pub recorded_at: Instant,
}

/// What an observed block did to a chain's pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Advanced,
    Refreshed,
    Ignored,
}

/// Per chain record of the highest block seen in stored responses.
///
/// The block number never decreases. The pointer is only trusted for `ttl`
/// after it was last recorded, independent of how long the data it points at
/// may live.
pub struct LatestBlockTracker {
    pointers: DashMap<String, LatestPointer>,
    ttl: Duration,
}

impl LatestBlockTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pointers: DashMap::new(),
            ttl,
        }
    }

    /// Offers `block` for `chain_id`. A strictly greater block replaces the
    /// pointer; the current block restarts its validity window; anything lower
    /// is ignored.
    pub fn observe(&self, chain_id: &str, block: i64) -> Observation {
        let now = Instant::now();
        let pointer = LatestPointer {
            block,
            recorded_at: now,
        };

        // fast path without allocating the chain key
        if let Some(mut current) = self.pointers.get_mut(chain_id) {
            return Self::update(&mut current, pointer);
        }

        match self.pointers.entry(chain_id.to_string()) {
            Entry::Occupied(mut current) => Self::update(current.get_mut(), pointer),
            Entry::Vacant(vacant) => {
                vacant.insert(pointer);
                Observation::Advanced
            }
        }
    }

    fn update(current: &mut LatestPointer, pointer: LatestPointer) -> Observation {
        if pointer.block > current.block {
            *current = pointer;
            Observation::Advanced
        } else if pointer.block == current.block {
            current.recorded_at = pointer.recorded_at;
            Observation::Refreshed
        } else {
            Observation::Ignored
        }
    }

    /// The chain's latest block, if known and recorded less than `ttl` ago.
    pub fn latest(&self, chain_id: &str) -> Option<i64> {
        let pointer = *self.pointers.get(chain_id)?;
        if pointer.recorded_at.elapsed() >= self.ttl {
            return None;
        }
        Some(pointer.block)
    }
}
