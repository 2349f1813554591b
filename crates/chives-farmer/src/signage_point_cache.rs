//! Time-bounded cache of everything the farmer learns about a signage point round
//!
//! Full node announces signage points and harvesters respond with proofs of space and quality
//! strings, all of which are correlated here by signage point key. Entries are not evicted
//! individually, instead a background loop periodically drops all keys that were first seen more
//! than three sub slots ago.


use crate::harvester::StateChangeNotifier;
use crate::protocol::{Bytes32, NewSignagePoint, ProofOfSpace, QualityIdentifiers, SignagePointKey};
use crate::utils::{Cadence, ShutdownFlag, unix_timestamp};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// How many sub slots an entry is kept around before it becomes eligible for eviction
const EVICTION_AGE_SUB_SLOTS: u64 = 3;
/// Interval in ticks between UI refresh notifications
const REFRESH_INTERVAL_TICKS: u64 = 30;

#[derive(Debug, Default)]
struct CacheTables {
    signage_points: HashMap<SignagePointKey, Vec<NewSignagePoint>>,
    proofs_of_space: HashMap<SignagePointKey, Vec<(String, ProofOfSpace)>>,
    quality_identifiers: HashMap<SignagePointKey, HashMap<Bytes32, QualityIdentifiers>>,
    number_of_responses: HashMap<SignagePointKey, u32>,
    /// Unix time each key was first seen, keys of all other tables are always present here
    added_at: HashMap<SignagePointKey, u64>,
}

impl CacheTables {
    fn stamp(&mut self, key: SignagePointKey, now: u64) {
        self.added_at.entry(key).or_insert(now);
    }
}

/// Number of keys in each table of the cache
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct CacheSizes {
    pub signage_points: usize,
    pub proofs_of_space: usize,
    pub quality_identifiers: usize,
    pub number_of_responses: usize,
    pub tracked_keys: usize,
}

/// Signage point cache, all tables are guarded by a single lock so eviction of a key is atomic
#[derive(Debug, Default)]
pub struct SignagePointCache {
    tables: Mutex<CacheTables>,
}

impl SignagePointCache {
    /// Create empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record signage point announcement, keyed by challenge chain signage point hash
    pub fn add_signage_point(&self, signage_point: NewSignagePoint) {
        let key = signage_point.challenge_chain_sp;
        let mut tables = self.tables.lock();
        tables.stamp(key, unix_timestamp());
        tables
            .signage_points
            .entry(key)
            .or_default()
            .push(signage_point);
    }

    /// Record proof of space submitted by harvester for plot `plot_identifier`
    pub fn add_proof_of_space(
        &self,
        key: SignagePointKey,
        plot_identifier: String,
        proof_of_space: ProofOfSpace,
    ) {
        let mut tables = self.tables.lock();
        tables.stamp(key, unix_timestamp());
        tables
            .proofs_of_space
            .entry(key)
            .or_default()
            .push((plot_identifier, proof_of_space));
    }

    /// Remember which plot produced `quality`, so signatures can be requested later
    pub fn add_quality_identifiers(
        &self,
        key: SignagePointKey,
        quality: Bytes32,
        identifiers: QualityIdentifiers,
    ) {
        let mut tables = self.tables.lock();
        tables.stamp(key, unix_timestamp());
        tables
            .quality_identifiers
            .entry(key)
            .or_default()
            .insert(quality, identifiers);
    }

    /// Count one more harvester response for the key, returns updated count
    pub fn increment_responses(&self, key: SignagePointKey) -> u32 {
        let mut tables = self.tables.lock();
        tables.stamp(key, unix_timestamp());
        let responses = tables.number_of_responses.entry(key).or_default();
        *responses += 1;
        *responses
    }

    /// All signage points announced for the key, in order of arrival
    pub fn signage_points(&self, key: &SignagePointKey) -> Vec<NewSignagePoint> {
        self.tables
            .lock()
            .signage_points
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// All proofs of space received for the key
    pub fn proofs_of_space(&self, key: &SignagePointKey) -> Vec<(String, ProofOfSpace)> {
        self.tables
            .lock()
            .proofs_of_space
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn quality_identifiers(
        &self,
        key: &SignagePointKey,
        quality: &Bytes32,
    ) -> Option<QualityIdentifiers> {
        self.tables
            .lock()
            .quality_identifiers
            .get(key)
            .and_then(|qualities| qualities.get(quality))
            .cloned()
    }

    pub fn number_of_responses(&self, key: &SignagePointKey) -> u32 {
        self.tables
            .lock()
            .number_of_responses
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    /// Whether anything is known about the key
    pub fn contains(&self, key: &SignagePointKey) -> bool {
        self.tables.lock().added_at.contains_key(key)
    }

    pub fn sizes(&self) -> CacheSizes {
        let tables = self.tables.lock();
        CacheSizes {
            signage_points: tables.signage_points.len(),
            proofs_of_space: tables.proofs_of_space.len(),
            quality_identifiers: tables.quality_identifiers.len(),
            number_of_responses: tables.number_of_responses.len(),
            tracked_keys: tables.added_at.len(),
        }
    }

    /// Remove every key first seen more than `min_age` seconds before `now` from all tables,
    /// returns number of keys removed
    pub fn evict_older_than(&self, now: u64, min_age: u64) -> usize {
        let mut tables = self.tables.lock();
        let CacheTables {
            signage_points,
            proofs_of_space,
            quality_identifiers,
            number_of_responses,
            added_at,
        } = &mut *tables;

        let mut removed = 0;
        added_at.retain(|key, added_at| {
            if now.saturating_sub(*added_at) > min_age {
                signage_points.remove(key);
                proofs_of_space.remove(key);
                quality_identifiers.remove(key);
                number_of_responses.remove(key);
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    #[cfg(test)]
    fn set_added_at(&self, key: SignagePointKey, added_at: u64) {
        self.tables.lock().added_at.insert(key, added_at);
    }
}

/// Ticks between eviction scans and maximum age of entries in seconds, eviction happens once
/// accumulated ticks exceed sub slot time target
pub(crate) fn eviction_schedule(sub_slot_time_target: u64) -> (u64, u64) {
    (
        sub_slot_time_target.saturating_add(1),
        sub_slot_time_target.saturating_mul(EVICTION_AGE_SUB_SLOTS),
    )
}

/// Evicts stale cache entries once accumulated ticks exceed one sub slot and fires UI refresh
/// notification every [`REFRESH_INTERVAL_TICKS`], until shutdown is requested
pub(crate) async fn clear_cache_and_refresh(
    cache: Arc<SignagePointCache>,
    state_change_notifier: Arc<StateChangeNotifier>,
    sub_slot_time_target: u64,
    shutdown: ShutdownFlag,
) {
    let (eviction_interval, max_age) = eviction_schedule(sub_slot_time_target);
    let mut eviction = Cadence::new(eviction_interval);
    let mut refresh = Cadence::new(REFRESH_INTERVAL_TICKS);

    while shutdown.sleep_ticks(1).await {
        if eviction.tick() {
            let removed = cache.evict_older_than(unix_timestamp(), max_age);
            let sizes = cache.sizes();
            debug!(
                %removed,
                signage_points = %sizes.signage_points,
                proofs_of_space = %sizes.proofs_of_space,
                quality_identifiers = %sizes.quality_identifiers,
                number_of_responses = %sizes.number_of_responses,
                "Cleared farmer cache"
            );
        }

        // Periodically refresh UI to show correct connection stats
        if refresh.tick() {
            state_change_notifier.notify("add_connection", Default::default());
        }
    }

    info!("Signage point cache maintenance stopped");
}
