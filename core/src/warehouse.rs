//! Data-access layer: the store plus a time-bounded query cache.
//!
//! Repeated recomputation in one session reuses the last result of
//! each query until it is older than `query_ttl_seconds`.

use crate::{
    config::CalculatorConfig,
    error::IcfResult,
    schedule::{build_cap_schedule, CapSchedule},
    store::IcfStore,
    types::{CapTier, TransactionFlow},
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

const FLOWS_QUERY: &str = "icf_flows";
const CAP_TIERS_QUERY: &str = "cap_tiers";

#[derive(Debug, Clone)]
struct CachedResult<T> {
    fetched_at: DateTime<Utc>,
    value:      T,
}

/// Results keyed by query name, each expiring `ttl` after it was fetched.
#[derive(Debug, Clone)]
pub struct QueryCache<T> {
    ttl:     Duration,
    entries: HashMap<String, CachedResult<T>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl:     Duration::seconds(ttl_seconds),
            entries: HashMap::new(),
        }
    }

    /// Fresh value for `key` at `now`, if any.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        self.entries
            .get(key)
            .filter(|e| now - e.fetched_at < self.ttl)
            .map(|e| e.value.clone())
    }

    pub fn put(&mut self, key: &str, value: T, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            CachedResult { fetched_at: now, value },
        );
    }

    /// Cached value if fresh, otherwise run `fetch` and cache its result.
    pub fn get_or_fetch<F>(&mut self, key: &str, now: DateTime<Utc>, fetch: F) -> IcfResult<T>
    where
        F: FnOnce() -> IcfResult<T>,
    {
        if let Some(hit) = self.get(key, now) {
            log::debug!("query cache hit: {key}");
            return Ok(hit);
        }
        log::debug!("query cache miss: {key}");
        let value = fetch()?;
        self.put(key, value.clone(), now);
        Ok(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub struct Warehouse {
    pub store:   IcfStore,
    config:      CalculatorConfig,
    flows:       QueryCache<Vec<TransactionFlow>>,
    tiers:       QueryCache<Vec<CapTier>>,
    fetch_count: u64,
}

impl Warehouse {
    pub fn new(store: IcfStore, config: CalculatorConfig) -> Self {
        Self {
            flows: QueryCache::new(config.query_ttl_seconds),
            tiers: QueryCache::new(config.query_ttl_seconds),
            store,
            config,
            fetch_count: 0,
        }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Number of queries actually issued against the store.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count
    }

    pub fn flows(&mut self, now: DateTime<Utc>) -> IcfResult<Vec<TransactionFlow>> {
        let Self { store, config, flows, fetch_count, .. } = self;
        flows.get_or_fetch(FLOWS_QUERY, now, || {
            *fetch_count += 1;
            store.flows_for_period(&config.period)
        })
    }

    pub fn cap_tiers(&mut self, now: DateTime<Utc>) -> IcfResult<Vec<CapTier>> {
        let Self { store, tiers, fetch_count, .. } = self;
        tiers.get_or_fetch(CAP_TIERS_QUERY, now, || {
            *fetch_count += 1;
            store.cap_tiers()
        })
    }

    /// Base schedule built from the (possibly cached) tiers and flows.
    pub fn cap_schedule(&mut self, now: DateTime<Utc>) -> IcfResult<CapSchedule> {
        let flows = self.flows(now)?;
        let tiers = self.cap_tiers(now)?;
        Ok(build_cap_schedule(&tiers, &flows, &self.config))
    }

    pub fn invalidate(&mut self) {
        self.flows.clear();
        self.tiers.clear();
    }
}
