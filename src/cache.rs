//! Effective-Config Cache
//!
//! Per-org memo of merged documents and lineages, owned by one service instance. An
//! entry is only ever returned for the exact epoch it was stored under; inserting under
//! a newer epoch discards the org's older entries. Bounded per org with FIFO eviction.

use crate::config::CacheConfig;
use crate::document::Document;
use crate::types::{Epoch, NodeId, OrgId};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct OrgCache {
    epoch: Epoch,
    effective: HashMap<NodeId, Arc<Document>>,
    lineages: HashMap<NodeId, Arc<Vec<NodeId>>>,
    order: VecDeque<NodeId>,
}

impl OrgCache {
    /// Returns false when `epoch` is older than what the org already holds.
    fn advance_to(&mut self, epoch: Epoch) -> bool {
        if epoch < self.epoch {
            return false;
        }
        if epoch > self.epoch {
            self.epoch = epoch;
            self.effective.clear();
            self.lineages.clear();
            self.order.clear();
        }
        true
    }

    fn len(&self) -> usize {
        self.effective.len() + self.lineages.len()
    }

    fn evict_to(&mut self, max_entries: usize) {
        while self.len() >= max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.effective.remove(&oldest);
            self.lineages.remove(&oldest);
        }
    }

    fn touch(&mut self, node_id: &NodeId) {
        if !self.effective.contains_key(node_id) && !self.lineages.contains_key(node_id) {
            self.order.push_back(node_id.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub orgs: usize,
    pub entries: usize,
}

pub struct EffectiveConfigCache {
    config: CacheConfig,
    orgs: Mutex<HashMap<OrgId, OrgCache>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EffectiveConfigCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            orgs: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn get_effective(&self, org_id: &OrgId, node_id: &NodeId, epoch: Epoch) -> Option<Arc<Document>> {
        if !self.config.enabled {
            return None;
        }
        let found = {
            let orgs = self.orgs.lock();
            orgs.get(org_id)
                .filter(|org| org.epoch == epoch)
                .and_then(|org| org.effective.get(node_id).cloned())
        };
        self.record(found.is_some());
        found
    }

    pub fn put_effective(&self, org_id: &OrgId, node_id: &NodeId, epoch: Epoch, document: Arc<Document>) {
        if !self.config.enabled {
            return;
        }
        let mut orgs = self.orgs.lock();
        let org = orgs.entry(org_id.clone()).or_default();
        if !org.advance_to(epoch) {
            return;
        }
        if !org.effective.contains_key(node_id) {
            org.evict_to(self.config.max_entries_per_org);
        }
        org.touch(node_id);
        org.effective.insert(node_id.clone(), document);
    }

    pub fn get_lineage(&self, org_id: &OrgId, node_id: &NodeId, epoch: Epoch) -> Option<Arc<Vec<NodeId>>> {
        if !self.config.enabled {
            return None;
        }
        let orgs = self.orgs.lock();
        orgs.get(org_id)
            .filter(|org| org.epoch == epoch)
            .and_then(|org| org.lineages.get(node_id).cloned())
    }

    pub fn put_lineage(&self, org_id: &OrgId, node_id: &NodeId, epoch: Epoch, lineage: Arc<Vec<NodeId>>) {
        if !self.config.enabled {
            return;
        }
        let mut orgs = self.orgs.lock();
        let org = orgs.entry(org_id.clone()).or_default();
        if !org.advance_to(epoch) {
            return;
        }
        if !org.lineages.contains_key(node_id) {
            org.evict_to(self.config.max_entries_per_org);
        }
        org.touch(node_id);
        org.lineages.insert(node_id.clone(), lineage);
    }

    /// Drop everything held for one org.
    pub fn clear_org(&self, org_id: &OrgId) {
        self.orgs.lock().remove(org_id);
    }

    pub fn stats(&self) -> CacheStats {
        let orgs = self.orgs.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            orgs: orgs.len(),
            entries: orgs.values().map(OrgCache::len).sum(),
        }
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
