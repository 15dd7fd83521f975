use std::collections::HashMap;
use std::sync::RwLock;

use mandato_common::{SourceCategory, SourceEntry};

/// Default trust weight for unknown portals.
const DEFAULT_WEIGHT: f64 = 1.0;

/// In-memory map of portal domain to trust entry.
///
/// Loaded once from the store at startup; reads are frequent (one per scored
/// item), writes only happen through the admin weight update, so a reader
/// lock is the right trade-off.
pub struct SourceRegistry {
    entries: RwLock<HashMap<String, SourceEntry>>,
}

impl SourceRegistry {
    pub fn from_entries(entries: Vec<SourceEntry>) -> Self {
        let map = entries
            .into_iter()
            .filter(|e| e.active)
            .map(|e| (e.domain.to_lowercase(), e))
            .collect();
        Self {
            entries: RwLock::new(map),
        }
    }

    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trust weight for a domain: exact match, then suffix containment in
    /// either direction (so `politica.g1.globo.com` finds `g1.globo.com`),
    /// then the neutral default of 1.0.
    pub fn weight_for(&self, domain: &str) -> f64 {
        self.entry_for(domain)
            .map(|e| e.trust_weight)
            .unwrap_or(DEFAULT_WEIGHT)
    }

    /// Full entry for a domain using the same lookup rule as `weight_for`.
    pub fn entry_for(&self, domain: &str) -> Option<SourceEntry> {
        let domain = domain.to_lowercase();
        if domain.is_empty() {
            return None;
        }

        let entries = self.entries.read().expect("registry lock poisoned");
        if let Some(entry) = entries.get(&domain) {
            return Some(entry.clone());
        }
        entries
            .values()
            .find(|e| domain.ends_with(&e.domain) || e.domain.ends_with(&domain))
            .cloned()
    }

    /// Update a domain's weight in memory, clamped to [0, 2]. Unknown domains
    /// are inserted as local portals so the new weight takes effect
    /// immediately. Returns the resulting entry so the caller can persist it.
    pub fn set_weight(&self, domain: &str, weight: f64) -> SourceEntry {
        let domain = domain.to_lowercase();
        let weight = weight.clamp(0.0, 2.0);

        let mut entries = self.entries.write().expect("registry lock poisoned");
        let entry = entries.entry(domain.clone()).or_insert_with(|| SourceEntry {
            id: None,
            domain: domain.clone(),
            name: domain.clone(),
            category: SourceCategory::Local,
            trust_weight: DEFAULT_WEIGHT,
            active: true,
        });
        entry.trust_weight = weight;
        entry.clone()
    }
}
