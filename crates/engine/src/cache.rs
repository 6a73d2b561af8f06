use std::collections::BTreeMap;
use std::sync::Arc;

use formats::geojson::{content_hash, filter_polar_regions, DatasetError, FeatureCollection};
use layers::MapKind;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetKey {
    pub name: String,
    /// blake3 of the raw payload.
    pub hash: String,
    pub kind: MapKind,
}

#[derive(Debug)]
struct DatasetEntry {
    collection: Arc<FeatureCollection>,
    last_used_tick: u64,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Parsed datasets, owned by whoever mounts maps.
///
/// Entries are keyed by dataset name, payload hash, and map kind, so a
/// changed payload under the same name is a new entry. Eviction is LRU by
/// `last_used_tick`, with a tie-break by key ordering.
#[derive(Debug)]
pub struct DatasetCache {
    max_entries: usize,
    tick: u64,
    entries: BTreeMap<DatasetKey, DatasetEntry>,
    stats: CacheStats,
}

impl DatasetCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            tick: 0,
            entries: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Returns the cached collection for `payload`, parsing it on a miss.
    ///
    /// World datasets have their polar regions dropped before caching.
    pub fn get_or_parse(
        &mut self,
        name: &str,
        payload: &str,
        kind: MapKind,
    ) -> Result<Arc<FeatureCollection>, DatasetError> {
        self.tick += 1;
        let key = DatasetKey {
            name: name.to_string(),
            hash: content_hash(payload),
            kind,
        };
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used_tick = self.tick;
            self.stats.hits += 1;
            return Ok(entry.collection.clone());
        }

        self.stats.misses += 1;
        let (parsed, report) = FeatureCollection::from_geojson_str(payload)?;
        if !report.skipped.is_empty() {
            warn!(
                dataset = name,
                skipped = report.skipped.len(),
                accepted = report.accepted,
                "skipped malformed features"
            );
        }
        let collection = Arc::new(match kind {
            MapKind::World => filter_polar_regions(&parsed),
            MapKind::Domestic => parsed,
        });
        debug!(dataset = name, features = collection.len(), kind = %kind, "parsed dataset");

        while self.entries.len() >= self.max_entries {
            if !self.evict_lru() {
                break;
            }
        }
        self.entries.insert(
            key,
            DatasetEntry {
                collection: collection.clone(),
                last_used_tick: self.tick,
            },
        );
        Ok(collection)
    }

    /// Drops every entry for `name`; returns how many were removed.
    pub fn invalidate(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.name != name);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_lru(&mut self) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by(|(ka, a), (kb, b)| {
                a.last_used_tick
                    .cmp(&b.last_used_tick)
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(k, _)| k.clone());
        match victim {
            Some(key) => {
                self.entries.remove(&key);
                self.stats.evictions += 1;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DatasetCache;
    use layers::MapKind;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn square(name: &str, lat: f64) -> String {
        format!(
            r#"{{"type": "FeatureCollection", "features": [{{
                "type": "Feature",
                "properties": {{"name": "{name}"}},
                "geometry": {{"type": "Polygon", "coordinates": [[[0, {lat}], [1, {lat}], [1, {top}], [0, {top}], [0, {lat}]]]}}
            }}]}}"#,
            top = lat + 1.0
        )
    }

    #[test]
    fn same_payload_is_parsed_once() {
        let mut cache = DatasetCache::new(4);
        let payload = square("A", 10.0);
        let first = cache
            .get_or_parse("provinces", &payload, MapKind::Domestic)
            .expect("parse");
        let second = cache
            .get_or_parse("provinces", &payload, MapKind::Domestic)
            .expect("parse");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn changed_payload_is_a_new_entry() {
        let mut cache = DatasetCache::new(4);
        cache
            .get_or_parse("provinces", &square("A", 10.0), MapKind::Domestic)
            .expect("parse");
        cache
            .get_or_parse("provinces", &square("B", 10.0), MapKind::Domestic)
            .expect("parse");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.invalidate("provinces"), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let mut cache = DatasetCache::new(2);
        let a = square("A", 10.0);
        let b = square("B", 10.0);
        let c = square("C", 10.0);
        cache.get_or_parse("a", &a, MapKind::Domestic).expect("a");
        cache.get_or_parse("b", &b, MapKind::Domestic).expect("b");
        cache.get_or_parse("a", &a, MapKind::Domestic).expect("a again");
        cache.get_or_parse("c", &c, MapKind::Domestic).expect("c");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        cache.get_or_parse("a", &a, MapKind::Domestic).expect("a hit");
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn world_kind_drops_polar_regions() {
        let payload = format!(
            r#"{{"type": "FeatureCollection", "features": [{}, {}]}}"#,
            feature("Temperate", 10.0),
            feature("Antarctica", -80.0)
        );
        let mut cache = DatasetCache::new(2);
        let world = cache
            .get_or_parse("world", &payload, MapKind::World)
            .expect("world");
        assert_eq!(world.len(), 1);
        assert_eq!(world.features[0].name, "Temperate");
        let domestic = cache
            .get_or_parse("world", &payload, MapKind::Domestic)
            .expect("domestic");
        assert_eq!(domestic.len(), 2);
    }

    fn feature(name: &str, lat: f64) -> String {
        format!(
            r#"{{"type": "Feature", "properties": {{"name": "{name}"}},
                "geometry": {{"type": "Polygon", "coordinates": [[[0, {lat}], [1, {lat}], [1, {top}], [0, {lat}]]]}}}}"#,
            top = lat + 1.0
        )
    }

    #[test]
    fn bad_payload_is_an_error_and_not_cached() {
        let mut cache = DatasetCache::new(2);
        assert!(cache.get_or_parse("x", "not json", MapKind::Domestic).is_err());
        assert!(cache.is_empty());
    }
}
