//! Counter updates in a string-keyed map
//!
//! `put` looks a key up and then inserts or updates it; `put_compute` does
//! the same through the entry API. Both run against the standard SipHash map
//! or an Fx-hashed one, selected by the `mapType` axis.

use crate::input::{InputSource, alphanumeric};
use fxhash::FxHashMap;
use rand::Rng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use steadybench::{
    BenchmarkDefinition, ParameterCombination, Suite, TimeUnit, Workload, WorkloadError,
};

const KEY_LEN: usize = 16;

/// Per-key counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountHolder {
    /// Number of puts seen for the key
    pub count: u64,
    /// Wall clock of the last put, in milliseconds
    pub timestamp_ms: u64,
}

impl CountHolder {
    fn new(timestamp_ms: u64) -> Self {
        Self {
            count: 1,
            timestamp_ms,
        }
    }

    fn touch(&mut self, timestamp_ms: u64) {
        self.count += 1;
        self.timestamp_ms = timestamp_ms;
    }
}

/// Map implementation under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapType {
    /// `std::collections::HashMap` with the default SipHash hasher
    HashMap,
    /// `FxHashMap`
    Object2ObjectMap,
}

impl FromStr for MapType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hashMap" => Ok(MapType::HashMap),
            "object2ObjectMap" => Ok(MapType::Object2ObjectMap),
            other => Err(format!(
                "unknown map type `{other}` (expected hashMap or object2ObjectMap)"
            )),
        }
    }
}

/// Counters keyed by string, in one of the two map types
#[derive(Debug)]
pub enum Counts {
    /// SipHash map
    Sip(HashMap<String, CountHolder>),
    /// Fx map
    Fx(FxHashMap<String, CountHolder>),
}

impl Counts {
    fn new(map_type: MapType) -> Self {
        match map_type {
            MapType::HashMap => Counts::Sip(HashMap::new()),
            MapType::Object2ObjectMap => Counts::Fx(FxHashMap::default()),
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        match self {
            Counts::Sip(map) => map.len(),
            Counts::Fx(map) => map.len(),
        }
    }

    /// True when nothing was put yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counter for `key`
    pub fn get(&self, key: &str) -> Option<&CountHolder> {
        match self {
            Counts::Sip(map) => map.get(key),
            Counts::Fx(map) => map.get(key),
        }
    }
}

/// Fixture for one combination
#[derive(Debug)]
pub struct ComputeContext {
    keys: Vec<String>,
    num_puts: usize,
    counts: Counts,
    rng: StdRng,
}

impl ComputeContext {
    /// Keys the puts are drawn from
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Counters accumulated so far
    pub fn counts(&self) -> &Counts {
        &self.counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    GetThenInsert,
    Entry,
}

/// The `put` / `put_compute` workload
#[derive(Debug, Clone, Copy)]
pub struct ComputeLab {
    source: InputSource,
    strategy: Strategy,
}

impl ComputeLab {
    /// Get, then insert or update in place
    pub fn put(source: InputSource) -> Self {
        Self {
            source,
            strategy: Strategy::GetThenInsert,
        }
    }

    /// Single `entry` call per put
    pub fn put_compute(source: InputSource) -> Self {
        Self {
            source,
            strategy: Strategy::Entry,
        }
    }
}

impl Workload for ComputeLab {
    type Context = ComputeContext;
    type Output = usize;

    fn setup(&self, combination: &ParameterCombination) -> Result<ComputeContext, WorkloadError> {
        let num_entries: usize = combination.parse("numEntries")?;
        let num_puts: usize = combination.parse("numPuts")?;
        let map_type: MapType = combination.parse("mapType")?;
        if num_entries == 0 {
            return Err(WorkloadError::msg("numEntries must be at least 1"));
        }

        let mut rng = self.source.rng();
        let keys = (0..num_entries)
            .map(|_| alphanumeric(&mut rng, KEY_LEN))
            .collect();

        Ok(ComputeContext {
            keys,
            num_puts,
            counts: Counts::new(map_type),
            rng,
        })
    }

    fn invoke(&self, ctx: &mut ComputeContext) -> usize {
        let ComputeContext {
            keys,
            num_puts,
            counts,
            rng,
        } = ctx;
        match (counts, self.strategy) {
            (Counts::Sip(map), Strategy::GetThenInsert) => put(map, keys, *num_puts, rng),
            (Counts::Fx(map), Strategy::GetThenInsert) => put(map, keys, *num_puts, rng),
            (Counts::Sip(map), Strategy::Entry) => put_entry(map, keys, *num_puts, rng),
            (Counts::Fx(map), Strategy::Entry) => put_entry(map, keys, *num_puts, rng),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn put<S: BuildHasher>(
    map: &mut HashMap<String, CountHolder, S>,
    keys: &[String],
    num_puts: usize,
    rng: &mut StdRng,
) -> usize {
    for _ in 0..num_puts {
        let key = &keys[rng.gen_range(0..keys.len())];
        match map.get_mut(key.as_str()) {
            Some(holder) => holder.touch(now_ms()),
            None => {
                map.insert(key.clone(), CountHolder::new(now_ms()));
            }
        }
    }
    map.len()
}

fn put_entry<S: BuildHasher>(
    map: &mut HashMap<String, CountHolder, S>,
    keys: &[String],
    num_puts: usize,
    rng: &mut StdRng,
) -> usize {
    for _ in 0..num_puts {
        let key = &keys[rng.gen_range(0..keys.len())];
        // The entry API takes an owned key, so every put pays for a clone
        map.entry(key.clone())
            .and_modify(|holder| holder.touch(now_ms()))
            .or_insert_with(|| CountHolder::new(now_ms()));
    }
    map.len()
}

fn axes(def: BenchmarkDefinition) -> BenchmarkDefinition {
    def.param("numEntries", ["30"])
        .param("numPuts", ["100", "10000"])
        .param("mapType", ["hashMap", "object2ObjectMap"])
        .unit(TimeUnit::Nanoseconds)
}

/// `put` and `put_compute`
pub fn suite(source: InputSource) -> Suite {
    Suite::new()
        .with(axes(BenchmarkDefinition::new("put", ComputeLab::put(source))))
        .with(axes(BenchmarkDefinition::new(
            "put_compute",
            ComputeLab::put_compute(source),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(entries: &str, puts: &str, map: &str) -> ParameterCombination {
        ParameterCombination::new([
            ("numEntries", entries),
            ("numPuts", puts),
            ("mapType", map),
        ])
    }

    #[test]
    fn test_map_type_parse() {
        assert_eq!("hashMap".parse::<MapType>(), Ok(MapType::HashMap));
        assert_eq!(
            "object2ObjectMap".parse::<MapType>(),
            Ok(MapType::Object2ObjectMap)
        );
        assert!("treeMap".parse::<MapType>().is_err());
    }

    #[test]
    fn test_setup_builds_keys() {
        let lab = ComputeLab::put(InputSource::seeded(1));
        let ctx = lab.setup(&combo("30", "100", "hashMap")).unwrap();
        assert_eq!(ctx.keys().len(), 30);
        assert!(ctx.keys().iter().all(|k| k.len() == KEY_LEN));
        assert!(ctx.counts().is_empty());
        assert!(matches!(ctx.counts(), Counts::Sip(_)));

        let ctx = lab.setup(&combo("30", "100", "object2ObjectMap")).unwrap();
        assert!(matches!(ctx.counts(), Counts::Fx(_)));
    }

    #[test]
    fn test_setup_rejects_bad_values() {
        let lab = ComputeLab::put(InputSource::seeded(1));
        assert!(matches!(
            lab.setup(&combo("30", "100", "treeMap")),
            Err(WorkloadError::InvalidParameter { .. })
        ));
        assert!(lab.setup(&combo("0", "100", "hashMap")).is_err());
        assert!(matches!(
            lab.setup(&ParameterCombination::default()),
            Err(WorkloadError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_both_strategies_count_every_put() {
        for lab in [
            ComputeLab::put(InputSource::seeded(3)),
            ComputeLab::put_compute(InputSource::seeded(3)),
        ] {
            for map in ["hashMap", "object2ObjectMap"] {
                let mut ctx = lab.setup(&combo("5", "1000", map)).unwrap();
                let size = lab.invoke(&mut ctx);
                assert!(size <= 5 && size > 0);

                let total: u64 = ctx
                    .keys()
                    .iter()
                    .filter_map(|k| ctx.counts().get(k))
                    .map(|h| h.count)
                    .sum();
                assert_eq!(total, 1000);
            }
        }
    }

    #[test]
    fn test_suite_shape() {
        let suite = suite(InputSource::seeded(0));
        assert_eq!(suite.len(), 2);
        assert!(suite.validate().is_ok());
        assert_eq!(suite.find("put").unwrap().combinations().len(), 4);
    }
}
