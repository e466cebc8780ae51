//! Max over the values of a map
//!
//! An explicit loop against an iterator `max()`, over a SipHash `HashMap` and
//! an insertion-ordered, Fx-hashed `IndexMap` holding the same entries.

use crate::input::{InputSource, alphanumeric};
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use rand::Rng;
use std::collections::HashMap;
use steadybench::{
    BenchmarkDefinition, ParameterCombination, Suite, TimeUnit, Workload, WorkloadError,
};

const KEY_LEN: usize = 16;

/// Both maps, filled with identical random entries
#[derive(Debug, Clone)]
pub struct StreamContext {
    /// SipHash map
    pub hash_map: HashMap<String, i64>,
    /// Insertion-ordered map
    pub indexed_map: IndexMap<String, i64, FxBuildHasher>,
}

/// Which map and which reduction one definition times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// `for` loop over `HashMap` values
    HashMapLoop,
    /// `values().max()` on the `HashMap`
    HashMapIter,
    /// `for` loop over `IndexMap` values
    IndexedMapLoop,
    /// `values().max()` on the `IndexMap`
    IndexedMapIter,
}

/// Map-reduction workload
#[derive(Debug, Clone, Copy)]
pub struct StreamLab {
    source: InputSource,
    reduction: Reduction,
}

impl StreamLab {
    /// Workload timing `reduction`
    pub fn new(source: InputSource, reduction: Reduction) -> Self {
        Self { source, reduction }
    }
}

impl Workload for StreamLab {
    type Context = StreamContext;
    type Output = i64;

    fn setup(&self, combination: &ParameterCombination) -> Result<StreamContext, WorkloadError> {
        let num_entries: usize = combination.parse("numEntries")?;
        if num_entries == 0 {
            return Err(WorkloadError::msg("numEntries must be at least 1"));
        }

        let mut rng = self.source.rng();
        let mut hash_map = HashMap::with_capacity(num_entries);
        let mut indexed_map =
            IndexMap::with_capacity_and_hasher(num_entries, FxBuildHasher::default());
        for _ in 0..num_entries {
            let key = alphanumeric(&mut rng, KEY_LEN);
            let value = rng.gen_range(0..i64::MAX);
            hash_map.insert(key.clone(), value);
            indexed_map.insert(key, value);
        }

        Ok(StreamContext {
            hash_map,
            indexed_map,
        })
    }

    fn invoke(&self, ctx: &mut StreamContext) -> i64 {
        match self.reduction {
            Reduction::HashMapLoop => {
                let mut result = -1;
                for &value in ctx.hash_map.values() {
                    result = result.max(value);
                }
                result
            }
            Reduction::HashMapIter => ctx.hash_map.values().copied().max().unwrap_or(-1),
            Reduction::IndexedMapLoop => {
                let mut result = -1;
                for &value in ctx.indexed_map.values() {
                    result = result.max(value);
                }
                result
            }
            Reduction::IndexedMapIter => ctx.indexed_map.values().copied().max().unwrap_or(-1),
        }
    }
}

/// The four reductions, each over `numEntries {100, 10000}`
pub fn suite(source: InputSource) -> Suite {
    [
        ("max_hash_map", Reduction::HashMapLoop),
        ("max_hash_map_iter", Reduction::HashMapIter),
        ("max_indexed_map", Reduction::IndexedMapLoop),
        ("max_indexed_map_iter", Reduction::IndexedMapIter),
    ]
    .into_iter()
    .fold(Suite::new(), |suite, (name, reduction)| {
        suite.with(
            BenchmarkDefinition::new(name, StreamLab::new(source, reduction))
                .param("numEntries", ["100", "10000"])
                .unit(TimeUnit::Nanoseconds),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_reductions_agree() {
        let combo = ParameterCombination::new([("numEntries", "500")]);
        let reductions = [
            Reduction::HashMapLoop,
            Reduction::HashMapIter,
            Reduction::IndexedMapLoop,
            Reduction::IndexedMapIter,
        ];
        let results: Vec<i64> = reductions
            .iter()
            .map(|&r| {
                let lab = StreamLab::new(InputSource::seeded(11), r);
                let mut ctx = lab.setup(&combo).unwrap();
                lab.invoke(&mut ctx)
            })
            .collect();

        assert!(results[0] >= 0);
        assert!(results.iter().all(|&r| r == results[0]));
    }

    #[test]
    fn test_maps_hold_same_entries() {
        let lab = StreamLab::new(InputSource::seeded(5), Reduction::HashMapLoop);
        let ctx = lab
            .setup(&ParameterCombination::new([("numEntries", "100")]))
            .unwrap();
        assert_eq!(ctx.hash_map.len(), ctx.indexed_map.len());
        for (key, value) in &ctx.indexed_map {
            assert_eq!(ctx.hash_map.get(key), Some(value));
        }
    }

    #[test]
    fn test_zero_entries_rejected() {
        let lab = StreamLab::new(InputSource::seeded(5), Reduction::HashMapIter);
        assert!(lab
            .setup(&ParameterCombination::new([("numEntries", "0")]))
            .is_err());
    }

    #[test]
    fn test_suite_shape() {
        let suite = suite(InputSource::entropy());
        assert_eq!(suite.len(), 4);
        assert!(suite.validate().is_ok());
        assert!(suite.definitions().iter().all(|d| d.combinations().len() == 2));
    }
}
