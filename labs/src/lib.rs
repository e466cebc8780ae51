//! steadybench labs
//!
//! Reference workloads run through steadybench. Each lab contributes a few
//! definitions to one suite; the `labs` binary runs that suite.
//!
//! | Lab | Definitions | Axes |
//! |-----|-------------|------|
//! | [`compute`] | `put`, `put_compute` | `numEntries`, `numPuts`, `mapType` |
//! | [`stream`] | `max_hash_map`, `max_hash_map_iter`, `max_indexed_map`, `max_indexed_map_iter` | `numEntries` |
//! | [`strings`] | `plus_call`, `plus_var`, `builder`, `builder_reused` | none |
//!
//! ```sh
//! cargo run -p steadybench-labs --release -- 'max_.*' --format json
//! ```

#![warn(missing_docs)]

pub mod compute;
mod input;
pub mod stream;
pub mod strings;

pub use input::{InputSource, alphanumeric};

use steadybench::Suite;

/// All labs, drawing inputs from `source`
pub fn suite_with(source: InputSource) -> Suite {
    let mut suite = compute::suite(source);
    suite.extend(stream::suite(source));
    suite.extend(strings::suite(source));
    suite
}

/// All labs with fresh random inputs
pub fn suite() -> Suite {
    suite_with(InputSource::entropy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_is_valid() {
        let suite = suite();
        assert_eq!(suite.len(), 10);
        assert!(suite.validate().is_ok());
    }
}
