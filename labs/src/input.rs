//! Random inputs for lab fixtures

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Where fixtures draw their random data from.
///
/// Each call to [`InputSource::rng`] yields an independent generator, so a
/// seeded source gives every combination the same inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSource {
    seed: Option<u64>,
}

impl InputSource {
    /// Fresh OS entropy for every generator
    pub fn entropy() -> Self {
        Self { seed: None }
    }

    /// Reproducible inputs
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    /// A new generator
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// `len` random ASCII letters and digits
pub fn alphanumeric(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
