//! Probabilistic sampling for high-volume log sites.

use rand::Rng;

/// Draw a uniform integer in `[1, out_of]` and accept if `likelihood` reaches it.
///
/// `out_of` of zero is treated as one.
pub fn random_chance(likelihood: u32, out_of: u32) -> bool {
    let draw = rand::thread_rng().gen_range(1..=out_of.max(1));
    likelihood >= draw
}

/// Sampling gate attached to a log call. Without `out_of` every call passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sampling {
    pub likelihood: Option<u32>,
    pub out_of: Option<u32>,
}

impl Sampling {
    pub const DEFAULT_LIKELIHOOD: u32 = 1;

    /// Accept `likelihood` calls out of every `out_of`, on average.
    pub fn new(likelihood: u32, out_of: u32) -> Self {
        Self {
            likelihood: Some(likelihood),
            out_of: Some(out_of),
        }
    }

    pub fn should_log(&self) -> bool {
        match self.out_of {
            None => true,
            Some(out_of) => random_chance(
                self.likelihood.unwrap_or(Self::DEFAULT_LIKELIHOOD),
                out_of,
            ),
        }
    }
}
