use rand::Rng;

/// Fault model for one direction of the simulated link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkProfile {
    /// Probability that a datagram is lost.
    pub drop_rate: f64,
    /// Probability that a delivered datagram gains extra copies.
    pub duplicate_rate: f64,
    /// Upper bound on extra copies per datagram.
    pub max_duplicates: u32,
    /// Probability that a delivered copy jumps ahead of queued traffic.
    pub reorder_rate: f64,
}

impl LinkProfile {
    /// Delivers everything exactly once, in order.
    pub fn reliable() -> Self {
        Self {
            drop_rate: 0.0,
            duplicate_rate: 0.0,
            max_duplicates: 0,
            reorder_rate: 0.0,
        }
    }

    pub fn lossy(drop_rate: f64) -> Self {
        Self {
            drop_rate,
            ..Self::reliable()
        }
    }

    pub fn with_duplicates(self, duplicate_rate: f64, max_duplicates: u32) -> Self {
        Self {
            duplicate_rate,
            max_duplicates,
            ..self
        }
    }

    pub fn with_reordering(self, reorder_rate: f64) -> Self {
        Self {
            reorder_rate,
            ..self
        }
    }

    /// Number of copies the link delivers for one datagram.
    pub fn copies(&self, rng: &mut impl Rng) -> u32 {
        if rng.gen_bool(self.drop_rate.clamp(0.0, 1.0)) {
            return 0;
        }
        if self.max_duplicates > 0 && rng.gen_bool(self.duplicate_rate.clamp(0.0, 1.0)) {
            return 1 + rng.gen_range(1..=self.max_duplicates);
        }
        1
    }

    /// Whether a copy overtakes traffic already queued.
    pub fn overtakes(&self, rng: &mut impl Rng) -> bool {
        rng.gen_bool(self.reorder_rate.clamp(0.0, 1.0))
    }
}

impl Default for LinkProfile {
    fn default() -> Self {
        Self::reliable()
    }
}
