//! Debounced "has the listing stopped growing?" detector.
//!
//! A pure state machine: the driver feeds it the size of the accumulated
//! link set after every tick and stops once it reports [`Stabilization::Done`]
//! or [`Stabilization::Failed`].

/// Progress of a listing towards a stable size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stabilization {
    /// The set grew on the last tick (or nothing has been observed yet).
    Polling { last: usize },
    /// The set has kept the same size for `count` consecutive ticks.
    Stabilizing { last: usize, count: u32 },
    /// Stable for the full threshold with at least one link.
    Done { total: usize },
    /// Stable for the full threshold with nothing found.
    Failed,
}

impl Default for Stabilization {
    fn default() -> Self {
        Self::Polling { last: 0 }
    }
}

impl Stabilization {
    /// Advance by one tick that observed `observed` distinct links.
    ///
    /// An unchanged size counts towards `threshold`; any growth resets the
    /// count. Terminal states stay terminal.
    pub fn advance(self, observed: usize, threshold: u32) -> Self {
        let (last, count) = match self {
            Self::Polling { last } => (last, 0),
            Self::Stabilizing { last, count } => (last, count),
            terminal @ (Self::Done { .. } | Self::Failed) => return terminal,
        };

        if observed != last {
            return Self::Polling { last: observed };
        }

        let count = count + 1;
        if count < threshold {
            return Self::Stabilizing {
                last: observed,
                count,
            };
        }

        if observed == 0 {
            Self::Failed
        } else {
            Self::Done { total: observed }
        }
    }

    /// Whether polling should stop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed)
    }
}
