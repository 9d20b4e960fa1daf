//! Discovery of the largest existing issue id.

use crate::client::Probe;
use crate::error::SyncError;
use crate::types::ProbeOutcome;
use tracing::{debug, info};

/// Half-open interval `[low, high)` of candidate ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBound {
    pub low: u64,
    pub high: u64,
}

impl SearchBound {
    /// Midpoint probed next. Equal to `low` once the interval holds one id.
    pub fn mid(&self) -> u64 {
        self.low + (self.high - self.low) / 2
    }

    /// Narrows the interval around `mid` given the probe outcome.
    pub fn narrow(self, mid: u64, outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::NotFound => Self {
                low: self.low,
                high: mid,
            },
            ProbeOutcome::Exists => Self {
                low: mid,
                high: self.high,
            },
        }
    }
}

/// Binary-searches `[0, max_candidate]` for the largest id the probe reports
/// as existing.
///
/// Ids are assumed dense from the bottom up to the boundary: everything at
/// or below it exists, everything above it is missing. Each step costs one
/// probe, about `log2(max_candidate)` requests in total. Probe errors are
/// returned immediately.
///
/// Fails with [`SyncError::BoundaryNotFound`] when the search converges on
/// `max_candidate` (the live range may continue past the limit) or when no
/// id in the range exists at all.
///
/// # Example
///
/// ```
/// use redminesync::{find_max_id, Probe, ProbeOutcome, SyncError};
///
/// struct Upto(u64);
///
/// #[async_trait::async_trait]
/// impl Probe for Upto {
///     async fn probe(&self, id: u64) -> Result<ProbeOutcome, SyncError> {
///         Ok(if id <= self.0 { ProbeOutcome::Exists } else { ProbeOutcome::NotFound })
///     }
/// }
///
/// # async fn example() -> Result<(), SyncError> {
/// assert_eq!(find_max_id(&Upto(4171), 1_000_000).await?, 4171);
/// # Ok(())
/// # }
/// ```
pub async fn find_max_id<P: Probe + ?Sized>(
    probe: &P,
    max_candidate: u64,
) -> Result<u64, SyncError> {
    let exhausted = || SyncError::BoundaryNotFound { max_candidate };
    let mut bound = SearchBound {
        low: 0,
        high: max_candidate.checked_add(1).ok_or_else(exhausted)?,
    };

    loop {
        let mid = bound.mid();
        if mid == bound.low {
            break;
        }
        debug!("searching max issue id in [{}, {})", bound.low, bound.high);
        let outcome = probe.probe(mid).await?;
        bound = bound.narrow(mid, outcome);
    }

    if bound.low == max_candidate {
        return Err(exhausted());
    }
    // Only reachable when every probe missed, so id 0 was never tested.
    if bound.low == 0 && probe.probe(0).await? == ProbeOutcome::NotFound {
        return Err(exhausted());
    }

    info!("found max issue id: {}", bound.low);
    Ok(bound.low)
}
