//! Failover pacing between hosts.
//!
//! The dispatcher hops to the next host after a transport-class failure. How long it waits
//! before each hop is decided by a [`FailoverStrategy`]; the default hops immediately.

use rand::Rng;
use std::time::Duration;

/// Defines how long to wait before contacting the next host.
///
/// # Examples
///
/// ```
/// use c8_client::FailoverStrategy;
/// use std::time::Duration;
///
/// // Hop at once
/// let immediate = FailoverStrategy::Immediate;
/// assert_eq!(immediate.delay_for_hop(1), None);
///
/// // Exponential backoff: 100ms, 200ms, 400ms...
/// let exponential = FailoverStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(5),
///     jitter: false,
/// };
/// assert_eq!(exponential.delay_for_hop(3), Some(Duration::from_millis(400)));
/// ```
#[derive(Debug, Clone, Default)]
pub enum FailoverStrategy {
    /// Contact the next host without waiting.
    #[default]
    Immediate,

    /// Wait a fixed delay before every hop.
    Linear {
        /// The delay before each hop.
        delay: Duration,
    },

    /// Wait `initial_delay * 2^(hop - 1)`, capped at `max_delay`.
    ExponentialBackoff {
        /// The delay before the first hop.
        initial_delay: Duration,
        /// The maximum delay before a hop.
        max_delay: Duration,
        /// Whether to scale each delay by a random factor between 0.5 and 1.0.
        jitter: bool,
    },

    /// Custom pacing.
    Custom {
        /// Takes the hop number (1-indexed) and returns the delay before it.
        delay_fn: fn(hop: usize) -> Duration,
    },
}

impl FailoverStrategy {
    /// Returns the delay before the given hop, or `None` to hop immediately.
    ///
    /// # Arguments
    ///
    /// * `hop` - The hop number (1-indexed, so 1 = first switch to another host)
    pub fn delay_for_hop(&self, hop: usize) -> Option<Duration> {
        let delay = match self {
            FailoverStrategy::Immediate => return None,
            FailoverStrategy::Linear { delay } => *delay,
            FailoverStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let multiplier = 2u64.saturating_pow(hop.saturating_sub(1) as u32);
                let base_delay =
                    initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    delay.mul_f64(jitter_factor)
                } else {
                    delay
                }
            }
            FailoverStrategy::Custom { delay_fn } => delay_fn(hop),
        };
        (!delay.is_zero()).then_some(delay)
    }
}
