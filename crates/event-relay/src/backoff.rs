//! Exponential backoff between dial attempts.

use std::time::Duration;

/// Doubling delay bounded by a floor and a ceiling.
///
/// The Nth consecutive call to [`Backoff::next_delay`] returns
/// `min(floor * 2^(N-1), ceiling)`; [`Backoff::reset`] starts over at the floor.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        let ceiling = ceiling.max(floor);
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Delay the next retry would wait, without advancing.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Return the delay for this retry and double it for the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .checked_mul(2)
            .map_or(self.ceiling, |doubled| doubled.min(self.ceiling));
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_ceiling() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(15));
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 15, 15, 15]);
    }

    #[test]
    fn matches_closed_form() {
        let floor = Duration::from_millis(250);
        let ceiling = Duration::from_secs(10);
        let mut backoff = Backoff::new(floor, ceiling);

        for n in 1..=20u32 {
            let expected = floor
                .checked_mul(2u32.saturating_pow(n - 1))
                .unwrap_or(ceiling)
                .min(ceiling);
            assert_eq!(backoff.next_delay(), expected, "retry {n}");
        }
    }

    #[test]
    fn reset_returns_to_floor() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_secs(4));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn ceiling_below_floor_is_raised_to_floor() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn huge_delays_saturate_at_ceiling() {
        let mut backoff = Backoff::new(Duration::MAX / 2 + Duration::from_secs(1), Duration::MAX);
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::MAX);
    }
}
