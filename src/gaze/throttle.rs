use crate::clock::Millis;
use crate::models::{GazeSample, RawGaze};

pub const LOGGING_INTERVAL_MS: Millis = 200;

/// Rate limiter between the capability's native emission rate and the
/// session buffer. Accepts a prediction only when at least `interval_ms`
/// has passed since the last accepted one; the first prediction of a
/// capture is always accepted.
#[derive(Debug, Clone)]
pub struct GazeSampleThrottle {
    interval_ms: Millis,
    last_accepted: Option<Millis>,
    accepted: u64,
    dropped: u64,
}

impl Default for GazeSampleThrottle {
    fn default() -> Self {
        Self::new(LOGGING_INTERVAL_MS)
    }
}

impl GazeSampleThrottle {
    pub fn new(interval_ms: Millis) -> Self {
        Self {
            interval_ms: interval_ms.max(0),
            last_accepted: None,
            accepted: 0,
            dropped: 0,
        }
    }

    pub fn interval_ms(&self) -> Millis {
        self.interval_ms
    }

    pub fn offer(&mut self, raw: RawGaze, now: Millis) -> Option<GazeSample> {
        let due = match self.last_accepted {
            None => true,
            Some(last) => now - last >= self.interval_ms,
        };

        if !due {
            self.dropped += 1;
            return None;
        }

        self.last_accepted = Some(now);
        self.accepted += 1;
        Some(GazeSample::stamped(raw, now))
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.accepted = 0;
        self.dropped = 0;
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x: f64) -> RawGaze {
        RawGaze { x, y: x * 2.0 }
    }

    #[test]
    fn drops_samples_inside_the_interval() {
        let mut throttle = GazeSampleThrottle::default();
        let accepted: Vec<_> = [0, 50, 250]
            .into_iter()
            .filter_map(|t| throttle.offer(raw(t as f64), t))
            .collect();

        let times: Vec<_> = accepted.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0, 250]);
        assert_eq!(throttle.dropped(), 1);
        assert_eq!(accepted[1].x, 250.0);
    }

    #[test]
    fn accepted_spacing_never_below_interval() {
        let mut throttle = GazeSampleThrottle::default();
        let mut times = Vec::new();
        // 16ms spacing, roughly a 60Hz emitter.
        for i in 0..400 {
            let t = 10_000 + i * 16;
            if let Some(sample) = throttle.offer(raw(1.0), t) {
                times.push(sample.time);
            }
        }

        assert!(times.len() > 1);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= LOGGING_INTERVAL_MS, "{pair:?}");
        }
        assert_eq!(throttle.accepted() + throttle.dropped(), 400);
    }

    #[test]
    fn exact_interval_boundary_is_accepted() {
        let mut throttle = GazeSampleThrottle::new(200);
        assert!(throttle.offer(raw(0.0), 1_000).is_some());
        assert!(throttle.offer(raw(0.0), 1_199).is_none());
        assert!(throttle.offer(raw(0.0), 1_200).is_some());
    }

    #[test]
    fn reset_accepts_next_sample_immediately() {
        let mut throttle = GazeSampleThrottle::default();
        throttle.offer(raw(0.0), 500);
        throttle.reset();
        assert!(throttle.offer(raw(0.0), 510).is_some());
        assert_eq!(throttle.accepted(), 1);
    }
}
