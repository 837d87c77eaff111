use crate::clock::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardPhase {
    AwaitingHazardStart,
    AwaitingHazardEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    HazardStarted(Millis),
    HazardEnded(Millis),
}

/// Turns the hazard key's repeated toggles into start/end timestamp pairs
/// for one video playback.
///
/// [`finalize`](HazardEventRecorder::finalize) consumes the recorder, so a
/// playback can only be closed once and no toggle can land afterwards.
#[derive(Debug, Clone)]
pub struct HazardEventRecorder {
    phase: HazardPhase,
    timestamps: Vec<Millis>,
}

impl Default for HazardEventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl HazardEventRecorder {
    pub fn new() -> Self {
        Self {
            phase: HazardPhase::AwaitingHazardStart,
            timestamps: Vec::new(),
        }
    }

    pub fn on_toggle(&mut self, now: Millis) -> ToggleOutcome {
        // Keep the list monotonic even if the clock steps backwards.
        let at = self.timestamps.last().map_or(now, |last| now.max(*last));
        self.timestamps.push(at);

        match self.phase {
            HazardPhase::AwaitingHazardStart => {
                self.phase = HazardPhase::AwaitingHazardEnd;
                ToggleOutcome::HazardStarted(at)
            }
            HazardPhase::AwaitingHazardEnd => {
                self.phase = HazardPhase::AwaitingHazardStart;
                ToggleOutcome::HazardEnded(at)
            }
        }
    }

    pub fn phase(&self) -> HazardPhase {
        self.phase
    }

    /// Whether the on-screen hazard indicator should be lit.
    pub fn is_flashing(&self) -> bool {
        self.phase == HazardPhase::AwaitingHazardEnd
    }

    pub fn toggle_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn timestamps(&self) -> &[Millis] {
        &self.timestamps
    }

    /// Closes an open hazard with the video-end time and returns the
    /// even-length list of start/end pairs.
    pub fn finalize(mut self, video_end: Millis) -> Vec<Millis> {
        if self.phase == HazardPhase::AwaitingHazardEnd {
            let at = self.timestamps.last().map_or(video_end, |last| video_end.max(*last));
            self.timestamps.push(at);
        }
        self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_hazard_is_closed_at_video_end() {
        let mut recorder = HazardEventRecorder::new();
        assert_eq!(recorder.on_toggle(100), ToggleOutcome::HazardStarted(100));
        assert!(recorder.is_flashing());
        assert_eq!(recorder.finalize(500), vec![100, 500]);
    }

    #[test]
    fn closed_pairs_are_kept_as_is() {
        let mut recorder = HazardEventRecorder::new();
        recorder.on_toggle(100);
        assert_eq!(recorder.on_toggle(300), ToggleOutcome::HazardEnded(300));
        assert!(!recorder.is_flashing());
        recorder.on_toggle(400);
        recorder.on_toggle(450);
        assert_eq!(recorder.finalize(900), vec![100, 300, 400, 450]);
    }

    #[test]
    fn no_toggles_finalize_to_empty() {
        assert!(HazardEventRecorder::new().finalize(1_000).is_empty());
    }

    #[test]
    fn any_toggle_sequence_finalizes_even() {
        for toggles in 0..12 {
            let mut recorder = HazardEventRecorder::new();
            for i in 0..toggles {
                recorder.on_toggle(1_000 + i * 37);
            }
            let end = 5_000;
            let events = recorder.finalize(end);
            assert_eq!(events.len() % 2, 0, "{toggles} toggles");
            if toggles % 2 == 1 {
                assert_eq!(events.last(), Some(&end));
            }
            assert!(events.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn end_before_last_toggle_is_clamped() {
        let mut recorder = HazardEventRecorder::new();
        recorder.on_toggle(800);
        assert_eq!(recorder.finalize(700), vec![800, 800]);
    }
}
