use std::time::{Duration, Instant};

/// Slack applied when comparing against the next deadline so a refresh that wakes a hair early
/// still renders.
const DEADLINE_SLACK: Duration = Duration::from_micros(250);

/// Paces display refreshes against an optional frame-rate cap.
///
/// Without a cap every refresh is ready. With one, deadlines advance by whole intervals from the
/// previous deadline so the cadence does not drift with scheduling jitter. A caller that falls
/// more than one interval behind is resynchronised to the current instant instead of bursting
/// through the backlog.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps.and_then(|fps| {
            if fps.is_finite() && fps > 0.0 {
                Some(Duration::from_secs_f32(1.0 / fps))
            } else {
                None
            }
        });
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match self.next_due {
            Some(due) => now + DEADLINE_SLACK >= due,
            None => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        let Some(interval) = self.interval else {
            return;
        };
        let next = match self.next_due {
            Some(due) if due + interval + interval > now => due + interval,
            _ => now + interval,
        };
        self.next_due = Some(next);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_due
    }

    /// How long the caller may sleep before the next refresh is due.
    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let mut scheduler = RefreshScheduler::new(None);
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
        assert_eq!(scheduler.time_until_next(now), Duration::ZERO);
    }

    #[test]
    fn invalid_caps_disable_pacing() {
        assert_eq!(RefreshScheduler::new(Some(0.0)).interval(), None);
        assert_eq!(RefreshScheduler::new(Some(-5.0)).interval(), None);
        assert_eq!(RefreshScheduler::new(Some(f32::NAN)).interval(), None);
    }

    #[test]
    fn capped_scheduler_waits_for_the_interval() {
        let mut scheduler = RefreshScheduler::new(Some(10.0));
        let start = Instant::now();
        assert!(scheduler.ready_for_frame(start));
        scheduler.mark_rendered(start);

        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(50)));
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(100)));
        assert_eq!(
            scheduler.time_until_next(start + Duration::from_millis(40)),
            scheduler.next_deadline().unwrap() - (start + Duration::from_millis(40))
        );
    }

    #[test]
    fn deadlines_advance_without_drift() {
        let mut scheduler = RefreshScheduler::new(Some(10.0));
        let interval = scheduler.interval().unwrap();
        let start = Instant::now();
        scheduler.mark_rendered(start);
        // Rendering late within the window keeps the original cadence.
        scheduler.mark_rendered(start + interval + Duration::from_millis(7));
        assert_eq!(scheduler.next_deadline(), Some(start + interval * 2));
    }

    #[test]
    fn falling_far_behind_resyncs_to_now() {
        let mut scheduler = RefreshScheduler::new(Some(10.0));
        let interval = scheduler.interval().unwrap();
        let start = Instant::now();
        scheduler.mark_rendered(start);
        let late = start + interval * 5;
        scheduler.mark_rendered(late);
        assert_eq!(scheduler.next_deadline(), Some(late + interval));
    }
}
