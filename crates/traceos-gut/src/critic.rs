use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use traceos_types::{GutState, MoodState, ResonanceEvent};

/// The valuation engine. Tastes interaction events and derives emotional
/// state — it senses, it does not think. `ingest_batch` is the only
/// mutation method; every other accessor is read-only.
pub struct GutCritic {
    events: VecDeque<ResonanceEvent>,
    max_events: usize,
    state: GutState,
    decay: f64,
    min_dwell_time: Duration,
    last_mood_change: DateTime<Utc>,
    chaos_start: Option<DateTime<Utc>>,
    erratic_event_times: VecDeque<DateTime<Utc>>,
}

impl GutCritic {
    pub fn new(max_events: usize, decay: f64, min_dwell_time_seconds: f64) -> Self {
        let now = Utc::now();
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
            state: GutState {
                mood: MoodState::Calm,
                frustration_index: 0.0,
                flow_probability: 0.0,
                last_updated: now,
            },
            decay,
            min_dwell_time: Duration::milliseconds((min_dwell_time_seconds * 1000.0) as i64),
            last_mood_change: now,
            chaos_start: None,
            erratic_event_times: VecDeque::with_capacity(10),
        }
    }

    /// Read-only snapshot of the current state. This is the only accessor
    /// other organs are given — nothing outside `ingest_batch`/`clear` can
    /// reach the mutable fields.
    pub fn state(&self) -> GutState {
        self.state.clone()
    }

    fn sense_frustration(&self, events: &[ResonanceEvent]) -> f64 {
        let mut frustration = self.state.frustration_index * self.decay;

        for ev in events {
            if ev.event_type == "undo" {
                if let Some(latency) = ev.latency_ms {
                    if latency < 500.0 {
                        frustration += 0.10;
                    } else if latency < 1000.0 {
                        frustration += 0.05;
                    }
                }
            }
            if ev.event_type == "ghost_reject" {
                frustration += 0.08;
            }
            if ev.event_type == "stroke_reject" {
                frustration += 0.05;
            }
        }

        frustration.clamp(0.0, 1.0)
    }

    fn sense_flow(&self, events: &[ResonanceEvent]) -> f64 {
        let mut flow = self.state.flow_probability * self.decay;

        for ev in events {
            if ev.event_type == "stroke_accept" || ev.event_type == "ghost_accept" {
                match ev.latency_ms {
                    Some(latency) if latency < 200.0 => flow += 0.12,
                    _ => flow += 0.05,
                }
            }
            if ev.event_type == "pause_detected" {
                flow += 0.03;
            }
        }

        flow.clamp(0.0, 1.0)
    }

    fn check_erratic_input(&mut self, events: &[ResonanceEvent]) -> bool {
        let now = Utc::now();

        for ev in events {
            if ev.erratic_input == Some(true) {
                if self.erratic_event_times.len() == 10 {
                    self.erratic_event_times.pop_front();
                }
                self.erratic_event_times.push_back(now);
            }
        }

        if self.erratic_event_times.len() >= 10 {
            if let Some(oldest) = self.erratic_event_times.front() {
                if (now - *oldest) <= Duration::seconds(5) {
                    return true;
                }
            }
        }

        events.iter().any(|ev| ev.erratic_input == Some(true))
    }

    fn derive_mood(&mut self, frustration: f64, flow: f64, has_erratic: bool) -> MoodState {
        let now = Utc::now();
        let can_transition = now - self.last_mood_change >= self.min_dwell_time;

        if frustration > 0.8 && has_erratic {
            match self.chaos_start {
                None => {
                    self.chaos_start = Some(now);
                }
                Some(start) => {
                    if (now - start) > Duration::seconds(10)
                        && (can_transition || self.state.mood == MoodState::Chaos)
                    {
                        self.last_mood_change = now;
                        return MoodState::Chaos;
                    }
                }
            }
        } else {
            self.chaos_start = None;
        }

        if !can_transition {
            return self.state.mood;
        }

        if frustration > 0.7 {
            if self.state.mood != MoodState::Frustration {
                self.last_mood_change = now;
            }
            return MoodState::Frustration;
        }

        if flow > 0.8 {
            if self.state.mood != MoodState::Flow {
                self.last_mood_change = now;
            }
            return MoodState::Flow;
        }

        if (0.5..=0.8).contains(&flow) && frustration < 0.4 {
            if self.state.mood != MoodState::Exploration {
                self.last_mood_change = now;
            }
            return MoodState::Exploration;
        }

        if self.state.mood != MoodState::Calm {
            self.last_mood_change = now;
        }
        MoodState::Calm
    }

    /// The only mutation method. Empty batches are a no-op — they return
    /// the unchanged current state rather than re-deriving mood from
    /// nothing.
    pub fn ingest_batch(&mut self, events: Vec<ResonanceEvent>) -> GutState {
        if events.is_empty() {
            return self.state.clone();
        }

        for ev in &events {
            if self.events.len() == self.max_events {
                self.events.pop_front();
            }
            self.events.push_back(ev.clone());
        }

        let has_erratic = self.check_erratic_input(&events);
        let frustration = self.sense_frustration(&events);
        let flow = self.sense_flow(&events);
        let mood = self.derive_mood(frustration, flow, has_erratic);

        self.state = GutState {
            mood,
            frustration_index: frustration,
            flow_probability: flow,
            last_updated: Utc::now(),
        };

        self.state.clone()
    }

    /// Reset all state. Called on session end — no emotional data persists
    /// once the session is gone.
    pub fn clear(&mut self) {
        self.events.clear();
        self.erratic_event_times.clear();
        self.chaos_start = None;
        let now = Utc::now();
        self.state = GutState {
            mood: MoodState::Calm,
            frustration_index: 0.0,
            flow_probability: 0.0,
            last_updated: now,
        };
        self.last_mood_change = now;
    }
}

impl Default for GutCritic {
    fn default() -> Self {
        Self::new(100, 0.95, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, latency_ms: Option<f64>) -> ResonanceEvent {
        ResonanceEvent {
            event_type: kind.into(),
            timestamp: 0.0,
            session_id: "s1".into(),
            latency_ms,
            erratic_input: None,
            context: None,
        }
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut critic = GutCritic::default();
        let before = critic.state();
        let after = critic.ingest_batch(vec![]);
        assert_eq!(before.frustration_index, after.frustration_index);
        assert_eq!(before.mood, after.mood);
    }

    #[test]
    fn fast_undo_raises_frustration() {
        let mut critic = GutCritic::default();
        let state = critic.ingest_batch(vec![event("undo", Some(100.0))]);
        assert!(state.frustration_index > 0.0);
    }

    #[test]
    fn fast_acceptance_raises_flow() {
        let mut critic = GutCritic::default();
        let state = critic.ingest_batch(vec![event("stroke_accept", Some(50.0))]);
        assert!(state.flow_probability > 0.0);
    }

    #[test]
    fn sustained_frustration_enters_frustration_mood() {
        let mut critic = GutCritic::new(100, 0.95, 0.0);
        for _ in 0..10 {
            critic.ingest_batch(vec![event("undo", Some(100.0))]);
        }
        assert_eq!(critic.state().mood, MoodState::Frustration);
    }

    #[test]
    fn sustained_flow_enters_flow_mood() {
        let mut critic = GutCritic::new(100, 0.95, 0.0);
        for _ in 0..10 {
            critic.ingest_batch(vec![event("stroke_accept", Some(50.0))]);
        }
        assert_eq!(critic.state().mood, MoodState::Flow);
    }

    #[test]
    fn clear_resets_to_calm() {
        let mut critic = GutCritic::new(100, 0.95, 0.0);
        for _ in 0..10 {
            critic.ingest_batch(vec![event("undo", Some(100.0))]);
        }
        critic.clear();
        let state = critic.state();
        assert_eq!(state.mood, MoodState::Calm);
        assert_eq!(state.frustration_index, 0.0);
        assert_eq!(state.flow_probability, 0.0);
    }

    #[test]
    fn dwell_time_suppresses_rapid_mood_flip() {
        let mut critic = GutCritic::new(100, 0.95, 2.0);
        for _ in 0..10 {
            critic.ingest_batch(vec![event("undo", Some(100.0))]);
        }
        // min_dwell_secs=2.0 — back-to-back batches within the same
        // millisecond can't have crossed the dwell window, so mood should
        // still read Calm despite frustration climbing.
        assert_eq!(critic.state().mood, MoodState::Calm);
    }

    #[test]
    fn window_is_bounded_to_max_events() {
        let mut critic = GutCritic::new(5, 0.95, 0.0);
        for i in 0..20 {
            critic.ingest_batch(vec![event("pause_detected", None)]);
            let _ = i;
        }
        assert!(critic.events.len() <= 5);
    }
}
