use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt,
    ops::{Add, Sub},
};

/// Finest beat subdivision the chart format can address.
pub const TICKS_PER_BEAT: i64 = 192;

/// Timing values (BPMs, stop seconds) are stored at millesimal precision,
/// matching the three decimals the chart format renders.
pub const VALUE_SCALE: f64 = 1000.0;

/// Largest beat a chart position may name. Keeps every tick count, and any
/// sum or difference of two of them, far inside `i64`.
pub const MAX_BEAT: f64 = 100_000.0;

/// A beat position on the 1/192 grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(pub i64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Rounds a fractional beat to the nearest tick.
    pub fn from_beat(beat: f64) -> Self {
        Tick((beat * TICKS_PER_BEAT as f64).round() as i64)
    }

    pub fn beat(self) -> f64 {
        self.0 as f64 / TICKS_PER_BEAT as f64
    }

    pub fn ticks(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: Tick) -> Option<Tick> {
        self.0.checked_add(rhs.0).map(Tick)
    }

    pub fn checked_sub(self, rhs: Tick) -> Option<Tick> {
        self.0.checked_sub(rhs.0).map(Tick)
    }
}

impl Add for Tick {
    type Output = Tick;

    fn add(self, rhs: Tick) -> Tick {
        Tick(self.0 + rhs.0)
    }
}

impl Sub for Tick {
    type Output = Tick;

    fn sub(self, rhs: Tick) -> Tick {
        Tick(self.0 - rhs.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.beat())
    }
}

// JSON carries beats, not raw ticks.
impl Serialize for Tick {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.beat())
    }
}

impl<'de> Deserialize<'de> for Tick {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let beat = f64::deserialize(deserializer)?;
        Ok(Tick::from_beat(beat))
    }
}

/// Snaps a beat to the 1/192 grid.
pub fn quantize(beat: f64) -> f64 {
    Tick::from_beat(beat).beat()
}

pub fn quantize_value(value: f64) -> f64 {
    (value * VALUE_SCALE).round() / VALUE_SCALE
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingEvent {
    pub beat: Tick,
    pub value: f64,
}

impl TimingEvent {
    pub fn new(beat: Tick, value: f64) -> Self {
        Self {
            beat,
            value: quantize_value(value),
        }
    }
}

impl fmt::Display for TimingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:.3}", self.beat, self.value)
    }
}

/// The two timing streams a chart consumes, each ascending by beat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub bpms: Vec<TimingEvent>,
    pub stops: Vec<TimingEvent>,
}

impl Timeline {
    pub fn render_bpms(&self) -> String {
        render_events(&self.bpms)
    }

    pub fn render_stops(&self) -> String {
        render_events(&self.stops)
    }

    /// Renders both streams as `#BPMS` / `#STOPS` tags.
    pub fn to_sm_tags(&self) -> String {
        format!(
            "#BPMS:{};\n#STOPS:{};\n",
            self.render_bpms(),
            self.render_stops()
        )
    }
}

fn render_events(events: &[TimingEvent]) -> String {
    events
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tick_rounds_to_nearest_192nd() {
        assert_eq!(Tick::from_beat(1.0), Tick(192));
        assert_eq!(Tick::from_beat(0.5), Tick(96));
        // 1/3 beat = 64 ticks, even after float noise.
        assert_eq!(Tick::from_beat(1.0 / 3.0 + 1e-9), Tick(64));
        assert_eq!(Tick::from_beat(0.0026), Tick(0));
        assert_eq!(Tick::from_beat(0.0027), Tick(1));
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Tick(192).checked_add(Tick(96)), Some(Tick(288)));
        assert_eq!(Tick(192).checked_sub(Tick(384)), Some(Tick(-192)));
        assert_eq!(Tick(i64::MAX).checked_add(Tick(1)), None);
        assert_eq!(Tick(i64::MIN).checked_sub(Tick(1)), None);
        assert!(Tick::from_beat(MAX_BEAT).ticks() < i64::MAX / 2);
    }

    #[test]
    fn event_renders_beat_equals_value() {
        let e = TimingEvent::new(Tick::from_beat(4.0), 120.0);
        assert_eq!(e.to_string(), "4.000=120.000");

        let e = TimingEvent::new(Tick(1), 0.1 + 0.2);
        assert_eq!(e.to_string(), "0.005=0.300");
    }

    #[test]
    fn timeline_renders_sm_tags() {
        let t = Timeline {
            bpms: vec![
                TimingEvent::new(Tick::ZERO, 240.0),
                TimingEvent::new(Tick(192), 120.0),
            ],
            stops: vec![TimingEvent::new(Tick::ZERO, 0.25)],
        };
        assert_eq!(
            t.to_sm_tags(),
            "#BPMS:0.000=240.000,1.000=120.000;\n#STOPS:0.000=0.250;\n"
        );
    }

    #[test]
    fn empty_stops_render_empty() {
        let t = Timeline {
            bpms: vec![TimingEvent::new(Tick::ZERO, 150.0)],
            stops: vec![],
        };
        assert_eq!(t.render_stops(), "");
    }

    #[test]
    fn json_uses_beats() {
        let t = Timeline {
            bpms: vec![TimingEvent::new(Tick(96), 180.0)],
            stops: vec![],
        };
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"bpms":[{"beat":0.5,"value":180.0}],"stops":[]}"#);

        let back: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    proptest! {
        #[test]
        fn quantize_is_idempotent(beat in -10_000.0f64..10_000.0) {
            let q = quantize(beat);
            prop_assert_eq!(quantize(q), q);
        }

        #[test]
        fn quantize_lands_on_grid(beat in -10_000.0f64..10_000.0) {
            let scaled = quantize(beat) * TICKS_PER_BEAT as f64;
            prop_assert!((scaled - scaled.round()).abs() < 1e-6);
        }

        #[test]
        fn quantize_moves_at_most_half_a_tick(beat in -10_000.0f64..10_000.0) {
            let half_tick = 0.5 / TICKS_PER_BEAT as f64;
            prop_assert!((quantize(beat) - beat).abs() <= half_tick + 1e-9);
        }
    }
}
