use log::debug;
use sm_timing::{quantize_value, Tick, Timeline, TimingEvent};

use crate::directive::DirectiveKind;
use crate::formula::Bindings;
use crate::patterns::{Pattern, PatternEntry};
use crate::validate::ResolvedDirective;
use crate::CompileError;

/// Runs validated directives, in order, into a timeline.
pub fn build_timeline(
    directives: &[ResolvedDirective],
    initial_bpm: Option<f64>,
) -> Result<Timeline, CompileError> {
    let mut builder = TimelineBuilder::new(initial_bpm);
    for d in directives {
        builder.apply(d)?;
    }
    Ok(builder.finish())
}

#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    current_bpm: Option<f64>,
    timeline: Timeline,
}

impl TimelineBuilder {
    /// An initial tempo is placed on beat 0.
    pub fn new(initial_bpm: Option<f64>) -> Self {
        let mut timeline = Timeline::default();
        if let Some(bpm) = initial_bpm {
            timeline.bpms.push(TimingEvent::new(Tick::ZERO, bpm));
        }
        Self {
            current_bpm: initial_bpm,
            timeline,
        }
    }

    pub fn apply(&mut self, d: &ResolvedDirective) -> Result<(), CompileError> {
        debug!("entry {}: {}", d.entry, d.text);

        match &d.kind {
            DirectiveKind::BpmSet(bpm) => {
                if self.current_bpm.is_none() && d.start != Tick::ZERO {
                    return Err(CompileError::new(
                        "E3001",
                        format!("initial BPM must be on beat 0 (context={})", d.text),
                        d.entry,
                    )
                    .with_spec(d.text.clone()));
                }
                insert_bpm(&mut self.timeline.bpms, d.start, *bpm);
                self.current_bpm = Some(*bpm);
            }
            DirectiveKind::ConstantStop(len) => {
                let bpm = self.require_bpm(d)?;
                insert_stop(&mut self.timeline.stops, d.start, len * 60.0 / bpm);
            }
            DirectiveKind::Copy { source } => {
                let bpm = self.require_bpm(d)?;
                let end = require_end(d)?;
                self.copy(Tick::from_beat(*source), d.start, end, bpm);
            }
            DirectiveKind::PatternApply {
                length,
                mul,
                pattern,
            } => {
                let bpm = self.require_bpm(d)?;
                let end = require_end(d)?;
                let bindings = Bindings {
                    mul: *mul,
                    len: *length,
                    bpm,
                };
                self.apply_pattern(d, pattern, &bindings, end)?;
            }
        }
        Ok(())
    }

    /// Collapses runs of equal tempo left behind by copies.
    pub fn finish(mut self) -> Timeline {
        self.timeline.bpms.dedup_by(|next, prev| next.value == prev.value);
        self.timeline
    }

    fn require_bpm(&self, d: &ResolvedDirective) -> Result<f64, CompileError> {
        self.current_bpm.ok_or_else(|| {
            CompileError::new(
                "E3002",
                format!("need an initial BPM value (context={})", d.text),
                d.entry,
            )
            .with_spec(d.text.clone())
        })
    }

    fn copy(&mut self, source: Tick, start: Tick, end: Tick, bpm: f64) {
        let source_end = source + (end - start);
        let offset = start - source;
        let in_source = |e: &&TimingEvent| source <= e.beat && e.beat < source_end;

        let bpms: Vec<TimingEvent> = self.timeline.bpms.iter().filter(in_source).copied().collect();
        let stops: Vec<TimingEvent> = self.timeline.stops.iter().filter(in_source).copied().collect();
        debug!(
            "copying {} bpm changes and {} stops from {} by {} beats",
            bpms.len(),
            stops.len(),
            source,
            offset
        );

        for e in bpms {
            insert_bpm(&mut self.timeline.bpms, e.beat + offset, e.value);
        }
        for e in stops {
            insert_stop(&mut self.timeline.stops, e.beat + offset, e.value);
        }
        insert_bpm(&mut self.timeline.bpms, end, bpm);
    }

    fn apply_pattern(
        &mut self,
        d: &ResolvedDirective,
        pattern: &Pattern,
        bindings: &Bindings,
        end: Tick,
    ) -> Result<(), CompileError> {
        let bpms = evaluate_table(d, &pattern.bpms, bindings)?;
        let stops = evaluate_table(d, &pattern.stops, bindings)?;

        // Instance starts are computed from the index, not accumulated, so
        // float error never shifts the loop bound.
        let base = d.start.beat();
        let mut instances = 0u64;
        loop {
            let t = base + instances as f64 * bindings.len;
            if Tick::from_beat(t) >= end {
                break;
            }
            // Events at or past `end` are cut: the range belongs to this
            // gimmick alone, and whatever follows owns `end` onwards.
            for &(loc, value) in &bpms {
                let at = Tick::from_beat(t + loc * bindings.len);
                if at < end {
                    insert_bpm(&mut self.timeline.bpms, at, value);
                }
            }
            for &(loc, value) in &stops {
                let at = Tick::from_beat(t + loc * bindings.len);
                if at < end {
                    insert_stop(&mut self.timeline.stops, at, value);
                }
            }
            instances += 1;
        }
        debug!("{} x{} instances of {}", instances, bindings.mul, pattern.name);

        if !bpms.is_empty() {
            insert_bpm(&mut self.timeline.bpms, end, bindings.bpm);
        }
        Ok(())
    }
}

fn require_end(d: &ResolvedDirective) -> Result<Tick, CompileError> {
    d.end.ok_or_else(|| {
        CompileError::new(
            "E1007",
            format!("gimmick has no resolved end (context={})", d.text),
            d.entry,
        )
        .with_spec(d.text.clone())
    })
}

fn evaluate_table(
    d: &ResolvedDirective,
    table: &[PatternEntry],
    bindings: &Bindings,
) -> Result<Vec<(f64, f64)>, CompileError> {
    table
        .iter()
        .map(|row| {
            let value = row.formula.eval(bindings);
            if quantize_value(value).is_finite() {
                Ok((row.loc, value))
            } else {
                Err(CompileError::new(
                    "E1005",
                    format!(
                        "formula {:?} is not finite for mul={} len={} bpm={} (context={})",
                        row.formula.source(),
                        bindings.mul,
                        bindings.len,
                        bindings.bpm,
                        d.text
                    ),
                    d.entry,
                )
                .with_spec(d.text.clone()))
            }
        })
        .collect()
}

/// Replaces any tempo already on `beat`, then skips the insert if it would
/// repeat the tempo just before it.
fn insert_bpm(bpms: &mut Vec<TimingEvent>, beat: Tick, value: f64) {
    let event = TimingEvent::new(beat, value);
    let idx = match bpms.binary_search_by_key(&beat, |e| e.beat) {
        Ok(i) => {
            bpms.remove(i);
            i
        }
        Err(i) => i,
    };
    if idx > 0 && bpms[idx - 1].value == event.value {
        return;
    }
    bpms.insert(idx, event);
}

fn insert_stop(stops: &mut Vec<TimingEvent>, beat: Tick, value: f64) {
    let event = TimingEvent::new(beat, value);
    match stops.binary_search_by_key(&beat, |e| e.beat) {
        Ok(i) => stops[i] = event,
        Err(i) => stops.insert(i, event),
    }
}
