use sm_timing::Tick;

use crate::directive::{Directive, DirectiveKind};
use crate::position::PositionEnd;
use crate::CompileError;

/// A directive whose range has been resolved and snapped to the tick grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDirective {
    pub entry: usize,
    pub text: String,
    pub start: Tick,
    /// `None` only for single-point directives (bpm changes and stops).
    pub end: Option<Tick>,
    pub kind: DirectiveKind,
}

impl ResolvedDirective {
    /// Last beat this directive occupies; a point occupies only its start.
    pub fn reach(&self) -> Tick {
        self.end.unwrap_or(self.start)
    }
}

/// Resolves open ranges and rejects sequences that overlap or start without
/// a tempo. Directives stay in declaration order.
pub fn validate(
    directives: &[Directive],
    initial_bpm: Option<f64>,
) -> Result<Vec<ResolvedDirective>, CompileError> {
    if initial_bpm.is_none() {
        check_initial_bpm(directives)?;
    }

    let mut resolved: Vec<ResolvedDirective> = Vec::with_capacity(directives.len());

    for (i, d) in directives.iter().enumerate() {
        let start = Tick::from_beat(d.position.start);
        let end = match (d.position.end, &d.kind) {
            (PositionEnd::At(end), _) => Some(Tick::from_beat(end)),
            (PositionEnd::Open, _) => {
                let next = directives.get(i + 1).ok_or_else(|| {
                    CompileError::new(
                        "E4101",
                        format!("can't end with an indefinite gimmick (context={})", d.text),
                        d.entry,
                    )
                    .with_spec(d.text.clone())
                })?;
                Some(Tick::from_beat(next.position.start))
            }
            (PositionEnd::Point, DirectiveKind::PatternApply { length, .. }) => {
                Some(Tick::from_beat(d.position.start + length))
            }
            (PositionEnd::Point, _) => None,
        };

        if let Some(end) = end {
            if end <= start {
                return Err(CompileError::new(
                    "E1007",
                    format!("range is empty on the 192nd grid (context={})", d.text),
                    d.entry,
                )
                .with_spec(d.text.clone()));
            }
        }

        if let DirectiveKind::Copy { source } = d.kind {
            let (PositionEnd::At(_), Some(end)) = (d.position.end, end) else {
                return Err(CompileError::new(
                    "E1002",
                    format!("copy needs an ending beat (context={})", d.text),
                    d.entry,
                )
                .with_spec(d.text.clone()));
            };
            let source = Tick::from_beat(source);
            let source_end = end
                .checked_sub(start)
                .and_then(|range| source.checked_add(range));
            if source_end.map_or(true, |source_end| source_end > start) {
                return Err(CompileError::new(
                    "E4002",
                    format!("source region cannot overlap destination (context={})", d.text),
                    d.entry,
                )
                .with_spec(d.text.clone()));
            }
        }

        if let Some(prev) = resolved.last() {
            if start < prev.reach() {
                return Err(CompileError::new(
                    "E4001",
                    format!(
                        "intersects with the previous gimmick (context={}, previous={})",
                        d.text, prev.text
                    ),
                    d.entry,
                )
                .with_spec(d.text.clone())
                .with_other_spec(prev.text.clone()));
            }
        }

        resolved.push(ResolvedDirective {
            entry: d.entry,
            text: d.text.clone(),
            start,
            end,
            kind: d.kind.clone(),
        });
    }

    Ok(resolved)
}

fn check_initial_bpm(directives: &[Directive]) -> Result<(), CompileError> {
    match directives.first() {
        Some(d)
            if matches!(d.kind, DirectiveKind::BpmSet(_))
                && Tick::from_beat(d.position.start) == Tick::ZERO =>
        {
            Ok(())
        }
        Some(d) => Err(CompileError::new(
            "E3001",
            format!("initial BPM must be a bpm change on beat 0 (context={})", d.text),
            d.entry,
        )
        .with_spec(d.text.clone())),
        None => Err(CompileError::new("E3001", "no initial BPM", 0)),
    }
}
