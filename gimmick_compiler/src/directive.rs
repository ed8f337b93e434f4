use std::sync::Arc;

use sm_timing::{quantize_value, MAX_BEAT, TICKS_PER_BEAT};

use crate::number::{parse_decimal, parse_fraction, parse_ratio};
use crate::parser::GimmickEntry;
use crate::patterns::{Pattern, PatternScope};
use crate::position::{parse_position, Position, PositionEnd};
use crate::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    /// `bpm X`
    BpmSet(f64),
    /// `stop X`, stored in beats (X whole notes).
    ConstantStop(f64),
    /// `copy X`
    Copy { source: f64 },
    /// `L Mx name`; `length` is one instance in beats.
    PatternApply {
        length: f64,
        mul: f64,
        pattern: Arc<Pattern>,
    },
}

/// A parsed gimmick line, still in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub entry: usize,
    pub text: String,
    pub position: Position,
    pub kind: DirectiveKind,
}

pub fn parse_directive(
    line: &GimmickEntry,
    patterns: &PatternScope<'_>,
) -> Result<Directive, CompileError> {
    let text = line.text();
    let position =
        parse_position(&line.position, line.entry).map_err(|e| e.with_spec(text.clone()))?;
    let kind = parse_value(&line.value, &position, patterns)
        .map_err(|e| retag(e, line.entry, &text))?;

    Ok(Directive {
        entry: line.entry,
        text,
        position,
        kind,
    })
}

fn retag(mut err: CompileError, entry: usize, text: &str) -> CompileError {
    err.entry = entry;
    err.message = format!("{} (context={text})", err.message);
    err.with_spec(text)
}

fn parse_value(
    value: &str,
    position: &Position,
    patterns: &PatternScope<'_>,
) -> Result<DirectiveKind, CompileError> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let fail = |msg: &str| CompileError::new("E1002", msg, 0);

    match parts.as_slice() {
        ["bpm", rest @ ..] => {
            let [bpm] = rest else {
                return Err(fail("expecting exactly 2 components"));
            };
            let bpm = parse_decimal(bpm)
                .filter(|b| *b > 0.0 && quantize_value(*b).is_finite())
                .ok_or_else(|| fail("invalid BPM value"))?;
            if !position.is_point() {
                return Err(fail("bpm change position should be one number"));
            }
            Ok(DirectiveKind::BpmSet(bpm))
        }
        ["stop", rest @ ..] => {
            let [len] = rest else {
                return Err(fail("expecting exactly 2 components"));
            };
            let len = parse_fraction(len).ok_or_else(|| fail("stop length should be a fraction"))?;
            if !(len > 0.0) {
                return Err(fail("stop length should be positive"));
            }
            if len * 4.0 > MAX_BEAT {
                return Err(fail("stop length is out of range"));
            }
            if !position.is_point() {
                return Err(fail("stop position should be one number"));
            }
            Ok(DirectiveKind::ConstantStop(len * 4.0))
        }
        ["copy", rest @ ..] => {
            let [source] = rest else {
                return Err(fail("expecting exactly 2 components"));
            };
            let source = parse_decimal(source)
                .filter(|s| *s <= MAX_BEAT)
                .ok_or_else(|| fail("invalid copy source beat"))?;
            if !matches!(position.end, PositionEnd::At(_)) {
                return Err(fail("copy needs an ending beat"));
            }
            Ok(DirectiveKind::Copy { source })
        }
        [len, mul, name] => {
            if len.contains('.') {
                return Err(fail("len cannot be a decimal"));
            }
            let length = parse_ratio(len).ok_or_else(|| fail("len should be a fraction"))?;
            if !(length > 0.0) {
                return Err(fail("len should be positive"));
            }
            let length = length * 4.0;
            if length * (TICKS_PER_BEAT as f64) < 1.0 {
                return Err(fail("len is finer than the 192nd grid"));
            }
            if length > MAX_BEAT {
                return Err(fail("len is out of range"));
            }
            let mul = mul
                .strip_suffix(&['x', 'X'][..])
                .ok_or_else(|| fail("mul should end with an x"))?;
            let mul = parse_decimal(mul).ok_or_else(|| fail("mul should be a decimal number"))?;
            if !(mul > 0.0) {
                return Err(fail("mul should be positive"));
            }
            let pattern = patterns.lookup(name)?;
            Ok(DirectiveKind::PatternApply {
                length,
                mul,
                pattern,
            })
        }
        _ => Err(fail("expecting 'bpm X', 'stop X', 'copy X' or 'LEN MULx PATTERN'")),
    }
}
