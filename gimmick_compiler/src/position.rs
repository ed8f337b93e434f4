use sm_timing::MAX_BEAT;

use crate::number::parse_decimal;
use crate::CompileError;

/// How a gimmick position ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionEnd {
    /// `"N"`: a single point, or one instance length for patterns.
    Point,
    /// `"N-"`: runs until the next declared gimmick.
    Open,
    /// `"N-M"`.
    At(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub start: f64,
    pub end: PositionEnd,
}

impl Position {
    pub fn end(&self) -> Option<f64> {
        match self.end {
            PositionEnd::At(end) => Some(end),
            PositionEnd::Point | PositionEnd::Open => None,
        }
    }

    pub fn is_point(&self) -> bool {
        self.end == PositionEnd::Point
    }
}

/// Parses the key of a gimmick line: `32`, `48-48.5`, or `42-`.
pub fn parse_position(spec: &str, entry: usize) -> Result<Position, CompileError> {
    let spec = spec.trim();
    let fail = |what: &str| {
        CompileError::new("E1001", format!("{what} (context={spec})"), entry).with_spec(spec)
    };

    let (start, end) = match spec.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (spec, None),
    };

    let start = parse_decimal(start.trim()).ok_or_else(|| fail("invalid starting beat"))?;
    if start > MAX_BEAT {
        return Err(fail("starting beat is out of range"));
    }

    let end = match end.map(str::trim) {
        None => PositionEnd::Point,
        Some("") => PositionEnd::Open,
        Some(end) => {
            let end = parse_decimal(end).ok_or_else(|| fail("invalid ending beat"))?;
            if !(end > start) {
                return Err(fail("ending beat must be after starting beat"));
            }
            if end > MAX_BEAT {
                return Err(fail("ending beat is out of range"));
            }
            PositionEnd::At(end)
        }
    };

    Ok(Position { start, end })
}
