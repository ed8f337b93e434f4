use serde_yaml::{Mapping, Value};
use sm_timing::quantize_value;

use crate::number::parse_decimal;
use crate::patterns::PatternLibrary;
use crate::CompileError;

/// One `position: value` line of the `gimmicks` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GimmickEntry {
    /// 1-based declaration index.
    pub entry: usize,
    pub position: String,
    pub value: String,
}

impl GimmickEntry {
    pub fn new(entry: usize, position: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entry,
            position: position.into(),
            value: value.into(),
        }
    }

    /// The line as written, for error reports.
    pub fn text(&self) -> String {
        format!("{}: {}", self.position, self.value)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub(crate) bpm: f64,
    pub(crate) definitions: PatternLibrary,
    pub(crate) gimmicks: Vec<GimmickEntry>,
}

/// Parses the YAML text down to its top-level mapping.
pub(crate) fn load_document(src: &str) -> Result<Mapping, CompileError> {
    let value: Value = serde_yaml::from_str(src)
        .map_err(|e| CompileError::new("E1003", format!("invalid document yaml: {e}"), 0))?;
    match value {
        Value::Mapping(root) => Ok(root),
        _ => Err(CompileError::new(
            "E1003",
            "document must be a mapping with bpm and gimmicks keys",
            0,
        )),
    }
}

pub(crate) fn document_version(root: &Mapping) -> Option<String> {
    root.get("version").and_then(scalar_text)
}

pub(crate) fn read_document(root: &Mapping) -> Result<Document, CompileError> {
    let bpm = match root.get("bpm") {
        None | Some(Value::Null) => {
            return Err(CompileError::new("E1003", "missing bpm", 0));
        }
        Some(v) => scalar_text(v)
            .as_deref()
            .and_then(parse_decimal)
            .filter(|bpm| *bpm > 0.0 && quantize_value(*bpm).is_finite())
            .ok_or_else(|| CompileError::new("E1003", "bpm must be a number > 0", 0))?,
    };

    let definitions = match root.get("definitions") {
        None | Some(Value::Null) => PatternLibrary::new(),
        Some(Value::Mapping(defs)) => PatternLibrary::from_mapping(defs)?,
        Some(_) => {
            return Err(CompileError::new(
                "E1003",
                "definitions must be a mapping of name to definition",
                0,
            ));
        }
    };

    let gimmicks = match root.get("gimmicks") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Mapping(lines)) => read_gimmicks(lines)?,
        Some(_) => {
            return Err(CompileError::new(
                "E1003",
                "gimmicks must be a mapping of position to value",
                0,
            ));
        }
    };

    Ok(Document {
        bpm,
        definitions,
        gimmicks,
    })
}

fn read_gimmicks(lines: &Mapping) -> Result<Vec<GimmickEntry>, CompileError> {
    lines
        .iter()
        .enumerate()
        .map(|(i, (pos, val))| -> Result<GimmickEntry, CompileError> {
            let entry = i + 1;
            let position = scalar_text(pos).ok_or_else(|| {
                CompileError::new("E1003", "gimmick position must be a number or string", entry)
            })?;
            let value = scalar_text(val).ok_or_else(|| {
                CompileError::new("E1003", "gimmick value must be a string", entry)
                    .with_spec(position.clone())
            })?;
            Ok(GimmickEntry::new(entry, position, value))
        })
        .collect()
}

/// Stringifies a YAML scalar. Keys like `32` or `0.5` arrive as numbers.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
