use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use crate::formula::Formula;
use crate::number::parse_decimal;
use crate::parser::scalar_text;
use crate::CompileError;

const BUILTIN_PATTERNS: &str = r#"
stutter:
    bpms:
        0: bpm * mul
    stops:
        0: 60 / (bpm * mul) * ((mul - 1) * len)

midstutter:
    bpms:
        0: bpm * mul
    stops:
        0.5: 60 / (bpm * mul) * ((mul - 1) * len)

halfbrake:
    bpms:
        0: bpm * mul
        0.5: bpm / ((mul - .5) * (2 / mul))

quarterbrake:
    bpms:
        0: bpm * mul
        0.75: bpm / ((mul - .75) * (4 / mul))

halfboost:
    bpms:
        0: bpm / ((mul - .5) * (2 / mul))
        0.5: bpm * mul

quarterboost:
    bpms:
        0: bpm / ((mul - .75) * (4 / mul))
        0.25: bpm * mul
"#;

/// One `loc: formula` row of a pattern table.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternEntry {
    /// Fraction of one instance length, in `[0, 1)`.
    pub loc: f64,
    pub formula: Formula,
}

/// A named tempo effect, repeated once per instance length across a gimmick.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub name: String,
    pub bpms: Vec<PatternEntry>,
    pub stops: Vec<PatternEntry>,
}

/// Named patterns in declaration order. Built once, then shared read-only
/// between compilations.
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    patterns: Vec<Arc<Pattern>>,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six patterns every document can use without defining them.
    pub fn builtin() -> Self {
        Self::from_yaml_str(BUILTIN_PATTERNS).expect("built-in patterns are well-formed")
    }

    pub fn from_yaml_str(src: &str) -> Result<Self, CompileError> {
        let value: Value = serde_yaml::from_str(src).map_err(|e| {
            CompileError::new("E1006", format!("invalid pattern yaml: {e}"), 0)
        })?;
        match value {
            Value::Null => Ok(Self::new()),
            Value::Mapping(map) => Self::from_mapping(&map),
            _ => Err(CompileError::new(
                "E1006",
                "pattern definitions must be a mapping of name to definition",
                0,
            )),
        }
    }

    pub fn from_mapping(map: &Mapping) -> Result<Self, CompileError> {
        let mut library = Self::new();
        for (name, def) in map {
            let name = scalar_text(name).ok_or_else(|| {
                CompileError::new("E1006", "pattern names must be scalars", 0)
            })?;
            library.insert(parse_pattern(&name, def)?);
        }
        Ok(library)
    }

    /// Adds a pattern. A pattern of the same name is replaced where it
    /// stands; a new name goes to the end.
    pub fn insert(&mut self, pattern: Pattern) {
        let pattern = Arc::new(pattern);
        match self.patterns.iter_mut().find(|p| p.name == pattern.name) {
            Some(slot) => *slot = pattern,
            None => self.patterns.push(pattern),
        }
    }

    /// Merges `other` in; its patterns win on name clashes.
    pub fn extend(&mut self, other: PatternLibrary) {
        for pattern in other.patterns {
            match self.patterns.iter_mut().find(|p| p.name == pattern.name) {
                Some(slot) => *slot = pattern,
                None => self.patterns.push(pattern),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Pattern>> {
        self.patterns.iter().find(|p| p.name == name)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<Pattern>, CompileError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// A document's own definitions layered over a shared library.
#[derive(Debug, Clone, Copy)]
pub struct PatternScope<'a> {
    local: &'a PatternLibrary,
    shared: &'a PatternLibrary,
}

impl<'a> PatternScope<'a> {
    pub fn new(local: &'a PatternLibrary, shared: &'a PatternLibrary) -> Self {
        Self { local, shared }
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<Pattern>, CompileError> {
        self.local
            .get(name)
            .or_else(|| self.shared.get(name))
            .cloned()
            .ok_or_else(|| not_found(name))
    }
}

fn not_found(name: &str) -> CompileError {
    CompileError::new("E2101", format!("nonexistent pattern definition: {name}"), 0)
}

fn parse_pattern(name: &str, def: &Value) -> Result<Pattern, CompileError> {
    let fail = |msg: String| CompileError::new("E1006", format!("definitions.{name}: {msg}"), 0);

    let mut pattern = Pattern {
        name: name.to_string(),
        bpms: Vec::new(),
        stops: Vec::new(),
    };

    let table = match def {
        Value::Mapping(m) => m,
        Value::Null => return Ok(pattern),
        _ => return Err(fail("definition must be a mapping".to_string())),
    };

    for (key, rows) in table {
        let target = match key.as_str() {
            Some("bpms") => &mut pattern.bpms,
            Some("stops") => &mut pattern.stops,
            _ => {
                return Err(fail(format!(
                    "unknown table {} (expected bpms or stops)",
                    scalar_text(key).unwrap_or_default()
                )))
            }
        };
        *target = parse_table(name, rows)?;
    }

    Ok(pattern)
}

fn parse_table(name: &str, rows: &Value) -> Result<Vec<PatternEntry>, CompileError> {
    let fail = |code, msg: String| CompileError::new(code, format!("definitions.{name}: {msg}"), 0);

    let rows = match rows {
        Value::Mapping(m) => m,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(fail(
                "E1006",
                "timing table must be a mapping of loc to formula".to_string(),
            ))
        }
    };

    let mut entries = Vec::with_capacity(rows.len());
    for (loc, formula) in rows {
        let loc_text = scalar_text(loc).unwrap_or_default();
        let loc = parse_decimal(&loc_text)
            .filter(|l| *l < 1.0)
            .ok_or_else(|| fail("E1006", format!("loc {loc_text:?} must be a number in [0, 1)")))?;
        let source = scalar_text(formula)
            .ok_or_else(|| fail("E1006", format!("formula at {loc_text} must be a scalar")))?;
        let formula =
            Formula::parse(&source).map_err(|e| fail("E1004", format!("formula {source:?}: {e}")))?;
        entries.push(PatternEntry { loc, formula });
    }
    entries.sort_by(|a, b| a.loc.total_cmp(&b.loc));
    Ok(entries)
}
