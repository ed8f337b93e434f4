use std::{fs, path::Path};

use log::info;

mod error;
mod grammar;
mod number;
mod parser;

pub mod directive;
pub mod formula;
pub mod patterns;
pub mod position;
pub mod timeline;
pub mod validate;

pub use directive::{parse_directive, Directive, DirectiveKind};
pub use error::{CompileError, CompileErrorKind};
pub use formula::{Bindings, Formula, FormulaError};
pub use grammar::GrammarVersion;
pub use parser::GimmickEntry;
pub use patterns::{Pattern, PatternEntry, PatternLibrary, PatternScope};
pub use position::{parse_position, Position, PositionEnd};
pub use sm_timing::{quantize, Tick, Timeline, TimingEvent};
pub use timeline::{build_timeline, TimelineBuilder};
pub use validate::{validate, ResolvedDirective};

pub fn compile_file(path: impl AsRef<Path>, library: &PatternLibrary) -> Result<Timeline, CompileError> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|e| {
        CompileError::new("E2001", format!("failed to read gimmick file: {e}"), 0)
            .with_file(path.display().to_string())
    })?;
    compile_str(&src, library).map_err(|e| e.with_file(path.display().to_string()))
}

/// Compiles a gimmick document into BPM changes and stops.
///
/// `library` holds the patterns available to every document; the document's
/// own `definitions` take precedence over it.
pub fn compile_str(src: &str, library: &PatternLibrary) -> Result<Timeline, CompileError> {
    let root = parser::load_document(src)?;
    let version = GrammarVersion::from_tag(parser::document_version(&root).as_deref())?;
    version.compile(&root, library)
}

/// Parses, validates and builds already-extracted gimmick lines.
pub fn compile_directives(
    lines: &[GimmickEntry],
    initial_bpm: Option<f64>,
    patterns: &PatternScope<'_>,
) -> Result<Timeline, CompileError> {
    let directives = lines
        .iter()
        .map(|line| parse_directive(line, patterns))
        .collect::<Result<Vec<_>, _>>()?;
    let resolved = validate(&directives, initial_bpm)?;
    let timeline = build_timeline(&resolved, initial_bpm)?;

    info!(
        "compiled {} gimmicks into {} bpm changes and {} stops",
        lines.len(),
        timeline.bpms.len(),
        timeline.stops.len()
    );
    Ok(timeline)
}
