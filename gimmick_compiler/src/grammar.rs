use serde_yaml::Mapping;
use sm_timing::Timeline;

use crate::parser::read_document;
use crate::patterns::{PatternLibrary, PatternScope};
use crate::{compile_directives, CompileError};

/// Gimmick document grammars this compiler understands, keyed by the
/// document's `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarVersion {
    V0_2,
}

impl GrammarVersion {
    pub const CURRENT: GrammarVersion = GrammarVersion::V0_2;

    /// A missing version means the current grammar.
    pub fn from_tag(tag: Option<&str>) -> Result<Self, CompileError> {
        match tag.map(str::trim) {
            None | Some("0.2") | Some("0.2.0") => Ok(Self::V0_2),
            Some(other) => Err(CompileError::new(
                "E5001",
                format!(
                    "unsupported gimmick version {other} (supported: {})",
                    Self::CURRENT.tag()
                ),
                0,
            )),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::V0_2 => "0.2.0",
        }
    }

    pub(crate) fn compile(
        self,
        root: &Mapping,
        library: &PatternLibrary,
    ) -> Result<Timeline, CompileError> {
        match self {
            Self::V0_2 => compile_v0_2(root, library),
        }
    }
}

fn compile_v0_2(root: &Mapping, library: &PatternLibrary) -> Result<Timeline, CompileError> {
    let doc = read_document(root)?;
    let scope = PatternScope::new(&doc.definitions, library);
    compile_directives(&doc.gimmicks, Some(doc.bpm), &scope)
}
