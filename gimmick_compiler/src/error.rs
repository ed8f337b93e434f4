use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    Format,
    Io,
    NotFound,
    MissingInitialBpm,
    MissingBpm,
    Overlap,
    UnboundedRange,
    UnsupportedVersion,
}

impl CompileErrorKind {
    pub(crate) fn from_code(code: &'static str) -> Self {
        match code {
            // E1001 position, E1002 value, E1003 document, E1004 formula syntax,
            // E1005 formula evaluation, E1006 pattern definition, E1007 empty range
            "E1001" | "E1002" | "E1003" | "E1004" | "E1005" | "E1006" | "E1007" => Self::Format,

            "E2001" => Self::Io,
            "E2101" => Self::NotFound,

            "E3001" => Self::MissingInitialBpm,
            "E3002" => Self::MissingBpm,

            "E4001" | "E4002" => Self::Overlap,
            "E4101" => Self::UnboundedRange,

            "E5001" => Self::UnsupportedVersion,

            _ => Self::Format,
        }
    }
}

/// A terminal compilation failure.
///
/// `entry` is the 1-based position of the offending gimmick in declaration
/// order; 0 means the problem is with the document as a whole.
#[derive(Debug, Error, Clone)]
#[error("{code}: {message} (entry {entry})")]
pub struct CompileError {
    pub code: &'static str,
    pub kind: CompileErrorKind,
    pub message: String,
    pub entry: usize,

    pub file: Option<String>,
    /// Raw `position: value` text of the offending gimmick.
    pub spec: Option<String>,
    /// The other gimmick involved in an overlap.
    pub other_spec: Option<String>,
}

impl CompileError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>, entry: usize) -> Self {
        Self {
            code,
            kind: CompileErrorKind::from_code(code),
            message: message.into(),
            entry,

            file: None,
            spec: None,
            other_spec: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    pub fn with_other_spec(mut self, spec: impl Into<String>) -> Self {
        self.other_spec = Some(spec.into());
        self
    }
}
