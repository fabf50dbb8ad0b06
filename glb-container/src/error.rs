//! GLB diagnostics and the fatal parse error

use thiserror::Error;

/// Every condition the container parser can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlbIssueKind {
    /// Fewer than 12 bytes available for the header
    UnexpectedEndOfHeader,
    /// First four bytes are not "glTF"
    InvalidMagic,
    /// Version field is not 2
    InvalidVersion,
    /// Declared length smaller than actual data and too small to hold a chunk
    LengthTooSmall,
    /// Declared length larger than the available data
    LengthMismatch,
    /// Bytes present beyond the declared length
    ExtraData,
    /// Chunk length is not a multiple of 4
    ChunkLengthUnaligned,
    /// Fewer than 8 bytes left for a chunk header
    UnexpectedEndOfChunkHeader,
    /// Chunk data extends past the declared container length
    ChunkTooBig,
    /// Zero-length JSON chunk
    EmptyChunk,
    /// Zero-length BIN chunk
    EmptyBinChunk,
    /// Second chunk of an already-seen type
    DuplicateChunk,
    /// First chunk is not JSON
    UnexpectedFirstChunk,
    /// BIN chunk present at a position other than second
    UnexpectedBinChunk,
    /// Chunk type tag not recognized
    UnknownChunkType,
    /// Container holds no JSON chunk at all
    MissingJsonChunk,
}

impl GlbIssueKind {
    /// Stable issue code
    pub fn code(self) -> &'static str {
        match self {
            GlbIssueKind::UnexpectedEndOfHeader => "GLB_UNEXPECTED_END_OF_HEADER",
            GlbIssueKind::InvalidMagic => "GLB_INVALID_MAGIC",
            GlbIssueKind::InvalidVersion => "GLB_INVALID_VERSION",
            GlbIssueKind::LengthTooSmall => "GLB_LENGTH_TOO_SMALL",
            GlbIssueKind::LengthMismatch => "GLB_LENGTH_MISMATCH",
            GlbIssueKind::ExtraData => "GLB_EXTRA_DATA",
            GlbIssueKind::ChunkLengthUnaligned => "GLB_CHUNK_LENGTH_UNALIGNED",
            GlbIssueKind::UnexpectedEndOfChunkHeader => "GLB_UNEXPECTED_END_OF_CHUNK_HEADER",
            GlbIssueKind::ChunkTooBig => "GLB_CHUNK_TOO_BIG",
            GlbIssueKind::EmptyChunk => "GLB_EMPTY_CHUNK",
            GlbIssueKind::EmptyBinChunk => "GLB_EMPTY_BIN_CHUNK",
            GlbIssueKind::DuplicateChunk => "GLB_DUPLICATE_CHUNK",
            GlbIssueKind::UnexpectedFirstChunk => "GLB_UNEXPECTED_FIRST_CHUNK",
            GlbIssueKind::UnexpectedBinChunk => "GLB_UNEXPECTED_BIN_CHUNK",
            GlbIssueKind::UnknownChunkType => "GLB_UNKNOWN_CHUNK_TYPE",
            GlbIssueKind::MissingJsonChunk => "GLB_MISSING_JSON_CHUNK",
        }
    }

    /// Whether the condition is a warning rather than an error
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            GlbIssueKind::ExtraData | GlbIssueKind::EmptyBinChunk | GlbIssueKind::UnknownChunkType
        )
    }
}

/// One container finding, positioned by byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlbDiagnostic {
    pub kind: GlbIssueKind,
    pub message: String,
    pub offset: usize,
}

impl GlbDiagnostic {
    pub(crate) fn new(kind: GlbIssueKind, offset: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset,
        }
    }
}

/// Fatal container parse failure
///
/// Carries every diagnostic collected up to and including the fatal one, in
/// the order they were found. The fatal diagnostic is always last.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("GLB parse failed at byte {offset}: {message}")]
pub struct GlbError {
    offset: usize,
    message: String,
    diagnostics: Vec<GlbDiagnostic>,
}

impl GlbError {
    pub(crate) fn new(mut diagnostics: Vec<GlbDiagnostic>, fatal: GlbDiagnostic) -> Self {
        let offset = fatal.offset;
        let message = fatal.message.clone();
        diagnostics.push(fatal);
        Self {
            offset,
            message,
            diagnostics,
        }
    }

    /// All diagnostics in discovery order, fatal one last
    pub fn diagnostics(&self) -> &[GlbDiagnostic] {
        &self.diagnostics
    }

    /// The diagnostic that aborted the parse
    pub fn fatal(&self) -> Option<&GlbDiagnostic> {
        self.diagnostics.last()
    }

    pub fn into_diagnostics(self) -> Vec<GlbDiagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GlbError::new(
            Vec::new(),
            GlbDiagnostic::new(GlbIssueKind::InvalidMagic, 0, "Invalid GLB magic value (0x00000000)."),
        );
        assert_eq!(
            err.to_string(),
            "GLB parse failed at byte 0: Invalid GLB magic value (0x00000000)."
        );
    }

    #[test]
    fn test_fatal_is_last() {
        let warning = GlbDiagnostic::new(GlbIssueKind::ExtraData, 40, "extra");
        let fatal = GlbDiagnostic::new(GlbIssueKind::ChunkLengthUnaligned, 12, "unaligned");
        let err = GlbError::new(vec![warning.clone()], fatal.clone());
        assert_eq!(err.diagnostics(), &[warning, fatal.clone()][..]);
        assert_eq!(err.fatal(), Some(&fatal));
    }

    #[test]
    fn test_warning_classification() {
        assert!(GlbIssueKind::ExtraData.is_warning());
        assert!(GlbIssueKind::UnknownChunkType.is_warning());
        assert!(GlbIssueKind::EmptyBinChunk.is_warning());
        assert!(!GlbIssueKind::EmptyChunk.is_warning());
        assert!(!GlbIssueKind::DuplicateChunk.is_warning());
        assert_eq!(GlbIssueKind::InvalidVersion.code(), "GLB_INVALID_VERSION");
    }
}
