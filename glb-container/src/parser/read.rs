//! Header and chunk decoding

use crate::container::{Chunk, ChunkKind, Glb, GlbHeader};
use crate::error::{GlbDiagnostic, GlbError, GlbIssueKind};
use crate::{CHUNK_HEADER_LENGTH, GLB_MAGIC, GLB_VERSION, HEADER_LENGTH, MIN_DECLARED_LENGTH};

/// Check whether `data` starts with the GLB magic bytes
pub fn is_glb(data: &[u8]) -> bool {
    data.len() >= GLB_MAGIC.len() && &data[..GLB_MAGIC.len()] == GLB_MAGIC
}

/// Parse a GLB container
///
/// # Arguments
/// * `data` - Raw container bytes
///
/// # Returns
/// * `Ok(Glb)` - Header, chunks and any non-fatal diagnostics
/// * `Err(GlbError)` - Fatal failure with all diagnostics found before it
///
/// # Example
/// ```ignore
/// let glb = parse_glb(&bytes)?;
/// let json = glb.json();
/// ```
pub fn parse_glb(data: &[u8]) -> Result<Glb<'_>, GlbError> {
    let mut diagnostics = Vec::new();

    if data.len() < HEADER_LENGTH {
        return Err(fatal(
            diagnostics,
            GlbIssueKind::UnexpectedEndOfHeader,
            data.len(),
            format!(
                "Unexpected end of header: {} bytes available, {} required.",
                data.len(),
                HEADER_LENGTH
            ),
        ));
    }

    let magic = read_u32(data, 0);
    if &data[0..4] != GLB_MAGIC {
        return Err(fatal(
            diagnostics,
            GlbIssueKind::InvalidMagic,
            0,
            format!("Invalid GLB magic value (0x{magic:08X})."),
        ));
    }

    let version = read_u32(data, 4);
    if version != GLB_VERSION {
        return Err(fatal(
            diagnostics,
            GlbIssueKind::InvalidVersion,
            4,
            format!("Invalid GLB version value {version}."),
        ));
    }

    let length = read_u32(data, 8);
    let declared = length as usize;
    if declared > data.len() {
        return Err(fatal(
            diagnostics,
            GlbIssueKind::LengthMismatch,
            8,
            format!(
                "Declared length ({declared}) does not match GLB length ({}).",
                data.len()
            ),
        ));
    }
    if declared < data.len() {
        if length < MIN_DECLARED_LENGTH {
            return Err(fatal(
                diagnostics,
                GlbIssueKind::LengthTooSmall,
                8,
                format!("Declared GLB length ({declared}) is too small."),
            ));
        }
        diagnostics.push(GlbDiagnostic::new(
            GlbIssueKind::ExtraData,
            declared,
            format!(
                "Extra {} byte(s) found after the declared GLB length.",
                data.len() - declared
            ),
        ));
    }

    let header = GlbHeader { version, length };
    let chunks = read_chunks(&data[..declared], &mut diagnostics)?;

    if !chunks.iter().any(|chunk| chunk.kind == ChunkKind::Json) {
        return Err(fatal(
            diagnostics,
            GlbIssueKind::MissingJsonChunk,
            HEADER_LENGTH,
            "GLB container does not contain a JSON chunk.",
        ));
    }

    Ok(Glb {
        header,
        chunks,
        diagnostics,
    })
}

/// Walk the chunk table inside `data` (already cut to the declared length)
fn read_chunks<'a>(
    data: &'a [u8],
    diagnostics: &mut Vec<GlbDiagnostic>,
) -> Result<Vec<Chunk<'a>>, GlbError> {
    let mut chunks: Vec<Chunk<'a>> = Vec::new();
    let mut offset = HEADER_LENGTH;

    while offset < data.len() {
        if data.len() - offset < CHUNK_HEADER_LENGTH {
            diagnostics.push(GlbDiagnostic::new(
                GlbIssueKind::UnexpectedEndOfChunkHeader,
                offset,
                "Unexpected end of chunk header.",
            ));
            break;
        }

        let declared_length = read_u32(data, offset);
        let tag = read_u32(data, offset + 4);

        if declared_length % 4 != 0 {
            return Err(fatal(
                std::mem::take(diagnostics),
                GlbIssueKind::ChunkLengthUnaligned,
                offset,
                format!("Length of 0x{tag:08X} chunk is not aligned to 4-byte boundaries."),
            ));
        }

        let kind = ChunkKind::from_tag(tag);
        check_chunk_order(&chunks, kind, tag, offset, diagnostics);

        if declared_length == 0 {
            match kind {
                ChunkKind::Bin => diagnostics.push(GlbDiagnostic::new(
                    GlbIssueKind::EmptyBinChunk,
                    offset,
                    "Empty BIN chunk should be omitted.",
                )),
                ChunkKind::Json => diagnostics.push(GlbDiagnostic::new(
                    GlbIssueKind::EmptyChunk,
                    offset,
                    "Chunk (0x4E4F534A) cannot have zero length.",
                )),
                ChunkKind::Unknown(_) => {}
            }
        }

        let data_start = offset + CHUNK_HEADER_LENGTH;
        let data_end = data_start + declared_length as usize;

        if data_end > data.len() {
            diagnostics.push(GlbDiagnostic::new(
                GlbIssueKind::ChunkTooBig,
                offset,
                format!(
                    "Chunk (0x{tag:08X}) length ({declared_length}) is too big: only {} byte(s) remain.",
                    data.len() - data_start
                ),
            ));
            chunks.push(Chunk {
                kind,
                offset,
                declared_length,
                data: &data[data_start..],
            });
            break;
        }

        chunks.push(Chunk {
            kind,
            offset,
            declared_length,
            data: &data[data_start..data_end],
        });
        offset = data_end;
    }

    Ok(chunks)
}

/// Ordering rules: JSON first, BIN (if any) second, no duplicates
fn check_chunk_order(
    chunks: &[Chunk<'_>],
    kind: ChunkKind,
    tag: u32,
    offset: usize,
    diagnostics: &mut Vec<GlbDiagnostic>,
) {
    let duplicate = chunks.iter().any(|chunk| chunk.kind == kind);
    if let ChunkKind::Unknown(_) = kind {
        diagnostics.push(GlbDiagnostic::new(
            GlbIssueKind::UnknownChunkType,
            offset,
            format!("Unknown GLB chunk type (0x{tag:08X})."),
        ));
    } else if duplicate {
        diagnostics.push(GlbDiagnostic::new(
            GlbIssueKind::DuplicateChunk,
            offset,
            format!("Chunk of type 0x{tag:08X} has already been used."),
        ));
        return;
    }

    if chunks.is_empty() && kind != ChunkKind::Json {
        diagnostics.push(GlbDiagnostic::new(
            GlbIssueKind::UnexpectedFirstChunk,
            offset,
            format!("First chunk must be of JSON type. Found 0x{tag:08X} instead."),
        ));
    } else if kind == ChunkKind::Bin && chunks.len() != 1 {
        diagnostics.push(GlbDiagnostic::new(
            GlbIssueKind::UnexpectedBinChunk,
            offset,
            "BIN chunk must be the second chunk.",
        ));
    }
}

fn fatal(
    diagnostics: Vec<GlbDiagnostic>,
    kind: GlbIssueKind,
    offset: usize,
    message: impl Into<String>,
) -> GlbError {
    GlbError::new(diagnostics, GlbDiagnostic::new(kind, offset, message))
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
