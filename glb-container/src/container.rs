//! Parsed GLB container types

use crate::error::GlbDiagnostic;
use crate::{CHUNK_TYPE_BIN, CHUNK_TYPE_JSON};

/// The 12-byte container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    /// Container version (always 2 after a successful parse)
    pub version: u32,
    /// Total length declared by the header
    pub length: u32,
}

/// Chunk type, decoded from the 4-byte tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Json,
    Bin,
    /// Unrecognized tag, kept verbatim
    Unknown(u32),
}

impl ChunkKind {
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            CHUNK_TYPE_JSON => ChunkKind::Json,
            CHUNK_TYPE_BIN => ChunkKind::Bin,
            other => ChunkKind::Unknown(other),
        }
    }

    pub fn tag(self) -> u32 {
        match self {
            ChunkKind::Json => CHUNK_TYPE_JSON,
            ChunkKind::Bin => CHUNK_TYPE_BIN,
            ChunkKind::Unknown(tag) => tag,
        }
    }
}

/// One chunk of the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub kind: ChunkKind,
    /// Byte offset of the chunk header
    pub offset: usize,
    /// Length declared in the chunk header
    pub declared_length: u32,
    /// Chunk payload; shorter than `declared_length` if the chunk was cut off
    pub data: &'a [u8],
}

/// A successfully parsed container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glb<'a> {
    pub header: GlbHeader,
    /// Chunks in file order, including unknown and duplicate ones
    pub chunks: Vec<Chunk<'a>>,
    /// Non-fatal findings in discovery order
    pub diagnostics: Vec<GlbDiagnostic>,
}

impl<'a> Glb<'a> {
    /// Payload of the first JSON chunk
    pub fn json(&self) -> Option<&'a [u8]> {
        self.first_of(ChunkKind::Json).map(|chunk| chunk.data)
    }

    /// Payload of the first BIN chunk
    pub fn bin(&self) -> Option<&'a [u8]> {
        self.first_of(ChunkKind::Bin).map(|chunk| chunk.data)
    }

    /// The first BIN chunk, with its declared length and offset
    pub fn bin_chunk(&self) -> Option<&Chunk<'a>> {
        self.first_of(ChunkKind::Bin)
    }

    fn first_of(&self, kind: ChunkKind) -> Option<&Chunk<'a>> {
        self.chunks.iter().find(|chunk| chunk.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_kind_tags() {
        assert_eq!(ChunkKind::from_tag(u32::from_le_bytes(*b"JSON")), ChunkKind::Json);
        assert_eq!(ChunkKind::from_tag(u32::from_le_bytes(*b"BIN\0")), ChunkKind::Bin);
        assert_eq!(ChunkKind::from_tag(7), ChunkKind::Unknown(7));
        assert_eq!(ChunkKind::Unknown(7).tag(), 7);
        assert_eq!(ChunkKind::Json.tag(), CHUNK_TYPE_JSON);
    }
}
