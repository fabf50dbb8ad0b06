//! glb-container: binary glTF (GLB) container parser
//!
//! Decodes the chunked GLB envelope into a header plus an ordered list of
//! typed chunks. Parsing is a pure function of the input bytes: no I/O, no
//! allocation beyond the chunk table and the diagnostics list.
//!
//! Malformed input is classified precisely:
//!
//! - **Fatal** conditions (truncated header, wrong magic or version, length
//!   mismatch, unaligned chunk length, missing JSON chunk) abort the parse
//!   and return a [`GlbError`] carrying every diagnostic collected so far.
//! - **Non-fatal** conditions (trailing data, unknown chunk types, empty BIN
//!   chunk, out-of-order or duplicate chunks) are collected into
//!   [`Glb::diagnostics`] alongside a successfully parsed container.
//!
//! # Usage
//!
//! ```ignore
//! use glb_container::parse_glb;
//!
//! let bytes = std::fs::read("model.glb")?;
//! let glb = parse_glb(&bytes)?;
//! let json = glb.json().unwrap_or_default();
//! for diagnostic in &glb.diagnostics {
//!     println!("{} at {}: {}", diagnostic.kind.code(), diagnostic.offset, diagnostic.message);
//! }
//! ```
//!
//! # Format Reference
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Header (12 bytes)                        │
//! │ ├── magic:   "glTF"                      │
//! │ ├── version: u32 (must be 2)             │
//! │ └── length:  u32 (total declared bytes)  │
//! ├──────────────────────────────────────────┤
//! │ Chunk 0: length u32 | type "JSON" | data │
//! ├──────────────────────────────────────────┤
//! │ Chunk 1: length u32 | type "BIN\0" | data│
//! └──────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Chunk lengths are multiples of 4.

mod container;
mod error;
mod parser;

pub use container::{Chunk, ChunkKind, Glb, GlbHeader};
pub use error::{GlbDiagnostic, GlbError, GlbIssueKind};
pub use parser::{is_glb, parse_glb};

// =============================================================================
// Constants
// =============================================================================

/// GLB magic bytes
pub const GLB_MAGIC: &[u8; 4] = b"glTF";

/// The only container version this parser accepts
pub const GLB_VERSION: u32 = 2;

/// Size of the container header in bytes
pub const HEADER_LENGTH: usize = 12;

/// Size of a chunk header (length + type) in bytes
pub const CHUNK_HEADER_LENGTH: usize = 8;

/// Declared lengths below this value cannot hold a header and a chunk header
pub const MIN_DECLARED_LENGTH: u32 = 16;

/// Chunk type tag for JSON content ("JSON" read as little-endian u32)
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;

/// Chunk type tag for binary payload ("BIN\0" read as little-endian u32)
pub const CHUNK_TYPE_BIN: u32 = 0x004E_4942;
