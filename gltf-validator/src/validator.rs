//! Validation orchestrator
//!
//! Runs the stages in dependency order over one input:
//! container, JSON, document, resources, usage graph, entities, accessor
//! data, extensions, unused objects. Fatal findings stop the run early but
//! still produce a report.

use crate::data;
use crate::document::Document;
use crate::entities::{self, Context};
use crate::error::ValidatorError;
use crate::extensions::{self, ExtensionRegistry, MESH_QUANTIZATION, read_extensions};
use crate::fetch;
use crate::graph::UsageGraph;
use crate::issue::{IssueCode, IssueSink};
use crate::options::{InputFormat, ValidationOptions};
use crate::reader::ReadContext;
use crate::report::{AssetInfo, Report};
use crate::resource::FileLoader;
use glb_container::{ChunkKind, Glb, GlbDiagnostic, GlbIssueKind, is_glb, parse_glb};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decide how to parse the input: explicit option, file extension, magic
pub fn detect_format(bytes: &[u8], options: &ValidationOptions) -> InputFormat {
    if let Some(format) = options.format {
        return format;
    }
    if let Some(uri) = &options.uri {
        let lower = uri.to_ascii_lowercase();
        if lower.ends_with(".glb") {
            return InputFormat::Glb;
        }
        if lower.ends_with(".gltf") {
            return InputFormat::Gltf;
        }
    }
    if is_glb(bytes) { InputFormat::Glb } else { InputFormat::Gltf }
}

/// Validate an in-memory asset
///
/// Suspends only while the configured [`ResourceLoader`](crate::ResourceLoader)
/// fetches external buffers and images.
pub async fn validate_bytes(bytes: &[u8], options: &ValidationOptions) -> Report {
    let format = detect_format(bytes, options);
    tracing::debug!("Validating {} bytes as {:?}", bytes.len(), format);

    let mut sink = IssueSink::new(&options.severity_overrides);
    let info = run(bytes, format, options, &mut sink).await;
    let issues = sink.into_vec();
    tracing::debug!("Validation finished with {} issues", issues.len());
    Report::new(format, issues, info, options)
}

/// [`validate_bytes`] driven to completion on the current thread
pub fn validate_bytes_blocking(bytes: &[u8], options: &ValidationOptions) -> Report {
    pollster::block_on(validate_bytes(bytes, options))
}

/// Validate a file on disk
///
/// Relative URIs resolve against the file's directory unless `options`
/// already carries a loader.
pub async fn validate_file(path: impl AsRef<Path>, mut options: ValidationOptions) -> Result<Report, ValidatorError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ValidatorError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if options.loader.is_none() {
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        options.loader = Some(Arc::new(FileLoader::new(base)));
    }
    if options.uri.is_none() {
        options.uri = Some(path.display().to_string());
    }
    Ok(validate_bytes(&bytes, &options).await)
}

async fn run(
    bytes: &[u8],
    format: InputFormat,
    options: &ValidationOptions,
    sink: &mut IssueSink<'_>,
) -> Option<AssetInfo> {
    let container = match format {
        InputFormat::Glb => match parse_glb(bytes) {
            Ok(glb) => {
                report_container(&glb.diagnostics, sink);
                tracing::debug!("GLB container with {} chunks", glb.chunks.len());
                Some(glb)
            }
            Err(err) => {
                tracing::debug!("GLB parse failed: {}", err);
                report_container(err.diagnostics(), sink);
                return None;
            }
        },
        InputFormat::Gltf => None,
    };

    let (json, json_offset) = match &container {
        Some(glb) => json_chunk(glb)?,
        None => (bytes, 0),
    };
    let root = parse_json(json, json_offset, sink)?;

    let registry = ExtensionRegistry::shared();
    let mut cx = ReadContext::new(sink.fork());
    let mut doc = Document::read(&root, &mut cx);
    read_extensions(&mut doc, &mut cx, registry);
    sink.append(cx.issues);
    tracing::debug!(
        "Read document: {} nodes, {} meshes, {} accessors, {} extension objects",
        doc.nodes.len(),
        doc.meshes.len(),
        doc.accessors.len(),
        doc.extensions.len()
    );

    let asset = doc.asset.as_ref()?;
    if !asset.is_supported() {
        asset.validate(sink);
        return None;
    }

    let resources = fetch::resolve(&doc, container.as_ref(), options.loader.as_deref(), sink).await;
    let graph = UsageGraph::build(&doc);
    graph.check_structure(&doc, sink);

    let cx = Context {
        doc: &doc,
        graph: &graph,
        resources: &resources,
        quantized: doc.is_extension_used(MESH_QUANTIZATION),
    };
    entities::validate_all(&cx, sink);
    if options.validate_accessor_data {
        data::validate(&cx, sink);
    }
    extensions::validate_extensions(&cx, registry, sink);
    graph.report_unused(&doc, sink);

    Some(AssetInfo::collect(&doc, &resources))
}

fn report_container(diagnostics: &[GlbDiagnostic], sink: &mut IssueSink<'_>) {
    for diagnostic in diagnostics {
        sink.add_at_offset(glb_code(diagnostic.kind), diagnostic.offset, diagnostic.message.clone());
    }
}

fn glb_code(kind: GlbIssueKind) -> IssueCode {
    match kind {
        GlbIssueKind::UnexpectedEndOfHeader => IssueCode::GlbUnexpectedEndOfHeader,
        GlbIssueKind::InvalidMagic => IssueCode::GlbInvalidMagic,
        GlbIssueKind::InvalidVersion => IssueCode::GlbInvalidVersion,
        GlbIssueKind::LengthTooSmall => IssueCode::GlbLengthTooSmall,
        GlbIssueKind::LengthMismatch => IssueCode::GlbLengthMismatch,
        GlbIssueKind::ExtraData => IssueCode::GlbExtraData,
        GlbIssueKind::ChunkLengthUnaligned => IssueCode::GlbChunkLengthUnaligned,
        GlbIssueKind::UnexpectedEndOfChunkHeader => IssueCode::GlbUnexpectedEndOfChunkHeader,
        GlbIssueKind::ChunkTooBig => IssueCode::GlbChunkTooBig,
        GlbIssueKind::EmptyChunk => IssueCode::GlbEmptyChunk,
        GlbIssueKind::EmptyBinChunk => IssueCode::GlbEmptyBinChunk,
        GlbIssueKind::DuplicateChunk => IssueCode::GlbDuplicateChunk,
        GlbIssueKind::UnexpectedFirstChunk => IssueCode::GlbUnexpectedFirstChunk,
        GlbIssueKind::UnexpectedBinChunk => IssueCode::GlbUnexpectedBinChunk,
        GlbIssueKind::UnknownChunkType => IssueCode::GlbUnknownChunkType,
        GlbIssueKind::MissingJsonChunk => IssueCode::GlbMissingJsonChunk,
    }
}

/// JSON payload and the input offset of its first byte
fn json_chunk<'a>(glb: &Glb<'a>) -> Option<(&'a [u8], usize)> {
    let chunk = glb.chunks.iter().find(|chunk| chunk.kind == ChunkKind::Json)?;
    Some((chunk.data, chunk.offset + 8))
}

/// Parse the JSON text, reporting a BOM, syntax errors and a non-object root
fn parse_json(text: &[u8], offset: usize, sink: &mut IssueSink<'_>) -> Option<Value> {
    let (text, offset) = match text.strip_prefix(UTF8_BOM) {
        Some(rest) => {
            sink.add_at_offset(IssueCode::BomFound, offset, "BOM found at the beginning of UTF-8 stream.");
            (rest, offset + UTF8_BOM.len())
        }
        None => (text, offset),
    };

    let root: Value = match serde_json::from_slice(text) {
        Ok(root) => root,
        Err(err) => {
            sink.add_at_offset(
                IssueCode::InvalidJson,
                offset + text_offset(text, err.line(), err.column()),
                format!("Invalid JSON data. Parser output: {err}"),
            );
            return None;
        }
    };
    if !root.is_object() {
        sink.add_at_offset(IssueCode::InvalidJsonRootObject, offset, "JSON root is not an object.");
        return None;
    }
    Some(root)
}

/// Byte offset of a 1-based line and column
fn text_offset(text: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split(|&b| b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(bytes: &[u8]) -> Vec<&'static str> {
        validate_bytes_blocking(bytes, &ValidationOptions::default()).codes()
    }

    #[test]
    fn test_detect_format() {
        let options = ValidationOptions::default();
        assert_eq!(detect_format(b"glTF\x02\0\0\0", &options), InputFormat::Glb);
        assert_eq!(detect_format(b"{}", &options), InputFormat::Gltf);

        let named = ValidationOptions::default().with_uri("scene.GLB");
        assert_eq!(detect_format(b"{}", &named), InputFormat::Glb);

        let forced = ValidationOptions {
            format: Some(InputFormat::Gltf),
            ..named
        };
        assert_eq!(detect_format(b"glTF", &forced), InputFormat::Gltf);
    }

    #[test]
    fn test_text_offset() {
        let text = b"{\n  \"a\": x\n}";
        assert_eq!(text_offset(text, 2, 8), 9);
        assert_eq!(text_offset(text, 1, 1), 0);
        assert_eq!(text_offset(text, 9, 9), text.len());
    }

    #[test]
    fn test_bom_is_reported_and_skipped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(br#"{"asset":{"version":"2.0"}}"#);
        assert_eq!(codes(&bytes), vec!["BOM_FOUND"]);
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let report = validate_bytes_blocking(b"{\"asset\": ", &ValidationOptions::default());
        assert_eq!(report.codes(), vec!["INVALID_JSON"]);
        assert!(report.info.is_none());
    }

    #[test]
    fn test_non_object_root() {
        assert_eq!(codes(b"[1, 2]"), vec!["INVALID_JSON_ROOT_OBJECT"]);
    }

    #[test]
    fn test_missing_asset_stops() {
        let report = validate_bytes_blocking(br#"{"nodes":[{"children":[0]}]}"#, &ValidationOptions::default());
        assert_eq!(report.codes(), vec!["UNDEFINED_PROPERTY"]);
        assert!(report.info.is_none());
    }

    #[test]
    fn test_accessor_data_can_be_disabled() {
        let json = serde_json::json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "uri": "data:application/octet-stream;base64,AAAAAA==", "byteLength": 4 }],
            "bufferViews": [{ "buffer": 0, "byteLength": 4 }],
            "accessors": [{ "bufferView": 0, "componentType": 5126, "count": 1, "type": "SCALAR",
                            "min": [1.0], "max": [1.0] }]
        });
        let bytes = serde_json::to_vec(&json).unwrap();
        let checked = validate_bytes_blocking(&bytes, &ValidationOptions::default());
        assert!(checked.codes().contains(&"ACCESSOR_MIN_MISMATCH"));

        let options = ValidationOptions {
            validate_accessor_data: false,
            ..Default::default()
        };
        let unchecked = validate_bytes_blocking(&bytes, &options);
        assert!(!unchecked.codes().contains(&"ACCESSOR_MIN_MISMATCH"));
    }
}
