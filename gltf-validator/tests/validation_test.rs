//! End-to-end validation of generated glTF and GLB assets

mod fixtures;

use fixtures::{GENERATOR, count, pointers, skinned_glb, triangle, validate_json, validate_json_with};
use glb_builder::{BufferBuilder, BufferSource, assemble_glb_chunks, json};
use gltf_validator::{InputFormat, Severity, ValidationOptions, validate_bytes_blocking, validate_file};

// =============================================================================
// Documents
// =============================================================================

#[test]
fn test_minimal_asset_is_clean() {
    let report = validate_json(&json!({ "asset": { "version": "2.0" } }));

    assert_eq!(report.issues.num_errors, 0, "issues: {:?}", report.codes());
    assert_eq!(report.issues.num_warnings, 0, "issues: {:?}", report.codes());
    assert_eq!(report.mime_type, "model/gltf+json");

    let info = report.info.expect("asset info for a readable document");
    assert_eq!(info.version.as_deref(), Some("2.0"));
    assert_eq!(info.draw_call_count, 0);
}

#[test]
fn test_unknown_major_version_stops_validation() {
    let report = validate_json(&json!({
        "asset": { "version": "3.0" },
        "nodes": [{ "children": [0] }],
    }));

    assert_eq!(report.codes(), vec!["UNKNOWN_ASSET_MAJOR_VERSION"]);
    assert_eq!(pointers(&report, "UNKNOWN_ASSET_MAJOR_VERSION"), vec!["/asset/version"]);
    assert!(report.info.is_none(), "no statistics for an unsupported version");
}

#[test]
fn test_indexed_triangle_is_clean() {
    let mut buffer = BufferBuilder::new();
    let root = triangle(&mut buffer).build(&buffer, BufferSource::DataUri, GENERATOR);
    let report = validate_json(&root);

    assert_eq!(report.issues.num_errors, 0, "issues: {:?}", report.codes());
    assert_eq!(report.issues.num_warnings, 0, "issues: {:?}", report.codes());

    let info = report.info.expect("asset info");
    assert_eq!(info.draw_call_count, 1);
    assert_eq!(info.total_vertex_count, 3);
    assert_eq!(info.total_triangle_count, 1);
    assert!(info.has_default_scene);
}

#[test]
fn test_node_loop() {
    let report = validate_json(&json!({
        "asset": { "version": "2.0" },
        "nodes": [{ "children": [1] }, { "children": [0] }],
    }));

    assert_eq!(pointers(&report, "NODE_LOOP"), vec!["/nodes/0", "/nodes/1"]);
}

#[test]
fn test_skin_joints_need_common_root() {
    let skin = |nodes: serde_json::Value| {
        json!({
            "asset": { "version": "2.0" },
            "nodes": nodes,
            "skins": [{ "joints": [1, 2, 3] }],
        })
    };

    let disjoint = validate_json(&skin(json!([{}, {}, {}, {}])));
    assert_eq!(pointers(&disjoint, "SKIN_NO_COMMON_ROOT"), vec!["/skins/0/joints"]);

    let shared = validate_json(&skin(json!([{ "children": [1, 2, 3] }, {}, {}, {}])));
    assert_eq!(count(&shared, "SKIN_NO_COMMON_ROOT"), 0, "issues: {:?}", shared.codes());
}

#[test]
fn test_matrix_and_trs_are_exclusive() {
    let translate = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 5.0, 0.0, 0.0, 1.0];
    let both = validate_json(&json!({
        "asset": { "version": "2.0" },
        "nodes": [{ "matrix": translate, "translation": [5.0, 0.0, 0.0] }],
    }));
    assert_eq!(pointers(&both, "NODE_MATRIX_TRS"), vec!["/nodes/0"]);

    let trs_only = validate_json(&json!({
        "asset": { "version": "2.0" },
        "nodes": [{ "translation": [5.0, 0.0, 0.0] }],
    }));
    assert_eq!(count(&trs_only, "NODE_MATRIX_TRS"), 0);
}

#[test]
fn test_mirrored_matrix_is_not_trs() {
    let mirror = [-1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    let report = validate_json(&json!({
        "asset": { "version": "2.0" },
        "cameras": [{ "type": "perspective", "perspective": { "yfov": 0.8, "znear": 0.1 } }],
        "nodes": [{ "matrix": mirror, "camera": 0 }],
        "scenes": [{ "nodes": [0] }],
        "scene": 0,
    }));
    assert_eq!(pointers(&report, "NODE_MATRIX_NON_TRS"), vec!["/nodes/0/matrix"]);
}

#[test]
fn test_rotation_must_be_unit() {
    let rotated = |rotation: [f64; 4]| {
        validate_json(&json!({
            "asset": { "version": "2.0" },
            "nodes": [{ "rotation": rotation }],
        }))
    };

    let short = rotated([0.0, 0.0, 0.0, 0.9]);
    assert_eq!(pointers(&short, "ROTATION_NON_UNIT"), vec!["/nodes/0/rotation"]);

    let unit = rotated([0.0, 0.0, 0.0, 1.0]);
    assert_eq!(count(&unit, "ROTATION_NON_UNIT"), 0);
}

#[test]
fn test_declared_bounds_must_match_data() {
    let mut buffer = BufferBuilder::new();
    let builder = triangle(&mut buffer);
    let exact = builder.build(&buffer, BufferSource::DataUri, GENERATOR);
    let report = validate_json(&exact);
    assert_eq!(count(&report, "ACCESSOR_MIN_MISMATCH"), 0);
    assert_eq!(count(&report, "ACCESSOR_MAX_MISMATCH"), 0);

    let mut loose = exact.clone();
    loose["accessors"][0]["min"][0] = json!(-0.5);
    let report = validate_json(&loose);
    assert_eq!(pointers(&report, "ACCESSOR_MIN_MISMATCH"), vec!["/accessors/0/min/0"]);
    assert_eq!(count(&report, "ACCESSOR_MAX_MISMATCH"), 0);
    assert_eq!(count(&report, "ACCESSOR_ELEMENT_OUT_OF_MIN_BOUND"), 0);
}

#[test]
fn test_declared_bounds_use_single_precision() {
    let mut buffer = BufferBuilder::new();
    let exact = triangle(&mut buffer).build(&buffer, BufferSource::DataUri, GENERATOR);
    let ulp = f64::from(f32::EPSILON);

    // Rounds back to the stored f32 value
    let mut rounded = exact.clone();
    rounded["accessors"][0]["max"][0] = json!(1.0 + 1e-12);
    let report = validate_json(&rounded);
    assert_eq!(count(&report, "ACCESSOR_MAX_MISMATCH"), 0, "issues: {:?}", report.codes());

    let mut below = exact.clone();
    below["accessors"][0]["min"][1] = json!(-ulp);
    let report = validate_json(&below);
    assert_eq!(pointers(&report, "ACCESSOR_MIN_MISMATCH"), vec!["/accessors/0/min/1"]);
    assert_eq!(count(&report, "ACCESSOR_MAX_MISMATCH"), 0);
    assert_eq!(count(&report, "ACCESSOR_ELEMENT_OUT_OF_MIN_BOUND"), 0);

    let mut above = exact;
    above["accessors"][0]["max"][0] = json!(1.0 + ulp);
    let report = validate_json(&above);
    assert_eq!(pointers(&report, "ACCESSOR_MAX_MISMATCH"), vec!["/accessors/0/max/0"]);
    assert_eq!(count(&report, "ACCESSOR_MIN_MISMATCH"), 0);
    assert_eq!(count(&report, "ACCESSOR_ELEMENT_OUT_OF_MAX_BOUND"), 0);
}

#[test]
fn test_huge_accessor_count_still_reports() {
    let huge = 4_000_000_000_000_000_000u64;
    let detached = validate_json(&json!({
        "asset": { "version": "2.0" },
        "accessors": [{ "componentType": 5126, "count": huge, "type": "SCALAR" }],
    }));
    assert!(detached.info.is_some(), "issues: {:?}", detached.codes());

    let short_view = validate_json(&json!({
        "asset": { "version": "2.0" },
        "buffers": [{ "uri": "data:application/octet-stream;base64,AAAAAA==", "byteLength": 4 }],
        "bufferViews": [{ "buffer": 0, "byteLength": 4 }],
        "accessors": [{ "bufferView": 0, "componentType": 5126, "count": huge, "type": "SCALAR" }],
    }));
    assert_eq!(pointers(&short_view, "ACCESSOR_TOO_LONG"), vec!["/accessors/0/count"]);
    assert!(short_view.info.is_some());
}

#[test]
fn test_out_of_range_indices() {
    let mut buffer = BufferBuilder::new();
    let mut root = triangle(&mut buffer).build(&buffer, BufferSource::Glb, GENERATOR);

    // Rewrite the index data in place: 0, 1, 7
    let mut data = buffer.data().to_vec();
    let indices_offset = root["bufferViews"][2]["byteOffset"].as_u64().unwrap() as usize;
    data[indices_offset + 4..indices_offset + 6].copy_from_slice(&7u16.to_le_bytes());
    root["buffers"][0]["byteLength"] = json!(data.len());

    let glb = glb_builder::assemble_glb(&root, &data).unwrap();
    let report = validate_bytes_blocking(&glb, &ValidationOptions::default());
    assert_eq!(pointers(&report, "ACCESSOR_INDEX_OOB"), vec!["/accessors/2"]);
}

// =============================================================================
// GLB containers
// =============================================================================

fn glb_options() -> ValidationOptions {
    ValidationOptions {
        format: Some(InputFormat::Glb),
        ..Default::default()
    }
}

#[test]
fn test_truncated_glb_header() {
    let report = validate_bytes_blocking(b"glTF\x02\0\0\0", &glb_options());

    assert_eq!(report.codes(), vec!["GLB_UNEXPECTED_END_OF_HEADER"]);
    assert_eq!(report.issues.messages[0].offset, Some(8));
    assert!(report.info.is_none());
}

#[test]
fn test_glb_wrong_magic() {
    let mut glb = assemble_glb_chunks(br#"{"asset":{"version":"2.0"}}"#, None);
    glb[0..4].copy_from_slice(b"gLTF");
    let report = validate_bytes_blocking(&glb, &glb_options());

    assert_eq!(report.codes(), vec!["GLB_INVALID_MAGIC"]);
    assert_eq!(report.issues.messages[0].offset, Some(0));
}

#[test]
fn test_glb_wrong_version() {
    let mut glb = assemble_glb_chunks(br#"{"asset":{"version":"2.0"}}"#, None);
    glb[4..8].copy_from_slice(&1u32.to_le_bytes());
    let report = validate_bytes_blocking(&glb, &glb_options());

    assert_eq!(report.codes(), vec!["GLB_INVALID_VERSION"]);
    assert_eq!(report.issues.messages[0].offset, Some(4));
}

#[test]
fn test_skinned_glb_is_valid() {
    let glb = skinned_glb();
    let report = validate_bytes_blocking(&glb, &ValidationOptions::default());

    assert_eq!(report.mime_type, "model/gltf-binary");
    assert_eq!(report.issues.num_errors, 0, "issues: {:?}", report.codes());

    let info = report.info.expect("asset info");
    assert!(info.has_skins);
    assert_eq!(info.animation_count, 1);
    assert_eq!(info.max_influences, 4);
    assert_eq!(info.total_triangle_count, 2);
}

#[test]
fn test_skinned_glb_with_invalid_skeleton() {
    let glb = skinned_glb();
    let json_length = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;
    let mut root: serde_json::Value = serde_json::from_slice(&glb[20..20 + json_length]).unwrap();
    let bin = &glb[20 + json_length + 8..];

    // Skeleton that is neither a joint nor above all of them
    root["skins"][0]["skeleton"] = json!(0);
    let broken = glb_builder::assemble_glb(&root, bin).unwrap();
    let report = validate_bytes_blocking(&broken, &ValidationOptions::default());

    assert_eq!(pointers(&report, "SKIN_SKELETON_INVALID"), vec!["/skins/0/skeleton"]);
}

// =============================================================================
// Files and external resources
// =============================================================================

#[test]
fn test_file_with_external_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let mut buffer = BufferBuilder::new();
    let root = triangle(&mut buffer).build(&buffer, BufferSource::Uri("mesh.bin".into()), GENERATOR);

    let path = dir.path().join("triangle.gltf");
    std::fs::write(&path, serde_json::to_vec_pretty(&root).unwrap()).unwrap();
    std::fs::write(dir.path().join("mesh.bin"), buffer.data()).unwrap();

    let report = pollster::block_on(validate_file(&path, ValidationOptions::default())).unwrap();
    assert_eq!(report.issues.num_errors, 0, "issues: {:?}", report.codes());
    assert!(report.uri.as_deref().is_some_and(|uri| uri.ends_with("triangle.gltf")));

    let info = report.info.expect("asset info");
    let record = info
        .resources
        .iter()
        .find(|record| record.pointer == "/buffers/0")
        .expect("buffer resource record");
    assert_eq!(record.uri.as_deref(), Some("mesh.bin"));
    assert_eq!(record.byte_length, Some(buffer.data().len()));
}

#[test]
fn test_file_with_missing_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let mut buffer = BufferBuilder::new();
    let root = triangle(&mut buffer).build(&buffer, BufferSource::Uri("missing.bin".into()), GENERATOR);

    let path = dir.path().join("triangle.gltf");
    std::fs::write(&path, serde_json::to_vec(&root).unwrap()).unwrap();

    let report = pollster::block_on(validate_file(&path, ValidationOptions::default())).unwrap();
    let io_errors = pointers(&report, "IO_ERROR");
    assert_eq!(io_errors.len(), 1, "issues: {:?}", report.codes());
    assert!(io_errors[0].starts_with("/buffers/0"));
}

#[test]
fn test_unreadable_input_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = pollster::block_on(validate_file(dir.path().join("nope.glb"), ValidationOptions::default()));
    assert!(result.is_err());
}

// =============================================================================
// Options
// =============================================================================

fn empty_nodes(n: usize) -> serde_json::Value {
    let roots: Vec<u32> = (0..n as u32).collect();
    let nodes = vec![json!({}); n];
    json!({
        "asset": { "version": "2.0" },
        "nodes": nodes,
        "scenes": [{ "nodes": roots }],
        "scene": 0,
    })
}

#[test]
fn test_ignored_and_only_filters() {
    let root = empty_nodes(2);
    assert_eq!(count(&validate_json(&root), "NODE_EMPTY"), 2);

    let ignored = ValidationOptions {
        ignored_issues: vec!["NODE_EMPTY".into()],
        ..Default::default()
    };
    assert_eq!(count(&validate_json_with(&root, &ignored), "NODE_EMPTY"), 0);

    let only = ValidationOptions {
        only_issues: vec!["NODE_LOOP".into()],
        ..Default::default()
    };
    assert!(validate_json_with(&root, &only).codes().is_empty());
}

#[test]
fn test_max_issues_truncates_after_counting() {
    let options = ValidationOptions {
        max_issues: 2,
        ..Default::default()
    };
    let report = validate_json_with(&empty_nodes(5), &options);

    assert_eq!(report.issues.messages.len(), 2);
    assert_eq!(report.issues.num_infos, 5);
    assert!(report.issues.truncated);
}

#[test]
fn test_severity_override() {
    let options = ValidationOptions::default().with_severity("NODE_EMPTY", Severity::Error);
    let report = validate_json_with(&empty_nodes(1), &options);

    assert_eq!(report.issues.num_errors, 1);
    assert!(report.has_errors());
    assert_eq!(report.issues.messages[0].severity, Severity::Error);
}

#[test]
fn test_options_from_toml() {
    let options = ValidationOptions::from_toml_str(
        r#"
        maxIssues = 1
        ignoredIssues = ["UNUSED_OBJECT"]

        [severityOverrides]
        NODE_EMPTY = "warning"
        "#,
    )
    .unwrap();
    let report = validate_json_with(&empty_nodes(3), &options);

    assert_eq!(report.issues.num_warnings, 3);
    assert_eq!(report.issues.messages.len(), 1);
    assert!(report.issues.truncated);
}

#[test]
fn test_report_serializes_camel_case() {
    let report = validate_json(&empty_nodes(1));
    let text = report.to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value["mimeType"], "model/gltf+json");
    assert_eq!(value["issues"]["numInfos"], 1);
    assert_eq!(value["issues"]["messages"][0]["code"], "NODE_EMPTY");
    assert_eq!(value["issues"]["messages"][0]["severity"], 2);
    assert_eq!(value["info"]["hasDefaultScene"], true);
}
