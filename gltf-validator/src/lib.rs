//! gltf-validator: glTF 2.0 asset validation
//!
//! Checks a `.gltf` document or `.glb` container against the structural and
//! semantic rules of glTF 2.0 and the supported extensions, and returns a
//! [`Report`] with every finding and some statistics about the asset.
//!
//! # Usage
//!
//! ```ignore
//! use gltf_validator::{ValidationOptions, validate_file};
//!
//! let report = pollster::block_on(validate_file("model.gltf", ValidationOptions::default()))?;
//! for issue in &report.issues.messages {
//!     println!("{} {:?}: {}", issue.code.as_str(), issue.pointer, issue.message);
//! }
//! ```
//!
//! # Pipeline
//!
//! ```text
//! bytes ─► glb-container ─► JSON ─► Document ─► resources ─► UsageGraph
//!                                                               │
//!            Report ◄─ filters ◄─ extensions ◄─ data ◄─ entities ┘
//! ```
//!
//! Findings never surface as Rust errors. [`ValidatorError`] covers only
//! unreadable input files and malformed option documents.

pub mod data;
pub mod document;
pub mod entities;
pub mod error;
pub mod extensions;
pub mod fetch;
pub mod graph;
pub mod image_info;
pub mod issue;
pub mod options;
pub mod reader;
pub mod report;
pub mod resource;
pub mod validator;

pub use error::{ResourceError, ValidatorError};
pub use issue::{Issue, IssueCode, Severity, SeverityOverrides};
pub use options::{DEFAULT_MAX_ISSUES, InputFormat, ValidationOptions};
pub use report::{AssetInfo, IssueSummary, Report};
pub use resource::{FileLoader, ResourceFuture, ResourceLoader};
pub use validator::{detect_format, validate_bytes, validate_bytes_blocking, validate_file};
