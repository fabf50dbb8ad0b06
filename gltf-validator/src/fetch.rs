//! Resource resolution
//!
//! Binds bytes to buffers and images: the GLB BIN chunk for a uri-less first
//! buffer, base64 `data:` URIs decoded in place, and everything else through
//! the caller's [`ResourceLoader`]. A failed fetch is an `IO_ERROR` issue;
//! the entity is then checked from its declared metadata only.

use crate::document::Document;
use crate::image_info::{self, ImageInfo, SniffError};
use crate::issue::{IssueCode, IssueSink};
use crate::resource::{ResourceLoader, decode_data_uri, is_data_uri, is_relative_reference};
use glb_container::Glb;
use serde::Serialize;

/// Mime type recorded for binary buffers
const BUFFER_MIME_TYPE: &str = "application/gltf-buffer";

/// Slack allowed between a BIN chunk and its buffer's `byteLength`
const GLB_PADDING: usize = 3;

/// Where a resource's bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    Glb,
    Base64,
    External,
}

/// What is known about an image's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    /// No bytes to look at
    Unavailable,
    Decoded(ImageInfo),
    Unrecognized,
    Truncated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// One entry of the report's resource list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub pointer: String,
    pub storage: Storage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRecord>,
}

/// Bytes bound to buffers and what was learned about images
#[derive(Debug, Clone, Default)]
pub struct Resources {
    /// Indexed like `doc.buffers`
    pub buffers: Vec<Option<Vec<u8>>>,
    /// Indexed like `doc.images`
    pub images: Vec<ImageStatus>,
    pub records: Vec<ResourceRecord>,
}

impl Resources {
    /// Empty resources for a document
    pub fn unresolved(doc: &Document) -> Self {
        Self {
            buffers: vec![None; doc.buffers.len()],
            images: vec![ImageStatus::Unavailable; doc.images.len()],
            records: Vec::new(),
        }
    }

    /// Bytes covered by a buffer view, if its buffer is loaded and the view fits
    pub fn view_bytes(&self, doc: &Document, view: usize) -> Option<&[u8]> {
        let view = doc.buffer_views.get(view)?;
        let buffer = view.buffer?.get(self.buffers.len())?;
        let data = self.buffers[buffer].as_deref()?;
        let start = usize::try_from(view.byte_offset).ok()?;
        let end = start.checked_add(usize::try_from(view.byte_length?).ok()?)?;
        data.get(start..end)
    }
}

enum Fetched {
    Bytes(Storage, Vec<u8>),
    /// External resource the loader was not asked for or could not provide
    Missing,
}

struct Fetcher<'a, 's, 'o> {
    loader: Option<&'a dyn ResourceLoader>,
    is_glb: bool,
    sink: &'s mut IssueSink<'o>,
}

impl Fetcher<'_, '_, '_> {
    /// Bytes named by a `uri` property
    async fn load_uri(&mut self, uri: &str, uri_pointer: String) -> Fetched {
        if is_data_uri(uri) {
            let Some(decoded) = decode_data_uri(uri) else {
                self.sink
                    .add(IssueCode::InvalidDataUri, uri_pointer, "Invalid data URI.");
                return Fetched::Missing;
            };
            if self.is_glb {
                self.sink.add(
                    IssueCode::DataUriGlb,
                    uri_pointer,
                    "Data URI is used in GLB container.",
                );
            }
            return Fetched::Bytes(Storage::Base64, decoded.data);
        }

        if !is_relative_reference(uri) {
            self.sink.add(
                IssueCode::NonRelativeUri,
                uri_pointer.clone(),
                format!("Non-relative URI found: '{uri}'."),
            );
        }

        let Some(loader) = self.loader else {
            tracing::debug!("No resource loader; skipping {}", uri);
            return Fetched::Missing;
        };
        match loader.load(uri).await {
            Ok(bytes) => Fetched::Bytes(Storage::External, bytes),
            Err(err) => {
                tracing::warn!("Failed to load {}: {}", uri, err);
                self.sink.add(IssueCode::IoError, uri_pointer, err.to_string());
                Fetched::Missing
            }
        }
    }
}

/// Resolve every buffer, then every image
pub async fn resolve(
    doc: &Document,
    container: Option<&Glb<'_>>,
    loader: Option<&dyn ResourceLoader>,
    sink: &mut IssueSink<'_>,
) -> Resources {
    let mut resources = Resources::unresolved(doc);
    let mut buffer_storage = vec![Storage::External; doc.buffers.len()];
    let bin = container.and_then(|glb| glb.bin_chunk());
    let mut bin_used = false;

    let mut fetcher = Fetcher {
        loader,
        is_glb: container.is_some(),
        sink,
    };

    for (i, buffer) in doc.buffers.iter().enumerate() {
        let pointer = format!("/buffers/{i}");
        let declared = buffer.byte_length.and_then(|length| usize::try_from(length).ok());

        let Some(uri) = &buffer.uri else {
            if container.is_none() {
                fetcher
                    .sink
                    .add(IssueCode::UndefinedProperty, pointer, "Property 'uri' must be defined.");
                continue;
            }
            if i != 0 {
                fetcher.sink.add(
                    IssueCode::BufferNonFirstGlb,
                    pointer,
                    "Buffer referring to GLB binary chunk must be the first.",
                );
                continue;
            }
            let Some(chunk) = bin else {
                fetcher
                    .sink
                    .add(IssueCode::BufferMissingGlbData, pointer, "Buffer refers to an unresolved GLB binary chunk.");
                continue;
            };

            bin_used = true;
            if let Some(declared) = declared {
                if chunk.data.len() < declared {
                    fetcher.sink.add(
                        IssueCode::BufferByteLengthMismatch,
                        format!("{pointer}/byteLength"),
                        format!(
                            "Actual data length {} is less than the declared buffer byteLength {declared}.",
                            chunk.data.len()
                        ),
                    );
                } else if chunk.data.len() > declared + GLB_PADDING {
                    fetcher.sink.add(
                        IssueCode::BufferGlbChunkTooBig,
                        format!("{pointer}/byteLength"),
                        format!(
                            "GLB-stored BIN chunk contains {} extra padding byte(s).",
                            chunk.data.len() - declared
                        ),
                    );
                }
            }
            resources.records.push(ResourceRecord {
                pointer,
                storage: Storage::Glb,
                uri: None,
                mime_type: Some(BUFFER_MIME_TYPE.to_string()),
                byte_length: Some(chunk.data.len()),
                image: None,
            });
            resources.buffers[i] = Some(chunk.data.to_vec());
            continue;
        };

        if !buffer.uri_valid {
            continue;
        }

        let fetched = fetcher.load_uri(uri, format!("{pointer}/uri")).await;
        let external_uri = (!is_data_uri(uri)).then(|| uri.clone());
        match fetched {
            Fetched::Bytes(storage, data) => {
                if let Some(declared) = declared {
                    if data.len() != declared {
                        fetcher.sink.add(
                            IssueCode::BufferByteLengthMismatch,
                            format!("{pointer}/byteLength"),
                            format!(
                                "Actual data length {} is not equal to the declared buffer byteLength {declared}.",
                                data.len()
                            ),
                        );
                    }
                }
                buffer_storage[i] = storage;
                resources.records.push(ResourceRecord {
                    pointer,
                    storage,
                    uri: external_uri,
                    mime_type: Some(BUFFER_MIME_TYPE.to_string()),
                    byte_length: Some(data.len()),
                    image: None,
                });
                resources.buffers[i] = Some(data);
            }
            Fetched::Missing => {
                if external_uri.is_some() {
                    resources.records.push(ResourceRecord {
                        pointer,
                        storage: Storage::External,
                        uri: external_uri,
                        mime_type: Some(BUFFER_MIME_TYPE.to_string()),
                        byte_length: None,
                        image: None,
                    });
                }
            }
        }
    }

    if let Some(chunk) = bin {
        if !bin_used {
            fetcher.sink.add_at_offset(
                IssueCode::GlbBinChunkUnused,
                chunk.offset,
                "GLB-stored BIN chunk is not used.",
            );
        }
    }

    for (i, image) in doc.images.iter().enumerate() {
        let pointer = format!("/images/{i}");

        let (storage, uri, bytes) = if let Some(uri) = &image.uri {
            if !image.uri_valid {
                continue;
            }
            let external_uri = (!is_data_uri(uri)).then(|| uri.clone());
            match fetcher.load_uri(uri, format!("{pointer}/uri")).await {
                Fetched::Bytes(storage, data) => (storage, external_uri, Some(data)),
                Fetched::Missing if external_uri.is_some() => (Storage::External, external_uri, None),
                Fetched::Missing => continue,
            }
        } else if let Some(view) = image.buffer_view.and_then(|v| v.get(doc.buffer_views.len())) {
            let storage = doc.buffer_views[view]
                .buffer
                .and_then(|b| b.get(buffer_storage.len()))
                .map_or(Storage::External, |b| buffer_storage[b]);
            let bytes = resources.view_bytes(doc, view).map(<[u8]>::to_vec);
            if bytes.is_none() {
                continue;
            }
            (storage, None, bytes)
        } else {
            continue;
        };

        let status = match bytes.as_deref().map(image_info::sniff) {
            None => ImageStatus::Unavailable,
            Some(Ok(info)) => ImageStatus::Decoded(info),
            Some(Err(SniffError::Unrecognized)) => ImageStatus::Unrecognized,
            Some(Err(SniffError::Truncated)) => ImageStatus::Truncated,
        };
        let mime_type = match status {
            ImageStatus::Decoded(info) => Some(info.mime_type.to_string()),
            _ => image.mime_type.clone(),
        };
        let image_record = match status {
            ImageStatus::Decoded(info) => Some(ImageRecord {
                mime_type: info.mime_type,
                width: info.width,
                height: info.height,
            }),
            _ => None,
        };
        resources.records.push(ResourceRecord {
            pointer,
            storage,
            uri,
            mime_type,
            byte_length: bytes.as_ref().map(Vec::len),
            image: image_record,
        });
        resources.images[i] = status;
    }

    tracing::debug!(
        "Resolved {} of {} buffers and {} images",
        resources.buffers.iter().filter(|b| b.is_some()).count(),
        doc.buffers.len(),
        doc.images.len()
    );
    resources
}
