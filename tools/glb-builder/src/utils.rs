//! Utility functions for GLB construction

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

/// Compute bounding box for positions
pub fn compute_bounds(positions: &[[f32; 3]]) -> (Vec<f32>, Vec<f32>) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];

    for pos in positions {
        for i in 0..3 {
            min[i] = min[i].min(pos[i]);
            max[i] = max[i].max(pos[i]);
        }
    }

    (min.to_vec(), max.to_vec())
}

/// Align buffer to 4-byte boundary
pub fn align_buffer(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

/// Assemble GLB binary from a JSON tree and buffer data
pub fn assemble_glb(root: &Value, buffer_data: &[u8]) -> Result<Vec<u8>> {
    let json_bytes = serde_json::to_vec(root)?;
    let bin = if buffer_data.is_empty() {
        None
    } else {
        Some(buffer_data)
    };
    Ok(assemble_glb_chunks(&json_bytes, bin))
}

/// Assemble GLB binary from raw JSON bytes and an optional BIN payload
///
/// JSON is padded with spaces, binary data with zeros.
pub fn assemble_glb_chunks(json_bytes: &[u8], buffer_data: Option<&[u8]>) -> Vec<u8> {
    // Pad JSON to 4-byte alignment
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;

    // Pad buffer to 4-byte alignment
    let buffer_chunk_length = buffer_data.map(|data| data.len() + (4 - (data.len() % 4)) % 4);

    // Total file length
    let total_length = 12 + 8 + json_chunk_length + buffer_chunk_length.map_or(0, |len| 8 + len);

    let mut glb = Vec::with_capacity(total_length);

    // GLB header
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes()); // version
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    // JSON chunk
    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    glb.extend_from_slice(json_bytes);
    glb.extend(std::iter::repeat_n(0x20u8, json_padding));

    // Binary chunk
    if let (Some(data), Some(chunk_length)) = (buffer_data, buffer_chunk_length) {
        glb.extend_from_slice(&(chunk_length as u32).to_le_bytes());
        glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
        glb.extend_from_slice(data);
        glb.extend(std::iter::repeat_n(0u8, chunk_length - data.len()));
    }

    glb
}

/// Standard base64 with padding
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// `data:` URI with a base64 payload
pub fn data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", encode_base64(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_bounds_simple() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [-1.0, -2.0, -3.0]];
        let (min, max) = compute_bounds(&positions);
        assert_eq!(min, vec![-1.0, -2.0, -3.0]);
        assert_eq!(max, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_align_buffer() {
        let mut buffer = vec![1, 2, 3];
        align_buffer(&mut buffer);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer, vec![1, 2, 3, 0]);

        let mut buffer2 = vec![1, 2, 3, 4];
        align_buffer(&mut buffer2);
        assert_eq!(buffer2.len(), 4); // Already aligned
    }

    #[test]
    fn test_encode_base64() {
        assert_eq!(encode_base64(b""), "");
        assert_eq!(encode_base64(b"f"), "Zg==");
        assert_eq!(encode_base64(b"fo"), "Zm8=");
        assert_eq!(encode_base64(b"foo"), "Zm9v");
        assert_eq!(encode_base64(&[1, 2, 3]), "AQID");
    }

    #[test]
    fn test_assemble_glb_layout() {
        let glb = assemble_glb_chunks(b"{}", Some(&[1, 2, 3]));
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize, glb.len());
        // JSON chunk padded to 4 bytes with spaces
        assert_eq!(u32::from_le_bytes(glb[12..16].try_into().unwrap()), 4);
        assert_eq!(&glb[20..24], b"{}  ");
        // BIN chunk padded with zeros
        assert_eq!(u32::from_le_bytes(glb[24..28].try_into().unwrap()), 4);
        assert_eq!(&glb[32..36], &[1, 2, 3, 0]);
    }
}
