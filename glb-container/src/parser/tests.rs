//! Tests for the parser module

#[cfg(test)]
mod tests {
    use crate::container::ChunkKind;
    use crate::error::GlbIssueKind;
    use crate::parser::{is_glb, parse_glb};

    const JSON: &[u8] = br#"{"asset":{"version":"2.0"}} "#;

    fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + payload.len());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(tag);
        out.extend_from_slice(payload);
        out
    }

    fn container(version: u32, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + body.len());
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn set_declared_length(data: &mut [u8], length: u32) {
        data[8..12].copy_from_slice(&length.to_le_bytes());
    }

    fn kinds(diagnostics: &[crate::GlbDiagnostic]) -> Vec<GlbIssueKind> {
        diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_parse_json_and_bin() {
        let mut body = chunk(b"JSON", JSON);
        body.extend(chunk(b"BIN\0", &[1, 2, 3, 4]));
        let data = container(2, &body);

        let glb = parse_glb(&data).expect("valid container");
        assert_eq!(glb.header.version, 2);
        assert_eq!(glb.header.length as usize, data.len());
        assert_eq!(glb.chunks.len(), 2);
        assert_eq!(glb.json(), Some(JSON));
        assert_eq!(glb.bin(), Some(&[1u8, 2, 3, 4][..]));
        assert!(glb.diagnostics.is_empty());
    }

    #[test]
    fn test_truncated_header_reports_available_bytes() {
        for len in 0..12 {
            let data = vec![0u8; len];
            let err = parse_glb(&data).unwrap_err();
            assert_eq!(err.diagnostics().len(), 1);
            let fatal = err.fatal().unwrap();
            assert_eq!(fatal.kind, GlbIssueKind::UnexpectedEndOfHeader);
            assert_eq!(fatal.offset, len);
            assert!(fatal.message.contains(&format!("{len} bytes available")));
        }
    }

    #[test]
    fn test_invalid_magic_single_error_at_zero() {
        let mut data = container(2, &chunk(b"JSON", JSON));
        data[3] = b'X';
        let err = parse_glb(&data).unwrap_err();
        assert_eq!(kinds(err.diagnostics()), vec![GlbIssueKind::InvalidMagic]);
        assert_eq!(err.diagnostics()[0].offset, 0);
    }

    #[test]
    fn test_invalid_version_single_error_at_four() {
        let data = container(1, &chunk(b"JSON", JSON));
        let err = parse_glb(&data).unwrap_err();
        assert_eq!(kinds(err.diagnostics()), vec![GlbIssueKind::InvalidVersion]);
        assert_eq!(err.diagnostics()[0].offset, 4);
    }

    #[test]
    fn test_declared_length_larger_is_fatal() {
        let mut data = container(2, &chunk(b"JSON", JSON));
        let len = data.len() as u32;
        set_declared_length(&mut data, len + 4);
        let err = parse_glb(&data).unwrap_err();
        assert_eq!(
            err.fatal().map(|d| d.kind),
            Some(GlbIssueKind::LengthMismatch)
        );
    }

    #[test]
    fn test_trailing_data_is_warning() {
        let mut data = container(2, &chunk(b"JSON", JSON));
        data.extend_from_slice(&[0xAA; 8]);

        let glb = parse_glb(&data).expect("trailing data is tolerated");
        assert_eq!(kinds(&glb.diagnostics), vec![GlbIssueKind::ExtraData]);
        assert!(glb.diagnostics[0].kind.is_warning());
        assert_eq!(glb.diagnostics[0].offset, data.len() - 8);
        assert_eq!(glb.chunks.len(), 1);
    }

    #[test]
    fn test_declared_length_too_small_is_fatal() {
        let mut data = container(2, &chunk(b"JSON", JSON));
        set_declared_length(&mut data, 14);
        let err = parse_glb(&data).unwrap_err();
        assert_eq!(
            err.fatal().map(|d| d.kind),
            Some(GlbIssueKind::LengthTooSmall)
        );
    }

    #[test]
    fn test_unaligned_chunk_length_is_fatal() {
        let mut data = container(2, &chunk(b"JSON", b"{}  "));
        data.extend_from_slice(&[0u8; 4]);
        let len = data.len() as u32;
        set_declared_length(&mut data, len);
        // Overwrite the chunk length with 3
        data[12..16].copy_from_slice(&3u32.to_le_bytes());

        let err = parse_glb(&data).unwrap_err();
        let fatal = err.fatal().unwrap();
        assert_eq!(fatal.kind, GlbIssueKind::ChunkLengthUnaligned);
        assert_eq!(fatal.offset, 12);
    }

    #[test]
    fn test_fatal_error_keeps_earlier_diagnostics() {
        // Unknown chunk first, then an unaligned chunk
        let mut body = chunk(b"XTRA", &[0u8; 4]);
        let mut bad = chunk(b"JSON", b"{}  ");
        bad[0..4].copy_from_slice(&2u32.to_le_bytes());
        body.extend(bad);
        let data = container(2, &body);

        let err = parse_glb(&data).unwrap_err();
        assert_eq!(
            kinds(err.diagnostics()),
            vec![
                GlbIssueKind::UnknownChunkType,
                GlbIssueKind::UnexpectedFirstChunk,
                GlbIssueKind::ChunkLengthUnaligned,
            ]
        );
    }

    #[test]
    fn test_empty_chunks() {
        let mut body = chunk(b"JSON", b"");
        body.extend(chunk(b"BIN\0", b""));
        let data = container(2, &body);

        let glb = parse_glb(&data).expect("empty chunks are not fatal");
        assert_eq!(
            kinds(&glb.diagnostics),
            vec![GlbIssueKind::EmptyChunk, GlbIssueKind::EmptyBinChunk]
        );
        assert!(!glb.diagnostics[0].kind.is_warning());
        assert!(glb.diagnostics[1].kind.is_warning());
    }

    #[test]
    fn test_chunk_too_big_takes_available_data() {
        let mut body = chunk(b"JSON", JSON);
        body.extend(chunk(b"BIN\0", &[9u8; 8]));
        let mut data = container(2, &body);
        let bin_header = 12 + 8 + JSON.len();
        data[bin_header..bin_header + 4].copy_from_slice(&64u32.to_le_bytes());

        let glb = parse_glb(&data).expect("oversized chunk is not fatal");
        assert_eq!(kinds(&glb.diagnostics), vec![GlbIssueKind::ChunkTooBig]);
        assert_eq!(glb.diagnostics[0].offset, bin_header);
        let bin = glb.bin_chunk().unwrap();
        assert_eq!(bin.declared_length, 64);
        assert_eq!(bin.data.len(), 8);
    }

    #[test]
    fn test_duplicate_json_chunk() {
        let mut body = chunk(b"JSON", JSON);
        body.extend(chunk(b"JSON", b"{}  "));
        let data = container(2, &body);

        let glb = parse_glb(&data).unwrap();
        assert_eq!(kinds(&glb.diagnostics), vec![GlbIssueKind::DuplicateChunk]);
        assert_eq!(glb.json(), Some(JSON));
    }

    #[test]
    fn test_bin_chunk_first() {
        let mut body = chunk(b"BIN\0", &[0u8; 4]);
        body.extend(chunk(b"JSON", JSON));
        let data = container(2, &body);

        let glb = parse_glb(&data).unwrap();
        assert_eq!(
            kinds(&glb.diagnostics),
            vec![GlbIssueKind::UnexpectedFirstChunk]
        );
        assert_eq!(glb.chunks[0].kind, ChunkKind::Bin);
    }

    #[test]
    fn test_bin_chunk_not_second() {
        let mut body = chunk(b"JSON", JSON);
        body.extend(chunk(b"XTRA", &[0u8; 4]));
        body.extend(chunk(b"BIN\0", &[0u8; 4]));
        let data = container(2, &body);

        let glb = parse_glb(&data).unwrap();
        assert_eq!(
            kinds(&glb.diagnostics),
            vec![
                GlbIssueKind::UnknownChunkType,
                GlbIssueKind::UnexpectedBinChunk
            ]
        );
    }

    #[test]
    fn test_truncated_chunk_header() {
        let mut body = chunk(b"JSON", JSON);
        body.extend_from_slice(&[0u8; 4]);
        let data = container(2, &body);

        let glb = parse_glb(&data).unwrap();
        assert_eq!(
            kinds(&glb.diagnostics),
            vec![GlbIssueKind::UnexpectedEndOfChunkHeader]
        );
        assert_eq!(glb.diagnostics[0].offset, 12 + 8 + JSON.len());
    }

    #[test]
    fn test_missing_json_chunk_is_fatal() {
        let data = container(2, &[]);
        let err = parse_glb(&data).unwrap_err();
        assert_eq!(
            err.fatal().map(|d| d.kind),
            Some(GlbIssueKind::MissingJsonChunk)
        );
    }

    #[test]
    fn test_is_glb() {
        assert!(is_glb(b"glTF\x02\x00\x00\x00"));
        assert!(!is_glb(b"{\"asset\":{}}"));
        assert!(!is_glb(b"gl"));
    }
}
