//! Tests for the container info pass and the frame demuxer.

use webpdemux::{
    parse_info, BlendMethod, ChunkId, DemuxError, DisposeMethod, LoopCount, WebpDemuxer,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Byte-level builders (this crate does not encode, so test buffers are
// assembled by hand)
// ============================================================================

fn le24(v: u32) -> [u8; 3] {
    [(v & 0xff) as u8, ((v >> 8) & 0xff) as u8, ((v >> 16) & 0xff) as u8]
}

/// One chunk: fourcc + LE size + payload, padded to even length.
fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    out
}

/// A whole file: RIFF header + WEBP form tag + the given chunks.
fn webp(chunks: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = chunks.iter().flatten().copied().collect();
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WEBP");
    out.extend_from_slice(&body);
    out
}

/// Minimal VP8L codestream: signature byte + 4-byte dimension header.
fn vp8l_bitstream(width: u32, height: u32, alpha: bool) -> Vec<u8> {
    let header = (width - 1) | ((height - 1) << 14) | ((alpha as u32) << 28);
    let mut out = vec![0x2f];
    out.extend_from_slice(&header.to_le_bytes());
    out
}

/// Minimal VP8 codestream: keyframe tag + start code + 14-bit dimensions.
fn vp8_bitstream(width: u32, height: u32) -> Vec<u8> {
    // frame tag: keyframe, profile 0, displayable, partition-0 length 1
    let mut out = vec![0x30, 0x00, 0x00];
    out.extend_from_slice(&[0x9d, 0x01, 0x2a]);
    out.extend_from_slice(&(width as u16).to_le_bytes());
    out.extend_from_slice(&(height as u16).to_le_bytes());
    out
}

/// VP8X payload: 32-bit flags + canvas width/height minus one.
fn vp8x(flags: u32, width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&le24(width - 1));
    out.extend_from_slice(&le24(height - 1));
    out
}

/// ANIM payload: background color + loop count.
fn anim(background: [u8; 4], loop_count: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&background);
    out.extend_from_slice(&loop_count.to_le_bytes());
    out
}

/// ANMF payload: frame header + nested sub-chunks. `x`/`y` are in pixels
/// and must be even.
fn anmf(x: u32, y: u32, width: u32, height: u32, duration: u32, flags: u8, subchunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&le24(x / 2));
    out.extend_from_slice(&le24(y / 2));
    out.extend_from_slice(&le24(width - 1));
    out.extend_from_slice(&le24(height - 1));
    out.extend_from_slice(&le24(duration));
    out.push(flags);
    for sub in subchunks {
        out.extend_from_slice(sub);
    }
    out
}

const ANIMATION_FLAG: u32 = 0x02;
const XMP_FLAG: u32 = 0x04;
const EXIF_FLAG: u32 = 0x08;
const ALPHA_FLAG: u32 = 0x10;

/// A well-formed 2-frame lossless animation on a 2x2 canvas.
fn animated_webp() -> Vec<u8> {
    webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG, 2, 2)),
        chunk(b"ANIM", &anim([1, 2, 3, 4], 3)),
        chunk(
            b"ANMF",
            &anmf(0, 0, 2, 2, 40, 0, &[chunk(b"VP8L", &vp8l_bitstream(2, 2, false))]),
        ),
        chunk(
            b"ANMF",
            &anmf(0, 0, 1, 1, 5, 0b11, &[chunk(b"VP8L", &vp8l_bitstream(1, 1, false))]),
        ),
    ])
}

// ============================================================================
// Info pass: well-formed files
// ============================================================================

#[test]
fn parse_static_lossless() {
    init_logs();
    let data = webp(&[chunk(b"VP8L", &vp8l_bitstream(1, 1, false))]);
    let info = parse_info(&data).unwrap();

    assert_eq!(info.canvas_width(), 1);
    assert_eq!(info.canvas_height(), 1);
    assert_eq!(info.frame_count(), 1);
    assert!(!info.is_animated());
    assert!(!info.has_alpha());
}

#[test]
fn parse_static_lossy() {
    let data = webp(&[chunk(b"VP8 ", &vp8_bitstream(4, 3))]);
    let info = parse_info(&data).unwrap();

    assert_eq!(info.canvas_width(), 4);
    assert_eq!(info.canvas_height(), 3);
    assert_eq!(info.frame_count(), 1);
    assert!(!info.is_animated());
    assert_eq!(info.chunk_count(ChunkId::VP8), 1);
}

#[test]
fn parse_lossless_alpha_bit() {
    let data = webp(&[chunk(b"VP8L", &vp8l_bitstream(3, 3, true))]);
    let info = parse_info(&data).unwrap();

    assert!(info.has_alpha());
}

#[test]
fn parse_extended_static() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(0, 5, 7)),
        chunk(b"VP8L", &vp8l_bitstream(5, 7, false)),
    ]);
    let info = parse_info(&data).unwrap();

    assert_eq!(info.canvas_width(), 5);
    assert_eq!(info.canvas_height(), 7);
    assert_eq!(info.frame_count(), 1);
    assert!(!info.is_animated());
}

#[test]
fn parse_animated() {
    init_logs();
    let info = parse_info(&animated_webp()).unwrap();

    assert!(info.is_animated());
    assert_eq!(info.frame_count(), 2);
    assert_eq!(info.canvas_width(), 2);
    assert_eq!(info.canvas_height(), 2);
    assert_eq!(info.background_color(), [1, 2, 3, 4]);
    assert_eq!(
        info.loop_count(),
        LoopCount::Times(std::num::NonZeroU16::new(3).unwrap())
    );
    assert_eq!(info.chunk_count(ChunkId::ANMF), 2);
}

#[test]
fn parse_loop_count_zero_is_forever() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG, 1, 1)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(
            b"ANMF",
            &anmf(0, 0, 1, 1, 100, 0, &[chunk(b"VP8L", &vp8l_bitstream(1, 1, false))]),
        ),
    ]);
    let info = parse_info(&data).unwrap();

    assert_eq!(info.loop_count(), LoopCount::Forever);
}

#[test]
fn parse_static_lossy_with_alpha_chunk() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ALPHA_FLAG, 1, 1)),
        chunk(b"ALPH", &[0x00, 0x00]),
        chunk(b"VP8 ", &vp8_bitstream(1, 1)),
    ]);
    let info = parse_info(&data).unwrap();

    assert!(info.has_alpha());
    assert_eq!(info.chunk_count(ChunkId::ALPH), 1);
}

#[test]
fn parse_unknown_chunk_is_skipped() {
    let data = webp(&[
        chunk(b"XYZW", &[1, 2, 3, 4]),
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
    ]);
    let info = parse_info(&data).unwrap();

    assert_eq!(info.frame_count(), 1);
    assert_eq!(info.chunk_count(ChunkId::Unknown(*b"XYZW")), 1);
}

#[test]
fn parse_trailing_residue_is_tolerated() {
    // Fewer than 8 bytes left after the last chunk is a normal end of data.
    let mut chunks = vec![chunk(b"VP8L", &vp8l_bitstream(1, 1, false))];
    chunks.push(vec![0, 0, 0, 0]);
    let data = webp(&chunks);

    assert!(parse_info(&data).is_ok());
}

#[test]
fn parse_metadata_chunks() {
    let exif_payload = [0xaa, 0xbb, 0xcc, 0xdd];
    let data = webp(&[
        chunk(b"VP8X", &vp8x(EXIF_FLAG | XMP_FLAG, 1, 1)),
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
        chunk(b"EXIF", &exif_payload),
        chunk(b"XMP ", &[0x11]),
    ]);
    let info = parse_info(&data).unwrap();

    assert!(info.has_exif());
    assert!(info.has_xmp());
    let range = info.metadata_range(ChunkId::EXIF).unwrap();
    assert_eq!(&data[range], &exif_payload);

    let demuxer = WebpDemuxer::new(&data).unwrap();
    assert_eq!(demuxer.exif().unwrap(), &exif_payload);
    assert_eq!(demuxer.xmp().unwrap(), &[0x11]);
    assert!(demuxer.icc_profile().is_none());
}

// ============================================================================
// Info pass: malformed files
// ============================================================================

#[test]
fn parse_rejects_non_riff() {
    init_logs();
    assert!(matches!(
        parse_info(b"not a webp file at all!!"),
        Err(DemuxError::BitstreamError(_))
    ));
}

#[test]
fn parse_rejects_wrong_form_tag() {
    let mut data = webp(&[chunk(b"VP8L", &vp8l_bitstream(1, 1, false))]);
    data[8..12].copy_from_slice(b"WAVE");

    assert!(matches!(
        parse_info(&data),
        Err(DemuxError::BitstreamError(_))
    ));
}

#[test]
fn parse_rejects_empty_input() {
    assert!(matches!(
        parse_info(&[]),
        Err(DemuxError::InvalidCommand(_))
    ));
}

#[test]
fn parse_rejects_short_header() {
    assert!(matches!(
        parse_info(b"RIFF"),
        Err(DemuxError::TruncatedData(_))
    ));
}

#[test]
fn parse_rejects_truncated_buffer() {
    let data = animated_webp();
    assert!(parse_info(&data).is_ok());

    // Dropping the final byte leaves the declared RIFF size unsatisfied.
    assert!(matches!(
        parse_info(&data[..data.len() - 1]),
        Err(DemuxError::TruncatedData(_))
    ));
}

#[test]
fn parse_rejects_overdeclared_chunk_payload() {
    // A chunk that declares more payload than the buffer holds.
    let mut body = Vec::new();
    body.extend_from_slice(b"VP8L");
    body.extend_from_slice(&100u32.to_le_bytes());
    body.extend_from_slice(&[0x2f, 0, 0, 0, 0]);
    let mut data = Vec::new();
    data.extend_from_slice(b"RIFF");
    data.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
    data.extend_from_slice(b"WEBP");
    data.extend_from_slice(&body);

    assert!(matches!(
        parse_info(&data),
        Err(DemuxError::TruncatedData(_))
    ));
}

#[test]
fn parse_rejects_double_anim() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG, 1, 1)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(
            b"ANMF",
            &anmf(0, 0, 1, 1, 100, 0, &[chunk(b"VP8L", &vp8l_bitstream(1, 1, false))]),
        ),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

#[test]
fn parse_rejects_two_image_subchunks_in_anmf() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG, 1, 1)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(
            b"ANMF",
            &anmf(
                0,
                0,
                1,
                1,
                100,
                0,
                &[
                    chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
                    chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
                ],
            ),
        ),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

#[test]
fn parse_rejects_alpha_with_lossless_subchunk() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG | ALPHA_FLAG, 1, 1)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(
            b"ANMF",
            &anmf(
                0,
                0,
                1,
                1,
                100,
                0,
                &[
                    chunk(b"ALPH", &[0x00, 0x00]),
                    chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
                ],
            ),
        ),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

#[test]
fn parse_rejects_missing_image_subchunk() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG, 1, 1)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(b"ANMF", &anmf(0, 0, 1, 1, 100, 0, &[chunk(b"ALPH", &[0x00, 0x00])])),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

#[test]
fn parse_rejects_frame_size_mismatch() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG, 2, 2)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(
            b"ANMF",
            &anmf(0, 0, 2, 2, 100, 0, &[chunk(b"VP8L", &vp8l_bitstream(1, 1, false))]),
        ),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

#[test]
fn parse_rejects_frame_outside_canvas() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG, 2, 2)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(
            b"ANMF",
            &anmf(2, 2, 1, 1, 100, 0, &[chunk(b"VP8L", &vp8l_bitstream(1, 1, false))]),
        ),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::InvalidParam(_))));
}

#[test]
fn parse_rejects_multiple_image_chunks() {
    let data = webp(&[
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

#[test]
fn parse_rejects_canvas_mismatch() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(0, 2, 2)),
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

#[test]
fn parse_rejects_anim_before_vp8x() {
    let data = webp(&[
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

#[test]
fn parse_rejects_missing_declared_exif() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(EXIF_FLAG, 1, 1)),
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::MissingData(_))));
}

#[test]
fn parse_rejects_undeclared_exif() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(0, 1, 1)),
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
        chunk(b"EXIF", &[0xaa]),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::InvalidParam(_))));
}

#[test]
fn parse_rejects_undeclared_alpha() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(0, 1, 1)),
        chunk(b"ALPH", &[0x00, 0x00]),
        chunk(b"VP8 ", &vp8_bitstream(1, 1)),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::InvalidParam(_))));
}

#[test]
fn parse_rejects_bad_alpha_header() {
    // Compression method 3 is out of range.
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ALPHA_FLAG, 1, 1)),
        chunk(b"ALPH", &[0x03, 0x00]),
        chunk(b"VP8 ", &vp8_bitstream(1, 1)),
    ]);

    assert!(matches!(
        parse_info(&data),
        Err(DemuxError::BitstreamError(_))
    ));
}

#[test]
fn parse_rejects_image_chunk_after_frames() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ANIMATION_FLAG, 1, 1)),
        chunk(b"ANIM", &anim([0; 4], 0)),
        chunk(
            b"ANMF",
            &anmf(0, 0, 1, 1, 100, 0, &[chunk(b"VP8L", &vp8l_bitstream(1, 1, false))]),
        ),
        chunk(b"VP8L", &vp8l_bitstream(1, 1, false)),
    ]);

    assert!(matches!(parse_info(&data), Err(DemuxError::ParseError(_))));
}

// ============================================================================
// Frame demuxer
// ============================================================================

#[test]
fn demux_frame_fragments() {
    init_logs();
    let data = animated_webp();
    let mut demuxer = WebpDemuxer::new(&data).unwrap();

    assert_eq!(demuxer.frame_count(), 2);
    assert!(demuxer.is_animated());

    let first = demuxer.frame_fragment(0).unwrap();
    assert_eq!(first.frame_index, 0);
    assert_eq!((first.width, first.height), (2, 2));
    assert_eq!(first.duration_ms, 40);
    assert_eq!(first.dispose, DisposeMethod::None);
    assert_eq!(first.blend, BlendMethod::AlphaBlend);
    assert!(!first.is_lossy);
    assert_eq!(first.bitstream, &vp8l_bitstream(2, 2, false)[..]);
    assert!(first.alpha_data.is_none());

    let second = demuxer.frame_fragment(1).unwrap();
    assert_eq!((second.width, second.height), (1, 1));
    assert_eq!(second.dispose, DisposeMethod::Background);
    assert_eq!(second.blend, BlendMethod::Overwrite);
    assert_eq!(second.bitstream, &vp8l_bitstream(1, 1, false)[..]);

    // Sub-minimum declared delays are substituted, the raw value is kept.
    assert_eq!(second.duration_ms, 5);
    assert_eq!(second.frame_delay_ms(), 100);
    assert_eq!(first.frame_delay_ms(), 40);
}

#[test]
fn demux_out_of_range_index() {
    let data = animated_webp();
    let mut demuxer = WebpDemuxer::new(&data).unwrap();

    assert!(matches!(
        demuxer.frame_fragment(2),
        Err(DemuxError::InvalidParam(_))
    ));
}

#[test]
fn demux_static_image_fragment() {
    let bitstream = vp8l_bitstream(1, 1, false);
    let data = webp(&[chunk(b"VP8L", &bitstream)]);
    let mut demuxer = WebpDemuxer::new(&data).unwrap();

    assert_eq!(demuxer.frame_count(), 1);
    let fragment = demuxer.frame_fragment(0).unwrap();
    assert_eq!((fragment.x_offset, fragment.y_offset), (0, 0));
    assert_eq!(fragment.bitstream, &bitstream[..]);
}

#[test]
fn demux_static_alpha_fragment() {
    let data = webp(&[
        chunk(b"VP8X", &vp8x(ALPHA_FLAG, 1, 1)),
        chunk(b"ALPH", &[0x00, 0x07]),
        chunk(b"VP8 ", &vp8_bitstream(1, 1)),
    ]);
    let mut demuxer = WebpDemuxer::new(&data).unwrap();

    let fragment = demuxer.frame_fragment(0).unwrap();
    assert!(fragment.has_alpha);
    assert!(fragment.is_lossy);
    assert_eq!(fragment.alpha_data.unwrap(), &[0x00, 0x07]);
}

#[test]
fn demux_release_is_idempotent() {
    let data = animated_webp();
    let mut demuxer = WebpDemuxer::new(&data).unwrap();

    assert!(!demuxer.is_released());
    demuxer.release();
    assert!(demuxer.is_released());
    demuxer.release(); // second release is a no-op
    assert!(demuxer.is_released());
}

#[test]
fn demux_rejects_use_after_release() {
    let data = animated_webp();
    let mut demuxer = WebpDemuxer::new(&data).unwrap();
    demuxer.release();

    assert!(matches!(
        demuxer.frame_fragment(0),
        Err(DemuxError::InvalidCommand(_))
    ));
    assert!(demuxer.icc_profile().is_none());
}

#[test]
fn demux_open_close_roundtrip() {
    let data = animated_webp();
    let mut demuxer = webpdemux::open(&data).unwrap();
    assert!(demuxer.frame_fragment(0).is_ok());
    webpdemux::close(demuxer);
}

#[test]
fn demux_matches_parse_info_metadata() {
    let data = animated_webp();
    let info = parse_info(&data).unwrap();
    let demuxer = WebpDemuxer::new(&data).unwrap();

    assert_eq!(demuxer.canvas_width(), info.canvas_width());
    assert_eq!(demuxer.canvas_height(), info.canvas_height());
    assert_eq!(demuxer.frame_count(), info.frame_count());
    assert_eq!(demuxer.loop_count(), info.loop_count());
    assert_eq!(demuxer.background_color(), info.background_color());
}
