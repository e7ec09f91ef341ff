//! Per-chunk processors for the info pass.
//!
//! Each processor validates one chunk kind's internal layout and updates the
//! shared [`WebpInfo`] accumulator. ANMF processing opens a nested chunk walk
//! over its payload, so the same validation rules apply at every nesting
//! depth.

use alloc::format;
use alloc::string::String;
use core::ops::Range;

use log::{debug, warn};

use super::chunk::{
    ChunkData, ChunkId, ANIM_CHUNK_SIZE, ANMF_CHUNK_SIZE, MAX_CANVAS_SIZE, MAX_IMAGE_AREA,
    MAX_POSITION_OFFSET, VP8X_CHUNK_SIZE,
};
use super::error::DemuxError;
use super::info::{
    BlendMethod, DisposeMethod, FrameRecord, WebpInfo, ALPHA_FLAG, ANIMATION_FLAG, EXIF_FLAG,
    ICCP_FLAG, XMP_FLAG,
};
use super::walker::walk_chunks;
use crate::decode::probe_features;
use crate::slice_reader::SliceReader;

const ALPHA_HEADER_LEN: usize = 1;
const ALPHA_PREPROCESSED_LEVELS: u8 = 1;

/// Scratch state for the single ANMF chunk currently being processed.
///
/// Lives only for the duration of one `process_anmf` call; it is impossible
/// for a frame's sub-chunk bookkeeping to leak into the next top-level chunk.
struct FrameScope {
    x_offset: u32,
    y_offset: u32,
    width: u32,
    height: u32,
    duration_ms: u32,
    dispose: DisposeMethod,
    blend: BlendMethod,
    seen_alpha: bool,
    seen_image: bool,
    is_lossy: bool,
    has_alpha: bool,
    bitstream: Option<Range<usize>>,
    alpha: Option<Range<usize>>,
}

impl FrameScope {
    fn finish(self) -> Result<FrameRecord, DemuxError> {
        let bitstream = self.bitstream.ok_or_else(|| {
            DemuxError::ParseError(String::from("No VP8/VP8L chunk detected in an ANMF chunk"))
        })?;
        Ok(FrameRecord {
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            width: self.width,
            height: self.height,
            duration_ms: self.duration_ms,
            dispose: self.dispose,
            blend: self.blend,
            has_alpha: self.has_alpha,
            is_lossy: self.is_lossy,
            bitstream,
            alpha: self.alpha,
        })
    }
}

/// Top-level dispatch: route one chunk to its processor.
pub(crate) fn process_chunk(chunk: &ChunkData<'_>, info: &mut WebpInfo) -> Result<(), DemuxError> {
    match chunk.id {
        ChunkId::VP8 | ChunkId::VP8L => process_image_chunk(chunk, info),
        ChunkId::VP8X => process_vp8x_chunk(chunk, info),
        ChunkId::ALPH => process_alph_chunk(chunk, info),
        ChunkId::ANIM => process_anim_chunk(chunk, info),
        ChunkId::ANMF => process_anmf_chunk(chunk, info),
        ChunkId::ICCP => process_iccp_chunk(chunk, info),
        ChunkId::EXIF | ChunkId::XMP => process_metadata_chunk(chunk, info),
        ChunkId::Unknown(fourcc) => {
            warn!(
                "unknown chunk {:?} at offset {}, length {}",
                fourcc, chunk.offset, chunk.size
            );
            info.mark(chunk.id);
            Ok(())
        }
    }
}

fn process_vp8x_chunk(chunk: &ChunkData<'_>, info: &mut WebpInfo) -> Result<(), DemuxError> {
    if info.count(ChunkId::VP8) > 0
        || info.count(ChunkId::VP8L) > 0
        || info.count(ChunkId::VP8X) > 0
    {
        return Err(DemuxError::ParseError(String::from(
            "Already seen a VP8/VP8L/VP8X chunk when parsing VP8X chunk",
        )));
    }
    if chunk.size != VP8X_CHUNK_SIZE {
        return Err(DemuxError::ParseError(String::from("Corrupted VP8X chunk")));
    }
    let mut r = SliceReader::new(chunk.payload);
    let flags = r.read_u32_le()?;
    let canvas_width = 1 + r.read_u24_le()?;
    let canvas_height = 1 + r.read_u24_le()?;
    if canvas_width == 0 || canvas_height == 0 {
        return Err(DemuxError::InvalidParam(String::from(
            "Zero canvas dimension in VP8X chunk",
        )));
    }
    if canvas_width > MAX_CANVAS_SIZE {
        warn!("canvas width is out of range in VP8X chunk");
    }
    if canvas_height > MAX_CANVAS_SIZE {
        warn!("canvas height is out of range in VP8X chunk");
    }
    if u64::from(canvas_width) * u64::from(canvas_height) > MAX_IMAGE_AREA {
        warn!("canvas area is out of range in VP8X chunk");
    }
    info.feature_flags = flags;
    info.canvas_width = canvas_width;
    info.canvas_height = canvas_height;
    info.has_alpha_flag = flags & ALPHA_FLAG != 0;
    info.has_animation = flags & ANIMATION_FLAG != 0;
    info.has_iccp = flags & ICCP_FLAG != 0;
    info.has_exif = flags & EXIF_FLAG != 0;
    info.has_xmp = flags & XMP_FLAG != 0;
    info.mark(ChunkId::VP8X);
    debug!(
        "VP8X: canvas {}x{}, flags {:#06x}",
        canvas_width, canvas_height, flags
    );
    Ok(())
}

fn process_anim_chunk(chunk: &ChunkData<'_>, info: &mut WebpInfo) -> Result<(), DemuxError> {
    if info.count(ChunkId::VP8X) == 0 {
        return Err(DemuxError::ParseError(String::from(
            "ANIM chunk detected before VP8X chunk",
        )));
    }
    if chunk.size != ANIM_CHUNK_SIZE {
        return Err(DemuxError::ParseError(String::from("Corrupted ANIM chunk")));
    }
    info.mark(ChunkId::ANIM);
    if info.count(ChunkId::ANIM) > 1 {
        return Err(DemuxError::ParseError(String::from(
            "Multiple ANIM chunks detected",
        )));
    }
    let mut r = SliceReader::new(chunk.payload);
    let mut background_color = [0u8; 4];
    background_color.copy_from_slice(r.take_slice(4)?);
    let loop_count = r.read_u16_le()?;
    info.background_color = background_color;
    info.loop_count = loop_count.into();
    debug!(
        "ANIM: background {:?}, loop count {}",
        background_color, info.loop_count
    );
    Ok(())
}

fn process_anmf_chunk(chunk: &ChunkData<'_>, info: &mut WebpInfo) -> Result<(), DemuxError> {
    if info.count(ChunkId::ANIM) == 0 {
        return Err(DemuxError::ParseError(String::from(
            "ANMF chunk detected before ANIM chunk",
        )));
    }
    if chunk.size <= ANMF_CHUNK_SIZE {
        return Err(DemuxError::TruncatedData(String::from(
            "Truncated data detected when parsing ANMF chunk",
        )));
    }
    // RIFF pads odd payloads, but an ANMF payload is a chunk sequence and
    // must already be even.
    if chunk.size & 1 != 0 {
        return Err(DemuxError::ParseError(String::from(
            "ANMF chunk size should always be even",
        )));
    }
    info.mark(ChunkId::ANMF);

    let mut r = SliceReader::new(chunk.payload);
    let x_offset = 2 * r.read_u24_le()?;
    let y_offset = 2 * r.read_u24_le()?;
    let width = 1 + r.read_u24_le()?;
    let height = 1 + r.read_u24_le()?;
    let duration_ms = r.read_u24_le()?;
    let flags = r.read_u8()?;
    let dispose = if flags & 1 != 0 {
        DisposeMethod::Background
    } else {
        DisposeMethod::None
    };
    let blend = if flags & 2 != 0 {
        BlendMethod::Overwrite
    } else {
        BlendMethod::AlphaBlend
    };
    if x_offset > MAX_POSITION_OFFSET || y_offset > MAX_POSITION_OFFSET {
        return Err(DemuxError::InvalidParam(String::from(
            "Invalid offset parameters in ANMF chunk",
        )));
    }
    if x_offset + width > info.canvas_width || y_offset + height > info.canvas_height {
        return Err(DemuxError::InvalidParam(String::from(
            "Frame exceeds canvas in ANMF chunk",
        )));
    }
    debug!(
        "ANMF: frame {}x{} at ({},{}), duration {}ms",
        width, height, x_offset, y_offset, duration_ms
    );

    let mut scope = FrameScope {
        x_offset,
        y_offset,
        width,
        height,
        duration_ms,
        dispose,
        blend,
        seen_alpha: false,
        seen_image: false,
        is_lossy: false,
        has_alpha: false,
        bitstream: None,
        alpha: None,
    };

    // The sub-chunk sequence after the 16-byte frame header is walked with
    // the same machinery as the top level.
    let mut sub = SliceReader::new(&chunk.payload[ANMF_CHUNK_SIZE..]);
    let sub_base = chunk.payload_offset() + ANMF_CHUNK_SIZE;
    walk_chunks(&mut sub, sub_base, |sub_chunk| {
        process_frame_subchunk(sub_chunk, info, &mut scope)
    })?;

    info.frames.push(scope.finish()?);
    info.frame_count += 1;
    Ok(())
}

/// Dispatch for chunks nested inside one ANMF payload.
fn process_frame_subchunk(
    chunk: &ChunkData<'_>,
    info: &mut WebpInfo,
    scope: &mut FrameScope,
) -> Result<(), DemuxError> {
    match chunk.id {
        ChunkId::VP8 | ChunkId::VP8L => process_frame_image(chunk, info, scope),
        ChunkId::ALPH => process_frame_alpha(chunk, info, scope),
        ChunkId::Unknown(fourcc) => {
            warn!(
                "unknown sub-chunk {:?} in ANMF chunk at offset {}",
                fourcc, chunk.offset
            );
            info.mark(chunk.id);
            Ok(())
        }
        other => Err(DemuxError::ParseError(format!(
            "Unexpected {:?} chunk inside an ANMF chunk",
            other
        ))),
    }
}

fn process_frame_image(
    chunk: &ChunkData<'_>,
    info: &mut WebpInfo,
    scope: &mut FrameScope,
) -> Result<(), DemuxError> {
    if scope.seen_image {
        return Err(DemuxError::ParseError(String::from(
            "Consecutive VP8/VP8L sub-chunks in an ANMF chunk",
        )));
    }
    let is_lossy = chunk.id == ChunkId::VP8;
    if !is_lossy && scope.seen_alpha {
        return Err(DemuxError::ParseError(String::from(
            "Both VP8L and ALPH sub-chunks are present in an ANMF chunk",
        )));
    }
    let features = probe_features(chunk.payload, is_lossy)?;
    if features.width != scope.width || features.height != scope.height {
        return Err(DemuxError::ParseError(String::from(
            "Frame size in VP8/VP8L sub-chunk differs from ANMF header",
        )));
    }
    scope.seen_image = true;
    scope.is_lossy = is_lossy;
    scope.has_alpha |= features.has_alpha || scope.seen_alpha;
    scope.bitstream = Some(chunk.payload_range());
    info.seen_alpha |= features.has_alpha;
    info.anmf_subchunk_counts[if is_lossy { 0 } else { 1 }] += 1;
    Ok(())
}

fn process_frame_alpha(
    chunk: &ChunkData<'_>,
    info: &mut WebpInfo,
    scope: &mut FrameScope,
) -> Result<(), DemuxError> {
    if scope.seen_alpha {
        return Err(DemuxError::ParseError(String::from(
            "Consecutive ALPH sub-chunks in an ANMF chunk",
        )));
    }
    if scope.seen_image {
        return Err(DemuxError::ParseError(String::from(
            "ALPH sub-chunk detected after VP8 sub-chunk in an ANMF chunk",
        )));
    }
    parse_alpha_header(chunk)?;
    scope.seen_alpha = true;
    scope.has_alpha = true;
    scope.alpha = Some(chunk.payload_range());
    info.seen_alpha = true;
    info.anmf_subchunk_counts[2] += 1;
    Ok(())
}

fn process_image_chunk(chunk: &ChunkData<'_>, info: &mut WebpInfo) -> Result<(), DemuxError> {
    if info.count(ChunkId::VP8) > 0 || info.count(ChunkId::VP8L) > 0 {
        return Err(DemuxError::ParseError(String::from(
            "Multiple VP8/VP8L chunks detected",
        )));
    }
    if info.count(ChunkId::ANIM) > 0 || info.count(ChunkId::ANMF) > 0 {
        return Err(DemuxError::ParseError(String::from(
            "VP8/VP8L chunk and ANIM/ANMF chunk are both detected",
        )));
    }
    let is_lossy = chunk.id == ChunkId::VP8;
    if !is_lossy && info.count(ChunkId::ALPH) > 0 {
        warn!("both VP8L and ALPH chunks are detected");
    }
    let features = probe_features(chunk.payload, is_lossy)?;
    if info.count(ChunkId::VP8X) > 0 {
        if info.canvas_width != features.width || info.canvas_height != features.height {
            return Err(DemuxError::ParseError(String::from(
                "Image size in VP8/VP8L chunk differs from VP8X chunk",
            )));
        }
    } else {
        info.canvas_width = features.width;
        info.canvas_height = features.height;
        if info.canvas_width > MAX_CANVAS_SIZE
            || info.canvas_height > MAX_CANVAS_SIZE
            || u64::from(info.canvas_width) * u64::from(info.canvas_height) > MAX_IMAGE_AREA
        {
            warn!("image size in VP8/VP8L chunk is out of range");
        }
    }
    info.mark(chunk.id);
    info.seen_alpha |= features.has_alpha;
    info.frames.push(FrameRecord {
        x_offset: 0,
        y_offset: 0,
        width: features.width,
        height: features.height,
        duration_ms: 0,
        dispose: DisposeMethod::None,
        blend: BlendMethod::Overwrite,
        has_alpha: features.has_alpha || info.single_alpha.is_some(),
        is_lossy,
        bitstream: chunk.payload_range(),
        alpha: info.single_alpha.clone(),
    });
    info.frame_count += 1;
    debug!(
        "{:?}: {}x{}, {}",
        chunk.id,
        features.width,
        features.height,
        if is_lossy { "lossy" } else { "lossless" }
    );
    Ok(())
}

fn process_alph_chunk(chunk: &ChunkData<'_>, info: &mut WebpInfo) -> Result<(), DemuxError> {
    if info.count(ChunkId::ANIM) > 0 || info.count(ChunkId::ANMF) > 0 {
        return Err(DemuxError::ParseError(String::from(
            "ALPHA chunk and ANIM/ANMF chunk are both detected",
        )));
    }
    if info.count(ChunkId::VP8X) == 0 {
        return Err(DemuxError::ParseError(String::from(
            "ALPHA chunk detected before VP8X chunk",
        )));
    }
    if info.count(ChunkId::VP8) > 0 {
        return Err(DemuxError::ParseError(String::from(
            "ALPHA chunk detected after VP8 chunk",
        )));
    }
    if info.count(ChunkId::ALPH) > 0 {
        return Err(DemuxError::ParseError(String::from(
            "Multiple ALPHA chunks detected",
        )));
    }
    parse_alpha_header(chunk)?;
    info.mark(ChunkId::ALPH);
    info.seen_alpha = true;
    info.single_alpha = Some(chunk.payload_range());
    Ok(())
}

/// Validate the 1-byte ALPH header: 2-bit compression method, 2-bit filter,
/// 2-bit pre-processing, 2 reserved bits.
fn parse_alpha_header(chunk: &ChunkData<'_>) -> Result<(), DemuxError> {
    if chunk.size <= ALPHA_HEADER_LEN {
        return Err(DemuxError::TruncatedData(String::from(
            "Truncated ALPH chunk",
        )));
    }
    let header = chunk.payload[0];
    let compression = header & 0x03;
    let filter = (header >> 2) & 0x03;
    let pre_processing = (header >> 4) & 0x03;
    let reserved = (header >> 6) & 0x03;
    if compression > 1 {
        return Err(DemuxError::BitstreamError(String::from(
            "Invalid alpha compression method",
        )));
    }
    if pre_processing > ALPHA_PREPROCESSED_LEVELS {
        return Err(DemuxError::BitstreamError(String::from(
            "Invalid alpha pre-processing method",
        )));
    }
    if reserved != 0 {
        warn!("reserved bits in ALPH chunk header are not all zero");
    }
    debug!(
        "ALPH: compression {}, filter {}, pre-processing {}",
        compression, filter, pre_processing
    );
    Ok(())
}

fn process_iccp_chunk(chunk: &ChunkData<'_>, info: &mut WebpInfo) -> Result<(), DemuxError> {
    if info.count(ChunkId::VP8X) == 0 {
        return Err(DemuxError::ParseError(String::from(
            "ICCP chunk detected before VP8X chunk",
        )));
    }
    if info.count(ChunkId::VP8) > 0 || info.count(ChunkId::VP8L) > 0 || info.count(ChunkId::ANIM) > 0
    {
        return Err(DemuxError::ParseError(String::from(
            "ICCP chunk detected after image data",
        )));
    }
    if chunk.size == 0 {
        return Err(DemuxError::ParseError(String::from("Empty ICCP chunk")));
    }
    info.mark(ChunkId::ICCP);
    info.metadata_ranges
        .entry(ChunkId::ICCP)
        .or_insert_with(|| chunk.payload_range());
    Ok(())
}

fn process_metadata_chunk(chunk: &ChunkData<'_>, info: &mut WebpInfo) -> Result<(), DemuxError> {
    if chunk.size == 0 {
        return Err(DemuxError::ParseError(format!(
            "Empty {:?} chunk",
            chunk.id
        )));
    }
    info.mark(chunk.id);
    info.metadata_ranges
        .entry(chunk.id)
        .or_insert_with(|| chunk.payload_range());
    Ok(())
}
