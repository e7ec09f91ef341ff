//! Feature probing of raw VP8/VP8L codestreams.
//!
//! Only the fixed headers are inspected, just enough to extract intrinsic
//! dimensions and the alpha bit. The entropy-coded pixel data beyond the
//! header is never touched; decoding it is the job of a
//! [`PixelDecoder`](super::rasterize::PixelDecoder) implementation.

use alloc::format;
use alloc::string::String;
use byteorder_lite::{ByteOrder, LittleEndian};

use crate::demux::DemuxError;

/// Size of the fixed header within VP8 data.
const VP8_FRAME_HEADER_SIZE: usize = 10;
/// Size of the fixed header within VP8L data.
const VP8L_FRAME_HEADER_SIZE: usize = 5;
/// VP8L signature byte.
const VP8L_MAGIC_BYTE: u8 = 0x2f;
/// VP8 keyframe start code.
const VP8_MAGIC: [u8; 3] = [0x9d, 0x01, 0x2a];

/// Intrinsic properties read from a codestream's fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitstreamFeatures {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Whether the codestream itself carries alpha (VP8L header bit; always
    /// `false` for VP8, whose alpha lives in a separate ALPH chunk).
    pub has_alpha: bool,
    /// Whether the codestream is lossy (VP8) rather than lossless (VP8L).
    pub is_lossy: bool,
}

/// Probe a raw VP8 or VP8L codestream for its intrinsic features.
///
/// `lossy` selects the header layout (`true` for VP8, `false` for VP8L).
/// A header shorter than its fixed size is `TruncatedData`; any signature,
/// version, or consistency failure is `BitstreamError`.
pub fn probe_features(data: &[u8], lossy: bool) -> Result<BitstreamFeatures, DemuxError> {
    if lossy {
        probe_vp8(data)
    } else {
        probe_vp8l(data)
    }
}

fn probe_vp8(data: &[u8]) -> Result<BitstreamFeatures, DemuxError> {
    if data.len() < VP8_FRAME_HEADER_SIZE {
        return Err(DemuxError::TruncatedData(String::from(
            "VP8 bitstream shorter than its frame header",
        )));
    }
    let bits = LittleEndian::read_u24(data);
    let keyframe = bits & 1 == 0;
    if !keyframe {
        return Err(DemuxError::BitstreamError(String::from(
            "Non-keyframe detected in VP8 bitstream",
        )));
    }
    let profile = (bits >> 1) & 7;
    if profile > 3 {
        return Err(DemuxError::BitstreamError(format!(
            "Unknown VP8 profile: {}",
            profile
        )));
    }
    let display = (bits >> 4) & 1;
    if display == 0 {
        return Err(DemuxError::BitstreamError(String::from(
            "VP8 frame is not displayable",
        )));
    }
    let partition0_length = bits >> 5;
    if partition0_length as usize >= data.len() {
        return Err(DemuxError::BitstreamError(String::from(
            "Inconsistent size information in VP8 bitstream",
        )));
    }
    if data[3..6] != VP8_MAGIC {
        return Err(DemuxError::BitstreamError(format!(
            "Invalid VP8 signature: {:x?}",
            &data[3..6]
        )));
    }
    let width = u32::from(LittleEndian::read_u16(&data[6..8]) & 0x3fff);
    let height = u32::from(LittleEndian::read_u16(&data[8..10]) & 0x3fff);
    if width == 0 || height == 0 {
        return Err(DemuxError::BitstreamError(String::from(
            "Zero frame dimensions in VP8 bitstream",
        )));
    }
    Ok(BitstreamFeatures {
        width,
        height,
        has_alpha: false,
        is_lossy: true,
    })
}

fn probe_vp8l(data: &[u8]) -> Result<BitstreamFeatures, DemuxError> {
    if data.len() < VP8L_FRAME_HEADER_SIZE {
        return Err(DemuxError::TruncatedData(String::from(
            "VP8L bitstream shorter than its frame header",
        )));
    }
    if data[0] != VP8L_MAGIC_BYTE {
        return Err(DemuxError::BitstreamError(format!(
            "Invalid VP8L signature: {:#04x}",
            data[0]
        )));
    }
    let header = LittleEndian::read_u32(&data[1..5]);
    let version = header >> 29;
    if version != 0 {
        return Err(DemuxError::BitstreamError(format!(
            "Unsupported VP8L version: {}",
            version
        )));
    }
    let width = (header & 0x3fff) + 1;
    let height = ((header >> 14) & 0x3fff) + 1;
    let has_alpha = (header >> 28) & 1 != 0;
    Ok(BitstreamFeatures {
        width,
        height,
        has_alpha,
        is_lossy: false,
    })
}
