//! The container metadata accumulator and its post-walk validation.

use alloc::string::String;
use alloc::vec::Vec;
use core::num::NonZeroU16;
use core::ops::Range;

use hashbrown::HashMap;
use log::warn;

use super::chunk::{ChunkId, CHUNK_KINDS};
use super::error::DemuxError;

// VP8X feature flag bits, per the WebP extended-header layout.
pub(crate) const ANIMATION_FLAG: u32 = 0x0000_0002;
pub(crate) const XMP_FLAG: u32 = 0x0000_0004;
pub(crate) const EXIF_FLAG: u32 = 0x0000_0008;
pub(crate) const ALPHA_FLAG: u32 = 0x0000_0010;
pub(crate) const ICCP_FLAG: u32 = 0x0000_0020;

/// Frame delays below this many milliseconds are reported as
/// [`DEFAULT_FRAME_DELAY`] by [`FrameFragment::frame_delay_ms`].
///
/// [`FrameFragment::frame_delay_ms`]: super::demuxer::FrameFragment::frame_delay_ms
pub const MIN_FRAME_DELAY: u32 = 20;
/// The substitute delay for frames declaring less than [`MIN_FRAME_DELAY`].
pub const DEFAULT_FRAME_DELAY: u32 = 100;

/// Number of times that an animation loops.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoopCount {
    /// The animation loops forever.
    Forever,
    /// The animation is played the specified number of times.
    Times(NonZeroU16),
}

impl From<u16> for LoopCount {
    fn from(n: u16) -> Self {
        match NonZeroU16::new(n) {
            None => LoopCount::Forever,
            Some(n) => LoopCount::Times(n),
        }
    }
}

impl core::fmt::Display for LoopCount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LoopCount::Forever => f.write_str("infinite"),
            LoopCount::Times(n) => write!(f, "{} time{}", n, if n.get() == 1 { "" } else { "s" }),
        }
    }
}

/// How the frame area is disposed after rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeMethod {
    /// Do not dispose. The frame remains on the canvas.
    None,
    /// Fill the frame rectangle with the background color.
    Background,
}

/// How the frame is blended with the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMethod {
    /// Use alpha blending with the existing canvas content.
    AlphaBlend,
    /// Overwrite the canvas region with the frame data.
    Overwrite,
}

/// One frame located during the info pass: its region, timing, and the byte
/// ranges of its compressed payload within the source buffer.
#[derive(Debug, Clone)]
pub(crate) struct FrameRecord {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
    pub duration_ms: u32,
    pub dispose: DisposeMethod,
    pub blend: BlendMethod,
    pub has_alpha: bool,
    pub is_lossy: bool,
    pub bitstream: Range<usize>,
    pub alpha: Option<Range<usize>>,
}

/// Container metadata accumulated by the info pass.
///
/// Produced once by [`parse_info`](crate::parse_info) (or internally by
/// [`WebpDemuxer::new`](super::demuxer::WebpDemuxer::new)) and read-only
/// afterward. Scratch state for the animation frame currently being parsed
/// lives in a local scope inside the ANMF processor, never here.
#[derive(Debug, Clone)]
pub struct WebpInfo {
    pub(crate) canvas_width: u32,
    pub(crate) canvas_height: u32,
    pub(crate) loop_count: LoopCount,
    pub(crate) background_color: [u8; 4],
    pub(crate) frame_count: u32,
    pub(crate) riff_size: u32,
    pub(crate) feature_flags: u32,
    pub(crate) has_animation: bool,
    pub(crate) has_alpha_flag: bool,
    pub(crate) has_iccp: bool,
    pub(crate) has_exif: bool,
    pub(crate) has_xmp: bool,
    /// Alpha actually observed in an ALPH chunk or a VP8L header.
    pub(crate) seen_alpha: bool,
    pub(crate) chunk_counts: [u32; CHUNK_KINDS],
    /// ANMF sub-chunk occurrences: 0 = VP8, 1 = VP8L, 2 = ALPH.
    pub(crate) anmf_subchunk_counts: [u32; 3],
    /// Payload byte ranges for metadata chunks (ICCP, EXIF, XMP).
    pub(crate) metadata_ranges: HashMap<ChunkId, Range<usize>>,
    /// ALPH payload range for a non-animated image, pending its VP8 chunk.
    pub(crate) single_alpha: Option<Range<usize>>,
    pub(crate) frames: Vec<FrameRecord>,
}

impl WebpInfo {
    pub(crate) fn new(riff_size: u32) -> Self {
        Self {
            canvas_width: 0,
            canvas_height: 0,
            loop_count: LoopCount::Forever,
            background_color: [0; 4],
            frame_count: 0,
            riff_size,
            feature_flags: 0,
            has_animation: false,
            has_alpha_flag: false,
            has_iccp: false,
            has_exif: false,
            has_xmp: false,
            seen_alpha: false,
            chunk_counts: [0; CHUNK_KINDS],
            anmf_subchunk_counts: [0; 3],
            metadata_ranges: HashMap::new(),
            single_alpha: None,
            frames: Vec::new(),
        }
    }

    pub(crate) fn count(&self, id: ChunkId) -> u32 {
        self.chunk_counts[id.slot()]
    }

    pub(crate) fn mark(&mut self, id: ChunkId) {
        self.chunk_counts[id.slot()] += 1;
    }

    /// Canvas width in pixels.
    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    /// Canvas height in pixels.
    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    /// Number of frames located by the info pass. A non-animated image has
    /// exactly one; a bare extended header without image data has zero.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Loop count for animated images.
    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    /// Background color for animated images (BGRA byte order as stored).
    pub fn background_color(&self) -> [u8; 4] {
        self.background_color
    }

    /// Declared RIFF payload size from the container header.
    pub fn riff_size(&self) -> u32 {
        self.riff_size
    }

    /// The raw VP8X feature flag bits, or zero without a VP8X chunk.
    pub fn feature_flags(&self) -> u32 {
        self.feature_flags
    }

    /// Whether the image is animated.
    pub fn is_animated(&self) -> bool {
        self.has_animation
    }

    /// Whether alpha was declared (VP8X flag) or observed (ALPH chunk or
    /// VP8L header bit).
    pub fn has_alpha(&self) -> bool {
        self.has_alpha_flag || self.seen_alpha
    }

    /// Whether an ICC profile chunk is present.
    pub fn has_iccp(&self) -> bool {
        self.has_iccp
    }

    /// Whether EXIF metadata is declared.
    pub fn has_exif(&self) -> bool {
        self.has_exif
    }

    /// Whether XMP metadata is declared.
    pub fn has_xmp(&self) -> bool {
        self.has_xmp
    }

    /// How many chunks of the given kind were observed. All unrecognized
    /// chunks share the `ChunkId::Unknown` counter regardless of tag.
    pub fn chunk_count(&self, id: ChunkId) -> u32 {
        self.count(id)
    }

    /// ANMF sub-chunk occurrences observed during the walk, in the order
    /// VP8, VP8L, ALPH.
    pub fn anmf_subchunk_counts(&self) -> [u32; 3] {
        self.anmf_subchunk_counts
    }

    /// The payload byte range of a metadata chunk (ICCP, EXIF, or XMP)
    /// within the source buffer, if that chunk was observed.
    pub fn metadata_range(&self, id: ChunkId) -> Option<Range<usize>> {
        self.metadata_ranges.get(&id).cloned()
    }

    /// Post-walk consistency checks across the accumulated metadata.
    ///
    /// Violations are reported, never silently fixed up: a chunk required by
    /// the declared flags that was never observed is `MissingData`; declared
    /// values inconsistent with observed structure are `InvalidParam`.
    pub(crate) fn validate(&self) -> Result<(), DemuxError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(DemuxError::MissingData(String::from(
                "No chunk established canvas dimensions",
            )));
        }
        if self.count(ChunkId::VP8X) == 0 {
            // Simple format: a single top-level image chunk, already policed
            // by the image processor.
            return Ok(());
        }
        if self.seen_alpha && !self.has_alpha_flag {
            return Err(DemuxError::InvalidParam(String::from(
                "Unexpected alpha data with alpha flag clear",
            )));
        }
        if self.has_alpha_flag && !self.seen_alpha {
            warn!("alpha flag is set with no alpha data present");
        }
        if self.has_exif && self.count(ChunkId::EXIF) == 0 {
            return Err(DemuxError::MissingData(String::from("Missing EXIF chunk")));
        }
        if self.has_xmp && self.count(ChunkId::XMP) == 0 {
            return Err(DemuxError::MissingData(String::from("Missing XMP chunk")));
        }
        if !self.has_iccp && self.count(ChunkId::ICCP) > 0 {
            return Err(DemuxError::InvalidParam(String::from(
                "Unexpected ICCP chunk detected",
            )));
        }
        if !self.has_exif && self.count(ChunkId::EXIF) > 0 {
            return Err(DemuxError::InvalidParam(String::from(
                "Unexpected EXIF chunk detected",
            )));
        }
        if !self.has_xmp && self.count(ChunkId::XMP) > 0 {
            return Err(DemuxError::InvalidParam(String::from(
                "Unexpected XMP chunk detected",
            )));
        }
        if self.has_animation {
            if self.count(ChunkId::ANIM) != 1 || self.frame_count < 1 {
                return Err(DemuxError::MissingData(String::from(
                    "No ANIM/ANMF chunk detected in animation file",
                )));
            }
        } else if self.frame_count > 1 {
            return Err(DemuxError::InvalidParam(String::from(
                "More than 1 frame detected in non-animation file",
            )));
        }
        Ok(())
    }
}
