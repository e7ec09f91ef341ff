//! Zero-copy WebP frame demuxer.
//!
//! [`WebpDemuxer`] runs the info pass once over a borrowed byte buffer, then
//! serves individual frame payloads as borrowed fragments without decoding
//! pixels.
//!
//! # Example
//!
//! ```rust,no_run
//! use webpdemux::WebpDemuxer;
//!
//! let data: &[u8] = &[]; // your WebP data
//! let mut demuxer = WebpDemuxer::new(data)?;
//! println!(
//!     "{}x{}, {} frame(s)",
//!     demuxer.canvas_width(),
//!     demuxer.canvas_height(),
//!     demuxer.frame_count()
//! );
//! let fragment = demuxer.frame_fragment(0)?;
//! println!("frame 0: {} bitstream bytes", fragment.bitstream.len());
//! demuxer.release();
//! # Ok::<(), webpdemux::DemuxError>(())
//! ```

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::chunk::ChunkId;
use super::error::DemuxError;
use super::info::{
    BlendMethod, DisposeMethod, LoopCount, WebpInfo, DEFAULT_FRAME_DELAY, MIN_FRAME_DELAY,
};
use super::walker::parse_info;

/// One frame's compressed payload and metadata, borrowed from the source
/// buffer.
///
/// The `bitstream` field contains the raw VP8 or VP8L data (without RIFF
/// framing). For lossy frames with separate alpha, `alpha_data` contains the
/// raw ALPH chunk payload.
#[derive(Debug, Clone)]
pub struct FrameFragment<'a> {
    /// 0-based frame index.
    pub frame_index: u32,
    /// Horizontal offset of the frame on the canvas (always even).
    pub x_offset: u32,
    /// Vertical offset of the frame on the canvas (always even).
    pub y_offset: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Declared frame duration in milliseconds (raw 24-bit value).
    pub duration_ms: u32,
    /// How the frame area is disposed after rendering.
    pub dispose: DisposeMethod,
    /// How the frame is blended onto the canvas.
    pub blend: BlendMethod,
    /// Whether the frame carries alpha data.
    pub has_alpha: bool,
    /// Whether the frame uses lossy (VP8) encoding. `false` means VP8L.
    pub is_lossy: bool,
    /// Raw VP8 or VP8L bitstream data for this frame.
    pub bitstream: &'a [u8],
    /// Raw ALPH chunk payload, if present.
    pub alpha_data: Option<&'a [u8]>,
}

impl FrameFragment<'_> {
    /// The display delay for this frame, with declared delays below
    /// [`MIN_FRAME_DELAY`] substituted by [`DEFAULT_FRAME_DELAY`].
    pub fn frame_delay_ms(&self) -> u32 {
        if self.duration_ms < MIN_FRAME_DELAY {
            DEFAULT_FRAME_DELAY
        } else {
            self.duration_ms
        }
    }
}

/// Stateful frame demuxer over a parsed WebP buffer.
///
/// Construction runs the full info pass; on failure no handle exists, so a
/// corrupt handle is unrepresentable. The handle borrows the source buffer
/// for its lifetime, so the owner cannot free or mutate it underneath, and
/// must be explicitly [`release`](Self::release)d (or consumed by
/// [`close`](crate::close)) when done. Frame extraction takes `&mut self`
/// because it advances the handle's fragment cursor; callers that need
/// concurrent extraction must serialize access or open one demuxer per
/// thread.
pub struct WebpDemuxer<'a> {
    data: &'a [u8],
    info: WebpInfo,
    /// Offset and size of the fragment most recently located.
    cursor: Option<(usize, usize)>,
    released: bool,
}

impl<'a> WebpDemuxer<'a> {
    /// Parse a WebP buffer and build a demuxer over it.
    ///
    /// Runs the complete info pass (chunk walk plus validation); any parse
    /// failure is returned as the specific [`DemuxError`] status.
    pub fn new(data: &'a [u8]) -> Result<Self, DemuxError> {
        let info = parse_info(data)?;
        Ok(Self {
            data,
            info,
            cursor: None,
            released: false,
        })
    }

    /// The accumulated container metadata.
    pub fn info(&self) -> &WebpInfo {
        &self.info
    }

    /// Canvas width in pixels.
    pub fn canvas_width(&self) -> u32 {
        self.info.canvas_width()
    }

    /// Canvas height in pixels.
    pub fn canvas_height(&self) -> u32 {
        self.info.canvas_height()
    }

    /// Number of frames located by the info pass.
    pub fn frame_count(&self) -> u32 {
        self.info.frame_count()
    }

    /// Loop count for animated images.
    pub fn loop_count(&self) -> LoopCount {
        self.info.loop_count()
    }

    /// Background color for animated images (BGRA byte order as stored).
    pub fn background_color(&self) -> [u8; 4] {
        self.info.background_color()
    }

    /// Whether the image is animated.
    pub fn is_animated(&self) -> bool {
        self.info.is_animated()
    }

    /// Whether the image declares or carries alpha.
    pub fn has_alpha(&self) -> bool {
        self.info.has_alpha()
    }

    /// Whether this demuxer has been released.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Offset and size within the source buffer of the fragment most
    /// recently located by [`frame_fragment`](Self::frame_fragment), if any.
    pub fn last_fragment(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    /// Locate the compressed payload of frame `index` (0-based).
    ///
    /// An index at or past [`frame_count`](Self::frame_count) is
    /// [`DemuxError::InvalidParam`]; calling after
    /// [`release`](Self::release) is [`DemuxError::InvalidCommand`].
    pub fn frame_fragment(&mut self, index: u32) -> Result<FrameFragment<'a>, DemuxError> {
        if self.released {
            return Err(DemuxError::InvalidCommand(String::from(
                "Demuxer used after release",
            )));
        }
        let record = self.info.frames.get(index as usize).cloned().ok_or_else(|| {
            DemuxError::InvalidParam(format!(
                "Frame index {} out of range (total: {})",
                index,
                self.info.frame_count()
            ))
        })?;
        self.cursor = Some((record.bitstream.start, record.bitstream.len()));
        Ok(FrameFragment {
            frame_index: index,
            x_offset: record.x_offset,
            y_offset: record.y_offset,
            width: record.width,
            height: record.height,
            duration_ms: record.duration_ms,
            dispose: record.dispose,
            blend: record.blend,
            has_alpha: record.has_alpha,
            is_lossy: record.is_lossy,
            bitstream: &self.data[record.bitstream.clone()],
            alpha_data: record.alpha.clone().map(|r| &self.data[r]),
        })
    }

    /// ICC profile payload, if present and not released.
    pub fn icc_profile(&self) -> Option<&'a [u8]> {
        self.metadata(ChunkId::ICCP)
    }

    /// EXIF metadata payload, if present and not released.
    pub fn exif(&self) -> Option<&'a [u8]> {
        self.metadata(ChunkId::EXIF)
    }

    /// XMP metadata payload, if present and not released.
    pub fn xmp(&self) -> Option<&'a [u8]> {
        self.metadata(ChunkId::XMP)
    }

    fn metadata(&self, id: ChunkId) -> Option<&'a [u8]> {
        if self.released {
            return None;
        }
        self.info.metadata_range(id).map(|r| &self.data[r])
    }

    /// Release the demuxer, dropping its reference to the source buffer and
    /// its frame table.
    ///
    /// Idempotent: releasing twice is a no-op, not an error. After release,
    /// frame extraction is rejected with [`DemuxError::InvalidCommand`].
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.data = &[];
        self.cursor = None;
        self.info.frames = Vec::new();
        self.info.metadata_ranges.clear();
    }
}
