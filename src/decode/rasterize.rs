//! Frame rasterization into caller-supplied pixel buffers.
//!
//! [`rasterize`] drives an opaque [`PixelDecoder`] to turn a demuxed
//! [`FrameFragment`] into scaled RGBA pixels, written in place into a
//! [`DecodeTarget`] the caller owns. The core never allocates the output
//! buffer.
//!
//! # Example
//!
//! ```rust,no_run
//! use webpdemux::{rasterize, DecodeTarget, PixelDecoder, WebpDemuxer};
//!
//! # struct NullDecoder;
//! # impl PixelDecoder for NullDecoder {
//! #     fn decode(
//! #         &self,
//! #         _fragment: &webpdemux::FrameFragment<'_>,
//! #         _options: &webpdemux::DecodeOptions,
//! #         _target: &mut DecodeTarget<'_>,
//! #     ) -> Result<(), webpdemux::DemuxError> {
//! #         Ok(())
//! #     }
//! # }
//! let decoder = NullDecoder; // your VP8/VP8L pixel decoder
//! let data: &[u8] = &[]; // your WebP data
//! let mut demuxer = WebpDemuxer::new(data)?;
//! let fragment = demuxer.frame_fragment(0)?;
//!
//! let mut pixels = vec![0u8; (fragment.width * fragment.height * 4) as usize];
//! let mut target = DecodeTarget::new(&mut pixels, fragment.width, fragment.height);
//! rasterize(&decoder, &fragment, &mut target)?;
//! # Ok::<(), webpdemux::DemuxError>(())
//! ```

use alloc::format;
use alloc::string::{String, ToString};

use log::debug;

use super::bitstream::{probe_features, BitstreamFeatures};
use crate::demux::{DemuxError, FrameFragment};

/// RGBA byte layouts the rasterizer can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorLayout {
    /// Interleaved RGBA with straight (non-premultiplied) alpha.
    Rgba,
    /// Interleaved RGBA with color channels premultiplied by alpha
    /// ("rgbA"). The default, matching the compositing-friendly output the
    /// frame pipeline expects.
    #[default]
    RgbaPremultiplied,
}

/// Decode options handed to the pixel-decode primitive.
///
/// [`rasterize`] fills these from its fixed defaults plus the target's
/// scale factors: no vertical flip, in-loop filtering bypassed, fancy
/// chroma upsampling disabled, scaling enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Flip the output vertically.
    pub flip_vertically: bool,
    /// Skip the in-loop deblocking filter.
    pub bypass_filtering: bool,
    /// Use fancy (bilinear) chroma upsampling.
    pub fancy_upsampling: bool,
    /// Scale the output to `scaled_width` x `scaled_height`.
    pub use_scaling: bool,
    /// Output width when scaling.
    pub scaled_width: u32,
    /// Output height when scaling.
    pub scaled_height: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            flip_vertically: false,
            bypass_filtering: true,
            fancy_upsampling: false,
            use_scaling: false,
            scaled_width: 0,
            scaled_height: 0,
        }
    }
}

/// A caller-owned pixel buffer descriptor.
///
/// The rasterizer only validates the descriptor and writes
/// `height * stride` bytes through `pixels`; allocation and lifetime are
/// the caller's business.
pub struct DecodeTarget<'a> {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Row stride in bytes.
    pub stride: u32,
    /// Requested RGBA byte layout.
    pub layout: ColorLayout,
    /// Width the decoder should scale the frame to.
    pub scale_width: u32,
    /// Height the decoder should scale the frame to.
    pub scale_height: u32,
    /// The output pixel bytes; must hold at least `height * stride` bytes.
    pub pixels: &'a mut [u8],
}

impl<'a> DecodeTarget<'a> {
    /// Build a target over `pixels` with a packed 4-byte-per-pixel stride
    /// and scale factors equal to the output dimensions.
    pub fn new(pixels: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stride: width * 4,
            layout: ColorLayout::default(),
            scale_width: width,
            scale_height: height,
            pixels,
        }
    }

    /// Set a row stride in bytes.
    #[must_use]
    pub fn stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    /// Set the dimensions the decoder should scale the frame to.
    #[must_use]
    pub fn scale(mut self, width: u32, height: u32) -> Self {
        self.scale_width = width;
        self.scale_height = height;
        self
    }

    /// Set the RGBA byte layout.
    #[must_use]
    pub fn layout(mut self, layout: ColorLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// The opaque pixel-decode primitive.
///
/// Implementations decode a frame's VP8/VP8L payload (and separate alpha
/// plane, when present) into interleaved RGBA, honoring the options and
/// writing exactly `target.height * target.stride` bytes into
/// `target.pixels`. The entropy decoding itself is outside this crate.
pub trait PixelDecoder {
    /// Extract the intrinsic codestream width/height and alpha bit from the
    /// fragment's fixed header.
    fn probe_features(&self, fragment: &FrameFragment<'_>) -> Result<BitstreamFeatures, DemuxError> {
        probe_features(fragment.bitstream, fragment.is_lossy)
    }

    /// Decode the fragment into the target buffer.
    fn decode(
        &self,
        fragment: &FrameFragment<'_>,
        options: &DecodeOptions,
        target: &mut DecodeTarget<'_>,
    ) -> Result<(), DemuxError>;
}

/// A platform pixel-buffer collaborator (a bitmap or surface).
///
/// The buffer must be locked before its bytes are written and unlocked
/// afterwards; [`rasterize_into`] brackets the decode with exactly that
/// discipline, unlocking on every path including failure.
pub trait PixelBuffer {
    /// Buffer width in pixels.
    fn width(&self) -> u32;
    /// Buffer height in pixels.
    fn height(&self) -> u32;
    /// Row stride in bytes.
    fn stride(&self) -> u32;
    /// Lock the buffer and expose its bytes for writing.
    fn lock(&mut self) -> Result<&mut [u8], DemuxError>;
    /// Unlock a previously locked buffer.
    fn unlock(&mut self);
}

fn bitstream_status(err: DemuxError) -> DemuxError {
    match err {
        DemuxError::BitstreamError(_) => err,
        other => DemuxError::BitstreamError(other.to_string()),
    }
}

/// Decode one frame fragment into a caller-supplied target.
///
/// Probes the fragment's intrinsic features first (any probe failure is a
/// [`DemuxError::BitstreamError`]); a zero-dimension or undersized target is
/// [`DemuxError::InvalidParam`] and nothing is written. On success the
/// decoder has written exactly `target.height * target.stride` bytes.
pub fn rasterize<D: PixelDecoder + ?Sized>(
    decoder: &D,
    fragment: &FrameFragment<'_>,
    target: &mut DecodeTarget<'_>,
) -> Result<(), DemuxError> {
    let features = decoder.probe_features(fragment).map_err(bitstream_status)?;
    if target.width == 0 || target.height == 0 {
        return Err(DemuxError::InvalidParam(String::from(
            "Target buffer has a zero dimension",
        )));
    }
    if target.scale_width == 0 || target.scale_height == 0 {
        return Err(DemuxError::InvalidParam(String::from(
            "Target scale has a zero dimension",
        )));
    }
    let required = target.height as usize * target.stride as usize;
    if target.pixels.len() < required {
        return Err(DemuxError::InvalidParam(format!(
            "Target buffer holds {} bytes, needs {}",
            target.pixels.len(),
            required
        )));
    }
    let options = DecodeOptions {
        flip_vertically: false,
        bypass_filtering: true,
        fancy_upsampling: false,
        use_scaling: true,
        scaled_width: target.scale_width,
        scaled_height: target.scale_height,
    };
    debug!(
        "rasterizing {}x{} frame into {}x{} target (stride {})",
        features.width, features.height, target.width, target.height, target.stride
    );
    decoder
        .decode(fragment, &options, target)
        .map_err(bitstream_status)
}

/// Decode one frame fragment into a lockable platform buffer.
///
/// Locks the buffer, rasterizes into the locked bytes at the buffer's own
/// stride and dimensions, and unlocks unconditionally, even when decoding
/// fails. A lock failure is returned as-is; nothing is unlocked that was
/// never locked.
pub fn rasterize_into<D: PixelDecoder + ?Sized, B: PixelBuffer>(
    decoder: &D,
    fragment: &FrameFragment<'_>,
    buffer: &mut B,
    layout: ColorLayout,
) -> Result<(), DemuxError> {
    let (width, height, stride) = (buffer.width(), buffer.height(), buffer.stride());
    let result = match buffer.lock() {
        Ok(pixels) => {
            let mut target = DecodeTarget {
                width,
                height,
                stride,
                layout,
                scale_width: width,
                scale_height: height,
                pixels,
            };
            rasterize(decoder, fragment, &mut target)
        }
        Err(err) => return Err(err),
    };
    buffer.unlock();
    result
}
