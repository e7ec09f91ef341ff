//! WebP container parsing, frame demuxing, and rasterization.
//!
//! This crate walks the RIFF chunk stream of a WebP file, validates its
//! structure, and serves individual frames (animated or static) as
//! borrowed byte fragments, then drives an opaque pixel-decode primitive to
//! write scaled RGBA output into a caller-supplied buffer. The VP8/VP8L
//! entropy decoding itself is not part of this crate: callers plug in a
//! [`PixelDecoder`] implementation.
//!
//! # Features
//!
//! - `std` (default): Enable standard library support.
//!
//! # no_std Support
//!
//! The whole crate works in `no_std` environments (requires `alloc`):
//! ```toml
//! [dependencies]
//! webpdemux = { version = "...", default-features = false }
//! ```
//!
//! All functions take `&[u8]` slices directly - no Read/Seek traits
//! required, and no input bytes are ever copied.
//!
//! # Parsing container metadata
//!
//! ```rust,no_run
//! let webp_data: &[u8] = &[]; // your WebP data
//! let info = webpdemux::parse_info(webp_data)?;
//! println!(
//!     "{}x{}, {} frame(s), animated: {}",
//!     info.canvas_width(),
//!     info.canvas_height(),
//!     info.frame_count(),
//!     info.is_animated()
//! );
//! # Ok::<(), webpdemux::DemuxError>(())
//! ```
//!
//! # Extracting and rasterizing frames
//!
//! ```rust,no_run
//! use webpdemux::{rasterize, DecodeOptions, DecodeTarget, DemuxError, FrameFragment, PixelDecoder};
//!
//! # struct NullDecoder;
//! # impl PixelDecoder for NullDecoder {
//! #     fn decode(
//! #         &self,
//! #         _fragment: &FrameFragment<'_>,
//! #         _options: &DecodeOptions,
//! #         _target: &mut DecodeTarget<'_>,
//! #     ) -> Result<(), DemuxError> {
//! #         Ok(())
//! #     }
//! # }
//! let decoder = NullDecoder; // your VP8/VP8L pixel decoder
//! let webp_data: &[u8] = &[]; // your WebP data
//! let mut demuxer = webpdemux::open(webp_data)?;
//! for index in 0..demuxer.frame_count() {
//!     let fragment = demuxer.frame_fragment(index)?;
//!     let mut pixels = vec![0u8; (fragment.width * fragment.height * 4) as usize];
//!     let mut target = DecodeTarget::new(&mut pixels, fragment.width, fragment.height);
//!     rasterize(&decoder, &fragment, &mut target)?;
//! }
//! webpdemux::close(demuxer);
//! # Ok::<(), webpdemux::DemuxError>(())
//! ```
//!
//! # Safety
//!
//! This crate uses `#![forbid(unsafe_code)]`. Every read of the source
//! buffer is bounds-checked, and malformed input is reported through
//! [`DemuxError`] instead of panicking.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

extern crate alloc;

// Core modules
/// WebP container parsing and frame demuxing.
pub mod demux;
/// Frame rasterization into caller-supplied pixel buffers.
pub mod decode;

// Slice reader utility (used by demux and decode)
mod slice_reader;

// Re-export demux public API
pub use demux::{
    parse_info, BlendMethod, ChunkData, ChunkId, DemuxError, DisposeMethod, FrameFragment,
    LoopCount, WebpDemuxer, WebpInfo, DEFAULT_FRAME_DELAY, MIN_FRAME_DELAY,
};

// Re-export decode public API
pub use decode::{
    probe_features, rasterize, rasterize_into, BitstreamFeatures, ColorLayout, DecodeOptions,
    DecodeTarget, PixelBuffer, PixelDecoder,
};

/// Parse a WebP buffer and build a demuxer handle over it.
///
/// Convenience alias for [`WebpDemuxer::new`]. The buffer must stay alive
/// and unmodified until the handle is released or closed.
pub fn open(data: &[u8]) -> Result<WebpDemuxer<'_>, DemuxError> {
    WebpDemuxer::new(data)
}

/// Release and consume a demuxer handle.
///
/// Equivalent to [`WebpDemuxer::release`] followed by dropping the handle;
/// closing a handle that was already released is a no-op.
pub fn close(mut demuxer: WebpDemuxer<'_>) {
    demuxer.release();
}
