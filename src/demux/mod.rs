//! WebP container parsing and frame demuxing.
//!
//! This module provides two passes over a WebP byte buffer:
//!
//! - **Info** ([`parse_info`]): walk the RIFF chunk stream, validate its
//!   structure, and accumulate container metadata ([`WebpInfo`]).
//! - **Demux** ([`WebpDemuxer`]): a stateful handle over a parsed buffer
//!   that locates individual frame payloads as borrowed
//!   [`FrameFragment`]s.
//!
//! All types work in `no_std + alloc` environments.

mod chunk;
mod demuxer;
mod error;
mod info;
mod process;
mod walker;

pub use chunk::{ChunkData, ChunkId};
pub use demuxer::{FrameFragment, WebpDemuxer};
pub use error::DemuxError;
pub use info::{
    BlendMethod, DisposeMethod, LoopCount, WebpInfo, DEFAULT_FRAME_DELAY, MIN_FRAME_DELAY,
};
pub use walker::parse_info;
