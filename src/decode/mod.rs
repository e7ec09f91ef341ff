//! Frame rasterization: codestream feature probing and the pixel-decode
//! pipeline.

mod bitstream;
mod rasterize;

pub use bitstream::{probe_features, BitstreamFeatures};
pub use rasterize::{
    rasterize, rasterize_into, ColorLayout, DecodeOptions, DecodeTarget, PixelBuffer, PixelDecoder,
};
