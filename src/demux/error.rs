//! Error types for container parsing and frame extraction.

use alloc::string::String;
use thiserror::Error;

/// Errors that can occur while parsing a WebP container or extracting and
/// rasterizing frames.
///
/// The variants mirror the status vocabulary of the container analysis
/// contract: every fallible operation in this crate reports exactly one of
/// these, and the first failure aborts the current pass.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DemuxError {
    /// The buffer ended before a required field or chunk payload completed.
    ///
    /// Running out of data *between* top-level chunks is not an error; this
    /// status is reserved for truncation inside a declared structure.
    #[error("Truncated data: {0}")]
    TruncatedData(String),

    /// A structural violation in the chunk layout: duplicate required chunk,
    /// missing required sub-chunk, or conflicting image types within one
    /// frame.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A caller-supplied or declared value is out of its valid range: zero
    /// dimensions, an out-of-range frame index, a zero-sized target buffer.
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// The codestream payload was rejected: bad signature, unknown profile,
    /// or an inconsistent bitstream header.
    #[error("Bitstream error: {0}")]
    BitstreamError(String),

    /// A chunk required by declared flags or counts was never observed.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// The source buffer could not be used at all, or a released handle was
    /// used again.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}
