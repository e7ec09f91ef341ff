//! RIFF header parsing and the chunk-walking loop.

use alloc::format;
use alloc::string::String;

use log::{debug, warn};

use super::chunk::{ChunkData, ChunkId, CHUNK_HEADER_SIZE, MAX_CHUNK_PAYLOAD, RIFF_HEADER_SIZE};
use super::error::DemuxError;
use super::info::WebpInfo;
use super::process::process_chunk;
use crate::slice_reader::SliceReader;

/// Parse the 12-byte RIFF container header and return the declared RIFF
/// payload size.
///
/// Requires the `"RIFF"` tag, a little-endian u32 size, and the `"WEBP"`
/// form tag; a tag mismatch is a [`DemuxError::BitstreamError`]. The total
/// declared file length (8 bytes of outer header plus the declared size)
/// must not exceed the buffer; a shorter declaration is tolerated and the
/// trailing bytes are ignored.
pub(crate) fn parse_riff_header(r: &mut SliceReader<'_>) -> Result<u32, DemuxError> {
    let tag = r.read_fourcc()?;
    if &tag != b"RIFF" {
        return Err(DemuxError::BitstreamError(format!(
            "Missing RIFF signature: {:x?}",
            tag
        )));
    }
    let riff_size = r.read_u32_le()?;
    let form = r.read_fourcc()?;
    if &form != b"WEBP" {
        return Err(DemuxError::BitstreamError(format!(
            "Missing WEBP signature: {:x?}",
            form
        )));
    }
    if (riff_size as usize) < CHUNK_HEADER_SIZE {
        return Err(DemuxError::ParseError(String::from("RIFF size is too small")));
    }
    if u64::from(riff_size) > MAX_CHUNK_PAYLOAD {
        return Err(DemuxError::ParseError(String::from("RIFF size is over limit")));
    }
    let declared_total = CHUNK_HEADER_SIZE as u64 + u64::from(riff_size);
    if declared_total > r.len() as u64 {
        return Err(DemuxError::TruncatedData(String::from(
            "RIFF size exceeds the buffer",
        )));
    }
    if declared_total < r.len() as u64 {
        warn!("RIFF size is smaller than the file size");
    }
    Ok(riff_size)
}

/// Walk a sequence of RIFF chunks, dispatching each to `on_chunk`.
///
/// `base_offset` is the absolute position of the reader's first byte within
/// the source buffer, so every [`ChunkData`] carries absolute offsets. Fewer
/// than 8 bytes remaining is the normal end of data, not an error; a payload
/// that is declared past the end of the reader is `TruncatedData`. A missing
/// pad byte on the final chunk is tolerated. The first processor error stops
/// the walk and propagates.
pub(crate) fn walk_chunks<F>(
    r: &mut SliceReader<'_>,
    base_offset: usize,
    mut on_chunk: F,
) -> Result<(), DemuxError>
where
    F: FnMut(&ChunkData<'_>) -> Result<(), DemuxError>,
{
    while r.remaining() >= CHUNK_HEADER_SIZE {
        let offset = base_offset + r.position();
        let fourcc = r.read_fourcc()?;
        let size = r.read_u32_le()? as usize;
        let id = ChunkId::from_fourcc(fourcc);
        if size as u64 > MAX_CHUNK_PAYLOAD {
            return Err(DemuxError::InvalidParam(String::from(
                "Size of chunk payload is over limit",
            )));
        }
        if size > r.remaining() {
            return Err(DemuxError::TruncatedData(String::from(
                "Truncated data detected when parsing chunk payload",
            )));
        }
        let payload = r.peek_slice(size)?;
        let chunk = ChunkData {
            offset,
            size,
            payload,
            id,
        };
        debug!(
            "chunk {:?} at offset {}, payload length {}",
            id, offset, size
        );
        on_chunk(&chunk)?;
        r.consume(size + (size & 1));
    }
    Ok(())
}

/// Run the complete info pass over a WebP byte buffer.
///
/// Parses the RIFF header, walks every top-level chunk (recursing into ANMF
/// payloads), and runs the post-walk consistency checks. Returns the
/// accumulated [`WebpInfo`] on success; the first failure aborts the pass
/// and surfaces its specific status.
pub fn parse_info(data: &[u8]) -> Result<WebpInfo, DemuxError> {
    if data.is_empty() {
        return Err(DemuxError::InvalidCommand(String::from(
            "Empty input buffer",
        )));
    }
    let mut r = SliceReader::new(data);
    let riff_size = parse_riff_header(&mut r)?;
    let total = CHUNK_HEADER_SIZE + riff_size as usize;
    let mut info = WebpInfo::new(riff_size);
    let mut chunks = SliceReader::new(&data[RIFF_HEADER_SIZE..total]);
    walk_chunks(&mut chunks, RIFF_HEADER_SIZE, |chunk| {
        process_chunk(chunk, &mut info)
    })?;
    info.validate()?;
    debug!(
        "parsed WebP container: {}x{}, {} frame(s), animated: {}",
        info.canvas_width(),
        info.canvas_height(),
        info.frame_count(),
        info.is_animated()
    );
    Ok(info)
}
