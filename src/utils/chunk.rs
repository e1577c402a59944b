//! Response chunking.
//!
//! Long responses are delivered as multiple messages, each within the
//! platform text limit. Splitting only ever happens between the caller's
//! segments, so a handler that emits one formatted block per segment
//! never gets its markup cut in half.

/// Greedily pack ordered segments into chunks of at most `limit`
/// characters.
///
/// Concatenating the returned chunks reproduces the concatenated input
/// exactly, in order. A single segment longer than `limit` is emitted as
/// its own oversized chunk rather than truncated or split; callers that
/// need a hard bound must pre-size their segments. Greedy packing is
/// minimal under the never-split-a-segment constraint.
pub fn chunk_segments(segments: Vec<String>, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffered = 0usize;

    for segment in segments {
        let length = segment.chars().count();
        if length == 0 {
            continue;
        }
        if buffered > 0 && buffered + length > limit {
            chunks.push(std::mem::take(&mut buffer));
            buffered = 0;
        }
        buffer.push_str(&segment);
        buffered += length;
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }
    chunks
}
