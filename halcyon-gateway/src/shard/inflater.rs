use flate2::{Decompress, DecompressError, FlushDecompress};
use std::{
    convert::TryInto,
    mem,
    time::{Duration, Instant},
};

/// The four-byte suffix Discord appends to the final frame of a
/// `zlib-stream`-compressed message. A message is only complete once the
/// accumulated compressed buffer ends with this marker.
const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];
const INTERNAL_BUFFER_SIZE: usize = 32 * 1024;
const SHRINK_INTERVAL: Duration = Duration::from_secs(60);

/// Reassembles a `zlib-stream`-compressed gateway connection.
///
/// Frames may split a single logical message across arbitrary byte
/// boundaries; this type buffers compressed bytes across calls to
/// [`Inflater::extend`] and only inflates once the marker sequence is seen,
/// using a `Decompress` whose internal dictionary persists across messages.
/// The decoder is reset only when the socket reconnects, never between
/// messages on the same connection.
#[derive(Debug)]
pub struct Inflater {
    decompress: Decompress,
    compressed: Vec<u8>,
    internal_buffer: Vec<u8>,
    buffer: Vec<u8>,
    last_shrink: Instant,
    shard_id: u64,
}

impl Inflater {
    pub fn new(shard_id: u64) -> Self {
        Self {
            buffer: Vec::with_capacity(INTERNAL_BUFFER_SIZE),
            compressed: Vec::new(),
            decompress: Decompress::new(true),
            internal_buffer: Vec::with_capacity(INTERNAL_BUFFER_SIZE),
            last_shrink: Instant::now(),
            shard_id,
        }
    }

    /// Appends bytes received from the socket to the compressed buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.compressed.extend_from_slice(bytes);
    }

    /// If the compressed buffer ends with the end-of-message marker,
    /// inflates it and returns the decompressed bytes; otherwise returns
    /// `None` because more frames are still needed.
    pub fn message(&mut self) -> Result<Option<&mut [u8]>, DecompressError> {
        let length = self.compressed.len();

        if length < 4 || self.compressed[(length - 4)..] != ZLIB_SUFFIX {
            return Ok(None);
        }

        self.buffer.clear();
        let before = self.decompress.total_in();
        let mut offset = 0;

        loop {
            self.internal_buffer.clear();

            self.decompress.decompress_vec(
                &self.compressed[offset..],
                &mut self.internal_buffer,
                FlushDecompress::Sync,
            )?;

            offset = (self.decompress.total_in() - before).try_into().unwrap_or_default();
            self.buffer.extend_from_slice(&self.internal_buffer);

            let not_at_capacity = self.internal_buffer.len() < self.internal_buffer.capacity();

            if not_at_capacity || offset >= self.compressed.len() {
                break;
            }
        }

        self.compressed.clear();
        self.maybe_shrink();

        Ok(Some(&mut self.buffer))
    }

    /// Drops accumulated state on reconnect; a resumed session reuses
    /// sequence numbers but never reuses the compression dictionary,
    /// because the new connection restarts the zlib stream from scratch.
    pub fn reset(&mut self) {
        let _old = mem::replace(self, Self::new(self.shard_id));
    }

    fn maybe_shrink(&mut self) {
        if self.last_shrink.elapsed() < SHRINK_INTERVAL {
            return;
        }

        self.compressed.shrink_to_fit();
        self.buffer.shrink_to_fit();
        self.last_shrink = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::Inflater;
    use flate2::{Compress, Compression, FlushCompress};

    fn compress_zlib_stream(input: &[u8]) -> Vec<u8> {
        let mut compress = Compress::new(Compression::fast(), true);
        let mut out = vec![0u8; input.len() * 2 + 64];

        let before_out = compress.total_out();
        compress.compress(input, &mut out, FlushCompress::Sync).unwrap();
        let produced = (compress.total_out() - before_out) as usize;
        out.truncate(produced);

        out
    }

    #[test]
    fn reassembles_across_arbitrary_frame_splits() {
        let payload = br#"{"op":0,"t":"READY","d":{}}"#;
        let compressed = compress_zlib_stream(payload);

        let mut inflater = Inflater::new(0);

        for chunk in compressed.chunks(3) {
            inflater.extend(chunk);
        }

        let message = inflater.message().unwrap().expect("message complete");
        assert_eq!(message, payload);
    }

    #[test]
    fn incomplete_message_returns_none() {
        let payload = br#"{"op":0,"t":"READY","d":{}}"#;
        let compressed = compress_zlib_stream(payload);

        let mut inflater = Inflater::new(0);
        inflater.extend(&compressed[..compressed.len() - 4]);

        assert!(inflater.message().unwrap().is_none());
    }
}
