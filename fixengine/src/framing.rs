use crate::message::{FixProtocolError, SOH};

const MAX_BUFFER_BYTES: usize = 1024 * 1024;

/// Per-connection byte accumulator that slices complete FIX messages out
/// of a stream of TCP reads (spec §4.3 "Framing"). A message boundary is
/// the pattern `10=NNN<SOH>`; messages whose prefix is not `8=FIX` are
/// discarded rather than dispatched.
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append freshly-read bytes. Returns an error once the buffer would
    /// exceed the 1 MiB cap without having produced a complete message —
    /// callers must terminate the connection on this error.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), FixProtocolError> {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_BUFFER_BYTES {
            return Err(FixProtocolError::FrameOverflow);
        }
        Ok(())
    }

    /// Drain every complete message currently in the buffer, in arrival
    /// order. Non-`8=FIX`-prefixed slices are dropped silently.
    pub fn drain_messages(&mut self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(end) = find_checksum_boundary(&self.buf) {
            let message: Vec<u8> = self.buf.drain(..end).collect();
            if message.starts_with(b"8=FIX") {
                out.push(message);
            }
        }
        out
    }
}

/// Locate the end (exclusive) of the first `<SOH>10=NNN<SOH>` pattern in
/// `buf`. The leading SOH is required so a body field whose tag happens to
/// end in "10" (e.g. `110=` MinQty) can never be mistaken for the checksum
/// field — the checksum field is always preceded by the SOH that ends the
/// prior field, and a message never starts with it (messages start `8=`).
fn find_checksum_boundary(buf: &[u8]) -> Option<usize> {
    if buf.len() < 7 {
        return None;
    }
    for i in 1..=buf.len() - 7 {
        if buf[i - 1] == SOH && &buf[i..i + 3] == b"10=" && buf[i + 3..i + 6].iter().all(u8::is_ascii_digit) && buf[i + 6] == SOH {
            return Some(i + 7);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_two_concatenated_messages() {
        let mut fb = FrameBuffer::new();
        let msg1 = b"8=FIX.4.4\x019=5\x0135=0\x0110=123\x01".to_vec();
        let msg2 = b"8=FIX.4.4\x019=5\x0135=1\x0110=045\x01".to_vec();
        let mut combined = msg1.clone();
        combined.extend_from_slice(&msg2);

        fb.push(&combined).unwrap();
        let drained = fb.drain_messages();
        assert_eq!(drained, vec![msg1, msg2]);
    }

    #[test]
    fn discards_non_fix_prefixed_garbage() {
        let mut fb = FrameBuffer::new();
        fb.push(b"garbage10=000\x01").unwrap();
        assert!(fb.drain_messages().is_empty());
    }

    #[test]
    fn overflow_without_boundary_errors() {
        let mut fb = FrameBuffer::new();
        let junk = vec![b'x'; 2 * 1024 * 1024];
        let err = fb.push(&junk).unwrap_err();
        assert!(matches!(err, FixProtocolError::FrameOverflow));
    }

    #[test]
    fn body_tag_ending_in_10_does_not_truncate_the_message() {
        let mut fb = FrameBuffer::new();
        // tag 110 (MinQty) ends in "10" and is followed by "=123\x01", an
        // exact match for the checksum pattern sans the leading SOH.
        let msg = b"8=FIX.4.4\x019=12\x0135=D\x01110=123\x0110=045\x01".to_vec();
        fb.push(&msg).unwrap();
        assert_eq!(fb.drain_messages(), vec![msg]);
    }

    #[test]
    fn partial_message_waits_for_more_bytes() {
        let mut fb = FrameBuffer::new();
        fb.push(b"8=FIX.4.4\x019=5\x0135=0\x0110=1").unwrap();
        assert!(fb.drain_messages().is_empty());
        fb.push(b"23\x01").unwrap();
        assert_eq!(fb.drain_messages().len(), 1);
    }
}
