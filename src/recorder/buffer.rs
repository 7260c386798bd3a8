//! Fragment buffer
//!
//! Ordered, append-only list of recorded fragments for one recording.

use super::blob::Blob;
use bytes::{Bytes, BytesMut};

#[derive(Debug, Default)]
pub struct FragmentBuffer {
    fragments: Vec<Bytes>,
    byte_len: usize,
}

impl FragmentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every fragment
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.byte_len = 0;
    }

    pub fn push(&mut self, fragment: Bytes) {
        self.byte_len += fragment.len();
        self.fragments.push(fragment);
    }

    /// Number of fragments
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Combined size of all fragments
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Concatenate the fragments, in order, into one blob
    pub fn assemble(&self, mime_type: &str) -> Blob {
        let mut data = BytesMut::with_capacity(self.byte_len);
        for fragment in &self.fragments {
            data.extend_from_slice(fragment);
        }
        Blob::new(data.freeze(), mime_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_keeps_order_and_size() {
        let mut buffer = FragmentBuffer::new();
        buffer.push(Bytes::from_static(b"abc"));
        buffer.push(Bytes::from_static(b""));
        buffer.push(Bytes::from_static(b"defg"));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.byte_len(), 7);

        let blob = buffer.assemble("video/webm");
        assert_eq!(blob.size(), 7);
        assert_eq!(blob.bytes().as_ref(), b"abcdefg");
        assert_eq!(blob.mime_type(), "video/webm");
    }

    #[test]
    fn test_clear_resets_size() {
        let mut buffer = FragmentBuffer::new();
        buffer.push(Bytes::from(vec![0u8; 1000]));
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.byte_len(), 0);
        assert_eq!(buffer.assemble("video/webm").size(), 0);
    }
}
