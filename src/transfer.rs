//! Transfer capability
//!
//! The store never touches caller memory directly. Every copy between a block
//! and the outside world goes through one of these traits, which report how
//! many bytes could *not* be moved (the shortfall). A shortfall is not an
//! error: the store simply reports, and advances by, fewer bytes.

/// Destination of a read: copies bytes out of a block to the caller
pub trait TransferSink {
    /// Copy `src` to the caller. Returns the number of bytes NOT copied.
    fn copy_out(&mut self, src: &[u8]) -> usize;
}

/// Source of a write: copies bytes from the caller into a block
pub trait TransferSource {
    /// Fill `dst` from the caller. Returns the number of bytes NOT copied.
    fn copy_in(&mut self, dst: &mut [u8]) -> usize;
}

// =============================================================================
// Slice-backed implementations
// =============================================================================

impl TransferSink for &mut [u8] {
    fn copy_out(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.len());
        self[..n].copy_from_slice(&src[..n]);
        src.len() - n
    }
}

impl<const N: usize> TransferSink for &mut [u8; N] {
    fn copy_out(&mut self, src: &[u8]) -> usize {
        let mut slice: &mut [u8] = &mut self[..];
        slice.copy_out(src)
    }
}

impl TransferSource for &[u8] {
    fn copy_in(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.len());
        dst[..n].copy_from_slice(&self[..n]);
        dst.len() - n
    }
}

impl<const N: usize> TransferSource for &[u8; N] {
    fn copy_in(&mut self, dst: &mut [u8]) -> usize {
        let mut slice: &[u8] = &self[..];
        slice.copy_in(dst)
    }
}

impl TransferSource for &Vec<u8> {
    fn copy_in(&mut self, dst: &mut [u8]) -> usize {
        let mut slice: &[u8] = self.as_slice();
        slice.copy_in(dst)
    }
}

// =============================================================================
// Fault injection
// =============================================================================

/// Wraps a sink or source and faults after a fixed number of bytes
///
/// Models a caller buffer that becomes unreachable part-way through a copy:
/// bytes before the fault are transferred, the rest are reported short.
#[derive(Debug)]
pub struct FaultAfter<T> {
    inner: T,
    remaining: usize,
}

impl<T> FaultAfter<T> {
    /// Accept at most `limit` bytes in total across all copies
    pub fn new(inner: T, limit: usize) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }

    /// Bytes still accepted before the fault
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: TransferSink> TransferSink for FaultAfter<T> {
    fn copy_out(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.remaining);
        let short = self.inner.copy_out(&src[..n]);
        let copied = n - short.min(n);
        self.remaining -= copied;
        src.len() - copied
    }
}

impl<T: TransferSource> TransferSource for FaultAfter<T> {
    fn copy_in(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.remaining);
        let short = self.inner.copy_in(&mut dst[..n]);
        let copied = n - short.min(n);
        self.remaining -= copied;
        dst.len() - copied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_sink_short_when_smaller() {
        let mut buf = [0u8; 3];
        let mut sink: &mut [u8] = &mut buf[..];
        assert_eq!(sink.copy_out(b"hello"), 2);
        assert_eq!(&buf, b"hel");
    }

    #[test]
    fn test_slice_source_short_when_smaller() {
        let mut dst = [0u8; 5];
        let mut src: &[u8] = b"ab";
        assert_eq!(src.copy_in(&mut dst), 3);
        assert_eq!(&dst[..2], b"ab");
    }

    #[test]
    fn test_fault_after_limits_copy() {
        let mut out = [0u8; 8];
        let mut sink = FaultAfter::new(&mut out, 4);
        assert_eq!(sink.copy_out(b"abcdef"), 2);
        assert_eq!(sink.remaining(), 0);
        assert_eq!(sink.copy_out(b"g"), 1);
        assert_eq!(&out, b"abcd\0\0\0\0");
    }

    #[test]
    fn test_fault_after_spans_calls() {
        let mut dst = [0u8; 3];
        let mut source = FaultAfter::new(&b"xyz"[..], 4);
        assert_eq!(source.copy_in(&mut dst), 0);
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.copy_in(&mut dst), 2);
        assert_eq!(&dst, b"xyz");
    }

    #[test]
    fn test_fault_after_into_inner() {
        let mut out = [0u8; 4];
        let mut sink = FaultAfter::new(&mut out[..], 2);
        assert_eq!(sink.copy_out(b"abcd"), 2);

        let inner = sink.into_inner();
        assert_eq!(&inner[..], b"ab\0\0");
    }
}
