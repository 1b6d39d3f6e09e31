//! Buffered copying of entry content.
//!
//! Entry content moves between archives, files and caller streams through
//! one reusable heap buffer per operation.

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;

use crate::ArchiveError;
use crate::Result;

/// Buffer size for streaming entry content (64 KB).
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable buffer for streaming entry content.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use zipwright_core::copy::{CopyBuffer, copy_with_buffer};
///
/// let mut buffer = CopyBuffer::new();
/// let mut input = Cursor::new(b"entry content".to_vec());
/// let mut output = Vec::new();
///
/// let copied = copy_with_buffer(&mut input, &mut output, &mut buffer)?;
/// assert_eq!(copied, 13);
/// assert_eq!(output, b"entry content");
/// # Ok::<(), zipwright_core::ArchiveError>(())
/// ```
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Allocates a new buffer of [`COPY_BUFFER_SIZE`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies everything from `reader` to `writer` through `buffer`.
///
/// Interrupted reads are retried. The byte counter uses checked arithmetic.
///
/// # Errors
///
/// Returns an error if reading or writing fails, or if the byte count
/// overflows `u64`.
pub fn copy_with_buffer<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
) -> Result<u64> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::Io(e)),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;

        total = total
            .checked_add(bytes_read as u64)
            .ok_or_else(|| ArchiveError::format("entry size overflows u64"))?;
    }

    Ok(total)
}

/// Fills `buf` as far as possible, stopping only at end of input.
///
/// Returns the number of bytes read, which is less than `buf.len()` only at
/// end of input.
pub(crate) fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(ArchiveError::Io(e)),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that fails with `Interrupted` before every successful read.
    struct InterruptingReader {
        inner: Cursor<Vec<u8>>,
        interrupt_next: bool,
    }

    impl Read for InterruptingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.interrupt_next = true;
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_copy_buffer_size() {
        assert_eq!(CopyBuffer::new().size(), 64 * 1024);
        assert_eq!(CopyBuffer::default().size(), COPY_BUFFER_SIZE);
    }

    #[test]
    fn test_copy_empty_source() {
        let mut buffer = CopyBuffer::new();
        let mut output = Vec::new();
        let copied = copy_with_buffer(&mut Cursor::new(Vec::new()), &mut output, &mut buffer);
        assert_eq!(copied.unwrap(), 0);
        assert!(output.is_empty());
    }

    #[test]
    fn test_copy_larger_than_buffer() {
        let mut buffer = CopyBuffer::new();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut output = Vec::new();

        let copied = copy_with_buffer(&mut Cursor::new(data.clone()), &mut output, &mut buffer);
        assert_eq!(copied.unwrap(), data.len() as u64);
        assert_eq!(output, data);
    }

    #[test]
    fn test_copy_retries_interrupted() {
        let mut buffer = CopyBuffer::new();
        let mut reader = InterruptingReader {
            inner: Cursor::new(b"retry me".to_vec()),
            interrupt_next: true,
        };
        let mut output = Vec::new();

        let copied = copy_with_buffer(&mut reader, &mut output, &mut buffer).unwrap();
        assert_eq!(copied, 8);
        assert_eq!(output, b"retry me");
    }

    #[test]
    fn test_read_up_to_short_input() {
        let mut buf = [0u8; 16];
        let n = read_up_to(&mut Cursor::new(b"abc".to_vec()), &mut buf).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], b"abc");
    }
}
