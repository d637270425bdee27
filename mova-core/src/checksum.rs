//! CRC32C checksum of machine sources.

use std::io::{self, Read};

/// Reader adapter that checksums every byte passing through it.
pub struct ChecksumReader<R> {
    inner: R,
    crc: u32,
}

impl<R: Read> ChecksumReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, crc: 0 }
    }

    /// Returns the checksum of the bytes read so far as 8 hex digits.
    pub fn finish(&self) -> String {
        format!("{:08x}", self.crc)
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.crc = crc32c::crc32c_append(self.crc, &buf[..n]);
        Ok(n)
    }
}

/// Checksums a complete source.
pub fn checksum(source: &[u8]) -> String {
    format!("{:08x}", crc32c::crc32c(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_matches_one_shot() {
        let source = b"state a { on A -> move a; };\n";
        let mut reader = ChecksumReader::new(&source[..]);
        let mut sink = Vec::new();
        // Small reads exercise the incremental path.
        let mut buf = [0u8; 5];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            sink.extend_from_slice(&buf[..n]);
        }
        assert_eq!(sink, source);
        assert_eq!(reader.finish(), checksum(source));
        assert_eq!(reader.finish().len(), 8);
    }

    #[test]
    fn test_checksum_differs() {
        assert_ne!(checksum(b"state a {};"), checksum(b"state b {};"));
        assert_eq!(checksum(b""), "00000000");
    }
}
