//! Single-pass copy with incremental hashing.
//!
//! The archive is streamed from its source into the staging file in bounded
//! chunks. Each chunk is written and fed to the digest in the same loop
//! iteration, so the digest never runs ahead of the bytes that reached the
//! destination.

use crate::checksum::DigestAlgorithm;
use std::io::{self, ErrorKind, Read, Write};

/// Size of the copy buffer.
const CHUNK_SIZE: usize = 32 * 1024;

/// Bytes copied and the digest computed over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Number of bytes written to the destination.
    pub bytes_written: u64,
    /// Lower-case hex digest of exactly those bytes.
    pub digest: String,
}

/// Copy `src` into `dst`, hashing the bytes with `algorithm` as they pass.
///
/// Reads interrupted by a signal are retried. The digest of a failed copy is
/// discarded.
///
/// # Errors
///
/// Returns the first read or write error. A write that accepts fewer bytes
/// than were read fails with [`ErrorKind::WriteZero`] ("short write").
///
/// # Examples
///
/// ```
/// use stretcher::checksum::DigestAlgorithm;
/// use stretcher::copier::copy_and_hash;
///
/// let mut dst = Vec::new();
/// let outcome = copy_and_hash(&mut dst, &mut &b"hello"[..], DigestAlgorithm::Md5)?;
/// assert_eq!(outcome.bytes_written, 5);
/// assert_eq!(outcome.digest, "5d41402abc4b2a76b9719d911017c592");
/// assert_eq!(dst, b"hello");
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn copy_and_hash<W, R>(
    dst: &mut W,
    src: &mut R,
    algorithm: DigestAlgorithm,
) -> io::Result<CopyOutcome>
where
    W: Write + ?Sized,
    R: Read + ?Sized,
{
    let mut hasher = algorithm.hasher();
    let mut buf = vec![0_u8; CHUNK_SIZE];
    let mut bytes_written: u64 = 0;

    loop {
        let read = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = buf.get(..read).unwrap_or_default();

        let written = dst.write(chunk)?;
        if written != read {
            return Err(io::Error::new(ErrorKind::WriteZero, "short write"));
        }
        hasher.update(chunk);
        bytes_written += written as u64;
    }

    dst.flush()?;
    Ok(CopyOutcome {
        bytes_written,
        digest: hasher.finalize_hex(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Writer that accepts at most `limit` bytes per call.
    struct ShortWriter {
        limit: usize,
        inner: Vec<u8>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.inner.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Reader that yields its data once, then fails.
    struct FailingReader {
        data: Option<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.take() {
                Some(data) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                None => Err(io::Error::new(ErrorKind::ConnectionReset, "peer hung up")),
            }
        }
    }

    /// Reader that is interrupted before every chunk.
    struct InterruptingReader<'a> {
        data: &'a [u8],
        interrupt_next: bool,
    }

    impl Read for InterruptingReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.interrupt_next = true;
            self.data.read(buf)
        }
    }

    fn expected_digest(algorithm: DigestAlgorithm, data: &[u8]) -> String {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        hasher.finalize_hex()
    }

    #[rstest]
    #[case::empty(0)]
    #[case::single_byte(1)]
    #[case::exact_chunk(CHUNK_SIZE)]
    #[case::multi_chunk(CHUNK_SIZE * 3 + 17)]
    fn copies_every_byte_and_hashes_them(#[case] len: usize) {
        let data: Vec<u8> = (0..=250_u8).cycle().take(len).collect();
        let mut dst = Vec::new();

        let outcome = copy_and_hash(&mut dst, &mut data.as_slice(), DigestAlgorithm::Sha256)
            .expect("copy succeeds");

        assert_eq!(outcome.bytes_written, len as u64);
        assert_eq!(dst, data);
        assert_eq!(
            outcome.digest,
            expected_digest(DigestAlgorithm::Sha256, &data)
        );
    }

    #[test]
    fn short_write_aborts_copy() {
        let data = vec![7_u8; 100];
        let mut dst = ShortWriter {
            limit: 10,
            inner: Vec::new(),
        };

        let err = copy_and_hash(&mut dst, &mut data.as_slice(), DigestAlgorithm::Md5)
            .expect_err("short write");

        assert_eq!(err.kind(), ErrorKind::WriteZero);
        assert_eq!(dst.inner.len(), 10);
    }

    #[test]
    fn read_error_is_returned() {
        let mut src = FailingReader {
            data: Some(b"partial".to_vec()),
        };
        let mut dst = Vec::new();

        let err = copy_and_hash(&mut dst, &mut src, DigestAlgorithm::Sha1).expect_err("read fails");

        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
        assert_eq!(dst, b"partial");
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let data = b"interrupted but complete".as_slice();
        let mut src = InterruptingReader {
            data,
            interrupt_next: true,
        };
        let mut dst = Vec::new();

        let outcome =
            copy_and_hash(&mut dst, &mut src, DigestAlgorithm::Md5).expect("copy succeeds");

        assert_eq!(dst, data);
        assert_eq!(outcome.digest, expected_digest(DigestAlgorithm::Md5, data));
    }
}
