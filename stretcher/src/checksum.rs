//! Digest algorithm selection and checksum verification.
//!
//! A manifest declares its checksum as a bare hex string; the algorithm is
//! inferred from the string's length when hashing begins, not when the
//! manifest is parsed. An empty checksum disables verification, though the
//! archive is still hashed so the digest can be logged.

use crate::error::{DeployError, Result};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

/// Supported digest algorithms, identified by their hex digest length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// 128-bit MD5, 32 hex characters.
    Md5,
    /// 160-bit SHA-1, 40 hex characters.
    Sha1,
    /// 256-bit SHA-256, 64 hex characters.
    Sha256,
    /// 512-bit SHA-512, 128 hex characters.
    Sha512,
}

impl DigestAlgorithm {
    /// Algorithm used to hash archives when the manifest declares no checksum.
    pub const UNVERIFIED_DEFAULT: Self = Self::Sha256;

    /// Select the algorithm for a declared checksum.
    ///
    /// Returns `Ok(None)` when the checksum is empty, meaning verification is
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::UnsupportedChecksum`] when a non-empty checksum
    /// has a length other than 32, 40, 64 or 128 characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use stretcher::checksum::DigestAlgorithm;
    ///
    /// let md5 = DigestAlgorithm::for_checksum(&"0".repeat(32))?;
    /// assert_eq!(md5, Some(DigestAlgorithm::Md5));
    /// assert_eq!(DigestAlgorithm::for_checksum("")?, None);
    /// assert!(DigestAlgorithm::for_checksum("abc").is_err());
    /// # Ok::<(), stretcher::error::DeployError>(())
    /// ```
    pub fn for_checksum(checksum: &str) -> Result<Option<Self>> {
        let algorithm = match checksum.len() {
            0 => return Ok(None),
            32 => Self::Md5,
            40 => Self::Sha1,
            64 => Self::Sha256,
            128 => Self::Sha512,
            len => {
                return Err(DeployError::UnsupportedChecksum {
                    checksum: checksum.to_owned(),
                    len,
                });
            }
        };
        Ok(Some(algorithm))
    }

    /// Length of this algorithm's digest in hex characters.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Create a fresh running digest for this algorithm.
    #[must_use]
    pub fn hasher(self) -> Hasher {
        match self {
            Self::Md5 => Hasher::Md5(Md5::new()),
            Self::Sha1 => Hasher::Sha1(Sha1::new()),
            Self::Sha256 => Hasher::Sha256(Sha256::new()),
            Self::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

/// Running digest state for one of the supported algorithms.
#[derive(Clone)]
pub enum Hasher {
    /// MD5 state.
    Md5(Md5),
    /// SHA-1 state.
    Sha1(Sha1),
    /// SHA-256 state.
    Sha256(Sha256),
    /// SHA-512 state.
    Sha512(Sha512),
}

impl Hasher {
    /// Feed `data` into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Consume the state and return the digest as lower-case hex.
    #[must_use]
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => format!("{:x}", h.finalize()),
            Self::Sha1(h) => format!("{:x}", h.finalize()),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Sha512(h) => format!("{:x}", h.finalize()),
        }
    }
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let algorithm = match self {
            Self::Md5(_) => DigestAlgorithm::Md5,
            Self::Sha1(_) => DigestAlgorithm::Sha1,
            Self::Sha256(_) => DigestAlgorithm::Sha256,
            Self::Sha512(_) => DigestAlgorithm::Sha512,
        };
        f.debug_tuple("Hasher").field(&algorithm).finish()
    }
}

/// Compare a declared checksum against a computed digest.
///
/// The comparison ignores ASCII case, so upper-case manifests match the
/// lower-case digests produced by [`Hasher::finalize_hex`].
///
/// # Errors
///
/// Returns [`DeployError::ChecksumMismatch`] carrying both values when they
/// differ.
pub fn verify_checksum(expected: &str, actual: &str) -> Result<()> {
    if expected.eq_ignore_ascii_case(actual) {
        return Ok(());
    }
    Err(DeployError::ChecksumMismatch {
        expected: expected.to_owned(),
        actual: actual.to_owned(),
    })
}
