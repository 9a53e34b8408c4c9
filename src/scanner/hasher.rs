//! Streaming file fingerprinting.
//!
//! # Overview
//! [`Hasher`] computes a 256-bit digest of a file's content by reading it in
//! fixed [`BLOCK_SIZE`] blocks, so peak memory does not depend on file size.
//! Each call is independent; a `Hasher` can be shared freely across threads.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{FileRecord, HashError};

/// Read block size for streaming hashes (64 KiB).
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Length of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// A 256-bit content digest used as the duplicate-equality key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hexadecimal form (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::with_capacity(FINGERPRINT_LEN * 2);
        for byte in self.0 {
            out.push(DIGITS[(byte >> 4) as usize] as char);
            out.push(DIGITS[(byte & 0x0f) as usize] as char);
        }
        out
    }

    /// Parse a 64-character hexadecimal string (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintParseError`] on wrong length or non-hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, FingerprintParseError> {
        let hex = hex.trim();
        if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(FingerprintParseError::InvalidCharacter(c));
        }
        if hex.len() != FINGERPRINT_LEN * 2 {
            return Err(FingerprintParseError::InvalidLength(hex.len()));
        }

        // All ASCII hex digits from here on.
        let mut bytes = [0u8; FINGERPRINT_LEN];
        for (i, pair) in hex.as_bytes().chunks(2).enumerate() {
            bytes[i] = (hex_value(pair[0]) << 4) | hex_value(pair[1]);
        }
        Ok(Self(bytes))
    }
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Errors produced when parsing a hexadecimal fingerprint.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintParseError {
    /// Input was not 64 hex characters long.
    #[error("expected 64 hex characters, got {0}")]
    InvalidLength(usize),

    /// Input contained a character outside `[0-9a-fA-F]`.
    #[error("invalid hex character {0:?}")]
    InvalidCharacter(char),
}

/// Digest algorithm used for fingerprints.
///
/// Both produce 256-bit digests. Fingerprints from different algorithms are
/// not comparable, so a persisted store should be used with one algorithm.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 (default)
    #[default]
    Blake3,
    /// SHA-256
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Blake3 => write!(f, "blake3"),
            HashAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

enum Digester {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
}

impl Digester {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, block: &[u8]) {
        match self {
            Self::Blake3(hasher) => {
                hasher.update(block);
            }
            Self::Sha256(hasher) => hasher.update(block),
        }
    }

    fn finalize(self) -> Fingerprint {
        match self {
            Self::Blake3(hasher) => Fingerprint(*hasher.finalize().as_bytes()),
            Self::Sha256(hasher) => Fingerprint(hasher.finalize().into()),
        }
    }
}

/// Block-wise file hasher.
///
/// # Example
///
/// ```no_run
/// use dupecheck::scanner::{HashAlgorithm, Hasher};
/// use std::path::PathBuf;
///
/// let hasher = Hasher::new(HashAlgorithm::Blake3);
/// let record = hasher.fingerprint(PathBuf::from("photo.jpg"));
/// if let Some(fingerprint) = record.fingerprint() {
///     println!("{fingerprint}");
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Hasher {
    algorithm: HashAlgorithm,
}

impl Hasher {
    /// Create a hasher for the given algorithm.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Algorithm this hasher uses.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash a file's full content, returning the digest and byte count.
    ///
    /// Content is read strictly in order, one block at a time.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails.
    pub fn hash_file(&self, path: &Path) -> Result<(Fingerprint, u64), HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut buffer = vec![0u8; BLOCK_SIZE];
        let mut digester = Digester::new(self.algorithm);
        let mut total: u64 = 0;

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            digester.update(&buffer[..read]);
            total += read as u64;
        }

        Ok((digester.finalize(), total))
    }

    /// Fingerprint a file, never failing.
    ///
    /// A file that vanished since enumeration, or cannot be read, yields a
    /// record without a fingerprint. Vanished files are logged at debug
    /// level, other failures as warnings.
    #[must_use]
    pub fn fingerprint(&self, path: PathBuf) -> FileRecord {
        match self.hash_file(&path) {
            Ok((fingerprint, size)) => {
                log::trace!("{} {} ({} bytes)", fingerprint, path.display(), size);
                FileRecord::hashed(path, fingerprint, size)
            }
            Err(HashError::NotFound(_)) => {
                log::debug!("File vanished before hashing: {}", path.display());
                FileRecord::unreadable(path)
            }
            Err(e) => {
                log::warn!("Unreadable file, recorded without fingerprint: {}", e);
                FileRecord::unreadable(path)
            }
        }
    }
}
