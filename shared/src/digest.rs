//! Session digest computation on the pure-Rust hash stack.
//!
//! Backends that have no native hash of their own (the RustCrypto and the
//! memory-light adapters) digest messages through this module; the libcrypto
//! adapter uses its provider's hashes so that a session never mixes stacks.

use sha2::{Digest, Sha256, Sha512};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Sha3_256, Shake256};

use crate::{HashAlg, SessionConfig, MAX_DIGEST_LEN};

/// A digest with its length, sized for the largest digest any session can
/// be configured to produce.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct DigestBuf {
    pub content: [u8; MAX_DIGEST_LEN],
    pub len: usize,
}

impl Default for DigestBuf {
    fn default() -> Self {
        DigestBuf::new()
    }
}

impl DigestBuf {
    pub const fn new() -> Self {
        DigestBuf {
            content: [0; MAX_DIGEST_LEN],
            len: 0,
        }
    }

    pub fn new_from_slice(slice: &[u8]) -> Result<Self, ()> {
        if slice.len() > MAX_DIGEST_LEN {
            return Err(());
        }
        let mut buf = DigestBuf::new();
        buf.content[..slice.len()].copy_from_slice(slice);
        buf.len = slice.len();
        Ok(buf)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.content[..self.len]
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Digest `message` as the session configuration dictates. The result is
/// exactly `config.hash_len()` bytes long.
pub fn session_digest(config: &SessionConfig, message: &[u8]) -> DigestBuf {
    match config.hash() {
        HashAlg::Sha256 => {
            DigestBuf::new_from_slice(&Sha256::digest(message)).expect("digest fits the buffer")
        }
        HashAlg::Sha512 => {
            DigestBuf::new_from_slice(&Sha512::digest(message)).expect("digest fits the buffer")
        }
        HashAlg::Sha3_256 => {
            DigestBuf::new_from_slice(&Sha3_256::digest(message)).expect("digest fits the buffer")
        }
        HashAlg::Shake256 => {
            let mut buf = DigestBuf::new();
            buf.len = config.hash_len();
            let mut xof = Shake256::default();
            xof.update(message);
            xof.finalize_xof().read(&mut buf.content[..buf.len]);
            buf
        }
    }
}
