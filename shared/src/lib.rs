//! Common material for the unisig signing facade.
//!
//! This crate holds everything the facade and every provider backend agree
//! on: the algorithm / hash / provider enums, the immutable per-session
//! configuration, the error and status-code conventions, the per-algorithm
//! size tables, the message-digest helper and the diagnostics tooling. The
//! backend trait ([`SignerBackend`]) lives here too, so backend crates only
//! ever depend on this one.
#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt;
use core::num::NonZeroI32;

mod backend;
mod digest;
pub mod diag;
pub mod meter;
pub mod sizes;

pub use backend::SignerBackend;
pub use digest::{session_digest, DigestBuf};

/// Longest digest any session can produce: SHA-512 and the largest allowed
/// SHAKE-256 output are both 64 bytes.
pub const MAX_DIGEST_LEN: usize = 64;

/// Signature length of the fixed-shape sign/verify call pair. It equals the
/// raw `r || s` size of the only algorithm the memory-light provider
/// implements, which is the only provider those call shapes are valid for.
pub const FIXED_SIGNATURE_LEN: usize = 64;

/// Signature algorithms a session can be configured with.
///
/// Not every provider implements every algorithm; the support matrix is
/// checked when the session is configured, never later.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Algorithm {
    EcdsaBrainpoolP256r1,
    EcdsaBrainpoolP512r1,
    EcdsaSecp256r1,
    EcdsaSecp521r1,
    Ed25519,
    Ed448,
    Rsa,
}

/// The native key structure a backend must allocate for an algorithm.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum KeyFamily {
    Ecdsa,
    Ed25519,
    Ed448,
    Rsa,
}

impl Algorithm {
    pub const fn key_family(self) -> KeyFamily {
        match self {
            Algorithm::EcdsaBrainpoolP256r1
            | Algorithm::EcdsaBrainpoolP512r1
            | Algorithm::EcdsaSecp256r1
            | Algorithm::EcdsaSecp521r1 => KeyFamily::Ecdsa,
            Algorithm::Ed25519 => KeyFamily::Ed25519,
            Algorithm::Ed448 => KeyFamily::Ed448,
            Algorithm::Rsa => KeyFamily::Rsa,
        }
    }

    pub const fn is_rsa(self) -> bool {
        matches!(self, Algorithm::Rsa)
    }

    /// Configuration-log name, stable across providers.
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::EcdsaBrainpoolP256r1 => "ECDSA_BP256R1",
            Algorithm::EcdsaBrainpoolP512r1 => "ECDSA_BP512R1",
            Algorithm::EcdsaSecp256r1 => "ECDSA_SECP256R1",
            Algorithm::EcdsaSecp521r1 => "ECDSA_SECP521R1",
            Algorithm::Ed25519 => "EDDSA_25519",
            Algorithm::Ed448 => "EDDSA_448",
            Algorithm::Rsa => "RSA",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Message digest applied before any signing primitive runs.
///
/// Sessions always hash first and sign the digest, for every key family.
/// `Shake256` is the one variable-output case; its byte length is part of
/// the session configuration.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum HashAlg {
    Sha256,
    Sha512,
    Sha3_256,
    Shake256,
}

impl HashAlg {
    pub const fn name(self) -> &'static str {
        match self {
            HashAlg::Sha256 => "SHA_256",
            HashAlg::Sha512 => "SHA_512",
            HashAlg::Sha3_256 => "SHA3_256",
            HashAlg::Shake256 => "SHAKE_256",
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The crypto stack a session runs on. Chosen once at configure time; the
/// other providers are never constructed.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Provider {
    /// Native libcrypto. The only provider covering all seven algorithms.
    Openssl,
    /// Pure-Rust stack: NIST curves, Ed25519 and RSA, all four hashes.
    RustCrypto,
    /// Memory-light P-256-only stack with fixed 64-byte signatures.
    TinyEcc,
}

impl Provider {
    pub const fn name(self) -> &'static str {
        match self {
            Provider::Openssl => "OPENSSL",
            Provider::RustCrypto => "RUSTCRYPTO",
            Provider::TinyEcc => "TINYECC",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable per-session configuration, validated on construction and passed
/// by value into the chosen backend.
///
/// There is deliberately no setter: reconfiguring means opening a new
/// session, so a digest computed for `sign` can never disagree with the one
/// `verify` recomputes later in the same session.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct SessionConfig {
    algorithm: Algorithm,
    hash: HashAlg,
    shake256_len: Option<usize>,
}

impl SessionConfig {
    /// Build a configuration. `shake256_len` must be `Some(1..=64)` when
    /// `hash` is [`HashAlg::Shake256`] and is ignored otherwise.
    pub fn new(
        algorithm: Algorithm,
        hash: HashAlg,
        shake256_len: Option<usize>,
    ) -> Result<Self, SignError> {
        let shake256_len = match (hash, shake256_len) {
            (HashAlg::Shake256, Some(len)) if (1..=MAX_DIGEST_LEN).contains(&len) => Some(len),
            (HashAlg::Shake256, requested) => {
                return Err(SignError::InvalidShakeLength { requested })
            }
            // The length parameter only means something for the XOF.
            _ => None,
        };
        Ok(SessionConfig {
            algorithm,
            hash,
            shake256_len,
        })
    }

    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub const fn hash(&self) -> HashAlg {
        self.hash
    }

    pub const fn shake256_len(&self) -> Option<usize> {
        self.shake256_len
    }

    /// Digest length in bytes; the single source of truth for every digest
    /// buffer in the workspace.
    pub fn hash_len(&self) -> usize {
        match self.hash {
            HashAlg::Sha256 | HashAlg::Sha3_256 => 32,
            HashAlg::Sha512 => 64,
            HashAlg::Shake256 => match self.shake256_len {
                Some(len) => len,
                // Ruled out by the constructor.
                None => unreachable!(),
            },
        }
    }
}

/// Everything that can go wrong in a signing session.
///
/// Signature validity is *not* an error: `verify` returns `Ok(false)` for a
/// well-formed call whose signature does not check out, and reserves `Err`
/// for failures of the underlying provider machinery.
#[derive(Debug, PartialEq, Eq, Copy, Clone, thiserror::Error)]
pub enum SignError {
    /// A native provider call failed. `code` is the provider's own error
    /// code where it has one (OpenSSL packed codes), `-1` where it does not.
    #[error("provider call {call} failed with code {code}")]
    Provider { call: &'static str, code: i32 },
    /// The call shape is not valid against the configured provider.
    #[error("operation not supported by the configured provider")]
    UnsupportedOperation,
    /// The provider was compiled out of this build.
    #[error("provider {0} is not compiled into this build")]
    ProviderDisabled(Provider),
    #[error("provider {provider} does not implement {algorithm}")]
    UnsupportedAlgorithm {
        provider: Provider,
        algorithm: Algorithm,
    },
    #[error("provider {provider} does not implement {hash}")]
    UnsupportedHash { provider: Provider, hash: HashAlg },
    #[error("SHAKE-256 output length {requested:?} is not in 1..=64 bytes")]
    InvalidShakeLength { requested: Option<usize> },
    /// A keyed operation ran before any keypair was generated.
    #[error("no keypair has been generated in this session")]
    MissingKeypair,
    /// An RSA size lookup or plain `generate_keys` ran before the RSA
    /// modulus size was chosen.
    #[error("RSA parameters not chosen; call generate_rsa_keys first")]
    MissingRsaParams,
    #[error("RSA modulus size {bits} is not supported")]
    InvalidRsaModulus { bits: usize },
    #[error("RSA public exponent {exponent} is not supported")]
    InvalidRsaExponent { exponent: u32 },
    #[error("output buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A provider produced an encoding whose length disagrees with the size
    /// tables; a table entry or the provider build is wrong.
    #[error("{what} is {actual} bytes, expected {expected}")]
    EncodedLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl SignError {
    /// Collapse into the facade's nonzero integer status convention.
    /// Provider codes pass through untouched; everything else maps onto a
    /// fixed code, with [`StatusCode::UNSUPPORTED_OPERATION`] pinned to
    /// `-1000`.
    pub fn status(&self) -> StatusCode {
        match *self {
            SignError::Provider { code, .. } => match NonZeroI32::new(code) {
                Some(code) => StatusCode(code),
                None => StatusCode::PROVIDER_FAILURE,
            },
            SignError::UnsupportedOperation => StatusCode::UNSUPPORTED_OPERATION,
            SignError::ProviderDisabled(_) => StatusCode::PROVIDER_DISABLED,
            SignError::UnsupportedAlgorithm { .. } => StatusCode::UNSUPPORTED_ALGORITHM,
            SignError::UnsupportedHash { .. } => StatusCode::UNSUPPORTED_HASH,
            SignError::InvalidShakeLength { .. } => StatusCode::INVALID_SHAKE_LENGTH,
            SignError::MissingKeypair => StatusCode::MISSING_KEYPAIR,
            SignError::MissingRsaParams => StatusCode::MISSING_RSA_PARAMS,
            SignError::InvalidRsaModulus { .. } => StatusCode::INVALID_RSA_MODULUS,
            SignError::InvalidRsaExponent { .. } => StatusCode::INVALID_RSA_EXPONENT,
            SignError::BufferTooSmall { .. } => StatusCode::BUFFER_TOO_SMALL,
            SignError::EncodedLength { .. } => StatusCode::ENCODED_LENGTH,
        }
    }
}

/// Nonzero status code; the facade logs these on every failed operation.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct StatusCode(pub NonZeroI32);

impl StatusCode {
    /// Fallback for providers that report failure without a usable code.
    pub const PROVIDER_FAILURE: StatusCode = StatusCode::new(-1);
    /// The historical sentinel for a call shape the provider cannot serve.
    pub const UNSUPPORTED_OPERATION: StatusCode = StatusCode::new(-1000);
    pub const PROVIDER_DISABLED: StatusCode = StatusCode::new(-1001);
    pub const UNSUPPORTED_ALGORITHM: StatusCode = StatusCode::new(-1002);
    pub const UNSUPPORTED_HASH: StatusCode = StatusCode::new(-1003);
    pub const INVALID_SHAKE_LENGTH: StatusCode = StatusCode::new(-1004);
    pub const MISSING_KEYPAIR: StatusCode = StatusCode::new(-1005);
    pub const MISSING_RSA_PARAMS: StatusCode = StatusCode::new(-1006);
    pub const INVALID_RSA_MODULUS: StatusCode = StatusCode::new(-1007);
    pub const INVALID_RSA_EXPONENT: StatusCode = StatusCode::new(-1008);
    pub const BUFFER_TOO_SMALL: StatusCode = StatusCode::new(-1009);
    pub const ENCODED_LENGTH: StatusCode = StatusCode::new(-1010);

    const fn new(code: i32) -> StatusCode {
        StatusCode(match NonZeroI32::new(code) {
            Some(value) => value,
            _ => unreachable!(),
        })
    }

    pub const fn get(self) -> i32 {
        self.0.get()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_hash_lengths() {
        let sha256 = SessionConfig::new(Algorithm::Ed25519, HashAlg::Sha256, None).unwrap();
        assert_eq!(sha256.hash_len(), 32);
        let sha512 = SessionConfig::new(Algorithm::Ed25519, HashAlg::Sha512, None).unwrap();
        assert_eq!(sha512.hash_len(), 64);
        let sha3 = SessionConfig::new(Algorithm::Ed25519, HashAlg::Sha3_256, None).unwrap();
        assert_eq!(sha3.hash_len(), 32);
    }

    #[test]
    fn shake_length_is_configurable() {
        for len in [1, 16, 32, 64] {
            let config =
                SessionConfig::new(Algorithm::EcdsaSecp256r1, HashAlg::Shake256, Some(len))
                    .unwrap();
            assert_eq!(config.hash_len(), len);
            assert_eq!(config.shake256_len(), Some(len));
        }
    }

    #[test]
    fn shake_length_is_validated() {
        for requested in [None, Some(0), Some(65), Some(1024)] {
            let result =
                SessionConfig::new(Algorithm::EcdsaSecp256r1, HashAlg::Shake256, requested);
            assert_eq!(result, Err(SignError::InvalidShakeLength { requested }));
        }
    }

    #[test]
    fn shake_length_ignored_for_fixed_hashes() {
        let config = SessionConfig::new(Algorithm::Rsa, HashAlg::Sha256, Some(48)).unwrap();
        assert_eq!(config.shake256_len(), None);
        assert_eq!(config.hash_len(), 32);
    }

    #[test]
    fn unsupported_operation_keeps_its_sentinel() {
        assert_eq!(SignError::UnsupportedOperation.status().get(), -1000);
    }

    #[test]
    fn provider_codes_pass_through() {
        let err = SignError::Provider {
            call: "EcdsaSig::sign",
            code: 0x0508_A074,
        };
        assert_eq!(err.status().get(), 0x0508_A074);

        // A zero from the provider must still collapse to a nonzero status.
        let empty = SignError::Provider {
            call: "EcdsaSig::sign",
            code: 0,
        };
        assert_eq!(empty.status(), StatusCode::PROVIDER_FAILURE);
    }

    #[test]
    fn key_families() {
        assert_eq!(Algorithm::EcdsaSecp521r1.key_family(), KeyFamily::Ecdsa);
        assert_eq!(
            Algorithm::EcdsaBrainpoolP512r1.key_family(),
            KeyFamily::Ecdsa
        );
        assert_eq!(Algorithm::Ed25519.key_family(), KeyFamily::Ed25519);
        assert_eq!(Algorithm::Ed448.key_family(), KeyFamily::Ed448);
        assert_eq!(Algorithm::Rsa.key_family(), KeyFamily::Rsa);
    }

    #[test]
    fn configuration_log_names() {
        assert_eq!(Algorithm::EcdsaBrainpoolP256r1.name(), "ECDSA_BP256R1");
        assert_eq!(Algorithm::Ed448.name(), "EDDSA_448");
        assert_eq!(HashAlg::Shake256.name(), "SHAKE_256");
        assert_eq!(Provider::TinyEcc.name(), "TINYECC");
    }
}
