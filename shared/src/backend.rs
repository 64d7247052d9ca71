//! The seam between the signing facade and its provider backends.

use crate::{Provider, SessionConfig, SignError};

/// One signing provider, fully configured and owning its native key material.
///
/// A backend moves through a fixed life cycle. Construction (each backend's
/// inherent `init`) validates the configured algorithm/hash pair against the
/// provider's support matrix and prepares the provider subsystem, yielding a
/// configured-but-unkeyed value; a failed `init` returns `Err` with nothing
/// left to release. `generate_keys` / `generate_rsa_keys` move it to the
/// keyed state in which `sign`, `verify` and the public-key export operate;
/// calling those earlier fails with [`SignError::MissingKeypair`]. `close`
/// consumes the backend, and plain `drop` releases the same resources for
/// callers that forget it.
///
/// Signing is hash-then-sign for every key family: the message is digested
/// per the session configuration and the digest is what reaches the
/// provider's signing primitive. ECDSA signatures are exchanged in raw
/// fixed-width `r || s` form, RSA uses PKCS#1 v1.5 over the bare digest
/// (no DigestInfo prefix), and the EdDSA variants sign the digest bytes with
/// their pure mode. Size queries are table lookups that never touch the
/// provider and stay constant for the life of a keyed session.
pub trait SignerBackend: core::fmt::Debug {
    /// The provider this backend adapts.
    fn provider(&self) -> Provider;

    /// The configuration the backend was initialized with.
    fn config(&self) -> &SessionConfig;

    /// Generate a keypair for the configured algorithm. RSA sessions must
    /// use [`Self::generate_rsa_keys`] instead and fail here with
    /// [`SignError::MissingRsaParams`].
    fn generate_keys(&mut self) -> Result<(), SignError>;

    /// Generate an RSA keypair with the given modulus size and public
    /// exponent, and record the modulus size for later size lookups.
    /// Fails with [`SignError::UnsupportedOperation`] on non-RSA sessions.
    fn generate_rsa_keys(
        &mut self,
        modulus_bits: usize,
        public_exponent: u32,
    ) -> Result<(), SignError>;

    /// Hash `message` and sign the digest into `signature_out`, returning
    /// the number of bytes written (always exactly `signature_size()`).
    fn sign(&mut self, message: &[u8], signature_out: &mut [u8]) -> Result<usize, SignError>;

    /// Hash `message` and check `signature` against it. `Ok(false)` means a
    /// well-formed call with an invalid signature, including signatures of
    /// the wrong length; `Err` is reserved for provider failures.
    fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<bool, SignError>;

    /// Export the public key as a NUL-terminated SPKI PEM. `pem_out` must
    /// hold `public_key_pem_size() + 1` bytes; the returned length excludes
    /// the terminator. Both the intermediate DER and the final PEM length
    /// are checked against the size tables.
    fn export_public_key_pem(&mut self, pem_out: &mut [u8]) -> Result<usize, SignError>;

    /// Exact signature length in bytes for the configured algorithm.
    fn signature_size(&self) -> Result<usize, SignError>;

    /// Key element length in bytes: the curve coordinate size for ECDSA,
    /// the fixed key size for EdDSA, the modulus size for RSA.
    fn key_size(&self) -> Result<usize, SignError>;

    /// Exact SPKI DER length of the public key.
    fn public_key_der_size(&self) -> Result<usize, SignError>;

    /// Exact PEM length of the public key, excluding the NUL terminator.
    fn public_key_pem_size(&self) -> Result<usize, SignError>;

    /// Release the backend and its native key material. Valid in every
    /// state, including before any keypair exists.
    fn close(self)
    where
        Self: Sized;
}
