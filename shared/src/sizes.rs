//! Per-algorithm size tables.
//!
//! Signature, key-element, public-key DER and PEM lengths are all known up
//! front for every algorithm this workspace supports, so they are looked up
//! here instead of being measured at runtime. RSA entries additionally need
//! the modulus size, which a session only has after `generate_rsa_keys`;
//! until then the RSA lookups fail with [`SignError::MissingRsaParams`].
//!
//! Every entry is pinned by round-trip tests against real exported keys, for
//! each provider that can produce them.

use crate::{Algorithm, SignError};

/// The RSA modulus sizes the size tables (and therefore the providers) accept.
pub const SUPPORTED_RSA_MODULUS_BITS: [usize; 3] = [2048, 3072, 4096];

/// The only accepted RSA public exponent, F4.
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// Largest RSA signature (and modulus) the workspace handles, in bytes.
pub const MAX_RSA_SIGNATURE_LEN: usize = 512;

/// First line of an SPKI PEM, including the newline.
pub const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----\n";

/// Last line of an SPKI PEM, including the newline.
pub const PEM_FOOTER: &str = "-----END PUBLIC KEY-----\n";

/// Base64 column width used by every PEM encoder in the workspace.
const PEM_LINE_WIDTH: usize = 64;

/// SPKI framing overhead over the raw modulus for the supported RSA sizes
/// (long-form DER lengths throughout, 65537 exponent).
const RSA_SPKI_OVERHEAD: usize = 38;

/// Exact signature length in bytes. ECDSA is the raw fixed-width `r || s`
/// pair, EdDSA the fixed form of each curve, RSA one modulus.
pub fn signature_size(
    algorithm: Algorithm,
    rsa_modulus_bits: Option<usize>,
) -> Result<usize, SignError> {
    Ok(match algorithm {
        Algorithm::EcdsaBrainpoolP256r1 | Algorithm::EcdsaSecp256r1 => 64,
        Algorithm::EcdsaBrainpoolP512r1 => 128,
        Algorithm::EcdsaSecp521r1 => 132,
        Algorithm::Ed25519 => 64,
        Algorithm::Ed448 => 114,
        Algorithm::Rsa => checked_rsa_bits(rsa_modulus_bits)? / 8,
    })
}

/// Key element length in bytes: curve coordinate size for ECDSA, fixed key
/// size for EdDSA, modulus size for RSA.
pub fn key_size(algorithm: Algorithm, rsa_modulus_bits: Option<usize>) -> Result<usize, SignError> {
    Ok(match algorithm {
        Algorithm::EcdsaBrainpoolP256r1 | Algorithm::EcdsaSecp256r1 => 32,
        Algorithm::EcdsaBrainpoolP512r1 => 64,
        Algorithm::EcdsaSecp521r1 => 66,
        Algorithm::Ed25519 => 32,
        Algorithm::Ed448 => 57,
        Algorithm::Rsa => checked_rsa_bits(rsa_modulus_bits)? / 8,
    })
}

/// Exact SubjectPublicKeyInfo DER length of an exported public key.
pub fn public_key_der_size(
    algorithm: Algorithm,
    rsa_modulus_bits: Option<usize>,
) -> Result<usize, SignError> {
    Ok(match algorithm {
        Algorithm::EcdsaSecp256r1 => 91,
        Algorithm::EcdsaBrainpoolP256r1 => 92,
        Algorithm::EcdsaSecp521r1 => 158,
        Algorithm::EcdsaBrainpoolP512r1 => 158,
        Algorithm::Ed25519 => 44,
        Algorithm::Ed448 => 69,
        Algorithm::Rsa => checked_rsa_bits(rsa_modulus_bits)? / 8 + RSA_SPKI_OVERHEAD,
    })
}

/// Exact PEM length of an exported public key, excluding any NUL terminator:
/// header, 64-column LF-terminated base64 body, footer.
pub fn public_key_pem_size(
    algorithm: Algorithm,
    rsa_modulus_bits: Option<usize>,
) -> Result<usize, SignError> {
    let der = public_key_der_size(algorithm, rsa_modulus_bits)?;
    let base64 = der.div_ceil(3) * 4;
    let lines = base64.div_ceil(PEM_LINE_WIDTH);
    Ok(PEM_HEADER.len() + base64 + lines + PEM_FOOTER.len())
}

/// Validate an RSA keypair request against the tables.
pub fn check_rsa_params(modulus_bits: usize, public_exponent: u32) -> Result<(), SignError> {
    if !SUPPORTED_RSA_MODULUS_BITS.contains(&modulus_bits) {
        return Err(SignError::InvalidRsaModulus { bits: modulus_bits });
    }
    if public_exponent != RSA_PUBLIC_EXPONENT {
        return Err(SignError::InvalidRsaExponent {
            exponent: public_exponent,
        });
    }
    Ok(())
}

fn checked_rsa_bits(rsa_modulus_bits: Option<usize>) -> Result<usize, SignError> {
    let bits = rsa_modulus_bits.ok_or(SignError::MissingRsaParams)?;
    if !SUPPORTED_RSA_MODULUS_BITS.contains(&bits) {
        return Err(SignError::InvalidRsaModulus { bits });
    }
    Ok(bits)
}
