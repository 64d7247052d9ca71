//! unisig signing backend on the [openssl] crate (libcrypto bindings).
//!
//! The only backend that covers the whole algorithm matrix: NIST and
//! brainpool curves, Ed25519, Ed448 and RSA with every session hash.
//! Message digests run through libcrypto too, so a session on this backend
//! never mixes hash stacks. Linking needs a native libcrypto; the `vendored`
//! feature builds one from source instead.

use defmt_or_log::info;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::{Padding, Rsa};
use unisig_shared::{
    sizes, Algorithm, DigestBuf, HashAlg, KeyFamily, Provider, SessionConfig, SignError,
    SignerBackend,
};

/// The (algorithm, hash) pairs this backend implements: all of them.
pub fn supports(_algorithm: Algorithm, _hash: HashAlg) -> bool {
    true
}

// libcrypto failures surface the first queued error code; an empty queue
// reports the fallback code.
fn provider_err(call: &'static str) -> impl FnOnce(ErrorStack) -> SignError {
    move |stack| {
        let code = stack
            .errors()
            .first()
            .map(|error| error.code() as i32)
            .filter(|&code| code != 0)
            .unwrap_or(-1);
        SignError::Provider { call, code }
    }
}

// Curve table for the ECDSA family; the key family match keeps the other
// algorithms out.
fn curve_nid(algorithm: Algorithm) -> Nid {
    match algorithm {
        Algorithm::EcdsaBrainpoolP256r1 => Nid::BRAINPOOL_P256R1,
        Algorithm::EcdsaBrainpoolP512r1 => Nid::BRAINPOOL_P512R1,
        Algorithm::EcdsaSecp256r1 => Nid::X9_62_PRIME256V1,
        Algorithm::EcdsaSecp521r1 => Nid::SECP521R1,
        _ => unreachable!(),
    }
}

fn hash_message(config: &SessionConfig, message: &[u8]) -> Result<DigestBuf, SignError> {
    let digest = match config.hash() {
        HashAlg::Sha256 => openssl::hash::hash(MessageDigest::sha256(), message),
        HashAlg::Sha512 => openssl::hash::hash(MessageDigest::sha512(), message),
        HashAlg::Sha3_256 => openssl::hash::hash(MessageDigest::sha3_256(), message),
        HashAlg::Shake256 => {
            let mut buf = DigestBuf::new();
            buf.len = config.hash_len();
            openssl::hash::hash_xof(
                MessageDigest::shake_256(),
                message,
                &mut buf.content[..buf.len],
            )
            .map_err(provider_err("hash_xof"))?;
            return Ok(buf);
        }
    }
    .map_err(provider_err("hash"))?;
    Ok(DigestBuf::new_from_slice(&digest).expect("digest fits the buffer"))
}

enum KeyMaterial {
    Ec(EcKey<Private>),
    Ed(PKey<Private>),
    Rsa {
        key: Rsa<Private>,
        modulus_bits: usize,
    },
}

/// A signing session backend over libcrypto.
///
/// Key material lives inside libcrypto structures and randomness comes from
/// the provider's own DRBG, so unlike the pure-Rust backends this one takes
/// no caller-supplied generator.
pub struct Signer {
    config: SessionConfig,
    key: Option<KeyMaterial>,
}

impl Signer {
    /// Set up a backend for `config`.
    pub fn init(config: SessionConfig) -> Result<Self, SignError> {
        openssl::init();
        Ok(Signer { config, key: None })
    }

    fn keyed(&self) -> Result<&KeyMaterial, SignError> {
        self.key.as_ref().ok_or(SignError::MissingKeypair)
    }

    fn rsa_modulus_bits(&self) -> Option<usize> {
        match self.key {
            Some(KeyMaterial::Rsa { modulus_bits, .. }) => Some(modulus_bits),
            _ => None,
        }
    }
}

// The libcrypto key wrappers have no Debug implementations.
impl core::fmt::Debug for Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        f.debug_struct("unisig_crypto_openssl::Signer")
            .field("config", &self.config)
            .field("keyed", &self.key.is_some())
            .finish()
    }
}

impl SignerBackend for Signer {
    fn provider(&self) -> Provider {
        Provider::Openssl
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn generate_keys(&mut self) -> Result<(), SignError> {
        let key = match self.config.algorithm().key_family() {
            KeyFamily::Ecdsa => {
                let group = EcGroup::from_curve_name(curve_nid(self.config.algorithm()))
                    .map_err(provider_err("EcGroup::from_curve_name"))?;
                KeyMaterial::Ec(EcKey::generate(&group).map_err(provider_err("EcKey::generate"))?)
            }
            KeyFamily::Ed25519 => KeyMaterial::Ed(
                PKey::generate_ed25519().map_err(provider_err("PKey::generate_ed25519"))?,
            ),
            KeyFamily::Ed448 => KeyMaterial::Ed(
                PKey::generate_ed448().map_err(provider_err("PKey::generate_ed448"))?,
            ),
            KeyFamily::Rsa => return Err(SignError::MissingRsaParams),
        };
        self.key = Some(key);
        Ok(())
    }

    fn generate_rsa_keys(
        &mut self,
        modulus_bits: usize,
        public_exponent: u32,
    ) -> Result<(), SignError> {
        if !self.config.algorithm().is_rsa() {
            return Err(SignError::UnsupportedOperation);
        }
        sizes::check_rsa_params(modulus_bits, public_exponent)?;
        let exponent = BigNum::from_u32(public_exponent).map_err(provider_err("BigNum::from_u32"))?;
        let key = Rsa::generate_with_e(modulus_bits as u32, &exponent)
            .map_err(provider_err("Rsa::generate_with_e"))?;
        self.key = Some(KeyMaterial::Rsa { key, modulus_bits });
        Ok(())
    }

    fn sign(&mut self, message: &[u8], signature_out: &mut [u8]) -> Result<usize, SignError> {
        let digest = hash_message(&self.config, message)?;
        let sig_size = self.signature_size()?;
        if signature_out.len() < sig_size {
            return Err(SignError::BufferTooSmall {
                needed: sig_size,
                got: signature_out.len(),
            });
        }
        match self.keyed()? {
            KeyMaterial::Ec(key) => {
                let element = sig_size / 2;
                let signature = EcdsaSig::sign(digest.as_slice(), key)
                    .map_err(provider_err("EcdsaSig::sign"))?;
                let r = signature
                    .r()
                    .to_vec_padded(element as i32)
                    .map_err(provider_err("BigNumRef::to_vec_padded"))?;
                let s = signature
                    .s()
                    .to_vec_padded(element as i32)
                    .map_err(provider_err("BigNumRef::to_vec_padded"))?;
                signature_out[..element].copy_from_slice(&r);
                signature_out[element..sig_size].copy_from_slice(&s);
            }
            KeyMaterial::Ed(key) => {
                let mut signer = openssl::sign::Signer::new_without_digest(key)
                    .map_err(provider_err("Signer::new_without_digest"))?;
                let written = signer
                    .sign_oneshot(&mut signature_out[..sig_size], digest.as_slice())
                    .map_err(provider_err("Signer::sign_oneshot"))?;
                if written != sig_size {
                    return Err(SignError::EncodedLength {
                        what: "signature",
                        expected: sig_size,
                        actual: written,
                    });
                }
            }
            KeyMaterial::Rsa { key, .. } => {
                key.private_encrypt(
                    digest.as_slice(),
                    &mut signature_out[..sig_size],
                    Padding::PKCS1,
                )
                .map_err(provider_err("Rsa::private_encrypt"))?;
            }
        }
        Ok(sig_size)
    }

    fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<bool, SignError> {
        let digest = hash_message(&self.config, message)?;
        let valid = match self.keyed()? {
            KeyMaterial::Ec(key) => {
                let sig_size = self.signature_size()?;
                if signature.len() != sig_size {
                    // Only a full-width r||s pair can reach libcrypto.
                    false
                } else {
                    let (r, s) = signature.split_at(sig_size / 2);
                    let r = BigNum::from_slice(r).map_err(provider_err("BigNum::from_slice"))?;
                    let s = BigNum::from_slice(s).map_err(provider_err("BigNum::from_slice"))?;
                    let signature = EcdsaSig::from_private_components(r, s)
                        .map_err(provider_err("EcdsaSig::from_private_components"))?;
                    signature
                        .verify(digest.as_slice(), key)
                        .map_err(provider_err("EcdsaSig::verify"))?
                }
            }
            KeyMaterial::Ed(key) => {
                let mut verifier = openssl::sign::Verifier::new_without_digest(key)
                    .map_err(provider_err("Verifier::new_without_digest"))?;
                verifier
                    .verify_oneshot(signature, digest.as_slice())
                    .map_err(provider_err("Verifier::verify_oneshot"))?
            }
            KeyMaterial::Rsa { key, .. } => {
                let mut decrypted = [0u8; sizes::MAX_RSA_SIGNATURE_LEN];
                match key.public_decrypt(signature, &mut decrypted, Padding::PKCS1) {
                    // An unpadding failure means a forged or damaged
                    // signature, not a provider fault.
                    Err(_) => false,
                    Ok(written) => &decrypted[..written] == digest.as_slice(),
                }
            }
        };
        Ok(valid)
    }

    fn export_public_key_pem(&mut self, pem_out: &mut [u8]) -> Result<usize, SignError> {
        let der_size = self.public_key_der_size()?;
        let pem_size = self.public_key_pem_size()?;
        if pem_out.len() < pem_size + 1 {
            return Err(SignError::BufferTooSmall {
                needed: pem_size + 1,
                got: pem_out.len(),
            });
        }
        let (der, pem) = match self.keyed()? {
            KeyMaterial::Ec(key) => (
                key.public_key_to_der()
                    .map_err(provider_err("EcKey::public_key_to_der"))?,
                key.public_key_to_pem()
                    .map_err(provider_err("EcKey::public_key_to_pem"))?,
            ),
            KeyMaterial::Ed(key) => (
                key.public_key_to_der()
                    .map_err(provider_err("PKey::public_key_to_der"))?,
                key.public_key_to_pem()
                    .map_err(provider_err("PKey::public_key_to_pem"))?,
            ),
            KeyMaterial::Rsa { key, .. } => (
                key.public_key_to_der()
                    .map_err(provider_err("Rsa::public_key_to_der"))?,
                key.public_key_to_pem()
                    .map_err(provider_err("Rsa::public_key_to_pem"))?,
            ),
        };
        if der.len() != der_size {
            return Err(SignError::EncodedLength {
                what: "public key DER",
                expected: der_size,
                actual: der.len(),
            });
        }
        if pem.len() != pem_size {
            return Err(SignError::EncodedLength {
                what: "public key PEM",
                expected: pem_size,
                actual: pem.len(),
            });
        }
        pem_out[..pem_size].copy_from_slice(&pem);
        pem_out[pem_size] = 0;
        Ok(pem_size)
    }

    fn signature_size(&self) -> Result<usize, SignError> {
        sizes::signature_size(self.config.algorithm(), self.rsa_modulus_bits())
    }

    fn key_size(&self) -> Result<usize, SignError> {
        sizes::key_size(self.config.algorithm(), self.rsa_modulus_bits())
    }

    fn public_key_der_size(&self) -> Result<usize, SignError> {
        sizes::public_key_der_size(self.config.algorithm(), self.rsa_modulus_bits())
    }

    fn public_key_pem_size(&self) -> Result<usize, SignError> {
        sizes::public_key_pem_size(self.config.algorithm(), self.rsa_modulus_bits())
    }

    fn close(self) {
        info!("> openssl closed.");
    }
}
