//! unisig signing backend on the pure-Rust RustCrypto stack ([p256], [p521],
//! [ed25519_dalek], [rsa]).
//!
//! Covers both NIST curves, Ed25519 and RSA with all four session hashes.
//! The brainpool curves and Ed448 have no maintained implementation on this
//! stack, so sessions for those algorithms must run on the libcrypto-backed
//! provider instead.

use defmt_or_log::info;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey};
use unisig_shared::{
    session_digest, sizes, Algorithm, HashAlg, Provider, SessionConfig, SignError, SignerBackend,
};

/// The (algorithm, hash) pairs this backend implements.
pub fn supports(algorithm: Algorithm, _hash: HashAlg) -> bool {
    matches!(
        algorithm,
        Algorithm::EcdsaSecp256r1 | Algorithm::EcdsaSecp521r1 | Algorithm::Ed25519 | Algorithm::Rsa
    )
}

/// The p521 prehash primitives refuse digests shorter than half the field
/// element size; left-padding with zeros keeps the digest's integer value
/// unchanged.
const P521_MIN_PREHASH_LEN: usize = 33;

fn p521_prehash<'a>(
    digest: &'a [u8],
    padded: &'a mut [u8; P521_MIN_PREHASH_LEN],
) -> &'a [u8] {
    if digest.len() >= P521_MIN_PREHASH_LEN {
        digest
    } else {
        padded[P521_MIN_PREHASH_LEN - digest.len()..].copy_from_slice(digest);
        padded
    }
}

// RustCrypto error types carry no numeric codes, so failures report the call
// label with the fallback code.
fn fail(call: &'static str) -> SignError {
    SignError::Provider { call, code: -1 }
}

enum KeyMaterial {
    P256(p256::ecdsa::SigningKey),
    P521(p521::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
    Rsa {
        key: RsaPrivateKey,
        modulus_bits: usize,
    },
}

/// A signing session backend over the RustCrypto crates.
///
/// Its size depends on the implementation of Rng passed in at creation.
pub struct Signer<Rng: rand_core::RngCore + rand_core::CryptoRng> {
    config: SessionConfig,
    rng: Rng,
    key: Option<KeyMaterial>,
}

impl<Rng: rand_core::RngCore + rand_core::CryptoRng> Signer<Rng> {
    /// Set up a backend for `config`, drawing all key material from `rng`.
    pub fn init(config: SessionConfig, rng: Rng) -> Result<Self, SignError> {
        if !supports(config.algorithm(), config.hash()) {
            return Err(SignError::UnsupportedAlgorithm {
                provider: Provider::RustCrypto,
                algorithm: config.algorithm(),
            });
        }
        Ok(Signer {
            config,
            rng,
            key: None,
        })
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

impl<Rng: rand_core::RngCore + rand_core::CryptoRng> core::fmt::Debug for Signer<Rng> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        f.debug_struct("unisig_crypto_rustcrypto::Signer")
            .field("config", &self.config)
            .field("rng", &core::any::type_name::<Rng>())
            .field("keyed", &self.key.is_some())
            .finish()
    }
}

impl<Rng: rand_core::RngCore + rand_core::CryptoRng> SignerBackend for Signer<Rng> {
    fn provider(&self) -> Provider {
        Provider::RustCrypto
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn generate_keys(&mut self) -> Result<(), SignError> {
        let key = match self.config.algorithm() {
            Algorithm::EcdsaSecp256r1 => {
                KeyMaterial::P256(p256::ecdsa::SigningKey::random(&mut self.rng))
            }
            Algorithm::EcdsaSecp521r1 => {
                KeyMaterial::P521(p521::ecdsa::SigningKey::random(&mut self.rng))
            }
            Algorithm::Ed25519 => {
                KeyMaterial::Ed25519(ed25519_dalek::SigningKey::generate(&mut self.rng))
            }
            Algorithm::Rsa => return Err(SignError::MissingRsaParams),
            // init refused everything else already
            algorithm => {
                return Err(SignError::UnsupportedAlgorithm {
                    provider: Provider::RustCrypto,
                    algorithm,
                })
            }
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
        let key = RsaPrivateKey::new_with_exp(
            &mut self.rng,
            modulus_bits,
            &BigUint::from(public_exponent),
        )
        .map_err(|_| fail("RsaPrivateKey::new_with_exp"))?;
        self.key = Some(KeyMaterial::Rsa { key, modulus_bits });
        Ok(())
    }

    fn sign(&mut self, message: &[u8], signature_out: &mut [u8]) -> Result<usize, SignError> {
        let digest = session_digest(&self.config, message);
        let sig_size = self.signature_size()?;
        if signature_out.len() < sig_size {
            return Err(SignError::BufferTooSmall {
                needed: sig_size,
                got: signature_out.len(),
            });
        }
        match self.keyed()? {
            KeyMaterial::P256(key) => {
                let signature: p256::ecdsa::Signature = key
                    .sign_prehash(digest.as_slice())
                    .map_err(|_| fail("p256 sign_prehash"))?;
                signature_out[..sig_size].copy_from_slice(&signature.to_bytes());
            }
            KeyMaterial::P521(key) => {
                let mut padded = [0u8; P521_MIN_PREHASH_LEN];
                let prehash = p521_prehash(digest.as_slice(), &mut padded);
                let signature: p521::ecdsa::Signature = key
                    .sign_prehash(prehash)
                    .map_err(|_| fail("p521 sign_prehash"))?;
                signature_out[..sig_size].copy_from_slice(&signature.to_bytes());
            }
            KeyMaterial::Ed25519(key) => {
                let signature = key.sign(digest.as_slice());
                signature_out[..sig_size].copy_from_slice(&signature.to_bytes());
            }
            KeyMaterial::Rsa { key, .. } => {
                let signature = key
                    .sign(Pkcs1v15Sign::new_unprefixed(), digest.as_slice())
                    .map_err(|_| fail("RsaPrivateKey::sign"))?;
                signature_out[..sig_size].copy_from_slice(&signature);
            }
        }
        Ok(sig_size)
    }

    fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<bool, SignError> {
        let digest = session_digest(&self.config, message);
        let valid = match self.keyed()? {
            KeyMaterial::P256(key) => match p256::ecdsa::Signature::from_slice(signature) {
                Ok(signature) => key
                    .verifying_key()
                    .verify_prehash(digest.as_slice(), &signature)
                    .is_ok(),
                // A malformed signature is an invalid one, not an error.
                Err(_) => false,
            },
            KeyMaterial::P521(key) => {
                let mut padded = [0u8; P521_MIN_PREHASH_LEN];
                let prehash = p521_prehash(digest.as_slice(), &mut padded);
                match p521::ecdsa::Signature::from_slice(signature) {
                    // p521 0.13 gates `SigningKey::verifying_key` behind a
                    // feature it never defines; `From` is the same derivation.
                    Ok(signature) => p521::ecdsa::VerifyingKey::from(key)
                        .verify_prehash(prehash, &signature)
                        .is_ok(),
                    Err(_) => false,
                }
            }
            KeyMaterial::Ed25519(key) => match ed25519_dalek::Signature::from_slice(signature) {
                Ok(signature) => key
                    .verifying_key()
                    .verify(digest.as_slice(), &signature)
                    .is_ok(),
                Err(_) => false,
            },
            KeyMaterial::Rsa { key, .. } => key
                .to_public_key()
                .verify(Pkcs1v15Sign::new_unprefixed(), digest.as_slice(), signature)
                .is_ok(),
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
            KeyMaterial::P256(key) => {
                let public = key.verifying_key();
                (
                    public
                        .to_public_key_der()
                        .map_err(|_| fail("p256 to_public_key_der"))?,
                    public
                        .to_public_key_pem(LineEnding::LF)
                        .map_err(|_| fail("p256 to_public_key_pem"))?,
                )
            }
            KeyMaterial::P521(key) => {
                // The p521 wrapper key types don't implement EncodePublicKey;
                // p521::PublicKey of the same secret scalar does.
                let public = p521::PublicKey::from_secret_scalar(key.as_nonzero_scalar());
                (
                    public
                        .to_public_key_der()
                        .map_err(|_| fail("p521 to_public_key_der"))?,
                    public
                        .to_public_key_pem(LineEnding::LF)
                        .map_err(|_| fail("p521 to_public_key_pem"))?,
                )
            }
            KeyMaterial::Ed25519(key) => {
                let public = key.verifying_key();
                (
                    public
                        .to_public_key_der()
                        .map_err(|_| fail("ed25519 to_public_key_der"))?,
                    public
                        .to_public_key_pem(LineEnding::LF)
                        .map_err(|_| fail("ed25519 to_public_key_pem"))?,
                )
            }
            KeyMaterial::Rsa { key, .. } => {
                let public = key.to_public_key();
                (
                    public
                        .to_public_key_der()
                        .map_err(|_| fail("rsa to_public_key_der"))?,
                    public
                        .to_public_key_pem(LineEnding::LF)
                        .map_err(|_| fail("rsa to_public_key_pem"))?,
                )
            }
        };
        if der.as_bytes().len() != der_size {
            return Err(SignError::EncodedLength {
                what: "public key DER",
                expected: der_size,
                actual: der.as_bytes().len(),
            });
        }
        if pem.len() != pem_size {
            return Err(SignError::EncodedLength {
                what: "public key PEM",
                expected: pem_size,
                actual: pem.len(),
            });
        }
        pem_out[..pem_size].copy_from_slice(pem.as_bytes());
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
        info!("> rustcrypto closed.");
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use unisig_shared::MAX_DIGEST_LEN;

    use super::*;

    fn signer(
        algorithm: Algorithm,
        hash: HashAlg,
        shake256_len: Option<usize>,
    ) -> Signer<rand_core::OsRng> {
        let config = SessionConfig::new(algorithm, hash, shake256_len).unwrap();
        Signer::init(config, rand_core::OsRng).unwrap()
    }

    /// Deterministic byte stream so two signers can draw identical key
    /// material. Not a real generator, only for tests that need to hold the
    /// keypair fixed while varying something else.
    struct FixedRng(u8);

    impl rand_core::RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            let mut bytes = [0u8; 4];
            self.fill_bytes(&mut bytes);
            u32::from_le_bytes(bytes)
        }

        fn next_u64(&mut self) -> u64 {
            let mut bytes = [0u8; 8];
            self.fill_bytes(&mut bytes);
            u64::from_le_bytes(bytes)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for byte in dest {
                self.0 = self.0.wrapping_mul(31).wrapping_add(17);
                *byte = self.0;
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl rand_core::CryptoRng for FixedRng {}

    #[rstest]
    #[case(Algorithm::EcdsaSecp256r1, HashAlg::Sha256, None)]
    #[case(Algorithm::EcdsaSecp256r1, HashAlg::Sha3_256, None)]
    #[case(Algorithm::EcdsaSecp521r1, HashAlg::Sha512, None)]
    // Digest shorter than the p521 minimum prehash, exercises the padding.
    #[case(Algorithm::EcdsaSecp521r1, HashAlg::Sha256, None)]
    #[case(Algorithm::EcdsaSecp521r1, HashAlg::Shake256, Some(16))]
    #[case(Algorithm::Ed25519, HashAlg::Sha256, None)]
    #[case(Algorithm::Ed25519, HashAlg::Shake256, Some(64))]
    fn sign_verify_roundtrip(
        #[case] algorithm: Algorithm,
        #[case] hash: HashAlg,
        #[case] shake256_len: Option<usize>,
    ) {
        let mut signer = signer(algorithm, hash, shake256_len);
        signer.generate_keys().unwrap();

        let message = b"roundtrip message";
        let mut signature = [0u8; 256];
        let written = signer.sign(message, &mut signature).unwrap();
        assert_eq!(written, signer.signature_size().unwrap());

        assert_eq!(signer.verify(message, &signature[..written]), Ok(true));
        assert_eq!(signer.verify(b"other message", &signature[..written]), Ok(false));

        let mut tampered: Vec<u8> = signature[..written].to_vec();
        tampered[written / 2] ^= 0x01;
        assert_eq!(signer.verify(message, &tampered), Ok(false));
    }

    #[test]
    fn truncated_signatures_are_invalid_not_errors() {
        let mut signer = signer(Algorithm::EcdsaSecp256r1, HashAlg::Sha256, None);
        signer.generate_keys().unwrap();
        let mut signature = [0u8; 64];
        signer.sign(b"msg", &mut signature).unwrap();
        assert_eq!(signer.verify(b"msg", &signature[..63]), Ok(false));
        assert_eq!(signer.verify(b"msg", &[]), Ok(false));
    }

    // The same seed gives both signers the same Ed25519 keypair, so the
    // configured SHAKE-256 length is the only difference between them.
    #[test]
    fn shake256_length_changes_what_gets_signed() {
        let config = |len| {
            SessionConfig::new(Algorithm::Ed25519, HashAlg::Shake256, Some(len)).unwrap()
        };
        let mut short = Signer::init(config(32), FixedRng(7)).unwrap();
        let mut long = Signer::init(config(48), FixedRng(7)).unwrap();
        short.generate_keys().unwrap();
        long.generate_keys().unwrap();

        let message = b"length-parameterized digest";
        let mut signature = [0u8; 64];
        let written = short.sign(message, &mut signature).unwrap();

        assert_eq!(short.verify(message, &signature[..written]), Ok(true));
        assert_eq!(long.verify(message, &signature[..written]), Ok(false));
    }

    #[rstest]
    #[case(Algorithm::EcdsaBrainpoolP256r1)]
    #[case(Algorithm::EcdsaBrainpoolP512r1)]
    #[case(Algorithm::Ed448)]
    fn unsupported_algorithms_fail_at_init(#[case] algorithm: Algorithm) {
        let config = SessionConfig::new(algorithm, HashAlg::Sha256, None).unwrap();
        assert_eq!(
            Signer::init(config, rand_core::OsRng).unwrap_err(),
            SignError::UnsupportedAlgorithm {
                provider: Provider::RustCrypto,
                algorithm,
            }
        );
    }

    #[test]
    fn keyed_operations_need_a_keypair() {
        let mut signer = signer(Algorithm::Ed25519, HashAlg::Sha256, None);
        let mut signature = [0u8; 64];
        assert_eq!(
            signer.sign(b"msg", &mut signature),
            Err(SignError::MissingKeypair)
        );
        assert_eq!(
            signer.verify(b"msg", &signature),
            Err(SignError::MissingKeypair)
        );
        let mut pem = [0u8; 128];
        assert_eq!(
            signer.export_public_key_pem(&mut pem),
            Err(SignError::MissingKeypair)
        );
    }

    #[test]
    fn rsa_needs_explicit_parameters() {
        let mut signer = signer(Algorithm::Rsa, HashAlg::Sha256, None);
        assert_eq!(signer.generate_keys(), Err(SignError::MissingRsaParams));
        assert_eq!(signer.signature_size(), Err(SignError::MissingRsaParams));
        assert_eq!(
            signer.generate_rsa_keys(1024, 65537),
            Err(SignError::InvalidRsaModulus { bits: 1024 })
        );
        assert_eq!(
            signer.generate_rsa_keys(2048, 3),
            Err(SignError::InvalidRsaExponent { exponent: 3 })
        );
    }

    #[test]
    fn generate_rsa_keys_is_rsa_only() {
        let mut signer = signer(Algorithm::EcdsaSecp256r1, HashAlg::Sha256, None);
        assert_eq!(
            signer.generate_rsa_keys(2048, 65537),
            Err(SignError::UnsupportedOperation)
        );
    }

    #[test]
    fn rsa_2048_roundtrip_with_exact_sizes() {
        let mut signer = signer(Algorithm::Rsa, HashAlg::Sha256, None);
        signer.generate_rsa_keys(2048, 65537).unwrap();
        assert_eq!(signer.signature_size(), Ok(256));
        assert_eq!(signer.key_size(), Ok(256));
        assert_eq!(signer.public_key_der_size(), Ok(294));
        assert_eq!(signer.public_key_pem_size(), Ok(451));

        let message = b"rsa roundtrip";
        let mut signature = [0u8; 256];
        let written = signer.sign(message, &mut signature).unwrap();
        assert_eq!(written, 256);
        assert_eq!(signer.verify(message, &signature), Ok(true));

        signature[0] ^= 0x80;
        assert_eq!(signer.verify(message, &signature), Ok(false));
    }

    #[test]
    fn pem_export_is_nul_terminated_and_exact() {
        let mut signer = signer(Algorithm::Ed25519, HashAlg::Sha256, None);
        signer.generate_keys().unwrap();

        let pem_size = signer.public_key_pem_size().unwrap();
        assert_eq!(pem_size, 113);

        let mut pem = vec![0xffu8; pem_size + 1];
        let written = signer.export_public_key_pem(&mut pem).unwrap();
        assert_eq!(written, pem_size);
        assert_eq!(pem[written], 0);

        let text = core::str::from_utf8(&pem[..written]).unwrap();
        assert!(text.starts_with(sizes::PEM_HEADER));
        assert!(text.ends_with(sizes::PEM_FOOTER));

        let mut small = vec![0u8; pem_size];
        assert_eq!(
            signer.export_public_key_pem(&mut small),
            Err(SignError::BufferTooSmall {
                needed: pem_size + 1,
                got: pem_size,
            })
        );
    }

    #[test]
    fn undersized_signature_buffers_are_refused() {
        let mut signer = signer(Algorithm::EcdsaSecp521r1, HashAlg::Sha512, None);
        signer.generate_keys().unwrap();
        let mut small = [0u8; MAX_DIGEST_LEN];
        assert_eq!(
            signer.sign(b"msg", &mut small),
            Err(SignError::BufferTooSmall {
                needed: 132,
                got: MAX_DIGEST_LEN,
            })
        );
    }
}
