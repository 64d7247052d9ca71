//! Minimal P-256-only unisig signing backend.
//!
//! This is the memory-light provider: secp256r1 with SHA-256 or SHA-512,
//! fixed 64-byte raw signatures, no RSA and no other curves. It is the one
//! provider the facade's fixed-shape sign/verify call pair is valid against.
//! The crate itself is no_std; public-key export pulls in alloc through the
//! PEM encoder.
#![cfg_attr(not(test), no_std)]

use defmt_or_log::info;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use unisig_shared::{
    session_digest, sizes, Algorithm, HashAlg, Provider, SessionConfig, SignError, SignerBackend,
    FIXED_SIGNATURE_LEN,
};

/// The (algorithm, hash) pairs this backend implements.
pub fn supports(algorithm: Algorithm, hash: HashAlg) -> bool {
    algorithm == Algorithm::EcdsaSecp256r1 && matches!(hash, HashAlg::Sha256 | HashAlg::Sha512)
}

fn fail(call: &'static str) -> SignError {
    SignError::Provider { call, code: -1 }
}

/// A signing session backend that only ever holds one P-256 key.
pub struct Signer<Rng: rand_core::RngCore + rand_core::CryptoRng> {
    config: SessionConfig,
    rng: Rng,
    key: Option<p256::ecdsa::SigningKey>,
}

impl<Rng: rand_core::RngCore + rand_core::CryptoRng> Signer<Rng> {
    /// Set up a backend for `config`, drawing key material from `rng`.
    pub fn init(config: SessionConfig, rng: Rng) -> Result<Self, SignError> {
        if config.algorithm() != Algorithm::EcdsaSecp256r1 {
            return Err(SignError::UnsupportedAlgorithm {
                provider: Provider::TinyEcc,
                algorithm: config.algorithm(),
            });
        }
        if !matches!(config.hash(), HashAlg::Sha256 | HashAlg::Sha512) {
            return Err(SignError::UnsupportedHash {
                provider: Provider::TinyEcc,
                hash: config.hash(),
            });
        }
        Ok(Signer {
            config,
            rng,
            key: None,
        })
    }

    fn keyed(&self) -> Result<&p256::ecdsa::SigningKey, SignError> {
        self.key.as_ref().ok_or(SignError::MissingKeypair)
    }
}

impl<Rng: rand_core::RngCore + rand_core::CryptoRng> core::fmt::Debug for Signer<Rng> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        f.debug_struct("unisig_crypto_tinyecc::Signer")
            .field("config", &self.config)
            .field("rng", &core::any::type_name::<Rng>())
            .field("keyed", &self.key.is_some())
            .finish()
    }
}

impl<Rng: rand_core::RngCore + rand_core::CryptoRng> SignerBackend for Signer<Rng> {
    fn provider(&self) -> Provider {
        Provider::TinyEcc
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn generate_keys(&mut self) -> Result<(), SignError> {
        self.key = Some(p256::ecdsa::SigningKey::random(&mut self.rng));
        Ok(())
    }

    fn generate_rsa_keys(
        &mut self,
        _modulus_bits: usize,
        _public_exponent: u32,
    ) -> Result<(), SignError> {
        // Sessions on this backend are never RSA.
        Err(SignError::UnsupportedOperation)
    }

    fn sign(&mut self, message: &[u8], signature_out: &mut [u8]) -> Result<usize, SignError> {
        let digest = session_digest(&self.config, message);
        if signature_out.len() < FIXED_SIGNATURE_LEN {
            return Err(SignError::BufferTooSmall {
                needed: FIXED_SIGNATURE_LEN,
                got: signature_out.len(),
            });
        }
        let signature: p256::ecdsa::Signature = self
            .keyed()?
            .sign_prehash(digest.as_slice())
            .map_err(|_| fail("p256 sign_prehash"))?;
        signature_out[..FIXED_SIGNATURE_LEN].copy_from_slice(&signature.to_bytes());
        Ok(FIXED_SIGNATURE_LEN)
    }

    fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<bool, SignError> {
        let digest = session_digest(&self.config, message);
        let key = self.keyed()?;
        let valid = match p256::ecdsa::Signature::from_slice(signature) {
            Ok(signature) => key
                .verifying_key()
                .verify_prehash(digest.as_slice(), &signature)
                .is_ok(),
            // A malformed signature is an invalid one, not an error.
            Err(_) => false,
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
        let public = self.keyed()?.verifying_key();
        let der = public
            .to_public_key_der()
            .map_err(|_| fail("p256 to_public_key_der"))?;
        if der.as_bytes().len() != der_size {
            return Err(SignError::EncodedLength {
                what: "public key DER",
                expected: der_size,
                actual: der.as_bytes().len(),
            });
        }
        let pem = public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| fail("p256 to_public_key_pem"))?;
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
        sizes::signature_size(self.config.algorithm(), None)
    }

    fn key_size(&self) -> Result<usize, SignError> {
        sizes::key_size(self.config.algorithm(), None)
    }

    fn public_key_der_size(&self) -> Result<usize, SignError> {
        sizes::public_key_der_size(self.config.algorithm(), None)
    }

    fn public_key_pem_size(&self) -> Result<usize, SignError> {
        sizes::public_key_pem_size(self.config.algorithm(), None)
    }

    fn close(self) {
        info!("> tinyecc closed.");
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn keyed_signer(hash: HashAlg) -> Signer<rand_core::OsRng> {
        let config = SessionConfig::new(Algorithm::EcdsaSecp256r1, hash, None).unwrap();
        let mut signer = Signer::init(config, rand_core::OsRng).unwrap();
        signer.generate_keys().unwrap();
        signer
    }

    #[rstest]
    #[case(HashAlg::Sha256)]
    #[case(HashAlg::Sha512)]
    fn fixed_shape_roundtrip(#[case] hash: HashAlg) {
        let mut signer = keyed_signer(hash);
        let message = b"memory-light roundtrip";
        let mut signature = [0u8; FIXED_SIGNATURE_LEN];
        assert_eq!(signer.sign(message, &mut signature), Ok(FIXED_SIGNATURE_LEN));
        assert_eq!(signer.verify(message, &signature), Ok(true));

        signature[10] ^= 0x40;
        assert_eq!(signer.verify(message, &signature), Ok(false));
    }

    #[test]
    fn every_size_is_the_p256_one() {
        let signer = keyed_signer(HashAlg::Sha256);
        assert_eq!(signer.signature_size(), Ok(FIXED_SIGNATURE_LEN));
        assert_eq!(signer.key_size(), Ok(32));
        assert_eq!(signer.public_key_der_size(), Ok(91));
        assert_eq!(signer.public_key_pem_size(), Ok(178));
    }

    #[test]
    fn pem_export_is_nul_terminated() {
        let mut signer = keyed_signer(HashAlg::Sha256);
        let mut pem = [0xffu8; 179];
        let written = signer.export_public_key_pem(&mut pem).unwrap();
        assert_eq!(written, 178);
        assert_eq!(pem[written], 0);
        assert!(core::str::from_utf8(&pem[..written])
            .unwrap()
            .starts_with(sizes::PEM_HEADER));
    }

    #[rstest]
    #[case(Algorithm::EcdsaSecp521r1)]
    #[case(Algorithm::EcdsaBrainpoolP256r1)]
    #[case(Algorithm::Ed25519)]
    #[case(Algorithm::Rsa)]
    fn other_algorithms_are_refused(#[case] algorithm: Algorithm) {
        let config = SessionConfig::new(algorithm, HashAlg::Sha256, None).unwrap();
        assert_eq!(
            Signer::init(config, rand_core::OsRng).unwrap_err(),
            SignError::UnsupportedAlgorithm {
                provider: Provider::TinyEcc,
                algorithm,
            }
        );
    }

    #[rstest]
    #[case(HashAlg::Sha3_256, None)]
    #[case(HashAlg::Shake256, Some(32))]
    fn other_hashes_are_refused(#[case] hash: HashAlg, #[case] shake256_len: Option<usize>) {
        let config = SessionConfig::new(Algorithm::EcdsaSecp256r1, hash, shake256_len).unwrap();
        assert_eq!(
            Signer::init(config, rand_core::OsRng).unwrap_err(),
            SignError::UnsupportedHash {
                provider: Provider::TinyEcc,
                hash,
            }
        );
    }

    #[test]
    fn rsa_generation_is_never_supported() {
        let mut signer = keyed_signer(HashAlg::Sha256);
        let err = signer.generate_rsa_keys(2048, 65537).unwrap_err();
        assert_eq!(err, SignError::UnsupportedOperation);
        assert_eq!(err.status().get(), -1000);
    }

    #[test]
    fn signing_before_keying_is_refused() {
        let config = SessionConfig::new(Algorithm::EcdsaSecp256r1, HashAlg::Sha256, None).unwrap();
        let mut signer = Signer::init(config, rand_core::OsRng).unwrap();
        let mut signature = [0u8; FIXED_SIGNATURE_LEN];
        assert_eq!(
            signer.sign(b"msg", &mut signature),
            Err(SignError::MissingKeypair)
        );
    }
}
