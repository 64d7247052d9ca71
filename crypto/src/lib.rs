//! Signing backend dispatch for the unisig crate
//!
//! A session names its provider at configure time, so unlike a compile-time
//! backend alias this crate keeps every compiled-in backend behind one tagged
//! enum and routes calls at runtime. Providers that were not compiled in stay
//! selectable at the API surface and fail with a typed error instead of a
//! build break.
#![cfg_attr(not(test), no_std)]

#[cfg(not(any(feature = "openssl", feature = "rustcrypto", feature = "tinyecc")))]
compile_error!("at least one of the provider features (openssl, rustcrypto, tinyecc) is required");

use unisig_shared::{Algorithm, HashAlg, Provider, SessionConfig, SignError};

/// Convenience re-export
pub use unisig_shared::SignerBackend;

/// The compiled-in signing backends, tagged by provider.
#[derive(Debug)]
pub enum Backend {
    #[cfg(feature = "openssl")]
    Openssl(unisig_crypto_openssl::Signer),
    #[cfg(feature = "rustcrypto")]
    RustCrypto(unisig_crypto_rustcrypto::Signer<rand_core::OsRng>),
    #[cfg(feature = "tinyecc")]
    TinyEcc(unisig_crypto_tinyecc::Signer<rand_core::OsRng>),
}

macro_rules! dispatch {
    ($backend:expr, $inner:ident => $call:expr) => {
        match $backend {
            #[cfg(feature = "openssl")]
            Backend::Openssl($inner) => $call,
            #[cfg(feature = "rustcrypto")]
            Backend::RustCrypto($inner) => $call,
            #[cfg(feature = "tinyecc")]
            Backend::TinyEcc($inner) => $call,
        }
    };
}

impl Backend {
    /// Open a backend on `provider` for `config`.
    ///
    /// Naming a provider that was not compiled in fails with
    /// [`SignError::ProviderDisabled`]; naming one that does not implement
    /// the configured algorithm fails with the backend's own error.
    pub fn new(provider: Provider, config: SessionConfig) -> Result<Self, SignError> {
        match provider {
            #[cfg(feature = "openssl")]
            Provider::Openssl => Ok(Backend::Openssl(unisig_crypto_openssl::Signer::init(
                config,
            )?)),
            #[cfg(feature = "rustcrypto")]
            Provider::RustCrypto => Ok(Backend::RustCrypto(
                unisig_crypto_rustcrypto::Signer::init(config, rand_core::OsRng)?,
            )),
            #[cfg(feature = "tinyecc")]
            Provider::TinyEcc => Ok(Backend::TinyEcc(unisig_crypto_tinyecc::Signer::init(
                config,
                rand_core::OsRng,
            )?)),
            #[allow(unreachable_patterns)]
            other => Err(SignError::ProviderDisabled(other)),
        }
    }

    /// Whether `provider` is compiled in and implements the
    /// (algorithm, hash) pair.
    pub fn supports(provider: Provider, algorithm: Algorithm, hash: HashAlg) -> bool {
        match provider {
            #[cfg(feature = "openssl")]
            Provider::Openssl => unisig_crypto_openssl::supports(algorithm, hash),
            #[cfg(feature = "rustcrypto")]
            Provider::RustCrypto => unisig_crypto_rustcrypto::supports(algorithm, hash),
            #[cfg(feature = "tinyecc")]
            Provider::TinyEcc => unisig_crypto_tinyecc::supports(algorithm, hash),
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }
}

impl SignerBackend for Backend {
    fn provider(&self) -> Provider {
        dispatch!(self, inner => inner.provider())
    }

    fn config(&self) -> &SessionConfig {
        dispatch!(self, inner => inner.config())
    }

    fn generate_keys(&mut self) -> Result<(), SignError> {
        dispatch!(self, inner => inner.generate_keys())
    }

    fn generate_rsa_keys(
        &mut self,
        modulus_bits: usize,
        public_exponent: u32,
    ) -> Result<(), SignError> {
        dispatch!(self, inner => inner.generate_rsa_keys(modulus_bits, public_exponent))
    }

    fn sign(&mut self, message: &[u8], signature_out: &mut [u8]) -> Result<usize, SignError> {
        dispatch!(self, inner => inner.sign(message, signature_out))
    }

    fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<bool, SignError> {
        dispatch!(self, inner => inner.verify(message, signature))
    }

    fn export_public_key_pem(&mut self, pem_out: &mut [u8]) -> Result<usize, SignError> {
        dispatch!(self, inner => inner.export_public_key_pem(pem_out))
    }

    fn signature_size(&self) -> Result<usize, SignError> {
        dispatch!(self, inner => inner.signature_size())
    }

    fn key_size(&self) -> Result<usize, SignError> {
        dispatch!(self, inner => inner.key_size())
    }

    fn public_key_der_size(&self) -> Result<usize, SignError> {
        dispatch!(self, inner => inner.public_key_der_size())
    }

    fn public_key_pem_size(&self) -> Result<usize, SignError> {
        dispatch!(self, inner => inner.public_key_pem_size())
    }

    fn close(self) {
        dispatch!(self, inner => inner.close())
    }
}

/// See test_implements_backend
#[allow(dead_code)]
fn test_helper<T: SignerBackend>() {}

/// Ensure at build time that the dispatch enum actually implements the
/// backend trait, whatever the feature selection.
#[allow(dead_code)]
fn test_implements_backend() {
    test_helper::<Backend>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::new(Algorithm::EcdsaSecp256r1, HashAlg::Sha256, None).unwrap()
    }

    #[cfg(feature = "rustcrypto")]
    #[test]
    fn dispatches_to_the_selected_provider() {
        let mut backend = Backend::new(Provider::RustCrypto, config()).unwrap();
        assert_eq!(backend.provider(), Provider::RustCrypto);

        backend.generate_keys().unwrap();
        let mut signature = [0u8; 64];
        let written = backend.sign(b"routed", &mut signature).unwrap();
        assert_eq!(written, 64);
        assert_eq!(backend.verify(b"routed", &signature), Ok(true));
        backend.close();
    }

    #[cfg(feature = "tinyecc")]
    #[test]
    fn capability_matrix_follows_the_provider() {
        assert!(Backend::supports(
            Provider::TinyEcc,
            Algorithm::EcdsaSecp256r1,
            HashAlg::Sha256
        ));
        assert!(!Backend::supports(
            Provider::TinyEcc,
            Algorithm::Ed25519,
            HashAlg::Sha256
        ));
        assert!(!Backend::supports(
            Provider::TinyEcc,
            Algorithm::EcdsaSecp256r1,
            HashAlg::Sha3_256
        ));
    }

    #[cfg(not(feature = "openssl"))]
    #[test]
    fn compiled_out_providers_are_disabled() {
        assert_eq!(
            Backend::new(Provider::Openssl, config()).unwrap_err(),
            SignError::ProviderDisabled(Provider::Openssl)
        );
        assert!(!Backend::supports(
            Provider::Openssl,
            Algorithm::Rsa,
            HashAlg::Sha256
        ));
    }
}
