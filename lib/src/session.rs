//! The signing session facade over the provider dispatch.

use defmt_or_log::{error, info};
use unisig_crypto::Backend;
use unisig_shared::diag::{self, OpMeter};
use unisig_shared::{
    Algorithm, HashAlg, Provider, SessionConfig, SignError, SignerBackend, FIXED_SIGNATURE_LEN,
};

/// One signing session: a provider, an algorithm, a hash and at most one
/// keypair, configured once and used until closed.
///
/// Every operation logs its outcome, and successful operations also log
/// their elapsed time and net heap usage in the facade's uniform format.
#[derive(Debug)]
pub struct SigningSession {
    backend: Backend,
}

impl SigningSession {
    /// Configure a session on `provider`.
    ///
    /// `shake256_len` is the digest length in bytes when `hash` is
    /// [`HashAlg::Shake256`] (1 to 64) and is ignored otherwise. Fails
    /// without side effects when the configuration is invalid, the provider
    /// is compiled out, or the provider does not implement the requested
    /// pair; the caller is free to configure a fresh session with different
    /// parameters afterwards.
    pub fn configure(
        provider: Provider,
        algorithm: Algorithm,
        hash: HashAlg,
        shake256_len: Option<usize>,
    ) -> Result<Self, SignError> {
        match Self::open(provider, algorithm, hash, shake256_len) {
            Ok(session) => {
                diag::log_success("init");
                Ok(session)
            }
            Err(err) => {
                diag::log_error("init", err.status().get());
                Err(err)
            }
        }
    }

    fn open(
        provider: Provider,
        algorithm: Algorithm,
        hash: HashAlg,
        shake256_len: Option<usize>,
    ) -> Result<SigningSession, SignError> {
        let config = SessionConfig::new(algorithm, hash, shake256_len)?;
        // The configuration lines print before the backend starts, so a
        // failed init still reports what was asked of it.
        info!(
            "> initialized provider [{}] with algorithm [{}] and hash [{}].",
            provider.name(),
            algorithm.name(),
            hash.name()
        );
        if let Some(len) = config.shake256_len() {
            info!("> SHAKE_256 length [{}].", len);
        }
        let meter = OpMeter::start("init");
        let backend = Backend::new(provider, config)?;
        meter.finish().log();
        Ok(SigningSession { backend })
    }

    /// Generate a keypair for the configured algorithm, replacing any
    /// previous one.
    ///
    /// RSA sessions carry explicit parameters and must use
    /// [`SigningSession::generate_rsa_keys`] instead.
    pub fn generate_keys(&mut self) -> Result<(), SignError> {
        self.run("gen_keys", |backend| backend.generate_keys())
    }

    /// Generate an RSA keypair with the given modulus size (2048, 3072 or
    /// 4096 bits) and public exponent (65537).
    pub fn generate_rsa_keys(
        &mut self,
        modulus_bits: usize,
        public_exponent: u32,
    ) -> Result<(), SignError> {
        self.run("gen_keys", move |backend| {
            backend.generate_rsa_keys(modulus_bits, public_exponent)
        })
    }

    /// Hash `message` and sign the digest into `signature_out`, returning
    /// the signature length.
    ///
    /// `signature_out` must hold at least [`SigningSession::signature_size`]
    /// bytes.
    pub fn sign(&mut self, message: &[u8], signature_out: &mut [u8]) -> Result<usize, SignError> {
        self.run("sign", |backend| backend.sign(message, signature_out))
    }

    /// Hash `message` and check `signature` against the session keypair.
    ///
    /// An invalid signature is `Ok(false)`, not an error: the operation
    /// completes, logs `Signature not valid` and leaves the session usable.
    /// Truncated or otherwise malformed signatures are invalid, never
    /// errors.
    pub fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<bool, SignError> {
        let meter = OpMeter::start("verify");
        match self.backend.verify(message, signature) {
            Ok(valid) => {
                if !valid {
                    error!("> Signature not valid.");
                }
                meter.finish().log();
                diag::log_success("verify");
                Ok(valid)
            }
            Err(err) => {
                diag::log_error("verify", err.status().get());
                Err(err)
            }
        }
    }

    /// Sign through the fixed call shape: the signature always lands in a
    /// [`FIXED_SIGNATURE_LEN`]-byte buffer.
    ///
    /// Only the memory-light provider serves the fixed shapes; on any other
    /// provider the call fails with the `-1000` status while the session
    /// itself stays healthy.
    pub fn sign_fixed(
        &mut self,
        message: &[u8],
        signature_out: &mut [u8; FIXED_SIGNATURE_LEN],
    ) -> Result<(), SignError> {
        if self.provider() != Provider::TinyEcc {
            let err = SignError::UnsupportedOperation;
            diag::log_error("sign", err.status().get());
            return Err(err);
        }
        self.run("sign", |backend| {
            backend.sign(message, signature_out).map(|_| ())
        })
    }

    /// Verify through the fixed call shape; same provider rule as
    /// [`SigningSession::sign_fixed`].
    pub fn verify_fixed(
        &mut self,
        message: &[u8],
        signature: &[u8; FIXED_SIGNATURE_LEN],
    ) -> Result<bool, SignError> {
        if self.provider() != Provider::TinyEcc {
            let err = SignError::UnsupportedOperation;
            diag::log_error("verify", err.status().get());
            return Err(err);
        }
        self.verify(message, signature)
    }

    /// Export the session public key as SubjectPublicKeyInfo PEM into
    /// `pem_out`, NUL terminated, returning the text length without the
    /// terminator.
    ///
    /// `pem_out` must hold [`SigningSession::public_key_pem_size`] bytes
    /// plus one for the terminator.
    pub fn export_public_key_pem(&mut self, pem_out: &mut [u8]) -> Result<usize, SignError> {
        self.run("get_pub_key", |backend| {
            backend.export_public_key_pem(pem_out)
        })
    }

    /// Export the public key PEM into a freshly allocated buffer of exactly
    /// the PEM size, without the NUL terminator.
    #[cfg(feature = "std")]
    pub fn export_public_key_pem_vec(&mut self) -> Result<Vec<u8>, SignError> {
        let pem_size = self.backend.public_key_pem_size()?;
        let mut pem = vec![0u8; pem_size + 1];
        let written = self.export_public_key_pem(&mut pem)?;
        pem.truncate(written);
        Ok(pem)
    }

    /// Signature size in bytes for the configured algorithm.
    ///
    /// RSA sessions have no size until [`SigningSession::generate_rsa_keys`]
    /// picks the modulus.
    pub fn signature_size(&self) -> Result<usize, SignError> {
        self.backend.signature_size()
    }

    /// Private key (field element or modulus) size in bytes.
    pub fn key_size(&self) -> Result<usize, SignError> {
        self.backend.key_size()
    }

    /// Public key SubjectPublicKeyInfo DER size in bytes.
    pub fn public_key_der_size(&self) -> Result<usize, SignError> {
        self.backend.public_key_der_size()
    }

    /// Public key PEM size in bytes, terminator not included.
    pub fn public_key_pem_size(&self) -> Result<usize, SignError> {
        self.backend.public_key_pem_size()
    }

    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config().algorithm()
    }

    pub fn config(&self) -> &SessionConfig {
        self.backend.config()
    }

    /// Close the session. Key material drops with the backend, which logs
    /// its close line.
    pub fn close(self) {
        self.backend.close();
    }

    fn run<T>(
        &mut self,
        op: &'static str,
        call: impl FnOnce(&mut Backend) -> Result<T, SignError>,
    ) -> Result<T, SignError> {
        let meter = OpMeter::start(op);
        match call(&mut self.backend) {
            Ok(value) => {
                meter.finish().log();
                diag::log_success(op);
                Ok(value)
            }
            Err(err) => {
                diag::log_error(op, err.status().get());
                Err(err)
            }
        }
    }
}
