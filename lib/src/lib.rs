//! One signing session API over interchangeable crypto providers.
//!
//! A [`SigningSession`] binds a provider, a signature algorithm and a message
//! hash when it is configured, generates a keypair, and then signs, verifies
//! and exports public keys through one call surface regardless of which stack
//! does the work underneath. Messages are always hashed first and the digest
//! is what gets signed, so sizes and call shapes stay uniform across
//! algorithms whose native APIs disagree about everything else.
//!
//! ```
//! use unisig::{Algorithm, HashAlg, Provider, SigningSession};
//!
//! # fn main() -> Result<(), unisig::SignError> {
//! let mut session = SigningSession::configure(
//!     Provider::RustCrypto,
//!     Algorithm::EcdsaSecp256r1,
//!     HashAlg::Sha256,
//!     None,
//! )?;
//! session.generate_keys()?;
//!
//! let message = b"attested boot report";
//! let mut signature = [0u8; 64];
//! let written = session.sign(message, &mut signature)?;
//! assert!(session.verify(message, &signature[..written])?);
//! session.close();
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(feature = "std"), no_std)]

mod session;

pub use session::SigningSession;
pub use unisig_crypto::Backend;
pub use unisig_shared::*;
