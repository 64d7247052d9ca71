use unisig::diag::Hex;
use unisig::{Algorithm, HashAlg, Provider, SigningSession};

fn main() -> Result<(), unisig::SignError> {
    let mut session = SigningSession::configure(
        Provider::RustCrypto,
        Algorithm::EcdsaSecp256r1,
        HashAlg::Sha256,
        None,
    )?;
    session.generate_keys()?;

    let message = b"firmware image v2.4.1";
    let mut signature = [0u8; 64];
    let written = session.sign(message, &mut signature)?;
    println!(
        "signature ({} bytes) = {}",
        written,
        Hex(&signature[..written])
    );

    let valid = session.verify(message, &signature[..written])?;
    println!("verified: {}", valid);

    let pem = session.export_public_key_pem_vec()?;
    print!("{}", String::from_utf8(pem).expect("PEM is ASCII"));

    session.close();
    Ok(())
}
