use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

use crate::error::CryptoError;

/// Length of every address produced by [`derive_address`].
pub const ADDRESS_LEN: usize = 44;

/// A secp256k1 keypair in its hex wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    /// Hex of the compressed public key (33 bytes).
    pub public_key: String,
    /// Hex of the 32-byte secret scalar.
    pub private_key: String,
}

impl Keypair {
    /// Generate a fresh keypair from the OS entropy source.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (sk, pk) = secp.generate_keypair(&mut OsRng);
        Self {
            public_key: hex::encode(pk.serialize()),
            private_key: hex::encode(sk.secret_bytes()),
        }
    }

    /// Rebuild a keypair from a hex private key, recomputing the public half.
    pub fn from_private_hex(private_key: &str) -> Result<Self, CryptoError> {
        let sk = parse_secret_key(private_key)?;
        let pk = PublicKey::from_secret_key(&Secp256k1::signing_only(), &sk);
        Ok(Self {
            public_key: hex::encode(pk.serialize()),
            private_key: hex::encode(sk.secret_bytes()),
        })
    }

    pub fn address(&self) -> Result<String, CryptoError> {
        derive_address(&self.public_key)
    }

    /// Load `pubkey.hex` / `privkey.hex` style files. The public key is always
    /// derived from the private key; a missing, unreadable or mismatched
    /// public key file is rewritten.
    pub fn load(pubkey_file: &Path, privkey_file: &Path) -> io::Result<Self> {
        let private_key = fs::read_to_string(privkey_file)?;
        let keys = Self::from_private_hex(private_key.trim())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let problem = match fs::read_to_string(pubkey_file) {
            Ok(public_key) if public_key.trim() == keys.public_key => return Ok(keys),
            Ok(_) => format!("does not match {}", privkey_file.display()),
            Err(e) => format!("could not be read ({e})"),
        };
        log::warn!(
            "{} {problem}, rewriting it from the private key",
            pubkey_file.display()
        );
        fs::write(pubkey_file, &keys.public_key)?;
        Ok(keys)
    }

    pub fn save(&self, pubkey_file: &Path, privkey_file: &Path) -> io::Result<()> {
        fs::write(pubkey_file, &self.public_key)?;
        fs::write(privkey_file, &self.private_key)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(privkey_file, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

/// Address = base64(SHA-256(compressed public key bytes)).
pub fn derive_address(pubkey_hex: &str) -> Result<String, CryptoError> {
    let pk = parse_public_key(pubkey_hex)?;
    let digest = Sha256::digest(pk.serialize());
    Ok(STANDARD.encode(digest))
}

/// True when `address` has the shape of a derived address.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == ADDRESS_LEN
        && STANDARD
            .decode(address)
            .map(|bytes| bytes.len() == 32)
            .unwrap_or(false)
}

/// Sign `message` (SHA-256 digested first). Returns hex DER.
pub fn sign(private_key_hex: &str, message: &str) -> Result<String, CryptoError> {
    let sk = parse_secret_key(private_key_hex)?;
    let msg = message_digest(message)?;
    let sig = Secp256k1::signing_only().sign_ecdsa(&msg, &sk);
    let der = sig.serialize_der();
    Ok(hex::encode(&der[..]))
}

/// Verify a hex DER signature over `message`.
///
/// `Err` means the key or signature could not even be parsed; `Ok(false)` is
/// a well-formed signature that does not match.
pub fn verify_signature(
    signature_hex: &str,
    pubkey_hex: &str,
    message: &str,
) -> Result<bool, CryptoError> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(signature_hex).map_err(|_| CryptoError::SignatureHex)?;
    let sig = Signature::from_der(&sig_bytes).map_err(|_| CryptoError::SignatureDer)?;
    let pk = parse_public_key(pubkey_hex)?;
    let msg = message_digest(message)?;

    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

/// Boolean form of [`verify_signature`]: malformed input is simply `false`.
pub fn verify(signature_hex: &str, pubkey_hex: &str, message: &str) -> bool {
    matches!(verify_signature(signature_hex, pubkey_hex, message), Ok(true))
}

fn parse_public_key(pubkey_hex: &str) -> Result<PublicKey, CryptoError> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| CryptoError::PubkeyHex)?;
    PublicKey::from_slice(&bytes).map_err(|_| CryptoError::PubkeyBytes)
}

fn parse_secret_key(private_key_hex: &str) -> Result<SecretKey, CryptoError> {
    let bytes = hex::decode(private_key_hex).map_err(|_| CryptoError::PrivateKey)?;
    SecretKey::from_slice(&bytes).map_err(|_| CryptoError::PrivateKey)
}

fn message_digest(message: &str) -> Result<Message, CryptoError> {
    let digest = Sha256::digest(message.as_bytes());
    Message::from_digest_slice(&digest).map_err(|_| CryptoError::Message)
}
