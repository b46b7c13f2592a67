use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;

/// Version byte prefixed to a secret key in wallet-interchange format
const WIF_VERSION: u8 = 0x80;

/// Suffix marking a compressed-key credential
const WIF_COMPRESSED: u8 = 0x01;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// Represents a wallet address (public key in base58 format)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Creates a new address from a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        Address(bs58::encode(public_key.as_bytes()).into_string())
    }

    /// Converts the address back to a public key
    pub fn to_public_key(&self) -> Result<VerifyingKey, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidPublicKey("Invalid public key length".to_string())
        })?;

        VerifyingKey::from_bytes(&bytes).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

/// Represents a digital signature (base58 encoded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    /// Creates a new digital signature from a signature
    pub fn from_signature(signature: &Signature) -> Self {
        DigitalSignature(bs58::encode(signature.to_bytes()).into_string())
    }

    /// Converts the digital signature to a signature
    pub fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let signature_bytes: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature("Invalid signature length".to_string())
        })?;

        Ok(Signature::from_bytes(&signature_bytes))
    }
}

/// Capability interface over the signing primitive.
///
/// The ledger core only ever talks to signatures through this trait, so any
/// scheme that can map a credential to an address and verify against that
/// address can be plugged in.
pub trait SignatureScheme: Send + Sync {
    /// Derives the address controlled by a signing credential
    fn derive_address(&self, credential: &str) -> Result<Address, CryptoError>;

    /// Signs a message with the given credential
    fn sign(&self, credential: &str, message: &[u8]) -> Result<DigitalSignature, CryptoError>;

    /// Checks a signature against an address. Undecodable input is simply invalid.
    fn verify(&self, address: &Address, signature: &DigitalSignature, message: &[u8]) -> bool;
}

/// Ed25519 implementation of [`SignatureScheme`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    fn derive_address(&self, credential: &str) -> Result<Address, CryptoError> {
        let wallet = Wallet::from_credential(credential)?;
        Ok(wallet.address().clone())
    }

    fn sign(&self, credential: &str, message: &[u8]) -> Result<DigitalSignature, CryptoError> {
        let wallet = Wallet::from_credential(credential)?;
        Ok(wallet.sign(message))
    }

    fn verify(&self, address: &Address, signature: &DigitalSignature, message: &[u8]) -> bool {
        let (public_key, signature) = match (address.to_public_key(), signature.to_signature()) {
            (Ok(public_key), Ok(signature)) => (public_key, signature),
            _ => return false,
        };

        public_key.verify(message, &signature).is_ok()
    }
}

/// Represents a wallet with a keypair
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self::from_signing_key(SigningKey::generate(&mut csprng))
    }

    /// Restores a wallet from a wallet-interchange credential
    pub fn from_credential(credential: &str) -> Result<Self, CryptoError> {
        let payload = bs58::decode(credential.trim())
            .with_check(Some(WIF_VERSION))
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        // version || secret || compression flag
        if payload.len() != 34 || payload[33] != WIF_COMPRESSED {
            return Err(CryptoError::InvalidSigningKey(format!(
                "Unexpected credential payload length {}",
                payload.len()
            )));
        }

        let mut secret = [0u8; 32];
        secret.copy_from_slice(&payload[1..33]);

        Ok(Self::from_signing_key(SigningKey::from_bytes(&secret)))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::from_public_key(&signing_key.verifying_key());
        Wallet { signing_key, address }
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Signs a message with the wallet's secret key
    pub fn sign(&self, message: &[u8]) -> DigitalSignature {
        DigitalSignature::from_signature(&self.signing_key.sign(message))
    }

    /// Exports the secret key in wallet-interchange format
    pub fn export_credential(&self) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.signing_key.to_bytes());
        payload.push(WIF_COMPRESSED);

        bs58::encode(payload).with_check().into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_round_trip() {
        let wallet = Wallet::generate();
        let credential = wallet.export_credential();

        let restored = Wallet::from_credential(&credential).unwrap();
        assert_eq!(restored.address(), wallet.address());

        let derived = Ed25519Scheme.derive_address(&credential).unwrap();
        assert_eq!(&derived, wallet.address());
    }

    #[test]
    fn test_signing_and_verification() {
        let scheme = Ed25519Scheme;
        let wallet = Wallet::generate();
        let credential = wallet.export_credential();
        let message = b"Hello, world!";

        let signature = scheme.sign(&credential, message).unwrap();
        assert!(scheme.verify(wallet.address(), &signature, message));

        // Wrong message
        assert!(!scheme.verify(wallet.address(), &signature, b"Wrong message"));

        // Wrong signer
        let other = Wallet::generate();
        assert!(!scheme.verify(other.address(), &signature, message));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let scheme = Ed25519Scheme;
        let signature = DigitalSignature("not-base58-0OIl".to_string());
        assert!(!scheme.verify(&Address::from("A"), &signature, b"msg"));
    }

    #[test]
    fn test_malformed_credential() {
        assert!(Wallet::from_credential("definitely not a key").is_err());

        // Valid base58check but wrong version byte
        let bogus = bs58::encode([0x42u8; 34]).with_check().into_string();
        assert!(Wallet::from_credential(&bogus).is_err());
    }
}
