use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::ToSchema;

use super::crypto::{Address, CryptoError, DigitalSignature, SignatureScheme};
use super::hash::{canonical_json, digest};

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

/// Represents a signed value transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address, which is also the key the signature verifies against
    #[schema(value_type = String)]
    pub sender: Address,

    /// Recipient's address
    #[schema(value_type = String)]
    pub recipient: Address,

    /// Amount being transferred
    pub amount: f64,

    /// Unix timestamp (seconds) supplied at creation
    pub timestamp: i64,

    /// Signature over the canonical unsigned fields
    #[schema(value_type = String)]
    pub signature: DigitalSignature,
}

impl Transaction {
    /// Builds and signs a transaction.
    ///
    /// Signing never checks that the credential belongs to `sender`; a
    /// mismatched credential produces a transaction that fails [`Transaction::is_valid`].
    pub fn sign(
        scheme: &dyn SignatureScheme,
        sender: Address,
        recipient: Address,
        amount: f64,
        timestamp: i64,
        credential: &str,
    ) -> Result<Self, TransactionError> {
        let message = signing_message(&sender, &recipient, amount, timestamp);
        let signature = scheme.sign(credential, message.as_bytes())?;

        Ok(Transaction {
            sender,
            recipient,
            amount,
            timestamp,
            signature,
        })
    }

    /// Checks the signature against the sender address
    pub fn is_valid(&self, scheme: &dyn SignatureScheme) -> bool {
        let message = signing_message(&self.sender, &self.recipient, self.amount, self.timestamp);
        scheme.verify(&self.sender, &self.signature, message.as_bytes())
    }

    /// Digest of the full signed transaction, used as a Merkle leaf
    pub fn hash(&self) -> String {
        digest(self.to_value())
    }

    fn to_value(&self) -> Value {
        json!({
            "sender": self.sender.0,
            "recipient": self.recipient.0,
            "amount": self.amount,
            "timestamp": self.timestamp,
            "signature": self.signature.0,
        })
    }
}

/// Canonical text covered by a transaction signature
fn signing_message(sender: &Address, recipient: &Address, amount: f64, timestamp: i64) -> String {
    canonical_json(json!({
        "sender": sender.0,
        "recipient": recipient.0,
        "amount": amount,
        "timestamp": timestamp,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::{Ed25519Scheme, Wallet};

    fn signed_by(wallet: &Wallet, amount: f64) -> Transaction {
        let recipient = Wallet::generate();
        Transaction::sign(
            &Ed25519Scheme,
            wallet.address().clone(),
            recipient.address().clone(),
            amount,
            1_700_000_000,
            &wallet.export_credential(),
        )
        .unwrap()
    }

    #[test]
    fn test_signing_message_is_sorted() {
        let message = signing_message(&Address::from("A"), &Address::from("B"), 10.0, 5);
        assert_eq!(
            message,
            r#"{"amount":10.0,"recipient":"B","sender":"A","timestamp":5}"#
        );
    }

    #[test]
    fn test_sign_and_validate() {
        let wallet = Wallet::generate();
        let transaction = signed_by(&wallet, 10.0);

        assert_eq!(&transaction.sender, wallet.address());
        assert!(transaction.is_valid(&Ed25519Scheme));
    }

    #[test]
    fn test_negative_amount_is_still_valid() {
        let wallet = Wallet::generate();
        assert!(signed_by(&wallet, -3.5).is_valid(&Ed25519Scheme));
    }

    #[test]
    fn test_tampering_breaks_signature() {
        let wallet = Wallet::generate();
        let original = signed_by(&wallet, 10.0);

        let mut amount = original.clone();
        amount.amount = 11.0;
        assert!(!amount.is_valid(&Ed25519Scheme));

        let mut timestamp = original.clone();
        timestamp.timestamp += 1;
        assert!(!timestamp.is_valid(&Ed25519Scheme));

        let mut recipient = original.clone();
        recipient.recipient = Wallet::generate().address().clone();
        assert!(!recipient.is_valid(&Ed25519Scheme));

        let mut sender = original.clone();
        sender.sender = Wallet::generate().address().clone();
        assert!(!sender.is_valid(&Ed25519Scheme));
    }

    #[test]
    fn test_wrong_credential_fails_validation() {
        let owner = Wallet::generate();
        let thief = Wallet::generate();

        let transaction = Transaction::sign(
            &Ed25519Scheme,
            owner.address().clone(),
            thief.address().clone(),
            1.0,
            1,
            &thief.export_credential(),
        )
        .unwrap();

        assert!(!transaction.is_valid(&Ed25519Scheme));
    }

    #[test]
    fn test_bad_credential_is_an_error() {
        let result = Transaction::sign(
            &Ed25519Scheme,
            Address::from("A"),
            Address::from("B"),
            1.0,
            1,
            "not a credential",
        );
        assert!(matches!(result, Err(TransactionError::CryptoError(_))));
    }

    #[test]
    fn test_json_round_trip_keeps_validity() {
        let wallet = Wallet::generate();
        let transaction = signed_by(&wallet, 0.1);

        let json = serde_json::to_string(&transaction).unwrap();
        let decoded: Transaction = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, transaction);
        assert!(decoded.is_valid(&Ed25519Scheme));
        assert_eq!(decoded.hash(), transaction.hash());
    }
}
