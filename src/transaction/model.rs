use serde::{Deserialize, Serialize};

/// Optional value transfer carried by a block.
///
/// A block only carries a meaningful transaction when `amount > 0`; otherwise
/// every field is empty (see [`Transaction::none`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    pub data: String,
    pub sender: String,
    pub receiver: String,
    /// Microquacks. Signed so that a negative amount can reach the validator
    /// and be rejected with a reason instead of a parse error.
    pub amount: i64,
    /// Hex compressed secp256k1 key of the sender.
    pub public_key: String,
    /// Hex DER signature over the containing block's hash.
    pub signature: String,
}

impl Transaction {
    /// The empty, no-transfer value.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_transfer(&self) -> bool {
        self.amount > 0
    }

    /// Clear every field when no value moves.
    pub fn normalized(self) -> Self {
        if self.is_transfer() { self } else { Self::none() }
    }
}

#[cfg(test)]
mod tests {
    use super::Transaction;

    #[test]
    fn zero_amount_normalizes_to_empty() {
        let tx = Transaction {
            data: "note".into(),
            sender: "a".into(),
            receiver: "b".into(),
            amount: 0,
            public_key: "02ab".into(),
            signature: "30".into(),
        };
        assert_eq!(tx.normalized(), Transaction::none());
    }

    #[test]
    fn transfer_is_kept() {
        let tx = Transaction {
            receiver: "b".into(),
            amount: 5,
            ..Transaction::none()
        };
        assert_eq!(tx.clone().normalized(), tx);
    }

    #[test]
    fn uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(Transaction::none()).unwrap();
        assert!(json.get("publicKey").is_some());
        let parsed: Transaction = serde_json::from_str(r#"{"amount": 3}"#).unwrap();
        assert_eq!(parsed.amount, 3);
        assert!(parsed.sender.is_empty());
    }
}
