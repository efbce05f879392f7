//! Utility functions for identifiers and digests

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// sha256 over the compact JSON encoding of a proof document
pub fn proof_digest(document: &serde_json::Value) -> anyhow::Result<String> {
    let bytes = serde_json::to_vec(document)?;
    Ok(sha256::digest(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_carry_their_prefix() {
        let id = new_uuid_to_bech32("quote_").unwrap();
        assert!(id.starts_with("quote_1"));
    }

    #[test]
    fn digest_is_stable_for_equal_documents() {
        let a = json!({"type": "QuoteAuthorization", "id": "https://remote/proof/1"});
        let b = json!({"id": "https://remote/proof/1", "type": "QuoteAuthorization"});

        // serde_json keeps object keys sorted without preserve_order
        assert_eq!(proof_digest(&a).unwrap(), proof_digest(&b).unwrap());
        assert_eq!(proof_digest(&a).unwrap().len(), 64);
    }
}
