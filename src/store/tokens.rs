//! Issued token records, keyed by the hex blake3 digest of the token.

use super::persistence::{decode_json, encode_json, SledStore};
use super::TokenStore;
use crate::error::StorageError;
use crate::identity::TokenRecord;

impl TokenStore for SledStore {
    fn put_token(&self, record: &TokenRecord) -> Result<(), StorageError> {
        self.tokens
            .insert(record.token_hash.as_bytes(), encode_json(record)?)?;
        Ok(())
    }

    fn get_token(&self, token_hash: &str) -> Result<Option<TokenRecord>, StorageError> {
        let Some(raw) = self.tokens.get(token_hash.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(decode_json(&raw)?))
    }

    fn list_tokens(&self) -> Result<Vec<TokenRecord>, StorageError> {
        let mut out: Vec<TokenRecord> = Vec::new();
        for item in self.tokens.iter() {
            let (_, value) = item?;
            out.push(decode_json(&value)?);
        }
        out.sort_by_key(|t| std::cmp::Reverse(t.issued_at));
        Ok(out)
    }
}
