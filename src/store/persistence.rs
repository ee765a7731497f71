//! Sled persistence: tree layout, key encoding, codecs and transaction plumbing.

use crate::config::StoreConfig;
use crate::error::{ApiError, StorageError};
use crate::types::{Epoch, NodeId, OrgId, Version};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionResult, TransactionalTree,
};
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TREE_NODES: &str = "org_nodes";
const TREE_ROOTS: &str = "org_roots";
const TREE_CHILDREN: &str = "org_children";
const TREE_CONFIGS: &str = "raw_configs";
const TREE_AUDIT: &str = "audit_records";
const TREE_EPOCHS: &str = "org_epochs";
const TREE_RETIRED: &str = "retired_nodes";
const TREE_TOKENS: &str = "tokens";
const VERSION_KEY_PAD: usize = 20;

/// One sled database holding every engine tree.
pub struct SledStore {
    db: Db,
    pub(crate) nodes: Tree,
    pub(crate) roots: Tree,
    pub(crate) children: Tree,
    pub(crate) configs: Tree,
    pub(crate) audit: Tree,
    pub(crate) epochs: Tree,
    /// Deleted nodes; their ids stay taken because config and audit rows outlive them.
    pub(crate) retired: Tree,
    pub(crate) tokens: Tree,
    timeout_ms: u64,
    org_locks: Mutex<HashMap<OrgId, Arc<Mutex<()>>>>,
}

impl SledStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: &StoreConfig) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path).map_err(|e| {
            StorageError::Backend(format!("Failed to open sled database at {:?}: {}", path, e))
        })?;
        Self::from_db(db, config)
    }

    /// In-memory database removed on drop.
    pub fn temporary(config: &StoreConfig) -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, config)
    }

    pub fn from_db(db: Db, config: &StoreConfig) -> Result<Self, StorageError> {
        Ok(Self {
            nodes: db.open_tree(TREE_NODES)?,
            roots: db.open_tree(TREE_ROOTS)?,
            children: db.open_tree(TREE_CHILDREN)?,
            configs: db.open_tree(TREE_CONFIGS)?,
            audit: db.open_tree(TREE_AUDIT)?,
            epochs: db.open_tree(TREE_EPOCHS)?,
            retired: db.open_tree(TREE_RETIRED)?,
            tokens: db.open_tree(TREE_TOKENS)?,
            db,
            timeout_ms: config.timeout_ms,
            org_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    /// Lock serializing structural mutations of one org.
    pub(crate) fn org_lock(&self, org_id: &OrgId) -> Arc<Mutex<()>> {
        let mut locks = self.org_locks.lock();
        locks
            .entry(org_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub(crate) fn deadline(&self) -> TxnDeadline {
        TxnDeadline {
            at: Instant::now() + Duration::from_millis(self.timeout_ms),
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Bound on one transaction, retries included.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TxnDeadline {
    at: Instant,
    timeout_ms: u64,
}

impl TxnDeadline {
    /// Called at the top of every transaction attempt.
    pub(crate) fn check(&self) -> Result<(), ConflictableTransactionError<ApiError>> {
        if Instant::now() > self.at {
            return Err(abort(StorageError::Timeout {
                timeout_ms: self.timeout_ms,
            }));
        }
        Ok(())
    }
}

pub(crate) fn abort<E: Into<ApiError>>(err: E) -> ConflictableTransactionError<ApiError> {
    ConflictableTransactionError::Abort(err.into())
}

pub(crate) fn finish_txn<T>(result: TransactionResult<T, ApiError>) -> Result<T, ApiError> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(err)) => Err(err),
        Err(TransactionError::Storage(err)) => Err(StorageError::from(err).into()),
    }
}

/// Advance the org epoch inside the transaction that carries the change.
pub(crate) fn bump_epoch_in(
    epochs: &TransactionalTree,
    org_id: &OrgId,
) -> Result<Epoch, ConflictableTransactionError<ApiError>> {
    let key = org_key(org_id);
    let current = match epochs.get(&key)? {
        Some(raw) => decode_epoch(&raw).map_err(abort)?,
        None => 0,
    };
    let next = current + 1;
    epochs.insert(key, &encode_epoch(next)[..])?;
    Ok(next)
}

pub(crate) fn org_key(org_id: &OrgId) -> Vec<u8> {
    org_id.as_str().as_bytes().to_vec()
}

pub(crate) fn org_prefix(org_id: &OrgId) -> Vec<u8> {
    format!("{}/", org_id).into_bytes()
}

pub(crate) fn node_key(org_id: &OrgId, node_id: &NodeId) -> Vec<u8> {
    format!("{}/{}", org_id, node_id).into_bytes()
}

pub(crate) fn child_prefix(org_id: &OrgId, parent: &NodeId) -> Vec<u8> {
    format!("{}/{}/", org_id, parent).into_bytes()
}

pub(crate) fn child_key(org_id: &OrgId, parent: &NodeId, child: &NodeId) -> Vec<u8> {
    format!("{}/{}/{}", org_id, parent, child).into_bytes()
}

/// Zero padded so lexicographic key order is version order.
pub(crate) fn audit_key(org_id: &OrgId, node_id: &NodeId, version: Version) -> Vec<u8> {
    format!("{}/{}/{:0width$}", org_id, node_id, version, width = VERSION_KEY_PAD).into_bytes()
}

pub(crate) fn audit_prefix(org_id: &OrgId, node_id: &NodeId) -> Vec<u8> {
    format!("{}/{}/", org_id, node_id).into_bytes()
}

/// Last `/`-separated segment of a key.
pub(crate) fn key_tail(key: &[u8]) -> Result<&str, StorageError> {
    let text = std::str::from_utf8(key)
        .map_err(|e| StorageError::Corrupt(format!("non-utf8 key: {}", e)))?;
    Ok(text.rsplit('/').next().unwrap_or(text))
}

pub(crate) fn encode_bin<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode_bin<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(bincode::deserialize(bytes)?)
}

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub(crate) fn encode_epoch(epoch: u64) -> [u8; 8] {
    epoch.to_be_bytes()
}

pub(crate) fn decode_epoch(bytes: &[u8]) -> Result<u64, StorageError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::Corrupt(format!("epoch has {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}
