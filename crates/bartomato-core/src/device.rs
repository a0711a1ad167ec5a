//! Stable per-install device identity.
//!
//! The vault records file is sharded per device so that several machines
//! syncing the same vault never write the same file.

use std::path::Path;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::CollaboratorError;

const DEVICE_ID_FILE: &str = "device_id";

/// Hex SHA-256 of the install's device id, creating the id on first use.
pub fn device_hash(data_dir: &Path) -> Result<String, CollaboratorError> {
    let id = device_id(data_dir)?;
    let mut hasher = Sha256::new();
    hasher.update(b"bar-tomato-");
    hasher.update(id.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

fn device_id(data_dir: &Path) -> Result<String, CollaboratorError> {
    let path = data_dir.join(DEVICE_ID_FILE);
    match std::fs::read_to_string(&path) {
        Ok(id) if !id.trim().is_empty() => return Ok(id.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(CollaboratorError::DataDir(e)),
    }

    let id = Uuid::new_v4().to_string();
    std::fs::create_dir_all(data_dir).map_err(CollaboratorError::DataDir)?;
    std::fs::write(&path, &id).map_err(CollaboratorError::DataDir)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_per_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let first = device_hash(dir.path()).unwrap();
        let second = device_hash(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_installs_differ() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        assert_ne!(device_hash(a.path()).unwrap(), device_hash(b.path()).unwrap());
    }
}
