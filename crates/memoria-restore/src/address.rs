//! Content addressing.
//!
//! The storage path of a restored file is derived purely from its bytes:
//! the lowercase hex SHA-256 digest, plus the original extension lowercased.
//! Identical content always lands at the same key, which makes placement
//! idempotent.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

const HASH_CHUNK_BYTES: usize = 1024 * 1024;

/// Digest and canonical storage key for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAddress {
    pub hash: String,
    pub path: String,
}

/// Hash a file's contents and derive its storage key.
pub async fn address(path: &Path) -> io::Result<ContentAddress> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let hash = hash_file(&path)?;
        let key = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", hash, ext.to_lowercase()),
            None => hash.clone(),
        };
        Ok(ContentAddress { hash, path: key })
    })
    .await
    .map_err(|e| io::Error::other(e))?
}

fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_known_digest_and_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Greeting.TXT");
        std::fs::write(&path, b"hello world").unwrap();

        let addr = address(&path).await.unwrap();
        assert_eq!(
            addr.hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(addr.path, format!("{}.txt", addr.hash));
    }

    #[tokio::test]
    async fn test_same_content_same_address() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, b"identical bytes").unwrap();
        std::fs::write(&b, b"identical bytes").unwrap();

        assert_eq!(address(&a).await.unwrap(), address(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_extension_is_bare_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("README");
        std::fs::write(&path, b"x").unwrap();

        let addr = address(&path).await.unwrap();
        assert_eq!(addr.path, addr.hash);
    }
}
