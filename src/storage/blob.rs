//! Content-addressed blob store.
//!
//! The filesystem backend does not touch the disk directly; it talks to a
//! [`BlobStore`], which stores byte streams under logical keys and addresses
//! the content itself by digest. Identical bodies stored under different
//! keys share one content file.

use crate::{BodyStream, Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// What the store knows about a logical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    /// Digest of the content the key points at.
    pub digest: String,
}

/// A key/value byte-blob store with streamed writes and digest-addressed
/// reads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Drain the stream into durable storage under `key` and return the
    /// content digest. A stream that yields zero bytes stores nothing and
    /// returns `None`; that is a recognized outcome, not a failure.
    async fn put(&self, key: &str, body: BodyStream) -> Result<Option<String>>;

    /// Open the content behind a digest. `None` when the content file is
    /// missing or unreadable.
    async fn get_by_digest(&self, digest: &str) -> Result<Option<BodyStream>>;

    /// Look up the digest recorded for a key.
    async fn info(&self, key: &str) -> Result<Option<BlobInfo>>;

    /// Detach a key. Idempotent; shared content survives for other keys.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Filesystem-backed [`BlobStore`] under a configurable root directory.
///
/// Layout: `content/<digest>` holds the bytes, `index/<hashed key>` records
/// the digest a key points at. Writes land in a temp file first and are
/// renamed into place.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn content_path(&self, digest: &str) -> PathBuf {
        self.root.join("content").join(digest)
    }

    fn index_path(&self, key: &str) -> PathBuf {
        self.root.join("index").join(hashed_file_name(key))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        self.root.join("tmp").join(hashed_file_name(key))
    }

    async fn ensure_dirs(&self) -> Result<()> {
        for dir in ["content", "index", "tmp"] {
            tokio::fs::create_dir_all(self.root.join(dir)).await?;
        }
        Ok(())
    }
}

/// Keys are arbitrary strings; hash them into fixed, filesystem-safe names.
fn hashed_file_name(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
}

async fn rename_into_place(tmp: &Path, target: &Path) -> Result<()> {
    match tokio::fs::rename(tmp, target).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = tokio::fs::remove_file(tmp).await;
            Err(Error::from(err))
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, mut body: BodyStream) -> Result<Option<String>> {
        self.ensure_dirs().await?;

        let tmp = self.tmp_path(key);
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut hasher = Sha256::new();
        let mut written = 0usize;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = tokio::fs::remove_file(&tmp).await;
                    return Err(err);
                }
            };
            hasher.update(&chunk);
            written += chunk.len();
            if let Err(err) = file.write_all(&chunk).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(Error::from(err));
            }
        }
        file.flush().await?;
        drop(file);

        if written == 0 {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Ok(None);
        }

        let digest: String = {
            let hex: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
            format!("sha256-{}", hex)
        };

        let content = self.content_path(&digest);
        if tokio::fs::metadata(&content).await.is_ok() {
            // Content already present under this digest; the temp copy is
            // redundant.
            let _ = tokio::fs::remove_file(&tmp).await;
        } else {
            rename_into_place(&tmp, &content).await?;
        }

        let index_tmp = self.tmp_path(&format!("{}-index", key));
        tokio::fs::write(&index_tmp, digest.as_bytes()).await?;
        rename_into_place(&index_tmp, &self.index_path(key)).await?;

        Ok(Some(digest))
    }

    async fn get_by_digest(&self, digest: &str) -> Result<Option<BodyStream>> {
        let file = match tokio::fs::File::open(self.content_path(digest)).await {
            Ok(file) => file,
            Err(_) => return Ok(None),
        };
        let stream = ReaderStream::new(file).map(|chunk| chunk.map_err(Error::from));
        Ok(Some(Box::pin(stream)))
    }

    async fn info(&self, key: &str) -> Result<Option<BlobInfo>> {
        match tokio::fs::read_to_string(self.index_path(key)).await {
            Ok(digest) => Ok(Some(BlobInfo { digest })),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::from(err)),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.index_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::from(err)),
        }
    }
}
