//! Bucket handles and multipart sessions

use crate::error::{Result, TransferError};
use crate::{Acl, ObjectStore, PartDescriptor, MAX_PARTS};
use bytes::Bytes;
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// A store bound to one bucket name
///
/// Cloning is cheap: the store is shared behind an `Arc`.
#[derive(Clone)]
pub struct Bucket {
    store: Arc<dyn ObjectStore>,
    name: String,
}

impl Bucket {
    pub fn new(store: Arc<dyn ObjectStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create or overwrite `key` with `payload` in a single request
    pub async fn put(&self, key: &str, payload: Bytes, content_type: &str, acl: Acl) -> Result<()> {
        self.store
            .put_object(&self.name, key, payload, content_type, acl)
            .await
    }

    /// Open a multipart session for `key`
    pub async fn init_multipart(
        &self,
        key: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<MultipartSession> {
        let upload_id = self
            .store
            .create_multipart_upload(&self.name, key, content_type, acl)
            .await?;
        debug!(bucket = %self.name, key, upload_id = %upload_id, "multipart upload opened");

        Ok(MultipartSession {
            store: Arc::clone(&self.store),
            bucket: self.name.clone(),
            key: key.to_string(),
            upload_id,
            content_type: content_type.to_string(),
            acl,
            parts: Vec::new(),
            finalized: false,
        })
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).finish()
    }
}

/// Summary of a completed multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    pub key: String,
    pub upload_id: String,
    pub parts: Vec<PartDescriptor>,
    pub bytes: u64,
}

/// One open multipart upload
///
/// Parts must be appended with strictly increasing indices starting at 1. The
/// session is finalized exactly once: [`complete`](Self::complete) and
/// [`abort`](Self::abort) both consume it. A session dropped without being
/// finalized leaves the remote upload pending and logs a warning.
pub struct MultipartSession {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    upload_id: String,
    content_type: String,
    acl: Acl,
    parts: Vec<PartDescriptor>,
    finalized: bool,
}

impl MultipartSession {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn acl(&self) -> Acl {
        self.acl
    }

    /// Parts uploaded so far, in index order
    pub fn parts(&self) -> &[PartDescriptor] {
        &self.parts
    }

    /// Index the next uploaded part must carry
    pub fn next_part_number(&self) -> i32 {
        self.parts.len() as i32 + 1
    }

    /// Upload `payload` as part `part_number`
    ///
    /// `part_number` must equal [`next_part_number`](Self::next_part_number).
    pub async fn upload_part(&mut self, part_number: i32, payload: Bytes) -> Result<PartDescriptor> {
        let expected = self.next_part_number();
        if part_number != expected {
            return Err(TransferError::PartOutOfOrder {
                key: self.key.clone(),
                expected,
                got: part_number,
            });
        }
        if part_number > MAX_PARTS {
            return Err(TransferError::MultipartUpload(format!(
                "{} needs more than {} parts; raise the chunk size",
                self.key, MAX_PARTS
            )));
        }

        let part = self
            .store
            .upload_part(&self.bucket, &self.key, &self.upload_id, part_number, payload)
            .await?;
        self.parts.push(part.clone());
        Ok(part)
    }

    /// Read `reader` to the end, uploading every `chunk_size` bytes as the next part
    ///
    /// Each part carries exactly the bytes read for it: the scratch buffer is refilled
    /// from the start on every iteration and copied out before upload. Every part but
    /// the last is exactly `chunk_size` bytes. An empty reader uploads nothing.
    pub async fn put_all<R>(&mut self, reader: &mut R, chunk_size: usize) -> Result<&[PartDescriptor]>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        if chunk_size == 0 {
            return Err(TransferError::MultipartUpload(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        let mut scratch = vec![0u8; chunk_size];
        loop {
            let filled = fill_chunk(reader, &mut scratch).await?;
            if filled == 0 {
                break;
            }

            let part_number = self.next_part_number();
            debug!(key = %self.key, part = part_number, chunk_size = filled, "uploading part");
            self.upload_part(part_number, Bytes::copy_from_slice(&scratch[..filled]))
                .await?;
        }

        Ok(&self.parts)
    }

    /// Assemble the uploaded parts into the final object
    ///
    /// A session without parts is rejected with [`TransferError::EmptyUpload`]. When
    /// completion fails the upload is aborted before the error is returned, so the
    /// session never stays pending.
    pub async fn complete(mut self) -> Result<CompletedUpload> {
        if self.parts.is_empty() {
            self.abort_remote().await;
            return Err(TransferError::EmptyUpload {
                key: self.key.clone(),
            });
        }

        let completed = self
            .store
            .complete_multipart_upload(&self.bucket, &self.key, &self.upload_id, &self.parts)
            .await;
        if let Err(err) = completed {
            self.abort_remote().await;
            return Err(err);
        }

        self.finalized = true;
        debug!(key = %self.key, parts = self.parts.len(), "multipart upload completed");

        let parts = std::mem::take(&mut self.parts);
        Ok(CompletedUpload {
            key: self.key.clone(),
            upload_id: self.upload_id.clone(),
            bytes: parts.iter().map(|p| p.size).sum(),
            parts,
        })
    }

    /// Discard the upload and every part sent so far
    pub async fn abort(mut self) -> Result<()> {
        self.store
            .abort_multipart_upload(&self.bucket, &self.key, &self.upload_id)
            .await?;
        self.finalized = true;
        debug!(key = %self.key, "multipart upload aborted");
        Ok(())
    }

    async fn abort_remote(&mut self) {
        match self
            .store
            .abort_multipart_upload(&self.bucket, &self.key, &self.upload_id)
            .await
        {
            Ok(()) => self.finalized = true,
            Err(err) => warn!(key = %self.key, error = %err, "failed to abort multipart upload"),
        }
    }
}

impl fmt::Debug for MultipartSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartSession")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("upload_id", &self.upload_id)
            .field("parts", &self.parts.len())
            .finish()
    }
}

impl Drop for MultipartSession {
    fn drop(&mut self) {
        if !self.finalized {
            warn!(
                bucket = %self.bucket,
                key = %self.key,
                upload_id = %self.upload_id,
                parts = self.parts.len(),
                "multipart upload left unfinalized"
            );
        }
    }
}

/// Read until `buf` is full or the reader is exhausted
async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
