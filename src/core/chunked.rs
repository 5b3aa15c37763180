//! Multipart upload of a large file with sequential parts

use bytes::Bytes;
use skystash_store::{
    Acl, Bucket, CompletedUpload, MultipartSession, Result, TransferError, MAX_PARTS, OCTET_STREAM,
};
use tokio::io::AsyncRead;
use tracing::{debug, warn};

use super::classify::DEFAULT_CHUNK_SIZE;

/// Splits a file into `chunk_size` parts and uploads them one after another
#[derive(Debug, Clone, Copy)]
pub struct ChunkedTransfer {
    pub chunk_size: usize,
    pub acl: Acl,
}

impl Default for ChunkedTransfer {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            acl: Acl::Private,
        }
    }
}

impl ChunkedTransfer {
    pub fn new(chunk_size: usize, acl: Acl) -> Self {
        Self { chunk_size, acl }
    }

    /// Upload everything `reader` yields as one object under `key`
    ///
    /// `size` is the length measured before the upload. A source that would need more
    /// than [`MAX_PARTS`] parts is rejected before a session is opened. An empty reader
    /// produces a single empty part so the session can be completed. On any failure
    /// the session is aborted before the error is returned.
    pub async fn run<R>(
        &self,
        bucket: &Bucket,
        key: &str,
        reader: &mut R,
        size: u64,
    ) -> Result<CompletedUpload>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        self.check_part_count(key, size)?;
        let mut session = bucket.init_multipart(key, OCTET_STREAM, self.acl).await?;

        match self.send_parts(&mut session, reader).await {
            Ok(()) => session.complete().await,
            Err(err) => {
                if let Err(abort_err) = session.abort().await {
                    warn!(key, error = %abort_err, "failed to abort multipart upload");
                }
                Err(err)
            }
        }
    }

    fn check_part_count(&self, key: &str, size: u64) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(TransferError::MultipartUpload(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        let parts = size.div_ceil(self.chunk_size as u64);
        if parts > MAX_PARTS as u64 {
            return Err(TransferError::MultipartUpload(format!(
                "{key} needs {parts} parts of {} bytes, more than {MAX_PARTS}; raise the chunk size",
                self.chunk_size
            )));
        }
        Ok(())
    }

    async fn send_parts<R>(&self, session: &mut MultipartSession, reader: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        session.put_all(reader, self.chunk_size).await?;

        if session.parts().is_empty() {
            debug!(key = session.key(), "empty source, sending one empty part");
            session.upload_part(1, Bytes::new()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skystash_store::MemoryStore;
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    fn bucket(store: &MemoryStore) -> Bucket {
        Bucket::new(Arc::new(store.clone()), "backups")
    }

    /// Yields `ok_bytes` bytes, then fails
    struct FailingReader {
        remaining: usize,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.remaining == 0 {
                return Poll::Ready(Err(io::Error::other("disk went away")));
            }
            let n = self.remaining.min(buf.remaining());
            buf.put_slice(&vec![0xAB; n]);
            self.remaining -= n;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_parts_reproduce_source() {
        let store = MemoryStore::with_buckets(["backups"]);
        let data: Vec<u8> = (0..30_000u32).map(|i| (i % 251) as u8).collect();

        let completed = ChunkedTransfer::new(1000, Acl::Private)
            .run(&bucket(&store), "big.bin", &mut data.as_slice(), data.len() as u64)
            .await
            .unwrap();

        assert_eq!(completed.parts.len(), 30);
        assert_eq!(completed.bytes, 30_000);
        let numbers: Vec<i32> = completed.parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, (1..=30).collect::<Vec<_>>());

        let object = store.object("backups", "big.bin").unwrap();
        assert_eq!(object.data.as_ref(), data.as_slice());
        assert_eq!(object.content_type, OCTET_STREAM);
        assert_eq!(store.completions().len(), 1);
    }

    #[tokio::test]
    async fn test_last_part_is_short() {
        let store = MemoryStore::with_buckets(["backups"]);
        let data = vec![3u8; 2500];

        let completed = ChunkedTransfer::new(1000, Acl::Private)
            .run(&bucket(&store), "k", &mut data.as_slice(), data.len() as u64)
            .await
            .unwrap();

        let sizes: Vec<u64> = completed.parts.iter().map(|p| p.size).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
    }

    #[tokio::test]
    async fn test_empty_source_sends_one_empty_part() {
        let store = MemoryStore::with_buckets(["backups"]);

        let completed = ChunkedTransfer::new(1000, Acl::Private)
            .run(&bucket(&store), "empty", &mut tokio::io::empty(), 0)
            .await
            .unwrap();

        assert_eq!(completed.parts.len(), 1);
        assert_eq!(completed.parts[0].size, 0);
        assert_eq!(completed.bytes, 0);
        assert!(store.object("backups", "empty").unwrap().data.is_empty());
        assert_eq!(store.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_aborts_session() {
        let store = MemoryStore::with_buckets(["backups"]);
        let mut reader = FailingReader { remaining: 2500 };

        let err = ChunkedTransfer::new(1000, Acl::Private)
            .run(&bucket(&store), "broken", &mut reader, 4096)
            .await
            .unwrap_err();

        assert!(err.is_io());
        assert_eq!(store.pending_uploads(), 0);
        assert_eq!(store.aborted_keys(), vec!["broken".to_string()]);
        assert!(store.object("backups", "broken").is_none());
        assert!(store.completions().is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_is_returned() {
        let store = MemoryStore::with_buckets(["backups"]);
        store.fail_key("k");
        let data = vec![0u8; 10];

        let err = ChunkedTransfer::default()
            .run(&bucket(&store), "k", &mut data.as_slice(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Service { .. }));
        assert!(store.aborted_keys().is_empty());
    }

    #[tokio::test]
    async fn test_too_many_parts_rejected_before_session_opens() {
        let store = MemoryStore::with_buckets(["backups"]);
        let data = vec![1u8; MAX_PARTS as usize + 1];
        let mut reader = data.as_slice();

        let err = ChunkedTransfer::new(1, Acl::Private)
            .run(&bucket(&store), "huge", &mut reader, data.len() as u64)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::MultipartUpload(_)));
        // Nothing read, no session to abort
        assert_eq!(reader.len(), data.len());
        assert!(store.aborted_keys().is_empty());
        assert_eq!(store.pending_uploads(), 0);
        assert!(store.object("backups", "huge").is_none());
    }

    #[tokio::test]
    async fn test_exactly_max_parts_is_accepted() {
        let store = MemoryStore::with_buckets(["backups"]);
        let data = vec![2u8; MAX_PARTS as usize];

        let completed = ChunkedTransfer::new(1, Acl::Private)
            .run(&bucket(&store), "edge", &mut data.as_slice(), data.len() as u64)
            .await
            .unwrap();

        assert_eq!(completed.parts.len(), MAX_PARTS as usize);
        assert_eq!(completed.bytes, data.len() as u64);
    }
}
