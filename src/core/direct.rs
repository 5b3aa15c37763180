//! Single-request upload of a whole file

use super::sniff::{detect_content_type, SNIFF_LEN};
use bytes::Bytes;
use skystash_store::{Acl, Bucket, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// What a direct upload sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectOutcome {
    pub bytes: u64,
    pub content_type: &'static str,
}

/// Uploads a file with one `put`, content type sniffed from its first bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectTransfer {
    pub acl: Acl,
}

impl DirectTransfer {
    pub fn new(acl: Acl) -> Self {
        Self { acl }
    }

    /// Read exactly `size` bytes from `reader` and store them under `key`
    ///
    /// A reader that ends before `size` bytes fails with an I/O error of kind
    /// `UnexpectedEof`; nothing is sent in that case.
    pub async fn run<R>(
        &self,
        bucket: &Bucket,
        key: &str,
        reader: &mut R,
        size: u64,
    ) -> Result<DirectOutcome>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let len = usize::try_from(size).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{size} bytes do not fit in memory"),
            )
        })?;

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await?;

        let content_type = detect_content_type(&payload[..len.min(SNIFF_LEN)]);
        debug!(key, size, content_type, "direct upload");

        bucket
            .put(key, Bytes::from(payload), content_type, self.acl)
            .await?;

        Ok(DirectOutcome {
            bytes: size,
            content_type,
        })
    }
}
