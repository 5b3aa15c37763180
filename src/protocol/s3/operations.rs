//! `ObjectStore` implementation for S3

use super::client::S3Store;
use super::error::from_sdk;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use skystash_store::{Acl, BucketInfo, ObjectStore, PartDescriptor, Result};

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        S3Store::list_buckets(self).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        acl: Acl,
    ) -> Result<()> {
        let size = body.len() as i64;

        self.aws_client()
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(size)
            .content_type(content_type)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket))?;

        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<String> {
        self.initiate_multipart_upload(bucket, key, content_type, acl)
            .await
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<PartDescriptor> {
        self.send_part(bucket, key, upload_id, part_number, body)
            .await
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<()> {
        self.finish_multipart_upload(bucket, key, upload_id, parts)
            .await
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.cancel_multipart_upload(bucket, key, upload_id).await
    }
}
