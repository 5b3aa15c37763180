//! Multipart upload calls

use super::client::S3Store;
use super::error::from_sdk;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use bytes::Bytes;
use skystash_store::{Acl, PartDescriptor, TransferError};

impl S3Store {
    /// Initiate a multipart upload and return its upload id
    pub(crate) async fn initiate_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<String, TransferError> {
        let response = self
            .aws_client()
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket))?;

        response
            .upload_id()
            .ok_or_else(|| TransferError::MultipartUpload("No upload ID returned".to_string()))
            .map(|s| s.to_string())
    }

    /// Upload a single part
    pub(crate) async fn send_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<PartDescriptor, TransferError> {
        let size = data.len() as u64;

        let response = self
            .aws_client()
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(size as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket))?;

        let etag = response
            .e_tag()
            .ok_or_else(|| {
                TransferError::MultipartUpload(format!("No ETag returned for part {part_number}"))
            })?
            .to_string();

        Ok(PartDescriptor::new(part_number, etag, size))
    }

    /// Complete a multipart upload with parts in ascending order
    pub(crate) async fn finish_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<(), TransferError> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        let multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.aws_client()
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(multipart_upload)
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket))?;

        Ok(())
    }

    /// Abort a multipart upload, discarding uploaded parts
    pub(crate) async fn cancel_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), TransferError> {
        self.aws_client()
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket))?;

        Ok(())
    }
}
