//! In-memory object store
//!
//! Keeps buckets, objects and open multipart uploads in memory so the transfer
//! logic can be exercised without a network. Tests can inject failures per key and
//! inspect completions and aborts afterwards.

use crate::error::{Result, TransferError};
use crate::{Acl, BucketInfo, ObjectStore, PartDescriptor};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// An object as stored by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    pub acl: Acl,
}

/// One successful `complete_multipart_upload` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub bucket: String,
    pub key: String,
    /// Part numbers in the order they were passed to completion
    pub part_numbers: Vec<i32>,
}

#[derive(Debug)]
struct PendingUpload {
    bucket: String,
    key: String,
    content_type: String,
    acl: Acl,
    parts: BTreeMap<i32, Bytes>,
}

#[derive(Debug, Default)]
struct MemoryState {
    buckets: BTreeMap<String, BTreeMap<String, StoredObject>>,
    uploads: HashMap<String, PendingUpload>,
    next_upload: u64,
    failing_keys: HashSet<String>,
    completions: Vec<CompletionRecord>,
    aborted: Vec<String>,
}

/// `ObjectStore` backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store with no buckets
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given empty buckets
    pub fn with_buckets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for name in names {
            store.create_bucket(name);
        }
        store
    }

    pub fn create_bucket(&self, name: impl Into<String>) {
        self.lock().buckets.entry(name.into()).or_default();
    }

    /// Make every put, multipart open and part upload for `key` fail
    pub fn fail_key(&self, key: impl Into<String>) {
        self.lock().failing_keys.insert(key.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of multipart uploads opened but neither completed nor aborted
    pub fn pending_uploads(&self) -> usize {
        self.lock().uploads.len()
    }

    pub fn completions(&self) -> Vec<CompletionRecord> {
        self.lock().completions.clone()
    }

    /// Keys of aborted multipart uploads, in abort order
    pub fn aborted_keys(&self) -> Vec<String> {
        self.lock().aborted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryState {
    fn check_bucket(&self, bucket: &str) -> Result<()> {
        if self.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(TransferError::BucketNotFound(bucket.to_string()))
        }
    }

    fn check_key(&self, key: &str) -> Result<()> {
        if self.failing_keys.contains(key) {
            Err(TransferError::Service {
                code: "InternalError".to_string(),
                message: format!("injected failure for {key}"),
            })
        } else {
            Ok(())
        }
    }

    fn upload(&mut self, bucket: &str, key: &str, upload_id: &str) -> Result<&mut PendingUpload> {
        match self.uploads.get_mut(upload_id) {
            Some(upload) if upload.bucket == bucket && upload.key == key => Ok(upload),
            _ => Err(TransferError::Service {
                code: "NoSuchUpload".to_string(),
                message: format!("no open upload {upload_id} for {bucket}/{key}"),
            }),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        Ok(self
            .lock()
            .buckets
            .keys()
            .map(|name| BucketInfo {
                name: name.clone(),
                created: Some(SystemTime::UNIX_EPOCH),
            })
            .collect())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        acl: Acl,
    ) -> Result<()> {
        let mut state = self.lock();
        state.check_bucket(bucket)?;
        state.check_key(key)?;

        let object = StoredObject {
            data: body,
            content_type: content_type.to_string(),
            acl,
        };
        if let Some(objects) = state.buckets.get_mut(bucket) {
            objects.insert(key.to_string(), object);
        }
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<String> {
        let mut state = self.lock();
        state.check_bucket(bucket)?;
        state.check_key(key)?;

        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);
        state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                content_type: content_type.to_string(),
                acl,
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<PartDescriptor> {
        let mut state = self.lock();
        state.check_key(key)?;

        let size = body.len() as u64;
        let upload = state.upload(bucket, key, upload_id)?;
        upload.parts.insert(part_number, body);
        Ok(PartDescriptor::new(
            part_number,
            format!("\"{upload_id}-{part_number}\""),
            size,
        ))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<()> {
        let mut state = self.lock();
        let upload = state.upload(bucket, key, upload_id)?;

        if parts.is_empty() {
            return Err(TransferError::Service {
                code: "MalformedXML".to_string(),
                message: "completion requires at least one part".to_string(),
            });
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(TransferError::Service {
                code: "InvalidPartOrder".to_string(),
                message: "parts must be listed in ascending order".to_string(),
            });
        }

        let mut data = BytesMut::new();
        for part in parts {
            let payload = upload.parts.get(&part.part_number).ok_or_else(|| {
                TransferError::Service {
                    code: "InvalidPart".to_string(),
                    message: format!("part {} was never uploaded", part.part_number),
                }
            })?;
            data.extend_from_slice(payload);
        }

        let object = StoredObject {
            data: data.freeze(),
            content_type: upload.content_type.clone(),
            acl: upload.acl,
        };
        state.uploads.remove(upload_id);
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
        state.completions.push(CompletionRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            part_numbers: parts.iter().map(|p| p.part_number).collect(),
        });
        Ok(())
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.upload(bucket, key, upload_id)?;
        state.uploads.remove(upload_id);
        state.aborted.push(key.to_string());
        Ok(())
    }
}
