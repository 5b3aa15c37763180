//! Integration tests for the S3 store
//!
//! These tests require a running S3-compatible service (AWS S3, MinIO, LocalStack, etc.)
//! Set the following environment variables to run tests:
//!
//! - `S3_TEST_BUCKET`: Bucket name for testing
//! - `S3_TEST_REGION`: AWS region (default: us-east-1)
//! - `S3_TEST_ENDPOINT`: Custom endpoint for MinIO/LocalStack (optional)
//! - `S3_TESTS_ENABLED`: Set to "1" to enable integration tests

use super::*;
use bytes::Bytes;
use skystash_store::{Acl, Bucket, ObjectStore};
use std::env;
use std::sync::Arc;

/// Check if S3 integration tests should run
fn s3_tests_enabled() -> bool {
    env::var("S3_TESTS_ENABLED").unwrap_or_default() == "1"
}

fn test_bucket() -> String {
    env::var("S3_TEST_BUCKET").unwrap_or_else(|_| "skystash-test-bucket".to_string())
}

fn get_test_config() -> S3Config {
    let endpoint = env::var("S3_TEST_ENDPOINT").ok();
    S3Config {
        region: Some(env::var("S3_TEST_REGION").unwrap_or_else(|_| "us-east-1".to_string())),
        // Use path-style for MinIO/LocalStack
        force_path_style: endpoint.is_some(),
        endpoint,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore]
async fn test_list_buckets_contains_test_bucket() {
    if !s3_tests_enabled() {
        println!("Skipping S3 integration test - set S3_TESTS_ENABLED=1 to run");
        return;
    }

    let store = S3Store::connect(&get_test_config())
        .await
        .expect("Failed to create client");
    let buckets = store.list_buckets().await.expect("Failed to list buckets");
    assert!(buckets.iter().any(|b| b.name == test_bucket()));
}

#[tokio::test]
#[ignore]
async fn test_direct_put() {
    if !s3_tests_enabled() {
        println!("Skipping S3 integration test - set S3_TESTS_ENABLED=1 to run");
        return;
    }

    let store = S3Store::connect(&get_test_config())
        .await
        .expect("Failed to create client");
    store
        .put_object(
            &test_bucket(),
            "skystash-it/direct.txt",
            Bytes::from_static(b"hello from skystash"),
            "text/plain; charset=utf-8",
            Acl::Private,
        )
        .await
        .expect("Failed to put object");
}

#[tokio::test]
#[ignore]
async fn test_multipart_session_roundtrip() {
    if !s3_tests_enabled() {
        println!("Skipping S3 integration test - set S3_TESTS_ENABLED=1 to run");
        return;
    }

    let store = S3Store::connect(&get_test_config())
        .await
        .expect("Failed to create client");
    let bucket = Bucket::new(Arc::new(store), test_bucket());

    // Two full parts plus a short tail
    let data = vec![7u8; MIN_CHUNK_SIZE * 2 + 1024];
    let mut session = bucket
        .init_multipart("skystash-it/multipart.bin", "application/octet-stream", Acl::Private)
        .await
        .expect("Failed to open session");
    session
        .put_all(&mut data.as_slice(), MIN_CHUNK_SIZE)
        .await
        .expect("Failed to upload parts");
    let completed = session.complete().await.expect("Failed to complete");

    assert_eq!(completed.parts.len(), 3);
    assert_eq!(completed.bytes, data.len() as u64);
}

#[tokio::test]
#[ignore]
async fn test_missing_bucket_maps_to_bucket_not_found() {
    if !s3_tests_enabled() {
        println!("Skipping S3 integration test - set S3_TESTS_ENABLED=1 to run");
        return;
    }

    let store = S3Store::connect(&get_test_config())
        .await
        .expect("Failed to create client");
    let err = store
        .put_object(
            "skystash-bucket-that-does-not-exist-42",
            "k",
            Bytes::new(),
            "text/plain",
            Acl::Private,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        skystash_store::TransferError::BucketNotFound(_)
            | skystash_store::TransferError::AccessDenied(_)
    ));
}
