//! Mapping of AWS SDK errors onto store errors

use aws_sdk_s3::error::SdkError;
use skystash_store::TransferError;

pub(crate) fn config_error(message: impl Into<String>) -> TransferError {
    TransferError::Service {
        code: "InvalidConfig".to_string(),
        message: message.into(),
    }
}

/// Convert an AWS SDK error into a `TransferError`
///
/// `bucket` is used to name the bucket in `BucketNotFound` errors.
pub(crate) fn from_sdk<E>(error: SdkError<E>, bucket: &str) -> TransferError
where
    E: std::error::Error + 'static,
{
    match error {
        SdkError::ConstructionFailure(e) => {
            let msg = format!("{:?}", e);
            if mentions_credentials(&msg) {
                TransferError::Authentication(msg)
            } else {
                TransferError::Sdk(msg)
            }
        }
        SdkError::DispatchFailure(e) => {
            let msg = format!("{:?}", e);
            if mentions_credentials(&msg) {
                TransferError::Authentication(msg)
            } else {
                TransferError::Network(format!("Network dispatch failure: {}", msg))
            }
        }
        SdkError::TimeoutError(_) => TransferError::Network("Operation timed out".to_string()),
        SdkError::ResponseError(e) => TransferError::Network(format!("Response error: {:?}", e)),
        SdkError::ServiceError(e) => classify_service_error(&format!("{:?}", e), bucket),
        other => TransferError::Sdk(format!("{:?}", other)),
    }
}

/// Classify a service error from its debug rendering
pub(crate) fn classify_service_error(err_str: &str, bucket: &str) -> TransferError {
    if err_str.contains("NoSuchBucket") {
        TransferError::BucketNotFound(bucket.to_string())
    } else if err_str.contains("AccessDenied") {
        TransferError::AccessDenied(format!("Access denied to bucket {}", bucket))
    } else if ["InvalidAccessKeyId", "SignatureDoesNotMatch", "ExpiredToken"]
        .iter()
        .any(|code| err_str.contains(code))
    {
        TransferError::Authentication(err_str.to_string())
    } else if err_str.contains("NoSuchUpload") {
        TransferError::MultipartUpload("The multipart upload no longer exists".to_string())
    } else {
        TransferError::Service {
            code: "Unknown".to_string(),
            message: err_str.to_string(),
        }
    }
}

fn mentions_credentials(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("credentials") || lower.contains("no credential")
}
