//! Direct vs. multipart decision

use std::fmt;

/// Files up to this size (100 MiB) are uploaded with a single request
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Part size of multipart uploads (5 MiB, the S3 minimum)
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// How a file is moved to the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStrategy {
    /// One `put` of the whole file
    Direct,
    /// A multipart session with sequential parts
    Chunked,
}

impl TransferStrategy {
    /// Direct iff `size <= threshold`
    pub fn classify(size: u64, threshold: u64) -> Self {
        if size <= threshold {
            TransferStrategy::Direct
        } else {
            TransferStrategy::Chunked
        }
    }
}

impl fmt::Display for TransferStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStrategy::Direct => write!(f, "direct"),
            TransferStrategy::Chunked => write!(f, "chunked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        let t = DEFAULT_MULTIPART_THRESHOLD;
        assert_eq!(TransferStrategy::classify(0, t), TransferStrategy::Direct);
        assert_eq!(TransferStrategy::classify(t - 1, t), TransferStrategy::Direct);
        assert_eq!(TransferStrategy::classify(t, t), TransferStrategy::Direct);
        assert_eq!(TransferStrategy::classify(t + 1, t), TransferStrategy::Chunked);
        assert_eq!(
            TransferStrategy::classify(150 * 1024 * 1024, t),
            TransferStrategy::Chunked
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_MULTIPART_THRESHOLD, 104_857_600);
        assert_eq!(DEFAULT_CHUNK_SIZE, 5_242_880);
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferStrategy::Direct.to_string(), "direct");
        assert_eq!(TransferStrategy::Chunked.to_string(), "chunked");
    }
}
