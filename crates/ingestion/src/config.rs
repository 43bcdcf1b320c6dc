//! Ingestion options.

use std::time::Duration;

use crate::qc::QcPolicy;

/// Tunables for a batch run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Files read, extracted and normalized at the same time.
    pub max_concurrent_files: usize,
    /// Upper bound on opening and loading one file.
    pub read_timeout: Duration,
    /// Upper bound on mapping one file's records inside its transaction.
    pub write_timeout: Duration,
    pub qc_policy: QcPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_concurrent_files: 4,
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(120),
            qc_policy: QcPolicy::default(),
        }
    }
}

impl IngestOptions {
    pub fn with_max_concurrent_files(mut self, n: usize) -> Self {
        self.max_concurrent_files = n.max(1);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_qc_policy(mut self, policy: QcPolicy) -> Self {
        self.qc_policy = policy;
        self
    }
}
