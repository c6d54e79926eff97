//! Risk Classification Module
//!
//! Maps a sensor sample to a [`RiskTier`].
//!
//! ## Architecture
//!
//! - **RemoteClassifier**: chat-completions inference service, used when a
//!   credential is configured
//! - **ThresholdClassifier**: fixed thresholds, used when no credential is
//!   configured. Never yields `Warning`.
//! - **RiskAssessor**: routes between the two and applies the degradation
//!   policy (a failed remote call classifies as `Normal`)

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{RiskTier, SensorReading};

mod assessor;
mod remote;
mod threshold;

pub use assessor::{Assessment, AssessorStats, ClassificationPath, RiskAssessor};
pub use remote::{build_prompt, parse_tier_content, RemoteClassifier};
pub use threshold::ThresholdClassifier;

/// Errors from a classification capability.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classifier returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("classification timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed classifier response: {0}")]
    Parse(String),
}

impl ClassifyError {
    /// True for network, timeout and status failures; false for bad payloads.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ClassifyError::Parse(_))
    }
}

/// Unified trait for classification backends
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    /// Classify one sample.
    async fn classify(&self, reading: &SensorReading) -> Result<RiskTier, ClassifyError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
