//! Risk assessor - two-tier classification policy
//!
//! | Situation                         | Result                      |
//! |-----------------------------------|-----------------------------|
//! | no credential configured          | threshold classifier        |
//! | credential, remote call succeeds  | remote tier                 |
//! | credential, remote call fails     | `Normal` (logged)           |
//!
//! The two fallbacks are not unified: a failed remote call
//! does NOT fall through to thresholds.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ClassifyError, RemoteClassifier, RiskClassifier, ThresholdClassifier};
use crate::config::MonitorConfig;
use crate::types::{RiskTier, SensorReading};

/// Which path produced a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationPath {
    /// Remote service answered
    Remote,
    /// No credential, thresholds applied
    ThresholdFallback,
    /// Remote service failed, defaulted to Normal
    Degraded,
}

/// Outcome of assessing one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub tier: RiskTier,
    pub path: ClassificationPath,
}

/// Counters per classification path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssessorStats {
    pub remote: u64,
    pub threshold_fallback: u64,
    pub degraded: u64,
    pub transport_failures: u64,
    pub parse_failures: u64,
}

impl AssessorStats {
    fn record(&mut self, path: ClassificationPath) {
        match path {
            ClassificationPath::Remote => self.remote += 1,
            ClassificationPath::ThresholdFallback => self.threshold_fallback += 1,
            ClassificationPath::Degraded => self.degraded += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.remote + self.threshold_fallback + self.degraded
    }
}

pub struct RiskAssessor {
    remote: Option<Arc<dyn RiskClassifier>>,
    fallback: ThresholdClassifier,
    timeout: Duration,
    stats: AssessorStats,
}

impl RiskAssessor {
    /// Thresholds only (the no-credential state).
    pub fn threshold_only(fallback: ThresholdClassifier) -> Self {
        Self {
            remote: None,
            fallback,
            timeout: Duration::from_secs(crate::config::defaults::CLASSIFIER_TIMEOUT_SECS),
            stats: AssessorStats::default(),
        }
    }

    /// Remote classifier bounded by `timeout`; thresholds are kept but only
    /// used if the remote is later removed.
    pub fn with_remote(
        remote: Arc<dyn RiskClassifier>,
        fallback: ThresholdClassifier,
        timeout: Duration,
    ) -> Self {
        Self {
            remote: Some(remote),
            fallback,
            timeout,
            stats: AssessorStats::default(),
        }
    }

    /// Pick the path from config and the credential environment variable.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, ClassifyError> {
        let fallback = ThresholdClassifier::new(config.thresholds.clone());

        match config.classifier.api_key() {
            Some(key) => {
                let remote = RemoteClassifier::new(&config.classifier, key)?;
                info!(
                    endpoint = %remote.endpoint(),
                    model = %config.classifier.model,
                    timeout_secs = config.classifier.timeout_secs,
                    "Remote risk classifier enabled"
                );
                Ok(Self::with_remote(Arc::new(remote), fallback, config.classifier.timeout()))
            }
            None => {
                info!(
                    env = %config.classifier.api_key_env,
                    "No classifier credential configured, using threshold fallback"
                );
                Ok(Self::threshold_only(fallback))
            }
        }
    }

    pub fn uses_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn stats(&self) -> &AssessorStats {
        &self.stats
    }

    /// Classify one sample. Never fails.
    pub async fn assess(&mut self, reading: &SensorReading) -> Assessment {
        let assessment = match &self.remote {
            None => {
                let tier = self.fallback.classify_reading(reading);
                debug!(machine = %reading.machine_id, tier = %tier, "Threshold classification");
                Assessment {
                    tier,
                    path: ClassificationPath::ThresholdFallback,
                }
            }
            Some(remote) => {
                let result = match tokio::time::timeout(self.timeout, remote.classify(reading)).await {
                    Ok(inner) => inner,
                    Err(_) => Err(ClassifyError::Timeout(self.timeout)),
                };

                match result {
                    Ok(tier) => {
                        debug!(machine = %reading.machine_id, tier = %tier, backend = remote.backend_name(), "Remote classification");
                        Assessment {
                            tier,
                            path: ClassificationPath::Remote,
                        }
                    }
                    Err(e) => {
                        if e.is_transport() {
                            self.stats.transport_failures += 1;
                        } else {
                            self.stats.parse_failures += 1;
                        }
                        warn!(
                            machine = %reading.machine_id,
                            tick = reading.tick,
                            error = %e,
                            "Risk classification failed, defaulting to normal"
                        );
                        Assessment {
                            tier: RiskTier::Normal,
                            path: ClassificationPath::Degraded,
                        }
                    }
                }
            }
        };

        self.stats.record(assessment.path);
        assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdConfig;
    use crate::types::MachineId;
    use async_trait::async_trait;
    use chrono::Utc;

    /// Remote stand-in returning a fixed result.
    struct FixedRemote(fn() -> Result<RiskTier, ClassifyError>);

    #[async_trait]
    impl RiskClassifier for FixedRemote {
        async fn classify(&self, _reading: &SensorReading) -> Result<RiskTier, ClassifyError> {
            (self.0)()
        }

        fn backend_name(&self) -> &'static str {
            "fixed"
        }
    }

    struct SlowRemote;

    #[async_trait]
    impl RiskClassifier for SlowRemote {
        async fn classify(&self, _reading: &SensorReading) -> Result<RiskTier, ClassifyError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(RiskTier::Critical)
        }

        fn backend_name(&self) -> &'static str {
            "slow"
        }
    }

    fn hot_sample() -> SensorReading {
        SensorReading {
            machine_id: MachineId::new("M1"),
            temperature: 105.0,
            vibration: 4.4,
            gas_level: 19.0,
            timestamp: Utc::now(),
            tick: 1,
        }
    }

    fn with_remote(remote: impl RiskClassifier + 'static) -> RiskAssessor {
        RiskAssessor::with_remote(
            Arc::new(remote),
            ThresholdClassifier::new(ThresholdConfig::default()),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_no_credential_uses_thresholds() {
        let mut assessor = RiskAssessor::threshold_only(ThresholdClassifier::default());
        let a = assessor.assess(&hot_sample()).await;
        assert_eq!(a.tier, RiskTier::Critical);
        assert_eq!(a.path, ClassificationPath::ThresholdFallback);
        assert!(!assessor.uses_remote());
        assert_eq!(assessor.stats().threshold_fallback, 1);
    }

    #[tokio::test]
    async fn test_remote_tier_is_used_as_is() {
        let mut assessor = with_remote(FixedRemote(|| Ok(RiskTier::Warning)));
        let a = assessor.assess(&hot_sample()).await;
        assert_eq!(a.tier, RiskTier::Warning);
        assert_eq!(a.path, ClassificationPath::Remote);
        assert_eq!(assessor.stats().remote, 1);
    }

    #[tokio::test]
    async fn test_remote_parse_failure_degrades_to_normal_not_thresholds() {
        let mut assessor =
            with_remote(FixedRemote(|| Err(ClassifyError::Parse("bad".to_string()))));
        let a = assessor.assess(&hot_sample()).await;

        // Thresholds would say Critical for this sample
        assert_eq!(a.tier, RiskTier::Normal);
        assert_eq!(a.path, ClassificationPath::Degraded);
        assert_eq!(assessor.stats().parse_failures, 1);
        assert_eq!(assessor.stats().transport_failures, 0);
    }

    #[tokio::test]
    async fn test_remote_status_failure_degrades_to_normal() {
        let mut assessor = with_remote(FixedRemote(|| {
            Err(ClassifyError::Status(reqwest::StatusCode::BAD_GATEWAY))
        }));
        let a = assessor.assess(&hot_sample()).await;
        assert_eq!(a.tier, RiskTier::Normal);
        assert_eq!(assessor.stats().transport_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_remote_times_out_and_degrades() {
        let mut assessor = with_remote(SlowRemote);
        let a = assessor.assess(&hot_sample()).await;
        assert_eq!(a.tier, RiskTier::Normal);
        assert_eq!(a.path, ClassificationPath::Degraded);
        assert_eq!(assessor.stats().transport_failures, 1);
        assert_eq!(assessor.stats().total(), 1);
    }

    #[test]
    fn test_from_config_without_credential() {
        let mut config = MonitorConfig::default();
        config.classifier.api_key_env = "MACHINE_GUARD_TEST_UNSET_KEY_VAR".to_string();
        let assessor = RiskAssessor::from_config(&config).unwrap();
        assert!(!assessor.uses_remote());
    }
}
