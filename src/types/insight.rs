//! Insight types: InsightSummary

use serde::{Deserialize, Serialize};

/// Diagnostic summary derived from the latest readings and history.
///
/// Recomputed every tick and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightSummary {
    pub summary: Vec<String>,
    pub recommendations: Vec<String>,
}
