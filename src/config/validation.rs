//! Config validation: unknown-key detection with Levenshtein suggestions.
//!
//! Two-pass parse: the raw TOML is first read into `toml::Value`, its key
//! tree is walked and compared against the known field names, and a warning
//! is emitted for every unknown key. Serde deserialization then proceeds as
//! normal. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, misplaced key).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

/// Every valid dotted key path of `MonitorConfig`.
///
/// Kept by hand in step with `monitor_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    [
        "machines",
        "machines.ids",
        "generator",
        "generator.temperature",
        "generator.vibration",
        "generator.gas_level",
        "thresholds",
        "thresholds.temperature_critical",
        "thresholds.vibration_critical",
        "thresholds.gas_level_critical",
        "classifier",
        "classifier.endpoint",
        "classifier.model",
        "classifier.api_key_env",
        "classifier.timeout_secs",
        "history",
        "history.capacity",
        "history.dedup",
        "insights",
        "insights.spike_delta",
        "insights.inspection_temperature",
        "insights.vibration_average_limit",
        "insights.gas_level_limit",
        "insights.digest_sample_size",
        "scheduler",
        "scheduler.tick_interval_ms",
    ]
    .into_iter()
    .collect()
}

/// Collect dotted key paths from a TOML value (tables only, arrays are leaves).
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Parse errors yield no warnings; serde reports them afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            suggestion: suggest_correction(&key, &known),
            field: key,
        })
        .collect()
}
