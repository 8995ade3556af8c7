//! Per-session game settings and the lenient coercion applied to host input.

use derive_getters::Getters;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::GameError;

/// Shortest round a host may configure, in seconds.
pub const MIN_ROUND_SECONDS: u32 = 5;

/// Settings fixed at session creation.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct GameSettings {
    /// Display name of the host player.
    host_name: String,
    /// Number of rounds in one game cycle (≥1).
    total_rounds: u32,
    /// Round length in seconds (≥5).
    round_seconds: u32,
    /// Categories played every round, in host order. Never empty.
    categories: Vec<String>,
}

/// Fallbacks used when host input is missing or unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsDefaults {
    /// Fallback for `total_rounds`.
    pub total_rounds: u32,
    /// Fallback for `round_seconds`.
    pub round_seconds: u32,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            total_rounds: 5,
            round_seconds: 60,
        }
    }
}

impl GameSettings {
    /// Builds settings from raw host input, never failing.
    ///
    /// Unknown categories are dropped; an empty selection means every known
    /// category. Unusable numbers fall back to `defaults`.
    #[instrument(skip(total_rounds, round_seconds, categories, known))]
    pub fn coerce(
        host_name: Option<String>,
        total_rounds: Option<&Value>,
        round_seconds: Option<&Value>,
        categories: Option<&Value>,
        known: &[String],
        defaults: SettingsDefaults,
    ) -> Self {
        let total_rounds = parse_total_rounds(total_rounds).unwrap_or_else(|e| {
            warn!(error = %e, fallback = defaults.total_rounds, "Coercing total rounds");
            defaults.total_rounds
        });
        let round_seconds = parse_round_seconds(round_seconds).unwrap_or_else(|e| {
            warn!(error = %e, fallback = defaults.round_seconds, "Coercing round seconds");
            defaults.round_seconds
        });
        let categories = select_categories(categories, known).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to all known categories");
            known.to_vec()
        });
        let host_name = display_name(host_name, "Host");

        debug!(
            host_name = %host_name,
            total_rounds,
            round_seconds,
            categories = ?categories,
            "Coerced game settings"
        );

        Self {
            host_name,
            total_rounds,
            round_seconds,
            categories,
        }
    }

    /// Builds settings from already-valid values.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfiguration`] if any value is out of range.
    #[instrument(skip(categories))]
    pub fn new(
        host_name: impl Into<String> + std::fmt::Debug,
        total_rounds: u32,
        round_seconds: u32,
        categories: Vec<String>,
    ) -> Result<Self, GameError> {
        if total_rounds == 0 {
            return Err(GameError::invalid_configuration("total rounds must be positive"));
        }
        if round_seconds < MIN_ROUND_SECONDS {
            return Err(GameError::invalid_configuration(format!(
                "round seconds must be at least {}",
                MIN_ROUND_SECONDS
            )));
        }
        if categories.is_empty() {
            return Err(GameError::invalid_configuration("no categories selected"));
        }
        Ok(Self {
            host_name: host_name.into(),
            total_rounds,
            round_seconds,
            categories,
        })
    }
}

/// Falls back to `default` for missing or blank names.
pub(crate) fn display_name(name: Option<String>, default: &str) -> String {
    match name {
        Some(name) if !name.is_empty() => name,
        _ => default.to_string(),
    }
}

/// Reads a JSON number or numeric string as a whole positive count.
///
/// Fractions are floored.
fn positive_integer(value: Option<&Value>, field: &str) -> Result<u32, GameError> {
    let number = match value {
        None | Some(Value::Null) => {
            return Err(GameError::invalid_configuration(format!("{field} missing")));
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match number {
        Some(n) if n.is_finite() && n >= 1.0 => Ok(n.floor().min(u32::MAX as f64) as u32),
        _ => Err(GameError::invalid_configuration(format!(
            "{field} must be a positive number"
        ))),
    }
}

fn parse_total_rounds(value: Option<&Value>) -> Result<u32, GameError> {
    positive_integer(value, "totalRounds")
}

fn parse_round_seconds(value: Option<&Value>) -> Result<u32, GameError> {
    let seconds = positive_integer(value, "roundSeconds")?;
    if seconds < MIN_ROUND_SECONDS {
        return Err(GameError::invalid_configuration(format!(
            "roundSeconds must be at least {MIN_ROUND_SECONDS}"
        )));
    }
    Ok(seconds)
}

fn select_categories(value: Option<&Value>, known: &[String]) -> Result<Vec<String>, GameError> {
    let Some(Value::Array(items)) = value else {
        return Err(GameError::invalid_configuration("categories must be a list"));
    };

    let mut chosen: Vec<String> = Vec::new();
    for item in items {
        let id = match item {
            Value::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        };
        if known.contains(&id) && !chosen.contains(&id) {
            chosen.push(id);
        }
    }

    if chosen.is_empty() {
        return Err(GameError::invalid_configuration("no known categories selected"));
    }
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn known() -> Vec<String> {
        ["name", "animal", "food"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn numeric_strings_are_accepted() {
        assert_eq!(positive_integer(Some(&json!("3")), "x"), Ok(3));
        assert_eq!(positive_integer(Some(&json!(2.9)), "x"), Ok(2));
    }

    #[test]
    fn non_positive_numbers_are_rejected() {
        assert!(positive_integer(Some(&json!(0)), "x").is_err());
        assert!(positive_integer(Some(&json!(-4)), "x").is_err());
        assert!(positive_integer(Some(&json!("abc")), "x").is_err());
        assert!(positive_integer(Some(&json!(true)), "x").is_err());
    }

    #[test]
    fn categories_are_lowercased_filtered_and_deduplicated() {
        let chosen = select_categories(
            Some(&json!(["Animal", "planet", "animal", "FOOD"])),
            &known(),
        )
        .unwrap();
        assert_eq!(chosen, vec!["animal".to_string(), "food".to_string()]);
    }
}
