//! Environment variable overrides.
//!
//! Applied after every file layer, so the environment always wins.

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};

/// Bot token.
pub const ENV_TOKEN: &str = "HEARTH_TOKEN";
/// Logging level (`logging.level`).
pub const ENV_LOG_LEVEL: &str = "HEARTH_LOG_LEVEL";
/// Logging format (`logging.format`).
pub const ENV_LOG_FORMAT: &str = "HEARTH_LOG_FORMAT";
/// Comma-separated intent names (`gateway.intents`).
pub const ENV_INTENTS: &str = "HEARTH_INTENTS";

/// Snapshot the `HEARTH_*` variables from the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("HEARTH_"))
        .collect()
}

/// Write overrides from `vars` into the merged tree.
///
/// Returns how many overrides were applied. Empty values are ignored.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if `HEARTH_INTENTS` names no intents.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied = 0usize;

    let mut set = |section: &str, key: &str, value: toml::Value| {
        if let toml::Value::Table(root) = merged {
            let table = root
                .entry(section.to_owned())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
            if let toml::Value::Table(table) = table {
                table.insert(key.to_owned(), value);
                applied = applied.saturating_add(1);
            }
        }
    };

    if let Some(token) = non_empty(vars, ENV_TOKEN) {
        set("gateway", "token", toml::Value::String(token.to_owned()));
    }
    if let Some(level) = non_empty(vars, ENV_LOG_LEVEL) {
        set("logging", "level", toml::Value::String(level.to_owned()));
    }
    if let Some(format) = non_empty(vars, ENV_LOG_FORMAT) {
        set(
            "logging",
            "format",
            toml::Value::String(format.to_ascii_lowercase()),
        );
    }
    if let Some(raw) = non_empty(vars, ENV_INTENTS) {
        let names: Vec<toml::Value> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| toml::Value::String(name.to_ascii_lowercase()))
            .collect();
        if names.is_empty() {
            return Err(ConfigError::EnvError {
                var: ENV_INTENTS.to_owned(),
                message: "expected a comma-separated list of intent names".to_owned(),
            });
        }
        set("gateway", "intents", toml::Value::Array(names));
    }

    Ok(applied)
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn overrides_are_written_into_sections() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"\n").unwrap();
        let count = apply_env_overrides(
            &mut merged,
            &vars(&[
                (ENV_TOKEN, "tok"),
                (ENV_LOG_LEVEL, "debug"),
                (ENV_LOG_FORMAT, "JSON"),
                (ENV_INTENTS, "guilds, Guild_Members ,"),
            ]),
        )
        .unwrap();

        assert_eq!(count, 4);
        assert_eq!(merged["gateway"]["token"].as_str(), Some("tok"));
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(merged["logging"]["format"].as_str(), Some("json"));
        let intents: Vec<&str> = merged["gateway"]["intents"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(toml::Value::as_str)
            .collect();
        assert_eq!(intents, vec!["guilds", "guild_members"]);
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        let count = apply_env_overrides(&mut merged, &vars(&[(ENV_TOKEN, "  ")])).unwrap();
        assert_eq!(count, 0);
        assert!(merged.get("gateway").is_none());
    }

    #[test]
    fn intents_without_names_are_rejected() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        let result = apply_env_overrides(&mut merged, &vars(&[(ENV_INTENTS, " , ,")]));
        assert!(matches!(result, Err(ConfigError::EnvError { var, .. }) if var == ENV_INTENTS));
    }
}
