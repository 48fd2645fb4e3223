use crate::error::CliError;
use std::{collections::HashMap, path::Path};

/// Reads `KEY=VALUE` lines from a dotenv-style file.
pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>, CliError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::EnvFile(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_env_content(&content)
}

fn parse_env_content(content: &str) -> Result<HashMap<String, String>, CliError> {
    let mut vars = HashMap::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(CliError::EnvFile(format!(
                "malformed line {} (expected KEY=VALUE)",
                line_num + 1
            )));
        };

        let key = key.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            return Err(CliError::EnvFile(format!("empty key at line {}", line_num + 1)));
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_file() {
        let content = r#"
# rollout
SLUICE_ENV=staging
SLUICE_ROLLOUT_PERCENTAGE="40"
export SLUICE_ENGINE_FALLBACK='off'
        "#;

        let vars = parse_env_content(content).unwrap();
        assert_eq!(vars["SLUICE_ENV"], "staging");
        assert_eq!(vars["SLUICE_ROLLOUT_PERCENTAGE"], "40");
        assert_eq!(vars["SLUICE_ENGINE_FALLBACK"], "off");
    }

    #[test]
    fn rejects_line_without_equals() {
        assert!(parse_env_content("SLUICE_ENV staging").is_err());
        assert!(parse_env_content("=value").is_err());
    }
}
