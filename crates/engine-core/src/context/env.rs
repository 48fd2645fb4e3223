use std::collections::HashMap;

/// Snapshot of environment variables used to configure a run.
///
/// Configuration is always read through an explicit context rather than the
/// process environment, so tests can build one with [`EnvContext::empty`].
#[derive(Debug, Clone)]
pub struct EnvContext {
    vars: HashMap<String, String>,
}

impl EnvContext {
    pub fn new() -> Self {
        let mut vars = HashMap::new();

        // Load all system environment variables
        for (key, value) in std::env::vars() {
            vars.insert(key, value);
        }

        Self { vars }
    }

    pub fn empty() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.vars
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Parses `1/true/yes/on` and `0/false/no/off`, case-insensitively.
    /// Anything else, including an unset key, yields `None`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let raw = self.vars.get(key)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    pub fn set(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    pub fn merge(&mut self, vars: HashMap<String, String>) {
        self.vars.extend(vars);
    }

    #[cfg(any(test, debug_assertions))]
    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

impl Default for EnvContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_context() {
        let mut ctx = EnvContext::empty();
        ctx.set("TEST_KEY".to_string(), "test_value".to_string());

        assert_eq!(ctx.get("TEST_KEY"), Some("test_value".to_string()));
        assert_eq!(ctx.get("MISSING"), None);
        assert_eq!(ctx.get_or("MISSING", "default"), "default");

        ctx.clear();
        assert_eq!(ctx.get("TEST_KEY"), None);
    }

    #[test]
    fn parses_boolean_flags() {
        let ctx = EnvContext::empty()
            .with("A", "TRUE")
            .with("B", "off")
            .with("C", "maybe");

        assert_eq!(ctx.get_bool("A"), Some(true));
        assert_eq!(ctx.get_bool("B"), Some(false));
        assert_eq!(ctx.get_bool("C"), None);
        assert_eq!(ctx.get_bool("D"), None);
    }
}
