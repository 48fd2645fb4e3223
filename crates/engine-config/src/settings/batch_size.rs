use crate::error::ConfigError;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Upper bound on rows requested per incremental read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(usize);

impl BatchSize {
    pub fn new(size: usize) -> Option<Self> {
        (size > 0).then_some(BatchSize(size))
    }

    pub fn parse(key: &str, raw: &str) -> Result<Self, ConfigError> {
        raw.trim()
            .parse::<usize>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
                reason: "batch size must be a positive integer".into(),
            })
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        BatchSize(DEFAULT_BATCH_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_sizes_only() {
        assert_eq!(BatchSize::parse("k", " 500 ").unwrap().get(), 500);
        assert!(BatchSize::parse("k", "0").is_err());
        assert!(BatchSize::parse("k", "-1").is_err());
        assert_eq!(BatchSize::default().get(), DEFAULT_BATCH_SIZE);
    }
}
