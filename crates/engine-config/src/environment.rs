use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnvironment {
    Development,
    Staging,
    #[default]
    Production,
}

/// Flag defaults that apply before any explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentDefaults {
    pub next_engine: bool,
    pub gradual_rollout: bool,
    pub rollout_percentage: u8,
    pub performance_monitoring: bool,
}

impl DeploymentEnvironment {
    pub fn defaults(&self) -> EnvironmentDefaults {
        match self {
            DeploymentEnvironment::Development => EnvironmentDefaults {
                next_engine: true,
                gradual_rollout: false,
                rollout_percentage: 100,
                performance_monitoring: true,
            },
            DeploymentEnvironment::Staging => EnvironmentDefaults {
                next_engine: true,
                gradual_rollout: true,
                rollout_percentage: 25,
                performance_monitoring: true,
            },
            DeploymentEnvironment::Production => EnvironmentDefaults {
                next_engine: false,
                gradual_rollout: false,
                rollout_percentage: 0,
                performance_monitoring: false,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentEnvironment::Development => "development",
            DeploymentEnvironment::Staging => "staging",
            DeploymentEnvironment::Production => "production",
        }
    }
}

impl FromStr for DeploymentEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "local" => Ok(DeploymentEnvironment::Development),
            "stage" | "staging" => Ok(DeploymentEnvironment::Staging),
            "prod" | "production" => Ok(DeploymentEnvironment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl fmt::Display for DeploymentEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("DEV".parse(), Ok(DeploymentEnvironment::Development));
        assert_eq!("staging".parse(), Ok(DeploymentEnvironment::Staging));
        assert_eq!("prod".parse(), Ok(DeploymentEnvironment::Production));
        assert!("qa".parse::<DeploymentEnvironment>().is_err());
    }

    #[test]
    fn production_keeps_next_engine_off() {
        let defaults = DeploymentEnvironment::Production.defaults();
        assert!(!defaults.next_engine);
        assert_eq!(defaults.rollout_percentage, 0);
        assert_eq!(DeploymentEnvironment::Staging.defaults().rollout_percentage, 25);
    }
}
