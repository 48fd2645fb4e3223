use crate::{environment::DeploymentEnvironment, error::ConfigError};
use engine_core::context::env::EnvContext;
use serde::Serialize;
use std::{
    collections::BTreeSet,
    fmt,
    sync::{Arc, RwLock},
};
use tracing::warn;

pub const ENV_PREFIX: &str = "SLUICE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    NextEngine,
    GradualRollout,
    Fallback,
    ForceLegacy,
    ForceNext,
    PerformanceMonitoring,
    OrderSafeguard,
    UndeclaredSourceCompat,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::NextEngine,
        Feature::GradualRollout,
        Feature::Fallback,
        Feature::ForceLegacy,
        Feature::ForceNext,
        Feature::PerformanceMonitoring,
        Feature::OrderSafeguard,
        Feature::UndeclaredSourceCompat,
    ];

    /// Environment variable (without prefix) that overrides this feature.
    pub fn env_key(&self) -> &'static str {
        match self {
            Feature::NextEngine => "NEXT_ENGINE",
            Feature::GradualRollout => "GRADUAL_ROLLOUT",
            Feature::Fallback => "ENGINE_FALLBACK",
            Feature::ForceLegacy => "FORCE_LEGACY_ENGINE",
            Feature::ForceNext => "FORCE_NEXT_ENGINE",
            Feature::PerformanceMonitoring => "PERFORMANCE_MONITORING",
            Feature::OrderSafeguard => "ORDER_SAFEGUARD",
            Feature::UndeclaredSourceCompat => "UNDECLARED_SOURCE_COMPAT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::NextEngine => "next_engine",
            Feature::GradualRollout => "gradual_rollout",
            Feature::Fallback => "fallback",
            Feature::ForceLegacy => "force_legacy",
            Feature::ForceNext => "force_next",
            Feature::PerformanceMonitoring => "performance_monitoring",
            Feature::OrderSafeguard => "order_safeguard",
            Feature::UndeclaredSourceCompat => "undeclared_source_compat",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable flag snapshot. Every `with_*` method returns a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    enabled: BTreeSet<Feature>,
    rollout_percentage: u8,
    environment: DeploymentEnvironment,
}

impl FeatureFlags {
    pub fn for_environment(environment: DeploymentEnvironment) -> Self {
        let defaults = environment.defaults();
        let mut enabled = BTreeSet::from([Feature::Fallback, Feature::OrderSafeguard]);
        if defaults.next_engine {
            enabled.insert(Feature::NextEngine);
        }
        if defaults.gradual_rollout {
            enabled.insert(Feature::GradualRollout);
        }
        if defaults.performance_monitoring {
            enabled.insert(Feature::PerformanceMonitoring);
        }

        FeatureFlags {
            enabled,
            rollout_percentage: defaults.rollout_percentage,
            environment,
        }
    }

    /// Builds the process-start snapshot from `SLUICE_*` variables.
    ///
    /// Bad environment names and rollout percentages degrade with a warning;
    /// only contradictory forced-engine flags are rejected.
    pub fn from_env(env: &EnvContext) -> Result<Self, ConfigError> {
        let env_key = format!("{ENV_PREFIX}ENV");
        let environment = match env.get(&env_key) {
            None => DeploymentEnvironment::default(),
            Some(raw) => raw.parse::<DeploymentEnvironment>().unwrap_or_else(|reason| {
                warn!(key = %env_key, %reason, "Falling back to production defaults");
                DeploymentEnvironment::Production
            }),
        };

        let mut flags = Self::for_environment(environment);
        for feature in Feature::ALL {
            let key = format!("{ENV_PREFIX}{}", feature.env_key());
            if let Some(on) = env.get_bool(&key) {
                flags = flags.with_feature(feature, on);
            } else if let Some(raw) = env.get(&key) {
                warn!(key = %key, value = %raw, "Ignoring unparsable boolean flag");
            }
        }

        let pct_key = format!("{ENV_PREFIX}ROLLOUT_PERCENTAGE");
        if let Some(raw) = env.get(&pct_key) {
            match raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: pct_key.clone(),
                    value: raw.clone(),
                    reason: "not an integer".into(),
                })
                .and_then(|pct| flags.clone().with_rollout_percentage(pct))
            {
                Ok(updated) => flags = updated,
                Err(err) => {
                    warn!(key = %pct_key, value = %raw, error = %err, "Disabling next engine");
                    flags = flags.fully_off();
                }
            }
        }

        flags.validate()?;
        Ok(flags)
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    pub fn rollout_percentage(&self) -> u8 {
        self.rollout_percentage
    }

    pub fn environment(&self) -> DeploymentEnvironment {
        self.environment
    }

    pub fn enabled(&self) -> impl Iterator<Item = Feature> + '_ {
        self.enabled.iter().copied()
    }

    pub fn with_feature(mut self, feature: Feature, on: bool) -> Self {
        if on {
            self.enabled.insert(feature);
        } else {
            self.enabled.remove(&feature);
        }
        self
    }

    pub fn with_rollout_percentage(mut self, pct: i64) -> Result<Self, ConfigError> {
        self.rollout_percentage = u8::try_from(pct)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or(ConfigError::InvalidRolloutPercentage(pct))?;
        Ok(self)
    }

    /// Next engine disabled and nothing rolled out.
    pub fn fully_off(self) -> Self {
        let mut flags = self.with_feature(Feature::NextEngine, false);
        flags.rollout_percentage = 0;
        flags
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_enabled(Feature::ForceLegacy) && self.is_enabled(Feature::ForceNext) {
            return Err(ConfigError::ConflictingEngineFlags);
        }
        Ok(())
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::for_environment(DeploymentEnvironment::default())
    }
}

/// Shared holder of the current snapshot.
///
/// Readers clone the `Arc` and keep a consistent view for the whole run;
/// writers swap in a complete new snapshot.
#[derive(Debug)]
pub struct FeatureFlagManager {
    current: RwLock<Arc<FeatureFlags>>,
}

impl FeatureFlagManager {
    pub fn new(flags: FeatureFlags) -> Result<Self, ConfigError> {
        flags.validate()?;
        Ok(FeatureFlagManager {
            current: RwLock::new(Arc::new(flags)),
        })
    }

    pub fn from_env(env: &EnvContext) -> Result<Self, ConfigError> {
        Self::new(FeatureFlags::from_env(env)?)
    }

    pub fn snapshot(&self) -> Arc<FeatureFlags> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.snapshot().is_enabled(feature)
    }

    pub fn update(&self, flags: FeatureFlags) -> Result<Arc<FeatureFlags>, ConfigError> {
        flags.validate()?;
        let flags = Arc::new(flags);
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = flags.clone();
        Ok(flags)
    }

    pub fn set_feature(&self, feature: Feature, on: bool) -> Result<Arc<FeatureFlags>, ConfigError> {
        self.modify(|flags| Ok(flags.with_feature(feature, on)))
    }

    pub fn set_rollout_percentage(&self, pct: i64) -> Result<Arc<FeatureFlags>, ConfigError> {
        self.modify(|flags| flags.with_rollout_percentage(pct))
    }

    /// Derives the next snapshot from the current one under a single write
    /// lock so concurrent setters never drop each other's changes.
    fn modify(
        &self,
        f: impl FnOnce(FeatureFlags) -> Result<FeatureFlags, ConfigError>,
    ) -> Result<Arc<FeatureFlags>, ConfigError> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let flags = f(current.as_ref().clone())?;
        flags.validate()?;
        let flags = Arc::new(flags);
        *current = flags.clone();
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn production_is_fully_off_by_default() {
        let flags = FeatureFlags::from_env(&EnvContext::empty()).unwrap();
        assert_eq!(flags.environment(), DeploymentEnvironment::Production);
        assert!(!flags.is_enabled(Feature::NextEngine));
        assert!(flags.is_enabled(Feature::Fallback));
        assert!(flags.is_enabled(Feature::OrderSafeguard));
        assert!(!flags.is_enabled(Feature::UndeclaredSourceCompat));
        assert_eq!(flags.rollout_percentage(), 0);
    }

    #[test]
    fn staging_uses_partial_rollout() {
        let env = EnvContext::empty().with("SLUICE_ENV", "staging");
        let flags = FeatureFlags::from_env(&env).unwrap();
        assert!(flags.is_enabled(Feature::NextEngine));
        assert!(flags.is_enabled(Feature::GradualRollout));
        assert_eq!(flags.rollout_percentage(), 25);
    }

    #[test]
    fn explicit_overrides_win() {
        let env = EnvContext::empty()
            .with("SLUICE_ENV", "production")
            .with("SLUICE_NEXT_ENGINE", "true")
            .with("SLUICE_GRADUAL_ROLLOUT", "1")
            .with("SLUICE_ROLLOUT_PERCENTAGE", "40")
            .with("SLUICE_ENGINE_FALLBACK", "false");
        let flags = FeatureFlags::from_env(&env).unwrap();
        assert!(flags.is_enabled(Feature::NextEngine));
        assert!(!flags.is_enabled(Feature::Fallback));
        assert_eq!(flags.rollout_percentage(), 40);
    }

    #[test]
    #[traced_test]
    fn invalid_percentage_degrades_to_fully_off() {
        for raw in ["150", "-3", "lots"] {
            let env = EnvContext::empty()
                .with("SLUICE_ENV", "development")
                .with("SLUICE_ROLLOUT_PERCENTAGE", raw);
            let flags = FeatureFlags::from_env(&env).unwrap();
            assert!(!flags.is_enabled(Feature::NextEngine));
            assert_eq!(flags.rollout_percentage(), 0);
        }
        assert!(logs_contain("Disabling next engine"));
    }

    #[test]
    fn conflicting_force_flags_are_rejected() {
        let env = EnvContext::empty()
            .with("SLUICE_FORCE_LEGACY_ENGINE", "on")
            .with("SLUICE_FORCE_NEXT_ENGINE", "on");
        assert_eq!(
            FeatureFlags::from_env(&env),
            Err(ConfigError::ConflictingEngineFlags)
        );
    }

    #[test]
    fn mutations_produce_new_snapshots() {
        let manager = FeatureFlagManager::new(FeatureFlags::default()).unwrap();
        let before = manager.snapshot();

        manager.set_feature(Feature::NextEngine, true).unwrap();
        manager.set_rollout_percentage(60).unwrap();

        assert!(!before.is_enabled(Feature::NextEngine));
        assert_eq!(before.rollout_percentage(), 0);
        let after = manager.snapshot();
        assert!(after.is_enabled(Feature::NextEngine));
        assert_eq!(after.rollout_percentage(), 60);

        assert_eq!(
            manager.set_rollout_percentage(101),
            Err(ConfigError::InvalidRolloutPercentage(101))
        );
        assert_eq!(manager.snapshot().rollout_percentage(), 60);
    }

    #[test]
    fn concurrent_setters_keep_every_change() {
        let manager = FeatureFlagManager::new(FeatureFlags::default()).unwrap();
        let features = [
            Feature::NextEngine,
            Feature::GradualRollout,
            Feature::PerformanceMonitoring,
        ];

        std::thread::scope(|scope| {
            for feature in features {
                let manager = &manager;
                scope.spawn(move || {
                    for _ in 0..200 {
                        manager.set_feature(feature, true).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for pct in 0..=100 {
                    manager.set_rollout_percentage(pct).unwrap();
                }
            });
        });

        let flags = manager.snapshot();
        for feature in features {
            assert!(flags.is_enabled(feature), "{feature:?} was lost");
        }
        assert_eq!(flags.rollout_percentage(), 100);
    }

    #[test]
    fn manager_refuses_conflicting_update() {
        let manager = FeatureFlagManager::new(FeatureFlags::default()).unwrap();
        manager.set_feature(Feature::ForceLegacy, true).unwrap();
        assert!(manager.set_feature(Feature::ForceNext, true).is_err());
        assert!(!manager.is_enabled(Feature::ForceNext));
    }
}
