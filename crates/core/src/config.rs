// SPDX-License-Identifier: MIT

//! Runtime configuration: compiled-in defaults overlaid by `GENESIS_*`
//! environment variables (spec.md §7 "Configuration").

use std::time::Duration;

use crate::error::MorphicError;

/// Tunable parameters for the tick engine, evolution pipeline, and net
/// layer. Every field has a default matching the reference world; operators
/// override individual fields with `GENESIS_<FIELD_NAME_UPPERCASE>` env vars.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub tick_rate_ms: u64,
    pub min_population: u32,
    pub max_entities: u32,
    pub world_width: f64,
    pub world_height: f64,
    pub trait_timeout_sec: f64,
    pub tick_time_budget_sec: f64,
    pub max_active_traits: u32,
    pub max_trait_versions_kept: u32,
    pub snapshot_interval_ticks: u64,
    pub evolution_cooldown_sec: u64,
    pub fitness_rollback_threshold: f64,
    pub llm_timeout_sec: u64,
    pub mutations_dir: String,
    pub periodic_evolution_interval_sec: u64,
    /// Molbot population above which the predator regulator (spec.md §4.1
    /// step 4) is allowed to spawn a predator.
    pub predator_spawn_threshold: u32,
    /// Molbot population above which the virus regulator (spec.md §4.1
    /// step 5) is allowed to ignite a dormant infection.
    pub virus_spawn_threshold: u32,
    /// How often the tick engine's checkpoint stage (spec.md §4.1 step 11)
    /// persists a full entity-population snapshot.
    pub checkpoint_interval_ticks: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_ms: 16,
            min_population: 20,
            max_entities: 500,
            world_width: 2000.0,
            world_height: 2000.0,
            trait_timeout_sec: 0.005,
            tick_time_budget_sec: 0.014,
            max_active_traits: 30,
            max_trait_versions_kept: 3,
            snapshot_interval_ticks: 300,
            evolution_cooldown_sec: 60,
            fitness_rollback_threshold: 0.15,
            llm_timeout_sec: 120,
            mutations_dir: "./mutations".to_string(),
            periodic_evolution_interval_sec: 1800,
            predator_spawn_threshold: 50,
            virus_spawn_threshold: 50,
            checkpoint_interval_ticks: 1000,
        }
    }
}

impl Config {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn trait_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.trait_timeout_sec)
    }

    pub fn tick_time_budget(&self) -> Duration {
        Duration::from_secs_f64(self.tick_time_budget_sec)
    }

    pub fn evolution_cooldown(&self) -> Duration {
        Duration::from_secs(self.evolution_cooldown_sec)
    }

    /// TTL for the cross-process cycle lock: `max(60s, cooldown * 3)`
    /// (spec.md §4.8 "Cycle Mutex").
    pub fn cycle_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.evolution_cooldown_sec.saturating_mul(3).max(60))
    }

    /// Load defaults, then overlay any `GENESIS_*` environment variables
    /// present in the process environment. Malformed values are reported
    /// rather than silently ignored.
    pub fn from_env() -> Result<Self, MorphicError> {
        let mut config = Self::default();
        config.overlay_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Testable core of `from_env`: takes a lookup function instead of
    /// reading the process environment directly.
    fn overlay_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), MorphicError> {
        macro_rules! overlay_parsed {
            ($field:ident, $env_key:literal) => {
                if let Some(raw) = lookup($env_key) {
                    self.$field = raw.parse().map_err(|_| MorphicError::InvalidConfig {
                        key: $env_key,
                        value: raw.clone(),
                    })?;
                }
            };
        }

        overlay_parsed!(tick_rate_ms, "GENESIS_TICK_RATE_MS");
        overlay_parsed!(min_population, "GENESIS_MIN_POPULATION");
        overlay_parsed!(max_entities, "GENESIS_MAX_ENTITIES");
        overlay_parsed!(world_width, "GENESIS_WORLD_WIDTH");
        overlay_parsed!(world_height, "GENESIS_WORLD_HEIGHT");
        overlay_parsed!(trait_timeout_sec, "GENESIS_TRAIT_TIMEOUT_SEC");
        overlay_parsed!(tick_time_budget_sec, "GENESIS_TICK_TIME_BUDGET_SEC");
        overlay_parsed!(max_active_traits, "GENESIS_MAX_ACTIVE_TRAITS");
        overlay_parsed!(max_trait_versions_kept, "GENESIS_MAX_TRAIT_VERSIONS_KEPT");
        overlay_parsed!(snapshot_interval_ticks, "GENESIS_SNAPSHOT_INTERVAL_TICKS");
        overlay_parsed!(evolution_cooldown_sec, "GENESIS_EVOLUTION_COOLDOWN_SEC");
        overlay_parsed!(
            fitness_rollback_threshold,
            "GENESIS_FITNESS_ROLLBACK_THRESHOLD"
        );
        overlay_parsed!(llm_timeout_sec, "GENESIS_LLM_TIMEOUT_SEC");
        overlay_parsed!(
            periodic_evolution_interval_sec,
            "GENESIS_PERIODIC_EVOLUTION_INTERVAL_SEC"
        );
        overlay_parsed!(predator_spawn_threshold, "GENESIS_PREDATOR_SPAWN_THRESHOLD");
        overlay_parsed!(virus_spawn_threshold, "GENESIS_VIRUS_SPAWN_THRESHOLD");
        overlay_parsed!(checkpoint_interval_ticks, "GENESIS_CHECKPOINT_INTERVAL_TICKS");

        if let Some(raw) = lookup("GENESIS_MUTATIONS_DIR") {
            self.mutations_dir = raw;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
