// SPDX-License-Identifier: MIT

//! Cold-start vs. checkpoint-restore decision for `morphicd` (spec.md
//! §4.10 "Checkpoint / Restore"): absence of a checkpoint is a fresh
//! start, and restoring one rehydrates the world's entities, tick
//! counter, and active trait sources before the tick loop resumes.

use mp_core::Config;
use mp_sim::{Registry, World};
use mp_storage::Checkpoint;

/// Re-register every trait family the checkpoint had active, writing its
/// source back out under `mutations_dir` so the registry's file-retention
/// bookkeeping has something to evict later, then repopulate `world`'s
/// entities from their restorable fields. Per-family validation failures
/// are logged and the family is simply left unregistered rather than
/// aborting the whole restore.
pub fn restore(world: &mut World, registry: &Registry, mutations_dir: &str, checkpoint: &Checkpoint) {
    std::fs::create_dir_all(mutations_dir).ok();

    for (canonical_name, source) in &checkpoint.active_trait_sources {
        match mp_sim::traitlang::validate(source, |_| false) {
            Ok(validated) => {
                let file_path = format!("{mutations_dir}/trait_{canonical_name}_restored.py");
                if let Err(err) = std::fs::write(&file_path, source) {
                    tracing::warn!(canonical_name, error = %err, "failed to write restored trait source");
                    continue;
                }
                registry.register(canonical_name, &validated.class_name, validated.module, file_path);
                registry.register_source(canonical_name, source.clone());
            }
            Err(err) => {
                tracing::warn!(canonical_name, error = %err, "restored trait source failed validation, leaving unregistered");
            }
        }
    }

    for snapshot in &checkpoint.entities {
        world.restore_entity(
            snapshot.id,
            snapshot.x,
            snapshot.y,
            snapshot.energy,
            snapshot.max_energy,
            snapshot.age,
            snapshot.kind,
            snapshot.state,
            snapshot.parent_id,
            checkpoint.tick,
        );
    }
    world.entities.rebuild_index();
}

/// Build the checkpoint to persist for the current world state (spec.md
/// §4.10, the counterpart to [`restore`]).
pub fn build_checkpoint(
    world: &mp_sim::World,
    registry: &Registry,
    config: &Config,
    tick: u64,
    now_epoch_ms: u64,
) -> Checkpoint {
    let entities = world
        .entities
        .iter()
        .map(|entity| mp_storage::CheckpointEntitySnapshot {
            id: entity.id,
            x: entity.x,
            y: entity.y,
            energy: entity.energy,
            max_energy: entity.max_energy,
            age: entity.age,
            trait_canonical_names: entity.traits.iter().map(|h| h.canonical_name.clone()).collect(),
            state: entity.state,
            kind: entity.kind,
            parent_id: entity.parent_id,
        })
        .collect();

    let mut active_trait_sources = std::collections::HashMap::new();
    for canonical_name in registry.snapshot().keys() {
        if let Some(source) = registry.get_source(canonical_name) {
            active_trait_sources.insert(canonical_name.clone(), source);
        }
    }

    Checkpoint {
        tick,
        world_width: config.world_width,
        world_height: config.world_height,
        entities,
        death_stats: world.death_stats.clone(),
        active_trait_sources,
        checkpointed_at_epoch_ms: now_epoch_ms,
    }
}

#[cfg(test)]
#[path = "restore_tests.rs"]
mod tests;
