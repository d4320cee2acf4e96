// SPDX-License-Identifier: MIT

//! The binary world frame broadcast to external visualization consumers
//! every 2nd tick (spec.md §6 "Outgoing world frame"). Big-endian,
//! fixed-width records so a consumer can decode it without a schema.

use mp_core::{Entity, EntityKind, Resource};

const HEADER_LEN: usize = 8;
const ENTITY_LEN: usize = 21;
const RESOURCE_LEN: usize = 8;

const PREDATOR_COLOR: u32 = 0xFF0000;
const FLAG_PREDATOR: u8 = 0b01;
const FLAG_INFECTED: u8 = 0b10;

/// Build one frame's bytes from the current tick's live entities and
/// resources. `tick` should be the tick the frame was captured at, not the
/// broadcast cadence counter.
pub fn encode_frame(tick: u32, entities: &[Entity], resources: &[Resource]) -> Vec<u8> {
    let entity_count = entities.len().min(u16::MAX as usize) as u16;
    let resource_count = resources.len().min(u16::MAX as usize) as u16;

    let mut buf = Vec::with_capacity(HEADER_LEN + entity_count as usize * ENTITY_LEN + resource_count as usize * RESOURCE_LEN);
    buf.extend_from_slice(&tick.to_be_bytes());
    buf.extend_from_slice(&entity_count.to_be_bytes());
    buf.extend_from_slice(&resource_count.to_be_bytes());

    for entity in entities.iter().take(entity_count as usize) {
        encode_entity(&mut buf, entity);
    }
    for resource in resources.iter().take(resource_count as usize) {
        encode_resource(&mut buf, resource);
    }
    buf
}

fn encode_entity(buf: &mut Vec<u8>, entity: &Entity) {
    buf.extend_from_slice(&id32(entity.id.as_str()).to_be_bytes());
    buf.extend_from_slice(&(entity.x as f32).to_be_bytes());
    buf.extend_from_slice(&(entity.y as f32).to_be_bytes());
    buf.extend_from_slice(&(entity.radius as f32).to_be_bytes());
    buf.extend_from_slice(&dna_color(entity).to_be_bytes());

    let mut flags = 0u8;
    if entity.kind == EntityKind::Predator {
        flags |= FLAG_PREDATOR;
    }
    if entity.infection.infected {
        flags |= FLAG_INFECTED;
    }
    buf.push(flags);
}

fn encode_resource(buf: &mut Vec<u8>, resource: &Resource) {
    buf.extend_from_slice(&(resource.x as f32).to_be_bytes());
    buf.extend_from_slice(&(resource.y as f32).to_be_bytes());
}

/// Predators render a fixed red; molbots render a color derived from their
/// DNA fingerprint so visually similar lineages look alike on screen.
fn dna_color(entity: &Entity) -> u32 {
    match entity.kind {
        EntityKind::Predator => PREDATOR_COLOR,
        EntityKind::Molbot => (entity.dna_fingerprint as u32) & 0x00FF_FFFF,
    }
}

/// FNV-1a, truncated to the low 32 bits, over the entity's string id.
/// Collisions only cost a consumer a mislabeled frame, never a core
/// invariant, so a non-cryptographic hash is sufficient.
fn id32(id: &str) -> u32 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for byte in id.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    (hash & 0xFFFF_FFFF) as u32
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
