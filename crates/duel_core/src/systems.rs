//! Per-tick entity systems.
//!
//! [`combat_system`] advances every live entity once, in id order:
//! re-validate or acquire a target, evaluate the state machine, then carry
//! out the state's action (close distance, attack, or march along the
//! path). Targeting reads the start-of-tick [`TargetingSnapshot`]; damage
//! is applied through the target's own methods, so a kill takes effect
//! immediately and the victim gets no further action this tick.

use crate::combat::{resolve_attack, DamageReport};
use crate::components::{CombatState, Faction};
use crate::entity::{next_state, EntityId, TargetObservation};
use crate::math::{within_radius, Fixed, Vec2Fixed};
use crate::path::PathProvider;
use crate::roster::Roster;
use crate::targeting::TargetingSnapshot;

/// Everything a system needs for one tick.
pub struct SystemContext<'a> {
    /// Entity storage.
    pub roster: &'a mut Roster,
    /// Positions captured at the start of the combat phase.
    pub snapshot: &'a TargetingSnapshot,
    /// Enemy path geometry.
    pub path: &'a dyn PathProvider,
    /// Simulation time at the start of this tick, in seconds.
    pub now: Fixed,
    /// Tick duration in seconds.
    pub dt: Fixed,
    /// Level-wide splash falloff factor.
    pub area_falloff: Fixed,
}

/// What the combat phase produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatOutput {
    /// Every application of damage, in order.
    pub damage: Vec<DamageReport>,
    /// Enemies that reached the end of the path.
    pub breached: Vec<EntityId>,
}

/// Advance every entity in `ids` by one tick.
pub fn combat_system(ctx: &mut SystemContext<'_>, ids: &[EntityId]) -> CombatOutput {
    let mut output = CombatOutput::default();
    for &id in ids {
        tick_entity(ctx, id, &mut output);
    }
    output
}

fn tick_entity(ctx: &mut SystemContext<'_>, id: EntityId, output: &mut CombatOutput) {
    let Some(entity) = ctx.roster.get(id) else {
        return;
    };
    if !entity.is_targetable() {
        // Dead or breached this tick; released during maintenance.
        return;
    }

    let faction = entity.faction();
    let position = entity.position;
    let stats = *entity.stats();
    let state = entity.state();
    let acquisition = stats.acquisition_radius();
    let hostile = faction.opponent();

    let target = entity
        .target()
        .and_then(|held| validate_target(ctx, held, position, acquisition))
        .or_else(|| {
            ctx.snapshot
                .find_nearest(&*ctx.roster, position, acquisition, hostile)
                .and_then(|found| {
                    ctx.snapshot
                        .position_of(found)
                        .map(|target_position| (found, target_position))
                })
        });

    let observation = match target {
        None => TargetObservation::None,
        Some((_, target_position)) => {
            if within_radius(position, target_position, stats.attack_range) {
                TargetObservation::InRange {
                    cooldown_ready: entity.cooldown_ready(ctx.now),
                }
            } else {
                TargetObservation::OutOfRange
            }
        }
    };
    let next = next_state(state, observation);

    if next != state {
        tracing::trace!(%id, from = ?state, to = ?next, "State transition");
    }
    if let Some(entity) = ctx.roster.get_mut(id) {
        entity.set_target(target.map(|(target_id, _)| target_id));
        entity.set_state(next);
    }

    match (next, target) {
        (CombatState::Seeking, Some((_, target_position))) => {
            seek(ctx, id, target_position, stats.speed, stats.attack_range);
        }
        (
            CombatState::Attacking,
            Some((target_id, target_position)),
        ) if observation == (TargetObservation::InRange { cooldown_ready: true }) => {
            if let Some(entity) = ctx.roster.get_mut(id) {
                entity.face_towards(target_position);
                entity.record_attack(ctx.now);
            }
            let reports = resolve_attack(ctx.roster, ctx.snapshot, id, target_id, ctx.area_falloff);
            for report in &reports {
                tracing::debug!(
                    attacker = %report.attacker,
                    target = %report.target,
                    amount = report.amount,
                    killed = report.killed,
                    splash = report.splash,
                    "Damage dealt"
                );
            }
            output.damage.extend(reports);
        }
        (CombatState::Idle, None) if faction == Faction::Enemy => {
            if march(ctx, id, stats.speed) {
                output.breached.push(id);
            }
        }
        _ => {}
    }
}

// A held target stays valid while it is alive and within acquisition range.
fn validate_target(
    ctx: &SystemContext<'_>,
    held: EntityId,
    position: Vec2Fixed,
    acquisition: Fixed,
) -> Option<(EntityId, Vec2Fixed)> {
    if !ctx.roster.is_targetable(held) {
        return None;
    }
    let target_position = ctx.snapshot.position_of(held)?;
    within_radius(position, target_position, acquisition).then_some((held, target_position))
}

/// Move toward `target`, stopping at attack range.
fn seek(ctx: &mut SystemContext<'_>, id: EntityId, target: Vec2Fixed, speed: Fixed, range: Fixed) {
    let Some(entity) = ctx.roster.get_mut(id) else {
        return;
    };
    entity.face_towards(target);
    let gap = entity.position.distance(target) - range;
    let step = speed.saturating_mul(ctx.dt).min(gap);
    if step > Fixed::ZERO {
        entity.position = entity.position.move_towards(target, step);
    }
}

/// Walk the path. Returns `true` when the entity reached the objective.
fn march(ctx: &mut SystemContext<'_>, id: EntityId, speed: Fixed) -> bool {
    let path = ctx.path;
    let Some(entity) = ctx.roster.get_mut(id) else {
        return false;
    };

    if let Some(waypoint) = path.next_waypoint(entity) {
        if speed > Fixed::ZERO {
            entity.face_towards(waypoint);
            entity.position = entity.position.move_towards(waypoint, speed.saturating_mul(ctx.dt));
        }
        if entity.position == waypoint {
            entity.advance_waypoint();
        }
    }

    if path.has_reached_final_waypoint(entity) {
        tracing::debug!(%id, "Enemy reached the objective");
        entity.mark_objective_reached();
        return true;
    }
    false
}
