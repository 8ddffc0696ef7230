//! Shared pieces of goal-directed behaviours
//!
//! Every movement-heavy behaviour runs the same loop: search for an
//! objective, approach it, act on it, and optionally return. The helpers
//! here implement the cross-cutting parts of that loop so each behaviour
//! only has to describe its own objective.
//!
//! Stall recovery has two tiers. A short stall close to the objective
//! triggers a jump (and optionally clears blocking cells), after which the
//! stuck counter is damped rather than reset. A long stall far from the
//! objective triggers a one-shot relocation to a safe stance next to it.

use crate::actions::ActionEnv;
use crate::core::config::{tuning, BehaviorTuning};
use crate::core::types::{BlockPos, Vec3};
use crate::world::{EntityInfo, MovementMode, WorldAccess};
use tracing::{debug, info};

/// What the stall tracker wants done this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    None,
    /// Short tier: jump and clear obstructions
    Unstick,
    /// Long tier: teleport next to the objective
    Relocate,
}

/// Tracks lack of progress toward an objective
#[derive(Debug, Clone)]
pub struct StallTracker {
    last_dist_sqr: f64,
    stuck_ticks: u32,
    epsilon: f64,
    short_threshold: u32,
    long_threshold: u32,
    damping: u32,
    relocate_distance: f64,
}

impl Default for StallTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StallTracker {
    /// Tracker using the global tuning
    pub fn new() -> Self {
        Self::with_tuning(tuning())
    }

    pub fn with_tuning(tuning: &BehaviorTuning) -> Self {
        Self {
            last_dist_sqr: f64::MAX,
            stuck_ticks: 0,
            epsilon: tuning.stuck_epsilon,
            short_threshold: tuning.short_stuck_threshold,
            long_threshold: tuning.long_stuck_threshold,
            damping: tuning.stuck_damping,
            relocate_distance: tuning.relocate_distance,
        }
    }

    /// Feed this tick's squared distance to the objective
    pub fn observe(&mut self, dist_sqr: f64, grounded: bool) -> Escalation {
        if (dist_sqr - self.last_dist_sqr).abs() < self.epsilon {
            self.stuck_ticks += 1;
        } else {
            self.stuck_ticks = 0;
            self.last_dist_sqr = dist_sqr;
        }

        let near = dist_sqr <= self.relocate_distance * self.relocate_distance;
        if self.stuck_ticks > self.long_threshold && !near {
            self.stuck_ticks = 0;
            return Escalation::Relocate;
        }
        if self.stuck_ticks > self.short_threshold && near && grounded {
            self.stuck_ticks = self.stuck_ticks.saturating_sub(self.damping);
            return Escalation::Unstick;
        }
        Escalation::None
    }

    /// Bump the counter when navigation cannot even start
    pub fn accelerate(&mut self, ticks: u32) {
        self.stuck_ticks += ticks;
    }

    /// Forget the baseline, e.g. when the objective changes
    pub fn reset(&mut self) {
        self.last_dist_sqr = f64::MAX;
        self.stuck_ticks = 0;
    }

    pub fn stuck_ticks(&self) -> u32 {
        self.stuck_ticks
    }

    pub fn is_near(&self, dist_sqr: f64) -> bool {
        dist_sqr <= self.relocate_distance * self.relocate_distance
    }
}

/// Per-behaviour timeout, independent of stall tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickBudget(u64);

impl TickBudget {
    pub const fn new(limit: u64) -> Self {
        Self(limit)
    }

    pub fn exceeded(&self, ticks_run: u64) -> bool {
        ticks_run > self.0
    }

    pub fn limit(&self) -> u64 {
        self.0
    }
}

/// Re-issue navigation on a fixed cadence or whenever it went idle
#[derive(Debug, Clone)]
pub struct RepathTimer {
    interval: u32,
    since: u32,
}

impl Default for RepathTimer {
    fn default() -> Self {
        Self::new(tuning().repath_interval)
    }
}

impl RepathTimer {
    /// The first call to [`RepathTimer::due`] always fires
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            since: interval.max(1),
        }
    }

    pub fn due(&mut self, navigation_done: bool) -> bool {
        self.since += 1;
        if navigation_done || self.since >= self.interval {
            self.since = 0;
            true
        } else {
            false
        }
    }

    /// Make the next check fire
    pub fn force(&mut self) {
        self.since = self.interval;
    }
}

/// Notify every `every` units of work
#[derive(Debug, Clone, Copy)]
pub struct ProgressCadence {
    every: u32,
}

impl ProgressCadence {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
        }
    }

    pub fn due(&self, done: u32) -> bool {
        done > 0 && done % self.every == 0
    }
}

fn is_clear(world: &dyn WorldAccess, pos: BlockPos) -> bool {
    !world.is_solid(pos) && !world.is_water_source(pos) && world.block_at(pos) != "lava"
}

/// Solid footing with two clear cells for the body
pub fn is_safe_stance(world: &dyn WorldAccess, feet: BlockPos) -> bool {
    world.is_solid(feet.below()) && is_clear(world, feet) && is_clear(world, feet.above())
}

/// A safe stance at or next to `target`
///
/// Checks the target cell, then its 3×3 neighbourhood from one below to
/// two above. Falls back to the column's surface height.
pub fn find_safe_position(world: &dyn WorldAccess, target: BlockPos) -> Vec3 {
    if is_safe_stance(world, target) {
        return target.bottom_center();
    }
    for dy in -1..=2 {
        for dx in -1..=1 {
            for dz in -1..=1 {
                let candidate = target.offset(dx, dy, dz);
                if is_safe_stance(world, candidate) {
                    return candidate.bottom_center();
                }
            }
        }
    }
    let y = world.surface_height(target.x, target.z);
    BlockPos::new(target.x, y, target.z).bottom_center()
}

/// Long-tier recovery: teleport next to the objective
pub fn relocate_near(env: &mut ActionEnv<'_>, objective: Vec3) -> Vec3 {
    let destination = find_safe_position(&*env.world, objective.block_pos());
    env.world.stop_navigation(env.agent.id);
    env.world.teleport(env.agent.id, destination);
    info!(
        "{} was stuck far from its objective, relocated to {:.1}, {:.1}, {:.1}",
        env.agent.name, destination.x, destination.y, destination.z
    );
    destination
}

/// Break breakable blocks in the 3×3 rings at feet and head level
///
/// The feet cell itself is left alone, and so is anything `keep` accepts.
pub fn clear_surroundings(env: &mut ActionEnv<'_>, keep: &dyn Fn(&str) -> bool) {
    let Some(pos) = env.position() else {
        return;
    };
    let feet = pos.block_pos();
    for dy in 0..=1 {
        for dx in -1..=1 {
            for dz in -1..=1 {
                let cell = feet.offset(dx, dy, dz);
                if cell == feet || env.world.is_air(cell) || env.world.is_unbreakable(cell) {
                    continue;
                }
                if keep(&env.world.block_at(cell)) {
                    continue;
                }
                if let Some(block) = env.world.destroy_block(cell) {
                    debug!("{} cleared {} at {}", env.agent.name, block, cell);
                }
            }
        }
    }
}

/// Short-tier recovery: optionally dig out, then jump
pub fn unstick(env: &mut ActionEnv<'_>, clear_obstructions: bool) {
    if clear_obstructions {
        clear_surroundings(env, &|_| false);
    }
    if env.grounded() {
        env.world.jump(env.agent.id);
    }
}

/// Walk somewhere random nearby; false when no spot was found
pub fn wander_step(env: &mut ActionEnv<'_>, horizontal: i32, vertical: i32) -> bool {
    let Some(pos) = env.position() else {
        return false;
    };
    match env.world.random_position_near(pos, horizontal, vertical) {
        Some(spot) => env.world.navigate_to(env.agent.id, spot, 1.0),
        None => false,
    }
}

/// Closest living player within `max_distance`
pub fn nearest_player(world: &dyn WorldAccess, from: Vec3, max_distance: f64) -> Option<EntityInfo> {
    world
        .players()
        .into_iter()
        .filter(|p| p.position.distance_sqr(&from) <= max_distance * max_distance)
        .min_by(|a, b| {
            a.position
                .distance_sqr(&from)
                .total_cmp(&b.position.distance_sqr(&from))
        })
}

/// Return the body to normal walking and drop any navigation
pub fn halt(env: &mut ActionEnv<'_>) {
    env.world.stop_navigation(env.agent.id);
    env.world.set_movement(env.agent.id, MovementMode::Walking);
}

/// Standard approach step shared by most behaviours
///
/// Runs stall tracking against `objective` and re-issues navigation when
/// the timer is due. Returns the squared distance observed.
pub fn approach(
    env: &mut ActionEnv<'_>,
    objective: Vec3,
    stall: &mut StallTracker,
    repath: &mut RepathTimer,
    clear_obstructions: bool,
) -> Option<f64> {
    let pos = env.position()?;
    let dist_sqr = pos.distance_sqr(&objective);
    match stall.observe(dist_sqr, env.grounded()) {
        Escalation::Unstick => unstick(env, clear_obstructions),
        Escalation::Relocate => {
            relocate_near(env, objective);
            repath.force();
        }
        Escalation::None => {}
    }
    let id = env.agent.id;
    if repath.due(env.world.navigation_done(id))
        && !env.world.navigate_to(id, objective, 1.0)
        && stall.is_near(dist_sqr)
    {
        stall.accelerate(5);
    }
    Some(dist_sqr)
}
