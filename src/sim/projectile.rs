//! Projectiles and their special behaviors

use glam::Vec2;

use super::pool::Poolable;
use super::state::TargetRef;
use crate::consts::GEOMETRY_EPSILON;
use crate::normalize_angle;

/// Who fired a projectile; decides which targets it can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Player,
    Enemy,
    Boss,
}

impl Faction {
    /// Projectiles from this faction collide with the player
    #[inline]
    pub fn is_hostile(&self) -> bool {
        matches!(self, Faction::Enemy | Faction::Boss)
    }
}

/// Steering parameters for homing projectiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homing {
    /// Max heading change in radians per second
    pub turn_rate: f32,
    pub max_speed: f32,
    /// Point currently steered toward (refreshed each frame)
    pub target: Option<Vec2>,
}

impl Homing {
    pub fn new(turn_rate: f32, max_speed: f32) -> Self {
        Self {
            turn_rate,
            max_speed,
            target: None,
        }
    }
}

/// Explosion payload detonated on impact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blast {
    pub radius: f32,
    pub damage: f32,
    pub knockback: f32,
    pub particles: u32,
}

/// Closed set of special behaviors
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Behavior {
    #[default]
    Standard,
    Homing(Homing),
    /// Homing with an explosive warhead
    Missile { homing: Homing, blast: Blast },
    Explosive(Blast),
    /// Penetrating line weapon; collides along `length` ahead of the position
    Beam { length: f32 },
    /// Penetrating round
    Piercing,
}

impl Behavior {
    pub fn homing(&self) -> Option<&Homing> {
        match self {
            Behavior::Homing(h) | Behavior::Missile { homing: h, .. } => Some(h),
            _ => None,
        }
    }

    pub fn homing_mut(&mut self) -> Option<&mut Homing> {
        match self {
            Behavior::Homing(h) | Behavior::Missile { homing: h, .. } => Some(h),
            _ => None,
        }
    }

    pub fn blast(&self) -> Option<Blast> {
        match self {
            Behavior::Explosive(b) | Behavior::Missile { blast: b, .. } => Some(*b),
            _ => None,
        }
    }

    /// Survives hits and may strike several targets
    pub fn penetrates(&self) -> bool {
        matches!(self, Behavior::Beam { .. } | Behavior::Piercing)
    }
}

/// Spawn parameters for a projectile
#[derive(Debug, Clone, Copy)]
pub struct ProjectileSpawn {
    pub pos: Vec2,
    pub vel: Vec2,
    pub faction: Faction,
    pub radius: f32,
    pub damage: f32,
    pub damage_mult: f32,
    pub behavior: Behavior,
    /// Seconds before automatic release
    pub ttl: f32,
}

impl ProjectileSpawn {
    pub fn new(pos: Vec2, vel: Vec2, faction: Faction, radius: f32, damage: f32) -> Self {
        Self {
            pos,
            vel,
            faction,
            radius,
            damage,
            damage_mult: 1.0,
            behavior: Behavior::Standard,
            ttl: 8.0,
        }
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_ttl(mut self, ttl: f32) -> Self {
        self.ttl = ttl;
        self
    }
}

/// A pooled projectile
#[derive(Debug, Clone)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub faction: Faction,
    pub radius: f32,
    pub damage: f32,
    pub damage_mult: f32,
    pub behavior: Behavior,
    pub ttl: f32,
    pub marked: bool,
    /// Already counted as a graze against the player
    pub grazed: bool,
    /// Targets struck so far (penetrating projectiles hit each at most once)
    hits: Vec<TargetRef>,
}

impl Poolable for Projectile {
    type Init = ProjectileSpawn;

    fn create(init: ProjectileSpawn) -> Self {
        Self {
            pos: init.pos,
            vel: init.vel,
            faction: init.faction,
            radius: init.radius,
            damage: init.damage,
            damage_mult: init.damage_mult,
            behavior: init.behavior,
            ttl: init.ttl,
            marked: false,
            grazed: false,
            hits: Vec::new(),
        }
    }

    fn reinit(&mut self, init: ProjectileSpawn) {
        let mut hits = std::mem::take(&mut self.hits);
        hits.clear();
        *self = Self {
            hits,
            ..Self::create(init)
        };
    }
}

impl Projectile {
    /// Damage delivered per hit
    #[inline]
    pub fn effective_damage(&self) -> f32 {
        self.damage * self.damage_mult
    }

    /// Collision segment for beams; `None` for circular projectiles
    pub fn beam_segment(&self) -> Option<(Vec2, Vec2)> {
        match self.behavior {
            Behavior::Beam { length } => {
                Some((self.pos, self.pos + self.vel.normalize_or_zero() * length))
            }
            _ => None,
        }
    }

    pub fn has_hit(&self, target: TargetRef) -> bool {
        self.hits.contains(&target)
    }

    pub fn record_hit(&mut self, target: TargetRef) {
        if !self.hits.contains(&target) {
            self.hits.push(target);
        }
    }

    /// Apply homing steering, then integrate position
    pub fn integrate(&mut self, dt: f32) {
        if let Some(homing) = self.behavior.homing().copied() {
            self.vel = steer_toward(self.pos, self.vel, homing, dt);
        }
        self.pos += self.vel * dt;
        self.ttl -= dt;
    }
}

/// Rotate `vel` toward the homing target by at most `turn_rate * dt`
///
/// Colocated targets and a stalled velocity leave the heading unchanged, so
/// no NaN can reach the position.
pub fn steer_toward(pos: Vec2, vel: Vec2, homing: Homing, dt: f32) -> Vec2 {
    let Some(target) = homing.target else {
        return vel;
    };
    let to_target = target - pos;
    let speed = vel.length();
    if to_target.length_squared() < GEOMETRY_EPSILON * GEOMETRY_EPSILON || speed < GEOMETRY_EPSILON
    {
        return vel;
    }

    let current = vel.y.atan2(vel.x);
    let desired = to_target.y.atan2(to_target.x);
    let delta = normalize_angle(desired - current);
    let max_turn = homing.turn_rate.max(0.0) * dt;
    let heading = current + delta.clamp(-max_turn, max_turn);

    let speed = speed.min(homing.max_speed.max(0.0));
    Vec2::new(heading.cos(), heading.sin()) * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pool::Pool;

    fn homing_to(target: Vec2) -> Homing {
        Homing {
            turn_rate: 1.0,
            max_speed: 100.0,
            target: Some(target),
        }
    }

    #[test]
    fn test_steer_turn_is_rate_limited() {
        // Moving right, target straight up: needs ~90 degrees of turn
        let vel = steer_toward(Vec2::ZERO, Vec2::new(50.0, 0.0), homing_to(Vec2::new(0.0, -100.0)), 0.1);
        let angle = vel.y.atan2(vel.x);
        assert!((angle - (-0.1)).abs() < 1e-4);
        assert!((vel.length() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_steer_caps_speed() {
        let vel = steer_toward(Vec2::ZERO, Vec2::new(500.0, 0.0), homing_to(Vec2::new(100.0, 0.0)), 0.1);
        assert!((vel.length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_steer_colocated_target_is_noop() {
        let vel = Vec2::new(10.0, 5.0);
        let out = steer_toward(Vec2::new(3.0, 3.0), vel, homing_to(Vec2::new(3.0, 3.0)), 0.1);
        assert_eq!(out, vel);
        assert!(out.is_finite());
    }

    #[test]
    fn test_steer_stalled_projectile_is_noop() {
        let out = steer_toward(Vec2::ZERO, Vec2::ZERO, homing_to(Vec2::new(10.0, 0.0)), 0.1);
        assert_eq!(out, Vec2::ZERO);
    }

    #[test]
    fn test_behavior_classification() {
        let blast = Blast {
            radius: 30.0,
            damage: 10.0,
            knockback: 5.0,
            particles: 8,
        };
        let missile = Behavior::Missile {
            homing: Homing::new(2.0, 200.0),
            blast,
        };
        assert!(missile.homing().is_some());
        assert_eq!(missile.blast(), Some(blast));
        assert!(!missile.penetrates());
        assert!(Behavior::Beam { length: 40.0 }.penetrates());
        assert!(Behavior::Piercing.penetrates());
        assert!(Behavior::Standard.homing().is_none());
    }

    #[test]
    fn test_reused_projectile_forgets_hits() {
        let mut pool: Pool<Projectile> = Pool::new();
        let spawn = ProjectileSpawn::new(Vec2::ZERO, Vec2::Y, Faction::Player, 2.0, 1.0)
            .with_behavior(Behavior::Piercing);
        let h = pool.acquire(spawn);
        {
            let p = pool.get_mut(h).unwrap();
            p.record_hit(TargetRef::Boss);
            p.marked = true;
            p.grazed = true;
        }
        pool.release(h);

        let h = pool.acquire(ProjectileSpawn::new(Vec2::ONE, Vec2::X, Faction::Enemy, 3.0, 2.0));
        let p = pool.get(h).unwrap();
        assert!(!p.has_hit(TargetRef::Boss));
        assert!(!p.marked);
        assert!(!p.grazed);
        assert_eq!(p.behavior, Behavior::Standard);
        assert_eq!(p.faction, Faction::Enemy);
    }

    #[test]
    fn test_beam_segment_degenerate_when_stalled() {
        let p = Projectile::create(
            ProjectileSpawn::new(Vec2::new(5.0, 5.0), Vec2::ZERO, Faction::Player, 2.0, 1.0)
                .with_behavior(Behavior::Beam { length: 50.0 }),
        );
        let (a, b) = p.beam_segment().unwrap();
        assert_eq!(a, b);
    }
}
