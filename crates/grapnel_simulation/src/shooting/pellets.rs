//! Shotgun: N pellets → aggregation per target → один batched apply
//!
//! `fire_pellets` - чистая функция (queries + RNG инжектятся), ничего не
//! применяет. `apply_batched` делает ровно один damage/knockback вызов и
//! одно damage number на задетую цель.

use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::layers;
use crate::physics::{safe_direction, PhysicsQueries, ShapeFilter};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct ShotgunConfig {
    pub pellet_count: u32,
    /// Половина угла конуса, градусы
    pub half_spread_degrees: f32,
    pub max_range: f32,
    pub base_damage: f32,
    pub falloff_start: f32,
    pub falloff_end: f32,
    /// Множитель урона на `falloff_end` и дальше
    pub min_damage_percent: f32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub knockback_per_pellet: f32,
    pub max_knockback: f32,
    /// Смещение точки выстрела вперёд (не задеть себя)
    pub muzzle_forward_bias: f32,
    pub eye_height: f32,
    pub fire_interval: f32,
    pub hit_mask: u32,
}

impl Default for ShotgunConfig {
    fn default() -> Self {
        Self {
            pellet_count: 8,
            half_spread_degrees: 6.0,
            max_range: 40.0,
            base_damage: 9.0,
            falloff_start: 8.0,
            falloff_end: 25.0,
            min_damage_percent: 0.35,
            crit_chance: 0.1,
            crit_multiplier: 1.75,
            knockback_per_pellet: 1.2,
            max_knockback: 9.0,
            muzzle_forward_bias: 0.6,
            eye_height: 0.6,
            fire_interval: 0.8,
            hit_mask: layers::SHOT_BLOCKERS,
        }
    }
}

impl ShotgunConfig {
    /// Forgiving tuning: inverted falloff меняется местами, проценты в [0, 1]
    pub fn normalized(mut self) -> Self {
        if self.falloff_start > self.falloff_end {
            std::mem::swap(&mut self.falloff_start, &mut self.falloff_end);
        }
        self.falloff_start = self.falloff_start.max(0.0);
        self.falloff_end = self.falloff_end.max(0.0);
        self.min_damage_percent = self.min_damage_percent.clamp(0.0, 1.0);
        self.crit_chance = self.crit_chance.clamp(0.0, 1.0);
        self.crit_multiplier = self.crit_multiplier.max(0.0);
        self.half_spread_degrees = self.half_spread_degrees.clamp(0.0, 89.0);
        self.max_range = self.max_range.max(0.0);
        self.base_damage = self.base_damage.max(0.0);
        self.knockback_per_pellet = self.knockback_per_pellet.max(0.0);
        self.max_knockback = self.max_knockback.max(0.0);
        self.fire_interval = self.fire_interval.max(0.0);
        self
    }

    /// 1.0 до `falloff_start`, линейно до `min_damage_percent` на `falloff_end`
    pub fn falloff(&self, distance: f32) -> f32 {
        if distance <= self.falloff_start {
            return 1.0;
        }
        if distance >= self.falloff_end {
            return self.min_damage_percent;
        }

        let t = (distance - self.falloff_start) / (self.falloff_end - self.falloff_start);
        1.0 + (self.min_damage_percent - 1.0) * t
    }
}

/// Shotgun weapon state
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Shotgun {
    pub config: ShotgunConfig,
    pub cooldown_remaining: f32,
}

impl Shotgun {
    pub fn new(config: ShotgunConfig) -> Self {
        Self {
            config: config.normalized(),
            cooldown_remaining: 0.0,
        }
    }

    pub fn tick_cooldown(&mut self, dt: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
    }

    pub fn can_fire(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    pub fn start_cooldown(&mut self) {
        self.cooldown_remaining = self.config.fire_interval;
    }
}

/// Damageable цель, в которую попал коллайдер
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTarget {
    pub target: Entity,
    /// Hitbox multiplier (1.0 без hitbox)
    pub multiplier: f32,
    pub always_crit: bool,
}

/// One pellet ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PelletTrace {
    pub from: Vec3,
    pub to: Vec3,
    pub direction: Vec3,
    /// Урон пеллета, если он попал в damageable цель
    pub damage: Option<f32>,
    pub crit: bool,
}

/// Aggregated hits on one target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetHits {
    pub target: Entity,
    pub total_damage: f32,
    pub pellets: u32,
    pub crit: bool,
    position_sum: Vec3,
    normal_sum: Vec3,
    knockback_sum: Vec3,
}

impl TargetHits {
    fn new(target: Entity) -> Self {
        Self {
            target,
            total_damage: 0.0,
            pellets: 0,
            crit: false,
            position_sum: Vec3::ZERO,
            normal_sum: Vec3::ZERO,
            knockback_sum: Vec3::ZERO,
        }
    }

    fn add(&mut self, damage: f32, crit: bool, point: Vec3, normal: Vec3, knockback: Vec3) {
        self.total_damage += damage;
        self.pellets += 1;
        self.crit |= crit;
        self.position_sum += point;
        self.normal_sum += normal;
        self.knockback_sum += knockback;
    }

    pub fn average_position(&self) -> Vec3 {
        self.position_sum / self.pellets.max(1) as f32
    }

    pub fn average_normal(&self) -> Vec3 {
        self.normal_sum.normalize_or_zero()
    }

    /// Суммарный импульс, ограниченный по длине
    pub fn knockback(&self, max_knockback: f32) -> Vec3 {
        self.knockback_sum.clamp_length_max(max_knockback)
    }
}

/// Hit on geometry without Damageable (decal)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceImpact {
    pub surface: Entity,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Everything one trigger pull produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotReport {
    pub shooter: Option<Entity>,
    pub max_knockback: f32,
    pub pellets: Vec<PelletTrace>,
    /// Порядок = порядок первого попадания (детерминированно)
    pub targets: Vec<TargetHits>,
    pub surfaces: Vec<SurfaceImpact>,
}

impl ShotReport {
    pub fn target(&self, entity: Entity) -> Option<&TargetHits> {
        self.targets.iter().find(|hits| hits.target == entity)
    }

    fn record(&mut self, target: Entity) -> &mut TargetHits {
        let index = match self.targets.iter().position(|hits| hits.target == target) {
            Some(index) => index,
            None => {
                self.targets.push(TargetHits::new(target));
                self.targets.len() - 1
            }
        };
        &mut self.targets[index]
    }
}

/// Где выстрел начинается и куда смотрит
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Muzzle {
    pub shooter: Entity,
    pub origin: Vec3,
    pub rotation: Quat,
}

/// Fire every pellet and aggregate hits per damageable target.
///
/// `resolve` превращает задетый коллайдер в damageable цель (hitbox → owner).
pub fn fire_pellets(
    config: &ShotgunConfig,
    queries: &dyn PhysicsQueries,
    muzzle: Muzzle,
    rng: &mut impl Rng,
    resolve: impl Fn(Entity) -> Option<HitTarget>,
) -> ShotReport {
    let forward = muzzle.rotation * Vec3::NEG_Z;
    let right = muzzle.rotation * Vec3::X;
    let up = muzzle.rotation * Vec3::Y;
    let start = muzzle.origin + forward * config.muzzle_forward_bias;
    let spread = config.half_spread_degrees.to_radians().tan();
    let filter = ShapeFilter::mask(config.hit_mask).excluding(muzzle.shooter);

    let mut report = ShotReport {
        shooter: Some(muzzle.shooter),
        max_knockback: config.max_knockback,
        ..default()
    };

    for _ in 0..config.pellet_count {
        // Uniform disk sample × tan(half spread)
        let radius = rng.gen::<f32>().sqrt() * spread;
        let angle = rng.gen::<f32>() * TAU;
        let offset = (right * angle.cos() + up * angle.sin()) * radius;
        let direction = safe_direction(forward + offset).map_or(forward, |(direction, _)| direction);

        let Some(hit) = queries.ray_cast(start, direction, config.max_range, &filter) else {
            report.pellets.push(PelletTrace {
                from: start,
                to: start + direction * config.max_range,
                direction,
                damage: None,
                crit: false,
            });
            continue;
        };

        let Some(target) = resolve(hit.entity) else {
            report.surfaces.push(SurfaceImpact {
                surface: hit.entity,
                point: hit.point,
                normal: hit.normal,
            });
            report.pellets.push(PelletTrace {
                from: start,
                to: hit.point,
                direction,
                damage: None,
                crit: false,
            });
            continue;
        };

        // Roll всегда, чтобы поток RNG не зависел от hitbox
        let rolled = rng.gen::<f32>() < config.crit_chance;
        let crit = target.always_crit || rolled;
        let crit_scale = if crit { config.crit_multiplier } else { 1.0 };
        // Falloff от muzzle, не от смещённого старта луча
        let distance = hit.point.distance(muzzle.origin);
        let damage = config.base_damage * config.falloff(distance) * target.multiplier * crit_scale;

        report.record(target.target).add(
            damage,
            crit,
            hit.point,
            hit.normal,
            direction * config.knockback_per_pellet,
        );
        report.pellets.push(PelletTrace {
            from: start,
            to: hit.point,
            direction,
            damage: Some(damage),
            crit,
        });
    }

    report
}

/// Sink for the batched per-target results
pub trait HitReceiver {
    fn apply_damage(&mut self, target: Entity, amount: f32, source: Option<Entity>);

    fn apply_knockback(&mut self, target: Entity, impulse: Vec3, source: Option<Entity>);

    fn damage_number(&mut self, target: Entity, position: Vec3, amount: f32, crit: bool);
}

/// Один damage + один knockback + одно число на цель
pub fn apply_batched(report: &ShotReport, receiver: &mut impl HitReceiver) {
    for hits in &report.targets {
        receiver.apply_damage(hits.target, hits.total_damage, report.shooter);

        let impulse = hits.knockback(report.max_knockback);
        receiver.apply_knockback(hits.target, impulse, report.shooter);

        receiver.damage_number(hits.target, hits.average_position(), hits.total_damage, hits.crit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ColliderShape;
    use crate::physics::{CollisionScene, SceneCollider};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn shooter() -> Entity {
        Entity::from_raw(1)
    }

    fn enemy() -> Entity {
        Entity::from_raw(2)
    }

    fn muzzle() -> Muzzle {
        Muzzle {
            shooter: shooter(),
            origin: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    fn enemy_at(distance: f32, radius: f32) -> SceneCollider {
        SceneCollider::new(
            enemy(),
            ColliderShape::Sphere { radius },
            Vec3::new(0.0, 0.0, -distance),
            layers::ENEMY,
        )
    }

    fn plain_enemy(entity: Entity) -> Option<HitTarget> {
        (entity == enemy()).then_some(HitTarget {
            target: entity,
            multiplier: 1.0,
            always_crit: false,
        })
    }

    #[derive(Default)]
    struct Recorder {
        damage: Vec<(Entity, f32)>,
        knockback: Vec<(Entity, Vec3)>,
        numbers: Vec<(Entity, Vec3, f32)>,
    }

    impl HitReceiver for Recorder {
        fn apply_damage(&mut self, target: Entity, amount: f32, _source: Option<Entity>) {
            self.damage.push((target, amount));
        }

        fn apply_knockback(&mut self, target: Entity, impulse: Vec3, _source: Option<Entity>) {
            self.knockback.push((target, impulse));
        }

        fn damage_number(&mut self, target: Entity, position: Vec3, amount: f32, _crit: bool) {
            self.numbers.push((target, position, amount));
        }
    }

    #[test]
    fn test_falloff_curve() {
        let config = ShotgunConfig::default();

        assert_eq!(config.falloff(0.0), 1.0);
        assert_eq!(config.falloff(config.falloff_start), 1.0);
        assert_eq!(config.falloff(config.falloff_end), config.min_damage_percent);
        assert_eq!(config.falloff(100.0), config.min_damage_percent);

        let mut previous = config.falloff(config.falloff_start);
        let mut distance = config.falloff_start + 0.5;
        while distance < config.falloff_end {
            let current = config.falloff(distance);
            assert!(current < previous, "falloff must strictly decrease at {}", distance);
            previous = current;
            distance += 0.5;
        }
    }

    #[test]
    fn test_normalized_swaps_inverted_falloff() {
        let config = ShotgunConfig {
            falloff_start: 30.0,
            falloff_end: 10.0,
            min_damage_percent: 1.5,
            crit_chance: -1.0,
            ..default()
        }
        .normalized();

        assert_eq!(config.falloff_start, 10.0);
        assert_eq!(config.falloff_end, 30.0);
        assert_eq!(config.min_damage_percent, 1.0);
        assert_eq!(config.crit_chance, 0.0);
    }

    #[test]
    fn test_all_pellets_on_one_target_batch_into_single_calls() {
        let scene = CollisionScene::default().with(enemy_at(5.0, 2.0));
        let config = ShotgunConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let report = fire_pellets(&config, &scene, muzzle(), &mut rng, plain_enemy);

        let per_pellet: Vec<f32> = report.pellets.iter().filter_map(|pellet| pellet.damage).collect();
        assert_eq!(per_pellet.len(), config.pellet_count as usize, "every pellet hits");
        assert_eq!(report.targets.len(), 1);

        let mut recorder = Recorder::default();
        apply_batched(&report, &mut recorder);

        assert_eq!(recorder.damage.len(), 1, "exactly one damage call");
        assert_eq!(recorder.knockback.len(), 1, "exactly one knockback call");
        assert_eq!(recorder.numbers.len(), 1, "exactly one damage number");

        let expected: f32 = per_pellet.iter().sum();
        assert!((recorder.damage[0].1 - expected).abs() < 1e-3);
        assert_eq!(recorder.damage[0].0, enemy());
    }

    #[test]
    fn test_knockback_sum_is_clamped() {
        let scene = CollisionScene::default().with(enemy_at(5.0, 2.0));
        let config = ShotgunConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let report = fire_pellets(&config, &scene, muzzle(), &mut rng, plain_enemy);
        let mut recorder = Recorder::default();
        apply_batched(&report, &mut recorder);

        // 8 × 1.2 = 9.6 (почти параллельные пеллеты) > cap 9
        let impulse = recorder.knockback[0].1;
        assert!(impulse.length() <= config.max_knockback + 1e-4);
        assert!(impulse.length() > config.max_knockback - 0.1);
        assert!(impulse.z < 0.0, "pushed along the shot");
    }

    #[test]
    fn test_always_crit_applies_multiplier_once() {
        let scene = CollisionScene::default().with(enemy_at(5.0, 2.0));
        let config = ShotgunConfig {
            pellet_count: 1,
            crit_chance: 1.0,
            ..default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let report = fire_pellets(&config, &scene, muzzle(), &mut rng, |entity| {
            (entity == enemy()).then_some(HitTarget {
                target: entity,
                multiplier: 2.0,
                always_crit: true,
            })
        });

        let pellet = report.pellets[0];
        assert!(pellet.crit);
        let expected = config.base_damage * 2.0 * config.crit_multiplier;
        assert_eq!(pellet.damage, Some(expected), "crit multiplier applied once");
    }

    #[test]
    fn test_surface_hits_become_impacts() {
        let wall = Entity::from_raw(9);
        let scene = CollisionScene::default().with(SceneCollider::new(
            wall,
            ColliderShape::Cuboid {
                half_extents: Vec3::new(10.0, 10.0, 0.5),
            },
            Vec3::new(0.0, 0.0, -6.0),
            layers::GROUND,
        ));
        let config = ShotgunConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let report = fire_pellets(&config, &scene, muzzle(), &mut rng, plain_enemy);

        assert!(report.targets.is_empty());
        assert_eq!(report.surfaces.len(), config.pellet_count as usize);
        assert!(report.surfaces.iter().all(|impact| impact.surface == wall));
    }

    #[test]
    fn test_pellets_stay_inside_cone() {
        let scene = CollisionScene::default();
        let config = ShotgunConfig {
            pellet_count: 64,
            ..default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let report = fire_pellets(&config, &scene, muzzle(), &mut rng, plain_enemy);

        let limit = config.half_spread_degrees.to_radians().cos();
        for pellet in &report.pellets {
            assert!(
                pellet.direction.dot(Vec3::NEG_Z) >= limit - 1e-5,
                "pellet outside cone: {:?}",
                pellet.direction
            );
            assert!(pellet.damage.is_none());
        }
    }

    #[test]
    fn test_same_seed_same_report() {
        let scene = CollisionScene::default().with(enemy_at(12.0, 1.0));
        let config = ShotgunConfig::default();

        let first = fire_pellets(&config, &scene, muzzle(), &mut ChaCha8Rng::seed_from_u64(1), plain_enemy);
        let second = fire_pellets(&config, &scene, muzzle(), &mut ChaCha8Rng::seed_from_u64(1), plain_enemy);

        assert_eq!(first, second);
    }

    #[test]
    fn test_falloff_measured_from_muzzle() {
        // Поверхность ровно на falloff_end от muzzle
        let config = ShotgunConfig {
            pellet_count: 1,
            half_spread_degrees: 0.0,
            crit_chance: 0.0,
            ..default()
        };
        let scene = CollisionScene::default().with(enemy_at(config.falloff_end + 0.5, 0.5));
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let report = fire_pellets(&config, &scene, muzzle(), &mut rng, plain_enemy);

        let damage = report.pellets[0].damage.expect("pellet hits");
        let expected = config.base_damage * config.min_damage_percent;
        assert!(
            (damage - expected).abs() < 1e-4,
            "forward bias must not delay falloff: {} vs {}",
            damage,
            expected
        );
    }
}
