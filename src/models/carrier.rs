use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    collision::{BodyId, OwnerId, SphereBody},
    common::{math_utils, Pose},
    launcher::LauncherConfig,
    missile::Missile,
    selector::{GroupConfig, LauncherSelector},
    target::TargetRef,
    traits::{FlightContext, Launcher, TargetSource},
};

/// 自動射撃の待ち時間設定
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoFireConfig {
    #[serde(default = "default_min_wait")]
    pub min_wait_s: f64,
    #[serde(default = "default_max_wait")]
    pub max_wait_s: f64,
}

fn default_min_wait() -> f64 {
    2.0
}

fn default_max_wait() -> f64 {
    10.0
}

/// 母機設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierConfig {
    pub id: String,
    pub position_m: DVec3,
    /// 姿勢（度, `[pitch, yaw, roll]`）
    #[serde(default)]
    pub euler_deg: [f64; 3],
    #[serde(default)]
    pub speed_mps: f64,
    #[serde(default)]
    pub turn_rate_deg_s: f64,
    #[serde(default = "default_carrier_radius")]
    pub radius_m: f64,
    /// 追尾・射撃対象のターゲットID
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub launchers: Vec<LauncherConfig>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub auto_fire: Option<AutoFireConfig>,
}

fn default_carrier_radius() -> f64 {
    5.0
}

/// 発射母機（ドローン）
///
/// 一定速度で前進し、ターゲットへ旋回レート制限付きで向きを変えます。
/// ランチャー群とセレクターを持ち、自動射撃が設定されていれば
/// ランダムな待ち時間ごとに選択中のグループを発射します。
#[derive(Debug)]
pub struct Carrier {
    id: String,
    owner: OwnerId,
    body: BodyId,
    pose: Pose,
    speed: f64,
    turn_rate_deg_s: f64,
    radius: f64,
    target: Option<TargetRef>,
    launchers: Vec<Box<dyn Launcher>>,
    selector: LauncherSelector,
    auto_fire: Option<AutoFireConfig>,
    next_fire_time: f64,
    rng: ChaCha8Rng,
}

impl Carrier {
    /// 母機を作成
    ///
    /// # 引数
    ///
    /// * `config` - 母機設定
    /// * `body` - 母機の衝突ボディID
    /// * `target` - 解決済みのターゲット（弱参照）
    /// * `launchers` - 構築済みのランチャー（`config.launchers`と同順）
    /// * `seed` - 自動射撃の待ち時間用乱数シード
    pub fn new(
        config: &CarrierConfig,
        body: BodyId,
        target: Option<TargetRef>,
        launchers: Vec<Box<dyn Launcher>>,
        seed: u64,
    ) -> Self {
        let selector = LauncherSelector::from_config(&config.groups, &launchers);
        let mut carrier = Self {
            id: config.id.clone(),
            owner: OwnerId(config.id.clone()),
            body,
            pose: Pose::from_euler_deg(config.position_m, config.euler_deg),
            speed: config.speed_mps,
            turn_rate_deg_s: config.turn_rate_deg_s,
            radius: config.radius_m,
            target,
            launchers,
            selector,
            auto_fire: config.auto_fire,
            next_fire_time: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        if let Some(auto_fire) = carrier.auto_fire {
            carrier.next_fire_time = carrier.draw_wait(&auto_fire);
        }
        carrier
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// 発射時にミサイルへ継承させる速度
    pub fn velocity(&self) -> DVec3 {
        self.pose.forward() * self.speed
    }

    pub fn target(&self) -> Option<TargetRef> {
        self.target
    }

    pub fn next_fire_time(&self) -> f64 {
        self.next_fire_time
    }

    pub fn launchers(&self) -> &[Box<dyn Launcher>] {
        &self.launchers
    }

    pub fn selector(&self) -> &LauncherSelector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut LauncherSelector {
        &mut self.selector
    }

    /// 衝突判定用の球ボディ
    pub fn sphere(&self) -> SphereBody {
        SphereBody {
            id: self.body,
            position: self.pose.position,
            radius: self.radius,
        }
    }

    /// 1ティック分の移動とランチャーの再装填
    pub fn update(&mut self, targets: &dyn TargetSource, dt: f64) {
        if let Some(target_position) = self.target.and_then(|t| targets.target_position(t)) {
            let desired =
                math_utils::look_rotation(target_position - self.pose.position, self.pose.up());
            let max_step = self.turn_rate_deg_s.to_radians() * dt;
            self.pose.rotation = math_utils::rotate_towards(self.pose.rotation, desired, max_step);
        }
        self.pose.position += self.pose.forward() * self.speed * dt;

        for launcher in self.launchers.iter_mut() {
            launcher.set_mount_pose(self.pose);
            launcher.tick(dt);
        }
    }

    /// 選択中のグループからターゲットへ1発発射
    pub fn fire_selected(&mut self, ctx: &mut FlightContext<'_>) -> Option<Missile> {
        let velocity = self.velocity();
        self.selector
            .fire(&mut self.launchers, self.target, velocity, ctx)
    }

    /// 自動射撃
    ///
    /// 待ち時間が経過していればターゲットへ発射し、次の待ち時間を抽選します。
    /// ターゲットが解決できない場合は発射しません。
    pub fn try_auto_fire(&mut self, ctx: &mut FlightContext<'_>) -> Option<Missile> {
        let auto_fire = self.auto_fire?;
        let now = ctx.clock.now();
        if now < self.next_fire_time {
            return None;
        }

        self.next_fire_time = now + self.draw_wait(&auto_fire);
        debug!(
            carrier_id = %self.id,
            next_fire_time = self.next_fire_time,
            "CARRIER_FIRE_REQUEST: 自動射撃を要求しました"
        );

        self.target.and_then(|t| ctx.targets.target_position(t))?;
        self.fire_selected(ctx)
    }

    /// 全ランチャーを初期状態に戻す
    pub fn reset_launchers(&mut self) {
        self.selector.reset_all(&mut self.launchers);
    }

    fn draw_wait(&mut self, auto_fire: &AutoFireConfig) -> f64 {
        if auto_fire.max_wait_s <= auto_fire.min_wait_s {
            auto_fire.min_wait_s
        } else {
            self.rng.gen_range(auto_fire.min_wait_s..auto_fire.max_wait_s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::SimClock;
    use crate::models::effects::EffectLog;
    use crate::models::factory::MissileFactory;
    use crate::models::launcher::{build_launcher, LauncherKind};
    use crate::models::missile::MissileProfile;
    use crate::models::target::{spawn_drone, TargetConfig};
    use hecs::World;
    use std::collections::HashSet;

    fn carrier_config(auto_fire: Option<AutoFireConfig>) -> CarrierConfig {
        CarrierConfig {
            id: "C1".to_string(),
            position_m: DVec3::ZERO,
            euler_deg: [0.0, 0.0, 0.0],
            speed_mps: 50.0,
            turn_rate_deg_s: 20.0,
            radius_m: 5.0,
            target: Some("T1".to_string()),
            launchers: vec![LauncherConfig {
                id: "C1-MSL".to_string(),
                kind: LauncherKind::Hardpoint,
                missile: "aim".to_string(),
                missile_count: 2,
                fire_delay_s: 1.0,
                launch_points: Vec::new(),
                dispersion_deg: 0.0,
                magazine_count: 1,
                magazine_reload_s: 1.0,
            }],
            groups: Vec::new(),
            auto_fire,
        }
    }

    fn build(config: &CarrierConfig, world: &mut World, target_position: DVec3) -> Carrier {
        let target = spawn_drone(
            world,
            &TargetConfig {
                id: "T1".to_string(),
                position_m: target_position,
                euler_deg: [0.0, 0.0, 0.0],
                speed_mps: 0.0,
                turn_rate_deg_s: 0.0,
                radius_m: 2.0,
                remove_on_hit: false,
            },
            BodyId(2),
        );
        let profile = MissileProfile {
            override_initial_speed: true,
            ..MissileProfile::default()
        };
        let launchers = config
            .launchers
            .iter()
            .map(|lc| {
                let factory = MissileFactory::new(lc.id.clone(), "aim", profile.clone(), HashSet::from([BodyId(1)]));
                build_launcher(lc, factory, Some(&OwnerId("C1".to_string())), Pose::IDENTITY, 3)
            })
            .collect();
        Carrier::new(config, BodyId(1), Some(target), launchers, 11)
    }

    #[test]
    fn test_carrier_turns_toward_target_at_rate() {
        let mut world = World::new();
        let mut carrier = build(&carrier_config(None), &mut world, DVec3::new(1000.0, 0.0, 0.0));

        carrier.update(&world, 1.0);
        let heading = math_utils::angle_deg(DVec3::Z, carrier.pose().forward());
        assert!((heading - 20.0).abs() < 1e-6);
        assert!(carrier.pose().position.length() > 49.9);
    }

    #[test]
    fn test_fired_missile_inherits_carrier_speed() {
        let mut world = World::new();
        let mut carrier = build(&carrier_config(None), &mut world, DVec3::new(0.0, 0.0, 3000.0));
        let clock = SimClock::new(0.1);
        let mut effects = EffectLog::new();
        let mut ctx = FlightContext {
            clock: &clock,
            targets: &world,
            effects: &mut effects,
            gravity: DVec3::ZERO,
        };

        let missile = carrier.fire_selected(&mut ctx).unwrap();
        assert!((missile.initial_speed() - 50.0).abs() < 1e-9);
        assert!(missile.ignores(BodyId(1)));
        assert_eq!(missile.target(), carrier.target());
    }

    #[test]
    fn test_auto_fire_waits_then_fires() {
        let mut world = World::new();
        let config = carrier_config(Some(AutoFireConfig {
            min_wait_s: 2.0,
            max_wait_s: 10.0,
        }));
        let mut carrier = build(&config, &mut world, DVec3::new(0.0, 0.0, 3000.0));
        let first_fire = carrier.next_fire_time();
        assert!((2.0..10.0).contains(&first_fire));

        let mut effects = EffectLog::new();
        let mut clock = SimClock::new(0.5);
        let mut fired = Vec::new();
        while clock.time < 10.0 {
            let mut ctx = FlightContext {
                clock: &clock,
                targets: &world,
                effects: &mut effects,
                gravity: DVec3::ZERO,
            };
            if carrier.try_auto_fire(&mut ctx).is_some() {
                fired.push(clock.time);
            }
            clock.advance();
        }

        assert!(!fired.is_empty());
        assert!(fired[0] >= first_fire);
        assert!(fired[0] < first_fire + 0.5);
    }

    #[test]
    fn test_no_auto_fire_without_resolvable_target() {
        let mut world = World::new();
        let config = carrier_config(Some(AutoFireConfig {
            min_wait_s: 1.0,
            max_wait_s: 1.0,
        }));
        let mut carrier = build(&config, &mut world, DVec3::new(0.0, 0.0, 3000.0));
        world.despawn(carrier.target().unwrap().0).unwrap();

        let clock = SimClock { time: 5.0, dt: 0.5 };
        let mut effects = EffectLog::new();
        let mut ctx = FlightContext {
            clock: &clock,
            targets: &world,
            effects: &mut effects,
            gravity: DVec3::ZERO,
        };
        assert!(carrier.try_auto_fire(&mut ctx).is_none());
        assert_eq!(carrier.launchers()[0].ammo_remaining(), 2);
        assert_eq!(carrier.next_fire_time(), 6.0);
    }

    #[test]
    fn test_reset_launchers_after_firing() {
        let mut world = World::new();
        let mut carrier = build(&carrier_config(None), &mut world, DVec3::new(0.0, 0.0, 3000.0));
        let clock = SimClock::new(0.1);
        let mut effects = EffectLog::new();
        let mut ctx = FlightContext {
            clock: &clock,
            targets: &world,
            effects: &mut effects,
            gravity: DVec3::ZERO,
        };

        // グループが1つなら切り替えても同じグループ
        carrier.selector_mut().cycle_group();
        assert_eq!(carrier.selector().selected_group().unwrap().name, "C1-MSL");

        assert!(carrier.fire_selected(&mut ctx).is_some());
        assert!(carrier.fire_selected(&mut ctx).is_none());
        assert_eq!(carrier.launchers()[0].ammo_remaining(), 1);

        carrier.reset_launchers();
        assert_eq!(carrier.launchers()[0].ammo_remaining(), 2);
        assert!(carrier.fire_selected(&mut ctx).is_some());
    }
}
