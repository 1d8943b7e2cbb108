use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, trace, warn};

use crate::models::{
    common::{math_utils, Pose},
    effects::EffectEvent,
    launcher::{resolve_launch_points, LaunchPoint, LauncherConfig},
    missile::Missile,
    target::TargetRef,
    traits::{FlightContext, Launcher, MunitionFactory},
};

/// ポッド型ランチャー
///
/// 発射のたびにミサイルを生成します。発射間隔と弾倉再装填の2つのクールダウンを共有し、
/// 弾切れで弾倉再装填が始まります。予備弾倉は消耗品で補充されません。
#[derive(Debug)]
pub struct Pod<F: MunitionFactory> {
    id: String,
    factory: F,
    launch_points: Vec<LaunchPoint>,
    tube_index: usize,
    mount_pose: Pose,
    dispersion_deg: f64,
    rng: ChaCha8Rng,

    /// 1弾倉あたりの弾数
    missile_count: u32,
    ammo: u32,
    fire_delay: f64,
    reload_cooldown: f64,

    initial_magazines: u32,
    magazines: u32,
    magazine_reload_time: f64,
    magazine_reload_cooldown: f64,
    magazine_reloading: bool,
}

impl<F: MunitionFactory> Pod<F> {
    /// ポッドを作成
    ///
    /// # 引数
    ///
    /// * `id` - ランチャーID
    /// * `factory` - ミサイル生成器
    /// * `launch_points` - 発射筒ごとの発射点（空なら母機原点に1つ作成）
    /// * `config` - 弾数・発射間隔・散布・弾倉の設定
    /// * `mount_pose` - 母機のワールド姿勢
    /// * `seed` - 散布用乱数シード
    pub fn new(
        id: String,
        factory: F,
        launch_points: Vec<LaunchPoint>,
        config: &LauncherConfig,
        mount_pose: Pose,
        seed: u64,
    ) -> Self {
        let launch_points = resolve_launch_points(&id, &launch_points);
        Self {
            id,
            factory,
            launch_points,
            tube_index: 0,
            mount_pose,
            dispersion_deg: config.dispersion_deg,
            rng: ChaCha8Rng::seed_from_u64(seed),
            missile_count: config.missile_count,
            ammo: config.missile_count,
            fire_delay: config.fire_delay_s,
            reload_cooldown: 0.0,
            initial_magazines: config.magazine_count,
            magazines: config.magazine_count,
            magazine_reload_time: config.magazine_reload_s,
            magazine_reload_cooldown: 0.0,
            magazine_reloading: false,
        }
    }

    /// 次に発射する発射筒
    pub fn tube_index(&self) -> usize {
        self.tube_index
    }

    pub fn is_magazine_reloading(&self) -> bool {
        self.magazine_reloading
    }

    /// 手動で弾倉を交換（残弾は破棄）
    ///
    /// # 戻り値
    ///
    /// 再装填を開始した場合はtrue。予備弾倉が無い、または再装填中の場合はfalse。
    pub fn reload_magazine(&mut self) -> bool {
        if self.magazine_reloading || self.magazines == 0 {
            warn!(
                launcher_id = %self.id,
                magazines = self.magazines,
                reloading = self.magazine_reloading,
                "MAGAZINE_RELOAD_REJECTED: 弾倉を交換できません"
            );
            return false;
        }

        self.ammo = 0;
        self.start_magazine_reload();
        true
    }

    fn start_magazine_reload(&mut self) {
        if self.magazines == 0 {
            info!(
                launcher_id = %self.id,
                "MAGAZINES_DEPLETED: 予備弾倉がありません"
            );
            return;
        }

        self.magazine_reloading = true;
        self.magazine_reload_cooldown = self.magazine_reload_time;

        info!(
            launcher_id = %self.id,
            magazines = self.magazines,
            reload_time = self.magazine_reload_time,
            "MAGAZINE_RELOAD_STARTED: 弾倉の再装填を開始しました"
        );
    }

    /// 発射筒の姿勢に散布を加えた発射姿勢
    ///
    /// 半径`dispersion_deg`（ラジアン換算）の円盤内の一様乱数を発射筒ローカルの横ずれとして加えます。
    fn dispersed_pose(&mut self, tube: &Pose) -> Pose {
        if self.dispersion_deg <= 0.0 {
            return *tube;
        }

        let (x, y) = math_utils::point_in_unit_disk(
            self.rng.gen_range(0.0..1.0),
            self.rng.gen_range(0.0..1.0),
        );
        let spread = self.dispersion_deg.to_radians();
        let deviation = tube.transform_direction(DVec3::new(x * spread, y * spread, 0.0));
        let direction = tube.forward() + deviation;

        Pose::new(tube.position, math_utils::look_rotation(direction, tube.up()))
    }
}

impl<F: MunitionFactory> Launcher for Pod<F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn ammo_remaining(&self) -> u32 {
        self.ammo
    }

    fn magazines_remaining(&self) -> u32 {
        self.magazines
    }

    fn can_launch(&self) -> bool {
        self.ammo > 0 && self.reload_cooldown <= 0.0 && !self.magazine_reloading
    }

    fn launch(
        &mut self,
        target: Option<TargetRef>,
        inherited_velocity: DVec3,
        ctx: &mut FlightContext<'_>,
    ) -> Option<Missile> {
        if !self.can_launch() {
            trace!(
                launcher_id = %self.id,
                ammo = self.ammo,
                reload_cooldown = self.reload_cooldown,
                magazine_reloading = self.magazine_reloading,
                "LAUNCHER_NOT_READY: ポッドは発射できません"
            );
            return None;
        }

        let tube_index = self.tube_index;
        let tube = self.launch_points[tube_index].world_pose(&self.mount_pose);
        // 懸架点は使わず、発射筒の位置に散布済みの向きで生成する
        let pose = self.dispersed_pose(&tube);

        let mut missile = self.factory.spawn(pose);
        missile.launch(target, inherited_velocity, ctx);

        self.reload_cooldown = self.fire_delay;
        self.ammo -= 1;
        self.tube_index = (tube_index + 1) % self.launch_points.len();

        ctx.effects.emit(EffectEvent::LauncherFired {
            launcher_id: self.id.clone(),
            position: tube.position,
        });

        info!(
            launcher_id = %self.id,
            missile_id = %missile.id(),
            tube = tube_index,
            ammo_remaining = self.ammo,
            magazines = self.magazines,
            launch_time = ctx.clock.now(),
            "LAUNCHER_FIRED: ポッドからミサイルを発射しました"
        );

        if self.ammo == 0 {
            self.start_magazine_reload();
        }

        Some(missile)
    }

    fn reset_launcher(&mut self) {
        self.ammo = self.missile_count;
        self.magazines = self.initial_magazines;
        self.reload_cooldown = 0.0;
        self.magazine_reload_cooldown = 0.0;
        self.magazine_reloading = false;
        self.tube_index = 0;

        info!(
            launcher_id = %self.id,
            ammo = self.ammo,
            magazines = self.magazines,
            "LAUNCHER_RESET: ポッドを初期状態に戻しました"
        );
    }

    fn tick(&mut self, dt: f64) {
        if self.reload_cooldown > 0.0 {
            self.reload_cooldown = (self.reload_cooldown - dt).max(0.0);
        }

        if self.magazine_reloading && self.magazines > 0 {
            self.magazine_reload_cooldown -= dt;
            if self.magazine_reload_cooldown <= 0.0 {
                self.ammo = self.missile_count;
                self.reload_cooldown = 0.0;
                self.magazine_reload_cooldown = 0.0;
                self.magazine_reloading = false;
                self.magazines -= 1;

                info!(
                    launcher_id = %self.id,
                    ammo = self.ammo,
                    magazines = self.magazines,
                    "MAGAZINE_RELOADED: 弾倉の再装填が完了しました"
                );
            }
        }
    }

    fn set_mount_pose(&mut self, pose: Pose) {
        self.mount_pose = pose;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::SimClock;
    use crate::models::effects::EffectLog;
    use crate::models::factory::MissileFactory;
    use crate::models::launcher::LauncherKind;
    use crate::models::missile::{AttachPoint, MissileProfile};
    use hecs::World;
    use std::collections::HashSet;

    fn config(missile_count: u32, magazine_count: u32, dispersion_deg: f64) -> LauncherConfig {
        LauncherConfig {
            id: "POD".to_string(),
            kind: LauncherKind::Pod,
            missile: "rocket".to_string(),
            missile_count,
            fire_delay_s: 0.5,
            launch_points: Vec::new(),
            dispersion_deg,
            magazine_count,
            magazine_reload_s: 3.0,
        }
    }

    fn tubes() -> Vec<LaunchPoint> {
        (0..3)
            .map(|i| LaunchPoint {
                offset_m: DVec3::new(i as f64, 0.0, 0.0),
                euler_deg: [0.0, 0.0, 0.0],
            })
            .collect()
    }

    fn pod(config: &LauncherConfig) -> Pod<MissileFactory> {
        let factory = MissileFactory::new("POD", "rocket", MissileProfile::default(), HashSet::new());
        Pod::new("POD".to_string(), factory, tubes(), config, Pose::IDENTITY, 42)
    }

    fn fire(pod: &mut Pod<MissileFactory>) -> Option<Missile> {
        let clock = SimClock::new(0.1);
        let world = World::new();
        let mut effects = EffectLog::new();
        let mut ctx = FlightContext {
            clock: &clock,
            targets: &world,
            effects: &mut effects,
            gravity: DVec3::ZERO,
        };
        pod.launch(None, DVec3::ZERO, &mut ctx)
    }

    #[test]
    fn test_fire_delay_between_shots() {
        let mut pod = pod(&config(4, 1, 0.0));
        assert!(fire(&mut pod).is_some());
        assert!(fire(&mut pod).is_none());
        assert_eq!(pod.ammo_remaining(), 3);

        pod.tick(0.25);
        assert!(!pod.can_launch());
        pod.tick(0.25);
        assert!(fire(&mut pod).is_some());
    }

    #[test]
    fn test_tubes_cycle_round_robin() {
        let mut pod = pod(&config(8, 1, 0.0));
        let mut xs = Vec::new();
        for _ in 0..4 {
            let missile = fire(&mut pod).unwrap();
            xs.push(missile.pose().position.x);
            pod.tick(0.5);
        }
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 0.0]);
        assert_eq!(pod.tube_index(), 1);
    }

    #[test]
    fn test_magazine_depletion_and_reload_cycle() {
        let mut pod = pod(&config(2, 1, 0.0));

        assert!(fire(&mut pod).is_some());
        pod.tick(0.5);
        assert!(fire(&mut pod).is_some());
        assert_eq!(pod.ammo_remaining(), 0);
        assert!(pod.is_magazine_reloading());

        // 再装填完了まで発射不可
        pod.tick(1.0);
        pod.tick(1.0);
        assert!(fire(&mut pod).is_none());
        assert_eq!(pod.ammo_remaining(), 0);

        pod.tick(1.0);
        assert_eq!(pod.ammo_remaining(), 2);
        assert_eq!(pod.magazines_remaining(), 0);
        assert!(pod.can_launch());

        // 2弾倉目を撃ち切ると、以降は再装填されない
        assert!(fire(&mut pod).is_some());
        pod.tick(0.5);
        assert!(fire(&mut pod).is_some());
        pod.tick(10.0);
        assert_eq!(pod.ammo_remaining(), 0);
        assert!(!pod.reload_magazine());
        pod.tick(10.0);
        assert!(fire(&mut pod).is_none());
    }

    #[test]
    fn test_manual_magazine_reload_discards_rounds() {
        let mut pod = pod(&config(4, 2, 0.0));
        fire(&mut pod);
        assert_eq!(pod.ammo_remaining(), 3);

        assert!(pod.reload_magazine());
        assert_eq!(pod.ammo_remaining(), 0);
        assert!(!pod.reload_magazine());

        pod.tick(3.0);
        assert_eq!(pod.ammo_remaining(), 4);
        assert_eq!(pod.magazines_remaining(), 1);
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut pod = pod(&config(1, 1, 0.0));
        fire(&mut pod);
        pod.tick(3.0);
        fire(&mut pod);
        assert_eq!(pod.magazines_remaining(), 0);

        pod.reset_launcher();
        assert_eq!(pod.ammo_remaining(), 1);
        assert_eq!(pod.magazines_remaining(), 1);
        assert_eq!(pod.tube_index(), 0);
        assert!(pod.can_launch());
    }

    #[test]
    fn test_dispersion_within_angle() {
        let dispersion_deg = 5.0;
        let mut pod = pod(&config(50, 1, dispersion_deg));
        let mut deviated = false;
        for _ in 0..50 {
            let missile = fire(&mut pod).unwrap();
            let angle = math_utils::angle_deg(DVec3::Z, missile.pose().forward());
            assert!(angle <= dispersion_deg + 1e-9);
            deviated |= angle > 1e-6;
            pod.tick(0.5);
        }
        assert!(deviated);
    }

    #[test]
    fn test_dispersion_deterministic_for_seed() {
        let cfg = config(3, 1, 3.0);
        let mut a = pod(&cfg);
        let mut b = pod(&cfg);
        let fa = fire(&mut a).unwrap().pose().forward();
        let fb = fire(&mut b).unwrap().pose().forward();
        assert_eq!(fa, fb);
    }

    #[test]
    fn test_missing_tubes_fire_from_mount_origin() {
        let factory = MissileFactory::new("POD", "rocket", MissileProfile::default(), HashSet::new());
        let mount = Pose::from_euler_deg(DVec3::new(10.0, 20.0, 30.0), [0.0, 0.0, 0.0]);
        let mut pod = Pod::new("POD".to_string(), factory, Vec::new(), &config(3, 1, 0.0), mount, 42);

        let first = fire(&mut pod).unwrap();
        assert!((first.pose().position - mount.position).length() < 1e-9);
        assert_eq!(pod.tube_index(), 0);

        pod.tick(0.5);
        assert!(fire(&mut pod).is_some());
        assert_eq!(pod.ammo_remaining(), 1);
    }

    #[test]
    fn test_attach_point_not_applied_to_pod_rounds() {
        let profile = MissileProfile {
            attach_point: Some(AttachPoint {
                offset_m: DVec3::new(0.0, 0.5, 1.5),
                euler_deg: [0.0, 0.0, 0.0],
            }),
            ..MissileProfile::default()
        };
        let factory = MissileFactory::new("POD", "rocket", profile, HashSet::new());
        let mut pod = Pod::new("POD".to_string(), factory, tubes(), &config(3, 1, 0.0), Pose::IDENTITY, 42);

        let missile = fire(&mut pod).unwrap();
        assert_eq!(missile.pose().position, DVec3::ZERO);
    }
}
