use std::collections::VecDeque;

use glam::DVec3;
use tracing::{debug, info, trace};

use crate::models::{
    common::Pose,
    effects::EffectEvent,
    launcher::{resolve_launch_points, LaunchPoint},
    missile::Missile,
    target::TargetRef,
    traits::{FlightContext, Launcher, MunitionFactory},
};

/// 懸架ステーション
#[derive(Debug)]
struct Station {
    launch_point: LaunchPoint,
    /// 懸架中のミサイル（発射前）
    loaded: Option<Missile>,
    /// 再装填までの残り時間（s）
    cooldown: f64,
}

/// ハードポイント型ランチャー
///
/// 各ステーションに事前生成したミサイルを懸架し、ステーションごとに独立して再装填します。
/// 発射は先頭ステーションから行い、成功した場合のみ末尾へ回します。
/// 先頭が空の場合は何もせず、次回も同じステーションを再試行します。
#[derive(Debug)]
pub struct Hardpoint<F: MunitionFactory> {
    id: String,
    factory: F,
    launch_points: Vec<LaunchPoint>,
    stations: VecDeque<Station>,
    /// 搭載弾数（生成総数の上限）
    missile_count: u32,
    ammo: u32,
    spawned: u32,
    reload_time: f64,
    mount_pose: Pose,
}

impl<F: MunitionFactory> Hardpoint<F> {
    /// ハードポイントを作成し、ステーションにミサイルを懸架
    ///
    /// # 引数
    ///
    /// * `id` - ランチャーID
    /// * `factory` - ミサイル生成器
    /// * `launch_points` - ステーションごとの発射点（空なら母機原点に1つ作成）
    /// * `missile_count` - 搭載弾数
    /// * `reload_time` - ステーション再装填時間（s）
    /// * `mount_pose` - 母機のワールド姿勢
    pub fn new(
        id: String,
        factory: F,
        launch_points: Vec<LaunchPoint>,
        missile_count: u32,
        reload_time: f64,
        mount_pose: Pose,
    ) -> Self {
        let launch_points = resolve_launch_points(&id, &launch_points);
        let mut hardpoint = Self {
            id,
            factory,
            launch_points,
            stations: VecDeque::new(),
            missile_count,
            ammo: missile_count,
            spawned: 0,
            reload_time,
            mount_pose,
        };
        hardpoint.load_stations();
        hardpoint
    }

    /// 全ステーションを作り直し、搭載弾数の範囲で懸架
    fn load_stations(&mut self) {
        self.spawned = 0;
        self.stations = self
            .launch_points
            .iter()
            .map(|launch_point| Station {
                launch_point: *launch_point,
                loaded: None,
                cooldown: 0.0,
            })
            .collect();

        for station in self.stations.iter_mut() {
            if self.spawned >= self.missile_count {
                break;
            }
            mount_missile(&mut self.factory, &self.mount_pose, station);
            self.spawned += 1;
        }
    }

    /// 懸架中のミサイル数
    pub fn loaded_count(&self) -> usize {
        self.stations.iter().filter(|s| s.loaded.is_some()).count()
    }

    /// 先頭ステーションの発射点
    pub fn head_launch_point(&self) -> Option<LaunchPoint> {
        self.stations.front().map(|s| s.launch_point)
    }
}

/// ステーションの発射点にミサイルを生成して懸架
fn mount_missile<F: MunitionFactory>(factory: &mut F, mount_pose: &Pose, station: &mut Station) {
    let pose = station
        .launch_point
        .world_pose(mount_pose)
        .compose(&factory.mount_offset());
    station.loaded = Some(factory.spawn(pose));
    station.cooldown = 0.0;
}

impl<F: MunitionFactory> Launcher for Hardpoint<F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn ammo_remaining(&self) -> u32 {
        self.ammo
    }

    fn magazines_remaining(&self) -> u32 {
        1
    }

    fn can_launch(&self) -> bool {
        self.stations
            .front()
            .is_some_and(|station| station.loaded.is_some())
    }

    fn launch(
        &mut self,
        target: Option<TargetRef>,
        inherited_velocity: DVec3,
        ctx: &mut FlightContext<'_>,
    ) -> Option<Missile> {
        let station = self.stations.front_mut()?;
        let Some(mut missile) = station.loaded.take() else {
            trace!(
                launcher_id = %self.id,
                cooldown = station.cooldown,
                "LAUNCHER_NOT_READY: 先頭ステーションが再装填中です"
            );
            return None;
        };

        if !missile.launch(target, inherited_velocity, ctx) {
            station.loaded = Some(missile);
            return None;
        }

        station.cooldown = self.reload_time;
        self.stations.rotate_left(1);
        self.ammo = self.ammo.saturating_sub(1);

        let position = missile.pose().position;
        ctx.effects.emit(EffectEvent::LauncherFired {
            launcher_id: self.id.clone(),
            position,
        });

        info!(
            launcher_id = %self.id,
            missile_id = %missile.id(),
            ammo_remaining = self.ammo,
            launch_time = ctx.clock.now(),
            "LAUNCHER_FIRED: ハードポイントからミサイルを発射しました"
        );

        Some(missile)
    }

    fn reset_launcher(&mut self) {
        self.ammo = self.missile_count;
        self.load_stations();

        info!(
            launcher_id = %self.id,
            ammo = self.ammo,
            loaded = self.loaded_count(),
            "LAUNCHER_RESET: ハードポイントを初期状態に戻しました"
        );
    }

    fn tick(&mut self, dt: f64) {
        for station in self.stations.iter_mut() {
            if station.loaded.is_some() || self.spawned >= self.missile_count {
                continue;
            }

            station.cooldown = (station.cooldown - dt).max(0.0);
            if station.cooldown <= 0.0 {
                mount_missile(&mut self.factory, &self.mount_pose, station);
                self.spawned += 1;

                debug!(
                    launcher_id = %self.id,
                    spawned = self.spawned,
                    missile_count = self.missile_count,
                    "STATION_RELOADED: ステーションの再装填が完了しました"
                );
            }
        }
    }

    fn set_mount_pose(&mut self, pose: Pose) {
        self.mount_pose = pose;
        let offset = self.factory.mount_offset();
        for station in self.stations.iter_mut() {
            if let Some(missile) = station.loaded.as_mut() {
                missile.set_mounted_pose(station.launch_point.world_pose(&pose).compose(&offset));
            }
        }
    }
}
