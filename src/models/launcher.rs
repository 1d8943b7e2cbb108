use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{
    collision::OwnerId,
    common::Pose,
    factory::MissileFactory,
    hardpoint::Hardpoint,
    pod::Pod,
    traits::Launcher,
};

/// ランチャー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LauncherKind {
    /// ステーションごとに事前生成したミサイルを懸架
    Hardpoint,
    /// 発射のたびにミサイルを生成し、弾倉単位で再装填
    Pod,
}

/// 発射点（母機ローカル座標）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchPoint {
    pub offset_m: DVec3,
    /// 姿勢（度, `[pitch, yaw, roll]`）
    #[serde(default)]
    pub euler_deg: [f64; 3],
}

impl LaunchPoint {
    /// 母機原点・母機前方向きの発射点
    pub const ORIGIN: LaunchPoint = LaunchPoint {
        offset_m: DVec3::ZERO,
        euler_deg: [0.0, 0.0, 0.0],
    };

    pub fn local_pose(&self) -> Pose {
        Pose::from_euler_deg(self.offset_m, self.euler_deg)
    }

    /// 母機のワールド姿勢から発射点のワールド姿勢を計算
    pub fn world_pose(&self, mount_pose: &Pose) -> Pose {
        mount_pose.compose(&self.local_pose())
    }
}

/// ランチャー設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    pub id: String,
    pub kind: LauncherKind,
    /// 使用するミサイル性能諸元の名前
    pub missile: String,
    /// 搭載弾数（ポッドは1弾倉あたり）
    #[serde(default = "default_missile_count")]
    pub missile_count: u32,
    /// 再装填時間（ハードポイント）/ 発射間隔（ポッド）[s]
    #[serde(default = "default_fire_delay")]
    pub fire_delay_s: f64,
    #[serde(default)]
    pub launch_points: Vec<LaunchPoint>,
    /// 散布角（度、ポッドのみ）
    #[serde(default)]
    pub dispersion_deg: f64,
    /// 予備弾倉数（ポッドのみ）
    #[serde(default = "default_magazine_count")]
    pub magazine_count: u32,
    /// 弾倉再装填時間（s、ポッドのみ）
    #[serde(default = "default_magazine_reload")]
    pub magazine_reload_s: f64,
}

fn default_missile_count() -> u32 {
    1
}

fn default_fire_delay() -> f64 {
    6.0
}

fn default_magazine_count() -> u32 {
    1
}

fn default_magazine_reload() -> f64 {
    6.0
}

/// 発射点の解決
///
/// 発射点が未設定の場合は母機原点に1つ作成します。
pub fn resolve_launch_points(launcher_id: &str, launch_points: &[LaunchPoint]) -> Vec<LaunchPoint> {
    if launch_points.is_empty() {
        info!(
            launcher_id = %launcher_id,
            "LAUNCHER_DEFAULT_LAUNCH_POINT: 発射点が未設定のため母機原点を使用します"
        );
        vec![LaunchPoint::ORIGIN]
    } else {
        launch_points.to_vec()
    }
}

/// ランチャーを構築
///
/// # 引数
///
/// * `config` - ランチャー設定
/// * `factory` - ミサイル生成器
/// * `owner` - 母機（衝突除外の所有者、未設定でも続行）
/// * `mount_pose` - 母機の初期ワールド姿勢
/// * `seed` - 散布用乱数シード
pub fn build_launcher(
    config: &LauncherConfig,
    factory: MissileFactory,
    owner: Option<&OwnerId>,
    mount_pose: Pose,
    seed: u64,
) -> Box<dyn Launcher> {
    if owner.is_none() {
        warn!(
            launcher_id = %config.id,
            "LAUNCHER_NO_OWNER: 所有者が未設定のため自機との衝突を除外できません"
        );
    }

    let launch_points = config.launch_points.clone();

    match config.kind {
        LauncherKind::Hardpoint => Box::new(Hardpoint::new(
            config.id.clone(),
            factory,
            launch_points,
            config.missile_count,
            config.fire_delay_s,
            mount_pose,
        )),
        LauncherKind::Pod => Box::new(Pod::new(
            config.id.clone(),
            factory,
            launch_points,
            config,
            mount_pose,
            seed,
        )),
    }
}
