use glam::DVec3;
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::models::{
    collision::{BodyId, SphereBody},
    common::Pose,
    traits::TargetSource,
};

/// ターゲットへの弱参照
///
/// ECSワールド上のエンティティを指すだけで、ターゲットを所有しません。
/// ターゲットがデスポーンした後は解決できなくなります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetRef(pub Entity);

/// ターゲットの名前コンポーネント
#[derive(Debug, Clone, PartialEq)]
pub struct TargetName(pub String);

/// ターゲットの衝突ボディコンポーネント
#[derive(Debug, Clone, Copy)]
pub struct TargetBody {
    pub id: BodyId,
    /// 衝突判定半径（m）
    pub radius: f64,
    /// 命中時にデスポーンするかどうか
    pub remove_on_hit: bool,
}

/// ドローンの運動コンポーネント
///
/// 前方へ等速で進み、一定のヨーレートで旋回します。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroneMotion {
    /// 速度（m/s）
    pub speed: f64,
    /// ヨーレート（deg/s、0なら直進）
    pub turn_rate_deg_s: f64,
}

/// ターゲットドローンの生成パラメータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub id: String,
    pub position_m: DVec3,
    /// 姿勢（度, `[pitch, yaw, roll]`）
    #[serde(default)]
    pub euler_deg: [f64; 3],
    #[serde(default)]
    pub speed_mps: f64,
    #[serde(default)]
    pub turn_rate_deg_s: f64,
    #[serde(default = "default_target_radius")]
    pub radius_m: f64,
    #[serde(default)]
    pub remove_on_hit: bool,
}

fn default_target_radius() -> f64 {
    2.0
}

/// ターゲットドローンをワールドに生成
pub fn spawn_drone(world: &mut World, config: &TargetConfig, body: BodyId) -> TargetRef {
    let entity = world.spawn((
        TargetName(config.id.clone()),
        Pose::from_euler_deg(config.position_m, config.euler_deg),
        DroneMotion {
            speed: config.speed_mps,
            turn_rate_deg_s: config.turn_rate_deg_s,
        },
        TargetBody {
            id: body,
            radius: config.radius_m,
            remove_on_hit: config.remove_on_hit,
        },
    ));
    TargetRef(entity)
}

/// 全ドローンを1ティック分移動
pub fn move_drones(world: &mut World, dt: f64) {
    for (_entity, (pose, motion)) in world.query_mut::<(&mut Pose, &DroneMotion)>() {
        if motion.turn_rate_deg_s != 0.0 {
            let yaw = glam::DQuat::from_rotation_y((motion.turn_rate_deg_s * dt).to_radians());
            pose.rotation = (pose.rotation * yaw).normalize();
        }
        pose.position += pose.forward() * motion.speed * dt;
    }
}

/// 名前からターゲットを検索
pub fn find_target(world: &World, name: &str) -> Option<TargetRef> {
    let mut query = world.query::<&TargetName>();
    query
        .iter()
        .find(|(_, target_name)| target_name.0 == name)
        .map(|(entity, _)| TargetRef(entity))
}

/// 衝突判定用の球ボディ一覧
pub fn target_bodies(world: &World) -> Vec<SphereBody> {
    let mut query = world.query::<(&Pose, &TargetBody)>();
    query
        .iter()
        .map(|(_, (pose, body))| SphereBody {
            id: body.id,
            position: pose.position,
            radius: body.radius,
        })
        .collect()
}

/// ボディIDからターゲットを逆引き
pub fn target_by_body(world: &World, body: BodyId) -> Option<(TargetRef, TargetBody)> {
    let mut query = world.query::<&TargetBody>();
    query
        .iter()
        .find(|(_, target_body)| target_body.id == body)
        .map(|(entity, target_body)| (TargetRef(entity), *target_body))
}

impl TargetSource for World {
    fn target_position(&self, target: TargetRef) -> Option<DVec3> {
        self.get::<&Pose>(target.0).ok().map(|pose| pose.position)
    }
}
