use glam::{DMat3, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

use crate::models::traits::Clock;

/// 機体ローカル座標系の前方軸
pub const LOCAL_FORWARD: DVec3 = DVec3::Z;
/// 機体ローカル座標系の上方軸
pub const LOCAL_UP: DVec3 = DVec3::Y;

/// 位置と姿勢の組（ワールド座標またはローカル座標）
///
/// 座標系は右手系で、+Zを前方、+Yを上方とします。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3, // m
    pub rotation: DQuat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    /// 位置とオイラー角（度, `[pitch, yaw, roll]`）から姿勢を作成
    pub fn from_euler_deg(position: DVec3, euler_deg: [f64; 3]) -> Self {
        Self::new(position, math_utils::rotation_from_euler_deg(euler_deg))
    }

    /// 前方単位ベクトル（ワールド）
    pub fn forward(&self) -> DVec3 {
        self.rotation * LOCAL_FORWARD
    }

    /// 上方単位ベクトル（ワールド）
    pub fn up(&self) -> DVec3 {
        self.rotation * LOCAL_UP
    }

    /// ローカル方向ベクトルをワールド方向へ変換
    pub fn transform_direction(&self, local: DVec3) -> DVec3 {
        self.rotation * local
    }

    /// ワールド方向ベクトルをローカル方向へ変換
    pub fn inverse_transform_direction(&self, world: DVec3) -> DVec3 {
        self.rotation.inverse() * world
    }

    /// ローカル位置をワールド位置へ変換
    pub fn transform_point(&self, local: DVec3) -> DVec3 {
        self.position + self.rotation * local
    }

    /// このPoseを親として子のローカルPoseをワールドPoseへ合成
    pub fn compose(&self, child: &Pose) -> Pose {
        Pose::new(
            self.transform_point(child.position),
            (self.rotation * child.rotation).normalize(),
        )
    }

    /// 逆変換
    pub fn inverse(&self) -> Pose {
        let inv_rotation = self.rotation.inverse();
        Pose::new(inv_rotation * -self.position, inv_rotation)
    }
}

/// 固定刻みのシミュレーション時計
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    pub time: f64, // s
    pub dt: f64,   // s
}

impl SimClock {
    pub fn new(dt: f64) -> Self {
        Self { time: 0.0, dt }
    }

    /// 1刻み進める
    pub fn advance(&mut self) {
        self.time += self.dt;
    }
}

impl Clock for SimClock {
    fn now(&self) -> f64 {
        self.time
    }

    fn delta_time(&self) -> f64 {
        self.dt
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    use super::*;

    /// ゼロ除算を避けるための最小ベクトル長
    const EPSILON: f64 = 1e-9;

    /// オイラー角（度, `[pitch, yaw, roll]`）から回転を作成
    ///
    /// ヨー(Y軸) → ピッチ(X軸) → ロール(Z軸) の順で適用します。
    pub fn rotation_from_euler_deg(euler_deg: [f64; 3]) -> DQuat {
        let [pitch, yaw, roll] = euler_deg;
        DQuat::from_euler(
            EulerRot::YXZ,
            yaw.to_radians(),
            pitch.to_radians(),
            roll.to_radians(),
        )
    }

    /// 前方ベクトルと上方ベクトルから姿勢を作成（LookRotation相当）
    ///
    /// 前方ベクトルがゼロの場合は単位回転を返します。
    /// 上方ベクトルが前方と平行な場合は別の軸を上方として使用します。
    pub fn look_rotation(forward: DVec3, up: DVec3) -> DQuat {
        let Some(forward) = forward.try_normalize() else {
            return DQuat::IDENTITY;
        };

        let mut right = up.cross(forward);
        if right.length_squared() < EPSILON {
            // 上方ベクトルが前方と平行
            let fallback = if forward.y.abs() < 0.99 { DVec3::Y } else { DVec3::X };
            right = fallback.cross(forward);
        }
        let right = right.normalize();
        let true_up = forward.cross(right);

        DQuat::from_mat3(&DMat3::from_cols(right, true_up, forward)).normalize()
    }

    /// 2つの回転の間を最大角度（ラジアン）まで回す（RotateTowards相当）
    pub fn rotate_towards(from: DQuat, to: DQuat, max_radians: f64) -> DQuat {
        let angle = from.angle_between(to);
        if angle <= max_radians || angle < EPSILON {
            return to;
        }
        from.slerp(to, max_radians / angle).normalize()
    }

    /// ベクトル`from`を`to`の方向へ最大角度（ラジアン）まで回した単位ベクトル
    ///
    /// 角度差が上限以内なら`to`の方向をそのまま返します。
    pub fn rotate_vector_towards(from: DVec3, to: DVec3, max_radians: f64) -> DVec3 {
        let Some(from) = from.try_normalize() else {
            return to.normalize_or_zero();
        };
        let Some(to) = to.try_normalize() else {
            return from;
        };

        let angle = from.angle_between(to);
        if angle <= max_radians {
            return to;
        }

        let axis = from
            .cross(to)
            .try_normalize()
            .unwrap_or_else(|| from.any_orthonormal_vector());
        (DQuat::from_axis_angle(axis, max_radians) * from).normalize()
    }

    /// 2ベクトル間の符号なし角度（度）
    ///
    /// どちらかがゼロベクトルの場合は0度とします。
    pub fn angle_deg(a: DVec3, b: DVec3) -> f64 {
        match (a.try_normalize(), b.try_normalize()) {
            (Some(a), Some(b)) => a.angle_between(b).to_degrees(),
            _ => 0.0,
        }
    }

    /// 半径1の円盤内の一様乱数点（Random.insideUnitCircle相当）
    ///
    /// `u`, `v` は [0, 1) の一様乱数。
    pub fn point_in_unit_disk(u: f64, v: f64) -> (f64, f64) {
        let radius = u.sqrt();
        let theta = v * std::f64::consts::TAU;
        (radius * theta.cos(), radius * theta.sin())
    }
}
