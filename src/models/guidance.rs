//! # Guidance モジュール
//!
//! ミサイルの目標姿勢を計算する誘導則を提供します。
//!
//! - **追尾誘導（Pursuit）**: ターゲットの現在位置へ直接向かう
//! - **見越し誘導（Lead）**: ターゲット速度と到達時間から未来位置を予測して向かう
//!
//! 見越し方向は視線方向からシーカーコーンの90%までに制限されます。
//! シーカーが物理的に捉えられない方向を指令すると操舵が不安定になるためです。

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::models::common::{math_utils, Pose};

/// 低速時の到達時間発散を防ぐための最小予測速度（m/s）
pub const MINIMUM_GUIDE_SPEED: f64 = 1.0;

/// 見越し方向の許容偏差（シーカーコーンに対する比率）
pub const LEAD_CONE_FRACTION: f64 = 0.9;

/// 誘導方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceType {
    /// 追尾誘導
    #[default]
    Pursuit,
    /// 見越し誘導
    Lead,
}

/// ターゲット位置のサンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSample {
    pub position: DVec3,
    pub time: f64,
}

/// 見越し誘導の速度予測に使うミサイル性能
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadParameters {
    /// 初速（m/s）
    pub initial_speed: f64,
    /// 現在速度（m/s）
    pub current_speed: f64,
    /// 加速度（m/s²）
    pub acceleration: f64,
    /// モーター燃焼時間（s、0以下は無限）
    pub motor_lifetime: f64,
    /// 点火からの経過時間（s）
    pub time_since_activation: f64,
    /// 寿命（s、到達時間の上限、0以下は無制限）
    pub time_to_live: f64,
}

/// ミサイルの予測速度
///
/// `min(初速 + 加速度·燃焼時間, 現在速度 + 加速度·点火後経過時間)`。
/// モーターの理論最高速度で頭打ちにし、外挿の暴走を防ぎます。
pub fn predicted_speed(params: &LeadParameters) -> f64 {
    let projected = params.current_speed + params.acceleration * params.time_since_activation;
    if params.motor_lifetime > 0.0 {
        let burnout_speed = params.initial_speed + params.acceleration * params.motor_lifetime;
        burnout_speed.min(projected)
    } else {
        projected
    }
}

/// 追尾誘導の目標姿勢（上方ベクトルは自機の上方を維持）
pub fn pursuit_rotation(own: &Pose, target_position: DVec3) -> DQuat {
    math_utils::look_rotation(target_position - own.position, own.up())
}

/// 見越し誘導の目標方向
///
/// # 引数
///
/// * `own_position` - 自機位置
/// * `target_position` - ターゲット現在位置
/// * `target_velocity` - ターゲット推定速度
/// * `params` - 速度予測パラメータ
/// * `cone_deg` - シーカーコーン半角（度）
///
/// # 戻り値
///
/// 視線方向からの偏差が`0.9 × cone_deg`以内に制限された単位ベクトル
pub fn lead_direction(
    own_position: DVec3,
    target_position: DVec3,
    target_velocity: DVec3,
    params: &LeadParameters,
    cone_deg: f64,
) -> DVec3 {
    let line_of_sight = target_position - own_position;
    let distance = line_of_sight.length();

    let speed = predicted_speed(params).max(MINIMUM_GUIDE_SPEED);
    let mut time_to_impact = distance / speed;
    if params.time_to_live > 0.0 {
        time_to_impact = time_to_impact.min(params.time_to_live);
    }

    let lead_position = target_position + target_velocity * time_to_impact;
    let lead_vector = lead_position - own_position;

    math_utils::rotate_vector_towards(
        line_of_sight,
        lead_vector,
        (cone_deg * LEAD_CONE_FRACTION).to_radians(),
    )
}

/// 誘導計算器
///
/// 見越し誘導のため、直前のターゲット位置サンプルを保持します。
#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceSolver {
    pub guidance: GuidanceType,
    last_sample: Option<TargetSample>,
}

impl GuidanceSolver {
    pub fn new(guidance: GuidanceType) -> Self {
        Self {
            guidance,
            last_sample: None,
        }
    }

    /// 速度推定の初期サンプルを設定（点火時）
    pub fn seed(&mut self, position: DVec3, time: f64) {
        self.last_sample = Some(TargetSample { position, time });
    }

    pub fn last_sample(&self) -> Option<TargetSample> {
        self.last_sample
    }

    /// 目標姿勢を計算
    ///
    /// 見越し誘導で有効な過去サンプルが無い場合（経過時間ゼロを含む）は
    /// 追尾誘導と同じ方向を返し、今回の位置をサンプルとして記録します。
    pub fn solve(
        &mut self,
        own: &Pose,
        target_position: DVec3,
        now: f64,
        cone_deg: f64,
        params: &LeadParameters,
    ) -> DQuat {
        match self.guidance {
            GuidanceType::Pursuit => pursuit_rotation(own, target_position),
            GuidanceType::Lead => {
                let direction = match self.last_sample {
                    Some(sample) if now - sample.time > 0.0 => {
                        let target_velocity =
                            (target_position - sample.position) / (now - sample.time);
                        lead_direction(
                            own.position,
                            target_position,
                            target_velocity,
                            params,
                            cone_deg,
                        )
                    }
                    _ => target_position - own.position,
                };
                self.last_sample = Some(TargetSample {
                    position: target_position,
                    time: now,
                });
                math_utils::look_rotation(direction, own.up())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::LOCAL_FORWARD;

    fn params(initial: f64, current: f64, accel: f64, lifetime: f64, since: f64) -> LeadParameters {
        LeadParameters {
            initial_speed: initial,
            current_speed: current,
            acceleration: accel,
            motor_lifetime: lifetime,
            time_since_activation: since,
            time_to_live: 0.0,
        }
    }

    #[test]
    fn test_predicted_speed_capped_at_burnout() {
        // 初速100, 加速度50, 燃焼3秒 → 最高250
        let p = params(100.0, 200.0, 50.0, 3.0, 2.0);
        assert_eq!(predicted_speed(&p), 250.0);

        let p = params(100.0, 120.0, 50.0, 3.0, 0.5);
        assert_eq!(predicted_speed(&p), 145.0);

        // 燃焼時間無限なら上限なし
        let p = params(100.0, 200.0, 50.0, 0.0, 10.0);
        assert_eq!(predicted_speed(&p), 700.0);
    }

    #[test]
    fn test_lead_direction_bounded_by_cone() {
        let cone_deg = 30.0;
        let own = DVec3::ZERO;
        let target = DVec3::new(0.0, 0.0, 1000.0);
        // 視線に垂直な高速移動
        let target_velocity = DVec3::new(5000.0, 0.0, 0.0);
        let p = params(50.0, 50.0, 0.0, 3.0, 0.0);

        let direction = lead_direction(own, target, target_velocity, &p, cone_deg);
        let deviation = math_utils::angle_deg(target - own, direction);
        assert!(deviation <= cone_deg * LEAD_CONE_FRACTION + 1e-6);
        assert!((deviation - 27.0).abs() < 1e-6);
        assert!(direction.x > 0.0);
    }

    #[test]
    fn test_lead_direction_unclamped_small_lead() {
        let own = DVec3::ZERO;
        let target = DVec3::new(0.0, 0.0, 1000.0);
        let target_velocity = DVec3::new(10.0, 0.0, 0.0);
        // 速度100 → 到達10秒 → 見越し100m
        let p = params(100.0, 100.0, 0.0, 3.0, 0.0);

        let direction = lead_direction(own, target, target_velocity, &p, 45.0);
        let expected = DVec3::new(100.0, 0.0, 1000.0).normalize();
        assert!((direction - expected).length() < 1e-9);
    }

    #[test]
    fn test_lead_direction_minimum_speed_floor() {
        let own = DVec3::ZERO;
        let target = DVec3::new(0.0, 0.0, 10.0);
        let p = params(0.0, 0.0, 0.0, 3.0, 0.0);
        let direction = lead_direction(own, target, DVec3::new(1.0, 0.0, 0.0), &p, 45.0);
        assert!(direction.is_finite());
    }

    #[test]
    fn test_lead_time_to_impact_clamped_by_time_to_live() {
        let own = DVec3::ZERO;
        let target = DVec3::new(0.0, 0.0, 1000.0);
        let target_velocity = DVec3::new(10.0, 0.0, 0.0);
        let mut p = params(1.0, 1.0, 0.0, 3.0, 0.0);
        p.time_to_live = 5.0;

        // 到達時間は1000秒ではなく5秒 → 見越し50m
        let direction = lead_direction(own, target, target_velocity, &p, 45.0);
        let expected = DVec3::new(50.0, 0.0, 1000.0).normalize();
        assert!((direction - expected).length() < 1e-9);
    }

    #[test]
    fn test_solver_falls_back_to_pursuit_without_sample() {
        let mut solver = GuidanceSolver::new(GuidanceType::Lead);
        let own = Pose::IDENTITY;
        let target = DVec3::new(100.0, 0.0, 100.0);
        let p = params(100.0, 100.0, 0.0, 3.0, 0.0);

        let rotation = solver.solve(&own, target, 1.0, 45.0, &p);
        let forward = rotation * LOCAL_FORWARD;
        assert!((forward - target.normalize()).length() < 1e-9);
        assert_eq!(
            solver.last_sample(),
            Some(TargetSample { position: target, time: 1.0 })
        );
    }

    #[test]
    fn test_solver_leads_moving_target() {
        let mut solver = GuidanceSolver::new(GuidanceType::Lead);
        let own = Pose::IDENTITY;
        let p = params(100.0, 100.0, 0.0, 3.0, 0.0);

        solver.seed(DVec3::new(0.0, 0.0, 1000.0), 0.0);
        let rotation = solver.solve(&own, DVec3::new(10.0, 0.0, 1000.0), 1.0, 45.0, &p);
        let forward = rotation * LOCAL_FORWARD;
        // 右へ動くターゲットより更に右を向く
        let los_angle = math_utils::angle_deg(DVec3::Z, DVec3::new(10.0, 0.0, 1000.0));
        assert!(math_utils::angle_deg(DVec3::Z, forward) > los_angle);
        assert!(forward.x > 0.0);
    }

    #[test]
    fn test_pursuit_points_at_target() {
        let mut solver = GuidanceSolver::new(GuidanceType::Pursuit);
        let own = Pose::new(DVec3::new(5.0, 5.0, 5.0), DQuat::IDENTITY);
        let target = DVec3::new(5.0, 105.0, 5.0);
        let p = params(100.0, 100.0, 0.0, 3.0, 0.0);
        let rotation = solver.solve(&own, target, 0.0, 45.0, &p);
        assert!(((rotation * LOCAL_FORWARD) - DVec3::Y).length() < 1e-9);
        assert!(solver.last_sample().is_none());
    }
}
