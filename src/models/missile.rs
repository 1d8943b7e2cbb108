use std::collections::HashSet;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::models::{
    collision::BodyId,
    common::{math_utils, Pose},
    effects::{EffectEvent, EffectsProfile},
    guidance::{GuidanceSolver, GuidanceType, LeadParameters},
    seeker::Seeker,
    target::TargetRef,
    traits::FlightContext,
};

/// ミサイルの飛翔段階
///
/// `Mounted → Dropping → Active → Destroyed` の順に遷移します。
/// 投下遅延が無い場合は`Dropping`を経由しません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissilePhase {
    /// 懸架中（発射前）
    Mounted,
    /// 投下・自由落下中（モーター未点火）
    Dropping,
    /// 点火済み（燃焼中または慣性飛翔中）
    Active,
    /// 破壊済み（終端状態）
    Destroyed,
}

/// ミサイル終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissileEndReason {
    /// 何かに衝突した
    Impact,
    /// 寿命切れで自爆した
    Expired,
}

/// 懸架点（ミサイル原点から見た取付位置）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttachPoint {
    pub offset_m: DVec3,
    #[serde(default)]
    pub euler_deg: [f64; 3],
}

impl AttachPoint {
    pub fn pose(&self) -> Pose {
        Pose::from_euler_deg(self.offset_m, self.euler_deg)
    }
}

/// ミサイル性能諸元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissileProfile {
    /// 誘導方式
    pub guidance: GuidanceType,
    /// シーカーコーン半角（度）
    pub seeker_cone_deg: f64,
    /// シーカー探知距離（m）
    pub seeker_range_m: f64,
    /// 点火時に初速を母機の前方速度から導出する
    pub override_initial_speed: bool,
    /// 初速（m/s）
    pub initial_speed_mps: f64,
    /// モーター燃焼時間（s、0以下は無限）
    pub motor_lifetime_s: f64,
    /// 燃焼中の加速度（m/s²）
    pub acceleration_mps2: f64,
    /// 最大旋回レート（deg/s）
    pub turn_rate_deg_s: f64,
    /// 発射からの寿命（s）
    pub time_to_live_s: f64,
    /// 投下遅延（s）
    pub drop_delay_s: f64,
    /// 投下時の射出速度（ミサイルローカル座標, m/s）
    pub eject_velocity_mps: DVec3,
    /// 投下中に重力を適用する
    pub gravity: bool,
    /// 衝突判定半径（m）
    pub radius_m: f64,
    /// 懸架点（未指定ならミサイル原点）
    pub attach_point: Option<AttachPoint>,
    /// 演出設定
    pub effects: EffectsProfile,
}

impl Default for MissileProfile {
    fn default() -> Self {
        Self {
            guidance: GuidanceType::Pursuit,
            seeker_cone_deg: 45.0,
            seeker_range_m: 5000.0,
            override_initial_speed: false,
            initial_speed_mps: 0.0,
            motor_lifetime_s: 3.0,
            acceleration_mps2: 15.0,
            turn_rate_deg_s: 45.0,
            time_to_live_s: 15.0,
            drop_delay_s: 0.0,
            eject_velocity_mps: DVec3::ZERO,
            gravity: true,
            radius_m: 0.5,
            attach_point: None,
            effects: EffectsProfile::default(),
        }
    }
}

/// ミサイル（弾体）
///
/// 発射後の位置・姿勢はこの状態機械だけが更新します。
/// ターゲットは弱参照で保持し、解決できなくなった時点で無誘導飛翔になります。
#[derive(Debug, Clone)]
pub struct Missile {
    id: String,
    profile: MissileProfile,
    pose: Pose,
    /// 直前ティック開始時の位置（掃引接触判定用）
    previous_position: DVec3,
    phase: MissilePhase,
    motor_active: bool,
    seeker: Seeker,
    guidance: GuidanceSolver,
    guided_rotation: Option<DQuat>,
    target: Option<TargetRef>,
    owner_exclusion: HashSet<BodyId>,

    /// 推進速度（m/s）
    speed: f64,
    /// 点火時の速度（m/s、上書き設定時は母機速度から導出）
    initial_speed: f64,
    /// 投下中の速度ベクトル（m/s）
    drop_velocity: DVec3,
    /// 発射時に継承した速度ベクトル（m/s）
    launch_velocity: DVec3,
    launch_time: f64,
    activate_time: f64,
    end_reason: Option<MissileEndReason>,
}

impl Missile {
    /// 懸架状態のミサイルを作成
    ///
    /// # 引数
    ///
    /// * `id` - ミサイルの一意識別子
    /// * `profile` - 性能諸元
    /// * `pose` - 初期姿勢（ワールド）
    /// * `owner_exclusion` - 衝突を無視するボディ（生成後は不変）
    pub fn new(
        id: String,
        profile: MissileProfile,
        pose: Pose,
        owner_exclusion: HashSet<BodyId>,
    ) -> Self {
        let seeker = Seeker::new(profile.seeker_cone_deg, profile.seeker_range_m);
        let guidance = GuidanceSolver::new(profile.guidance);
        let initial_speed = profile.initial_speed_mps;

        Self {
            id,
            profile,
            pose,
            previous_position: pose.position,
            phase: MissilePhase::Mounted,
            motor_active: false,
            seeker,
            guidance,
            guided_rotation: None,
            target: None,
            owner_exclusion,
            speed: 0.0,
            initial_speed,
            drop_velocity: DVec3::ZERO,
            launch_velocity: DVec3::ZERO,
            launch_time: 0.0,
            activate_time: 0.0,
            end_reason: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self) -> &MissileProfile {
        &self.profile
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// このティックの移動開始位置
    pub fn previous_position(&self) -> DVec3 {
        self.previous_position
    }

    pub fn phase(&self) -> MissilePhase {
        self.phase
    }

    pub fn is_launched(&self) -> bool {
        self.phase != MissilePhase::Mounted
    }

    pub fn is_active(&self) -> bool {
        self.phase == MissilePhase::Active
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == MissilePhase::Destroyed
    }

    /// 発射済みかつ未破壊
    pub fn is_in_flight(&self) -> bool {
        matches!(self.phase, MissilePhase::Dropping | MissilePhase::Active)
    }

    pub fn is_motor_active(&self) -> bool {
        self.motor_active
    }

    pub fn is_tracking(&self) -> bool {
        self.seeker.is_tracking()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn initial_speed(&self) -> f64 {
        self.initial_speed
    }

    /// 投下中の速度ベクトル
    pub fn drop_velocity(&self) -> DVec3 {
        self.drop_velocity
    }

    pub fn target(&self) -> Option<TargetRef> {
        self.target
    }

    pub fn launch_time(&self) -> f64 {
        self.launch_time
    }

    pub fn activate_time(&self) -> f64 {
        self.activate_time
    }

    pub fn end_reason(&self) -> Option<MissileEndReason> {
        self.end_reason
    }

    pub fn radius(&self) -> f64 {
        self.profile.radius_m
    }

    /// 衝突を無視するボディかどうか
    pub fn ignores(&self, body: BodyId) -> bool {
        self.owner_exclusion.contains(&body)
    }

    /// 懸架中の姿勢を更新（発射後は無視）
    pub fn set_mounted_pose(&mut self, pose: Pose) {
        if self.phase == MissilePhase::Mounted {
            self.pose = pose;
            self.previous_position = pose.position;
        }
    }

    /// ミサイルを発射
    ///
    /// 既に発射済みの場合は何もせずfalseを返します。
    /// ターゲットが無い場合は無誘導で飛翔します。
    ///
    /// # 引数
    ///
    /// * `target` - 追尾対象（弱参照）
    /// * `inherited_velocity` - 母機から継承する速度
    /// * `ctx` - 時計・ターゲット解決・演出
    pub fn launch(
        &mut self,
        target: Option<TargetRef>,
        inherited_velocity: DVec3,
        ctx: &mut FlightContext<'_>,
    ) -> bool {
        if self.phase != MissilePhase::Mounted {
            trace!(missile_id = %self.id, phase = ?self.phase, "MISSILE_LAUNCH_IGNORED: 発射済みのミサイルです");
            return false;
        }

        self.launch_time = ctx.clock.now();
        self.target = target;
        self.launch_velocity = inherited_velocity;
        if target.is_none() {
            self.seeker.lose_track();
        }

        info!(
            missile_id = %self.id,
            launch_position_x = self.pose.position.x,
            launch_position_y = self.pose.position.y,
            launch_position_z = self.pose.position.z,
            guided = target.is_some(),
            guidance = ?self.profile.guidance,
            drop_delay = self.profile.drop_delay_s,
            launch_time = self.launch_time,
            "MISSILE_LAUNCHED: ミサイルが発射されました"
        );

        if self.profile.drop_delay_s > 0.0 {
            self.phase = MissilePhase::Dropping;
            self.drop_velocity =
                inherited_velocity + self.pose.transform_direction(self.profile.eject_velocity_mps);

            debug!(
                missile_id = %self.id,
                drop_velocity_x = self.drop_velocity.x,
                drop_velocity_y = self.drop_velocity.y,
                drop_velocity_z = self.drop_velocity.z,
                gravity = self.profile.gravity,
                "MISSILE_DROP: ミサイルが投下されました"
            );
        } else {
            self.activate(ctx);
        }

        true
    }

    /// モーター点火
    fn activate(&mut self, ctx: &mut FlightContext<'_>) {
        if self.profile.override_initial_speed {
            // 投下後は自由落下速度、レール発射時は継承速度の前方成分
            let reference = if self.profile.drop_delay_s > 0.0 {
                self.drop_velocity
            } else {
                self.launch_velocity
            };
            self.initial_speed = self.pose.inverse_transform_direction(reference).z;
        }

        let now = ctx.clock.now();
        self.drop_velocity = DVec3::ZERO;
        self.phase = MissilePhase::Active;
        self.motor_active = true;
        self.activate_time = now;
        self.speed = self.initial_speed;

        if let Some(position) = self.target.and_then(|t| ctx.targets.target_position(t)) {
            self.guidance.seed(position, now);
        }

        ctx.effects.emit(EffectEvent::MotorIgnited {
            missile_id: self.id.clone(),
            position: self.pose.position,
        });

        info!(
            missile_id = %self.id,
            initial_speed = self.initial_speed,
            activate_time = now,
            time_since_launch = now - self.launch_time,
            "MISSILE_IGNITION: ミサイルのモーターが点火しました"
        );
    }

    /// 1ティック分の更新（誘導 → 推進 → 移動 → 寿命判定）
    pub fn update(&mut self, ctx: &mut FlightContext<'_>) {
        if !self.is_in_flight() {
            return;
        }

        let now = ctx.clock.now();
        let dt = ctx.clock.delta_time();
        self.previous_position = self.pose.position;

        if self.phase == MissilePhase::Active {
            self.update_guidance(ctx, now);
        }

        if self.phase == MissilePhase::Dropping {
            if now - self.launch_time >= self.profile.drop_delay_s {
                self.activate(ctx);
            } else {
                if self.profile.gravity {
                    self.drop_velocity += ctx.gravity * dt;
                }
                self.pose.position += self.drop_velocity * dt;
            }
        }

        if self.phase == MissilePhase::Active {
            self.update_motor(ctx, now);

            if self.motor_active {
                self.speed += self.profile.acceleration_mps2 * dt;
            }

            if self.seeker.is_tracking() {
                if let Some(guided) = self.guided_rotation {
                    let max_step = self.profile.turn_rate_deg_s.to_radians() * dt;
                    self.pose.rotation = math_utils::rotate_towards(self.pose.rotation, guided, max_step);
                }
            }

            self.pose.position += self.pose.forward() * self.speed * dt;
        }

        if now - self.launch_time >= self.profile.time_to_live_s {
            self.destroy(false, ctx);
        }
    }

    /// シーカー判定と目標姿勢の計算
    fn update_guidance(&mut self, ctx: &mut FlightContext<'_>, now: f64) {
        let Some(target) = self.target else {
            return;
        };
        if !self.seeker.is_tracking() {
            return;
        }

        let Some(target_position) = ctx.targets.target_position(target) else {
            self.seeker.lose_track();
            info!(
                missile_id = %self.id,
                reason = "target_gone",
                "MISSILE_TRACK_LOST: ターゲットが消滅したため追尾を終了しました"
            );
            return;
        };

        if !self
            .seeker
            .observe(self.pose.position, self.pose.forward(), target_position)
        {
            info!(
                missile_id = %self.id,
                reason = "seeker_limits",
                distance = self.pose.position.distance(target_position),
                angle_deg = math_utils::angle_deg(self.pose.forward(), target_position - self.pose.position),
                cone_deg = self.profile.seeker_cone_deg,
                range_m = self.profile.seeker_range_m,
                "MISSILE_TRACK_LOST: ターゲットがシーカー視野外に出ました"
            );
            return;
        }

        let params = LeadParameters {
            initial_speed: self.initial_speed,
            current_speed: self.speed,
            acceleration: self.profile.acceleration_mps2,
            motor_lifetime: self.profile.motor_lifetime_s,
            time_since_activation: now - self.activate_time,
            time_to_live: self.profile.time_to_live_s,
        };
        self.guided_rotation = Some(self.guidance.solve(
            &self.pose,
            target_position,
            now,
            self.profile.seeker_cone_deg,
            &params,
        ));
    }

    /// モーター燃焼状態の更新（燃焼終了後は再点火しない）
    fn update_motor(&mut self, ctx: &mut FlightContext<'_>, now: f64) {
        let lifetime = self.profile.motor_lifetime_s;
        let burning = lifetime <= 0.0 || now - self.activate_time < lifetime;

        if self.motor_active && !burning {
            self.motor_active = false;
            debug!(
                missile_id = %self.id,
                speed = self.speed,
                burn_time = now - self.activate_time,
                "MISSILE_BURNOUT: モーターの燃焼が終了しました"
            );
            if !self.profile.effects.trail_always_on {
                ctx.effects.emit(EffectEvent::TrailDetached {
                    missile_id: self.id.clone(),
                });
            }
        }
    }

    /// 衝突処理
    ///
    /// 発射から投下遅延が経過する前の衝突は無視されます（母機・レールとの干渉防止）。
    ///
    /// # 戻り値
    ///
    /// 衝突によって破壊された場合はtrue
    pub fn handle_collision(&mut self, body: BodyId, ctx: &mut FlightContext<'_>) -> bool {
        if !self.is_in_flight() || self.ignores(body) {
            return false;
        }

        let since_launch = ctx.clock.now() - self.launch_time;
        if since_launch < self.profile.drop_delay_s {
            trace!(
                missile_id = %self.id,
                body = body.0,
                since_launch,
                "MISSILE_COLLISION_IGNORED: 投下遅延中の衝突を無視しました"
            );
            return false;
        }

        self.destroy(true, ctx);
        true
    }

    /// 破壊（1回限り）
    fn destroy(&mut self, impact: bool, ctx: &mut FlightContext<'_>) {
        if self.phase == MissilePhase::Destroyed {
            return;
        }

        self.phase = MissilePhase::Destroyed;
        self.motor_active = false;
        self.end_reason = Some(if impact {
            MissileEndReason::Impact
        } else {
            MissileEndReason::Expired
        });

        if impact || self.profile.effects.explode_on_self_destruct {
            ctx.effects.emit(EffectEvent::Explosion {
                missile_id: self.id.clone(),
                position: self.pose.position,
                impact,
            });
        }

        let flight_time = ctx.clock.now() - self.launch_time;
        if impact {
            info!(
                missile_id = %self.id,
                position_x = self.pose.position.x,
                position_y = self.pose.position.y,
                position_z = self.pose.position.z,
                speed = self.speed,
                flight_time,
                "MISSILE_IMPACT: ミサイルが衝突しました"
            );
        } else {
            info!(
                missile_id = %self.id,
                position_x = self.pose.position.x,
                position_y = self.pose.position.y,
                position_z = self.pose.position.z,
                flight_time,
                "MISSILE_EXPIRED: ミサイルが寿命切れで自爆しました"
            );
        }
    }
}
