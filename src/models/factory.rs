use std::collections::HashSet;

use tracing::{debug, info};

use crate::models::{
    collision::BodyId,
    common::Pose,
    missile::{Missile, MissileProfile},
    traits::MunitionFactory,
};

/// ミサイル生成器
///
/// 一つのランチャーに紐づき、同じ性能諸元・衝突除外セットのミサイルを生成します。
/// IDは`<prefix>-<連番>`形式です。
#[derive(Debug, Clone)]
pub struct MissileFactory {
    id_prefix: String,
    profile_name: String,
    profile: MissileProfile,
    owner_exclusion: HashSet<BodyId>,
    spawned: u32,
}

impl MissileFactory {
    /// 生成器を作成
    ///
    /// # 引数
    ///
    /// * `id_prefix` - ミサイルIDの接頭辞（通常はランチャーID）
    /// * `profile_name` - 性能諸元の名前（ログ用）
    /// * `profile` - 性能諸元
    /// * `owner_exclusion` - 生成するミサイルが衝突を無視するボディ
    pub fn new(
        id_prefix: impl Into<String>,
        profile_name: impl Into<String>,
        profile: MissileProfile,
        owner_exclusion: HashSet<BodyId>,
    ) -> Self {
        let id_prefix = id_prefix.into();
        let profile_name = profile_name.into();

        if profile.attach_point.is_none() {
            info!(
                launcher_id = %id_prefix,
                profile = %profile_name,
                "MISSILE_NO_ATTACH_POINT: 懸架点が未設定のためミサイル原点で懸架します"
            );
        }

        Self {
            id_prefix,
            profile_name,
            profile,
            owner_exclusion,
            spawned: 0,
        }
    }

    pub fn profile(&self) -> &MissileProfile {
        &self.profile
    }

    /// これまでに生成した数
    pub fn spawned_count(&self) -> u32 {
        self.spawned
    }
}

impl MunitionFactory for MissileFactory {
    fn spawn(&mut self, pose: Pose) -> Missile {
        self.spawned += 1;
        let id = format!("{}-{:03}", self.id_prefix, self.spawned);

        debug!(
            missile_id = %id,
            profile = %self.profile_name,
            position_x = pose.position.x,
            position_y = pose.position.y,
            position_z = pose.position.z,
            "MISSILE_SPAWNED: ミサイルを懸架しました"
        );

        Missile::new(id, self.profile.clone(), pose, self.owner_exclusion.clone())
    }

    fn mount_offset(&self) -> Pose {
        self.profile
            .attach_point
            .map(|attach| attach.pose().inverse())
            .unwrap_or(Pose::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::missile::{AttachPoint, MissilePhase};
    use glam::DVec3;

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let mut factory = MissileFactory::new(
            "L1",
            "aim",
            MissileProfile::default(),
            HashSet::from([BodyId(3)]),
        );
        let a = factory.spawn(Pose::IDENTITY);
        let b = factory.spawn(Pose::IDENTITY);

        assert_eq!(a.id(), "L1-001");
        assert_eq!(b.id(), "L1-002");
        assert_eq!(a.phase(), MissilePhase::Mounted);
        assert!(b.ignores(BodyId(3)));
        assert_eq!(factory.spawned_count(), 2);
    }

    #[test]
    fn test_attach_point_aligns_with_launch_point() {
        let profile = MissileProfile {
            attach_point: Some(AttachPoint {
                offset_m: DVec3::new(0.0, 0.2, 1.0),
                euler_deg: [0.0, 0.0, 0.0],
            }),
            ..MissileProfile::default()
        };
        let factory = MissileFactory::new("L1", "aim", profile.clone(), HashSet::new());

        let launch_point = Pose::from_euler_deg(DVec3::new(5.0, 0.0, 0.0), [0.0, 90.0, 0.0]);
        let missile_pose = launch_point.compose(&factory.mount_offset());

        // 懸架点のワールド位置が発射点と一致する
        let attach_world = missile_pose.transform_point(DVec3::new(0.0, 0.2, 1.0));
        assert!((attach_world - launch_point.position).length() < 1e-9);
    }

    #[test]
    fn test_missing_attach_point_uses_origin() {
        let factory = MissileFactory::new("L1", "aim", MissileProfile::default(), HashSet::new());
        assert_eq!(factory.mount_offset(), Pose::IDENTITY);
    }
}
