use std::collections::{HashMap, HashSet};

use glam::DVec3;

use crate::models::missile::Missile;
use crate::models::traits::CollisionExclusion;

/// 物理ボディの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

/// 発射母機（所有者）の識別子
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(pub String);

/// 球形の衝突ボディ
#[derive(Debug, Clone, Copy)]
pub struct SphereBody {
    pub id: BodyId,
    pub position: DVec3,
    pub radius: f64,
}

/// 所有者ごとのボディ登録表
#[derive(Debug, Default)]
pub struct OwnerRegistry {
    owners: HashMap<OwnerId, Vec<BodyId>>,
}

impl OwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, owner: OwnerId, body: BodyId) {
        self.owners.entry(owner).or_default().push(body);
    }
}

impl CollisionExclusion for OwnerRegistry {
    fn bodies_of(&self, owner: &OwnerId) -> Vec<BodyId> {
        self.owners.get(owner).cloned().unwrap_or_default()
    }
}

/// 所有者から除外セットを作成（未指定なら空）
pub fn exclusion_set(
    exclusion: &dyn CollisionExclusion,
    owner: Option<&OwnerId>,
) -> HashSet<BodyId> {
    owner
        .map(|o| exclusion.bodies_of(o).into_iter().collect())
        .unwrap_or_default()
}

/// 飛翔中のミサイルとボディの接触を検出
///
/// 1ティックの移動区間（直前位置から現在位置までの線分）と球で判定するため、
/// 高速弾がボディをすり抜けることはありません。
/// ミサイルごとに区間上で最も手前のボディを1つだけ返します。
/// 除外セットに含まれるボディは無視されます。
pub fn find_contacts(missiles: &[Missile], bodies: &[SphereBody]) -> Vec<(usize, BodyId)> {
    let mut contacts = Vec::new();

    for (index, missile) in missiles.iter().enumerate() {
        if !missile.is_in_flight() {
            continue;
        }
        let start = missile.previous_position();
        let end = missile.pose().position;
        let hit = bodies
            .iter()
            .filter(|body| !missile.ignores(body.id))
            .filter_map(|body| {
                sweep_sphere(start, end, body.position, body.radius + missile.radius())
                    .map(|t| (t, body.id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((_, body)) = hit {
            contacts.push((index, body));
        }
    }

    contacts
}

/// 線分`start`→`end`と球の最近接判定
///
/// 接触する場合は線分上の最近接点のパラメータ（0.0〜1.0）を返します。
fn sweep_sphere(start: DVec3, end: DVec3, center: DVec3, radius: f64) -> Option<f64> {
    let segment = end - start;
    let length_sq = segment.length_squared();
    let t = if length_sq > 0.0 {
        ((center - start).dot(segment) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = start + segment * t;
    (closest.distance(center) <= radius).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_registry_lookup() {
        let mut registry = OwnerRegistry::new();
        let owner = OwnerId("C001".to_string());
        registry.register(owner.clone(), BodyId(1));
        registry.register(owner.clone(), BodyId(2));

        let set = exclusion_set(&registry, Some(&owner));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&BodyId(2)));

        assert!(exclusion_set(&registry, None).is_empty());
        assert!(exclusion_set(&registry, Some(&OwnerId("X".to_string()))).is_empty());
    }

    #[test]
    fn test_sweep_catches_body_between_samples() {
        let center = DVec3::new(0.0, 0.0, 507.0);
        let start = DVec3::new(0.0, 0.0, 504.0);
        let end = DVec3::new(0.0, 0.0, 510.0);

        // 両端点はどちらも半径2.5の外
        assert!(start.distance(center) > 2.5);
        assert!(end.distance(center) > 2.5);
        let t = sweep_sphere(start, end, center, 2.5).unwrap();
        assert!((t - 0.5).abs() < 1e-9);

        assert!(sweep_sphere(start, end, DVec3::new(3.0, 0.0, 507.0), 2.5).is_none());
        assert!(sweep_sphere(end, end, DVec3::new(0.0, 0.0, 511.0), 2.5).is_some());
        assert!(sweep_sphere(start, end, DVec3::new(0.0, 0.0, 513.0), 2.5).is_none());
    }
}
