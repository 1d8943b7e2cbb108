// 基本的なデータ型と数学ユーティリティ
pub mod common;

// 外部サービス・ランチャーの基本インターフェース（trait）定義
pub mod traits;

// 演出通知と衝突判定
pub mod effects;
pub mod collision;

// ターゲット（ECSワールド上のドローン）
pub mod target;

// ミサイルの飛翔・誘導
pub mod seeker;
pub mod guidance;
pub mod missile;
pub mod factory;

// ランチャー（弾薬モデル）と母機
pub mod launcher;
pub mod hardpoint;
pub mod pod;
pub mod selector;
pub mod carrier;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use effects::{EffectEvent, EffectLog, EffectsProfile, EffectsSink};
pub use collision::{BodyId, OwnerId, OwnerRegistry, SphereBody};
pub use target::{TargetConfig, TargetRef};
pub use seeker::Seeker;
pub use guidance::{GuidanceSolver, GuidanceType};
pub use missile::{AttachPoint, Missile, MissileEndReason, MissilePhase, MissileProfile};
pub use factory::MissileFactory;
pub use launcher::{LaunchPoint, LauncherConfig, LauncherKind};
pub use hardpoint::Hardpoint;
pub use pod::Pod;
pub use selector::{AmmoCounter, FireMode, GroupConfig, LauncherSelector};
pub use carrier::{AutoFireConfig, Carrier, CarrierConfig};
