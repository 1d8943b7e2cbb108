use glam::DVec3;

use crate::models::collision::{BodyId, OwnerId};
use crate::models::common::Pose;
use crate::models::effects::EffectsSink;
use crate::models::missile::Missile;
use crate::models::target::TargetRef;

/// シミュレーション時計のインターフェース
pub trait Clock {
    /// 現在のシミュレーション時刻（秒）
    fn now(&self) -> f64;

    /// 前回ティックからの経過時間（秒）
    fn delta_time(&self) -> f64;
}

/// 追尾対象の位置を解決するインターフェース
///
/// ミサイルはターゲットを所有せず、弱参照（`TargetRef`）だけを保持します。
/// 参照先が消滅している場合は`None`を返します。
pub trait TargetSource {
    fn target_position(&self, target: TargetRef) -> Option<DVec3>;
}

/// 衝突除外のインターフェース
pub trait CollisionExclusion {
    /// 所有者に属する物理ボディの一覧
    fn bodies_of(&self, owner: &OwnerId) -> Vec<BodyId>;
}

/// 弾体ファクトリのインターフェース
pub trait MunitionFactory: std::fmt::Debug {
    /// 指定姿勢で新しい弾体を生成（懸架状態）
    fn spawn(&mut self, pose: Pose) -> Missile;

    /// 懸架点に対する弾体原点のオフセット
    fn mount_offset(&self) -> Pose;
}

/// ミサイルの発射・更新時に渡される外部サービス
pub struct FlightContext<'a> {
    pub clock: &'a dyn Clock,
    pub targets: &'a dyn TargetSource,
    pub effects: &'a mut dyn EffectsSink,
    /// 重力加速度（m/s²）
    pub gravity: DVec3,
}

/// ランチャー（弾薬モデル）の共通インターフェース
///
/// ハードポイント型とポッド型の2種類の実装があります。
pub trait Launcher: std::fmt::Debug {
    /// ランチャーID
    fn id(&self) -> &str;

    /// 残弾数
    fn ammo_remaining(&self) -> u32;

    /// 残り弾倉数
    fn magazines_remaining(&self) -> u32;

    /// 現在発射可能かどうか
    fn can_launch(&self) -> bool;

    /// 1発発射する
    ///
    /// 発射できなかった場合は`None`（エラーではなく無視される）。
    /// 成功時は飛翔を開始したミサイルの所有権を呼び出し側へ渡します。
    fn launch(
        &mut self,
        target: Option<TargetRef>,
        inherited_velocity: DVec3,
        ctx: &mut FlightContext<'_>,
    ) -> Option<Missile>;

    /// 弾薬状態を初期値に戻す
    fn reset_launcher(&mut self);

    /// 再装填タイマーを進める
    fn tick(&mut self, dt: f64);

    /// 搭載母機のワールド姿勢を設定
    fn set_mount_pose(&mut self, pose: Pose);
}
