//! 演出（エフェクト・サウンド）への通知
//!
//! コアは演出の状態を持たず、イベントを通知するだけです。

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// ミサイルごとの演出設定
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsProfile {
    /// falseの場合、モーター燃焼終了時にトレイルを切り離す
    pub trail_always_on: bool,
    /// 寿命切れ（非命中）の自爆時にも爆発を再生する
    pub explode_on_self_destruct: bool,
}

impl Default for EffectsProfile {
    fn default() -> Self {
        Self {
            trail_always_on: true,
            explode_on_self_destruct: false,
        }
    }
}

/// 演出イベント
#[derive(Debug, Clone, PartialEq)]
pub enum EffectEvent {
    /// モーター点火（トレイル開始・噴射音）
    MotorIgnited { missile_id: String, position: DVec3 },
    /// モーター燃焼終了によるトレイル切り離し
    TrailDetached { missile_id: String },
    /// 爆発
    Explosion {
        missile_id: String,
        position: DVec3,
        impact: bool,
    },
    /// ランチャー発射音
    LauncherFired { launcher_id: String, position: DVec3 },
}

/// 演出イベントの受け口
pub trait EffectsSink {
    fn emit(&mut self, event: EffectEvent);
}

/// イベントを記録するだけのシンク
#[derive(Debug, Default)]
pub struct EffectLog {
    pub events: Vec<EffectEvent>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_explosions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EffectEvent::Explosion { .. }))
            .count()
    }
}

impl EffectsSink for EffectLog {
    fn emit(&mut self, event: EffectEvent) {
        self.events.push(event);
    }
}
