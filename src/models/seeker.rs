use glam::DVec3;

use crate::models::common::math_utils;

/// シーカー視野の幾何判定
///
/// 自機前方ベクトルとターゲット方向の符号なし角度がシーカーコーン以内で、
/// かつ距離が探知距離以内であればtrueを返します。
///
/// # 引数
///
/// * `own_position` - 自機位置
/// * `own_forward` - 自機前方ベクトル
/// * `target_position` - ターゲット位置
/// * `cone_deg` - シーカーコーン半角（度）
/// * `range_limit` - 探知距離（m）
pub fn can_track(
    own_position: DVec3,
    own_forward: DVec3,
    target_position: DVec3,
    cone_deg: f64,
    range_limit: f64,
) -> bool {
    let relative = target_position - own_position;
    let angle = math_utils::angle_deg(own_forward, relative);
    let distance = relative.length();

    angle <= cone_deg && distance <= range_limit
}

/// シーカーモデル
///
/// 一度ロストしたターゲットはその飛翔中に二度と再捕捉しない（一方向ラッチ）。
#[derive(Debug, Clone, PartialEq)]
pub struct Seeker {
    /// シーカーコーン半角（度）
    pub cone_deg: f64,
    /// 探知距離（m）
    pub range_m: f64,
    tracking: bool,
}

impl Seeker {
    pub fn new(cone_deg: f64, range_m: f64) -> Self {
        Self {
            cone_deg,
            range_m,
            tracking: true,
        }
    }

    /// 追尾中かどうか
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// ターゲットを観測し、追尾状態を返す
    ///
    /// 視野外・射程外になった時点でラッチが落ち、以降は常にfalseを返します。
    pub fn observe(&mut self, own_position: DVec3, own_forward: DVec3, target_position: DVec3) -> bool {
        if self.tracking
            && !can_track(own_position, own_forward, target_position, self.cone_deg, self.range_m)
        {
            self.tracking = false;
        }
        self.tracking
    }

    /// 追尾を強制的に失う（ターゲット消滅・未指定）
    pub fn lose_track(&mut self) {
        self.tracking = false;
    }
}
