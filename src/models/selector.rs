use std::collections::VecDeque;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{
    missile::Missile,
    target::TargetRef,
    traits::{FlightContext, Launcher},
};

/// 射撃モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FireMode {
    /// トリガーを押した瞬間に1発
    #[default]
    Single,
    /// トリガーを押している間は毎ティック
    Auto,
}

/// ランチャーグループ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub fire_mode: FireMode,
    /// 所属するランチャーID
    pub launchers: Vec<String>,
}

/// ランチャーグループ
///
/// 発射要求のたびに先頭のランチャーを末尾へ回します（発射の成否に関係なく）。
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherGroup {
    pub name: String,
    pub fire_mode: FireMode,
    members: VecDeque<usize>,
}

impl LauncherGroup {
    /// グループを作成
    ///
    /// `members`は母機のランチャー配列へのインデックスです。
    pub fn new(name: impl Into<String>, fire_mode: FireMode, members: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            fire_mode,
            members: members.into(),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }
}

/// グループ別の残弾表示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmmoCounter {
    pub group: String,
    pub ammo: u32,
    pub magazines: u32,
}

/// ランチャーセレクター
///
/// 操縦者（プレイヤーまたはAI）が使用するランチャーグループを切り替えます。
#[derive(Debug, Clone, Default)]
pub struct LauncherSelector {
    groups: Vec<LauncherGroup>,
    selected: usize,
}

impl LauncherSelector {
    pub fn new(groups: Vec<LauncherGroup>) -> Self {
        Self {
            groups,
            selected: 0,
        }
    }

    /// 設定からグループを解決
    ///
    /// 未知のランチャーIDは無視し、メンバーのいないグループは作成しません。
    /// グループ設定が無い場合はランチャーごとに単発モードのグループを作成します。
    pub fn from_config(configs: &[GroupConfig], launchers: &[Box<dyn Launcher>]) -> Self {
        if configs.is_empty() {
            let groups = launchers
                .iter()
                .enumerate()
                .map(|(index, launcher)| LauncherGroup::new(launcher.id(), FireMode::Single, vec![index]))
                .collect();
            return Self::new(groups);
        }

        let mut groups = Vec::new();
        for config in configs {
            let mut members = Vec::new();
            for launcher_id in &config.launchers {
                match launchers.iter().position(|l| l.id() == launcher_id.as_str()) {
                    Some(index) => members.push(index),
                    None => warn!(
                        group = %config.name,
                        launcher_id = %launcher_id,
                        "SELECTOR_UNKNOWN_LAUNCHER: グループに未知のランチャーが指定されています"
                    ),
                }
            }

            if members.is_empty() {
                warn!(group = %config.name, "SELECTOR_EMPTY_GROUP: メンバーのいないグループを無視します");
                continue;
            }
            groups.push(LauncherGroup::new(config.name.clone(), config.fire_mode, members));
        }

        Self::new(groups)
    }

    pub fn groups(&self) -> &[LauncherGroup] {
        &self.groups
    }

    /// 選択中のグループ
    pub fn selected_group(&self) -> Option<&LauncherGroup> {
        self.groups.get(self.selected)
    }

    /// 次のグループへ切り替え
    pub fn cycle_group(&mut self) {
        if self.groups.is_empty() {
            return;
        }

        self.selected = (self.selected + 1) % self.groups.len();
        info!(
            group = %self.groups[self.selected].name,
            fire_mode = ?self.groups[self.selected].fire_mode,
            "SELECTOR_GROUP_CHANGED: ランチャーグループを切り替えました"
        );
    }

    /// トリガー入力から発射要求を判定
    ///
    /// # 引数
    ///
    /// * `pressed` - このティックで押された
    /// * `held` - 押し続けている
    pub fn should_fire(&self, pressed: bool, held: bool) -> bool {
        match self.selected_group().map(|g| g.fire_mode) {
            Some(FireMode::Single) => pressed,
            Some(FireMode::Auto) => held,
            None => false,
        }
    }

    /// 選択中のグループから1発発射
    ///
    /// グループ内の先頭ランチャーに発射を依頼し、成否に関係なく末尾へ回します。
    pub fn fire(
        &mut self,
        launchers: &mut [Box<dyn Launcher>],
        target: Option<TargetRef>,
        inherited_velocity: DVec3,
        ctx: &mut FlightContext<'_>,
    ) -> Option<Missile> {
        let group = self.groups.get_mut(self.selected)?;
        let index = group.members.pop_front()?;
        group.members.push_back(index);

        launchers
            .get_mut(index)?
            .launch(target, inherited_velocity, ctx)
    }

    /// 全ランチャーを初期状態に戻す
    pub fn reset_all(&self, launchers: &mut [Box<dyn Launcher>]) {
        for launcher in launchers.iter_mut() {
            launcher.reset_launcher();
        }
    }

    /// グループ別の残弾・残り弾倉
    pub fn ammo_counters(&self, launchers: &[Box<dyn Launcher>]) -> Vec<AmmoCounter> {
        self.groups
            .iter()
            .map(|group| {
                let members = group.members().filter_map(|index| launchers.get(index));
                let (ammo, magazines) = members.fold((0, 0), |(ammo, magazines), launcher| {
                    (
                        ammo + launcher.ammo_remaining(),
                        magazines + launcher.magazines_remaining(),
                    )
                });
                AmmoCounter {
                    group: group.name.clone(),
                    ammo,
                    magazines,
                }
            })
            .collect()
    }
}
