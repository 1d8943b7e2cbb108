use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{CarrierConfig, LauncherKind, MissileProfile, TargetConfig};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
    #[serde(default)]
    pub seed: u64,
}

/// 世界設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    /// 重力加速度ベクトル（m/s²）
    #[serde(default = "default_gravity")]
    pub gravity_mps2: DVec3,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity_mps2: default_gravity(),
        }
    }
}

fn default_gravity() -> DVec3 {
    DVec3::new(0.0, -9.81, 0.0)
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    #[serde(default)]
    pub world: WorldConfig,
    /// 名前付きのミサイル性能諸元
    pub missiles: BTreeMap<String, MissileProfile>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub carriers: Vec<CarrierConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::Validation("dt_s must be positive".to_string()));
        }
        if self.sim.t_max_s <= 0.0 {
            return Err(ScenarioError::Validation("t_max_s must be positive".to_string()));
        }

        for (name, profile) in &self.missiles {
            validate_profile(name, profile)?;
        }

        let mut ids = HashSet::new();
        for target in &self.targets {
            if !ids.insert(target.id.as_str()) {
                return Err(ScenarioError::DuplicateId(target.id.clone()));
            }
            if target.radius_m <= 0.0 {
                return Err(ScenarioError::Validation(format!(
                    "target {} radius_m must be positive",
                    target.id
                )));
            }
        }

        for carrier in &self.carriers {
            if !ids.insert(carrier.id.as_str()) {
                return Err(ScenarioError::DuplicateId(carrier.id.clone()));
            }
            if let Some(target) = &carrier.target {
                if !self.targets.iter().any(|t| &t.id == target) {
                    return Err(ScenarioError::UnknownTarget {
                        carrier: carrier.id.clone(),
                        target: target.clone(),
                    });
                }
            }
            if let Some(auto_fire) = &carrier.auto_fire {
                if auto_fire.min_wait_s < 0.0 || auto_fire.max_wait_s < auto_fire.min_wait_s {
                    return Err(ScenarioError::Validation(format!(
                        "carrier {} auto_fire wait range is invalid",
                        carrier.id
                    )));
                }
            }

            for launcher in &carrier.launchers {
                if !ids.insert(launcher.id.as_str()) {
                    return Err(ScenarioError::DuplicateId(launcher.id.clone()));
                }
                if !self.missiles.contains_key(&launcher.missile) {
                    return Err(ScenarioError::UnknownMissile {
                        launcher: launcher.id.clone(),
                        missile: launcher.missile.clone(),
                    });
                }
                if launcher.fire_delay_s < 0.0
                    || launcher.magazine_reload_s < 0.0
                    || launcher.dispersion_deg < 0.0
                {
                    return Err(ScenarioError::Validation(format!(
                        "launcher {} timings and dispersion must be non-negative",
                        launcher.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// ランチャーの総数
    pub fn launcher_count(&self) -> usize {
        self.carriers.iter().map(|c| c.launchers.len()).sum()
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒", self.sim.t_max_s);
        println!("シード値: {}", self.sim.seed);
        let g = self.world.gravity_mps2;
        println!("重力: ({:.2}, {:.2}, {:.2}) m/s²", g.x, g.y, g.z);
        println!();

        println!("=== ミサイル ===");
        for (name, profile) in &self.missiles {
            println!(
                "  {}: {:?} 誘導, 初速 {:.0}m/s, 燃焼 {:.1}秒, 寿命 {:.1}秒, 投下遅延 {:.1}秒",
                name,
                profile.guidance,
                profile.initial_speed_mps,
                profile.motor_lifetime_s,
                profile.time_to_live_s,
                profile.drop_delay_s
            );
        }
        println!();

        println!("=== 母機 ===");
        for carrier in &self.carriers {
            println!(
                "  {}: 速度 {:.0}m/s, ターゲット {}",
                carrier.id,
                carrier.speed_mps,
                carrier.target.as_deref().unwrap_or("なし")
            );
            for launcher in &carrier.launchers {
                let kind = match launcher.kind {
                    LauncherKind::Hardpoint => "ハードポイント",
                    LauncherKind::Pod => "ポッド",
                };
                println!(
                    "    {} ({}): {} × {}発, 弾倉 {}",
                    launcher.id, kind, launcher.missile, launcher.missile_count, launcher.magazine_count
                );
            }
        }
        println!();

        println!("=== ターゲット ===");
        println!("ターゲット数: {}機", self.targets.len());
        for target in &self.targets {
            println!(
                "  {}: 速度 {:.0}m/s, 旋回 {:.1}deg/s",
                target.id, target.speed_mps, target.turn_rate_deg_s
            );
        }
    }
}

/// ミサイル性能諸元の検証
fn validate_profile(name: &str, profile: &MissileProfile) -> Result<(), ScenarioError> {
    if !(profile.seeker_cone_deg > 0.0 && profile.seeker_cone_deg <= 180.0) {
        return Err(ScenarioError::Validation(format!(
            "missile {} seeker_cone_deg must be in (0, 180]",
            name
        )));
    }

    let timings = [
        ("seeker_range_m", profile.seeker_range_m),
        ("turn_rate_deg_s", profile.turn_rate_deg_s),
        ("time_to_live_s", profile.time_to_live_s),
        ("drop_delay_s", profile.drop_delay_s),
        ("radius_m", profile.radius_m),
    ];
    for (field, value) in timings {
        if value < 0.0 {
            return Err(ScenarioError::Validation(format!(
                "missile {} {} must be non-negative",
                name, field
            )));
        }
    }

    Ok(())
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),
    #[error("設定検証エラー: {0}")]
    Validation(String),
    #[error("ランチャー {launcher} が未定義のミサイル {missile} を参照しています")]
    UnknownMissile { launcher: String, missile: String },
    #[error("母機 {carrier} が未定義のターゲット {target} を参照しています")]
    UnknownTarget { carrier: String, target: String },
    #[error("IDが重複しています: {0}")]
    DuplicateId(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GuidanceType;

    const DEMO: &str = include_str!("../scenarios/drone_duel.yaml");

    fn minimal(extra: &str) -> String {
        format!(
            r#"
meta:
  version: "1.0"
  name: minimal
sim:
  dt_s: 0.1
  t_max_s: 10.0
missiles:
  aim:
    initial_speed_mps: 100.0
{extra}
"#
        )
    }

    #[test]
    fn test_bundled_scenario_parses() {
        let config = ScenarioConfig::from_yaml_str(DEMO).unwrap();
        assert!(!config.carriers.is_empty());
        assert!(!config.targets.is_empty());
        assert!(config.launcher_count() >= 2);
        assert!(config.missiles.values().any(|m| m.guidance == GuidanceType::Lead));
    }

    #[test]
    fn test_profile_defaults_apply() {
        let config = ScenarioConfig::from_yaml_str(&minimal("")).unwrap();
        let aim = &config.missiles["aim"];
        assert_eq!(aim.initial_speed_mps, 100.0);
        assert_eq!(aim.seeker_cone_deg, 45.0);
        assert_eq!(aim.guidance, GuidanceType::Pursuit);
        assert!(aim.effects.trail_always_on);
        assert_eq!(config.world.gravity_mps2, DVec3::new(0.0, -9.81, 0.0));
    }

    #[test]
    fn test_unknown_missile_rejected() {
        let yaml = minimal(
            r#"
carriers:
  - id: C1
    position_m: [0.0, 0.0, 0.0]
    launchers:
      - id: L1
        kind: hardpoint
        missile: nope
"#,
        );
        let err = ScenarioConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownMissile { .. }));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let yaml = minimal(
            r#"
carriers:
  - id: C1
    position_m: [0.0, 0.0, 0.0]
    target: ghost
"#,
        );
        let err = ScenarioConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownTarget { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = minimal(
            r#"
targets:
  - id: X
    position_m: [0.0, 0.0, 100.0]
carriers:
  - id: X
    position_m: [0.0, 0.0, 0.0]
"#,
        );
        let err = ScenarioConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ScenarioError::DuplicateId(id) if id == "X"));
    }

    #[test]
    fn test_invalid_seeker_cone_rejected() {
        let yaml = r#"
meta:
  version: "1.0"
  name: bad
sim:
  dt_s: 0.1
  t_max_s: 10.0
missiles:
  wide:
    seeker_cone_deg: 270.0
"#;
        let err = ScenarioConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ScenarioError::Validation(_)));
    }

    #[test]
    fn test_invalid_time_step_rejected() {
        let yaml = minimal("").replace("dt_s: 0.1", "dt_s: 0.0");
        assert!(matches!(
            ScenarioConfig::from_yaml_str(&yaml),
            Err(ScenarioError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ScenarioConfig::from_file("scenarios/does_not_exist.yaml").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
