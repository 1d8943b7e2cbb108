//! # Simulation モジュール
//!
//! ミサイル交戦シミュレーションのエンジンを提供します。
//!
//! 固定時間刻み（Δt）で全エンティティを1回ずつ更新します。
//! タイマーはすべてティックごとに減算するだけなので、同じシードとシナリオからは
//! 常に同じ結果が得られます。
//!
//! ## シミュレーション処理順序
//!
//! 1. **ターゲット処理**: ドローンの移動
//! 2. **母機処理**: 旋回・移動、ランチャーの再装填、自動射撃
//! 3. **ミサイル処理**: 誘導計算（シーカー判定 → 目標姿勢）、推進、移動、寿命判定
//! 4. **接触処理**: 球同士の近接判定、命中処理、ターゲットの除去
//!
//! ## 使用例
//!
//! ```rust,no_run
//! use arcmissile::scenario::ScenarioConfig;
//! use arcmissile::simulation::SimulationEngine;
//!
//! let config = ScenarioConfig::from_file("scenarios/drone_duel.yaml")?;
//! let mut engine = SimulationEngine::new(config, 1);
//! engine.initialize()?;
//! let stats = engine.run();
//! println!("命中: {}", stats.impacts);
//! # Ok::<(), arcmissile::scenario::ScenarioError>(())
//! ```

use glam::DVec3;
use hecs::World;
use tracing::{debug, info, trace};

use crate::models::{
    carrier::Carrier,
    collision::{self, BodyId, OwnerId, OwnerRegistry},
    common::{Pose, SimClock},
    effects::EffectLog,
    factory::MissileFactory,
    launcher::build_launcher,
    missile::{Missile, MissileEndReason},
    target,
    traits::FlightContext,
};
use crate::scenario::{ScenarioConfig, ScenarioError};

/// 実行統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    pub steps: u64,
    pub missiles_launched: u32,
    pub impacts: u32,
    pub expired: u32,
    pub targets_destroyed: u32,
}

pub struct SimulationEngine {
    pub clock: SimClock,
    pub max_time: f64,
    pub seed: u64,
    pub gravity: DVec3,

    pub world: World,
    pub carriers: Vec<Carrier>,
    pub missiles: Vec<Missile>,
    pub effects: EffectLog,

    pub stats: SimulationStats,
    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        Self {
            clock: SimClock::new(scenario.sim.dt_s),
            max_time: scenario.sim.t_max_s,
            seed: scenario.sim.seed,
            gravity: scenario.world.gravity_mps2,
            world: World::new(),
            carriers: Vec::new(),
            missiles: Vec::new(),
            effects: EffectLog::new(),
            stats: SimulationStats::default(),
            scenario_config: scenario,
            verbose_level,
        }
    }

    /// ターゲット・母機・ランチャーを生成
    pub fn initialize(&mut self) -> Result<(), ScenarioError> {
        let mut next_body = 1u32;
        let mut registry = OwnerRegistry::new();

        for target_config in &self.scenario_config.targets {
            target::spawn_drone(&mut self.world, target_config, BodyId(next_body));
            next_body += 1;
        }

        let mut launcher_index = 0u64;
        for (carrier_index, carrier_config) in self.scenario_config.carriers.iter().enumerate() {
            let body = BodyId(next_body);
            next_body += 1;

            let owner = OwnerId(carrier_config.id.clone());
            registry.register(owner.clone(), body);
            let exclusion = collision::exclusion_set(&registry, Some(&owner));
            let mount_pose = Pose::from_euler_deg(carrier_config.position_m, carrier_config.euler_deg);

            let mut launchers = Vec::with_capacity(carrier_config.launchers.len());
            for launcher_config in &carrier_config.launchers {
                let profile = self
                    .scenario_config
                    .missiles
                    .get(&launcher_config.missile)
                    .ok_or_else(|| ScenarioError::UnknownMissile {
                        launcher: launcher_config.id.clone(),
                        missile: launcher_config.missile.clone(),
                    })?;

                let factory = MissileFactory::new(
                    launcher_config.id.clone(),
                    launcher_config.missile.clone(),
                    profile.clone(),
                    exclusion.clone(),
                );
                launchers.push(build_launcher(
                    launcher_config,
                    factory,
                    Some(&owner),
                    mount_pose,
                    self.seed.wrapping_add(launcher_index),
                ));
                launcher_index += 1;
            }

            let target_ref = match &carrier_config.target {
                Some(name) => Some(target::find_target(&self.world, name).ok_or_else(|| {
                    ScenarioError::UnknownTarget {
                        carrier: carrier_config.id.clone(),
                        target: name.clone(),
                    }
                })?),
                None => None,
            };

            let carrier_seed = self.seed.wrapping_add(1000 + carrier_index as u64);
            self.carriers.push(Carrier::new(
                carrier_config,
                body,
                target_ref,
                launchers,
                carrier_seed,
            ));

            if self.verbose_level > 1 {
                debug!(
                    carrier_id = %carrier_config.id,
                    launchers = carrier_config.launchers.len(),
                    "母機初期化"
                );
            }
        }

        info!(
            targets = self.world.len(),
            carriers = self.carriers.len(),
            launchers = launcher_index,
            "SIMULATION_INITIALIZED: シミュレーションを初期化しました"
        );

        Ok(())
    }

    /// 最大時間まで実行
    pub fn run(&mut self) -> SimulationStats {
        info!(
            scenario = %self.scenario_config.meta.name,
            dt = self.clock.dt,
            max_time = self.max_time,
            seed = self.seed,
            "SIMULATION_STARTED: シミュレーション実行開始"
        );

        while self.clock.time < self.max_time {
            self.step();

            if self.verbose_level > 0 && self.stats.steps % 500 == 0 {
                let progress = (self.clock.time / self.max_time) * 100.0;
                info!(
                    "進行状況: {:.1}% ({:.1}/{:.1}秒) 飛翔中ミサイル: {}",
                    progress,
                    self.clock.time,
                    self.max_time,
                    self.missiles.len()
                );
            }
        }

        info!(
            time = self.clock.time,
            steps = self.stats.steps,
            launched = self.stats.missiles_launched,
            impacts = self.stats.impacts,
            expired = self.stats.expired,
            targets_destroyed = self.stats.targets_destroyed,
            "SIMULATION_COMPLETED: シミュレーション完了"
        );

        self.stats.clone()
    }

    /// 1ティック進める
    pub fn step(&mut self) {
        target::move_drones(&mut self.world, self.clock.dt);
        self.process_carriers();
        self.process_missiles();
        self.process_contacts();

        self.clock.advance();
        self.stats.steps += 1;
    }

    fn process_carriers(&mut self) {
        let dt = self.clock.dt;
        for carrier in self.carriers.iter_mut() {
            carrier.update(&self.world, dt);
        }

        let mut ctx = FlightContext {
            clock: &self.clock,
            targets: &self.world,
            effects: &mut self.effects,
            gravity: self.gravity,
        };
        for carrier in self.carriers.iter_mut() {
            if let Some(missile) = carrier.try_auto_fire(&mut ctx) {
                self.stats.missiles_launched += 1;
                self.missiles.push(missile);
            }
        }
    }

    fn process_missiles(&mut self) {
        let mut ctx = FlightContext {
            clock: &self.clock,
            targets: &self.world,
            effects: &mut self.effects,
            gravity: self.gravity,
        };
        for missile in self.missiles.iter_mut() {
            missile.update(&mut ctx);
        }
    }

    fn process_contacts(&mut self) {
        let mut bodies = target::target_bodies(&self.world);
        bodies.extend(self.carriers.iter().map(Carrier::sphere));
        let contacts = collision::find_contacts(&self.missiles, &bodies);

        let mut hit_bodies = Vec::new();
        {
            let mut ctx = FlightContext {
                clock: &self.clock,
                targets: &self.world,
                effects: &mut self.effects,
                gravity: self.gravity,
            };
            for (index, body) in contacts {
                if self.missiles[index].handle_collision(body, &mut ctx) {
                    hit_bodies.push(body);
                }
            }
        }

        for body in hit_bodies {
            let Some((target_ref, target_body)) = target::target_by_body(&self.world, body) else {
                trace!(body = body.0, "母機への命中");
                continue;
            };
            if target_body.remove_on_hit && self.world.despawn(target_ref.0).is_ok() {
                self.stats.targets_destroyed += 1;
                info!(
                    body = body.0,
                    time = self.clock.time,
                    "TARGET_DESTROYED: ターゲットを除去しました"
                );
            }
        }

        for missile in self.missiles.iter().filter(|m| m.is_destroyed()) {
            match missile.end_reason() {
                Some(MissileEndReason::Impact) => self.stats.impacts += 1,
                Some(MissileEndReason::Expired) => self.stats.expired += 1,
                None => {}
            }
        }
        self.missiles.retain(|m| !m.is_destroyed());
    }
}
