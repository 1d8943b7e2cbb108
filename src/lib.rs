//! # arcmissile
//!
//! アーケード風空戦向けの誘導ミサイル・ランチャー弾薬モデルのシミュレーションライブラリ。
//!
//! - [`models`]: シーカー・誘導則・ミサイル状態機械・ランチャー（ハードポイント/ポッド）・セレクター
//! - [`scenario`]: YAMLシナリオの読み込みと検証
//! - [`simulation`]: 固定時間刻みのシミュレーションエンジン
//! - [`logging`]: tracingによるログ出力の初期化

pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
