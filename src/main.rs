use std::str::FromStr;

use arcmissile::logging::{init_logging, level_for_verbosity, parse_log_level, LogConfig, LogOutput};
use arcmissile::scenario::ScenarioConfig;
use arcmissile::simulation::{SimulationEngine, SimulationStats};
use clap::{Arg, ArgMatches, Command};

const DEMO_SCENARIO: &str = include_str!("../scenarios/drone_duel.yaml");

fn main() {
    let matches = Command::new("arcmissile")
        .version("0.1.0")
        .about("誘導ミサイル・ランチャーシミュレーション (Arcade Missile Simulation)")
        .long_about(
            "ドローン空戦向けのミサイル飛翔・誘導とランチャー弾薬モデルのシミュレーション\n\
             固定時間刻みでシナリオを実行し、発射・命中・自爆をログに記録します。",
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("test"),
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みのデモ交戦を実行")
                .conflicts_with("info"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: DEBUG, -vv: TRACE)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .help("ログレベル (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .default_value("console")
                .help("ログ出力先 (console, file, both)"),
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");
    let _log_guard = match setup_logging(&matches, verbose_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    println!("誘導ミサイルシミュレーション - arcmissile v0.1.0");
    println!();

    let result = if matches.get_flag("test") {
        println!("=== デモ交戦モード ===");
        run_demo(verbose_level)
    } else if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        run_scenario(scenario_path, matches.get_flag("info"), verbose_level)
    } else {
        show_default_help();
        Ok(())
    };

    if let Err(e) = result {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn setup_logging(
    matches: &ArgMatches,
    verbose_level: u8,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
    let level_str = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    let output_str = matches
        .get_one::<String>("log-output")
        .map(String::as_str)
        .unwrap_or("console");

    let config = LogConfig {
        level: level_for_verbosity(verbose_level, parse_log_level(level_str)),
        output: LogOutput::from_str(output_str)?,
        ..LogConfig::default()
    };
    init_logging(config)
}

/// シナリオファイルを読み込んで実行
fn run_scenario(
    scenario_path: &str,
    info_only: bool,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    if info_only {
        scenario.print_summary();
        return Ok(());
    }

    execute_scenario(scenario, verbose_level)
}

/// 組み込みのデモシナリオを実行
fn run_demo(verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_yaml_str(DEMO_SCENARIO)?;
    execute_scenario(scenario, verbose_level)
}

/// シナリオの実行
fn execute_scenario(
    scenario: ScenarioConfig,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    scenario.print_summary();
    println!();

    let mut simulation = SimulationEngine::new(scenario, verbose_level);
    simulation.initialize()?;
    let stats = simulation.run();

    print_stats(&simulation, &stats);
    Ok(())
}

fn print_stats(simulation: &SimulationEngine, stats: &SimulationStats) {
    println!();
    println!("=== 実行結果 ===");
    println!("シミュレーション時間: {:.1}秒 ({}ステップ)", simulation.clock.time, stats.steps);
    println!("発射数: {}発", stats.missiles_launched);
    println!("命中: {}発", stats.impacts);
    println!("自爆: {}発", stats.expired);
    println!("撃破ターゲット: {}機", stats.targets_destroyed);
    println!("飛翔中: {}発", simulation.missiles.len());

    for carrier in &simulation.carriers {
        println!("母機 {}:", carrier.id());
        for counter in carrier.selector().ammo_counters(carrier.launchers()) {
            println!(
                "  {}: 残弾 {}発, 残り弾倉 {}",
                counter.group, counter.ammo, counter.magazines
            );
        }
    }
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  arcmissile [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>     シナリオファイルを指定して実行");
    println!("  -i, --info                シナリオ情報のみ表示");
    println!("  -t, --test                組み込みのデモ交戦を実行");
    println!("  -v, --verbose             詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-level <LEVEL>   ログレベル");
    println!("      --log-output <OUTPUT> ログ出力先 (console, file, both)");
    println!("  -h, --help                このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/drone_duel.yaml  - ハードポイント・ポッド搭載ドローンの交戦");
    println!();
    println!("例:");
    println!("  arcmissile -s scenarios/drone_duel.yaml");
    println!("  arcmissile -s scenarios/drone_duel.yaml -i");
    println!("  arcmissile --test --log-output both -v");
}
