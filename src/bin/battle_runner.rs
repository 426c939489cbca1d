//! Headless Battle Runner
//!
//! Loads a ruleset and a scenario, resolves every engagement request in it
//! and prints the results as JSON or as a colored battle log. Optionally
//! replays one round as a terminal cutscene.

use std::path::{Path, PathBuf};
use std::time::Duration;

use army_battle::battle::cutscene::{CancelSignal, Completion, Cutscene, SystemClock};
use army_battle::battle::markup::{self, MarkupRole};
use army_battle::battle::{
    BattleGrid, BattleResult, Battlefield, EngagementRequest, Side, Terrain, UnitSnapshot, Winner,
};
use army_battle::core::{BattleRules, GridCoord, Result, UnitId};
use clap::{Parser, ValueEnum};
use crossterm::event::{self, Event, KeyCode};
use crossterm::style::Stylize;
use crossterm::terminal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Headless Battle Runner - resolve scenario engagements from the command line
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Resolve army engagements and print results or battle logs")]
struct Args {
    /// Rules file (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scenario file (JSON); a cavalry charge on archers when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Base seed; request i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Override the round limit of every request
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Replay this round of the first battle as a cutscene
    #[arg(long)]
    cutscene: Option<u32>,

    /// Enable debug logging of every round
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TerrainPatch {
    x: i32,
    y: i32,
    terrain: Terrain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scenario {
    width: u32,
    height: u32,
    #[serde(default)]
    base_terrain: Terrain,
    #[serde(default)]
    terrain: Vec<TerrainPatch>,
    units: Vec<UnitSnapshot>,
    requests: Vec<EngagementRequest>,
}

impl Scenario {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Ten thousand lancers against eight thousand bowmen
    fn cavalry_charge() -> Self {
        let mut lancers = UnitSnapshot::new(UnitId(1), Side::Attacker, GridCoord::new(4, 5), 1200, 10_000);
        lancers.display_name = "Northern Lancers".into();
        lancers.force = 90;
        lancers.intellect = 60;
        lancers.training_level = 100;
        lancers.morale_level = 100;

        let mut bowmen = UnitSnapshot::new(UnitId(2), Side::Defender, GridCoord::new(5, 5), 1100, 8_000);
        bowmen.display_name = "River Bowmen".into();
        bowmen.leadership = 40;
        bowmen.intellect = 40;

        Self {
            width: 12,
            height: 10,
            base_terrain: Terrain::Plain,
            terrain: vec![TerrainPatch {
                x: 7,
                y: 5,
                terrain: Terrain::River,
            }],
            units: vec![lancers, bowmen],
            requests: vec![EngagementRequest::at_unit(UnitId(1), UnitId(2))],
        }
    }
}

fn styled(span: &markup::Span) -> String {
    let text = span.text.as_str();
    match span.role {
        Some(MarkupRole::Emphasis) => text.bold().to_string(),
        Some(MarkupRole::Danger) => text.red().to_string(),
        Some(MarkupRole::Success) => text.green().to_string(),
        Some(MarkupRole::Neutral) => text.dark_grey().to_string(),
        None => text.to_string(),
    }
}

fn render(text: &str) -> String {
    markup::parse(text).iter().map(styled).collect()
}

fn print_text(result: &BattleResult) {
    println!("Battle {} at {}", result.battle_id(), result.location());
    println!("=============");
    for entry in result.detail_log() {
        println!("  {}", render(&entry.text));
    }
    println!();
    let outcome = match result.winner() {
        Winner::Attacker => "attacker",
        Winner::Defender => "defender",
        Winner::Draw => "draw",
    };
    println!("Winner: {}", outcome);
    println!("Rounds: {} / {}", result.total_rounds(), result.max_rounds());
    println!(
        "Attacker crew: {} -> {}",
        result.attacker().crew_before,
        result.attacker().crew_after
    );
    println!(
        "Defender crew: {} -> {}",
        result.defender().crew_before,
        result.defender().crew_after
    );
    if let Some(seed) = result.seed() {
        println!("Seed: {}", seed);
    }
    println!();
}

/// Play one round in the terminal; Escape or Space skips
fn play_cutscene(result: &BattleResult, round: u32, rules: &BattleRules) -> Result<()> {
    let Some(payload) = result.cutscene_payload(round) else {
        warn!(round, total = result.total_rounds(), "no such round to replay");
        return Ok(());
    };

    let on_complete = |completion: Completion| match completion {
        Completion::Finished => info!("cutscene finished"),
        Completion::Cancelled(signal) => info!(?signal, "cutscene skipped"),
    };
    let mut cutscene = Cutscene::new(payload, SystemClock::new(), *rules.cutscene_timings(), on_complete);

    terminal::enable_raw_mode()?;
    cutscene.start();
    while !cutscene.is_closed() {
        for transition in cutscene.poll() {
            let p = cutscene.payload();
            print!("\r[{:?}] {} vs {}\r\n", transition.to, p.attacker_name, p.defender_name);
        }
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(key) = event::read()? {
                let signal = match key.code {
                    KeyCode::Esc => Some(CancelSignal::Escape),
                    KeyCode::Char(' ') => Some(CancelSignal::Space),
                    _ => None,
                };
                if let Some(signal) = signal {
                    cutscene.cancel(signal);
                }
            }
        }
    }
    terminal::disable_raw_mode()?;
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let rules = match &args.config {
        Some(path) => BattleRules::load(path)?,
        None => BattleRules::default(),
    };
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::cavalry_charge(),
    };

    let mut grid = BattleGrid::with_terrain(scenario.width, scenario.height, scenario.base_terrain);
    for patch in &scenario.terrain {
        grid.set_terrain(GridCoord::new(patch.x, patch.y), patch.terrain);
    }
    let mut field = Battlefield::new(rules.clone(), grid);
    for unit in scenario.units {
        field.deploy(unit)?;
    }

    let requests: Vec<EngagementRequest> = scenario
        .requests
        .into_iter()
        .enumerate()
        .map(|(i, mut request)| {
            if let Some(seed) = args.seed {
                request.rng_seed = Some(seed.wrapping_add(i as u64));
            }
            if args.max_rounds.is_some() {
                request.max_rounds = args.max_rounds;
            }
            request
        })
        .collect();

    info!(requests = requests.len(), "resolving scenario");
    let mut resolved = Vec::new();
    for outcome in field.run_batch(&requests) {
        match outcome {
            Ok(result) => resolved.push(result),
            Err(e) => warn!(error = %e, "request failed"),
        }
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolved)?),
        OutputFormat::Text => resolved.iter().for_each(print_text),
    }

    if let (Some(round), Some(first)) = (args.cutscene, resolved.first()) {
        play_cutscene(first, round, &rules)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "army_battle=debug" } else { "army_battle=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
