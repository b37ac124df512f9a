//! callmap-runner: headless driver for the correlation pipeline.
//!
//! Usage:
//!   callmap-runner --records calls.json --target +15550100
//!   callmap-runner --records calls.json --target +15550100 --strategy radial --width 1600 --height 900
//!   callmap-runner --records calls.json --target +15550100 --summary
//!   callmap-runner --ipc-mode [--config analysis.json]

use anyhow::{Context, Result};
use callmap_core::{
    analyzer::{AnalysisInput, AnalysisOutput, AnalysisStatus, Analyzer, CacheStats},
    config::AnalysisConfig,
    layout::{StrategyKind, Viewport},
    recommend::InteractionTelemetry,
    record::RawRecord,
};
use chrono::SecondsFormat;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Load {
        records: Vec<RawRecord>,
        target: String,
    },
    SetViewport {
        width: f64,
        height: f64,
    },
    SetStrategy {
        strategy: StrategyKind,
    },
    SetOverride {
        #[serde(default)]
        strategy: Option<StrategyKind>,
    },
    SetConfig {
        config: AnalysisConfig,
    },
    Telemetry {
        telemetry: InteractionTelemetry,
    },
    GetState,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    output: &'a AnalysisOutput,
    cache: CacheStats,
}

/// Inputs the host can change one at a time; the analyzer decides what
/// actually needs recomputing.
struct Session {
    records: Vec<RawRecord>,
    target: String,
    config: AnalysisConfig,
    viewport: Viewport,
    strategy_override: Option<StrategyKind>,
    analyzer: Analyzer,
}

impl Session {
    fn run(&mut self) -> Result<AnalysisOutput> {
        let input = AnalysisInput {
            records: &self.records,
            target: &self.target,
            config: &self.config,
            viewport: self.viewport,
            strategy_override: self.strategy_override,
        };
        Ok(self.analyzer.analyze(&input)?)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let summary = args.iter().any(|a| a == "--summary");
    let width = parse_arg(&args, "--width", 1200.0f64);
    let height = parse_arg(&args, "--height", 800.0f64);

    let mut config = match flag_value(&args, "--config") {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(strategy) = flag_value(&args, "--strategy") {
        config.layout.strategy = strategy.parse()?;
    }
    let strategy_override = flag_value(&args, "--override")
        .map(str::parse::<StrategyKind>)
        .transpose()?;

    let records = match flag_value(&args, "--records") {
        Some(path) => load_records(path)?,
        None => Vec::new(),
    };

    let mut session = Session {
        records,
        target: flag_value(&args, "--target").unwrap_or_default().to_string(),
        config,
        viewport: Viewport::new(width, height)?,
        strategy_override,
        analyzer: Analyzer::new(),
    };

    if ipc_mode {
        run_ipc_loop(&mut session)?;
    } else {
        let output = session.run()?;
        if summary {
            print_summary(&session, &output);
        } else {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn run_ipc_loop(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        match handle_command(session, cmd) {
            Ok(Some(line)) => writeln!(stdout, "{line}")?,
            Ok(None) => break,
            Err(e) => write_error(&mut stdout, &format!("{e:#}"))?,
        }
        stdout.flush()?;
    }
    Ok(())
}

/// Returns the JSON line to write back, or None to quit.
fn handle_command(session: &mut Session, cmd: IpcCommand) -> Result<Option<String>> {
    match cmd {
        IpcCommand::Quit => return Ok(None),
        IpcCommand::Load { records, target } => {
            session.records = records;
            session.target = target;
        }
        IpcCommand::SetViewport { width, height } => {
            session.viewport = Viewport::new(width, height)?;
        }
        IpcCommand::SetStrategy { strategy } => {
            session.config.layout.strategy = strategy;
        }
        IpcCommand::SetOverride { strategy } => {
            session.strategy_override = strategy;
        }
        IpcCommand::SetConfig { config } => {
            config.validate().context("rejected config")?;
            session.config = config;
        }
        IpcCommand::Telemetry { telemetry } => {
            let output = session.run()?;
            let advice = session.analyzer.advise(&output, &telemetry, &session.config);
            return Ok(Some(serde_json::to_string(&advice)?));
        }
        IpcCommand::GetState => {}
    }

    let output = session.run()?;
    let state = UiState {
        output: &output,
        cache: session.analyzer.stats(),
    };
    Ok(Some(serde_json::to_string(&state)?))
}

fn write_error(out: &mut impl Write, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(out, "{err_json}")?;
    out.flush()?;
    Ok(())
}

fn load_records(path: &str) -> Result<Vec<RawRecord>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Cannot read records from {path}"))?;
    let records: Vec<RawRecord> = serde_json::from_str(&content)
        .with_context(|| format!("{path} is not a JSON array of records"))?;
    log::info!("loaded {} raw records from {path}", records.len());
    Ok(records)
}

fn print_summary(session: &Session, output: &AnalysisOutput) {
    println!("callmap-runner");
    println!("  target:        {}", session.target);
    println!("  viewport:      {}x{}", session.viewport.width, session.viewport.height);
    println!("  raw records:   {}", session.records.len());
    println!("  skipped:       {}", output.skipped_count());
    println!();

    if output.status == AnalysisStatus::NoData {
        println!("=== NO DATA ===");
        println!("  {}", output.recommendation.reasoning);
        return;
    }

    println!("=== GRAPH ===");
    println!("  numbers:       {}", output.graph.nodes.len());
    println!("  connections:   {}", output.graph.edges.len());
    println!("  calls:         {}", output.graph.total_call_count());
    println!();

    println!("=== NUMBERS (by interactions) ===");
    let mut nodes: Vec<_> = output.graph.nodes.iter().collect();
    nodes.sort_by(|a, b| b.interaction_count.cmp(&a.interaction_count).then(a.id.cmp(&b.id)));
    for node in nodes {
        let last_seen = node
            .last_interaction
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<16} {:<9} calls={:<4} in={:<4} out={:<4} score={:.2} last={last_seen}",
            node.id,
            node.correlation_level.as_str(),
            node.interaction_count,
            node.incoming_count,
            node.outgoing_count,
            node.score.total,
        );
    }
    println!();

    println!("=== LAYOUT ===");
    println!(
        "  strategy:      {} (applied {})",
        output.layout.requested, output.layout.applied
    );
    for node in &output.layout.nodes {
        println!(
            "  {:<16} ({:>7.1}, {:>7.1}) size={:.1}",
            node.id, node.position.x, node.position.y, node.size_hint
        );
    }
    println!();

    let rec = &output.recommendation;
    println!("=== RECOMMENDATION ===");
    println!("  {} ({}%): {}", rec.recommended_strategy, rec.confidence, rec.reasoning);
    for alt in &rec.alternatives {
        println!("    alt {} ({:.0}): {}", alt.strategy, alt.score, alt.reason);
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
