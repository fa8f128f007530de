//! Command-line surface for the `slens` binary.
//!
//! ```text
//! slens analyze <FILE|-> [--language L] [--context JSON] [--json] [--events]
//! slens agents
//! slens languages
//! slens classify <FILE> [--language L]
//! slens simulate <ALGORITHM> [--data 1,2,3] [--target N]
//! ```
//!
//! Diagnostics go to stderr through `tracing`; results go to stdout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};

use crate::agents::list_agents;
use crate::aggregate::AnalysisReport;
use crate::colors::{ColorMode, Painter};
use crate::config::SwarmConfig;
use crate::orchestrator::{Orchestrator, RunStatus};
use crate::simulation::{
    self, Algorithm, Frame, InputData, SimulationRequest, Unbounded, Visualization, classifier,
};
use crate::types::{Context, Language, Submission};

#[derive(Parser, Debug)]
#[command(name = "slens")]
#[command(about = "Multi-agent code analysis with algorithm simulation")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Config file (default: .swarmlens/config.toml in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Colorize human-readable output
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every agent against a snippet and print the report
    Analyze(AnalyzeArgs),
    /// List the agent roster
    Agents {
        #[arg(long)]
        json: bool,
    },
    /// List supported languages
    Languages {
        #[arg(long)]
        json: bool,
    },
    /// Detect which known algorithm a snippet implements
    Classify {
        /// Source file, or `-` for stdin
        file: PathBuf,
        #[arg(long, short)]
        language: Option<Language>,
        #[arg(long)]
        json: bool,
    },
    /// Record a step-by-step trace of a reference algorithm
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Source file, or `-` for stdin
    pub file: PathBuf,

    /// Language of the snippet (inferred from the file extension otherwise)
    #[arg(long, short)]
    pub language: Option<Language>,

    /// Submission context as a JSON object, e.g. '{"input_data":[5,3,1]}'
    #[arg(long)]
    pub context: Option<String>,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Stream agent lifecycle events to stderr as JSON lines
    #[arg(long)]
    pub events: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Algorithm id, e.g. bubble_sort, binary_search, bfs
    pub algorithm: Algorithm,

    /// Input values, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub data: Option<Vec<i64>>,

    /// Search target
    #[arg(long, allow_hyphen_values = true)]
    pub target: Option<i64>,

    /// Start node for graph traversals
    #[arg(long)]
    pub start: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

/// Initialise the stderr subscriber; `RUST_LOG` overrides `--log-level`.
pub fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.parse().unwrap_or_default()),
        )
        .init();
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => SwarmConfig::load_from_path(path),
        None => SwarmConfig::load(&std::env::current_dir().context("no current directory")?),
    };
    let painter = Painter::new(cli.color);

    match cli.command {
        Command::Analyze(args) => analyze(args, config, painter).await,
        Command::Agents { json } => {
            let agents = list_agents();
            if json {
                println!("{}", serde_json::to_string_pretty(&agents)?);
            } else {
                for agent in agents {
                    println!(
                        "{:<22} {}",
                        painter.symbol(agent.agent_id.as_str()),
                        agent.description
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Languages { json } => {
            let languages = crate::list_languages();
            if json {
                println!("{}", serde_json::to_string(languages)?);
            } else {
                for lang in languages {
                    println!("{lang}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Classify {
            file,
            language,
            json,
        } => {
            let code = read_source(&file)?;
            let language = resolve_language(&file, language)?;
            let detected = classifier::Classifier::new(config.classifier.min_confidence)
                .classify(&code, language);
            if json {
                let scores = classifier::score(&code, language);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "result": detected, "scores": scores }))?
                );
            } else {
                match detected {
                    Some(found) => println!(
                        "{} ({}), confidence {}",
                        painter.symbol(found.algorithm.as_str()),
                        found.category.as_str(),
                        painter.number(format!("{:.2}", found.confidence))
                    ),
                    None => println!("{}", painter.dim("no known algorithm detected")),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Simulate(args) => {
            let request = SimulationRequest::new(args.algorithm).with_input(InputData {
                data: args.data,
                target: args.target,
                graph: None,
                start: args.start,
            });
            let vis = simulation::simulate(&request, &config.simulation, &Unbounded)
                .with_context(|| format!("simulating {}", args.algorithm))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&vis)?);
            } else {
                print_visualization(&vis, painter, true);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn analyze(args: AnalyzeArgs, config: SwarmConfig, painter: Painter) -> Result<ExitCode> {
    let code = read_source(&args.file)?;
    let language = resolve_language(&args.file, args.language)?;
    let context = match &args.context {
        Some(raw) => parse_context(raw)?,
        None => Context::new(),
    };
    let submission = Submission::new(code, language, context)?;
    let orchestrator = Orchestrator::new(config);

    let report = if args.events {
        let mut handle = orchestrator.spawn_run(submission)?;
        while let Some(event) = handle.next_event().await {
            eprintln!("{}", serde_json::to_string(&event)?);
        }
        handle.wait().await
    } else {
        orchestrator.submit_analysis(submission).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, painter);
    }

    Ok(if report.status == RunStatus::Failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn read_source(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

fn resolve_language(file: &Path, explicit: Option<Language>) -> Result<Language> {
    if let Some(language) = explicit {
        return Ok(language);
    }
    file.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
        .ok_or_else(|| {
            anyhow!(
                "cannot infer language of {}; pass --language",
                file.display()
            )
        })
}

fn parse_context(raw: &str) -> Result<Context> {
    match serde_json::from_str(raw).context("--context is not valid JSON")? {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("--context must be a JSON object, got {other}"),
    }
}

fn print_report(report: &AnalysisReport, p: Painter) {
    let s = &report.summary;
    println!(
        "{} {}",
        p.header("swarmlens report"),
        p.dim(&report.run_id.to_string())
    );
    println!(
        "status: {}   quality score: {}",
        p.run_status(report.status),
        p.score(s.quality_score)
    );
    println!(
        "findings: {} total ({} critical, {} error, {} warning, {} info)",
        p.number(s.total_findings),
        p.number(s.critical_issues),
        p.number(s.errors),
        p.number(s.warnings),
        p.number(s.infos)
    );
    if let Some(big_o) = s.complexity.get("big_o").and_then(Value::as_str) {
        println!("complexity: {big_o}");
    }

    for (id, result) in &report.agent_results {
        println!();
        println!(
            "{} {} {}",
            p.agent_status(result.status),
            p.header(id.display_name()),
            p.dim(&format!("({} ms)", result.elapsed_ms))
        );
        if let Some(detail) = &result.error_detail {
            println!("  {}", p.dim(detail));
        }
        for finding in &result.findings {
            let line = finding
                .line
                .map(|l| format!("L{l:<4}"))
                .unwrap_or_else(|| "     ".to_string());
            println!("  {} {} {}", p.severity(finding.severity), line, finding.message);
            if let Some(suggestion) = &finding.suggestion {
                println!("  {:<14} {}", "", p.dim(&format!("-> {suggestion}")));
            }
        }
    }

    for vis in &report.visualizations {
        println!();
        print_visualization(vis, p, false);
    }
}

fn print_visualization(vis: &Visualization, p: Painter, with_frames: bool) {
    let m = &vis.metrics;
    println!(
        "{} {} ({}), {} frames, {} comparisons, time {}, space {}",
        p.header("visualization:"),
        p.symbol(&vis.algorithm_name),
        vis.category.as_str(),
        p.number(vis.frames.len()),
        p.number(m.comparisons),
        m.time_complexity,
        m.space_complexity
    );
    if let Some(message) = &vis.message {
        println!("  {}", p.dim(message));
    }
    if !with_frames {
        return;
    }
    for frame in &vis.frames {
        let state = match frame {
            Frame::Sorting(f) => format!("{:?}", f.array),
            Frame::Searching(f) => format!("[{}..{}]", f.left, f.right),
            Frame::Graph(f) => format!("visited {:?}", f.visited),
        };
        println!("  {:>4} {} {}", frame.step(), frame.message(), p.dim(&state));
    }
    if let Some(sample) = &vis.sample_data {
        println!("  {sample}");
    }
}
