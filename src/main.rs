//! abscore CLI
//!
//! Usage:
//!   abscore --angles "170,100,50,110,52"    # Replay hinge angles
//!   abscore --frames session.jsonl          # Replay joint frames (one JSON frame per line)
//!   abscore --interactive                   # Type angles on stdin
//!   abscore --serve                         # HTTP API server
//!   abscore --angles "..." --json           # JSON output

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use abscore::config::Config;
use abscore::core::{run_server, CompositeScorer, ExerciseSession, InMemoryLedger, Ledger, SubmissionGate};
use abscore::types::{
    BonusContext, ChallengeSpec, FrameOutput, HingeAngle, JointFrame, LedgerEntry, ScoreBreakdown,
    SessionSummary,
};
use abscore::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "abscore",
    version = VERSION,
    about = "Count core-exercise repetitions, grade form and compute the composite score",
    long_about = "abscore turns a stream of torso hinge angles (or raw body-joint frames)\n\
                  into a repetition count with per-repetition form accuracy, summarizes\n\
                  the session and scores it with seasonal, regional and challenge bonuses.\n\n\
                  Modes:\n  \
                  --angles       Replay a comma-separated angle list\n  \
                  --frames       Replay a JSON-lines file of joint frames\n  \
                  --interactive  Type one angle per line\n  \
                  --serve        HTTP API server mode\n\n\
                  Phases:\n  \
                  DOWN - starting position, angle above 105°\n  \
                  UP   - contracted position, angle below 55° (counts a repetition)"
)]
struct Args {
    /// Comma-separated hinge angles in degrees
    #[arg(short, long)]
    angles: Option<String>,

    /// JSON-lines file, one joint frame per line
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Interactive mode - read angles from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Seasonal bonus in basis points
    #[arg(long, default_value_t = 0)]
    seasonal_bps: u32,

    /// Regional bonus in basis points
    #[arg(long, default_value_t = 0)]
    regional_bps: u32,

    /// Active challenge: kind:target:multiplier_bps[:expiry_unix[:id]]
    #[arg(long)]
    challenge: Option<ChallengeSpec>,

    /// Region tag for the submission record
    #[arg(long, default_value = "global")]
    region: String,

    /// User id for the cooldown and the ledger
    #[arg(long, default_value = "local")]
    user: String,

    /// Policy file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Final report for `--json`
#[derive(Debug, Serialize)]
struct SessionReport {
    summary: SessionSummary,
    estimate: ScoreBreakdown,
    receipt_hex: String,
    submission: SubmissionReport,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum SubmissionReport {
    Accepted {
        entry: LedgerEntry,
        receipt_matches: bool,
    },
    Rejected {
        code: String,
        message: String,
    },
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            process::exit(1);
        }
    };
    let bonus = bonus_context(&args);

    let result = if args.serve {
        run_server(&args.addr, config, bonus)
            .await
            .map_err(|e| e.to_string())
    } else if let Some(ref path) = args.frames {
        run_frames(path, &args, &config, bonus)
    } else if let Some(ref angles) = args.angles {
        run_angles(angles, &args, &config, bonus)
    } else {
        // Default to interactive if no mode specified
        if !args.interactive {
            tracing::debug!("no replay source given, reading angles from stdin");
        }
        run_interactive(&args, &config, bonus)
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        process::exit(1);
    }
}

/// `RUST_LOG` filter, `info` by default; logs go to stderr
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();
}

/// `Config::load` validates the file
fn load_config(args: &Args) -> Result<Config, String> {
    match &args.config {
        Some(path) => Config::load(path).map_err(|e| e.to_string()),
        None => Ok(Config::default()),
    }
}

fn bonus_context(args: &Args) -> BonusContext {
    let mut bonus = BonusContext::new(args.seasonal_bps, args.regional_bps);
    if let Some(challenge) = args.challenge.clone() {
        bonus = bonus.with_challenge(challenge, false);
    }
    bonus.refreshed_at = Some(Utc::now());
    bonus
}

/// Replay a comma-separated angle list
fn run_angles(raw: &str, args: &Args, config: &Config, bonus: BonusContext) -> Result<(), String> {
    let angles = parse_angles(raw)?;
    let mut session = ExerciseSession::with_config(&args.user, &args.region, config, Utc::now());

    for angle in angles {
        let output = session.process_angle(angle).map_err(|e| e.to_string())?;
        print_output(&output, args);
    }

    finish(&mut session, args, config, bonus)
}

/// Replay a JSON-lines frame file
fn run_frames(path: &Path, args: &Args, config: &Config, bonus: BonusContext) -> Result<(), String> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut session = ExerciseSession::with_config(&args.user, &args.region, config, Utc::now());

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| format!("read failed at line {}: {}", number + 1, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: JointFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(line = number + 1, "skipping malformed frame: {}", e);
                continue;
            }
        };
        match session.process_frame(&frame) {
            Ok(output) => print_output(&output, args),
            Err(e) if !args.json => {
                println!("{}", format!("  line {} skipped: {} ({})", number + 1, e, e.code()).yellow());
            }
            Err(_) => {}
        }
    }

    finish(&mut session, args, config, bonus)
}

/// Run interactive mode
fn run_interactive(args: &Args, config: &Config, bonus: BonusContext) -> Result<(), String> {
    let mut session = ExerciseSession::with_config(&args.user, &args.region, config, Utc::now());

    if !args.json {
        print_header("Interactive");
        println!("Type one hinge angle per line. 'reset' starts over, 'quit' finishes.");
        println!(
            "A repetition counts when the angle drops below {}°.",
            config.thresholds.up_deg
        );
        println!();
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if !args.json {
            let state = session.state();
            let prompt = format!("[{} {} reps] > ", state.phase, state.repetition_count);
            print!("{}", prompt.color(state.phase.color()));
            stdout.flush().map_err(|e| e.to_string())?;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.eq_ignore_ascii_case("reset") {
            session.reset(Utc::now());
            if !args.json {
                println!("{}", "Session reset.".dimmed());
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }

        match line.parse::<f64>() {
            Ok(deg) if deg.is_finite() => {
                let output = session
                    .process_angle(HingeAngle::new(deg))
                    .map_err(|e| e.to_string())?;
                print_output(&output, args);
            }
            _ => {
                if !args.json {
                    println!("{}", format!("⚠ '{}' is not an angle in degrees", line).yellow());
                }
            }
        }
    }

    finish(&mut session, args, config, bonus)
}

/// Finalize, estimate the score, then run the gate and the local ledger
fn finish(
    session: &mut ExerciseSession,
    args: &Args,
    config: &Config,
    bonus: BonusContext,
) -> Result<(), String> {
    let now = Utc::now();
    let summary = session.finalize(now);

    let scorer = CompositeScorer::new(config.scoring);
    let (estimate, receipt) = scorer.score_with_receipt(&summary, &bonus, now);
    let receipt_hex = receipt.to_hex();

    let gate = SubmissionGate::new(config.gate);
    let mut ledger = InMemoryLedger::with_config(config, bonus.clone());
    let record = session.submission_record(&summary);

    let submission = match gate
        .try_submit(session.user(), record, now)
        .map_err(|e| (e.code(), e.to_string()))
        .and_then(|record| {
            ledger
                .submit(session.user(), record, now)
                .map_err(|e| (e.code(), e.to_string()))
        }) {
        Ok(entry) => SubmissionReport::Accepted {
            receipt_matches: entry.receipt == receipt,
            entry,
        },
        Err((code, message)) => SubmissionReport::Rejected {
            code: code.to_string(),
            message,
        },
    };

    let report = SessionReport {
        summary,
        estimate,
        receipt_hex,
        submission,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", json);
    } else {
        print_report(&report, &bonus);
    }
    Ok(())
}

fn parse_angles(raw: &str) -> Result<Vec<HingeAngle>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<f64>() {
            Ok(deg) if deg.is_finite() => Ok(HingeAngle::new(deg)),
            _ => Err(format!("'{}' is not an angle in degrees", s)),
        })
        .collect()
}

fn print_output(output: &FrameOutput, args: &Args) {
    if args.json {
        match serde_json::to_string(output) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("cannot serialize frame output: {}", e),
        }
    } else if args.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
    }
}

/// Print header
fn print_header(mode: &str) {
    println!("{}", "========================================".bold());
    println!("{}", format!("  abscore v{} - {}", VERSION, mode).bold());
    println!("{}", "========================================".bold());
    println!();
}

fn print_report(report: &SessionReport, bonus: &BonusContext) {
    let s = &report.summary;
    let e = &report.estimate;

    println!();
    println!("{}", "Session summary".bold());
    println!("  reps:          {}", s.reps());
    println!("  form accuracy: {}%", s.average_form_accuracy);
    println!("  best streak:   {}", s.best_streak());
    println!("  duration:      {}s", s.duration_secs());
    println!();
    println!("{}", "Score estimate".bold());
    println!("  base:          {}", e.base);
    println!(
        "  weather bonus: ×{:.2} → {}",
        e.weather_multiplier_bps as f64 / 10_000.0,
        e.after_bonus
    );
    if let Some(challenge) = &bonus.challenge {
        let status = if e.challenge_applied {
            "applied".green()
        } else if e.challenge_met {
            "met, already claimed".yellow()
        } else {
            "not met".dimmed()
        };
        println!(
            "  challenge:     {} ≥ {} ({})",
            challenge.kind, challenge.target, status
        );
    }
    println!("  {}", format!("final score:   {}", e.final_score).green().bold());
    println!("  receipt:       {}", report.receipt_hex.dimmed());
    println!();

    match &report.submission {
        SubmissionReport::Accepted {
            entry,
            receipt_matches,
        } => {
            println!(
                "{} ledger score {}{}",
                "✓ submitted:".green().bold(),
                entry.breakdown.final_score,
                if *receipt_matches {
                    String::new()
                } else {
                    " (differs from estimate)".yellow().to_string()
                }
            );
        }
        SubmissionReport::Rejected { code, message } => {
            println!("{} {} ({})", "✗ not submitted:".red().bold(), message, code);
        }
    }
}
