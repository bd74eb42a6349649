use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use autoscore::advice::AdviceService;
use autoscore::ingest::{self, IngestReport};
use autoscore::scoring::AutoScoreResult;
use autoscore::simulate::RoundSimulator;
use autoscore::storage::{CourseFile, MemoryStore};
use autoscore::validation::ScoreValidationResult;
use autoscore::{
    CourseId, CourseLayout, LocationProcessingResult, LocationUpdate, Round, RoundId, RoundTracker,
    TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "autoscore-rs")]
#[command(about = "GPS shot detection and automatic hole scoring", long_about = None)]
struct Args {
    /// Course description (JSON with courseId and holes)
    #[arg(short, long, global = true)]
    course: Option<PathBuf>,

    /// Threshold configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Advice service base URL (overrides config)
    #[arg(long, global = true)]
    advice_url: Option<String>,

    /// Show every processed sample
    #[arg(short, long, global = true)]
    live: bool,

    /// Do not record detected scores
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay recorded samples (NDJSON, one record per line)
    Replay { samples: PathBuf },
    /// Generate and play a synthetic round over the course
    Simulate {
        #[arg(long, default_value = "1")]
        user: i64,
        #[arg(long, default_value = "1")]
        round: i64,
        /// Seed for a reproducible round
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Read NDJSON samples from stdin until EOF or Ctrl+C
    Stream,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = TrackerConfig::load(args.config.as_deref())?;
    if let Some(ref url) = args.advice_url {
        config.advice.base_url = Some(url.clone());
    }

    let course_path = args
        .course
        .as_deref()
        .context("A course file is required (--course <course.json>)")?;
    let course = CourseFile::load(course_path)
        .with_context(|| format!("Failed to load course from {}", course_path.display()))?;

    println!("{}", "=".repeat(50));
    println!("  AutoScore - GPS Shot & Score Detection");
    println!(
        "  Course {}{} ({} holes)",
        course.course_id,
        course
            .name
            .as_deref()
            .map(|n| format!(" - {}", n))
            .unwrap_or_default(),
        course.holes.len()
    );
    println!("{}", "=".repeat(50));
    println!();

    let layout = CourseLayout::new(course.course_id, course.holes.clone());
    let store = Arc::new(MemoryStore::new());
    store.insert_course_file(course)?;

    let advice = AdviceService::from_config(&config.advice);
    let tracker = RoundTracker::new(
        &config,
        store.clone(),
        store.clone(),
        store.clone(),
        advice,
    );
    let mut runner = RoundRunner {
        tracker,
        store,
        course_id: layout.course_id(),
        completion_threshold_m: config.completion.completion_threshold_m,
        live: args.live,
        dry_run: args.dry_run,
        rounds: BTreeSet::new(),
        completed: HashSet::new(),
    };

    match args.command {
        Command::Replay { samples } => {
            let contents = std::fs::read_to_string(&samples)
                .with_context(|| format!("Failed to read {}", samples.display()))?;
            let IngestReport { updates, rejected } = ingest::parse_ndjson(&contents);
            println!(
                "Replaying {} samples ({} rejected)",
                updates.len(),
                rejected.len()
            );
            println!();
            for update in updates {
                runner.handle(update).await?;
            }
        }
        Command::Simulate { user, round, seed } => {
            let simulated = RoundSimulator::new(user, round, Utc::now(), seed).play(&layout);
            println!(
                "Simulating {} holes ({} samples)",
                simulated.holes.len(),
                simulated.updates.len()
            );
            println!();
            for update in simulated.updates {
                runner.handle(update).await?;
            }
            println!("Actual strokes played:");
            for hole in &simulated.holes {
                println!(
                    "  Hole {:>2} (par {}): {} ({} full shots, {} putts)",
                    hole.hole_number,
                    hole.par,
                    hole.strokes(),
                    hole.full_shots,
                    hole.putts
                );
            }
            println!();
        }
        Command::Stream => {
            println!("Reading samples from stdin. Press Ctrl+C to stop");
            println!();
            stream(&mut runner).await?;
        }
    }

    runner.finish()
}

/// Reads stdin on a blocking thread and stops on EOF or Ctrl+C.
async fn stream(runner: &mut RoundRunner) -> Result<()> {
    let (line_tx, mut line_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel::<()>();

    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("[INGEST] Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                println!("\n");
                println!("Stopping...");
                break;
            }
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                match ingest::parse_line(&line) {
                    Ok(Some(update)) => runner.handle(update).await?,
                    Ok(None) => {}
                    Err(e) => log::warn!("[INGEST] Rejected record: {}", e),
                }
            }
        }
    }
    Ok(())
}

/// Feeds samples to the tracker and raises the hole-completion signal when
/// the player reaches a pin.
struct RoundRunner {
    tracker: RoundTracker,
    store: Arc<MemoryStore>,
    course_id: CourseId,
    completion_threshold_m: f64,
    live: bool,
    dry_run: bool,
    rounds: BTreeSet<RoundId>,
    completed: HashSet<(RoundId, u32)>,
}

impl RoundRunner {
    async fn handle(&mut self, update: LocationUpdate) -> Result<()> {
        if self.rounds.insert(update.round_id) {
            self.store.insert_round(Round {
                id: update.round_id,
                user_id: update.user_id,
                course_id: self.course_id,
            })?;
        }

        let result = self.tracker.process_location_update(update).await;
        if self.live {
            print_sample(&result);
        }
        if let Some(ref error) = result.error {
            log::warn!("[TRACKER] {}", error);
        }
        if let Some(ref shot) = result.shot {
            println!();
            println!("{}", "-".repeat(40));
            for message in &result.messages {
                println!("  {}", message);
            }
            println!("  Confidence:   {:.0}%", shot.confidence * 100.0);
            println!("{}", "-".repeat(40));
        }

        let Some(hole) = result.hole_number else {
            return Ok(());
        };
        let at_pin = result
            .distance_to_pin
            .is_some_and(|d| d <= self.completion_threshold_m);
        if !at_pin || self.completed.contains(&(update.round_id, hole)) {
            return Ok(());
        }

        let auto = self
            .tracker
            .process_hole_completion(
                update.user_id,
                update.round_id,
                hole,
                update.sample.coordinate,
            )
            .await;
        print_auto_score(&auto);
        if !auto.hole_completed {
            return Ok(());
        }
        self.completed.insert((update.round_id, hole));

        if self.dry_run {
            return Ok(());
        }
        if let Some(score) = auto.detected_score {
            let validation = self
                .tracker
                .validate_and_record_score(update.user_id, update.round_id, hole, score, None)
                .await;
            print_validation(&validation);
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        for round_id in &self.rounds {
            println!("Scorecard for round {}:", round_id);
            let scores = self.store.hole_scores(*round_id)?;
            if scores.is_empty() {
                println!("  (no scores recorded)");
            }
            let mut total = 0;
            for (hole, score) in &scores {
                println!("  Hole {:>2}: {}", hole, score);
                total += score;
            }
            if !scores.is_empty() {
                println!("  Total:   {}", total);
            }
            println!();
            self.tracker.end_round(*round_id);
        }
        Ok(())
    }
}

fn print_sample(result: &LocationProcessingResult) {
    println!(
        "  [{}] hole={} position={} pin={} {}",
        result.timestamp.format("%H:%M:%S"),
        result
            .hole_number
            .map(|h| h.to_string())
            .unwrap_or_else(|| "-".to_string()),
        result.position.as_str(),
        result
            .distance_to_pin
            .map(|d| format!("{:.0}m", d))
            .unwrap_or_else(|| "N/A".to_string()),
        if result.success { "" } else { "(not stored)" }
    );
}

fn print_auto_score(auto: &AutoScoreResult) {
    println!();
    println!("{}", "=".repeat(40));
    println!("  Hole {} completion check", auto.hole_number);
    if let Some(score) = auto.detected_score {
        println!(
            "  Detected Score: {} (par {})",
            score,
            auto.par.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string())
        );
    }
    println!("  Confidence:     {:.0}%", auto.detection_confidence * 100.0);
    println!(
        "  Confirmation:   {}",
        if auto.requires_confirmation { "required" } else { "not required" }
    );
    for shot in &auto.shots {
        println!("    {}", shot);
    }
    for reason in &auto.detection_reasons {
        println!("  - {}", reason);
    }
    if let Some(ref commentary) = auto.commentary {
        println!("  \"{}\"", commentary);
    }
    println!("{}", "=".repeat(40));
    println!();
}

fn print_validation(validation: &ScoreValidationResult) {
    println!(
        "  Recorded score {} for hole {}: {}",
        validation.final_score,
        validation.hole_number,
        if validation.recording_successful { "ok" } else { "FAILED" }
    );
    for note in &validation.validation_notes {
        println!("    {}", note);
    }
    println!();
}
