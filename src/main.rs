//! College basketball ATS edge CLI
//!
//! Builds leakage-free team features from completed games, backtests a
//! spread classifier week by week, and makes and grades live picks.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cbb_edge::{Config, Result};

#[derive(Parser)]
#[command(name = "cbb-edge")]
#[command(about = "College basketball against-the-spread picks", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Walk-forward backtest over the most recent weeks
    Backtest {
        /// Override the confidence threshold
        #[arg(long)]
        threshold: Option<f64>,
        /// Report without writing to the performance log
        #[arg(long)]
        dry_run: bool,
    },
    /// Train the live model on every completed game
    Train {
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Pick upcoming games
    Predict {
        /// Schedule file (JSON array of home, away, date, spread)
        #[arg(long)]
        schedule: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Do not store the picks for grading
        #[arg(long)]
        no_save: bool,
    },
    /// Grade stored picks once results are in
    Grade {
        /// Game date to grade (default: yesterday)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only record picks at or above the confidence threshold
        #[arg(long)]
        actionable_only: bool,
    },
    /// Performance summary from the graded log
    Report {
        /// First game date (inclusive)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last game date (inclusive)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Remove logged picks below a confidence threshold
    Prune {
        /// Threshold (default: backtest.confidence_threshold)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import completed games from a JSON file
    Import {
        /// Game file (JSON array of team-perspective rows)
        file: String,
        /// Do not derive missing opponent-side rows
        #[arg(long)]
        no_mirror: bool,
    },
    /// Map an alternate team name onto a canonical one
    Alias {
        /// Name as it appears in schedules
        alias: String,
        /// Canonical team name in the ledger
        team: String,
    },
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { file, no_mirror } => {
                commands::data_import(&config, &file, !no_mirror)
            }
            DataCommands::Alias { alias, team } => commands::data_alias(&config, &alias, &team),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Backtest { threshold, dry_run } => {
            commands::backtest(&config, threshold, dry_run)
        }
        Commands::Train { epochs } => commands::train(&config, epochs),
        Commands::Predict {
            schedule,
            format,
            no_save,
        } => commands::predict(&config, &schedule, format, no_save),
        Commands::Grade {
            date,
            actionable_only,
        } => commands::grade(&config, date, actionable_only),
        Commands::Report { from, to, format } => commands::report(&config, from, to, format),
        Commands::Prune { threshold } => commands::prune(&config, threshold),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use cbb_edge::backtest::WalkForwardEvaluator;
    use cbb_edge::data::{
        complete_mirrors, AliasTable, Database, GameLedger, GameSource, JsonGameFile,
        JsonScheduleFile, ScheduleSource,
    };
    use cbb_edge::features::{MatchupAssembler, TemporalAggregator};
    use cbb_edge::performance::{grade_date, DateRange, PerformanceLedger, PerformanceSummary};
    use cbb_edge::predict::{format_picks, LivePredictor};
    use cbb_edge::training::{BurnClassifier, DefaultBackend};
    use cbb_edge::{format_line, EdgeError};

    use burn::backend::ndarray::NdArrayDevice;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'cbb-edge data import <games.json>' to load completed games");
        println!("  3. Run 'cbb-edge backtest' to check the edge on recent weeks");
        println!("  4. Run 'cbb-edge train' then 'cbb-edge predict --schedule <file>'");

        Ok(())
    }

    pub fn data_import(config: &Config, file: &str, mirror: bool) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let source = JsonGameFile::new(file);

        println!("Importing games from {}...", source.name());
        let records = source.read_all()?;
        println!("Read {} game rows", records.len());
        if records.is_empty() {
            return Ok(());
        }

        let mut ledger = db.load_ledger()?;
        let mut new_rows = 0;
        for record in records {
            if !ledger.insert(record) {
                new_rows += 1;
            }
        }
        let mirrors = if mirror {
            complete_mirrors(&mut ledger)
        } else {
            0
        };

        let all: Vec<_> = ledger.iter().cloned().collect();
        let count = db.upsert_games(&all)?;
        println!(
            "Stored {} rows ({} new, {} derived opponent rows)",
            count, new_rows, mirrors
        );

        let missing = ledger.unmirrored().len();
        if missing > 0 {
            log::warn!("{} games are only present from one side", missing);
        }

        Ok(())
    }

    pub fn data_alias(config: &Config, alias: &str, team: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let ledger = db.load_ledger()?;
        if !ledger.teams().contains(team) {
            return Err(EdgeError::UnknownTeam(team.to_string()));
        }
        db.add_team_alias(alias, team)?;
        println!("{} -> {}", alias, team);
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:         {}", config.data.database_path);
        println!("  Teams:        {}", stats.team_count);
        println!("  Game rows:    {}", stats.record_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:        {} to {}", earliest, latest);
        }
        println!("  Aliases:      {}", stats.aliases);
        println!("  Predictions:  {}", stats.predictions);
        println!("  Graded picks: {}", stats.graded_picks);

        Ok(())
    }

    fn load_ledger(db: &Database) -> Result<GameLedger> {
        let ledger = db.load_ledger()?;
        if ledger.is_empty() {
            return Err(EdgeError::EmptyLedger);
        }
        Ok(ledger)
    }

    pub fn backtest(config: &Config, threshold: Option<f64>, dry_run: bool) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let ledger = load_ledger(&db)?;

        let mut backtest_config = config.backtest.clone();
        if let Some(t) = threshold {
            backtest_config.confidence_threshold = t;
        }

        println!("Building features from {} game rows...", ledger.len());
        if let (Some(first), Some(last)) = (ledger.earliest_date(), ledger.latest_date()) {
            println!("  Games from {} to {}", first, last);
        }
        let games = TemporalAggregator::new(config.features.clone()).aggregate(&ledger)?;
        let matchups = MatchupAssembler::new().assemble(&games)?;
        println!(
            "  {} matchup rows ({} season debuts dropped, {} without opponent)",
            matchups.len(),
            games.dropped_debuts,
            matchups.unmatched_opponent
        );

        let device = NdArrayDevice::default();
        let evaluator = WalkForwardEvaluator::new(backtest_config.clone());
        let report = evaluator.run(&matchups, || {
            BurnClassifier::<DefaultBackend>::new(device.clone(), config.training.clone())
        })?;

        println!("\nWalk-forward Backtest");
        println!("───────────────────────────────────────────────────────────");
        println!(
            "{:<10}  {:<10}  {:>8}  {:>6}  {:>6}  {:>8}",
            "Start", "End", "Train", "Test", "Picks", "Record"
        );
        for w in &report.windows {
            println!(
                "{:<10}  {:<10}  {:>8}  {:>6}  {:>6}  {:>4}-{:<3}",
                w.window.start,
                w.window.end,
                w.training_rows,
                w.test_rows,
                w.picks.len(),
                w.wins(),
                w.picks.len() - w.wins()
            );
        }
        if report.windows_skipped > 0 || report.windows_empty > 0 {
            println!(
                "  ({} windows skipped for history, {} with no games)",
                report.windows_skipped, report.windows_empty
            );
        }

        let summary = PerformanceSummary::from_picks(&report.picks(), &config.ledger);
        println!(
            "\n{} of {} picks at >= {:.0}% confidence",
            report.picks_retained,
            report.picks_considered,
            backtest_config.confidence_threshold * 100.0
        );
        println!("{}", summary);

        if dry_run {
            println!("\nDry run: performance log not updated");
        } else {
            let performance = PerformanceLedger::new(&db, config.ledger.clone());
            let written = performance.upsert_all(&report.picks_by_date())?;
            println!("\nWrote {} picks to the performance log", written);
        }

        Ok(())
    }

    pub fn train(config: &Config, epochs: Option<usize>) -> Result<()> {
        use cbb_edge::training::Classifier;

        let mut training_config = config.training.clone();
        if let Some(e) = epochs {
            training_config.epochs = e;
        }

        let db = Database::open(&config.data.database_path)?;
        let ledger = load_ledger(&db)?;

        println!("Building features from {} game rows...", ledger.len());
        let games = TemporalAggregator::new(config.features.clone()).aggregate(&ledger)?;
        let matchups = MatchupAssembler::new().assemble(&games)?;

        let required = config.backtest.min_train_samples;
        if matchups.len() < required {
            return Err(EdgeError::InsufficientHistory {
                available: matchups.len(),
                required,
            });
        }

        let features: Vec<_> = matchups.matchups.iter().map(|m| m.features).collect();
        let labels: Vec<bool> = matchups.matchups.iter().map(|m| m.covered()).collect();
        println!("  {} training rows", features.len());

        let mut classifier =
            BurnClassifier::<DefaultBackend>::new(NdArrayDevice::default(), training_config);
        println!("\nStarting training...\n");
        classifier.fit(&features, &labels)?;

        println!("\nSaving model to {}...", config.data.model_path);
        classifier.save(&config.data.model_path)?;

        let history = classifier.history();
        println!("\nTraining complete!");
        println!("  Epochs:         {}", history.epochs());
        println!("  Best epoch:     {}", history.best_epoch + 1);
        println!("  Final loss:     {:.4}", history.final_loss().unwrap_or(0.0));
        println!(
            "  Final accuracy: {:.1}%",
            history.final_accuracy().unwrap_or(0.0) * 100.0
        );

        Ok(())
    }

    pub fn predict(
        config: &Config,
        schedule_path: &str,
        format: OutputFormat,
        no_save: bool,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let ledger = load_ledger(&db)?;

        let classifier = BurnClassifier::<DefaultBackend>::load(
            NdArrayDevice::default(),
            &config.data.model_path,
            config.training.clone(),
        )?;

        let schedule = JsonScheduleFile::new(schedule_path).fetch_upcoming()?;
        log::info!("Loaded {} scheduled games", schedule.len());

        let snapshots = TemporalAggregator::new(config.features.clone()).latest_snapshots(&ledger)?;
        let resolver = AliasTable::new(ledger.teams(), db.get_team_aliases()?);

        let predictor = LivePredictor::new(&snapshots, config.features.clone());
        let predictions = predictor.predict(&classifier, &resolver, &schedule)?;
        if predictions.unresolved > 0 || predictions.missing_snapshot > 0 {
            log::warn!(
                "Skipped {} games with unknown names and {} with no history",
                predictions.unresolved,
                predictions.missing_snapshot
            );
        }

        let threshold = config.backtest.confidence_threshold;
        match format {
            OutputFormat::Table => {
                print!("{}", format_picks(&predictions.picks, threshold));
                println!(
                    "\n{} picks, {} at >= {:.0}% confidence (*)",
                    predictions.picks.len(),
                    predictions.actionable(threshold).count(),
                    threshold * 100.0
                );
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&predictions.picks)?;
                println!("{}", json);
            }
            OutputFormat::Csv => {
                println!("date,home,away,home_spread,home_probability,pick,confidence,home_rest,away_rest");
                for p in &predictions.picks {
                    println!(
                        "{},{},{},{},{:.4},{},{:.4},{},{}",
                        p.game_date,
                        p.home,
                        p.away,
                        p.home_spread,
                        p.home_probability,
                        format_line(&p.pick.picked_team, p.pick.picked_spread),
                        p.pick.confidence,
                        p.home_rest_days,
                        p.away_rest_days
                    );
                }
            }
        }

        if !no_save && !predictions.picks.is_empty() {
            let saved = db.save_predictions(&predictions.picks)?;
            log::info!("Stored {} predictions for grading", saved);
        }

        Ok(())
    }

    pub fn grade(config: &Config, date: Option<NaiveDate>, actionable_only: bool) -> Result<()> {
        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive() - chrono::Duration::days(1));
        let db = Database::open(&config.data.database_path)?;
        let ledger = GameLedger::from_records(db.get_games_in_range(date, date)?);

        let predictions = db.get_predictions_for(date)?;
        if predictions.is_empty() {
            println!("No stored predictions for {}", date);
            return Ok(());
        }

        let performance = PerformanceLedger::new(&db, config.ledger.clone());
        let threshold = actionable_only.then_some(config.backtest.confidence_threshold);
        let outcome = grade_date(&performance, &predictions, &ledger, date, threshold)?;

        println!("Grading {} ({} predictions)", date, predictions.len());
        println!("───────────────────────────────");
        for pick in &outcome.graded {
            let mark = if pick.pick_correct == Some(true) { "W" } else { "L" };
            println!(
                "  {}  {:<28}  {:>5.1}%  {}",
                mark,
                pick.label(),
                pick.confidence * 100.0,
                pick.matchup.as_deref().unwrap_or("")
            );
        }
        println!(
            "\n{}-{} graded, {} without results, {} below threshold",
            outcome.wins(),
            outcome.graded.len() - outcome.wins(),
            outcome.unmatched,
            outcome.below_threshold
        );

        Ok(())
    }

    pub fn report(
        config: &Config,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        format: OutputFormat,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let performance = PerformanceLedger::new(&db, config.ledger.clone());
        let summary = performance.summary(DateRange { start: from, end: to })?;

        match format {
            OutputFormat::Table => {
                println!("Performance");
                println!("───────────────────────────────");
                if summary.count == 0 {
                    println!("  No graded picks in range");
                    return Ok(());
                }
                println!("  Picks:       {}", summary.count);
                println!("  Record:      {}-{}", summary.wins, summary.losses);
                println!("  Win rate:    {:.1}%", summary.win_rate * 100.0);
                println!("  Break-even:  {:.1}%", summary.break_even * 100.0);
                println!("  Profit:      {:+.2} units", summary.profit);
                println!("\n  {:<10}  {:>10}", "Date", "Cumulative");
                for (date, units) in &summary.cumulative {
                    println!("  {:<10}  {:>+10.2}", date, units);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Csv => {
                println!("date,cumulative_profit");
                for (date, units) in &summary.cumulative {
                    println!("{},{:.2}", date, units);
                }
            }
        }

        Ok(())
    }

    pub fn prune(config: &Config, threshold: Option<f64>) -> Result<()> {
        let threshold = threshold.unwrap_or(config.backtest.confidence_threshold);
        let db = Database::open(&config.data.database_path)?;
        let performance = PerformanceLedger::new(&db, config.ledger.clone());
        let removed = performance.prune_below(threshold)?;
        println!(
            "Removed {} picks below {:.1}% confidence",
            removed,
            threshold * 100.0
        );
        Ok(())
    }
}
