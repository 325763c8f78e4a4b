use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use coachcal_core::calendar::local_date;
use coachcal_core::lifecycle::format_elapsed;
use coachcal_core::projector::{DaySchedule, MonthCell};
use coachcal_core::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "coachcal")]
#[command(about = "Training calendar and session tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Acting athlete
    #[arg(long, global = true)]
    athlete: Option<Uuid>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Pretend the current time is this instant (RFC 3339)
    #[arg(long, global = true, hide = true)]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start (or rejoin) today's attempt at a session
    Start {
        #[arg(long)]
        session: Uuid,
    },

    /// Pause today's attempt
    Pause {
        #[arg(long)]
        session: Uuid,
    },

    /// Resume today's paused attempt
    Resume {
        #[arg(long)]
        session: Uuid,
    },

    /// Complete today's attempt
    Complete {
        #[arg(long)]
        session: Uuid,

        /// Overall effort, 1-10
        #[arg(long)]
        rpe: Option<u8>,

        #[arg(long)]
        notes: Option<String>,

        /// Record this duration instead of the measured one
        #[arg(long)]
        duration_minutes: Option<u32>,
    },

    /// Show the net running time of today's attempt
    Elapsed {
        #[arg(long)]
        session: Uuid,
    },

    /// Log one set against an attempt
    LogSet {
        #[arg(long)]
        attempt: Uuid,

        #[arg(long)]
        exercise: Uuid,

        #[arg(long = "set")]
        set_number: u32,

        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        reps: Option<u32>,

        #[arg(long)]
        rpe: Option<u8>,
    },

    /// Record a readiness check-in, or show the data-based score without inputs
    Readiness {
        #[arg(long, requires_all = ["energy", "soreness", "stress"])]
        sleep: Option<u8>,

        #[arg(long, requires = "sleep")]
        energy: Option<u8>,

        #[arg(long, requires = "sleep")]
        soreness: Option<u8>,

        #[arg(long, requires = "sleep")]
        stress: Option<u8>,

        #[arg(long)]
        notes: Option<String>,

        /// Day of the check-in (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Project the training calendar onto a day, week, month or year
    Calendar {
        #[arg(long, default_value = "week")]
        view: ViewKind,

        /// Any date inside the window (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Streak, completion counts and personal records
    Progress,

    /// Today's sessions and message
    Today,

    /// Append completed attempts to a CSV file
    Export {
        /// Output file (defaults to <data_dir>/attempts.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Everything a command needs, resolved once from flags and config
struct Context {
    data_dir: PathBuf,
    athlete: Option<Uuid>,
    now: DateTime<Utc>,
    offset: FixedOffset,
    json: bool,
    config: Config,
}

impl Context {
    fn athlete(&self) -> Result<Uuid> {
        self.athlete
            .ok_or_else(|| Error::Config("--athlete is required for this command".into()))
    }

    fn today(&self) -> NaiveDate {
        local_date(self.now, self.offset)
    }

    fn store(&self) -> Result<FileStore> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(FileStore::new(self.data_dir.join("store.json")))
    }

    fn catalog(&self) -> Result<TrainingCatalog> {
        let catalog = TrainingCatalog::load(&self.data_dir.join("catalog.json"))?;
        let errors = catalog.validate();
        if !errors.is_empty() {
            eprintln!("Catalog validation errors:");
            for error in &errors {
                eprintln!("  - {}", error);
            }
            return Err(Error::Config("Invalid catalog".into()));
        }
        Ok(catalog)
    }

    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    coachcal_core::logging::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_caller_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let ctx = Context {
        data_dir: cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone()),
        athlete: cli.athlete,
        now: cli.now.unwrap_or_else(Utc::now),
        offset: config.offset()?,
        json: cli.json,
        config,
    };
    tracing::debug!("Using data dir {:?}", ctx.data_dir);

    match cli.command {
        Commands::Start { session } => cmd_start(&ctx, session),
        Commands::Pause { session } => cmd_pause(&ctx, session),
        Commands::Resume { session } => cmd_resume(&ctx, session),
        Commands::Complete {
            session,
            rpe,
            notes,
            duration_minutes,
        } => cmd_complete(
            &ctx,
            session,
            Completion {
                overall_rpe: rpe,
                notes,
                explicit_duration_minutes: duration_minutes,
            },
        ),
        Commands::Elapsed { session } => cmd_elapsed(&ctx, session),
        Commands::LogSet {
            attempt,
            exercise,
            set_number,
            weight,
            reps,
            rpe,
        } => cmd_log_set(
            &ctx,
            attempt,
            NewSetLog {
                exercise_id: exercise,
                set_number,
                weight_kg: weight,
                reps_completed: reps,
                rpe,
            },
        ),
        Commands::Readiness {
            sleep,
            energy,
            soreness,
            stress,
            notes,
            date,
        } => {
            let inputs = match (sleep, energy, soreness, stress) {
                (Some(sleep_quality), Some(energy_level), Some(muscle_soreness), Some(stress_level)) => {
                    Some(ReadinessInputs {
                        sleep_quality,
                        energy_level,
                        muscle_soreness,
                        stress_level,
                    })
                }
                _ => None,
            };
            cmd_readiness(&ctx, inputs, notes, date)
        }
        Commands::Calendar { view, date } => cmd_calendar(&ctx, view, date),
        Commands::Progress => cmd_progress(&ctx),
        Commands::Today => cmd_today(&ctx),
        Commands::Export { output } => cmd_export(&ctx, output),
    }
}

// ============================================================================
// Lifecycle Commands
// ============================================================================

fn print_attempt(verb: &str, attempt: &SessionAttempt, now: DateTime<Utc>) {
    println!("{} attempt {}", verb, attempt.id);
    println!("  State:   {:?}", attempt.state());
    println!("  Elapsed: {}", format_elapsed(attempt.elapsed_seconds(now)));
}

fn cmd_start(ctx: &Context, session: Uuid) -> Result<()> {
    let athlete = ctx.athlete()?;
    let catalog = ctx.catalog()?;
    let template = catalog.template(session)?;

    let store = ctx.store()?;
    let attempt = SessionLifecycle::new(&store, ctx.offset).start(session, athlete, ctx.now)?;

    ctx.emit(&attempt, || {
        println!("▶ {}", template.name);
        print_attempt("Started", &attempt, ctx.now);
    })
}

fn cmd_pause(ctx: &Context, session: Uuid) -> Result<()> {
    let athlete = ctx.athlete()?;
    let store = ctx.store()?;
    let attempt = SessionLifecycle::new(&store, ctx.offset).pause(session, athlete, ctx.now)?;
    ctx.emit(&attempt, || print_attempt("Paused", &attempt, ctx.now))
}

fn cmd_resume(ctx: &Context, session: Uuid) -> Result<()> {
    let athlete = ctx.athlete()?;
    let store = ctx.store()?;
    let attempt = SessionLifecycle::new(&store, ctx.offset).resume(session, athlete, ctx.now)?;
    ctx.emit(&attempt, || print_attempt("Resumed", &attempt, ctx.now))
}

fn cmd_complete(ctx: &Context, session: Uuid, completion: Completion) -> Result<()> {
    let athlete = ctx.athlete()?;
    let store = ctx.store()?;
    let attempt =
        SessionLifecycle::new(&store, ctx.offset).complete(session, athlete, ctx.now, completion)?;

    ctx.emit(&attempt, || {
        println!("✓ Session complete!");
        println!("  Duration: {} min", attempt.duration_minutes.unwrap_or(0));
        if let Some(rpe) = attempt.overall_rpe {
            println!("  RPE:      {}", rpe);
        }
    })
}

fn cmd_elapsed(ctx: &Context, session: Uuid) -> Result<()> {
    let athlete = ctx.athlete()?;
    let store = ctx.store()?;
    let seconds = SessionLifecycle::new(&store, ctx.offset).elapsed(session, athlete, ctx.now)?;
    ctx.emit(&serde_json::json!({ "elapsed_seconds": seconds }), || {
        println!("{}", format_elapsed(seconds))
    })
}

fn cmd_log_set(ctx: &Context, attempt: Uuid, set: NewSetLog) -> Result<()> {
    let athlete = ctx.athlete()?;
    let store = ctx.store()?;
    let log = SessionLifecycle::new(&store, ctx.offset).log_set(athlete, attempt, set, ctx.now)?;

    ctx.emit(&log, || {
        let weight = log
            .weight_kg
            .map(|w| format!("{} kg", w))
            .unwrap_or_else(|| "bodyweight".into());
        let reps = log.reps_completed.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
        println!("✓ Set {} logged: {} x {}", log.set_number, weight, reps);
    })
}

// ============================================================================
// Readiness and Progress
// ============================================================================

fn cmd_readiness(
    ctx: &Context,
    inputs: Option<ReadinessInputs>,
    notes: Option<String>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let athlete = ctx.athlete()?;
    let store = ctx.store()?;
    let date = date.unwrap_or_else(|| ctx.today());

    match inputs {
        Some(inputs) => {
            let log = readiness::submit_readiness(&store, athlete, date, inputs, notes, ctx.now)?;
            ctx.emit(&log, || {
                println!("Readiness for {}: {:.2}/10", log.log_date, log.overall_score)
            })
        }
        None => {
            let attempts = store.attempts_for_athlete(athlete)?;
            let recent =
                readiness::recent_attempts(&attempts, date, readiness::WINDOW_DAYS, ctx.offset);
            let result = readiness::data_based_score(&recent, ctx.offset);
            ctx.emit(&result, || {
                println!("Readiness (last {} days): {:.1}/10", readiness::WINDOW_DAYS, result.score);
                println!("  Training load: {:.0}", result.training_load);
                println!("  Average RPE:   {:.1}", result.avg_rpe);
                println!("  Rest days:     {}", result.rest_days);
                println!("  Trend:         {:?}", result.trend);
            })
        }
    }
}

fn cmd_progress(ctx: &Context) -> Result<()> {
    let athlete = ctx.athlete()?;
    let catalog = ctx.catalog()?;
    let store = ctx.store()?;

    let attempts = store.attempts_for_athlete(athlete)?;
    let logs = store.set_logs_for_athlete(athlete)?;
    let report = ProgressReport::build(
        &attempts,
        &logs,
        &catalog.exercise_names(),
        &ReportWindow {
            today: ctx.today(),
            offset: ctx.offset,
            weeks_back: ctx.config.progress.weeks_back,
            months_back: ctx.config.progress.months_back,
        },
    );

    ctx.emit(&report, || {
        println!("Streak: {} days", report.streak);
        println!(
            "Completed: {} this week, {} this month, {} total",
            report.summary.this_week, report.summary.this_month, report.summary.total
        );
        println!("Total volume: {:.1} kg", report.total_volume);
        println!();
        println!("Weekly:");
        for bucket in &report.weekly {
            println!("  {:>8}  {}", bucket.label, "■".repeat(bucket.count));
        }
        if !report.personal_records.is_empty() {
            println!();
            println!("Personal records:");
            for pr in &report.personal_records {
                println!("  {}: {} kg ({})", pr.name, pr.weight, pr.date);
            }
        }
    })
}

// ============================================================================
// Calendar
// ============================================================================

fn project(ctx: &Context, catalog: &TrainingCatalog, view: CalendarView) -> Result<ViewModel> {
    let attempts = match ctx.athlete {
        Some(athlete) => ctx.store()?.attempts_for_athlete(athlete)?,
        None => Vec::new(),
    };
    let completions = CompletionIndex::from_attempts(&attempts, ctx.offset);
    let projector = SessionProjector::new(&catalog.templates, catalog.program_names())
        .with_indicator_limit(ctx.config.calendar.month_indicator_limit);
    Ok(projector.project(view, &completions, ctx.today()))
}

fn print_day(schedule: &DaySchedule) {
    let marker = if schedule.day.is_today { " (today)" } else { "" };
    println!("{} {}{}", schedule.day.day_of_week, schedule.day.date, marker);
    if schedule.sessions.is_empty() {
        println!("  Rest day");
    }
    for session in &schedule.sessions {
        let status = if session.completed {
            "✓"
        } else if session.started {
            "…"
        } else {
            " "
        };
        let minutes = session
            .template
            .estimated_duration_minutes
            .map(|m| format!(" ({} min)", m))
            .unwrap_or_default();
        println!(
            "  [{}] {} · {}{}",
            status, session.program_name, session.template.name, minutes
        );
    }
}

fn print_month(cells: &[MonthCell]) {
    for week in cells.chunks(7) {
        let line: Vec<String> = week
            .iter()
            .map(|cell| {
                let day = if cell.day.is_current_month {
                    format!("{:>2}", chrono::Datelike::day(&cell.day.date))
                } else {
                    " .".to_string()
                };
                let dots = "•".repeat(cell.indicators.len());
                let more = if cell.remaining > 0 {
                    format!("+{}", cell.remaining)
                } else {
                    String::new()
                };
                format!("{}{:<5}", day, format!("{}{}", dots, more))
            })
            .collect();
        println!("{}", line.join(" "));
    }
}

fn cmd_calendar(ctx: &Context, kind: ViewKind, date: Option<NaiveDate>) -> Result<()> {
    let catalog = ctx.catalog()?;
    let view = CalendarView {
        kind,
        anchor: date.unwrap_or_else(|| ctx.today()),
    };
    let model = project(ctx, &catalog, view)?;

    ctx.emit(&model, || match &model {
        ViewModel::Day { schedule } => print_day(schedule),
        ViewModel::Week { days } => days.iter().for_each(print_day),
        ViewModel::Month { cells } => print_month(cells),
        ViewModel::Year { year, months } => {
            println!("{}", year);
            for (i, count) in months.iter().enumerate() {
                println!("  {:>2}: {}", i + 1, count);
            }
        }
    })
}

fn cmd_today(ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog()?;
    let today = ctx.today();
    let model = project(
        ctx,
        &catalog,
        CalendarView {
            kind: ViewKind::Day,
            anchor: today,
        },
    )?;

    let message = ctx
        .athlete
        .and_then(|athlete| {
            daily_message(&catalog.coach_messages, daily::default_quotes(), athlete, today)
        })
        .or_else(|| {
            daily::quote_of_the_day(daily::default_quotes(), today)
                .map(|quote| DailyMessage::Quote { quote })
        });

    let output = serde_json::json!({ "calendar": &model, "message": &message });
    ctx.emit(&output, || {
        if let ViewModel::Day { schedule } = &model {
            print_day(schedule);
        }
        println!();
        match &message {
            Some(DailyMessage::Coach { message }) => println!("💬 {}", message.body),
            Some(DailyMessage::Quote { quote }) => match &quote.author {
                Some(author) => println!("“{}” · {}", quote.text, author),
                None => println!("“{}”", quote.text),
            },
            None => {}
        }
    })
}

// ============================================================================
// Export
// ============================================================================

fn cmd_export(ctx: &Context, output: Option<PathBuf>) -> Result<()> {
    let athlete = ctx.athlete()?;
    let store = ctx.store()?;
    let csv_path = output.unwrap_or_else(|| ctx.data_dir.join("attempts.csv"));

    let attempts = store.attempts_for_athlete(athlete)?;
    let count = export::export_completed(&attempts, &csv_path)?;

    ctx.emit(&serde_json::json!({ "exported": count, "path": display(&csv_path) }), || {
        println!("✓ Exported {} attempts to CSV", count);
        println!("  CSV: {}", csv_path.display());
    })
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
