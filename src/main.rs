use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod dataset;
mod error;
mod filters;
mod models;
mod questions;
mod relationships;
mod report;
mod reshape;
mod state;

use aggregate::Granularity;
use dataset::RowStore;
use filters::{AgeBucket, AppointmentBucket, DistanceThreshold, NEXT_STEPS, RACES};
use models::{QuestionKey, SubmissionRole};
use questions::{Audience, CATEGORIES};
use state::{DashboardState, FilterGroup, View};

#[derive(Parser)]
#[command(name = "sdm-dashboard")]
#[command(about = "Shared decision-making survey dashboard for multidisciplinary prostate cancer care teams", long_about = None)]
struct Cli {
    /// Survey CSV export
    #[arg(
        long,
        global = true,
        env = "SDM_DATASET",
        default_value = "data/radar_survey_synthetic_data.csv"
    )]
    data: PathBuf,
    /// Date that appointment recency is measured from (defaults to now)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,
    /// Dashboard state to start from
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter patients and list the specialists linked to them
    Filter {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Mean scores per role, ready for a radar chart
    Radar {
        #[command(flatten)]
        session: SessionArgs,
        /// Group the ten questions into the four SDM categories
        #[arg(long)]
        by_category: bool,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Score distribution per role and category
    Violin {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print the survey questions as worded for each role
    Questions {
        #[arg(long)]
        by_category: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Args)]
struct SessionArgs {
    #[arg(long, value_enum)]
    age: Vec<AgeBucket>,
    #[arg(long)]
    race: Vec<String>,
    #[arg(long, value_enum)]
    appointment: Vec<AppointmentBucket>,
    /// Exclude patients living this many miles away or more (400 disables)
    #[arg(long, value_parser = clap::value_parser!(u32).range(5..=400))]
    max_distance: Option<u32>,
    #[arg(long)]
    next_step: Vec<String>,
    /// Only patients with at least one answer at or below 3
    #[arg(long)]
    low_score: bool,
    /// Clear a filter group carried over from --state
    #[arg(long, value_enum)]
    reset: Vec<FilterGroup>,
    /// Patient ids to select (default: every matched patient)
    #[arg(long)]
    patient: Vec<String>,
    /// Radiation oncologist ids to select (default: every linked one)
    #[arg(long)]
    ro: Vec<String>,
    /// Urologic oncologist ids to select (default: every linked one)
    #[arg(long)]
    uo: Vec<String>,
    /// Flip patient ids in the selection carried over from --state
    #[arg(long)]
    toggle_patient: Vec<String>,
    #[arg(long)]
    toggle_ro: Vec<String>,
    #[arg(long)]
    toggle_uo: Vec<String>,
    /// Write the resulting dashboard state here
    #[arg(long)]
    save_state: Option<PathBuf>,
}

struct Session {
    store: RowStore,
    state: DashboardState,
    evaluated_at: chrono::NaiveDateTime,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Filter {
            session: args,
            format,
        } => {
            let mut session = open_session(&cli.data, cli.state.as_deref(), cli.as_of, &args)?;
            let matched: Vec<models::SurveyRow> = session
                .state
                .submit_filters(&session.store, session.evaluated_at)
                .rows
                .into_iter()
                .cloned()
                .collect();
            apply_selection(&mut session, &args);
            let candidates = session.state.candidates(&session.store);
            session.state.open(View::Filters)?;

            match format {
                Format::Json => {
                    let body = serde_json::json!({
                        "matched": matched,
                        "radiation_oncologists": candidates.radiation,
                        "urologic_oncologists": candidates.urologic,
                    });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Format::Text => {
                    if matched.is_empty() {
                        println!("No patients match these filters.");
                    } else {
                        println!("Matched patients: {}", matched.len());
                        for row in &matched {
                            println!(
                                "- {} (age {}, {}, {} miles, {})",
                                row.id,
                                display_number(row.age),
                                row.race.as_deref().unwrap_or("race unknown"),
                                display_number(row.distance_miles),
                                row.next_steps
                            );
                        }
                    }
                    println!("Radiation oncologists: {}", display_ids(&candidates.radiation));
                    println!("Urologic oncologists: {}", display_ids(&candidates.urologic));
                }
            }

            save_state(&session.state, args.save_state.as_deref())?;
        }
        Commands::Radar {
            session: args,
            by_category,
            format,
        } => {
            let Session { store, mut state, .. } =
                prepare_selection(&cli.data, cli.state.as_deref(), cli.as_of, &args)?;
            state.open(View::Radar)?;

            let granularity = if by_category {
                Granularity::Category
            } else {
                Granularity::Question
            };
            let chart = aggregate::chart_data(&store, &state.selection, granularity);
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&chart)?),
                Format::Text => print!("{}", report::render_chart_table(&chart)),
            }

            save_state(&state, args.save_state.as_deref())?;
        }
        Commands::Violin {
            session: args,
            format,
        } => {
            let Session { store, mut state, .. } =
                prepare_selection(&cli.data, cli.state.as_deref(), cli.as_of, &args)?;
            state.open(View::Violin)?;

            let records = reshape::long_form(&store, &state.selection);
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                Format::Text => {
                    let summaries = reshape::summarize(&records);
                    if summaries.is_empty() {
                        println!("No answered questions in this selection.");
                    }
                    for s in summaries {
                        println!(
                            "{:<22} {:<26} n={:<4} min {:.1}  q1 {:.2}  median {:.2}  q3 {:.2}  max {:.1}  mean {:.1}",
                            s.role,
                            s.category,
                            s.count,
                            s.min,
                            s.lower_quartile,
                            s.median,
                            s.upper_quartile,
                            s.max,
                            s.mean
                        );
                    }
                }
            }

            save_state(&state, args.save_state.as_deref())?;
        }
        Commands::Report { session: args, out } => {
            let mut session = open_session(&cli.data, cli.state.as_deref(), cli.as_of, &args)?;
            session
                .state
                .submit_filters(&session.store, session.evaluated_at);
            apply_selection(&mut session, &args);

            let report = report::build_report(&session.store, &session.state, session.evaluated_at);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());

            save_state(&session.state, args.save_state.as_deref())?;
        }
        Commands::Questions { by_category } => print_questions(by_category),
    }

    Ok(())
}

/// Loads the data and the starting state, then layers the command-line
/// filter flags over the state's filters.
fn open_session(
    data: &Path,
    state_path: Option<&Path>,
    as_of: Option<NaiveDate>,
    args: &SessionArgs,
) -> anyhow::Result<Session> {
    let mut state = match state_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read dashboard state {}", path.display()))?;
            DashboardState::from_json(&text)?
        }
        None => DashboardState::default(),
    };

    for group in &args.reset {
        state.reset_group(*group);
    }
    merge_filters(&mut state, args)?;

    let store = RowStore::load(data).with_context(|| {
        format!("survey data unavailable ({})", data.display())
    })?;
    if store.is_empty() {
        tracing::warn!(path = %data.display(), "survey data has no rows");
    }

    Ok(Session {
        store,
        state,
        evaluated_at: filters::evaluation_time(as_of),
    })
}

fn prepare_selection(
    data: &Path,
    state_path: Option<&Path>,
    as_of: Option<NaiveDate>,
    args: &SessionArgs,
) -> anyhow::Result<Session> {
    let mut session = open_session(data, state_path, as_of, args)?;
    session.state.submit_filters(&session.store, session.evaluated_at);
    apply_selection(&mut session, args);
    session.state.require_complete()?;
    Ok(session)
}

fn merge_filters(state: &mut DashboardState, args: &SessionArgs) -> anyhow::Result<()> {
    let filters = &mut state.filters;
    if !args.age.is_empty() {
        filters.ages = args.age.clone();
    }
    if !args.race.is_empty() {
        for race in args.race.iter().filter(|r| !RACES.contains(&r.as_str())) {
            tracing::warn!(race = %race, "race is not one of the survey's choices");
        }
        filters.races = args.race.clone();
    }
    if !args.appointment.is_empty() {
        filters.appointments = args.appointment.clone();
    }
    if let Some(miles) = args.max_distance {
        filters.distance = DistanceThreshold::new(miles)?;
    }
    if !args.next_step.is_empty() {
        for step in args.next_step.iter().filter(|s| !NEXT_STEPS.contains(&s.as_str())) {
            tracing::warn!(next_step = %step, "next step is not one of the survey's choices");
        }
        filters.next_steps = args.next_step.clone();
    }
    if args.low_score {
        filters.low_score_only = true;
    }
    Ok(())
}

/// Explicit ids replace a role's selection, then toggles flip single ids. A
/// role left empty selects every candidate. Ids that are not candidates are
/// dropped.
fn apply_selection(session: &mut Session, args: &SessionArgs) {
    let candidates = session.state.candidates(&session.store);
    let explicit = [
        (SubmissionRole::Patient, &args.patient),
        (SubmissionRole::RadiationOncology, &args.ro),
        (SubmissionRole::UrologicOncology, &args.uo),
    ];

    for (role, ids) in explicit {
        if !ids.is_empty() {
            session.state.clear(role);
            for id in ids {
                session.state.select(role, id);
            }
        }
    }

    let toggled = [
        (SubmissionRole::Patient, &args.toggle_patient),
        (SubmissionRole::RadiationOncology, &args.toggle_ro),
        (SubmissionRole::UrologicOncology, &args.toggle_uo),
    ];
    for (role, ids) in toggled {
        for id in ids {
            session.state.toggle(role, id);
        }
    }

    for (role, id) in session.state.prune(&candidates) {
        tracing::warn!(%role, id = %id, "dropping selection that is not among the filtered candidates");
    }

    for role in SubmissionRole::ALL {
        if session.state.selection.ids(role).is_empty() {
            session.state.select_all(role, &candidates);
        }
    }
}

fn save_state(state: &DashboardState, path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        std::fs::write(path, state.to_json()?)
            .with_context(|| format!("failed to write dashboard state to {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved dashboard state");
    }
    Ok(())
}

fn print_questions(by_category: bool) {
    if by_category {
        for category in CATEGORIES.iter() {
            println!("{}", questions::annotated_category(category));
            for key in category.questions {
                println!("  {}", key.short_label());
                for audience in [Audience::Patient, Audience::Oncologist] {
                    println!(
                        "    {}: {}",
                        audience.heading(),
                        questions::wording(audience, *key)
                    );
                }
            }
        }
        return;
    }

    for audience in [Audience::Patient, Audience::Oncologist] {
        println!("{}", audience.heading());
        for key in QuestionKey::all() {
            let category = questions::category_of(key).map_or("", |c| c.name);
            println!(
                "  {:>2}. {} [{}]",
                key.number(),
                questions::wording(audience, key),
                category
            );
        }
    }
}

fn display_number(value: Option<f64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| format!("{v}"))
}

fn display_ids(ids: &[String]) -> String {
    if ids.is_empty() {
        "none".to_string()
    } else {
        ids.join(", ")
    }
}
