pub mod input;
pub mod menu;
pub mod output;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use input::{display_number_to_index, parse_date, parse_finite, DateStyle};
use menu::Menu;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    tracker::{
        activity::Activity,
        storage::{ActivityStorage, JsonFileStorage},
        store::ActivityStore,
    },
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

pub const DEFAULT_DATA_FILE: &str = "fitness_data.json";

#[derive(Parser, Debug)]
#[command(name = "fitlog", version, long_about = None)]
#[command(about = "Personal fitness activity logger", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Option<Commands>,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "FITLOG_DATA_FILE",
        help = "File activities are stored in. Defaults to fitness_data.json in the application directory"
    )]
    data_file: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, global = true, help = "Print results as JSON")]
    json: bool,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Interactive menu. This is the default when no command is given")]
    Menu,
    #[command(about = "Log a new activity")]
    Add {
        #[arg(help = "Activity type, e.g. Running or Swimming")]
        activity_type: String,
        #[arg(value_parser = parse_finite, allow_negative_numbers = true, help = "Duration in minutes")]
        duration: f64,
        #[arg(value_parser = parse_finite, allow_negative_numbers = true, help = "Calories burned")]
        calories: f64,
        #[arg(long, value_parser = parse_finite, allow_negative_numbers = true, help = "Distance in kilometers")]
        distance: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(
            long,
            help = "Date of the activity. Examples are \"2024-03-15\", \"yesterday\", \"15/03/2024\". Defaults to today"
        )]
        date: Option<String>,
    },
    #[command(about = "List all activities")]
    List,
    #[command(about = "List activities on a date")]
    On { date: String },
    #[command(about = "List activities of a type, ignoring case")]
    OfType { activity_type: String },
    #[command(about = "Summarize a 7 day window")]
    Summary {
        #[arg(long, short, default_value_t = 0, help = "How many weeks back the window ends")]
        weeks_ago: u32,
    },
    #[command(about = "Delete an activity by the number shown in `list`")]
    Delete {
        #[arg(allow_hyphen_values = true)]
        number: String,
    },
    #[command(about = "Show totals over all activities")]
    Totals,
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    // JSON output is meant for scripts, so those runs leave no log files behind.
    let log_dir = app_dir.join("logs");
    let log_dir = (!args.json).then_some(log_dir.as_path());
    enable_logging(CLI_PREFIX, log_dir, logging_level, args.log)?;

    let data_file = args
        .data_file
        .unwrap_or_else(|| app_dir.join(DEFAULT_DATA_FILE));
    info!("Using data file {data_file:?}");
    let storage = JsonFileStorage::new(data_file.clone())?;
    let mut store = ActivityStore::open(storage, Box::new(DefaultClock))
        .with_context(|| format!("Failed to load activities from {data_file:?}"))?;

    run_command(
        args.commands.unwrap_or(Commands::Menu),
        &mut store,
        io::stdin().lock(),
        io::stdout().lock(),
        args.date_style,
        args.json,
    )
}

fn run_command<S: ActivityStorage>(
    command: Commands,
    store: &mut ActivityStore<S>,
    input: impl BufRead,
    mut out: impl Write,
    date_style: DateStyle,
    json: bool,
) -> Result<()> {
    let out = &mut out;
    match command {
        Commands::Menu => Menu::new(input, out, date_style).run(store)?,
        Commands::Add {
            activity_type,
            duration,
            calories,
            distance,
            notes,
            date,
        } => {
            let mut activity = Activity::new(activity_type, duration, calories)
                .with_distance(distance)
                .with_notes(notes);
            if let Some(date) = date {
                activity = activity.with_date(parse_date(&date, date_style, Local::now())?);
            }
            let date = activity.date.clone();
            store.add(activity)?;
            writeln!(out, "Activity added for {date}.")?;
        }
        Commands::List if json => output::write_activities_json(out, store.activities())?,
        Commands::List => output::write_all_activities(out, store.activities())?,
        Commands::On { date } => {
            let date = parse_date(&date, date_style, Local::now())?;
            let activities = store.activities_by_date(&date);
            if json {
                output::write_activities_json(out, activities)?;
            } else {
                output::write_activities_on_date(out, &date, &activities)?;
            }
        }
        Commands::OfType { activity_type } => {
            let activities = store.activities_by_type(&activity_type);
            if json {
                output::write_activities_json(out, activities)?;
            } else {
                output::write_activities_of_type(out, &activity_type, &activities)?;
            }
        }
        Commands::Summary { weeks_ago } => {
            let summary = store.weekly_summary(weeks_ago)?;
            if json {
                output::write_json(out, &summary)?;
            } else {
                output::write_weekly_summary(out, &summary)?;
            }
        }
        Commands::Delete { number } => {
            let deleted = match display_number_to_index(&number) {
                Some(index) => store.delete(index)?,
                None => false,
            };
            if deleted {
                writeln!(out, "Activity deleted successfully!")?;
            } else {
                writeln!(out, "Invalid activity number.")?;
            }
        }
        Commands::Totals if json => output::write_json(out, &store.totals())?,
        Commands::Totals => output::write_totals(out, &store.totals())?,
    }
    Ok(())
}
