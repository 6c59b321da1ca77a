use std::io::{self, Write};

use serde::Serialize;

use crate::tracker::{
    activity::Activity,
    store::{Totals, WeeklySummary},
};

const SEPARATOR_WIDTH: usize = 50;

fn separator(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))
}

/// Full listing. Numbers are 1-based and are what `delete` expects.
pub fn write_all_activities<'a>(
    out: &mut impl Write,
    activities: impl IntoIterator<Item = &'a Activity>,
) -> io::Result<()> {
    writeln!(out, "\nAll Fitness Activities:")?;
    separator(out)?;
    for (number, activity) in activities.into_iter().enumerate().map(|(i, a)| (i + 1, a)) {
        writeln!(out, "{number}. {} - {}", activity.date, activity.activity_type)?;
        writeln!(
            out,
            "   Duration: {} min | Calories: {}",
            activity.duration, activity.calories
        )?;
        // Zero distance and empty notes are shown like missing ones.
        if let Some(distance) = activity.distance.filter(|d| *d != 0.) {
            writeln!(out, "   Distance: {distance} km")?;
        }
        if let Some(notes) = activity.notes.as_deref().filter(|n| !n.is_empty()) {
            writeln!(out, "   Notes: {notes}")?;
        }
        separator(out)?;
    }
    Ok(())
}

pub fn write_activities_on_date(
    out: &mut impl Write,
    date: &str,
    activities: &[&Activity],
) -> io::Result<()> {
    if activities.is_empty() {
        return writeln!(out, "No activities found for {date}.");
    }
    writeln!(out, "\nActivities on {date}:")?;
    for (i, activity) in activities.iter().enumerate() {
        writeln!(
            out,
            "{}. {} - {} min, {} cal",
            i + 1,
            activity.activity_type,
            activity.duration,
            activity.calories
        )?;
    }
    Ok(())
}

pub fn write_activities_of_type(
    out: &mut impl Write,
    activity_type: &str,
    activities: &[&Activity],
) -> io::Result<()> {
    if activities.is_empty() {
        return writeln!(out, "No {activity_type} activities found.");
    }
    writeln!(out, "\nAll {activity_type} activities:")?;
    for (i, activity) in activities.iter().enumerate() {
        writeln!(
            out,
            "{}. {} - {} min, {} cal",
            i + 1,
            activity.date,
            activity.duration,
            activity.calories
        )?;
    }
    Ok(())
}

pub fn write_weekly_summary(out: &mut impl Write, summary: &WeeklySummary) -> io::Result<()> {
    writeln!(
        out,
        "\nWeekly Summary ({} to {}):",
        summary.start_date, summary.end_date
    )?;
    writeln!(out, "Total Activities: {}", summary.activity_count)?;
    writeln!(out, "Total Duration: {} minutes", summary.total_duration)?;
    writeln!(out, "Total Calories Burned: {}", summary.total_calories)
}

pub fn write_totals(out: &mut impl Write, totals: &Totals) -> io::Result<()> {
    writeln!(out, "\nTotal Statistics:")?;
    writeln!(out, "Total Activities: {}", totals.activity_count)?;
    writeln!(out, "Total Duration: {} minutes", totals.total_duration)?;
    writeln!(out, "Total Calories Burned: {}", totals.total_calories)
}

/// Activities are rendered in their stored mapping form.
pub fn write_activities_json<'a>(
    out: &mut impl Write,
    activities: impl IntoIterator<Item = &'a Activity>,
) -> io::Result<()> {
    let mappings = activities
        .into_iter()
        .map(|a| {
            a.to_mapping()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        })
        .collect::<io::Result<Vec<_>>>()?;
    write_json(out, &mappings)
}

pub fn write_json(out: &mut impl Write, value: &(impl Serialize + ?Sized)) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
