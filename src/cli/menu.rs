use std::io::{BufRead, Write};

use anyhow::Result;
use chrono::Local;
use tracing::debug;

use crate::tracker::{activity::Activity, storage::ActivityStorage, store::ActivityStore};

use super::{
    input::{
        display_number_to_index, parse_date, parse_number, parse_optional_number,
        parse_optional_text, DateStyle,
    },
    output::{
        write_activities_of_type, write_activities_on_date, write_all_activities, write_totals,
        write_weekly_summary,
    },
};

const MENU: &str = "
Fitness Tracker Menu:
1. Add new activity
2. View all activities
3. View activities by date
4. View activities by type
5. View weekly summary
6. Delete an activity
7. View total statistics
8. Exit";

enum Flow {
    Continue,
    Exit,
}

/// Interactive text menu. Reads choices from `input` and writes everything to `output`, so it
/// can run against a terminal or against scripted input.
pub struct Menu<R, W> {
    input: R,
    output: W,
    date_style: DateStyle,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, date_style: DateStyle) -> Self {
        Self {
            input,
            output,
            date_style,
        }
    }

    /// Runs until the user picks exit or input ends. Bad input is reported and the menu is shown
    /// again; only storage failures end the loop with an error.
    pub fn run<S: ActivityStorage>(&mut self, store: &mut ActivityStore<S>) -> Result<()> {
        loop {
            writeln!(self.output, "{MENU}")?;
            let Some(choice) = self.read_line("Enter your choice (1-8): ")? else {
                debug!("Input closed, leaving menu");
                return Ok(());
            };

            let flow = match choice.trim() {
                "1" => self.add(store)?,
                "2" => self.list_all(store)?,
                "3" => self.by_date(store)?,
                "4" => self.by_type(store)?,
                "5" => self.weekly_summary(store)?,
                "6" => self.delete(store)?,
                "7" => self.totals(store)?,
                "8" => {
                    writeln!(self.output, "Exiting Fitness Tracker. Goodbye!")?;
                    Flow::Exit
                }
                _ => {
                    writeln!(
                        self.output,
                        "Invalid choice. Please enter a number between 1 and 8."
                    )?;
                    Flow::Continue
                }
            };

            if let Flow::Exit = flow {
                return Ok(());
            }
        }
    }

    /// `None` once input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Answers to follow-up questions. Running out of input reads as a blank answer; the menu
    /// loop notices the end right after.
    fn ask(&mut self, prompt: &str) -> Result<String> {
        Ok(self.read_line(prompt)?.unwrap_or_default())
    }

    fn invalid(&mut self, e: anyhow::Error) -> Result<Flow> {
        writeln!(self.output, "{e}")?;
        Ok(Flow::Continue)
    }

    fn add<S: ActivityStorage>(&mut self, store: &mut ActivityStore<S>) -> Result<Flow> {
        writeln!(self.output, "\nAdd New Activity")?;
        let activity_type = self.ask("Activity type (e.g., Running, Swimming): ")?;
        let duration = match parse_number(&self.ask("Duration (minutes): ")?, "Duration") {
            Ok(v) => v,
            Err(e) => return self.invalid(e),
        };
        let calories = match parse_number(&self.ask("Calories burned: ")?, "Calories") {
            Ok(v) => v,
            Err(e) => return self.invalid(e),
        };
        let distance = match parse_optional_number(
            &self.ask("Distance (km, optional - press enter to skip): ")?,
            "Distance",
        ) {
            Ok(v) => v,
            Err(e) => return self.invalid(e),
        };
        let notes = parse_optional_text(&self.ask("Notes (optional - press enter to skip): ")?);

        let activity = Activity::new(activity_type.trim(), duration, calories)
            .with_distance(distance)
            .with_notes(notes);
        store.add(activity)?;
        writeln!(self.output, "Activity added successfully!")?;
        Ok(Flow::Continue)
    }

    fn list_all<S: ActivityStorage>(&mut self, store: &ActivityStore<S>) -> Result<Flow> {
        write_all_activities(&mut self.output, store.activities())?;
        Ok(Flow::Continue)
    }

    fn by_date<S: ActivityStorage>(&mut self, store: &ActivityStore<S>) -> Result<Flow> {
        let input = self.ask("Enter date (YYYY-MM-DD): ")?;
        let date = match parse_date(&input, self.date_style, Local::now()) {
            Ok(v) => v,
            Err(e) => return self.invalid(e),
        };
        write_activities_on_date(&mut self.output, &date, &store.activities_by_date(&date))?;
        Ok(Flow::Continue)
    }

    fn by_type<S: ActivityStorage>(&mut self, store: &ActivityStore<S>) -> Result<Flow> {
        let input = self.ask("Enter activity type: ")?;
        let activity_type = input.trim();
        write_activities_of_type(
            &mut self.output,
            activity_type,
            &store.activities_by_type(activity_type),
        )?;
        Ok(Flow::Continue)
    }

    fn weekly_summary<S: ActivityStorage>(&mut self, store: &ActivityStore<S>) -> Result<Flow> {
        let input = self.ask("Enter how many weeks ago (0 for current week): ")?;
        let Ok(weeks_ago) = input.trim().parse::<u32>() else {
            writeln!(self.output, "Weeks ago should be a whole number of 0 or more.")?;
            return Ok(Flow::Continue);
        };
        match store.weekly_summary(weeks_ago) {
            Ok(summary) => write_weekly_summary(&mut self.output, &summary)?,
            // Broken stored dates are worth reporting, not worth leaving the menu over.
            Err(e) => writeln!(self.output, "Can't build the summary: {e}")?,
        }
        Ok(Flow::Continue)
    }

    fn delete<S: ActivityStorage>(&mut self, store: &mut ActivityStore<S>) -> Result<Flow> {
        write_all_activities(&mut self.output, store.activities())?;
        if store.is_empty() {
            return Ok(Flow::Continue);
        }

        // Numbers refer to the listing above, whatever happens to positions meanwhile.
        let shown = store.entries().map(|(id, _)| id).collect::<Vec<_>>();
        let input = self.ask("Enter activity number to delete: ")?;
        let deleted = match display_number_to_index(&input).and_then(|i| shown.get(i)) {
            Some(id) => store.remove(*id)?.is_some(),
            None => false,
        };
        if deleted {
            writeln!(self.output, "Activity deleted successfully!")?;
        } else {
            writeln!(self.output, "Invalid activity number.")?;
        }
        Ok(Flow::Continue)
    }

    fn totals<S: ActivityStorage>(&mut self, store: &ActivityStore<S>) -> Result<Flow> {
        write_totals(&mut self.output, &store.totals())?;
        Ok(Flow::Continue)
    }
}
