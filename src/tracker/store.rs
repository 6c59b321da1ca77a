use std::fmt::Display;

use chrono::TimeDelta;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::utils::{clock::Clock, time::date_to_record_name};

use super::{
    activity::{Activity, ActivityError},
    storage::ActivityStorage,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data is not a list of records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record {position} is malformed: {source}")]
    Record {
        position: usize,
        #[source]
        source: ActivityError,
    },

    #[error("A window {weeks_ago} weeks back can't be represented")]
    WindowOutOfRange { weeks_ago: u32 },
}

/// Opaque handle of an activity, stable for as long as the store is alive. Unlike positions it
/// survives removal of other activities. Ids are never written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActivityId(u64);

impl Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub start_date: String,
    pub end_date: String,
    pub total_calories: f64,
    pub total_duration: f64,
    pub activity_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub activity_count: usize,
    pub total_duration: f64,
    pub total_calories: f64,
}

const DAYS_IN_WEEK: i64 = 7;

/// Ordered collection of activities mirrored to an [ActivityStorage].
///
/// Every mutation rewrites the whole storage. Only one store should operate on a given storage
/// at a time.
pub struct ActivityStore<S: ActivityStorage> {
    storage: S,
    clock: Box<dyn Clock>,
    entries: Vec<(ActivityId, Activity)>,
    next_id: u64,
}

impl<S: ActivityStorage> ActivityStore<S> {
    /// Creates a store and fills it with whatever `storage` holds.
    pub fn open(storage: S, clock: Box<dyn Clock>) -> Result<Self, StoreError> {
        let mut store = Self {
            storage,
            clock,
            entries: Vec::new(),
            next_id: 0,
        };
        store.reload()?;
        Ok(store)
    }

    fn issue_id(&mut self) -> ActivityId {
        let id = ActivityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Activity> {
        self.entries.get(index).map(|(_, activity)| activity)
    }

    /// Activities in insertion order.
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.entries.iter().map(|(_, activity)| activity)
    }

    pub fn entries(&self) -> impl Iterator<Item = (ActivityId, &Activity)> {
        self.entries.iter().map(|(id, activity)| (*id, activity))
    }

    /// Appends `activity` and persists. An activity that can't be stored (see
    /// [Activity::to_mapping]) is rejected before anything changes.
    pub fn add(&mut self, activity: Activity) -> Result<ActivityId, StoreError> {
        activity
            .to_mapping()
            .map_err(|source| StoreError::Record {
                position: self.entries.len(),
                source,
            })?;
        let id = self.issue_id();
        info!(
            "Adding {} activity {id} dated {}",
            activity.activity_type, activity.date
        );
        self.entries.push((id, activity));
        self.persist()?;
        Ok(id)
    }

    /// Removes the activity at `index`. Positions after it shift down by one. Returns `false`
    /// and leaves everything untouched when `index` is out of range.
    pub fn delete(&mut self, index: usize) -> Result<bool, StoreError> {
        if index >= self.entries.len() {
            warn!(
                "Refusing to delete position {index}, store holds {}",
                self.entries.len()
            );
            return Ok(false);
        }

        let (id, removed) = self.entries.remove(index);
        info!("Deleted {} activity {id} at {index}", removed.activity_type);
        self.persist()?;
        Ok(true)
    }

    pub fn remove(&mut self, id: ActivityId) -> Result<Option<Activity>, StoreError> {
        let Some(index) = self.entries.iter().position(|(v, _)| *v == id) else {
            warn!("No activity with id {id}");
            return Ok(None);
        };

        let (_, removed) = self.entries.remove(index);
        info!("Removed {} activity {id}", removed.activity_type);
        self.persist()?;
        Ok(Some(removed))
    }

    /// Exact string match on the stored date.
    pub fn activities_by_date(&self, date: &str) -> Vec<&Activity> {
        self.activities().filter(|a| a.date == date).collect()
    }

    pub fn activities_by_type(&self, activity_type: &str) -> Vec<&Activity> {
        let wanted = activity_type.to_lowercase();
        self.activities()
            .filter(|a| a.activity_type.to_lowercase() == wanted)
            .collect()
    }

    pub fn total_calories(&self) -> f64 {
        self.activities().map(|a| a.calories).sum()
    }

    pub fn total_duration(&self) -> f64 {
        self.activities().map(|a| a.duration).sum()
    }

    pub fn totals(&self) -> Totals {
        Totals {
            activity_count: self.len(),
            total_duration: self.total_duration(),
            total_calories: self.total_calories(),
        }
    }

    /// Summarizes the 7 days ending `weeks_ago` weeks before now. Both window ends are inclusive
    /// and compared by calendar date, so the window spans 8 dates.
    pub fn weekly_summary(&self, weeks_ago: u32) -> Result<WeeklySummary, StoreError> {
        let out_of_range = || StoreError::WindowOutOfRange { weeks_ago };
        let now = self.clock.time();
        let end = TimeDelta::try_days(i64::from(weeks_ago) * DAYS_IN_WEEK)
            .and_then(|offset| now.checked_sub_signed(offset))
            .ok_or_else(out_of_range)?;
        let start = TimeDelta::try_days(DAYS_IN_WEEK)
            .and_then(|offset| end.checked_sub_signed(offset))
            .ok_or_else(out_of_range)?;
        let (start, end) = (start.date(), end.date());

        let mut summary = WeeklySummary {
            start_date: date_to_record_name(start),
            end_date: date_to_record_name(end),
            total_calories: 0.,
            total_duration: 0.,
            activity_count: 0,
        };

        for (position, activity) in self.activities().enumerate() {
            let date = activity
                .parsed_date()
                .map_err(|source| StoreError::Record { position, source })?;
            if start <= date && date <= end {
                summary.total_calories += activity.calories;
                summary.total_duration += activity.duration;
                summary.activity_count += 1;
            }
        }

        debug!(
            "Summary {} to {} covers {} activities",
            summary.start_date, summary.end_date, summary.activity_count
        );
        Ok(summary)
    }

    /// Writes the whole collection over whatever the storage held before.
    pub fn persist(&self) -> Result<(), StoreError> {
        let records = self
            .activities()
            .enumerate()
            .map(|(position, activity)| {
                activity
                    .to_mapping()
                    .map_err(|source| StoreError::Record { position, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.storage.save(&records)
    }

    /// Replaces the in-memory collection with the stored one. If nothing is stored the
    /// collection is left as it is. A single malformed record fails the whole reload and
    /// leaves memory untouched.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let Some(records) = self.storage.load()? else {
            debug!("Nothing stored yet, keeping {} activities", self.len());
            return Ok(());
        };

        let activities = records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                Activity::from_mapping(record)
                    .map_err(|source| StoreError::Record { position, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entries = activities
            .into_iter()
            .map(|activity| (self.issue_id(), activity))
            .collect();
        self.entries = entries;
        debug!("Reloaded {} activities", self.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, fs};

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime};
    use serde_json::json;
    use tempfile::tempdir;

    use crate::{
        tracker::{
            activity::{tests::edge_activities, Activity, ActivityError, ActivityMapping},
            storage::{ActivityStorage, JsonFileStorage},
        },
        utils::{
            clock::{DefaultClock, MockClock},
            logging::TEST_LOGGING,
        },
    };

    use super::{ActivityStore, StoreError};

    /// Keeps records in memory and counts writes.
    #[derive(Default)]
    struct MemoryStorage {
        records: RefCell<Option<Vec<ActivityMapping>>>,
        saves: RefCell<usize>,
    }

    impl ActivityStorage for MemoryStorage {
        fn load(&self) -> Result<Option<Vec<ActivityMapping>>, StoreError> {
            Ok(self.records.borrow().clone())
        }

        fn save(&self, records: &[ActivityMapping]) -> Result<(), StoreError> {
            *self.records.borrow_mut() = Some(records.to_vec());
            *self.saves.borrow_mut() += 1;
            Ok(())
        }
    }

    /// A Friday evening, 2024-03-15 18:30.
    fn test_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .and_then(|d| d.and_hms_opt(18, 30, 0))
            .unwrap()
    }

    fn fixed_clock(now: NaiveDateTime) -> Box<MockClock> {
        let mut clock = MockClock::new();
        clock.expect_time().return_const(now);
        Box::new(clock)
    }

    fn running(date: &str, calories: f64) -> Activity {
        Activity::new("Running", 30., calories).with_date(date)
    }

    #[test]
    fn test_end_to_end_example() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = JsonFileStorage::new(dir.path().join("fitness_data.json"))?;
        let mut store = ActivityStore::open(storage, Box::new(DefaultClock))?;
        assert!(store.is_empty());

        store.add(Activity::new("Running", 30., 300.).with_date("2024-01-01"))?;
        assert_eq!(store.total_duration(), 30.);
        assert_eq!(store.activities_by_date("2024-01-01").len(), 1);

        assert!(store.delete(0)?);
        assert!(store.is_empty());
        assert!(!store.delete(0)?);
        Ok(())
    }

    #[test]
    fn test_mutations_persist_immediately() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;

        store.add(running("2024-01-01", 300.))?;
        store.add(running("2024-01-02", 250.))?;
        assert_eq!(*storage.saves.borrow(), 2);
        assert_eq!(storage.records.borrow().as_ref().map(Vec::len), Some(2));

        store.delete(0)?;
        assert_eq!(*storage.saves.borrow(), 3);
        let stored = storage.records.borrow().clone().unwrap_or_default();
        assert_eq!(Activity::from_mapping(&stored[0])?.date, "2024-01-02");
        Ok(())
    }

    #[test]
    fn test_delete_out_of_range_changes_nothing() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        store.add(running("2024-01-01", 100.))?;
        store.add(running("2024-01-02", 200.))?;
        let before = store.activities().cloned().collect::<Vec<_>>();
        let saves = *storage.saves.borrow();

        assert!(!store.delete(2)?);
        assert!(!store.delete(usize::MAX)?);

        assert_eq!(store.activities().cloned().collect::<Vec<_>>(), before);
        assert_eq!(*storage.saves.borrow(), saves);
        Ok(())
    }

    #[test]
    fn test_delete_shifts_positions() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        for day in 1..=4 {
            store.add(running(&format!("2024-01-0{day}"), 100.))?;
        }

        assert!(store.delete(1)?);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(1).map(|a| a.date.as_str()), Some("2024-01-03"));
        assert_eq!(store.get(0).map(|a| a.date.as_str()), Some("2024-01-01"));
        Ok(())
    }

    #[test]
    fn test_ids_survive_other_deletes() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        let first = store.add(running("2024-01-01", 100.))?;
        let second = store.add(running("2024-01-02", 200.))?;
        let third = store.add(running("2024-01-03", 300.))?;

        assert!(store.delete(0)?);
        assert_eq!(store.remove(first)?, None);

        let removed = store.remove(third)?;
        assert_eq!(removed.map(|a| a.date), Some("2024-01-03".to_string()));
        assert_eq!(
            store.entries().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![second]
        );
        Ok(())
    }

    #[test]
    fn test_type_filter_ignores_case() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        store.add(Activity::new("Running", 30., 300.))?;
        store.add(Activity::new("running", 20., 200.))?;
        store.add(Activity::new("RUNNING", 10., 100.))?;
        store.add(Activity::new("Swimming", 40., 400.))?;

        let lower = store.activities_by_type("running");
        let upper = store.activities_by_type("RUNNING");
        assert_eq!(lower, upper);
        assert_eq!(lower.len(), 3);
        // Stored casing is preserved.
        assert_eq!(lower[0].activity_type, "Running");
        assert!(store.activities_by_type("Run").is_empty());
        Ok(())
    }

    #[test]
    fn test_date_filter_is_exact_and_ordered() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        store.add(Activity::new("Running", 30., 300.).with_date("2024-01-01"))?;
        store.add(Activity::new("Yoga", 60., 150.).with_date("2024-01-02"))?;
        store.add(Activity::new("Cycling", 90., 700.).with_date("2024-01-01"))?;

        let on_day = store.activities_by_date("2024-01-01");
        assert_eq!(
            on_day.iter().map(|a| a.activity_type.as_str()).collect::<Vec<_>>(),
            vec!["Running", "Cycling"]
        );
        assert!(store.activities_by_date("2024-1-1").is_empty());
        Ok(())
    }

    #[test]
    fn test_totals() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        assert_eq!(store.total_calories(), 0.);
        assert_eq!(store.total_duration(), 0.);

        store.add(running("2024-01-01", 100.))?;
        store.add(running("2024-01-02", 250.))?;
        store.add(running("2024-01-03", 0.))?;

        assert_eq!(store.total_calories(), 350.);
        assert_eq!(store.total_duration(), 90.);
        assert_eq!(store.totals().activity_count, 3);
        Ok(())
    }

    #[test]
    fn test_weekly_window_bounds() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, fixed_clock(test_now()))?;
        store.add(running("2024-03-08", 100.))?; // exactly 7 days back
        store.add(running("2024-03-07", 200.))?; // 8 days back
        store.add(running("2024-03-15", 400.))?; // today
        store.add(running("2024-03-16", 800.))?; // tomorrow

        let summary = store.weekly_summary(0)?;
        assert_eq!(summary.start_date, "2024-03-08");
        assert_eq!(summary.end_date, "2024-03-15");
        assert_eq!(summary.activity_count, 2);
        assert_eq!(summary.total_calories, 500.);
        assert_eq!(summary.total_duration, 60.);
        Ok(())
    }

    #[test]
    fn test_weekly_window_weeks_ago() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, fixed_clock(test_now()))?;
        store.add(running("2024-03-01", 100.))?;
        store.add(running("2024-02-23", 200.))?;
        store.add(running("2024-03-10", 400.))?;

        let summary = store.weekly_summary(2)?;
        assert_eq!(summary.start_date, "2024-02-23");
        assert_eq!(summary.end_date, "2024-03-01");
        assert_eq!(summary.activity_count, 2);
        assert_eq!(summary.total_calories, 300.);

        let empty = store.weekly_summary(10)?;
        assert_eq!(empty.activity_count, 0);
        assert_eq!(empty.total_calories, 0.);
        Ok(())
    }

    #[test]
    fn test_weekly_summary_rejects_bad_dates() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, fixed_clock(test_now()))?;
        store.add(running("2024-03-10", 100.))?;
        store.add(running("10/03/2024", 100.))?;

        assert!(matches!(
            store.weekly_summary(0),
            Err(StoreError::Record {
                position: 1,
                source: ActivityError::InvalidDate { .. }
            })
        ));
        assert!(matches!(
            store.weekly_summary(u32::MAX),
            Err(StoreError::WindowOutOfRange { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_reload_after_persist_is_identical() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fitness_data.json");
        let mut store =
            ActivityStore::open(JsonFileStorage::new(path.clone())?, Box::new(DefaultClock))?;
        store.add(running("2024-01-01", 300.).with_distance(Some(5.)))?;
        store.add(
            Activity::new("Climbing", 120., 650.)
                .with_date("2024-01-03")
                .with_notes(Some("new route".into())),
        )?;
        let before = store.activities().cloned().collect::<Vec<_>>();

        store.persist()?;
        store.reload()?;
        assert_eq!(store.activities().cloned().collect::<Vec<_>>(), before);

        let reopened = ActivityStore::open(JsonFileStorage::new(path)?, Box::new(DefaultClock))?;
        assert_eq!(reopened.activities().cloned().collect::<Vec<_>>(), before);
        Ok(())
    }

    #[test]
    fn test_edge_values_survive_the_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fitness_data.json");
        let mut store =
            ActivityStore::open(JsonFileStorage::new(path.clone())?, Box::new(DefaultClock))?;
        for activity in edge_activities() {
            store.add(activity)?;
        }

        store.reload()?;
        assert_eq!(store.activities().cloned().collect::<Vec<_>>(), edge_activities());

        let reopened = ActivityStore::open(JsonFileStorage::new(path)?, Box::new(DefaultClock))?;
        assert_eq!(
            reopened.activities().cloned().collect::<Vec<_>>(),
            edge_activities()
        );
        assert_eq!(reopened.activities_by_type("laufen über stock & stein 🏃").len(), 1);
        Ok(())
    }

    #[test]
    fn test_non_finite_activity_is_not_added() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        store.add(running("2024-01-01", 300.))?;

        let result = store.add(running("2024-01-02", f64::NAN));
        assert!(matches!(
            result,
            Err(StoreError::Record {
                position: 1,
                source: ActivityError::NonFinite {
                    field: "calories",
                    ..
                }
            })
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(*storage.saves.borrow(), 1);
        assert_eq!(storage.records.borrow().as_ref().map(Vec::len), Some(1));
        Ok(())
    }

    #[test]
    fn test_persist_refuses_non_finite_records() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        store.add(running("2024-01-01", 300.))?;
        let id = store.issue_id();
        store.entries.push((
            id,
            running("2024-01-02", 300.).with_distance(Some(f64::INFINITY)),
        ));

        assert!(matches!(
            store.persist(),
            Err(StoreError::Record { position: 1, .. })
        ));
        assert_eq!(*storage.saves.borrow(), 1);
        Ok(())
    }

    #[test]
    fn test_reload_without_file_keeps_memory() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::open(&storage, Box::new(DefaultClock))?;
        let id = store.issue_id();
        store.entries.push((id, running("2024-01-01", 10.)));

        store.reload()?;
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn test_malformed_record_fails_whole_reload() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fitness_data.json");
        let mut store =
            ActivityStore::open(JsonFileStorage::new(path.clone())?, Box::new(DefaultClock))?;
        store.add(running("2024-01-01", 300.))?;

        fs::write(
            &path,
            json!([
                {"activity_type": "Running", "duration": 30, "calories": 300, "date": "2024-01-01"},
                {"activity_type": "Running", "duration": 30, "date": "2024-01-02"}
            ])
            .to_string(),
        )?;

        let result = store.reload();
        assert!(matches!(
            result,
            Err(StoreError::Record {
                position: 1,
                source: ActivityError::MissingField("calories")
            })
        ));
        assert_eq!(store.len(), 1);

        assert!(ActivityStore::open(JsonFileStorage::new(path)?, Box::new(DefaultClock)).is_err());
        Ok(())
    }
}
