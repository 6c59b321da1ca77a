use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::utils::time::{parse_record_date, today};

/// Flat representation of an [Activity] as it is written to disk.
pub type ActivityMapping = Map<String, Value>;

pub const ACTIVITY_TYPE: &str = "activity_type";
pub const DURATION: &str = "duration";
pub const CALORIES: &str = "calories";
pub const DISTANCE: &str = "distance";
pub const DATE: &str = "date";
pub const NOTES: &str = "notes";

#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Field `{field}` should be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Field `{field}` is {value}, only finite numbers can be stored")]
    NonFinite { field: &'static str, value: f64 },

    #[error("Date {date:?} is not in YYYY-MM-DD form")]
    InvalidDate {
        date: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One logged exercise session.
///
/// Values are taken as given: nothing checks that durations are positive or that the date is
/// well formed. The date is only parsed when a weekly summary needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub activity_type: String,
    /// Minutes.
    pub duration: f64,
    /// Kilocalories burned.
    pub calories: f64,
    /// Kilometers.
    pub distance: Option<f64>,
    pub notes: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl Activity {
    /// Creates an activity dated today.
    pub fn new(activity_type: impl Into<String>, duration: f64, calories: f64) -> Self {
        Self {
            activity_type: activity_type.into(),
            duration,
            calories,
            distance: None,
            notes: None,
            date: today(),
        }
    }

    /// Replaces the date. An empty string falls back to today.
    pub fn with_date(self, date: impl Into<String>) -> Self {
        let date = date.into();
        let date = if date.is_empty() { today() } else { date };
        Self { date, ..self }
    }

    pub fn with_distance(self, distance: Option<f64>) -> Self {
        Self { distance, ..self }
    }

    pub fn with_notes(self, notes: Option<String>) -> Self {
        Self { notes, ..self }
    }

    pub fn parsed_date(&self) -> Result<NaiveDate, ActivityError> {
        parse_record_date(&self.date).map_err(|source| ActivityError::InvalidDate {
            date: self.date.clone(),
            source,
        })
    }

    /// Optional fields are written as explicit nulls, never omitted. JSON has no NaN or
    /// infinity, so non-finite numbers are refused instead of degrading to null.
    pub fn to_mapping(&self) -> Result<ActivityMapping, ActivityError> {
        let mut map = ActivityMapping::new();
        map.insert(ACTIVITY_TYPE.into(), Value::from(self.activity_type.as_str()));
        map.insert(DURATION.into(), finite(DURATION, self.duration)?);
        map.insert(CALORIES.into(), finite(CALORIES, self.calories)?);
        map.insert(
            DISTANCE.into(),
            self.distance
                .map(|v| finite(DISTANCE, v))
                .transpose()?
                .unwrap_or(Value::Null),
        );
        map.insert(DATE.into(), Value::from(self.date.as_str()));
        map.insert(
            NOTES.into(),
            self.notes.as_deref().map_or(Value::Null, Value::from),
        );
        Ok(map)
    }

    pub fn from_mapping(map: &ActivityMapping) -> Result<Self, ActivityError> {
        let activity_type = required(map, ACTIVITY_TYPE).and_then(|v| as_str(ACTIVITY_TYPE, v))?;
        let duration = required(map, DURATION).and_then(|v| as_number(DURATION, v))?;
        let calories = required(map, CALORIES).and_then(|v| as_number(CALORIES, v))?;
        let distance = optional(map, DISTANCE)
            .map(|v| as_number(DISTANCE, v))
            .transpose()?;
        let notes = optional(map, NOTES)
            .map(|v| as_str(NOTES, v).map(str::to_owned))
            .transpose()?;
        let date = optional(map, DATE)
            .map(|v| as_str(DATE, v))
            .transpose()?
            .unwrap_or_default();

        Ok(Activity::new(activity_type, duration, calories)
            .with_date(date)
            .with_distance(distance)
            .with_notes(notes))
    }
}

fn finite(field: &'static str, value: f64) -> Result<Value, ActivityError> {
    if value.is_finite() {
        Ok(Value::from(value))
    } else {
        Err(ActivityError::NonFinite { field, value })
    }
}

fn required<'a>(map: &'a ActivityMapping, field: &'static str) -> Result<&'a Value, ActivityError> {
    map.get(field).ok_or(ActivityError::MissingField(field))
}

/// Missing keys and nulls both mean "not supplied".
fn optional<'a>(map: &'a ActivityMapping, field: &'static str) -> Option<&'a Value> {
    map.get(field).filter(|v| !v.is_null())
}

fn as_str<'a>(field: &'static str, value: &'a Value) -> Result<&'a str, ActivityError> {
    value.as_str().ok_or(ActivityError::InvalidField {
        field,
        expected: "a string",
    })
}

fn as_number(field: &'static str, value: &Value) -> Result<f64, ActivityError> {
    value.as_f64().ok_or(ActivityError::InvalidField {
        field,
        expected: "a number",
    })
}
