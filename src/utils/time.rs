use chrono::{Local, NaiveDate};

/// Format used for every date stored by fitlog.
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a string in fitlog.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format(RECORD_DATE_FORMAT).to_string()
}

pub fn parse_record_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, RECORD_DATE_FORMAT)
}

/// Today's local date formatted as a record date.
pub fn today() -> String {
    date_to_record_name(Local::now().date_naive())
}
