//! Public API
//!
//! these are the bodies the attendance server and its clients exchange over http

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use std::{collections::BTreeMap, fmt, str::FromStr};

/// Every record the store knows about, ordered by key.
pub type Records = BTreeMap<RecordKey, Status>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Record key is required")]
    EmptyKey,

    #[error("Record key {0:?} is not of the form username_YYYY-MM-DD")]
    MalformedKey(String),

    #[error("Status is required")]
    EmptyStatus,

    #[error("Status {0:?} is neither \"present\" nor \"absent\"")]
    UnknownStatus(String),

    #[error("Month {0:?} is not of the form YYYY-MM")]
    MalformedMonth(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Absent => "absent",
        }
    }
}

impl FromStr for Status {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(ParseError::EmptyStatus),
            "present" => Ok(Status::Present),
            "absent" => Ok(Status::Absent),
            other => Err(ParseError::UnknownStatus(other.into())),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one attendance entry.
///
/// On the wire this is a single string `"{username}_{YYYY-MM-DD}"`.
/// Usernames may contain underscores, the date is whatever follows the last one.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordKey {
    username: String,
    date: NaiveDate,
}

impl RecordKey {
    const DATE_FORMAT: &'static str = "%Y-%m-%d";

    pub fn new(username: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            username: username.into(),
            date,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl FromStr for RecordKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::EmptyKey);
        }
        let malformed = || ParseError::MalformedKey(s.into());

        let (username, date) = s.rsplit_once('_').ok_or_else(malformed)?;
        if username.is_empty() || date.len() != 10 {
            return Err(malformed());
        }
        let date = NaiveDate::parse_from_str(date, Self::DATE_FORMAT).map_err(|_| malformed())?;

        Ok(RecordKey::new(username, date))
    }
}

impl TryFrom<String> for RecordKey {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> String {
        key.to_string()
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.username, self.date.format(Self::DATE_FORMAT))
    }
}

/// A calendar month, written `YYYY-MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    first_day: NaiveDate,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first_day| Month { first_day })
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn days_in_month(&self) -> u32 {
        let (year, month) = match self.month() {
            12 => (self.year() + 1, 1),
            month => (self.year(), month + 1),
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|next| next.signed_duration_since(self.first_day).num_days() as u32)
            .unwrap_or(31)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (1..=self.days_in_month()).filter_map(move |day| self.first_day.with_day(day))
    }
}

impl FromStr for Month {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseError::MalformedMonth(s.into());

        let (year, month) = s.split_once('-').ok_or_else(malformed)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(malformed());
        }
        let year = year.parse().map_err(|_| malformed())?;
        let month = month.parse().map_err(|_| malformed())?;

        Month::new(year, month).ok_or_else(malformed)
    }
}

impl TryFrom<String> for Month {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> String {
        month.to_string()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// Username and password as sent to `/login`
///
/// Missing fields deserialize as empty strings so the server can answer with a proper validation error.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Who is acting, established once per request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
    pub name: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// What everybody may know about a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub role: Role,
    pub name: String,
}

/// Body of `POST /attendance` and `PUT /attendance`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AttendanceUpdate {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayMark {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeReport {
    pub username: String,
    pub name: String,
    pub days: Vec<DayMark>,
    pub present: u32,
    pub absent: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub month: Month,
    pub days_in_month: u32,
    pub employees: Vec<EmployeeReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Identity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub success: bool,
    pub data: Records,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: BTreeMap<String, UserProfile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub success: bool,
    pub report: MonthlyReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
