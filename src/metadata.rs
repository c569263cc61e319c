//! Defines the [`Metadata`] and [`Status`] types along with the parser for
//! the `metadata.txt` file that sits in every post directory. The file holds
//! one `Key: Value` pair per line, for example:
//!
//! ```text
//! Title: Hello, world!
//! Author: Jane Doe
//! Date: 2021-04-16
//! Updated: 2021-04-20T08:15:00+02:00
//! Status: published
//! ```
//!
//! Parsing happens in two steps. [`parse_raw`] turns the text into a map of
//! raw strings and only cares about the line format; [`Metadata::from_raw`]
//! then picks out the known keys, applies defaults, and complains about
//! missing required keys.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The name of the metadata file inside of a post directory.
pub const METADATA_FILE_NAME: &str = "metadata.txt";

const SEPARATOR: &str = ": ";

const BYTE_ORDER_MARK: char = '\u{feff}';

const TITLE: &str = "Title";
const AUTHOR: &str = "Author";
const DATE: &str = "Date";
const UPDATED: &str = "Updated";
const STATUS: &str = "Status";

/// The publication state of a post. Anything other than [`Status::Draft`]
/// is publicly listed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// `Status: draft`, and the default when the key is absent.
    Draft,

    /// `Status: published`.
    Published,

    /// Any other value, kept verbatim.
    Other(String),
}

impl Status {
    pub fn is_draft(&self) -> bool {
        matches!(self, Status::Draft)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Draft => "draft",
            Status::Published => "published",
            Status::Other(s) => s,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Draft
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s {
            "draft" => Status::Draft,
            "published" => Status::Published,
            other => Status::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for Status {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Status {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// The typed contents of a post's `metadata.txt`.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    /// The title of the post. Required.
    pub title: String,

    /// The author of the post. Older posts don't carry one.
    pub author: Option<String>,

    /// The publication date. Required.
    pub date: DateTime<FixedOffset>,

    /// The date of the last revision. Defaults to [`Metadata::date`].
    pub updated: DateTime<FixedOffset>,

    /// Defaults to [`Status::Draft`] so a post is never published by
    /// accident.
    pub status: Status,

    /// Keys the generator doesn't know about.
    pub extra: HashMap<String, String>,
}

impl Metadata {
    /// Reads and parses the metadata file at `path`.
    pub fn read(path: &Path) -> Result<Metadata> {
        let input = std::fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        Metadata::from_raw(parse_raw(path, &input)?, path)
    }

    /// Builds a [`Metadata`] from the output of [`parse_raw`]. `path` is only
    /// used for error messages.
    pub fn from_raw(mut raw: HashMap<String, String>, path: &Path) -> Result<Metadata> {
        let missing = |field: &'static str| Error::MissingField {
            path: path.to_owned(),
            field,
        };

        let title = raw.remove(TITLE).ok_or_else(|| missing(TITLE))?;
        let date = raw.remove(DATE).ok_or_else(|| missing(DATE))?;
        let date = parse_date(&date).ok_or_else(|| Error::InvalidDate {
            path: path.to_owned(),
            field: DATE,
            value: date.clone(),
        })?;
        let updated = match raw.remove(UPDATED) {
            None => date,
            Some(updated) => parse_date(&updated).ok_or_else(|| Error::InvalidDate {
                path: path.to_owned(),
                field: UPDATED,
                value: updated.clone(),
            })?,
        };
        let status = raw
            .remove(STATUS)
            .map(|s| Status::from(s.as_str()))
            .unwrap_or_default();

        Ok(Metadata {
            title,
            author: raw.remove(AUTHOR),
            date,
            updated,
            status,
            extra: raw,
        })
    }
}

/// Splits `input` into a map of keys to raw values. Each line is trimmed and
/// must split on `": "` into exactly two parts; blank lines are skipped. If a
/// key repeats, the last value wins. A leading byte order mark is ignored.
/// `path` is only used for error messages.
pub fn parse_raw(path: &Path, input: &str) -> Result<HashMap<String, String>> {
    let input = input.strip_prefix(BYTE_ORDER_MARK).unwrap_or(input);
    let mut raw = HashMap::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split(SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                raw.insert(key.to_owned(), value.to_owned());
            }
            _ => {
                return Err(Error::Malformed {
                    path: path.to_owned(),
                    line_number: i + 1,
                    line: line.to_owned(),
                })
            }
        }
    }
    Ok(raw)
}

/// Parses an ISO-8601 date or date-time. Values with an explicit offset keep
/// it; values without one are taken as UTC, and bare dates as midnight UTC.
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    for format in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive).into());
        }
    }

    let naive = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive).into())
}

/// Formats a date the way templates receive it (RFC 3339, `Z` for UTC).
pub fn format_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Represents the result of a metadata operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading or interpreting a metadata file.
#[derive(Debug)]
pub enum Error {
    /// Returned when a line isn't of the form `Key: Value`.
    Malformed {
        path: PathBuf,
        line_number: usize,
        line: String,
    },

    /// Returned when a required key is absent.
    MissingField { path: PathBuf, field: &'static str },

    /// Returned when a date value isn't ISO-8601.
    InvalidDate {
        path: PathBuf,
        field: &'static str,
        value: String,
    },

    /// Returned when the metadata file can't be read.
    Io { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Malformed {
                path,
                line_number,
                line,
            } => write!(
                f,
                "{}:{}: malformed metadata line `{}` (expected `Key: Value`)",
                path.display(),
                line_number,
                line
            ),
            Error::MissingField { path, field } => {
                write!(f, "{}: missing required field `{}`", path.display(), field)
            }
            Error::InvalidDate { path, field, value } => write!(
                f,
                "{}: `{}` is not an ISO-8601 date: `{}`",
                path.display(),
                field,
                value
            ),
            Error::Io { path, err } => {
                write!(f, "Reading metadata file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            _ => None,
        }
    }
}
