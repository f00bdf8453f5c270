//! Range query construction.
//!
//! A [`RangeQuery`] is built once per user action by [`QueryBuilder`] and is
//! immutable afterwards. It renders itself both as a MongoDB filter document
//! and as an in-process predicate so every store binding applies exactly the
//! same bounds.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use mongodb::bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};

use crate::config::{EndBound, QueryConfig};

use super::validation::isoformat;

/// Retrieval mode selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Every sample in the time window
    Fetch,
    /// Samples in the window whose status lies inside the configured band
    Check,
}

impl Mode {
    /// Tag used in exported file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Fetch => "Fetch",
            Mode::Check => "Check",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fetch" => Ok(Mode::Fetch),
            "check" => Ok(Mode::Check),
            other => Err(format!("unknown mode '{other}' (expected fetch or check)")),
        }
    }
}

/// Inclusive integer band on a status field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBand {
    pub field: String,
    pub min: i64,
    pub max: i64,
}

impl StatusBand {
    pub fn new(field: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            field: field.into(),
            min,
            max,
        }
    }

    /// Whether `value` lies inside the band
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Immutable filter over the telemetry collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeQuery {
    timestamp_field: String,
    start: String,
    end: String,
    end_bound: EndBound,
    status: Option<StatusBand>,
    mode: Mode,
}

impl RangeQuery {
    /// Lower timestamp bound (inclusive)
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Upper timestamp bound
    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn end_bound(&self) -> EndBound {
        self.end_bound
    }

    pub fn timestamp_field(&self) -> &str {
        &self.timestamp_field
    }

    /// Status constraint, present only in Check mode
    pub fn status(&self) -> Option<&StatusBand> {
        self.status.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Render the query as a MongoDB filter document
    pub fn to_filter(&self) -> Document {
        let upper = match self.end_bound {
            EndBound::Inclusive => "$lte",
            EndBound::Exclusive => "$lt",
        };

        let mut range = doc! { "$gte": self.start.as_str() };
        range.insert(upper, self.end.as_str());

        let mut filter = Document::new();
        filter.insert(self.timestamp_field.as_str(), range);

        if let Some(band) = &self.status {
            filter.insert(
                band.field.as_str(),
                doc! { "$gte": band.min, "$lte": band.max },
            );
        }

        filter
    }

    /// Evaluate the query against a document in process
    ///
    /// Timestamps compare lexicographically, which matches chronological order
    /// for ISO-8601 strings. Status values stored as any integral BSON number
    /// are accepted.
    pub fn matches(&self, doc: &Document) -> bool {
        let ts = match doc.get(&self.timestamp_field) {
            Some(Bson::String(ts)) => ts.as_str(),
            _ => return false,
        };

        let below_end = match self.end_bound {
            EndBound::Inclusive => ts <= self.end.as_str(),
            EndBound::Exclusive => ts < self.end.as_str(),
        };
        if ts < self.start.as_str() || !below_end {
            return false;
        }

        match &self.status {
            None => true,
            Some(band) => doc
                .get(&band.field)
                .and_then(integral_value)
                .is_some_and(|v| band.contains(v)),
        }
    }
}

fn integral_value(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        Bson::Double(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

/// Builds range queries from a validated time window and a mode
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    timestamp_field: String,
    status_band: StatusBand,
    end_bound: EndBound,
}

impl QueryBuilder {
    /// Create a builder with the given Check band and an inclusive end bound
    pub fn new(status_band: StatusBand) -> Self {
        Self {
            timestamp_field: "timestamp".to_string(),
            status_band,
            end_bound: EndBound::Inclusive,
        }
    }

    /// Create a builder from query configuration
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            timestamp_field: config.timestamp_field.clone(),
            status_band: StatusBand::new(
                config.status_field.clone(),
                config.status_min,
                config.status_max,
            ),
            end_bound: config.end_bound,
        }
    }

    /// Set the upper bound inclusivity
    pub fn end_bound(mut self, end_bound: EndBound) -> Self {
        self.end_bound = end_bound;
        self
    }

    /// Set the timestamp field name
    pub fn timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    /// Build the query
    ///
    /// The caller has already rejected `start >= end`; this is a pure function
    /// of its inputs.
    pub fn build(&self, start: NaiveDateTime, end: NaiveDateTime, mode: Mode) -> RangeQuery {
        RangeQuery {
            timestamp_field: self.timestamp_field.clone(),
            start: isoformat(&start),
            end: isoformat(&end),
            end_bound: self.end_bound,
            status: match mode {
                Mode::Check => Some(self.status_band.clone()),
                Mode::Fetch => None,
            },
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn builder() -> QueryBuilder {
        QueryBuilder::new(StatusBand::new("Genset_Run_SS", 0, 2))
    }

    #[test]
    fn test_fetch_filter_bounds_match_inputs() {
        let q = builder().build(at(28, 8, 0), at(29, 17, 30), Mode::Fetch);
        assert_eq!(
            q.to_filter(),
            doc! {
                "timestamp": { "$gte": "2025-08-28T08:00:00", "$lte": "2025-08-29T17:30:00" }
            }
        );
        assert!(q.status().is_none());
    }

    #[test]
    fn test_check_filter_adds_band() {
        let q = builder().build(at(28, 8, 0), at(29, 8, 0), Mode::Check);
        let filter = q.to_filter();
        assert_eq!(
            filter.get_document("Genset_Run_SS").unwrap(),
            &doc! { "$gte": 0_i64, "$lte": 2_i64 }
        );
    }

    #[test]
    fn test_exclusive_end() {
        let q = builder()
            .end_bound(EndBound::Exclusive)
            .build(at(28, 8, 0), at(28, 9, 0), Mode::Fetch);
        let range = q.to_filter().get_document("timestamp").unwrap().clone();
        assert!(range.contains_key("$lt"));
        assert!(!range.contains_key("$lte"));

        assert!(!q.matches(&doc! { "timestamp": "2025-08-28T09:00:00" }));
        assert!(q.matches(&doc! { "timestamp": "2025-08-28T08:59:59" }));
    }

    #[test]
    fn test_inclusive_bounds_match_both_ends() {
        let q = builder().build(at(28, 8, 0), at(28, 9, 0), Mode::Fetch);
        assert!(q.matches(&doc! { "timestamp": "2025-08-28T08:00:00" }));
        assert!(q.matches(&doc! { "timestamp": "2025-08-28T09:00:00" }));
        assert!(!q.matches(&doc! { "timestamp": "2025-08-28T07:59:59" }));
        assert!(!q.matches(&doc! { "other": 1 }));
    }

    #[test]
    fn test_check_matches_band_only() {
        let q = builder().build(at(28, 0, 0), at(29, 0, 0), Mode::Check);
        let ts = "2025-08-28T12:00:00";
        for status in [0, 1, 2] {
            assert!(q.matches(&doc! { "timestamp": ts, "Genset_Run_SS": status }));
        }
        assert!(!q.matches(&doc! { "timestamp": ts, "Genset_Run_SS": 5 }));
        assert!(q.matches(&doc! { "timestamp": ts, "Genset_Run_SS": 1_i64 }));
        assert!(q.matches(&doc! { "timestamp": ts, "Genset_Run_SS": 2.0 }));
        assert!(!q.matches(&doc! { "timestamp": ts, "Genset_Run_SS": 1.5 }));
        assert!(!q.matches(&doc! { "timestamp": ts }));
    }

    #[test]
    fn test_configurable_band() {
        let config = QueryConfig {
            status_min: 1,
            status_max: 6,
            ..QueryConfig::default()
        };
        let q = QueryBuilder::from_config(&config).build(at(28, 0, 0), at(29, 0, 0), Mode::Check);
        assert_eq!(q.status(), Some(&StatusBand::new("Genset_Run_SS", 1, 6)));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("CHECK".parse::<Mode>().unwrap(), Mode::Check);
        assert_eq!("fetch".parse::<Mode>().unwrap(), Mode::Fetch);
        assert!("browse".parse::<Mode>().is_err());
        assert_eq!(Mode::Check.to_string(), "Check");
    }
}
