//! Date partitioning for staged blobs.
//!
//! Keys look like `year=YYYY/month=MM/day=DD/<name>`, with the values taken
//! verbatim from the leading date of an ISO-8601 timestamp.

/// Year/month/day components of a Hive-style date partition.
///
/// ```
/// use flurry_core::DatePartition;
///
/// let partition = DatePartition::from_timestamp("2024-03-05T10:00:00Z").unwrap();
/// assert_eq!(partition.prefix(), "year=2024/month=03/day=05");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePartition {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl DatePartition {
    /// Split the first 10 characters of `timestamp` on `-`.
    ///
    /// Returns `None` unless there are exactly three components. Components
    /// are not checked for width or digits.
    pub fn from_timestamp(timestamp: &str) -> Option<Self> {
        let date: String = timestamp.chars().take(10).collect();
        let mut parts = date.split('-');

        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        Some(Self {
            year: year.to_string(),
            month: month.to_string(),
            day: day.to_string(),
        })
    }

    /// The `year=/month=/day=` key prefix, without a trailing slash.
    pub fn prefix(&self) -> String {
        format!("year={}/month={}/day={}", self.year, self.month, self.day)
    }

    /// Full key for an object named `name` inside this partition.
    pub fn key(&self, name: &str) -> String {
        format!("{}/{name}", self.prefix())
    }
}
