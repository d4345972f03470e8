use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

/// How a booking request maps onto calendar dates. `Weekly` expands to every
/// date between `start_date` and `end_date` (inclusive) whose weekday is in
/// the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    Once {
        date: NaiveDate,
    },
    Weekly {
        start_date: NaiveDate,
        end_date: NaiveDate,
        #[serde(with = "weekday_names")]
        weekdays: Vec<Weekday>,
    },
}

impl Recurrence {
    /// Expand into the ordered list of concrete dates. Pure function of the
    /// value: calling twice yields the same sequence.
    ///
    /// Walks day-by-day rather than week-jumping so partial weeks at either
    /// end are honored. An `end_date` before `start_date` yields an empty
    /// sequence, not an error.
    pub fn expand(&self) -> Result<Vec<NaiveDate>, EngineError> {
        match self {
            Recurrence::Once { date } => Ok(vec![*date]),
            Recurrence::Weekly {
                start_date,
                end_date,
                weekdays,
            } => {
                if weekdays.is_empty() {
                    return Err(EngineError::InvalidRecurrence(
                        "a recurring request needs at least one weekday",
                    ));
                }
                let mut dates = Vec::new();
                let mut cursor = *start_date;
                while cursor <= *end_date {
                    if weekdays.contains(&cursor.weekday()) {
                        dates.push(cursor);
                    }
                    cursor = match cursor.succ_opt() {
                        Some(next) => next,
                        None => break,
                    };
                }
                Ok(dates)
            }
        }
    }
}

/// Weekdays cross the wire as names ("Mon", "wednesday", ...); chrono's
/// `FromStr` accepts both short and long forms case-insensitively.
mod weekday_names {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    fn short_name(day: Weekday) -> &'static str {
        match day {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        }
    }

    pub fn serialize<S: Serializer>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(days.iter().map(|d| short_name(*d)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Weekday>, D::Error> {
        let names: Vec<String> = Vec::deserialize(deserializer)?;
        names
            .iter()
            .map(|n| {
                n.parse::<Weekday>()
                    .map_err(|_| serde::de::Error::custom(format!("unknown weekday {n:?}")))
            })
            .collect()
    }
}
