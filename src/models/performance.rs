use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{Play, TheatreHall};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Performance {
    pub id: i64,
    pub play_id: i64,
    pub theatre_hall_id: i64,
    pub show_time: DateTime<Utc>,
}

/// A performance with its play and hall resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceDetails {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub play: Play,
    pub theatre_hall: TheatreHall,
}

#[derive(Debug, Clone)]
pub struct NewPerformance {
    pub play_id: i64,
    pub theatre_hall_id: i64,
    pub show_time: DateTime<Utc>,
}

/// Listing filters. Bounds are inclusive, name matches are case-insensitive substrings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceFilter {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub play: Option<String>,
    pub hall: Option<String>,
}

impl PerformanceFilter {
    pub fn matches(&self, details: &PerformanceDetails) -> bool {
        if self.date_from.is_some_and(|from| details.show_time < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| details.show_time > to) {
            return false;
        }
        if let Some(ref play) = self.play {
            if !contains_ignore_case(&details.play.title, play) {
                return false;
            }
        }
        if let Some(ref hall) = self.hall {
            if !contains_ignore_case(&details.theatre_hall.name, hall) {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn details(title: &str, hall: &str, hour: u32) -> PerformanceDetails {
        PerformanceDetails {
            id: 1,
            show_time: Utc.with_ymd_and_hms(2030, 5, 1, hour, 0, 0).unwrap(),
            play: Play { id: 1, title: title.into(), description: String::new() },
            theatre_hall: TheatreHall { id: 1, name: hall.into(), rows: 3, seats_in_row: 4 },
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(PerformanceFilter::default().matches(&details("Hamlet", "Main", 19)));
    }

    #[test]
    fn name_filters_are_case_insensitive_substrings() {
        let filter = PerformanceFilter {
            play: Some("HAM".into()),
            hall: Some("main".into()),
            ..Default::default()
        };
        assert!(filter.matches(&details("Hamlet", "Main Stage", 19)));
        assert!(!filter.matches(&details("Macbeth", "Main Stage", 19)));
        assert!(!filter.matches(&details("Hamlet", "Small Stage", 19)));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let at_19 = Utc.with_ymd_and_hms(2030, 5, 1, 19, 0, 0).unwrap();
        let filter = PerformanceFilter {
            date_from: Some(at_19),
            date_to: Some(at_19),
            ..Default::default()
        };
        assert!(filter.matches(&details("Hamlet", "Main", 19)));
        assert!(!filter.matches(&details("Hamlet", "Main", 18)));
        assert!(!filter.matches(&details("Hamlet", "Main", 20)));
    }
}
