//! Cross-tabulated counts over a filtered set of dogs.

use crate::filter::AgeBucket;
use crate::record::{DogRecord, UNKNOWN};
use indexmap::IndexMap;
use serde::Serialize;

pub const TOP_BREEDS: usize = 10;

/// Occurrence count per observed value, in first-seen order.
pub type Tally = IndexMap<String, usize>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub by_age: Tally,
    pub by_color: Tally,
    pub by_sex: Tally,
    pub by_outcome: Tally,
    pub by_breed: Tally,
    pub by_rescue_type: Tally,
}

fn bump(tally: &mut Tally, value: &str) {
    let key = if value.trim().is_empty() { UNKNOWN } else { value };
    *tally.entry(key.to_string()).or_insert(0) += 1;
}

impl Stats {
    /// Tally every dimension in a single pass.
    pub fn from_dogs<'a, I>(dogs: I) -> Self
    where
        I: IntoIterator<Item = &'a DogRecord>,
    {
        let mut stats = Stats::default();
        for dog in dogs {
            stats.total += 1;
            let age = AgeBucket::of(dog.age_upon_outcome_in_weeks)
                .map(|bucket| bucket.label())
                .unwrap_or(UNKNOWN);
            bump(&mut stats.by_age, age);
            bump(&mut stats.by_color, &dog.color);
            bump(&mut stats.by_sex, &dog.sex_upon_outcome);
            bump(&mut stats.by_outcome, &dog.outcome_type);
            bump(&mut stats.by_breed, &dog.breed);
            bump(&mut stats.by_rescue_type, &dog.rescue_type);
        }
        stats
    }

    /// Breeds by descending count. Ties keep first-seen order.
    pub fn top_breeds(&self, n: usize) -> Vec<(&str, usize)> {
        let mut breeds: Vec<(&str, usize)> = self
            .by_breed
            .iter()
            .map(|(breed, count)| (breed.as_str(), *count))
            .collect();
        breeds.sort_by(|a, b| b.1.cmp(&a.1));
        breeds.truncate(n);
        breeds
    }

    /// Share of `total`, rounded to one decimal place. 0.0 when empty.
    pub fn percentage(&self, count: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let raw = count as f64 / self.total as f64 * 100.0;
        (raw * 10.0).round() / 10.0
    }

    pub fn format_percentage(&self, count: usize) -> String {
        format!("{:.1}", self.percentage(count))
    }
}
