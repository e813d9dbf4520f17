//! Filter criteria, their persistence, and the filtering pipeline.
//!
//! Every non-empty criterion must match (logical AND). Empty or
//! whitespace-only values are pass-through.

use crate::error::StorageError;
use crate::record::DogRecord;
use crate::storage::KeyValueStore;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed storage key the criteria are persisted under.
pub const FILTERS_KEY: &str = "dogFilters";

pub const YOUNG_MAX_WEEKS: f64 = 26.0;
pub const ADULT_MAX_WEEKS: f64 = 104.0;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown filter field: {0}")]
    UnknownField(String),

    #[error("Invalid age bucket '{0}' (expected young, adult or senior)")]
    InvalidAge(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Age ranges used by both filtering and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeBucket {
    /// 0 to 26 weeks inclusive.
    Young,
    /// Over 26 up to 104 weeks inclusive.
    Adult,
    /// Over 104 weeks.
    Senior,
}

impl AgeBucket {
    /// Bucket for an age in weeks. Zero, negative or NaN ages are unknown.
    pub fn of(weeks: f64) -> Option<Self> {
        if weeks.is_nan() || weeks <= 0.0 {
            None
        } else if weeks <= YOUNG_MAX_WEEKS {
            Some(AgeBucket::Young)
        } else if weeks <= ADULT_MAX_WEEKS {
            Some(AgeBucket::Adult)
        } else {
            Some(AgeBucket::Senior)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBucket::Young => "young",
            AgeBucket::Adult => "adult",
            AgeBucket::Senior => "senior",
        }
    }

    /// Label used in statistics.
    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::Young => "Young (≤6 months)",
            AgeBucket::Adult => "Adult (6 months - 2 years)",
            AgeBucket::Senior => "Senior (2+ years)",
        }
    }
}

impl FromStr for AgeBucket {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "young" => Ok(AgeBucket::Young),
            "adult" => Ok(AgeBucket::Adult),
            "senior" => Ok(AgeBucket::Senior),
            _ => Err(FilterError::InvalidAge(s.to_string())),
        }
    }
}

/// One dimension of [`FilterCriteria`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Age,
    Color,
    Sex,
    Outcome,
    Breed,
    RescueType,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        FilterField::Age,
        FilterField::Color,
        FilterField::Sex,
        FilterField::Outcome,
        FilterField::Breed,
        FilterField::RescueType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::Age => "age",
            FilterField::Color => "color",
            FilterField::Sex => "sex",
            FilterField::Outcome => "outcome",
            FilterField::Breed => "breed",
            FilterField::RescueType => "rescueType",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FilterField {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "age" => Ok(FilterField::Age),
            "color" | "colour" => Ok(FilterField::Color),
            "sex" => Ok(FilterField::Sex),
            "outcome" => Ok(FilterField::Outcome),
            "breed" => Ok(FilterField::Breed),
            "rescuetype" => Ok(FilterField::RescueType),
            _ => Err(FilterError::UnknownField(s.to_string())),
        }
    }
}

/// Current selection, one value per dimension. Empty means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    pub age: String,
    pub color: String,
    pub sex: String,
    pub outcome: String,
    pub breed: String,
    pub rescue_type: String,
}

impl FilterCriteria {
    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::Age => &self.age,
            FilterField::Color => &self.color,
            FilterField::Sex => &self.sex,
            FilterField::Outcome => &self.outcome,
            FilterField::Breed => &self.breed,
            FilterField::RescueType => &self.rescue_type,
        }
    }

    fn slot(&mut self, field: FilterField) -> &mut String {
        match field {
            FilterField::Age => &mut self.age,
            FilterField::Color => &mut self.color,
            FilterField::Sex => &mut self.sex,
            FilterField::Outcome => &mut self.outcome,
            FilterField::Breed => &mut self.breed,
            FilterField::RescueType => &mut self.rescue_type,
        }
    }

    pub fn with(mut self, field: FilterField, value: &str) -> Self {
        *self.slot(field) = value.to_string();
        self
    }

    pub fn is_active(&self, field: FilterField) -> bool {
        !self.get(field).trim().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        FilterField::ALL.iter().all(|f| !self.is_active(*f))
    }

    /// True when `dog` satisfies every active criterion.
    pub fn matches(&self, dog: &DogRecord) -> bool {
        FilterField::ALL
            .iter()
            .filter(|field| self.is_active(**field))
            .all(|field| self.matches_field(*field, dog))
    }

    fn matches_field(&self, field: FilterField, dog: &DogRecord) -> bool {
        let term = self.get(field).trim();
        match field {
            // unrecognised buckets filter nothing
            FilterField::Age => match term.parse::<AgeBucket>() {
                Ok(bucket) => AgeBucket::of(dog.age_upon_outcome_in_weeks) == Some(bucket),
                Err(_) => true,
            },
            FilterField::Color => {
                !dog.color.is_empty() && dog.color.to_lowercase().contains(&term.to_lowercase())
            }
            FilterField::Sex => {
                !dog.sex_upon_outcome.is_empty()
                    && dog.sex_upon_outcome.to_lowercase() == term.to_lowercase()
            }
            FilterField::Outcome => {
                !dog.outcome_type.is_empty()
                    && dog.outcome_type.to_lowercase() == term.to_lowercase()
            }
            FilterField::Breed => fuzzy_matches(&dog.breed, term),
            FilterField::RescueType => fuzzy_matches(&dog.rescue_type, term),
        }
    }
}

/// Case-insensitive match used for breed and rescue type.
///
/// Exact match after trimming wins first, then containment of the term in
/// the value. Failing both, the term is tried as-is, with whitespace runs
/// collapsed, and with punctuation stripped; each variation matches when it
/// contains the value or the value contains it. A blank value never matches.
pub fn fuzzy_matches(value: &str, term: &str) -> bool {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return false;
    }
    let term = term.trim().to_lowercase();
    if value == term || value.contains(&term) {
        return true;
    }

    let collapsed = term.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped: String = term
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    [term, collapsed, stripped]
        .iter()
        .any(|variation| value.contains(variation.as_str()) || variation.contains(value.as_str()))
}

/// Records satisfying every active criterion, in input order.
pub fn filter_dogs<'a>(dogs: &'a [DogRecord], criteria: &FilterCriteria) -> Vec<&'a DogRecord> {
    if criteria.is_empty() {
        return dogs.iter().collect();
    }
    dogs.iter().filter(|dog| criteria.matches(dog)).collect()
}

/// Positions of the matching records within `dogs`.
pub fn filter_indices(dogs: &[DogRecord], criteria: &FilterCriteria) -> Vec<usize> {
    dogs.iter()
        .enumerate()
        .filter(|(_, dog)| criteria.matches(dog))
        .map(|(index, _)| index)
        .collect()
}

/// Holds the current criteria and writes them through to storage on every
/// change.
pub struct FilterEngine {
    criteria: FilterCriteria,
    storage: Box<dyn KeyValueStore>,
}

impl FilterEngine {
    /// Restore the last saved criteria; unreadable state starts empty.
    pub fn load(storage: Box<dyn KeyValueStore>) -> Self {
        let criteria = match storage.get_item(FILTERS_KEY) {
            Ok(Some(saved)) => serde_json::from_str(&saved).unwrap_or_else(|e| {
                warn!("Ignoring unreadable saved filters: {}", e);
                FilterCriteria::default()
            }),
            Ok(None) => FilterCriteria::default(),
            Err(e) => {
                warn!("Could not read saved filters: {}", e);
                FilterCriteria::default()
            }
        };
        debug!("Initial filters loaded from storage: {:?}", criteria);
        Self { criteria, storage }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set(&mut self, field: FilterField, value: &str) -> Result<(), FilterError> {
        let value = value.trim();
        if field == FilterField::Age && !value.is_empty() {
            let bucket: AgeBucket = value.parse()?;
            return self.replace(self.criteria.clone().with(field, bucket.as_str()));
        }
        self.replace(self.criteria.clone().with(field, value))
    }

    pub fn clear(&mut self, field: FilterField) -> Result<(), FilterError> {
        self.set(field, "")
    }

    pub fn reset(&mut self) -> Result<(), FilterError> {
        self.replace(FilterCriteria::default())
    }

    /// Swap in a whole criteria object. Nothing changes if it cannot be saved.
    pub fn replace(&mut self, criteria: FilterCriteria) -> Result<(), FilterError> {
        let serialized = serde_json::to_string(&criteria).map_err(StorageError::from)?;
        self.storage.set_item(FILTERS_KEY, &serialized)?;
        info!("Filters saved: {}", serialized);
        self.criteria = criteria;
        Ok(())
    }
}
