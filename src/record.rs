use serde::{Deserialize, Deserializer, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// Outcome values the shelter records. Stored on [`DogRecord`] as free text;
/// anything outside this set (or blank) is tallied as-is or as "Unknown".
pub const OUTCOME_TYPES: &[&str] = &[
    "Adoption",
    "Return to Owner",
    "Transfer",
    "Euthanasia",
    "Died",
];

pub const SEX_VALUES: &[&str] = &[
    "Intact Male",
    "Intact Female",
    "Neutered Male",
    "Spayed Female",
    "Unknown",
];

/// One animal's profile and outcome, as served by `GET /dogs/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DogRecord {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub animal_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub animal_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub breed: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub color: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub age_upon_outcome_in_weeks: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sex_upon_outcome: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date_of_birth: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub datetime: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub outcome_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub outcome_subtype: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rescue_type: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub location_lat: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub location_long: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl DogRecord {
    /// Record with the defaults a fresh intake form starts from.
    pub fn new(animal_id: &str, name: &str) -> Self {
        Self {
            animal_id: animal_id.to_string(),
            name: name.to_string(),
            animal_type: "Dog".to_string(),
            outcome_type: "Adoption".to_string(),
            datetime: chrono::Local::now().format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    /// Both `name` and `animal_id` must be non-blank before a create is sent.
    pub fn validate_for_create(&self) -> Result<(), String> {
        if self.name.trim().is_empty() || self.animal_id.trim().is_empty() {
            return Err("Name and Animal ID are required".to_string());
        }
        Ok(())
    }

    /// Identifier used for update/delete: the backend id, else the animal id.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.animal_id)
    }

    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { UNKNOWN } else { name }
    }

    pub fn has_location(&self) -> bool {
        self.location_lat != 0.0
            && self.location_long != 0.0
            && self.location_lat.is_finite()
            && self.location_long.is_finite()
    }

    /// Age in years and weeks, e.g. "2 years 3 weeks".
    pub fn age_text(&self) -> String {
        format_age(self.age_upon_outcome_in_weeks)
    }
}

pub fn format_age(weeks: f64) -> String {
    if weeks.is_nan() || weeks <= 0.0 {
        return UNKNOWN.to_string();
    }
    let weeks = weeks.floor() as u64;
    let years = weeks / 52;
    let remaining = weeks % 52;
    let plural = |n: u64| if n > 1 { "s" } else { "" };

    match (years, remaining) {
        (0, w) => format!("{} week{}", w, plural(w)),
        (y, 0) => format!("{} year{}", y, plural(y)),
        (y, w) => format!("{} year{} {} week{}", y, plural(y), w, plural(w)),
    }
}

/// Partial update of a [`DogRecord`]. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DogPatch {
    pub animal_id: Option<String>,
    pub name: Option<String>,
    pub animal_type: Option<String>,
    pub breed: Option<String>,
    pub color: Option<String>,
    pub age_upon_outcome_in_weeks: Option<f64>,
    pub sex_upon_outcome: Option<String>,
    pub date_of_birth: Option<String>,
    pub datetime: Option<String>,
    pub outcome_type: Option<String>,
    pub outcome_subtype: Option<String>,
    pub rescue_type: Option<String>,
    pub location_lat: Option<f64>,
    pub location_long: Option<f64>,
    pub description: Option<String>,
}

impl DogPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the set fields over `dog`. The backend id is never touched.
    pub fn apply_to(&self, dog: &mut DogRecord) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    dog.$field = value.clone();
                })*
            };
        }
        merge!(
            animal_id,
            name,
            animal_type,
            breed,
            color,
            age_upon_outcome_in_weeks,
            sex_upon_outcome,
            date_of_birth,
            datetime,
            outcome_type,
            outcome_subtype,
            rescue_type,
            location_lat,
            location_long,
            description
        );
    }
}

/// A breed or rescue type: a named tag used as filter vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

impl ReferenceItem {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

/// Body the backend returns after a successful create or update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}
