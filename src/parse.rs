use clap::{Args as ClapArgs, Parser, Subcommand};
use shelter_dash::Config;
use shelter_dash::record::DogPatch;
use shelter_dash::view::SortField;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "shelter-dash")]
#[command(about = "A CLI dashboard for browsing and editing animal shelter outcome records")]
#[command(version = "1.0")]
pub(crate) struct Args {
    /// Base URL of the shelter REST API
    #[arg(long, env = "SHELTER_API_URL", default_value = "http://localhost:8000/api")]
    pub api_url: String,

    /// Directory holding persisted filters
    #[arg(long, env = "SHELTER_STATE_DIR", default_value = ".shelter-dash")]
    pub state_dir: PathBuf,

    /// Minutes a cached dog list stays valid
    #[arg(long, env = "SHELTER_DOGS_CACHE_MINUTES", default_value = "30")]
    pub dogs_cache_minutes: u64,

    /// Hours a cached breed or rescue type list stays valid
    #[arg(long, env = "SHELTER_REFERENCE_CACHE_HOURS", default_value = "24")]
    pub reference_cache_hours: u64,

    /// Base delay between list retries in milliseconds
    #[arg(short, long, env = "SHELTER_RETRY_DELAY_MS", default_value = "500")]
    pub delay: u64,

    /// Maximum number of retry attempts for list reads
    #[arg(short, long, env = "SHELTER_RETRIES", default_value = "2")]
    pub retries: u32,

    /// HTTP request timeout in seconds
    #[arg(long, env = "SHELTER_TIMEOUT_SECS", default_value = "10")]
    pub timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn config(&self) -> Config {
        Config {
            api_url: self.api_url.clone(),
            dogs_cache: Duration::from_secs(self.dogs_cache_minutes * 60),
            reference_cache: Duration::from_secs(self.reference_cache_hours * 60 * 60),
            retries: self.retries,
            retry_delay_ms: self.delay,
            timeout: Duration::from_secs(self.timeout),
            state_dir: self.state_dir.clone(),
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Load dogs, breeds and rescue types and print their counts
    Load,
    /// Browse and edit dog records
    #[command(subcommand)]
    Dogs(DogCommand),
    /// Show statistics for the filtered dogs
    Stats,
    /// Show or change the persisted filters
    #[command(subcommand)]
    Filter(FilterCommand),
    /// Manage the breed list
    #[command(subcommand)]
    Breeds(ReferenceCommand),
    /// Manage the rescue type list
    #[command(subcommand)]
    RescueTypes(ReferenceCommand),
    /// Show response cache diagnostics after loading
    Cache,
}

#[derive(Subcommand)]
pub(crate) enum DogCommand {
    /// List one page of the filtered dogs
    List {
        #[arg(short, long, value_enum, default_value = "name")]
        sort: SortField,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(short, long, default_value = "1")]
        page: usize,
    },
    /// Show one dog in full
    Show { id: String },
    /// Create a dog (name and animal id are required)
    Add(DogFields),
    /// Change fields of an existing dog
    Update {
        id: String,
        #[command(flatten)]
        fields: DogFields,
    },
    /// Delete a dog
    Delete { id: String },
    /// Write the filtered dogs to a CSV file
    Export {
        #[arg(default_value = "dogs.csv")]
        output: PathBuf,
    },
    /// List the filtered dogs that have a location
    Located,
}

#[derive(ClapArgs, Default)]
pub(crate) struct DogFields {
    #[arg(long)]
    pub animal_id: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub animal_type: Option<String>,
    #[arg(long)]
    pub breed: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    /// Age at outcome in weeks
    #[arg(long)]
    pub age_weeks: Option<f64>,
    #[arg(long)]
    pub sex: Option<String>,
    #[arg(long)]
    pub date_of_birth: Option<String>,
    /// Outcome date
    #[arg(long)]
    pub datetime: Option<String>,
    #[arg(long)]
    pub outcome: Option<String>,
    #[arg(long)]
    pub outcome_subtype: Option<String>,
    #[arg(long)]
    pub rescue_type: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub long: Option<f64>,
    #[arg(long)]
    pub description: Option<String>,
}

impl DogFields {
    pub fn into_patch(self) -> DogPatch {
        DogPatch {
            animal_id: self.animal_id,
            name: self.name,
            animal_type: self.animal_type,
            breed: self.breed,
            color: self.color,
            age_upon_outcome_in_weeks: self.age_weeks,
            sex_upon_outcome: self.sex,
            date_of_birth: self.date_of_birth,
            datetime: self.datetime,
            outcome_type: self.outcome,
            outcome_subtype: self.outcome_subtype,
            rescue_type: self.rescue_type,
            location_lat: self.lat,
            location_long: self.long,
            description: self.description,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum FilterCommand {
    /// Print the current filters
    Show,
    /// Set one filter (age, color, sex, outcome, breed, rescue-type)
    Set { field: String, value: String },
    /// Clear one filter
    Clear { field: String },
    /// Clear every filter
    Reset,
}

#[derive(Subcommand)]
pub(crate) enum ReferenceCommand {
    List,
    Add { name: String },
    Rename { id: String, name: String },
    Delete { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dog_add() {
        let args = Args::try_parse_from([
            "shelter-dash",
            "dogs",
            "add",
            "--animal-id",
            "A1",
            "--name",
            "Rex",
            "--long",
            "-97.4",
        ])
        .unwrap();

        let Command::Dogs(DogCommand::Add(fields)) = args.command else {
            panic!("expected dogs add");
        };
        let patch = fields.into_patch();
        assert_eq!(patch.animal_id.as_deref(), Some("A1"));
        assert_eq!(patch.location_long, Some(-97.4));
        assert_eq!(patch.breed, None);
    }

    #[test]
    fn test_config_from_args() {
        let args = Args::try_parse_from([
            "shelter-dash",
            "--dogs-cache-minutes",
            "5",
            "--retries",
            "0",
            "stats",
        ])
        .unwrap();
        let config = args.config();

        assert_eq!(config.dogs_cache, Duration::from_secs(300));
        assert_eq!(config.reference_cache, Duration::from_secs(86400));
        assert_eq!(config.retries, 0);
    }

    #[test]
    fn test_parse_list_sort() {
        let args =
            Args::try_parse_from(["shelter-dash", "dogs", "list", "--sort", "rescue-type", "--desc"])
                .unwrap();
        let Command::Dogs(DogCommand::List { sort, desc, page }) = args.command else {
            panic!("expected dogs list");
        };
        assert_eq!(sort, SortField::RescueType);
        assert!(desc);
        assert_eq!(page, 1);
    }
}
