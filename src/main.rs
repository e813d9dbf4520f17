mod parse;
mod util;

use crate::parse::{Args, Command, DogCommand, FilterCommand, ReferenceCommand};
use crate::util::{clip, print_hms};
use clap::Parser;
use log::warn;
use shelter_dash::cache::Resource;
use shelter_dash::filter::FilterField;
use shelter_dash::record::{DogRecord, OUTCOME_TYPES, ReferenceItem, SEX_VALUES};
use shelter_dash::stats::{Stats, TOP_BREEDS, Tally};
use shelter_dash::view::{PER_PAGE, SortOrder, paginate, save_to_csv, sort_dogs};
use shelter_dash::{Dashboard, FilterCriteria};
use std::time::Instant;

pub fn print_dogs(dogs: &[&DogRecord]) {
    println!(
        "{:<26} {:<10} {:<16} {:<24} {:<18} {:<16} {:<14} {:<16}",
        "ID", "ANIMAL ID", "NAME", "BREED", "AGE", "SEX", "OUTCOME", "RESCUE TYPE"
    );
    for dog in dogs {
        println!(
            "{:<26} {:<10} {:<16} {:<24} {:<18} {:<16} {:<14} {:<16}",
            clip(dog.key(), 26),
            clip(&dog.animal_id, 10),
            clip(dog.display_name(), 16),
            clip(or_unknown(&dog.breed), 24),
            dog.age_text(),
            clip(or_unknown(&dog.sex_upon_outcome), 16),
            clip(or_unknown(&dog.outcome_type), 14),
            clip(or_unknown(&dog.rescue_type), 16),
        );
    }
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() { "Unknown" } else { value }
}

pub fn print_dog(dog: &DogRecord) {
    let fields = [
        ("ID", dog.id.clone().unwrap_or_default()),
        ("Animal ID", dog.animal_id.clone()),
        ("Name", dog.display_name().to_string()),
        ("Animal type", or_unknown(&dog.animal_type).to_string()),
        ("Breed", or_unknown(&dog.breed).to_string()),
        ("Color", or_unknown(&dog.color).to_string()),
        ("Age", dog.age_text()),
        ("Sex", or_unknown(&dog.sex_upon_outcome).to_string()),
        ("Date of birth", or_unknown(&dog.date_of_birth).to_string()),
        ("Outcome date", or_unknown(&dog.datetime).to_string()),
        ("Outcome", or_unknown(&dog.outcome_type).to_string()),
        ("Outcome subtype", dog.outcome_subtype.clone()),
        ("Rescue type", or_unknown(&dog.rescue_type).to_string()),
        ("Location", location(dog)),
        ("Description", dog.description.clone()),
    ];
    for (label, value) in fields {
        println!("{:<16} {}", format!("{}:", label), value);
    }
}

fn location(dog: &DogRecord) -> String {
    if dog.has_location() {
        format!("{:.5}, {:.5}", dog.location_lat, dog.location_long)
    } else {
        "No location".to_string()
    }
}

fn print_tally(title: &str, tally: &Tally, stats: &Stats) {
    println!("{}:", title);
    for (value, count) in tally {
        println!("  {:<32} {:>6} ({}%)", value, count, stats.format_percentage(*count));
    }
}

pub fn print_summary(stats: &Stats) {
    if stats.total == 0 {
        println!("No dogs match the current filters");
        return;
    }

    println!("\nSummary:");
    println!("Total dogs: {}", stats.total);
    print_tally("By age", &stats.by_age, stats);
    print_tally("By sex", &stats.by_sex, stats);
    print_tally("By outcome", &stats.by_outcome, stats);
    print_tally("By color", &stats.by_color, stats);
    print_tally("By rescue type", &stats.by_rescue_type, stats);

    println!("Top breeds:");
    for (breed, count) in stats.top_breeds(TOP_BREEDS) {
        println!("  {:<32} {:>6} ({}%)", breed, count, stats.format_percentage(count));
    }
}

fn print_filters(criteria: &FilterCriteria) {
    for field in FilterField::ALL {
        let value = criteria.get(field);
        println!("{:<11} {}", field, if value.is_empty() { "(any)" } else { value });
    }
}

fn print_references(items: &[ReferenceItem]) {
    for item in items {
        println!("{:<26} {}", item.id.as_deref().unwrap_or(""), item.name);
    }
    println!("{} total", items.len());
}

fn warn_unusual_value(field: FilterField, value: &str) {
    let known: &[&str] = match field {
        FilterField::Sex => SEX_VALUES,
        FilterField::Outcome => OUTCOME_TYPES,
        _ => return,
    };
    if !value.is_empty() && !known.iter().any(|k| k.eq_ignore_ascii_case(value.trim())) {
        warn!("'{}' is not a known {} value; expected one of {:?}", value, field, known);
    }
}

async fn run_dogs(
    dashboard: &mut Dashboard,
    command: DogCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        DogCommand::List { sort, desc, page } => {
            dashboard.load_all().await;
            if let Some(error) = dashboard.store().error() {
                warn!("{}", error);
            }
            let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
            let mut dogs = dashboard.filtered_dogs();
            sort_dogs(&mut dogs, sort, order);
            let page = paginate(&dogs, page, PER_PAGE);
            print_dogs(&page.items);
            println!(
                "Page {} of {} ({} dogs)",
                page.page, page.total_pages, page.total_items
            );
        }
        DogCommand::Show { id } => {
            dashboard.load_all().await;
            match dashboard.store().find_dog(&id) {
                Some(dog) => print_dog(dog),
                None => println!("No dog with id {}", id),
            }
        }
        DogCommand::Add(fields) => {
            let mut dog = DogRecord::new("", "");
            fields.into_patch().apply_to(&mut dog);
            let added = dashboard.add_dog(dog).await?;
            println!("Dog added with id {}", added.key());
        }
        DogCommand::Update { id, fields } => {
            let patch = fields.into_patch();
            if patch.is_empty() {
                println!("Nothing to update");
                return Ok(());
            }
            dashboard.load_all().await;
            let updated = dashboard.update_dog(&id, &patch).await?;
            print_dog(updated);
        }
        DogCommand::Delete { id } => {
            dashboard.delete_dog(&id).await?;
            println!("Dog {} deleted", id);
        }
        DogCommand::Export { output } => {
            dashboard.load_all().await;
            let dogs = dashboard.filtered_dogs();
            save_to_csv(&dogs, &output)?;
            println!("Exported {} dogs to {}", dogs.len(), output.display());
        }
        DogCommand::Located => {
            dashboard.load_all().await;
            for dog in dashboard.located_dogs() {
                println!("{:<26} {:<16} {}", dog.key(), dog.display_name(), location(dog));
            }
        }
    }
    Ok(())
}

async fn run_references(
    dashboard: &mut Dashboard,
    resource: Resource,
    command: ReferenceCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ReferenceCommand::List => {
            let items = dashboard.fetch_references(resource, false).await;
            print_references(items);
        }
        ReferenceCommand::Add { name } => {
            let item = dashboard.add_reference(resource, &name).await?;
            println!("Added {} with id {}", item.name, item.id.unwrap_or_default());
        }
        ReferenceCommand::Rename { id, name } => {
            dashboard.rename_reference(resource, &id, &name).await?;
            println!("Renamed {} to {}", id, name.trim());
        }
        ReferenceCommand::Delete { id } => {
            dashboard.delete_reference(resource, &id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn run_filter(
    dashboard: &mut Dashboard,
    command: FilterCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        FilterCommand::Show => {}
        FilterCommand::Set { field, value } => {
            let field: FilterField = field.parse()?;
            warn_unusual_value(field, &value);
            dashboard.set_filter(field, &value)?;
        }
        FilterCommand::Clear { field } => dashboard.clear_filter(field.parse()?)?,
        FilterCommand::Reset => dashboard.reset_filters()?,
    }
    print_filters(dashboard.criteria());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::try_parse()?;
    // Initialize logger
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut dashboard = args.config().dashboard()?;

    match args.command {
        Command::Load => {
            let start = Instant::now();
            let summary = dashboard.load_all().await;
            println!(
                "Loaded {} dogs, {} breeds, {} rescue types",
                summary.dogs, summary.breeds, summary.rescue_types
            );
            if summary.failed > 0 {
                println!("{} resource(s) unavailable, showing empty data", summary.failed);
            }
            print_hms(&start);
        }
        Command::Dogs(command) => run_dogs(&mut dashboard, command).await?,
        Command::Stats => {
            dashboard.load_all().await;
            print_summary(dashboard.stats());
        }
        Command::Filter(command) => run_filter(&mut dashboard, command)?,
        Command::Breeds(command) => {
            run_references(&mut dashboard, Resource::Breeds, command).await?
        }
        Command::RescueTypes(command) => {
            run_references(&mut dashboard, Resource::RescueTypes, command).await?
        }
        Command::Cache => {
            dashboard.load_all().await;
            for (resource, status) in dashboard.gateway().cache_status() {
                println!(
                    "{:<13} data={} valid={} age={}s window={}s count={}",
                    resource,
                    status.has_data,
                    status.is_valid,
                    status.age.as_secs(),
                    status.duration.as_secs(),
                    status.count.map(|c| c.to_string()).unwrap_or_else(|| "N/A".to_string())
                );
            }
        }
    }

    Ok(())
}
