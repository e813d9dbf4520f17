//! Sorting, paging and CSV export of a filtered set.

use crate::record::DogRecord;
use csv::Writer;
use log::info;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs::File;
use std::path::Path;

pub const PER_PAGE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortField {
    #[default]
    Name,
    AnimalId,
    Breed,
    Color,
    Age,
    Sex,
    Outcome,
    RescueType,
    Datetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortField {
    fn text<'a>(&self, dog: &'a DogRecord) -> &'a str {
        match self {
            SortField::Name => &dog.name,
            SortField::AnimalId => &dog.animal_id,
            SortField::Breed => &dog.breed,
            SortField::Color => &dog.color,
            SortField::Sex => &dog.sex_upon_outcome,
            SortField::Outcome => &dog.outcome_type,
            SortField::RescueType => &dog.rescue_type,
            SortField::Datetime => &dog.datetime,
            SortField::Age => "",
        }
    }

    fn compare(&self, a: &DogRecord, b: &DogRecord) -> Ordering {
        match self {
            SortField::Age => a
                .age_upon_outcome_in_weeks
                .total_cmp(&b.age_upon_outcome_in_weeks),
            _ => self
                .text(a)
                .to_lowercase()
                .cmp(&self.text(b).to_lowercase()),
        }
    }
}

/// Stable, case-insensitive sort; blanks sort as empty strings.
pub fn sort_dogs(dogs: &mut [&DogRecord], field: SortField, order: SortOrder) {
    dogs.sort_by(|a, b| {
        let ordering = field.compare(a, b);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, clamped into `1..=total_pages`.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(items.len());

    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        page,
        total_pages,
        total_items: items.len(),
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    animal_id: &'a str,
    name: &'a str,
    animal_type: &'a str,
    breed: &'a str,
    color: &'a str,
    age_upon_outcome_in_weeks: f64,
    sex_upon_outcome: &'a str,
    date_of_birth: &'a str,
    datetime: &'a str,
    outcome_type: &'a str,
    outcome_subtype: &'a str,
    rescue_type: &'a str,
    location_lat: f64,
    location_long: f64,
    description: &'a str,
}

impl<'a> From<&'a DogRecord> for CsvRow<'a> {
    fn from(dog: &'a DogRecord) -> Self {
        Self {
            id: dog.id.as_deref().unwrap_or_default(),
            animal_id: &dog.animal_id,
            name: &dog.name,
            animal_type: &dog.animal_type,
            breed: &dog.breed,
            color: &dog.color,
            age_upon_outcome_in_weeks: dog.age_upon_outcome_in_weeks,
            sex_upon_outcome: &dog.sex_upon_outcome,
            date_of_birth: &dog.date_of_birth,
            datetime: &dog.datetime,
            outcome_type: &dog.outcome_type,
            outcome_subtype: &dog.outcome_subtype,
            rescue_type: &dog.rescue_type,
            location_lat: dog.location_lat,
            location_long: dog.location_long,
            description: &dog.description,
        }
    }
}

/// Save records to a CSV file, one row per dog.
pub fn save_to_csv(dogs: &[&DogRecord], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    let mut writer = Writer::from_writer(file);

    for dog in dogs {
        writer.serialize(CsvRow::from(*dog))?;
    }

    writer.flush()?;
    info!("Data saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dog(name: &str, age: f64) -> DogRecord {
        DogRecord {
            name: name.to_string(),
            age_upon_outcome_in_weeks: age,
            ..DogRecord::default()
        }
    }

    #[test]
    fn test_sort_by_name_case_insensitive() {
        let dogs = vec![dog("bella", 3.0), dog("", 1.0), dog("Ace", 2.0)];
        let mut refs: Vec<&DogRecord> = dogs.iter().collect();

        sort_dogs(&mut refs, SortField::Name, SortOrder::Asc);
        let names: Vec<&str> = refs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["", "Ace", "bella"]);

        sort_dogs(&mut refs, SortField::Age, SortOrder::Desc);
        assert_eq!(refs[0].name, "bella");
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=16).collect();

        let first = paginate(&items, 1, PER_PAGE);
        assert_eq!(first.items, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(first.total_pages, 3);

        let last = paginate(&items, 3, PER_PAGE);
        assert_eq!(last.items, vec![15, 16]);

        let clamped = paginate(&items, 99, PER_PAGE);
        assert_eq!(clamped.page, 3);

        let empty = paginate::<u32>(&[], 1, PER_PAGE);
        assert!(empty.items.is_empty());
        assert_eq!((empty.page, empty.total_pages), (1, 0));
    }

    #[test]
    fn test_save_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dogs.csv");
        let mut rex = dog("Rex", 10.0);
        rex.id = Some("1".to_string());
        let unnamed = dog("", 0.0);

        save_to_csv(&[&rex, &unnamed], &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().starts_with("id,animal_id,name"));
        assert!(lines.next().unwrap().starts_with("1,,Rex"));
        assert_eq!(lines.count(), 1);
    }
}
