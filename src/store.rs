//! In-memory holder of the full dataset and the two reference lists.
//!
//! Mutations here are only applied after the backend confirmed the write.

use crate::cache::Resource;
use crate::record::{DogRecord, ReferenceItem};
use chrono::{DateTime, Local};
use log::debug;

#[derive(Debug, Default)]
pub struct RecordStore {
    dogs: Vec<DogRecord>,
    breeds: Vec<ReferenceItem>,
    rescue_types: Vec<ReferenceItem>,
    /// Bumped on every change to `dogs`; keys derived-value memos.
    revision: u64,
    error: Option<String>,
    last_fetch: Option<DateTime<Local>>,
    initialized: bool,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dogs(&self) -> &[DogRecord] {
        &self.dogs
    }

    pub fn breeds(&self) -> &[ReferenceItem] {
        &self.breeds
    }

    pub fn rescue_types(&self) -> &[ReferenceItem] {
        &self.rescue_types
    }

    pub fn references(&self, resource: Resource) -> &[ReferenceItem] {
        match resource {
            Resource::Breeds => &self.breeds,
            Resource::RescueTypes => &self.rescue_types,
            Resource::Dogs => &[],
        }
    }

    fn references_mut(&mut self, resource: Resource) -> Option<&mut Vec<ReferenceItem>> {
        match resource {
            Resource::Breeds => Some(&mut self.breeds),
            Resource::RescueTypes => Some(&mut self.rescue_types),
            Resource::Dogs => None,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advisory message set when the dog list could not be fetched.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn last_fetch(&self) -> Option<DateTime<Local>> {
        self.last_fetch
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn set_dogs(&mut self, dogs: Vec<DogRecord>) {
        debug!("Loaded {} dogs", dogs.len());
        self.dogs = dogs;
        self.revision += 1;
        self.last_fetch = Some(Local::now());
    }

    pub fn set_references(&mut self, resource: Resource, items: Vec<ReferenceItem>) {
        if let Some(list) = self.references_mut(resource) {
            debug!("Loaded {} {}", items.len(), resource);
            *list = items;
        }
    }

    pub fn find_dog(&self, id: &str) -> Option<&DogRecord> {
        self.dogs.iter().find(|dog| dog.key() == id)
    }

    pub fn insert_dog(&mut self, dog: DogRecord) {
        self.dogs.push(dog);
        self.revision += 1;
    }

    /// Swap the record keyed `id` for `dog`. Returns false if absent.
    pub fn replace_dog(&mut self, id: &str, dog: DogRecord) -> bool {
        match self.dogs.iter_mut().find(|d| d.key() == id) {
            Some(slot) => {
                *slot = dog;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn remove_dog(&mut self, id: &str) -> bool {
        let before = self.dogs.len();
        self.dogs.retain(|dog| dog.key() != id);
        let removed = self.dogs.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }

    pub fn insert_reference(&mut self, resource: Resource, item: ReferenceItem) {
        if let Some(list) = self.references_mut(resource) {
            list.push(item);
        }
    }

    /// Dogs keep the old name as free text; nothing cascades.
    pub fn rename_reference(&mut self, resource: Resource, id: &str, name: &str) -> bool {
        let Some(list) = self.references_mut(resource) else {
            return false;
        };
        match list.iter_mut().find(|item| item.id.as_deref() == Some(id)) {
            Some(item) => {
                item.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_reference(&mut self, resource: Resource, id: &str) -> bool {
        let Some(list) = self.references_mut(resource) else {
            return false;
        };
        let before = list.len();
        list.retain(|item| item.id.as_deref() != Some(id));
        list.len() != before
    }

    pub fn dogs_by_breed(&self, breed: &str) -> Vec<&DogRecord> {
        self.dogs.iter().filter(|dog| dog.breed == breed).collect()
    }

    pub fn dogs_by_rescue_type(&self, rescue_type: &str) -> Vec<&DogRecord> {
        self.dogs
            .iter()
            .filter(|dog| dog.rescue_type == rescue_type)
            .collect()
    }
}
