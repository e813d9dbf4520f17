//! Application state: one object built at session start that owns the
//! gateway, the record store, the filter engine and the derived-value memos.

use crate::cache::Resource;
use crate::error::{GatewayError, GatewayResult};
use crate::filter::{FilterCriteria, FilterEngine, FilterError, FilterField, filter_indices};
use crate::gateway::{Fetched, RemoteGateway};
use crate::memo::Memo;
use crate::record::{DogPatch, DogRecord, ReferenceItem};
use crate::stats::Stats;
use crate::store::RecordStore;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

const DOGS_FETCH_ERROR: &str = "Failed to fetch dogs from API";

/// Counts reported after a full load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub dogs: usize,
    pub breeds: usize,
    pub rescue_types: usize,
    /// Resources that fell back to the empty collection.
    pub failed: usize,
}

type DerivedKey = (u64, FilterCriteria);

pub struct Dashboard {
    gateway: RemoteGateway,
    store: RecordStore,
    filters: FilterEngine,
    filtered: Memo<DerivedKey, Vec<usize>>,
    stats: Memo<DerivedKey, Stats>,
}

impl Dashboard {
    pub fn new(gateway: RemoteGateway, filters: FilterEngine) -> Self {
        Self {
            gateway,
            store: RecordStore::new(),
            filters,
            filtered: Memo::default(),
            stats: Memo::default(),
        }
    }

    pub fn gateway(&self) -> &RemoteGateway {
        &self.gateway
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        self.filters.criteria()
    }

    // ---- loading ----

    /// Fetch all three lists concurrently, each into its own store slot.
    pub async fn load_all(&mut self) -> LoadSummary {
        let progress = ProgressBar::new(Resource::ALL.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
        {
            progress.set_style(style.progress_chars("##-"));
        }
        progress.set_message("Loading shelter data");

        let (dogs, breeds, rescue_types) = self
            .gateway
            .preload_all(|resource| {
                progress.inc(1);
                progress.set_message(format!("Loaded {}", resource));
            })
            .await;
        progress.finish_and_clear();

        let failed = [dogs.is_fallback(), breeds.is_fallback(), rescue_types.is_fallback()]
            .iter()
            .filter(|failed| **failed)
            .count();
        self.apply_dogs(dogs);
        self.store.set_references(Resource::Breeds, breeds.items);
        self.store.set_references(Resource::RescueTypes, rescue_types.items);
        self.store.mark_initialized();

        let summary = LoadSummary {
            dogs: self.store.dogs().len(),
            breeds: self.store.breeds().len(),
            rescue_types: self.store.rescue_types().len(),
            failed,
        };
        info!("All data loaded: {:?}", summary);
        summary
    }

    pub async fn fetch_dogs(&mut self, force: bool) -> &[DogRecord] {
        let dogs = self.gateway.list_dogs(force).await;
        self.apply_dogs(dogs);
        self.store.dogs()
    }

    pub async fn fetch_references(&mut self, resource: Resource, force: bool) -> &[ReferenceItem] {
        let fetched = match resource {
            Resource::Breeds => self.gateway.list_breeds(force).await,
            Resource::RescueTypes => self.gateway.list_rescue_types(force).await,
            Resource::Dogs => return &[],
        };
        self.store.set_references(resource, fetched.items);
        self.store.references(resource)
    }

    fn apply_dogs(&mut self, dogs: Fetched<DogRecord>) {
        if dogs.is_fallback() {
            warn!("{}", DOGS_FETCH_ERROR);
            self.store.set_error(Some(DOGS_FETCH_ERROR.to_string()));
        } else {
            self.store.set_error(None);
        }
        self.store.set_dogs(dogs.items);
    }

    // ---- filters ----

    pub fn set_filter(&mut self, field: FilterField, value: &str) -> Result<(), FilterError> {
        self.filters.set(field, value)
    }

    pub fn clear_filter(&mut self, field: FilterField) -> Result<(), FilterError> {
        self.filters.clear(field)
    }

    pub fn set_filters(&mut self, criteria: FilterCriteria) -> Result<(), FilterError> {
        self.filters.replace(criteria)
    }

    pub fn reset_filters(&mut self) -> Result<(), FilterError> {
        self.filters.reset()
    }

    fn derived_key(&self) -> DerivedKey {
        (self.store.revision(), self.filters.criteria().clone())
    }

    /// Dogs matching the current criteria, recomputed only when the
    /// dataset or the criteria changed.
    pub fn filtered_dogs(&mut self) -> Vec<&DogRecord> {
        let key = self.derived_key();
        let dogs = self.store.dogs();
        let criteria = self.filters.criteria();
        let indices = self
            .filtered
            .get_or_compute(key, || filter_indices(dogs, criteria));
        indices.iter().filter_map(|i| dogs.get(*i)).collect()
    }

    /// Tallies over the filtered set, memoized the same way.
    pub fn stats(&mut self) -> &Stats {
        let key = self.derived_key();
        let dogs = self.store.dogs();
        let criteria = self.filters.criteria();
        let filtered = &mut self.filtered;
        self.stats.get_or_compute(key.clone(), || {
            let indices = filtered.get_or_compute(key, || filter_indices(dogs, criteria));
            Stats::from_dogs(indices.iter().filter_map(|i| dogs.get(*i)))
        })
    }

    /// How many times the filtered set has been recomputed.
    pub fn filter_computations(&self) -> usize {
        self.filtered.computations()
    }

    /// Filtered dogs that carry coordinates.
    pub fn located_dogs(&mut self) -> Vec<&DogRecord> {
        self.filtered_dogs()
            .into_iter()
            .filter(|dog| dog.has_location())
            .collect()
    }

    // ---- writes ----

    /// Create a dog and, once the backend confirms, add it locally with the
    /// id the backend assigned.
    pub async fn add_dog(&mut self, mut dog: DogRecord) -> GatewayResult<&DogRecord> {
        let response = self.gateway.create_dog(&dog).await?;
        if dog.id.is_none() {
            dog.id = response.id;
        }
        let key = dog.key().to_string();
        self.store.insert_dog(dog);
        info!("Dog {} added", key);
        self.store
            .find_dog(&key)
            .ok_or_else(|| GatewayError::not_found("Dog", key))
    }

    pub async fn update_dog(&mut self, id: &str, patch: &DogPatch) -> GatewayResult<&DogRecord> {
        let Some(current) = self.store.find_dog(id) else {
            return Err(GatewayError::not_found("Dog", id));
        };
        let mut updated = current.clone();
        patch.apply_to(&mut updated);

        self.gateway.update_dog(id, &updated).await?;
        let key = updated.key().to_string();
        self.store.replace_dog(id, updated);
        self.store
            .find_dog(&key)
            .ok_or_else(|| GatewayError::not_found("Dog", key))
    }

    pub async fn delete_dog(&mut self, id: &str) -> GatewayResult<()> {
        self.gateway.delete_dog(id).await?;
        self.store.remove_dog(id);
        Ok(())
    }

    pub async fn add_reference(
        &mut self,
        resource: Resource,
        name: &str,
    ) -> GatewayResult<ReferenceItem> {
        let response = self.gateway.create_reference(resource, name).await?;
        let item = ReferenceItem {
            id: response.id,
            name: name.trim().to_string(),
        };
        self.store.insert_reference(resource, item.clone());
        Ok(item)
    }

    /// Rename a breed or rescue type. Dogs keep the name they stored.
    pub async fn rename_reference(
        &mut self,
        resource: Resource,
        id: &str,
        name: &str,
    ) -> GatewayResult<()> {
        self.gateway.update_reference(resource, id, name).await?;
        self.store.rename_reference(resource, id, name.trim());
        Ok(())
    }

    pub async fn delete_reference(&mut self, resource: Resource, id: &str) -> GatewayResult<()> {
        self.gateway.delete_reference(resource, id).await?;
        self.store.remove_reference(resource, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RemoteGateway;
    use crate::storage::MemoryStorage;
    use crate::testing::{StubBackend, unreachable_url};
    use serde_json::{Value, json};

    fn scenario_dogs() -> Vec<Value> {
        vec![
            json!({"_id": "1", "animal_id": "A1", "name": "Rex", "breed": "Labrador Retriever",
                   "age_upon_outcome_in_weeks": 10, "sex_upon_outcome": "Intact Male",
                   "outcome_type": "Adoption", "location_lat": 30.75, "location_long": -97.48}),
            json!({"_id": "2", "animal_id": "A2", "name": "", "breed": "Labrador",
                   "age_upon_outcome_in_weeks": 60, "sex_upon_outcome": "Spayed Female",
                   "outcome_type": "Transfer"}),
            json!({"_id": "3", "animal_id": "A3", "name": "Fido", "breed": "Poodle",
                   "age_upon_outcome_in_weeks": 200, "sex_upon_outcome": "Intact Male",
                   "outcome_type": "Adoption"}),
        ]
    }

    async fn dashboard(backend: &StubBackend) -> Dashboard {
        let gateway = RemoteGateway::new(&backend.url().await)
            .unwrap()
            .with_delay(0)
            .with_max_retries(0);
        Dashboard::new(gateway, FilterEngine::load(Box::new(MemoryStorage::default())))
    }

    #[tokio::test]
    async fn test_load_all_populates_store() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;

        let summary = dashboard.load_all().await;

        assert_eq!(summary.dogs, 3);
        assert_eq!(summary.failed, 0);
        assert!(dashboard.store().is_initialized());
        assert!(dashboard.store().error().is_none());
    }

    #[tokio::test]
    async fn test_load_failure_sets_advisory_error() {
        let gateway = RemoteGateway::new(&unreachable_url())
            .unwrap()
            .with_delay(0)
            .with_max_retries(0);
        let mut dashboard =
            Dashboard::new(gateway, FilterEngine::load(Box::new(MemoryStorage::default())));

        let summary = dashboard.load_all().await;

        assert_eq!(summary.failed, 3);
        assert_eq!(summary.dogs, 0);
        assert_eq!(dashboard.store().error(), Some("Failed to fetch dogs from API"));
        assert!(dashboard.filtered_dogs().is_empty());
        assert_eq!(dashboard.stats().total, 0);
    }

    #[tokio::test]
    async fn test_filtering_and_stats_scenario() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;
        dashboard.load_all().await;

        let stats = dashboard.stats();
        assert_eq!(stats.by_outcome["Adoption"], 2);
        assert_eq!(stats.by_outcome["Transfer"], 1);

        dashboard.set_filter(FilterField::Breed, "labrador").unwrap();
        let ids: Vec<&str> = dashboard.filtered_dogs().iter().map(|d| d.key()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(dashboard.stats().total, 2);
        assert_eq!(dashboard.located_dogs().len(), 1);

        dashboard.reset_filters().unwrap();
        dashboard.set_filter(FilterField::Age, "senior").unwrap();
        let ids: Vec<&str> = dashboard.filtered_dogs().iter().map(|d| d.key()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[tokio::test]
    async fn test_filtered_set_is_memoized() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;
        dashboard.load_all().await;

        dashboard.filtered_dogs();
        dashboard.filtered_dogs();
        dashboard.stats();
        assert_eq!(dashboard.filter_computations(), 1);

        dashboard.set_filter(FilterField::Sex, "Intact Male").unwrap();
        assert_eq!(dashboard.stats().total, 2);
        dashboard.filtered_dogs();
        assert_eq!(dashboard.filter_computations(), 2);
    }

    #[tokio::test]
    async fn test_add_dog_rejected_before_network() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;
        dashboard.load_all().await;
        let revision = dashboard.store().revision();

        let err = dashboard.add_dog(DogRecord::new("", "Buddy")).await.unwrap_err();

        assert!(matches!(err, GatewayError::Validation { .. }));
        assert_eq!(backend.writes(), 0);
        assert_eq!(dashboard.store().dogs().len(), 3);
        assert_eq!(dashboard.store().revision(), revision);
    }

    #[tokio::test]
    async fn test_add_dog_inserts_with_backend_id() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;
        dashboard.load_all().await;

        let added = dashboard.add_dog(DogRecord::new("A4", "Buddy")).await.unwrap();
        assert!(added.id.as_deref().unwrap().starts_with("id-"));
        assert_eq!(dashboard.store().dogs().len(), 4);
        assert_eq!(dashboard.filtered_dogs().len(), 4);

        // duplicate animal ids are refused by the backend and change nothing
        let err = dashboard.add_dog(DogRecord::new("A4", "Other")).await.unwrap_err();
        assert_eq!(err.to_string(), "Dog with this animal_id already exists.");
        assert_eq!(dashboard.store().dogs().len(), 4);
    }

    #[tokio::test]
    async fn test_update_dog_merges_patch() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;
        dashboard.load_all().await;

        let patch = DogPatch {
            outcome_type: Some("Transfer".to_string()),
            ..DogPatch::default()
        };
        let updated = dashboard.update_dog("3", &patch).await.unwrap();
        assert_eq!(updated.outcome_type, "Transfer");
        assert_eq!(updated.name, "Fido");
        assert_eq!(dashboard.stats().by_outcome["Transfer"], 2);

        let missing = dashboard.update_dog("nope", &patch).await.unwrap_err();
        assert!(matches!(missing, GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_dog_removes_record_and_cache_entry() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;
        dashboard.load_all().await;
        assert_eq!(backend.reads("dogs"), 1);

        dashboard.delete_dog("2").await.unwrap();

        assert!(dashboard.store().find_dog("2").is_none());
        assert!(!dashboard.gateway().cache_status().contains_key(&Resource::Dogs));
        dashboard.fetch_dogs(false).await;
        assert_eq!(backend.reads("dogs"), 2);
        assert_eq!(dashboard.store().dogs().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_store_untouched() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;
        dashboard.load_all().await;
        backend.fail_writes_silently(true);

        assert!(dashboard.delete_dog("1").await.is_err());
        assert!(dashboard.store().find_dog("1").is_some());
    }

    #[tokio::test]
    async fn test_reference_changes_do_not_cascade() {
        let backend = StubBackend::with_dogs(scenario_dogs());
        let mut dashboard = dashboard(&backend).await;
        dashboard.load_all().await;

        let breed = dashboard.add_reference(Resource::Breeds, " Poodle ").await.unwrap();
        let id = breed.id.unwrap();
        assert_eq!(breed.name, "Poodle");

        dashboard
            .rename_reference(Resource::Breeds, &id, "Standard Poodle")
            .await
            .unwrap();
        assert_eq!(dashboard.store().breeds()[0].name, "Standard Poodle");
        assert_eq!(dashboard.store().dogs_by_breed("Poodle").len(), 1);

        dashboard.delete_reference(Resource::Breeds, &id).await.unwrap();
        assert!(dashboard.store().breeds().is_empty());
        assert_eq!(dashboard.store().dogs_by_breed("Poodle").len(), 1);

        let breeds = dashboard.fetch_references(Resource::Breeds, true).await;
        assert!(breeds.is_empty());
    }
}
