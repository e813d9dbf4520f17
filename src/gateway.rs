//! REST client for the shelter backend.
//!
//! List reads go through the [`ResponseCache`] and degrade to an empty
//! collection on failure. Writes invalidate the matching cache entry on
//! success and always propagate failures.

use crate::cache::{EntryStatus, Resource, ResponseCache};
use crate::error::{GatewayError, GatewayResult};
use crate::record::{DogRecord, ReferenceItem, WriteResponse};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use rand::Rng;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Retry delays stop doubling after this many attempts.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Where a list result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
    /// The request failed and the static empty fallback was substituted.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub source: FetchSource,
}

impl<T> Fetched<T> {
    pub fn is_fallback(&self) -> bool {
        self.source == FetchSource::Fallback
    }
}

pub struct RemoteGateway {
    client: Client,
    base_url: String,
    cache: Mutex<ResponseCache>,
    pub(crate) base_delay: Duration,
    pub(crate) max_retries: u32,
}

impl RemoteGateway {
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shelter-dash/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(ResponseCache::new()),
            base_delay: Duration::from_millis(500),
            max_retries: 2,
        })
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.base_delay = Duration::from_millis(delay_ms);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Mutex::new(cache);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn collection_url(&self, resource: Resource) -> String {
        format!("{}/{}/", self.base_url, resource)
    }

    fn item_url(&self, resource: Resource, id: &str) -> String {
        format!("{}/{}/{}/", self.base_url, resource, id)
    }

    // ---- cache controls ----

    pub fn invalidate(&self, resource: Resource) {
        self.cache().invalidate(resource);
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    pub fn cache_status(&self) -> IndexMap<Resource, EntryStatus> {
        self.cache().status()
    }

    /// True when any resource could be served without a network call.
    pub fn is_data_available_offline(&self) -> bool {
        self.cache().has_valid_entry()
    }

    // ---- reads ----

    pub async fn list_dogs(&self, force: bool) -> Fetched<DogRecord> {
        self.fetch_list(Resource::Dogs, force).await
    }

    pub async fn list_breeds(&self, force: bool) -> Fetched<ReferenceItem> {
        self.fetch_list(Resource::Breeds, force).await
    }

    pub async fn list_rescue_types(&self, force: bool) -> Fetched<ReferenceItem> {
        self.fetch_list(Resource::RescueTypes, force).await
    }

    /// Fetch all three collections concurrently. `on_loaded` runs as each
    /// one completes, in completion order.
    pub async fn preload_all(
        &self,
        on_loaded: impl Fn(Resource),
    ) -> (
        Fetched<DogRecord>,
        Fetched<ReferenceItem>,
        Fetched<ReferenceItem>,
    ) {
        if self.is_data_available_offline() {
            info!("Cache is valid, preloading will be instant");
        }
        let on_loaded = &on_loaded;
        futures::join!(
            async {
                let result = self.list_dogs(false).await;
                on_loaded(Resource::Dogs);
                result
            },
            async {
                let result = self.list_breeds(false).await;
                on_loaded(Resource::Breeds);
                result
            },
            async {
                let result = self.list_rescue_types(false).await;
                on_loaded(Resource::RescueTypes);
                result
            }
        )
    }

    async fn fetch_list<T: DeserializeOwned>(&self, resource: Resource, force: bool) -> Fetched<T> {
        if force {
            self.invalidate(resource);
        }

        let cached = self.cache().get(resource).cloned();
        if let Some(payload) = cached {
            match serde_json::from_value::<Vec<T>>(payload) {
                Ok(items) => {
                    return Fetched {
                        items,
                        source: FetchSource::Cache,
                    };
                }
                Err(e) => {
                    warn!("Discarding unreadable cache entry for {}: {}", resource, e);
                    self.invalidate(resource);
                }
            }
        }

        let url = self.collection_url(resource);
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff_delay = self.backoff(attempt);
                info!(
                    "Retrying {} (attempt {}) after {}ms delay",
                    resource,
                    attempt + 1,
                    backoff_delay.as_millis()
                );
                sleep(backoff_delay).await;
            }

            info!("Fetching {} from API...", resource);
            let result = match self.get_json(&url).await {
                Ok(payload) => serde_json::from_value::<Vec<T>>(payload.clone())
                    .map(|items| (items, payload))
                    .map_err(GatewayError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok((items, payload)) => {
                    self.cache().set(resource, payload);
                    debug!("Loaded {} {}", items.len(), resource);
                    return Fetched {
                        items,
                        source: FetchSource::Network,
                    };
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    warn!("Fetching {} failed, retrying...: {}", resource, e);
                }
                Err(e) => {
                    error!("Error fetching {}: {}", resource, e);
                    break;
                }
            }
        }

        warn!("Using offline fallback data for {}", resource);
        Fetched {
            items: Vec::new(),
            source: FetchSource::Fallback,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let jitter = if base_ms > 0 {
            rand::rng().random_range(0..base_ms)
        } else {
            0
        };
        let factor = 1_u64 << attempt.min(MAX_BACKOFF_EXPONENT);
        Duration::from_millis(factor.saturating_mul(base_ms).saturating_add(jitter))
    }

    async fn get_json(&self, url: &str) -> GatewayResult<Value> {
        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<Value>().await?)
    }

    // ---- writes ----

    /// Create a dog. `name` and `animal_id` are checked before any request.
    pub async fn create_dog(&self, dog: &DogRecord) -> GatewayResult<WriteResponse> {
        dog.validate_for_create().map_err(GatewayError::validation)?;
        let url = self.collection_url(Resource::Dogs);
        self.write(Resource::Dogs, Method::POST, &url, Some(dog)).await
    }

    pub async fn update_dog(&self, id: &str, dog: &DogRecord) -> GatewayResult<WriteResponse> {
        let url = self.item_url(Resource::Dogs, id);
        self.write(Resource::Dogs, Method::PUT, &url, Some(dog)).await
    }

    pub async fn delete_dog(&self, id: &str) -> GatewayResult<WriteResponse> {
        let url = self.item_url(Resource::Dogs, id);
        self.write::<()>(Resource::Dogs, Method::DELETE, &url, None)
            .await
    }

    pub async fn create_breed(&self, name: &str) -> GatewayResult<WriteResponse> {
        self.create_reference(Resource::Breeds, name).await
    }

    pub async fn update_breed(&self, id: &str, name: &str) -> GatewayResult<WriteResponse> {
        self.update_reference(Resource::Breeds, id, name).await
    }

    pub async fn delete_breed(&self, id: &str) -> GatewayResult<WriteResponse> {
        self.delete_reference(Resource::Breeds, id).await
    }

    pub async fn create_rescue_type(&self, name: &str) -> GatewayResult<WriteResponse> {
        self.create_reference(Resource::RescueTypes, name).await
    }

    pub async fn update_rescue_type(&self, id: &str, name: &str) -> GatewayResult<WriteResponse> {
        self.update_reference(Resource::RescueTypes, id, name).await
    }

    pub async fn delete_rescue_type(&self, id: &str) -> GatewayResult<WriteResponse> {
        self.delete_reference(Resource::RescueTypes, id).await
    }

    pub async fn create_reference(
        &self,
        resource: Resource,
        name: &str,
    ) -> GatewayResult<WriteResponse> {
        let item = Self::reference_body(name)?;
        let url = self.collection_url(resource);
        self.write(resource, Method::POST, &url, Some(&item)).await
    }

    pub async fn update_reference(
        &self,
        resource: Resource,
        id: &str,
        name: &str,
    ) -> GatewayResult<WriteResponse> {
        let item = Self::reference_body(name)?;
        let url = self.item_url(resource, id);
        self.write(resource, Method::PUT, &url, Some(&item)).await
    }

    pub async fn delete_reference(
        &self,
        resource: Resource,
        id: &str,
    ) -> GatewayResult<WriteResponse> {
        let url = self.item_url(resource, id);
        self.write::<()>(resource, Method::DELETE, &url, None).await
    }

    fn reference_body(name: &str) -> GatewayResult<ReferenceItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GatewayError::validation("Name is required"));
        }
        Ok(ReferenceItem::named(name))
    }

    async fn write<B: Serialize>(
        &self,
        resource: Resource,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> GatewayResult<WriteResponse> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => Self::ensure_success(response).await,
            Err(e) => Err(GatewayError::from(e)),
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("{} {} failed: {}", method, url, e);
                return Err(e);
            }
        };

        // The server has applied the write even if its body is unreadable.
        self.invalidate(resource);

        // Delete handlers may answer with an empty body.
        let text = response.text().await?;
        let result = if text.trim().is_empty() {
            WriteResponse::default()
        } else {
            serde_json::from_str(&text).unwrap_or_default()
        };

        info!("{} {} succeeded", method, url);
        Ok(result)
    }

    /// Pass a 2xx response through; otherwise build an [`GatewayError::Api`]
    /// from the body's `error` or `message` field.
    async fn ensure_success(response: Response) -> GatewayResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        let message = ["error", "message"]
            .iter()
            .find_map(|field| body.get(*field).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));

        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
