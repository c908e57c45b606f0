//! Area operations on top of the generic `restws` entity API.
//!
//! farmOS stores areas as taxonomy terms of the `farm_areas` vocabulary.
//! The vocabulary id is looked up once per client and reused.

use std::sync::Arc;

use async_trait::async_trait;
use drupal_restws::{Filters, RestWsApi};
use farmwfs_utils::LazyCell;
use serde_json::{Map, Value};
use tracing::instrument;

use super::error::AreaError;

pub const AREA_ENTITY: &str = "taxonomy_term";
pub const VOCABULARY_ENTITY: &str = "taxonomy_vocabulary";
pub const AREA_VOCABULARY: &str = "farm_areas";

/// CRUD over farm areas for one authenticated backend user.
#[async_trait]
pub trait AreaApi: Send + Sync {
    /// Reads one term; with `validate` it must belong to the area vocabulary.
    async fn get_by_id(&self, area_id: &str, validate: bool) -> Result<Value, AreaError>;

    /// Every area term, across all pages.
    async fn get_all(&self) -> Result<Vec<Value>, AreaError>;

    /// Creates an area and returns its backend id.
    async fn create(&self, record: Map<String, Value>) -> Result<String, AreaError>;

    async fn update(&self, area_id: &str, record: &Value) -> Result<(), AreaError>;

    async fn delete(&self, area_id: &str) -> Result<(), AreaError>;
}

/// [`AreaApi`] backed by a [`RestWsApi`] client.
pub struct AreaClient {
    api: Arc<dyn RestWsApi>,
    vocabulary_id: LazyCell<String>,
}

impl std::fmt::Debug for AreaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaClient")
            .field("vocabulary_id", &self.vocabulary_id.peek().as_deref())
            .finish_non_exhaustive()
    }
}

impl AreaClient {
    pub fn new(api: Arc<dyn RestWsApi>) -> Self {
        Self {
            api,
            vocabulary_id: LazyCell::new(),
        }
    }

    /// Id of the `farm_areas` vocabulary. Concurrent first calls share one lookup.
    ///
    /// # Errors
    /// Backend failures, or no such vocabulary.
    pub async fn area_vocabulary_id(&self) -> Result<Arc<String>, AreaError> {
        self.vocabulary_id
            .get_or_try_init(|| self.lookup_vocabulary_id())
            .await
    }

    #[instrument(skip_all)]
    async fn lookup_vocabulary_id(&self) -> Result<String, AreaError> {
        let filters = Filters::from([("machine_name".to_owned(), AREA_VOCABULARY.to_owned())]);
        let page = self.api.fetch_page(VOCABULARY_ENTITY, &filters).await?;

        let vocabulary = page
            .records
            .first()
            .ok_or_else(|| AreaError::MissingVocabulary {
                machine_name: AREA_VOCABULARY.to_owned(),
            })?;
        let vid = id_string(&vocabulary["vid"])
            .ok_or_else(|| AreaError::malformed("vocabulary", "record without a vid"))?;

        tracing::debug!(vid = %vid, "resolved area vocabulary");
        Ok(vid)
    }
}

#[async_trait]
impl AreaApi for AreaClient {
    async fn get_by_id(&self, area_id: &str, validate: bool) -> Result<Value, AreaError> {
        let entity = self.api.get_entity(AREA_ENTITY, area_id).await?;

        if validate {
            let vid = self.area_vocabulary_id().await?;
            if id_string(&entity["vocabulary"]["id"]).as_deref() != Some(vid.as_str()) {
                return Err(AreaError::NotAnArea {
                    id: area_id.to_owned(),
                });
            }
        }

        Ok(entity)
    }

    async fn get_all(&self) -> Result<Vec<Value>, AreaError> {
        let filters = Filters::from([("bundle".to_owned(), AREA_VOCABULARY.to_owned())]);
        Ok(self.api.get_all_entities(AREA_ENTITY, filters).await?)
    }

    async fn create(&self, mut record: Map<String, Value>) -> Result<String, AreaError> {
        let vid = self.area_vocabulary_id().await?;
        record.insert("vocabulary".to_owned(), Value::String(vid.as_ref().clone()));

        let created = self
            .api
            .create_entity(AREA_ENTITY, &Value::Object(record))
            .await?;
        id_string(&created["id"])
            .ok_or_else(|| AreaError::malformed("create response", "no entity id"))
    }

    async fn update(&self, area_id: &str, record: &Value) -> Result<(), AreaError> {
        Ok(self.api.update_entity(AREA_ENTITY, area_id, record).await?)
    }

    async fn delete(&self, area_id: &str) -> Result<(), AreaError> {
        Ok(self.api.delete_entity(AREA_ENTITY, area_id).await?)
    }
}

/// Backend ids arrive as JSON strings or numbers.
#[must_use]
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use drupal_restws::{PagePayload, RestWsError};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeRest {
        vocabulary_lookups: AtomicUsize,
        created: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl RestWsApi for FakeRest {
        async fn get_entity(&self, _: &str, entity_id: &str) -> Result<Value, RestWsError> {
            let vid = if entity_id == "1" { json!("3") } else { json!(8) };
            Ok(json!({ "tid": entity_id, "vocabulary": { "id": vid } }))
        }

        async fn fetch_page(&self, entity_type: &str, filters: &Filters) -> Result<PagePayload, RestWsError> {
            assert_eq!(entity_type, VOCABULARY_ENTITY);
            assert_eq!(filters["machine_name"], AREA_VOCABULARY);
            self.vocabulary_lookups.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(PagePayload {
                records: vec![json!({ "vid": 3, "machine_name": "farm_areas" })],
                last_page: None,
            })
        }

        async fn create_entity(&self, _: &str, record: &Value) -> Result<Value, RestWsError> {
            self.created.lock().push(record.clone());
            Ok(json!({ "id": "42", "resource": "taxonomy_term" }))
        }

        async fn update_entity(&self, _: &str, _: &str, _: &Value) -> Result<(), RestWsError> {
            Ok(())
        }

        async fn delete_entity(&self, _: &str, _: &str) -> Result<(), RestWsError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn vocabulary_is_resolved_once() {
        let rest = Arc::new(FakeRest::default());
        let client = AreaClient::new(Arc::clone(&rest) as Arc<dyn RestWsApi>);

        let lookups = (0..5).map(|_| client.area_vocabulary_id());
        for vid in futures::future::join_all(lookups).await {
            assert_eq!(vid.unwrap().as_str(), "3");
        }
        assert_eq!(rest.vocabulary_lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_rejects_terms_of_other_vocabularies() {
        let client = AreaClient::new(Arc::new(FakeRest::default()));

        assert_eq!(client.get_by_id("1", true).await.unwrap()["tid"], "1");
        assert!(client.get_by_id("2", false).await.is_ok());
        assert!(matches!(
            client.get_by_id("2", true).await,
            Err(AreaError::NotAnArea { id }) if id == "2"
        ));
    }

    #[tokio::test]
    async fn create_scopes_record_to_area_vocabulary() {
        let rest = Arc::new(FakeRest::default());
        let client = AreaClient::new(Arc::clone(&rest) as Arc<dyn RestWsApi>);

        let mut record = Map::new();
        record.insert("name".to_owned(), json!("Barn"));
        let id = client.create(record).await.unwrap();

        assert_eq!(id, "42");
        assert_eq!(
            rest.created.lock()[0],
            json!({ "name": "Barn", "vocabulary": "3" })
        );
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        assert_eq!(id_string(&json!("7")).as_deref(), Some("7"));
        assert_eq!(id_string(&json!(7)).as_deref(), Some("7"));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&Value::Null), None);
    }
}
