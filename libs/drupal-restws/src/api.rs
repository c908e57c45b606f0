use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RestWsError;
use crate::pagination::EntityListing;

/// Query filters for collection reads, e.g. `bundle=farm_areas`.
pub type Filters = BTreeMap<String, String>;

/// One page of a collection read.
#[derive(Debug, Clone, Default)]
pub struct PagePayload {
    pub records: Vec<Value>,
    /// Page number found in the response's `last` link, if any.
    pub last_page: Option<u32>,
}

/// Entity operations against a `restws` backend.
///
/// Implementations authenticate lazily; callers never deal with sessions.
#[async_trait]
pub trait RestWsApi: Send + Sync {
    /// `GET {type}/{id}.json`, expects 200.
    async fn get_entity(&self, entity_type: &str, entity_id: &str) -> Result<Value, RestWsError>;

    /// `GET {type}.json?{filters}`, expects 200. One call per page.
    async fn fetch_page(
        &self,
        entity_type: &str,
        filters: &Filters,
    ) -> Result<PagePayload, RestWsError>;

    /// `POST {type}` with a JSON body, expects 201. Returns the response body.
    async fn create_entity(&self, entity_type: &str, record: &Value) -> Result<Value, RestWsError>;

    /// `PUT {type}/{id}` with a JSON body, expects 200.
    async fn update_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        record: &Value,
    ) -> Result<(), RestWsError>;

    /// `DELETE {type}/{id}`, expects 200.
    async fn delete_entity(&self, entity_type: &str, entity_id: &str) -> Result<(), RestWsError>;

    /// Opens a lazily paginated listing at the page named by `filters["page"]`.
    async fn get_entities<'a>(
        &'a self,
        entity_type: &str,
        filters: Filters,
    ) -> Result<EntityListing<'a, Self>, RestWsError>
    where
        Self: Sized,
    {
        EntityListing::open(self, entity_type, filters).await
    }

    /// Reads every page, front to back, without retaining visited pages.
    async fn get_all_entities(
        &self,
        entity_type: &str,
        filters: Filters,
    ) -> Result<Vec<Value>, RestWsError> {
        let mut listing = EntityListing::open(self, entity_type, filters).await?;
        let mut records = listing.take_current_records();
        while listing.next_page(true).await?.is_some() {
            records.append(&mut listing.take_current_records());
        }
        Ok(records)
    }
}
