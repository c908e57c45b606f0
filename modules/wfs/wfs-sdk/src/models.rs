//! Feature, layer and transaction models.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryRecord;

/// Field name to text value.
pub type FieldData = BTreeMap<String, String>;

/// Operations a layer may permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    Query,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Self; 4] = [Self::Query, Self::Insert, Self::Update, Self::Delete];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service metadata for the capabilities document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceInfo {
    pub name: String,
    pub title: Option<String>,
    pub r#abstract: Option<String>,
    pub keywords: Vec<String>,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: "WFS".to_owned(),
            title: None,
            r#abstract: None,
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureField {
    pub name: String,
    /// XML schema type name, e.g. `string`.
    pub field_type: String,
    pub required: bool,
}

impl FeatureField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            required: false,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A named feature type. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDefinition {
    pub name: String,
    pub title: Option<String>,
    pub r#abstract: Option<String>,
    pub default_srs: String,
    /// GML property type of the geometry element, e.g. `PointPropertyType`.
    pub geometry_type: String,
    pub operations: BTreeSet<Operation>,
    pub fields: Vec<FeatureField>,
    /// Backend-specific data the engine never reads.
    pub ext: BTreeMap<String, String>,
}

impl LayerDefinition {
    /// A query-only layer with a generic geometry type and no fields.
    pub fn new(name: impl Into<String>, default_srs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            r#abstract: None,
            default_srs: default_srs.into(),
            geometry_type: "GeometryPropertyType".to_owned(),
            operations: BTreeSet::from([Operation::Query]),
            fields: Vec::new(),
            ext: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.r#abstract = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_geometry_type(mut self, geometry_type: impl Into<String>) -> Self {
        self.geometry_type = geometry_type.into();
        self
    }

    #[must_use]
    pub fn with_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FeatureField>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_ext(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ext.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn allows(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FeatureField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// `"<layer-name>.<backend-id>"`.
    pub feature_id: String,
    pub geometry: GeometryRecord,
    pub field_data: FieldData,
}

#[derive(Debug, Clone)]
pub struct UncommittedFeature {
    pub layer: Arc<LayerDefinition>,
    pub geometry: GeometryRecord,
    pub field_data: FieldData,
    pub handle: Option<String>,
}

/// `geometry: None` leaves the geometry unchanged; `field_data` may be partial.
#[derive(Debug, Clone)]
pub struct UncommittedFeatureUpdate {
    pub layer: Arc<LayerDefinition>,
    pub feature_id: String,
    pub geometry: Option<GeometryRecord>,
    pub field_data: FieldData,
    pub handle: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UncommittedFeatureDelete {
    pub layer: Arc<LayerDefinition>,
    pub feature_id: String,
    pub handle: Option<String>,
}

/// One reported outcome: a feature id on success, a message on failure.
#[derive(Debug, Clone)]
pub struct CommitOutcomeItem {
    pub data: String,
    pub layer: Option<Arc<LayerDefinition>>,
    pub handle: Option<String>,
}

impl CommitOutcomeItem {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            layer: None,
            handle: None,
        }
    }

    #[must_use]
    pub fn with_layer(mut self, layer: &Arc<LayerDefinition>) -> Self {
        self.layer = Some(Arc::clone(layer));
        self
    }

    #[must_use]
    pub fn with_handle(mut self, handle: Option<&str>) -> Self {
        self.handle = handle.map(str::to_owned);
        self
    }
}

/// Parsed mutations plus the failures found while parsing them.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub features_to_insert: Vec<UncommittedFeature>,
    pub features_to_update: Vec<UncommittedFeatureUpdate>,
    pub features_to_delete: Vec<UncommittedFeatureDelete>,
    pub read_transaction_failures: Vec<CommitOutcomeItem>,
}

impl Transaction {
    /// Number of mutations to commit, ignoring read failures.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.features_to_insert.len() + self.features_to_update.len() + self.features_to_delete.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionOutcome {
    pub inserted: Vec<CommitOutcomeItem>,
    pub updated: Vec<CommitOutcomeItem>,
    pub deleted: Vec<CommitOutcomeItem>,
    pub transaction_failures: Vec<CommitOutcomeItem>,
}

impl TransactionOutcome {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn layer_builder_defaults_to_query_only() {
        let layer = LayerDefinition::new("roads", "EPSG:4326");
        assert!(layer.allows(Operation::Query));
        assert!(!layer.allows(Operation::Insert));
        assert_eq!(layer.geometry_type, "GeometryPropertyType");
    }

    #[test]
    fn layer_fields_are_looked_up_by_name() {
        let layer = LayerDefinition::new("roads", "EPSG:4326").with_fields([
            FeatureField::new("name", "string").required(),
            FeatureField::new("lanes", "integer"),
        ]);
        assert!(layer.field("name").unwrap().required);
        assert!(!layer.field("lanes").unwrap().required);
        assert!(layer.field("speed").is_none());
    }

    #[test]
    fn service_info_reads_partial_config() {
        let info: ServiceInfo =
            serde_json::from_str(r#"{"name": "farm", "abstract": "Areas"}"#).unwrap();
        assert_eq!(info.name, "farm");
        assert_eq!(info.r#abstract.as_deref(), Some("Areas"));
        assert!(info.keywords.is_empty());
    }
}
