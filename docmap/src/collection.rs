use crate::errors::{Error, Result};
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Physical collection as known to the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDefinition {
    pub id: String,
    /// Path of the field documents are partitioned by, e.g. `/_DOCUMENT_TYPE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key_path: Option<String>,
}

impl CollectionDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            partition_key_path: None,
        }
    }

    pub fn is_partitioned(&self) -> bool {
        self.partition_key_path.is_some()
    }

    /// Partition key path in dotted form, as drivers address nested fields.
    pub fn partition_field(&self) -> Option<String> {
        self.partition_key_path
            .as_deref()
            .map(|path| path.trim_start_matches('/').replace('/', "."))
    }

    /// Partition key a document belongs to.
    pub fn partition_of<'a>(&self, document: &'a Document) -> Option<&'a Bson> {
        let path = self.partition_key_path.as_deref()?;

        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let mut current = document.get(segments.next()?)?;
        for segment in segments {
            current = current.as_document()?.get(segment)?;
        }

        Some(current)
    }
}

/// A collection inside a database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionRef {
    pub database_id: String,
    pub definition: CollectionDefinition,
}

impl CollectionRef {
    pub fn new(database_id: impl Into<String>, definition: CollectionDefinition) -> Self {
        Self {
            database_id: database_id.into(),
            definition,
        }
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn documents_link(&self) -> String {
        format!("dbs/{}/colls/{}/docs", self.database_id, self.definition.id)
    }

    pub fn document(&self, id: impl Into<String>) -> DocumentRef {
        DocumentRef {
            collection: self.clone(),
            id: id.into(),
        }
    }

    /// Checks that a write request is scoped the way this collection requires.
    pub fn check_request_scope(&self, options: &RequestOptions) -> Result<()> {
        self.check_scope(options.partition_key.as_deref())
    }

    /// Checks that a query is scoped the way this collection requires.
    pub fn check_feed_scope(&self, options: &FeedOptions) -> Result<()> {
        if options.partition_key.is_none() && options.enable_cross_partition_query {
            return Ok(());
        }

        self.check_scope(options.partition_key.as_deref())
    }

    /// Checks that a document lives in the partition a request is scoped to.
    pub fn check_document_partition(
        &self,
        document: &Document,
        options: &RequestOptions,
    ) -> Result<()> {
        self.check_request_scope(options)?;

        let Some(provided) = options.partition_key.as_deref() else {
            return Ok(());
        };

        match self.definition.partition_of(document) {
            Some(Bson::String(value)) if value == provided => Ok(()),
            other => Err(Error::PartitionKeyMismatch {
                collection: self.definition.id.clone(),
                expected: other.map(ToString::to_string),
                provided: Some(provided.to_owned()),
            }),
        }
    }

    fn check_scope(&self, provided: Option<&str>) -> Result<()> {
        match (self.definition.is_partitioned(), provided) {
            (true, None) => Err(Error::PartitionKeyMissing {
                collection: self.definition.id.clone(),
            }),
            (false, Some(provided)) => Err(Error::PartitionKeyMismatch {
                collection: self.definition.id.clone(),
                expected: None,
                provided: Some(provided.to_owned()),
            }),
            _ => Ok(()),
        }
    }
}

/// A single document addressed by identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRef {
    pub collection: CollectionRef,
    pub id: String,
}

impl Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection.documents_link(), self.id)
    }
}

/// Options of a query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedOptions {
    pub partition_key: Option<String>,
    pub max_item_count: Option<u32>,
    pub skip: Option<u64>,
    pub enable_cross_partition_query: bool,
}

/// Options of a create, replace or delete request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub partition_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn partitioned() -> CollectionRef {
        CollectionRef::new(
            "app",
            CollectionDefinition {
                id: "Entities".into(),
                partition_key_path: Some("/_DOCUMENT_TYPE".into()),
            },
        )
    }

    fn scoped(key: &str) -> RequestOptions {
        RequestOptions {
            partition_key: Some(key.into()),
        }
    }

    #[test]
    fn document_links() {
        let collection = partitioned();

        assert_eq!(collection.documents_link(), "dbs/app/colls/Entities/docs");
        assert_eq!(
            collection.document("o1").to_string(),
            "dbs/app/colls/Entities/docs/o1"
        );
    }

    #[test]
    fn partition_of_follows_the_path() {
        let mut definition = CollectionDefinition::new("Orders");
        definition.partition_key_path = Some("/customer/region".into());

        let document = doc! { "customer": { "region": "eu" } };
        assert_eq!(
            definition.partition_of(&document),
            Some(&Bson::String("eu".into()))
        );
        assert_eq!(
            definition.partition_field().as_deref(),
            Some("customer.region")
        );
    }

    #[test]
    fn partitioned_requests_need_a_key() {
        let collection = partitioned();

        assert!(matches!(
            collection.check_request_scope(&RequestOptions::default()),
            Err(Error::PartitionKeyMissing { .. })
        ));
        assert!(collection.check_request_scope(&scoped("Order")).is_ok());
    }

    #[test]
    fn unpartitioned_collections_reject_keys() {
        let collection = CollectionRef::new("app", CollectionDefinition::new("Order"));

        assert!(collection.check_request_scope(&RequestOptions::default()).is_ok());
        assert!(matches!(
            collection.check_request_scope(&scoped("Order")),
            Err(Error::PartitionKeyMismatch { .. })
        ));
    }

    #[test]
    fn documents_must_sit_in_the_scoped_partition() {
        let collection = partitioned();
        let document = doc! { "id": "1", "_DOCUMENT_TYPE": "Order" };

        assert!(
            collection
                .check_document_partition(&document, &scoped("Order"))
                .is_ok()
        );
        assert!(matches!(
            collection.check_document_partition(&document, &scoped("Customer")),
            Err(Error::PartitionKeyMismatch { .. })
        ));
    }

    #[test]
    fn cross_partition_queries_skip_the_key() {
        let collection = partitioned();
        let options = FeedOptions {
            enable_cross_partition_query: true,
            ..FeedOptions::default()
        };

        assert!(collection.check_feed_scope(&options).is_ok());
        assert!(collection.check_feed_scope(&FeedOptions::default()).is_err());
    }
}
