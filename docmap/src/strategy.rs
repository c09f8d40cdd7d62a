//! How entity types map onto physical collections.

use crate::{
    Entity,
    collection::{CollectionDefinition, FeedOptions, RequestOptions},
    projection::DOCUMENT_TYPE_FIELD,
    query::Query,
};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};

/// Decides which collection an entity type lives in and how requests for it are scoped.
///
/// Every method receives the entity's type name. [`CollectionStrategyExt`] offers the same
/// operations keyed by the entity type itself.
pub trait CollectionStrategy: Debug + Send + Sync {
    /// Name of the collection holding entities of the given type. Must be stable.
    fn collection_name_for(&self, entity_type: &str) -> String;

    /// Scopes the options of a query.
    fn handle_feed_options_for(&self, entity_type: &str, options: &mut FeedOptions);

    /// Scopes the options of a create, replace or delete request.
    fn handle_request_options_for(&self, entity_type: &str, options: &mut RequestOptions);

    /// Narrows a query to documents of the given type.
    fn handle_query_for(&self, entity_type: &str, query: Query) -> Query;

    /// Tags a freshly projected document.
    fn handle_document_for(&self, entity_type: &str, document: &mut Document);

    /// Called once, while the collection is being created.
    fn configure_collection_for_creation(&self, collection: &mut CollectionDefinition);
}

pub trait CollectionStrategyExt: CollectionStrategy {
    fn collection_name_of<E: Entity>(&self) -> String {
        self.collection_name_for(E::TYPE_NAME)
    }

    fn feed_options_for<E: Entity>(&self) -> FeedOptions {
        let mut options = FeedOptions::default();
        self.handle_feed_options_for(E::TYPE_NAME, &mut options);
        options
    }

    fn request_options_for<E: Entity>(&self) -> RequestOptions {
        let mut options = RequestOptions::default();
        self.handle_request_options_for(E::TYPE_NAME, &mut options);
        options
    }

    fn query_for<E: Entity>(&self, query: Query) -> Query {
        self.handle_query_for(E::TYPE_NAME, query)
    }

    fn document_for<E: Entity>(&self, document: &mut Document) {
        self.handle_document_for(E::TYPE_NAME, document);
    }
}

impl<S: CollectionStrategy + ?Sized> CollectionStrategyExt for S {}

/// All entity types share one collection called `Entities`, partitioned by the
/// discriminator.
#[derive(Clone, Copy, Debug, Default)]
pub struct MultipleEntitiesInOneCollection;

impl MultipleEntitiesInOneCollection {
    pub const COLLECTION_NAME: &'static str = "Entities";
}

impl CollectionStrategy for MultipleEntitiesInOneCollection {
    fn collection_name_for(&self, _entity_type: &str) -> String {
        Self::COLLECTION_NAME.to_owned()
    }

    fn handle_feed_options_for(&self, entity_type: &str, options: &mut FeedOptions) {
        options.partition_key = Some(entity_type.to_owned());
    }

    fn handle_request_options_for(&self, entity_type: &str, options: &mut RequestOptions) {
        options.partition_key = Some(entity_type.to_owned());
    }

    fn handle_query_for(&self, entity_type: &str, query: Query) -> Query {
        query.and_eq(DOCUMENT_TYPE_FIELD, entity_type)
    }

    fn handle_document_for(&self, entity_type: &str, document: &mut Document) {
        document.insert(DOCUMENT_TYPE_FIELD, entity_type);
    }

    fn configure_collection_for_creation(&self, collection: &mut CollectionDefinition) {
        collection.partition_key_path = Some(format!("/{DOCUMENT_TYPE_FIELD}"));
    }
}

/// Every entity type gets a collection of its own, named after the type.
#[derive(Clone, Copy, Debug, Default)]
pub struct CollectionPerEntity;

impl CollectionStrategy for CollectionPerEntity {
    fn collection_name_for(&self, entity_type: &str) -> String {
        entity_type.to_owned()
    }

    fn handle_feed_options_for(&self, _entity_type: &str, _options: &mut FeedOptions) {}

    fn handle_request_options_for(&self, _entity_type: &str, _options: &mut RequestOptions) {}

    fn handle_query_for(&self, entity_type: &str, query: Query) -> Query {
        query.and_eq(DOCUMENT_TYPE_FIELD, entity_type)
    }

    fn handle_document_for(&self, entity_type: &str, document: &mut Document) {
        document.insert(DOCUMENT_TYPE_FIELD, entity_type);
    }

    fn configure_collection_for_creation(&self, _collection: &mut CollectionDefinition) {}
}

/// Strategy selector used by configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    #[default]
    MultipleEntitiesInOneCollection,
    CollectionPerEntity,
}

impl StrategyKind {
    pub fn build(self) -> Arc<dyn CollectionStrategy> {
        match self {
            Self::MultipleEntitiesInOneCollection => Arc::new(MultipleEntitiesInOneCollection),
            Self::CollectionPerEntity => Arc::new(CollectionPerEntity),
        }
    }
}
