use super::DocumentClient;
use crate::{
    collection::{CollectionDefinition, CollectionRef, DocumentRef, FeedOptions, RequestOptions},
    errors::{Error, Result},
    projection::ID_FIELD,
    query::Query,
};
use dashmap::{DashMap, mapref::entry::Entry};
use futures_util::{
    FutureExt, StreamExt, TryStreamExt,
    future::BoxFuture,
    stream::{self, BoxStream},
};
use log::trace;
use mongodb::bson::{Bson, Document, oid::ObjectId};

/// A document store held in process memory.
///
/// Behaves like a partitioned store: requests against partitioned collections must be
/// scoped, and identifiers are unique per partition.
#[derive(Debug, Default)]
pub struct MemoryClient {
    collections: DashMap<(String, String), MemoryCollection>,
}

#[derive(Debug)]
struct MemoryCollection {
    definition: CollectionDefinition,
    documents: Vec<Document>,
}

impl MemoryCollection {
    fn position(&self, id: &str, partition_key: Option<&str>) -> Option<usize> {
        self.documents.iter().position(|document| {
            document.get_str(ID_FIELD).is_ok_and(|value| value == id)
                && self.in_partition(document, partition_key)
        })
    }

    fn in_partition(&self, document: &Document, partition_key: Option<&str>) -> bool {
        match partition_key {
            Some(key) => matches!(
                self.definition.partition_of(document),
                Some(Bson::String(value)) if value == key
            ),
            None => true,
        }
    }

    fn matching(&self, query: &Query, options: &FeedOptions) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|document| self.in_partition(document, options.partition_key.as_deref()))
            .filter(|document| query.matches(document))
            .cloned()
            .collect()
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every document in a collection, in insertion order.
    pub fn documents(&self, database_id: &str, collection_id: &str) -> Vec<Document> {
        self.collections
            .get(&(database_id.to_owned(), collection_id.to_owned()))
            .map(|collection| collection.documents.clone())
            .unwrap_or_default()
    }

    fn with_collection<R>(
        &self,
        collection: &CollectionRef,
        fun: impl FnOnce(&mut MemoryCollection) -> Result<R>,
    ) -> Result<R> {
        let key = (collection.database_id.clone(), collection.id().to_owned());
        let mut entry = self
            .collections
            .get_mut(&key)
            .ok_or_else(|| Error::CollectionNotFound(collection.id().to_owned()))?;

        fun(&mut entry)
    }

    fn run_query(
        &self,
        collection: &CollectionRef,
        query: &Query,
        options: &FeedOptions,
    ) -> Result<Vec<Document>> {
        collection.check_feed_scope(options)?;

        self.with_collection(collection, |stored| {
            let documents = stored.matching(query, options);
            let skip = options
                .skip
                .map_or(0, |skip| usize::try_from(skip).unwrap_or(usize::MAX));
            let take = options
                .max_item_count
                .map_or(usize::MAX, |count| count as usize);

            Ok(documents.into_iter().skip(skip).take(take).collect())
        })
    }
}

impl DocumentClient for MemoryClient {
    fn read_collection<'a>(
        &'a self,
        database_id: &'a str,
        collection_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<CollectionDefinition>>> {
        async move {
            let definition = self
                .collections
                .get(&(database_id.to_owned(), collection_id.to_owned()))
                .map(|collection| collection.definition.clone());

            Ok(definition)
        }
        .boxed()
    }

    fn create_collection<'a>(
        &'a self,
        database_id: &'a str,
        definition: &'a CollectionDefinition,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let key = (database_id.to_owned(), definition.id.clone());

            match self.collections.entry(key) {
                Entry::Occupied(_) => Err(Error::Conflict(format!(
                    "dbs/{database_id}/colls/{}",
                    definition.id
                ))),
                Entry::Vacant(entry) => {
                    entry.insert(MemoryCollection {
                        definition: definition.clone(),
                        documents: Vec::new(),
                    });
                    Ok(())
                }
            }
        }
        .boxed()
    }

    fn create_document<'a>(
        &'a self,
        collection: &'a CollectionRef,
        mut document: Document,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            collection.check_document_partition(&document, options)?;

            if !document.contains_key(ID_FIELD) {
                document.insert(ID_FIELD, ObjectId::new().to_hex());
            }
            let id = document.get_str(ID_FIELD).map(ToOwned::to_owned).map_err(|_| {
                Error::InvalidIdentifier {
                    entity_type: "document",
                    reason: "`id` must be a string".into(),
                }
            })?;

            self.with_collection(collection, |stored| {
                if stored
                    .position(&id, options.partition_key.as_deref())
                    .is_some()
                {
                    return Err(Error::Conflict(collection.document(id.as_str()).to_string()));
                }

                trace!("creating {}", collection.document(id.as_str()));
                stored.documents.push(document);
                Ok(())
            })
        }
        .boxed()
    }

    fn query_documents<'a>(
        &'a self,
        collection: &'a CollectionRef,
        query: Query,
        options: FeedOptions,
    ) -> BoxStream<'a, Result<Document>> {
        stream::once(async move { self.run_query(collection, &query, &options) })
            .map_ok(|documents| stream::iter(documents.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }

    fn count_documents<'a>(
        &'a self,
        collection: &'a CollectionRef,
        query: Query,
        options: FeedOptions,
    ) -> BoxFuture<'a, Result<u64>> {
        async move {
            let options = FeedOptions {
                max_item_count: None,
                skip: None,
                ..options
            };
            let documents = self.run_query(collection, &query, &options)?;

            Ok(documents.len() as u64)
        }
        .boxed()
    }

    fn replace_document<'a>(
        &'a self,
        document_ref: &'a DocumentRef,
        mut document: Document,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let collection = &document_ref.collection;
            collection.check_document_partition(&document, options)?;
            document.insert(ID_FIELD, document_ref.id.as_str());

            self.with_collection(collection, |stored| {
                let position = stored
                    .position(&document_ref.id, options.partition_key.as_deref())
                    .ok_or_else(|| Error::DocumentNotFound(document_ref.to_string()))?;

                trace!("replacing {document_ref}");
                stored.documents[position] = document;
                Ok(())
            })
        }
        .boxed()
    }

    fn delete_document<'a>(
        &'a self,
        document_ref: &'a DocumentRef,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let collection = &document_ref.collection;
            collection.check_request_scope(options)?;

            self.with_collection(collection, |stored| {
                let position = stored
                    .position(&document_ref.id, options.partition_key.as_deref())
                    .ok_or_else(|| Error::DocumentNotFound(document_ref.to_string()))?;

                trace!("deleting {document_ref}");
                stored.documents.remove(position);
                Ok(())
            })
        }
        .boxed()
    }

    fn supports_paging(&self) -> bool {
        true
    }
}
