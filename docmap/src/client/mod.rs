//! The document store as seen by entity contexts.
//!
//! [`DocumentClient`] is deliberately narrow: collection provisioning, point writes and
//! scoped queries. Every call performs one round trip and resolves once the store has
//! answered.

use crate::{
    collection::{CollectionDefinition, CollectionRef, DocumentRef, FeedOptions, RequestOptions},
    errors::Result,
    query::Query,
};
use futures_util::{future::BoxFuture, stream::BoxStream};
use mongodb::bson::Document;

mod memory;
mod mongo;

pub use memory::MemoryClient;
pub use mongo::MongoClient;

pub trait DocumentClient: Send + Sync {
    /// Looks a collection up, `None` when the database has no such collection.
    fn read_collection<'a>(
        &'a self,
        database_id: &'a str,
        collection_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<CollectionDefinition>>>;

    fn create_collection<'a>(
        &'a self,
        database_id: &'a str,
        definition: &'a CollectionDefinition,
    ) -> BoxFuture<'a, Result<()>>;

    fn create_document<'a>(
        &'a self,
        collection: &'a CollectionRef,
        document: Document,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<()>>;

    /// Lazily runs a query; nothing is sent until the stream is first polled.
    fn query_documents<'a>(
        &'a self,
        collection: &'a CollectionRef,
        query: Query,
        options: FeedOptions,
    ) -> BoxStream<'a, Result<Document>>;

    /// Number of documents matching a query, ignoring `max_item_count` and `skip`.
    fn count_documents<'a>(
        &'a self,
        collection: &'a CollectionRef,
        query: Query,
        options: FeedOptions,
    ) -> BoxFuture<'a, Result<u64>>;

    fn replace_document<'a>(
        &'a self,
        document_ref: &'a DocumentRef,
        document: Document,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<()>>;

    fn delete_document<'a>(
        &'a self,
        document_ref: &'a DocumentRef,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<()>>;

    /// Whether queries honour `FeedOptions::skip`.
    fn supports_paging(&self) -> bool {
        false
    }
}
