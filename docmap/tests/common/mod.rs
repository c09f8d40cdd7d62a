#![allow(dead_code)]

use docmap::{
    CollectionDefinition, CollectionRef, CollectionStrategy, Concept, Connection, DocumentClient,
    DocumentRef, Entity, FeedOptions, Fields, MemoryClient, Query, RequestOptions,
    mongodb::bson::Document,
};
use futures_util::{future::BoxFuture, stream::BoxStream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DATABASE: &str = "app";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn connect(strategy: Arc<dyn CollectionStrategy>) -> (Arc<MemoryClient>, Connection) {
    init_logger();

    let client = Arc::new(MemoryClient::new());
    let connection = Connection::new(DATABASE, client.clone(), strategy);

    (client, connection)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Concept)]
pub struct Sku(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Fields)]
pub struct Line {
    pub id: String,
    pub sku: Sku,
    pub quantity: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub lines: Vec<Line>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
pub struct Customer {
    pub id: String,
    pub name: String,
}

pub fn order(id: &str) -> Order {
    Order {
        id: id.into(),
        customer_id: "c1".into(),
        lines: vec![Line {
            id: "l1".into(),
            sku: Sku("ABC".into()),
            quantity: 2,
        }],
    }
}

pub fn customer(id: &str, name: &str) -> Customer {
    Customer {
        id: id.into(),
        name: name.into(),
    }
}

/// Store that can't skip results.
pub struct Unpaged(pub MemoryClient);

impl DocumentClient for Unpaged {
    fn read_collection<'a>(
        &'a self,
        database_id: &'a str,
        collection_id: &'a str,
    ) -> BoxFuture<'a, docmap::Result<Option<CollectionDefinition>>> {
        self.0.read_collection(database_id, collection_id)
    }

    fn create_collection<'a>(
        &'a self,
        database_id: &'a str,
        definition: &'a CollectionDefinition,
    ) -> BoxFuture<'a, docmap::Result<()>> {
        self.0.create_collection(database_id, definition)
    }

    fn create_document<'a>(
        &'a self,
        collection: &'a CollectionRef,
        document: Document,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, docmap::Result<()>> {
        self.0.create_document(collection, document, options)
    }

    fn query_documents<'a>(
        &'a self,
        collection: &'a CollectionRef,
        query: Query,
        options: FeedOptions,
    ) -> BoxStream<'a, docmap::Result<Document>> {
        self.0.query_documents(collection, query, options)
    }

    fn count_documents<'a>(
        &'a self,
        collection: &'a CollectionRef,
        query: Query,
        options: FeedOptions,
    ) -> BoxFuture<'a, docmap::Result<u64>> {
        self.0.count_documents(collection, query, options)
    }

    fn replace_document<'a>(
        &'a self,
        document_ref: &'a DocumentRef,
        document: Document,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, docmap::Result<()>> {
        self.0.replace_document(document_ref, document, options)
    }

    fn delete_document<'a>(
        &'a self,
        document_ref: &'a DocumentRef,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, docmap::Result<()>> {
        self.0.delete_document(document_ref, options)
    }
}
