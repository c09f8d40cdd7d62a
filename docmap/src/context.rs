//! Typed access to the entities of one type.

use crate::{
    Entity,
    collection::CollectionRef,
    connection::Connection,
    errors::{Error, Result},
    fields::ToFieldValue,
    projection::{ID_FIELD, has_identifier, identifier_from, identifier_of, project, restore},
    query::{Paging, Query, QueryResult},
    strategy::CollectionStrategyExt,
};
use futures_util::{StreamExt, TryStreamExt, stream::BoxStream};
use log::{debug, trace};
use mongodb::bson::Document;
use std::{fmt, marker::PhantomData};

/// CRUD over entities of type `T`, stored wherever the connection's strategy puts them.
///
/// Every operation is a single round trip to the store and resolves once the store has
/// answered.
pub struct EntityContext<T: Entity> {
    connection: Connection,
    collection: CollectionRef,
    entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntityContext<T> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            collection: self.collection.clone(),
            entity: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for EntityContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityContext")
            .field("entity_type", &T::TYPE_NAME)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<T: Entity> EntityContext<T> {
    /// Resolves the collection of `T`, creating it when the store lacks it.
    ///
    /// Fails with [`Error::MissingIdentifier`] when `T` has no `id` field.
    pub async fn new(connection: Connection) -> Result<Self> {
        if !has_identifier(T::FIELD_NAMES) {
            return Err(Error::MissingIdentifier {
                entity_type: T::TYPE_NAME,
            });
        }

        let collection = connection.collection_for(T::TYPE_NAME).await?;

        Ok(Self {
            connection,
            collection,
            entity: PhantomData,
        })
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    /// Every stored entity of type `T`.
    ///
    /// The query runs when the stream is first polled, and again for every call.
    pub fn entities(&self) -> BoxStream<'_, Result<T>> {
        let strategy = self.connection.strategy();
        let options = strategy.feed_options_for::<T>();
        let query = strategy.query_for::<T>(Query::all());

        self.connection
            .client()
            .query_documents(&self.collection, query, options)
            .map(|document| document.and_then(restore::<T>))
            .boxed()
    }

    pub async fn insert(&self, entity: &T) -> Result<()> {
        let strategy = self.connection.strategy();

        let mut document = project(entity)?;
        strategy.document_for::<T>(&mut document);
        let options = strategy.request_options_for::<T>();

        debug!("inserting {} into `{}`", T::TYPE_NAME, self.collection.id());
        self.connection
            .client()
            .create_document(&self.collection, document, &options)
            .await
    }

    /// Replaces the stored document of `entity`.
    ///
    /// Nothing is written when no document with the entity's identifier exists.
    pub async fn update(&self, entity: &T) -> Result<()> {
        let id = identifier_of(entity)?;

        let Some(mut existing) = self.find_document(&id).await? else {
            debug!("{} `{id}` does not exist, skipping update", T::TYPE_NAME);
            return Ok(());
        };

        let strategy = self.connection.strategy();
        let mut document = project(entity)?;
        strategy.document_for::<T>(&mut document);
        document.remove(ID_FIELD);
        for (key, value) in document {
            existing.insert(key, value);
        }

        let stored_id = existing
            .get_str(ID_FIELD)
            .map_or_else(|_| id.clone(), ToOwned::to_owned);
        let options = strategy.request_options_for::<T>();

        debug!("updating {} `{stored_id}`", T::TYPE_NAME);
        self.connection
            .client()
            .replace_document(&self.collection.document(stored_id), existing, &options)
            .await
    }

    /// Same as [`update`](Self::update): entities that were never inserted stay absent.
    pub async fn save(&self, entity: &T) -> Result<()> {
        self.update(entity).await
    }

    pub async fn delete(&self, entity: &T) -> Result<()> {
        let id = identifier_of(entity)?;
        self.delete_document(id).await
    }

    /// Deletes the entity stored under `id`, given as `T::Id` or anything stringifying the
    /// same way, e.g. a `&str` for a `String` identifier.
    pub async fn delete_by_id<I: ToFieldValue + ?Sized>(&self, id: &I) -> Result<()> {
        let id = identifier_from::<T, _>(id)?;
        self.delete_document(id).await
    }

    /// The entity stored under `id`, if any.
    pub async fn get_by_id<I: ToFieldValue + ?Sized>(&self, id: &I) -> Result<Option<T>> {
        let id = identifier_from::<T, _>(id)?;

        self.find_document(&id).await?.map(restore::<T>).transpose()
    }

    /// Runs the query of [`entities`](Self::entities) to completion, one page at a time
    /// when `paging` is given.
    pub async fn execute(&self, paging: Option<Paging>) -> Result<QueryResult<T>> {
        let client = self.connection.client();
        let strategy = self.connection.strategy();
        let query = strategy.query_for::<T>(Query::all());

        if paging.is_some() && !client.supports_paging() {
            return Err(Error::Unsupported("paging"));
        }

        let mut options = strategy.feed_options_for::<T>();
        let total_items = client
            .count_documents(&self.collection, query.clone(), options.clone())
            .await?;

        if let Some(paging) = paging {
            options.max_item_count = Some(paging.size);
            options.skip = Some(paging.offset());
        }

        let items = client
            .query_documents(&self.collection, query, options)
            .map(|document| document.and_then(restore::<T>))
            .try_collect()
            .await?;

        Ok(QueryResult { total_items, items })
    }

    /// Changes are written by each operation as it runs; attaching does nothing.
    pub fn attach(&self, _entity: &T) {
        trace!("attach {} (no-op)", T::TYPE_NAME);
    }

    /// Changes are written by each operation as it runs; committing does nothing.
    pub fn commit(&self) {
        trace!("commit {} (no-op)", T::TYPE_NAME);
    }

    async fn delete_document(&self, id: String) -> Result<()> {
        let options = self.connection.strategy().request_options_for::<T>();

        debug!("deleting {} `{id}`", T::TYPE_NAME);
        self.connection
            .client()
            .delete_document(&self.collection.document(id), &options)
            .await
    }

    async fn find_document(&self, id: &str) -> Result<Option<Document>> {
        let query = Query::point(id, T::TYPE_NAME);
        let mut options = self.connection.strategy().feed_options_for::<T>();
        options.max_item_count = Some(1);

        trace!("{}", query.to_sql(self.collection.id()));
        let mut documents = self
            .connection
            .client()
            .query_documents(&self.collection, query, options);

        documents.try_next().await
    }
}
