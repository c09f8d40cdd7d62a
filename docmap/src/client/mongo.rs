use super::DocumentClient;
use crate::{
    collection::{CollectionDefinition, CollectionRef, DocumentRef, FeedOptions, RequestOptions},
    errors::{Error, Result},
    projection::ID_FIELD,
    query::Query,
};
use futures_util::{
    FutureExt, StreamExt, TryStreamExt,
    future::BoxFuture,
    stream::{self, BoxStream},
};
use log::{debug, trace};
use mongodb::{
    Client, Collection, IndexModel,
    bson::{Document, doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
};

/// Collection recording the definitions of provisioned collections.
const METADATA_COLLECTION: &str = "_docmap_collections";

const DUPLICATE_KEY: i32 = 11000;

const NAMESPACE_EXISTS: i32 = 48;

/// [`DocumentClient`] backed by `MongoDB`.
///
/// Partition keys become an extra filter condition on the partition field, and a unique
/// index on the partition field and `id` keeps identifiers unique per partition.
#[derive(Clone, Debug)]
pub struct MongoClient {
    client: Client,
}

impl MongoClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects to `url`, using `authorization_key` as the password when given.
    pub async fn connect(url: &str, authorization_key: Option<&str>) -> Result<Self> {
        let mut options = ClientOptions::parse(url).await?;

        if let Some(key) = authorization_key {
            let mut credential = options.credential.take().unwrap_or_default();
            credential.password = Some(key.to_owned());
            options.credential = Some(credential);
        }

        debug!("connecting to {url}");
        Ok(Self::new(Client::with_options(options)?))
    }

    fn collection(&self, collection: &CollectionRef) -> Collection<Document> {
        self.client
            .database(&collection.database_id)
            .collection(collection.id())
    }

    fn metadata(&self, database_id: &str) -> Collection<CollectionDefinition> {
        self.client
            .database(database_id)
            .collection(METADATA_COLLECTION)
    }
}

fn scoped_filter(collection: &CollectionRef, query: &Query, partition_key: Option<&str>) -> Document {
    let mut filter = query.to_document();

    if let (Some(field), Some(key)) = (collection.definition.partition_field(), partition_key) {
        filter.insert(field, key);
    }

    filter
}

fn without_object_id(mut document: Document) -> Document {
    document.remove("_id");
    document
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

/// Another process created the collection between our check and our create.
fn is_namespace_exists(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Command(command_error) if command_error.code == NAMESPACE_EXISTS
    )
}

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

impl DocumentClient for MongoClient {
    fn read_collection<'a>(
        &'a self,
        database_id: &'a str,
        collection_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<CollectionDefinition>>> {
        async move {
            let definition = self
                .metadata(database_id)
                .find_one(doc! { "id": collection_id })
                .await?;

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
            let database = self.client.database(database_id);

            match database.create_collection(&definition.id).await {
                Ok(()) => {}
                Err(error) if is_namespace_exists(&error) => {
                    debug!("collection `{}` already exists", definition.id);
                }
                Err(error) => return Err(error.into()),
            }

            let mut keys = Document::new();
            if let Some(field) = definition.partition_field() {
                keys.insert(field, 1);
            }
            keys.insert(ID_FIELD, 1);

            database
                .collection::<Document>(&definition.id)
                .create_index(unique_index(keys))
                .await?;

            let metadata = self.metadata(database_id);
            metadata.create_index(unique_index(doc! { "id": 1 })).await?;
            match metadata.insert_one(definition).await {
                Ok(_) => Ok(()),
                Err(error) if is_duplicate_key(&error) => {
                    Err(Error::Conflict(format!("{database_id}/colls/{}", definition.id)))
                }
                Err(error) => Err(error.into()),
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
            let id = document.get_str(ID_FIELD).unwrap_or_default().to_owned();

            trace!("creating {}", collection.document(id.as_str()));
            match self.collection(collection).insert_one(document).await {
                Ok(_) => Ok(()),
                Err(error) if is_duplicate_key(&error) => {
                    Err(Error::Conflict(collection.document(id).to_string()))
                }
                Err(error) => Err(error.into()),
            }
        }
        .boxed()
    }

    fn query_documents<'a>(
        &'a self,
        collection: &'a CollectionRef,
        query: Query,
        options: FeedOptions,
    ) -> BoxStream<'a, Result<Document>> {
        stream::once(async move {
            collection.check_feed_scope(&options)?;

            let filter = scoped_filter(collection, &query, options.partition_key.as_deref());
            let handle = self.collection(collection);
            let mut find = handle.find(filter);
            if let Some(limit) = options.max_item_count {
                find = find.limit(i64::from(limit));
            }
            if let Some(skip) = options.skip {
                find = find.skip(skip);
            }

            let cursor = find.await?;
            Ok::<_, Error>(cursor.map_err(Error::from).map_ok(without_object_id))
        })
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
            collection.check_feed_scope(&options)?;

            let filter = scoped_filter(collection, &query, options.partition_key.as_deref());
            let count = self.collection(collection).count_documents(filter).await?;

            Ok(count)
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

            let filter = scoped_filter(
                collection,
                &Query::all().and_eq(ID_FIELD, document_ref.id.as_str()),
                options.partition_key.as_deref(),
            );

            trace!("replacing {document_ref}");
            let result = self
                .collection(collection)
                .replace_one(filter, document)
                .await?;

            if result.matched_count == 0 {
                return Err(Error::DocumentNotFound(document_ref.to_string()));
            }

            Ok(())
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

            let filter = scoped_filter(
                collection,
                &Query::all().and_eq(ID_FIELD, document_ref.id.as_str()),
                options.partition_key.as_deref(),
            );

            trace!("deleting {document_ref}");
            let result = self.collection(collection).delete_one(filter).await?;

            if result.deleted_count == 0 {
                return Err(Error::DocumentNotFound(document_ref.to_string()));
            }

            Ok(())
        }
        .boxed()
    }

    fn supports_paging(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionDefinition;

    #[test]
    fn partition_key_becomes_a_filter_condition() {
        let collection = CollectionRef::new(
            "app",
            CollectionDefinition {
                id: "Entities".into(),
                partition_key_path: Some("/_DOCUMENT_TYPE".into()),
            },
        );

        let filter = scoped_filter(&collection, &Query::all().and_eq("id", "1"), Some("Order"));
        assert_eq!(filter, doc! { "id": "1", "_DOCUMENT_TYPE": "Order" });

        let filter = scoped_filter(&collection, &Query::all(), None);
        assert_eq!(filter, doc! {});
    }

    fn command_error(code: i32) -> mongodb::error::Error {
        let command_error = mongodb::bson::from_document(doc! {
            "code": code,
            "codeName": "NamespaceExists",
            "errmsg": "collection already exists",
        })
        .unwrap();
        ErrorKind::Command(command_error).into()
    }

    fn write_error(code: i32) -> mongodb::error::Error {
        let write_error = mongodb::bson::from_document(doc! {
            "code": code,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error",
        })
        .unwrap();
        ErrorKind::Write(WriteFailure::WriteError(write_error)).into()
    }

    #[test]
    fn racing_creates_are_recognized() {
        assert!(is_namespace_exists(&command_error(NAMESPACE_EXISTS)));
        assert!(!is_namespace_exists(&command_error(13)));
        assert!(!is_namespace_exists(&write_error(DUPLICATE_KEY)));

        assert!(is_duplicate_key(&write_error(DUPLICATE_KEY)));
        assert!(!is_duplicate_key(&write_error(121)));
        assert!(!is_duplicate_key(&command_error(NAMESPACE_EXISTS)));
    }

    #[test]
    fn indexes_are_unique() {
        let index = unique_index(doc! { "id": 1 });
        assert_eq!(index.keys, doc! { "id": 1 });
        assert_eq!(index.options.and_then(|options| options.unique), Some(true));
    }

    #[test]
    fn object_ids_are_stripped() {
        let document = doc! { "_id": ObjectId::new(), "id": "1" };
        assert_eq!(without_object_id(document), doc! { "id": "1" });
    }
}
