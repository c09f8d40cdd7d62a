use crate::{
    Entity,
    client::{DocumentClient, MongoClient},
    collection::{CollectionDefinition, CollectionRef},
    config::EntityContextConfiguration,
    context::EntityContext,
    errors::{Error, Result},
    strategy::CollectionStrategy,
};
use dashmap::DashMap;
use log::{debug, info};
use std::{fmt, sync::Arc};

/// A database reachable through a [`DocumentClient`], with the strategy deciding where
/// entities live.
///
/// Cloning is cheap; clones share the cache of resolved collections.
#[derive(Clone)]
pub struct Connection {
    database_id: Arc<str>,
    client: Arc<dyn DocumentClient>,
    strategy: Arc<dyn CollectionStrategy>,
    collections: Arc<DashMap<String, CollectionRef>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("database_id", &self.database_id)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(
        database_id: impl Into<String>,
        client: Arc<dyn DocumentClient>,
        strategy: Arc<dyn CollectionStrategy>,
    ) -> Self {
        let database_id: String = database_id.into();

        Self {
            database_id: database_id.into(),
            client,
            strategy,
            collections: Arc::default(),
        }
    }

    /// Connects to `MongoDB` as described by `config`.
    pub async fn open(config: &EntityContextConfiguration) -> Result<Self> {
        config.validate()?;

        let url = config.url.as_deref().ok_or(Error::MissingSetting("url"))?;
        let database_id = config
            .database_id
            .as_deref()
            .ok_or(Error::MissingSetting("databaseId"))?;

        let client = MongoClient::connect(url, config.authorization_key.as_deref()).await?;
        info!("opened database `{database_id}` with {:?}", config.strategy);

        Ok(Self::new(
            database_id,
            Arc::new(client),
            config.collection_strategy(),
        ))
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn client(&self) -> &dyn DocumentClient {
        self.client.as_ref()
    }

    pub fn strategy(&self) -> &dyn CollectionStrategy {
        self.strategy.as_ref()
    }

    /// Collection holding entities of `entity_type`, created on first use.
    ///
    /// The strategy configures a collection only when this connection creates it.
    pub async fn collection_for(&self, entity_type: &str) -> Result<CollectionRef> {
        let name = self.strategy.collection_name_for(entity_type);

        if let Some(collection) = self.collections.get(&name) {
            return Ok(collection.clone());
        }

        let definition = match self.client.read_collection(&self.database_id, &name).await? {
            Some(definition) => definition,
            None => self.create_collection(&name).await?,
        };

        let collection = CollectionRef::new(&*self.database_id, definition);
        self.collections.insert(name, collection.clone());

        Ok(collection)
    }

    async fn create_collection(&self, name: &str) -> Result<CollectionDefinition> {
        let mut definition = CollectionDefinition::new(name);
        self.strategy.configure_collection_for_creation(&mut definition);

        debug!(
            "creating collection `{name}` in `{}` (partition key {:?})",
            self.database_id, definition.partition_key_path
        );
        match self
            .client
            .create_collection(&self.database_id, &definition)
            .await
        {
            Ok(()) => Ok(definition),
            Err(Error::Conflict(_)) => self
                .client
                .read_collection(&self.database_id, name)
                .await?
                .ok_or_else(|| Error::CollectionNotFound(name.to_owned())),
            Err(error) => Err(error),
        }
    }

    pub async fn context<T: Entity>(&self) -> Result<EntityContext<T>> {
        EntityContext::new(self.clone()).await
    }
}
