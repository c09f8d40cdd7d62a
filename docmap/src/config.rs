use crate::{
    errors::{Error, Result},
    strategy::{CollectionStrategy, StrategyKind},
};
use serde::{Deserialize, Serialize};
use std::{env, fmt, sync::Arc};

pub const URL_VAR: &str = "DOCMAP_URL";
pub const DATABASE_ID_VAR: &str = "DOCMAP_DATABASE_ID";
pub const AUTHORIZATION_KEY_VAR: &str = "DOCMAP_AUTHORIZATION_KEY";
pub const STRATEGY_VAR: &str = "DOCMAP_STRATEGY";

/// Settings needed to open a [`Connection`](crate::Connection).
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityContextConfiguration {
    /// Connection string of the store.
    pub url: Option<String>,
    pub database_id: Option<String>,
    pub authorization_key: Option<String>,
    #[serde(default)]
    pub strategy: StrategyKind,
}

impl fmt::Debug for EntityContextConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityContextConfiguration")
            .field("url", &self.url)
            .field("database_id", &self.database_id)
            .field(
                "authorization_key",
                &self.authorization_key.as_ref().map(|_| "<redacted>"),
            )
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl EntityContextConfiguration {
    pub fn new(url: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            database_id: Some(database_id.into()),
            ..Self::default()
        }
    }

    pub fn with_authorization_key(mut self, key: impl Into<String>) -> Self {
        self.authorization_key = Some(key.into());
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Reads the configuration from `DOCMAP_*` environment variables, loading a `.env`
    /// file first when one exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let strategy = match lookup(STRATEGY_VAR) {
            Some(value) => parse_strategy(&value)?,
            None => StrategyKind::default(),
        };

        Ok(Self {
            url: lookup(URL_VAR),
            database_id: lookup(DATABASE_ID_VAR),
            authorization_key: lookup(AUTHORIZATION_KEY_VAR),
            strategy,
        })
    }

    /// Checks that every required setting is present. Values are not interpreted.
    pub fn validate(&self) -> Result<()> {
        if self.url.as_deref().is_none_or(str::is_empty) {
            return Err(Error::MissingSetting("url"));
        }
        if self.database_id.as_deref().is_none_or(str::is_empty) {
            return Err(Error::MissingSetting("databaseId"));
        }

        Ok(())
    }

    pub fn collection_strategy(&self) -> Arc<dyn CollectionStrategy> {
        self.strategy.build()
    }
}

fn parse_strategy(value: &str) -> Result<StrategyKind> {
    match value {
        "multipleEntitiesInOneCollection" | "MultipleEntitiesInOneCollection" => {
            Ok(StrategyKind::MultipleEntitiesInOneCollection)
        }
        "collectionPerEntity" | "CollectionPerEntity" => Ok(StrategyKind::CollectionPerEntity),
        other => Err(Error::InvalidSetting {
            name: STRATEGY_VAR,
            reason: format!("unknown strategy `{other}`"),
        }),
    }
}
