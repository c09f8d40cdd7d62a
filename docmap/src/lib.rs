//! Docmap maps strongly-typed entities onto a document database.
//!
//! Entities are projected into generic documents through a field manifest, tagged with
//! their type name, and stored wherever a [`CollectionStrategy`] puts them. By default all
//! entity types share one `Entities` collection partitioned by type.
//!
//! ## Example
//!
//! ```no_run
//! use docmap::{Concept, Connection, Entity, EntityContextConfiguration, Fields};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Concept)]
//! struct Email(String);
//!
//! #[derive(Serialize, Deserialize, Fields)]
//! struct Address {
//!     city: String,
//!     zip: String,
//! }
//!
//! #[derive(Serialize, Deserialize, Entity)]
//! struct Customer {
//!     id: i64,
//!     email: Email,
//!     address: Address,
//! }
//!
//! # async fn run() -> docmap::Result<()> {
//! // Connect with settings from `DOCMAP_*` environment variables
//! let connection = Connection::open(&EntityContextConfiguration::from_env()?).await?;
//!
//! // One context per entity type
//! let customers = connection.context::<Customer>().await?;
//!
//! let mut customer = Customer {
//!     id: 1,
//!     email: Email("mail@example.com".into()),
//!     address: Address {
//!         city: "Oslo".into(),
//!         zip: "0150".into(),
//!     },
//! };
//! customers.insert(&customer).await?;
//!
//! // Updates replace the whole document
//! customer.address.city = "Bergen".into();
//! customers.update(&customer).await?;
//!
//! let _found: Option<Customer> = customers.get_by_id(&1).await?;
//!
//! customers.delete_by_id(&1).await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc
)]

extern crate self as docmap;

use serde::de::DeserializeOwned;

pub use docmap_macros::{Concept, Entity, Fields};
pub use client::{DocumentClient, MemoryClient, MongoClient};
pub use collection::{CollectionDefinition, CollectionRef, DocumentRef, FeedOptions, RequestOptions};
pub use config::EntityContextConfiguration;
pub use connection::Connection;
pub use context::EntityContext;
pub use errors::{Error, ErrorKind, Result};
pub use fields::{
    Concept, Field, FieldValue, Fields, ToFieldValue, concept_field_value, restore_composite,
};
pub use query::{Paging, Query, QueryResult};
pub use strategy::{
    CollectionPerEntity, CollectionStrategy, CollectionStrategyExt,
    MultipleEntitiesInOneCollection, StrategyKind,
};

#[doc(hidden)]
pub use inventory;
pub use mongodb;

pub mod client;
pub mod collection;
pub mod config;
pub mod connection;
pub mod context;
pub mod errors;
pub mod fields;
pub mod meta;
pub mod projection;
pub mod query;
pub mod strategy;

/// A type stored as a document.
///
/// Usually derived with `#[derive(Entity)]`, which also checks at compile time that the
/// type has an `id` field.
pub trait Entity: Fields + DeserializeOwned + Send + Sync + 'static {
    /// Type of the identifier field.
    type Id: ToFieldValue + DeserializeOwned;

    /// Discriminator stored with every document of this type.
    const TYPE_NAME: &'static str;

    /// Stored field names, after renames.
    const FIELD_NAMES: &'static [&'static str];
}
