use mongodb::bson;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad classification of an [`Error`], for callers that only care about the kind of
/// failure and not its details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced document or collection does not exist.
    NotFound,
    /// The store or the network failed.
    Transport,
    /// An entity type or the configuration is unusable.
    Configuration,
    /// The request asked for something the store or query layer can't do.
    Unsupported,
    /// A document with the same identifier already exists in the partition.
    Conflict,
    /// A request was not scoped to the right partition.
    Partition,
    /// A value could not be converted to or from a document.
    Mapping,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("entity type `{entity_type}` has no `id` field")]
    MissingIdentifier { entity_type: &'static str },

    #[error("identifier of `{entity_type}` can't be used as a document id: {reason}")]
    InvalidIdentifier {
        entity_type: &'static str,
        reason: String,
    },

    #[error("configuration setting `{0}` is missing")]
    MissingSetting(&'static str),

    #[error("configuration setting `{name}` is invalid: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("entity `{entity_type}` nests deeper than {max_depth} levels")]
    NestingTooDeep {
        entity_type: &'static str,
        max_depth: usize,
    },

    #[error("request against partitioned collection `{collection}` carries no partition key")]
    PartitionKeyMissing { collection: String },

    #[error(
        "partition key {provided:?} does not match {expected:?} in collection `{collection}`"
    )]
    PartitionKeyMismatch {
        collection: String,
        expected: Option<String>,
        provided: Option<String>,
    },

    #[error("document `{0}` already exists")]
    Conflict(String),

    #[error("document `{0}` not found")]
    DocumentNotFound(String),

    #[error("collection `{0}` not found")]
    CollectionNotFound(String),

    #[error("{0} is not supported")]
    Unsupported(&'static str),

    #[error(transparent)]
    Transport(#[from] mongodb::error::Error),

    #[error(transparent)]
    Serialization(#[from] bson::ser::Error),

    #[error(transparent)]
    Deserialization(#[from] bson::de::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DocumentNotFound(_) | Self::CollectionNotFound(_) => ErrorKind::NotFound,
            Self::Transport(_) => ErrorKind::Transport,
            Self::MissingIdentifier { .. }
            | Self::MissingSetting(_)
            | Self::InvalidSetting { .. } => ErrorKind::Configuration,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::PartitionKeyMissing { .. } | Self::PartitionKeyMismatch { .. } => {
                ErrorKind::Partition
            }
            Self::InvalidIdentifier { .. }
            | Self::NestingTooDeep { .. }
            | Self::Serialization(_)
            | Self::Deserialization(_) => ErrorKind::Mapping,
        }
    }
}
