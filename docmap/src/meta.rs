use crate::{connection::Connection, errors::Result, projection::has_identifier};
use log::debug;

#[doc(hidden)]
pub struct EntityMetadataWrapper(pub EntityMetadata);

inventory::collect!(EntityMetadataWrapper);

/// Static description of an entity type, registered by `#[derive(Entity)]`.
#[derive(Debug)]
pub struct EntityMetadata {
    type_name: &'static str,
    field_names: &'static [&'static str],
}

impl EntityMetadata {
    #[doc(hidden)]
    pub const fn new(type_name: &'static str, field_names: &'static [&'static str]) -> Self {
        Self {
            type_name,
            field_names,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn field_names(&self) -> &'static [&'static str] {
        self.field_names
    }

    pub fn has_identifier(&self) -> bool {
        has_identifier(self.field_names)
    }
}

/// Every non-generic entity type linked into the binary.
pub fn entity_metadata() -> impl Iterator<Item = &'static EntityMetadata> {
    inventory::iter::<EntityMetadataWrapper>
        .into_iter()
        .map(|wrapper| &wrapper.0)
}

/// Creates the collections of every registered entity type that the store lacks.
pub async fn provision_collections(connection: &Connection) -> Result<()> {
    for metadata in entity_metadata() {
        let collection = connection.collection_for(metadata.type_name()).await?;
        debug!(
            "{} is stored in `{}`",
            metadata.type_name(),
            collection.id()
        );
    }

    Ok(())
}
