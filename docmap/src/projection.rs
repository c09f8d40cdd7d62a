//! Projection of entities into generic documents.
//!
//! An entity is walked field by field through its [`Fields`] manifest. Concepts are
//! unwrapped, sequences become arrays, composites become sub-documents. The identifier is
//! stringified into `"id"` at the top level and into `"Id"` inside nested documents, and the
//! finished document is tagged with the entity's type name under [`DOCUMENT_TYPE_FIELD`].
//!
//! The reverse direction is serde's: [`restore`] undoes the two renames above, reading the
//! stored identifier strings back as the identifier types, before handing the document to
//! [`bson::from_document`].

use crate::{
    Entity,
    errors::{Error, Result},
    fields::{FieldValue, Fields, ToFieldValue, is_identifier},
};
use mongodb::bson::{self, Bson, Document};
use serde::de::DeserializeOwned;

/// Identifier slot of a top-level document.
pub const ID_FIELD: &str = "id";

/// Identifier key inside nested documents.
pub const NESTED_ID_FIELD: &str = "Id";

/// Discriminator recording the entity type a document was projected from.
pub const DOCUMENT_TYPE_FIELD: &str = "_DOCUMENT_TYPE";

/// Deepest nesting a projection accepts.
pub const MAX_DEPTH: usize = 64;

pub fn project<E: Entity>(entity: &E) -> Result<Document> {
    let mut document = Document::new();
    Projector::new(E::TYPE_NAME).populate(&mut document, entity, 0)?;
    document.insert(DOCUMENT_TYPE_FIELD, E::TYPE_NAME);

    Ok(document)
}

/// Stringified identifier of an entity.
pub fn identifier_of<E: Entity>(entity: &E) -> Result<String> {
    let field = entity
        .fields()
        .into_iter()
        .find(|field| field.is_identifier())
        .ok_or(Error::MissingIdentifier {
            entity_type: E::TYPE_NAME,
        })?;

    let projector = Projector::new(E::TYPE_NAME);
    let value = projector.convert(field.value, 0)?;
    projector.top_level_identifier(&value)
}

/// Stringified form of a raw identifier value, as it would be stored for an `E`.
pub fn identifier_from<E: Entity, I: ToFieldValue + ?Sized>(id: &I) -> Result<String> {
    let projector = Projector::new(E::TYPE_NAME);
    let value = projector.convert(id.to_field_value(), 0)?;
    projector.top_level_identifier(&value)
}

/// Reads an entity back from a document produced by [`project`].
///
/// Nested documents are restored through [`Fields::restore_document`] of their types.
pub fn restore<E: Entity>(mut document: Document) -> Result<E> {
    document.remove(DOCUMENT_TYPE_FIELD);

    let id_field = E::FIELD_NAMES
        .iter()
        .copied()
        .find(|name| is_identifier(name))
        .unwrap_or(ID_FIELD);
    if let Some(mut id) = document.remove(ID_FIELD) {
        restore_identifier::<E::Id>(&mut id);
        document.insert(id_field, id);
    }

    E::restore_document(&mut document);

    Ok(bson::from_document(document)?)
}

struct Projector {
    entity_type: &'static str,
}

impl Projector {
    fn new(entity_type: &'static str) -> Self {
        Self { entity_type }
    }

    fn populate(&self, target: &mut Document, current: &dyn Fields, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::NestingTooDeep {
                entity_type: self.entity_type,
                max_depth: MAX_DEPTH,
            });
        }

        for field in current.fields() {
            let is_id = field.is_identifier();
            let value = self.convert(field.value, depth)?;

            if !is_id {
                target.insert(field.name, value);
            } else if depth == 0 {
                target.insert(ID_FIELD, self.top_level_identifier(&value)?);
            } else {
                target.insert(NESTED_ID_FIELD, self.nested_identifier(value)?);
            }
        }

        Ok(())
    }

    fn convert(&self, value: FieldValue<'_>, depth: usize) -> Result<Bson> {
        match value {
            FieldValue::Scalar(value) | FieldValue::Concept(value) => Ok(value),
            FieldValue::Sequence(items) => items
                .into_iter()
                .map(|item| self.convert(item, depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(Bson::Array),
            FieldValue::Composite(inner) => {
                let mut nested = Document::new();
                self.populate(&mut nested, inner, depth + 1)?;
                Ok(Bson::Document(nested))
            }
        }
    }

    fn top_level_identifier(&self, value: &Bson) -> Result<String> {
        if *value == Bson::Null {
            return Err(self.invalid_identifier("identifier is null".into()));
        }

        stringify(value).ok_or_else(|| {
            let element_type = value.element_type();
            self.invalid_identifier(format!("{element_type:?} values can't be stringified"))
        })
    }

    fn nested_identifier(&self, value: Bson) -> Result<Bson> {
        if value == Bson::Null {
            return Ok(value);
        }

        self.top_level_identifier(&value).map(Bson::String)
    }

    fn invalid_identifier(&self, reason: String) -> Error {
        Error::InvalidIdentifier {
            entity_type: self.entity_type,
            reason,
        }
    }
}

fn stringify(value: &Bson) -> Option<String> {
    match value {
        Bson::String(value) => Some(value.clone()),
        Bson::Int32(value) => Some(value.to_string()),
        Bson::Int64(value) => Some(value.to_string()),
        Bson::Double(value) => Some(value.to_string()),
        Bson::Boolean(value) => Some(value.to_string()),
        Bson::Decimal128(value) => Some(value.to_string()),
        Bson::ObjectId(value) => Some(value.to_hex()),
        Bson::DateTime(value) => value.try_to_rfc3339_string().ok(),
        _ => None,
    }
}

/// Replaces a stored identifier string with the first reading of it that `I` accepts.
#[doc(hidden)]
pub fn restore_identifier<I: DeserializeOwned>(value: &mut Bson) {
    if let Bson::String(id) = value {
        let typed = typed_identifier::<I>(id);
        *value = typed;
    }
}

fn typed_identifier<I: DeserializeOwned>(id: &str) -> Bson {
    let mut candidates = vec![Bson::String(id.to_owned())];

    if let Ok(value) = id.parse::<i64>() {
        candidates.push(Bson::Int64(value));
    }
    if let Ok(value) = id.parse::<f64>() {
        candidates.push(Bson::Double(value));
    }
    if let Ok(value) = id.parse::<bool>() {
        candidates.push(Bson::Boolean(value));
    }
    if let Ok(value) = bson::oid::ObjectId::parse_str(id) {
        candidates.push(Bson::ObjectId(value));
    }

    let fallback = candidates[0].clone();

    candidates
        .into_iter()
        .find(|candidate| bson::from_bson::<I>(candidate.clone()).is_ok())
        .unwrap_or(fallback)
}

/// Renames `"Id"` to `"id"` in every document nested under `document`.
pub(crate) fn restore_identifiers_by_convention(document: &mut Document) {
    for (_, value) in document.iter_mut() {
        restore_nested_identifiers(value);
    }
}

pub(crate) fn restore_nested_identifiers(value: &mut Bson) {
    match value {
        Bson::Document(nested) => {
            if let Some(id) = nested.remove(NESTED_ID_FIELD) {
                nested.insert(ID_FIELD, id);
            }
            for (_, value) in nested.iter_mut() {
                restore_nested_identifiers(value);
            }
        }
        Bson::Array(items) => items.iter_mut().for_each(restore_nested_identifiers),
        _ => {}
    }
}

pub(crate) fn has_identifier(field_names: &[&str]) -> bool {
    field_names.iter().any(|name| is_identifier(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Concept, Field, concept_field_value};
    use mongodb::bson::doc;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Sku(String);

    impl Concept for Sku {
        type Value = String;

        fn concept_value(&self) -> &String {
            &self.0
        }
    }

    impl ToFieldValue for Sku {
        fn to_field_value(&self) -> FieldValue<'_> {
            concept_field_value(self)
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Line {
        id: String,
        sku: Sku,
        quantity: u32,
    }

    impl Fields for Line {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::new("id", self.id.to_field_value()),
                Field::new("sku", self.sku.to_field_value()),
                Field::new("quantity", self.quantity.to_field_value()),
            ]
        }
    }

    impl ToFieldValue for Line {
        fn to_field_value(&self) -> FieldValue<'_> {
            FieldValue::Composite(self)
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Customer {
        name: String,
    }

    impl Fields for Customer {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![Field::new("name", self.name.to_field_value())]
        }
    }

    impl ToFieldValue for Customer {
        fn to_field_value(&self) -> FieldValue<'_> {
            FieldValue::Composite(self)
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Order {
        id: i64,
        customer: Customer,
        lines: Vec<Line>,
        tags: Vec<String>,
        note: Option<String>,
    }

    impl Fields for Order {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::new("id", self.id.to_field_value()),
                Field::new("customer", self.customer.to_field_value()),
                Field::new("lines", self.lines.to_field_value()),
                Field::new("tags", self.tags.to_field_value()),
                Field::new("note", self.note.to_field_value()),
            ]
        }
    }

    impl Entity for Order {
        type Id = i64;

        const TYPE_NAME: &'static str = "Order";
        const FIELD_NAMES: &'static [&'static str] = &["id", "customer", "lines", "tags", "note"];
    }

    fn order() -> Order {
        Order {
            id: 7,
            customer: Customer {
                name: "Ada".into(),
            },
            lines: vec![Line {
                id: "l1".into(),
                sku: Sku("ABC-1".into()),
                quantity: 3,
            }],
            tags: vec!["rush".into(), "gift".into()],
            note: None,
        }
    }

    #[test]
    fn projects_nested_graph() {
        let document = project(&order()).unwrap();

        assert_eq!(
            document,
            doc! {
                "id": "7",
                "customer": { "name": "Ada" },
                "lines": [ { "Id": "l1", "sku": "ABC-1", "quantity": 3_i64 } ],
                "tags": ["rush", "gift"],
                "note": null,
                "_DOCUMENT_TYPE": "Order",
            }
        );
    }

    #[test]
    fn restores_what_it_projected() {
        let document = project(&order()).unwrap();
        let restored: Order = restore(document).unwrap();

        assert_eq!(restored, order());
    }

    #[test]
    fn identifier_is_stringified() {
        assert_eq!(identifier_of(&order()).unwrap(), "7");
        assert_eq!(identifier_from::<Order, _>(&42_i64).unwrap(), "42");
        assert_eq!(identifier_from::<Order, _>("o1").unwrap(), "o1");
    }

    #[test]
    fn stored_identifiers_are_read_as_their_type() {
        let mut value = Bson::String("5".into());
        restore_identifier::<i64>(&mut value);
        assert_eq!(value, Bson::Int64(5));

        let mut value = Bson::String("5".into());
        restore_identifier::<String>(&mut value);
        assert_eq!(value, Bson::String("5".into()));

        let mut value = Bson::Null;
        restore_identifier::<Option<i64>>(&mut value);
        assert_eq!(value, Bson::Null);
    }

    #[test]
    fn null_identifier_is_rejected() {
        let error = identifier_from::<Order, _>(&None::<String>).unwrap_err();
        assert!(matches!(error, Error::InvalidIdentifier { entity_type: "Order", .. }));
    }

    struct Deep(Option<Box<Deep>>);

    impl Fields for Deep {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![Field::new("next", self.0.to_field_value())]
        }
    }

    impl ToFieldValue for Deep {
        fn to_field_value(&self) -> FieldValue<'_> {
            FieldValue::Composite(self)
        }
    }

    #[test]
    fn refuses_runaway_nesting() {
        let mut deep = Deep(None);
        for _ in 0..=MAX_DEPTH {
            deep = Deep(Some(Box::new(deep)));
        }

        let mut document = Document::new();
        let error = Projector::new("Deep")
            .populate(&mut document, &deep, 0)
            .unwrap_err();
        assert!(matches!(error, Error::NestingTooDeep { .. }));
    }

    #[test]
    fn detects_identifier_fields() {
        assert!(has_identifier(&["name", "ID"]));
        assert!(!has_identifier(&["name", "identity"]));
    }
}
