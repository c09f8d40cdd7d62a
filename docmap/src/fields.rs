//! Compile-time field manifests.
//!
//! Instead of walking an object graph at runtime, every persisted type describes its own
//! fields: a name, an accessor, and the kind of value the accessor yields. The manifest is
//! normally generated with `#[derive(Entity)]`, `#[derive(Fields)]` and `#[derive(Concept)]`,
//! but can be written by hand:
//!
//! ```
//! use docmap::{Field, Fields, FieldValue, ToFieldValue};
//!
//! struct Address {
//!     city: String,
//!     zip: i32,
//! }
//!
//! impl Fields for Address {
//!     fn fields(&self) -> Vec<Field<'_>> {
//!         vec![
//!             Field::new("city", self.city.to_field_value()),
//!             Field::new("zip", self.zip.to_field_value()),
//!         ]
//!     }
//! }
//!
//! impl ToFieldValue for Address {
//!     fn to_field_value(&self) -> FieldValue<'_> {
//!         FieldValue::Composite(self)
//!     }
//! }
//! ```

use crate::projection::{restore_identifiers_by_convention, restore_nested_identifiers};
use mongodb::bson::{self, Bson, Document, oid::ObjectId};

/// The value of a single field, classified by how it is projected into a document.
pub enum FieldValue<'a> {
    /// A primitive stored as is.
    Scalar(Bson),
    /// A wrapped scalar, already unwrapped to its underlying primitive.
    Concept(Bson),
    /// An ordered collection; every element is projected on its own.
    Sequence(Vec<FieldValue<'a>>),
    /// A nested object projected into a sub-document.
    Composite(&'a dyn Fields),
}

impl std::fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Self::Concept(value) => f.debug_tuple("Concept").field(value).finish(),
            Self::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Self::Composite(_) => f.write_str("Composite(..)"),
        }
    }
}

#[derive(Debug)]
pub struct Field<'a> {
    pub name: &'static str,
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    pub fn new(name: &'static str, value: FieldValue<'a>) -> Self {
        Self { name, value }
    }

    /// Whether this field holds the identifier. The match is case-insensitive.
    pub fn is_identifier(&self) -> bool {
        is_identifier(self.name)
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    name.eq_ignore_ascii_case("id")
}

/// Field manifest of a type: its fields in declaration order.
pub trait Fields {
    fn fields(&self) -> Vec<Field<'_>>;

    /// Puts a stored document of this type back into the shape its `Deserialize` impl
    /// expects, before the document is read.
    ///
    /// The derives rename the nested `"Id"` key to the identifier field's own name and read
    /// the stored string as the identifier's type. The default renames `"Id"` to `"id"` in
    /// every nested document and leaves the values as strings.
    fn restore_document(document: &mut Document)
    where
        Self: Sized,
    {
        restore_identifiers_by_convention(document);
    }
}

pub trait ToFieldValue {
    fn to_field_value(&self) -> FieldValue<'_>;

    /// Counterpart of [`Fields::restore_document`] for a stored value of this type.
    fn restore_value(value: &mut Bson) {
        restore_nested_identifiers(value);
    }
}

/// [`ToFieldValue::restore_value`] of a composite: restores the sub-document through the
/// type's [`Fields`] manifest.
pub fn restore_composite<T: Fields>(value: &mut Bson) {
    if let Bson::Document(document) = value {
        T::restore_document(document);
    }
}

/// A typed wrapper around a primitive value. Only the wrapped value is stored.
pub trait Concept {
    type Value: ToFieldValue;

    fn concept_value(&self) -> &Self::Value;
}

/// Field value of a concept: its underlying value tagged as [`FieldValue::Concept`].
pub fn concept_field_value<C: Concept + ?Sized>(concept: &C) -> FieldValue<'_> {
    match concept.concept_value().to_field_value() {
        FieldValue::Scalar(value) | FieldValue::Concept(value) => FieldValue::Concept(value),
        other => other,
    }
}

macro_rules! impl_scalar {
    ($($ty:ty => $convert:expr),* $(,)?) => {
        $(
            impl ToFieldValue for $ty {
                #[allow(clippy::redundant_closure_call)]
                fn to_field_value(&self) -> FieldValue<'_> {
                    FieldValue::Scalar(($convert)(self))
                }

                fn restore_value(_value: &mut Bson) {}
            }
        )*
    };
}

impl_scalar! {
    String => |value: &String| Bson::String(value.clone()),
    str => |value: &str| Bson::String(value.to_owned()),
    char => |value: &char| Bson::String(value.to_string()),
    bool => |value: &bool| Bson::Boolean(*value),
    i8 => |value: &i8| Bson::Int32(i32::from(*value)),
    i16 => |value: &i16| Bson::Int32(i32::from(*value)),
    i32 => |value: &i32| Bson::Int32(*value),
    i64 => |value: &i64| Bson::Int64(*value),
    u8 => |value: &u8| Bson::Int32(i32::from(*value)),
    u16 => |value: &u16| Bson::Int32(i32::from(*value)),
    u32 => |value: &u32| Bson::Int64(i64::from(*value)),
    f32 => |value: &f32| Bson::Double(f64::from(*value)),
    f64 => |value: &f64| Bson::Double(*value),
    ObjectId => |value: &ObjectId| Bson::ObjectId(*value),
    bson::DateTime => |value: &bson::DateTime| Bson::DateTime(*value),
    chrono::DateTime<chrono::Utc> => |value: &chrono::DateTime<chrono::Utc>| {
        Bson::String(value.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
    },
    Bson => |value: &Bson| value.clone(),
}

impl<T: ToFieldValue> ToFieldValue for Option<T> {
    fn to_field_value(&self) -> FieldValue<'_> {
        match self {
            Some(value) => value.to_field_value(),
            None => FieldValue::Scalar(Bson::Null),
        }
    }

    fn restore_value(value: &mut Bson) {
        if *value != Bson::Null {
            T::restore_value(value);
        }
    }
}

impl<T: ToFieldValue> ToFieldValue for [T] {
    fn to_field_value(&self) -> FieldValue<'_> {
        FieldValue::Sequence(self.iter().map(ToFieldValue::to_field_value).collect())
    }

    fn restore_value(value: &mut Bson) {
        if let Bson::Array(items) = value {
            items.iter_mut().for_each(T::restore_value);
        }
    }
}

impl<T: ToFieldValue> ToFieldValue for Vec<T> {
    fn to_field_value(&self) -> FieldValue<'_> {
        self.as_slice().to_field_value()
    }

    fn restore_value(value: &mut Bson) {
        <[T]>::restore_value(value);
    }
}

impl<T: ToFieldValue + ?Sized> ToFieldValue for Box<T> {
    fn to_field_value(&self) -> FieldValue<'_> {
        (**self).to_field_value()
    }

    fn restore_value(value: &mut Bson) {
        T::restore_value(value);
    }
}

impl<T: ToFieldValue + ?Sized> ToFieldValue for &T {
    fn to_field_value(&self) -> FieldValue<'_> {
        (**self).to_field_value()
    }

    fn restore_value(value: &mut Bson) {
        T::restore_value(value);
    }
}
