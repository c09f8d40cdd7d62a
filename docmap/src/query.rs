use crate::projection::{DOCUMENT_TYPE_FIELD, ID_FIELD};
use mongodb::bson::{Bson, Document};

/// A conjunction of equality conditions over top-level document fields.
///
/// Queries are built structurally and rendered on demand, either as a filter document for
/// drivers that take one, or as query text with every literal escaped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub value: Bson,
}

impl Query {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Documents with the given identifier and discriminator.
    pub fn point(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        let (id, type_name): (String, String) = (id.into(), type_name.into());

        Self::all()
            .and_eq(ID_FIELD, id)
            .and_eq(DOCUMENT_TYPE_FIELD, type_name)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|condition| document.get(&condition.field) == Some(&condition.value))
    }

    pub fn to_document(&self) -> Document {
        self.conditions
            .iter()
            .map(|condition| (condition.field.clone(), condition.value.clone()))
            .collect()
    }

    /// Renders the query as text, e.g.
    /// `SELECT * FROM Entities WHERE Entities.id = 'o1' AND Entities._DOCUMENT_TYPE = 'Order'`.
    pub fn to_sql(&self, collection_id: &str) -> String {
        let alias = if is_plain_identifier(collection_id) {
            collection_id.to_owned()
        } else {
            "c".to_owned()
        };

        let mut sql = format!("SELECT * FROM {alias}");

        for (index, condition) in self.conditions.iter().enumerate() {
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            sql.push_str(&alias);
            if is_plain_identifier(&condition.field) {
                sql.push_str(&format!(".{}", condition.field));
            } else {
                sql.push_str(&format!("[\"{}\"]", escape(&condition.field, '"')));
            }
            sql.push_str(" = ");
            sql.push_str(&literal(&condition.value));
        }

        sql
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn escape(value: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == quote {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn literal(value: &Bson) -> String {
    match value {
        Bson::String(value) => format!("'{}'", escape(value, '\'')),
        Bson::Int32(value) => value.to_string(),
        Bson::Int64(value) => value.to_string(),
        Bson::Double(value) => value.to_string(),
        Bson::Boolean(value) => value.to_string(),
        Bson::Null => "null".to_owned(),
        other => format!("'{}'", escape(&other.to_string(), '\'')),
    }
}

/// Page of a query, counted from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paging {
    pub size: u32,
    pub number: u32,
}

impl Paging {
    pub fn new(size: u32, number: u32) -> Self {
        Self { size, number }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.size) * u64::from(self.number)
    }
}

#[derive(Debug)]
pub struct QueryResult<T> {
    /// Number of matching entities across all pages.
    pub total_items: u64,
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn point_query_text() {
        let query = Query::point("o1", "Order");

        assert_eq!(
            query.to_sql("Entities"),
            "SELECT * FROM Entities WHERE Entities.id = 'o1' AND Entities._DOCUMENT_TYPE = 'Order'"
        );
    }

    #[test]
    fn literals_are_escaped() {
        let query = Query::point("x' OR 1=1 --", "Order");

        assert_eq!(
            query.to_sql("Entities"),
            "SELECT * FROM Entities WHERE Entities.id = 'x\\' OR 1=1 --' AND Entities._DOCUMENT_TYPE = 'Order'"
        );
    }

    #[test]
    fn odd_names_use_brackets() {
        let query = Query::all().and_eq("unit price", 3);

        assert_eq!(
            query.to_sql("my-entities"),
            "SELECT * FROM c WHERE c[\"unit price\"] = 3"
        );
    }

    #[test]
    fn matches_every_condition() {
        let query = Query::point("1", "Order");

        assert!(query.matches(&doc! { "id": "1", "_DOCUMENT_TYPE": "Order", "total": 42 }));
        assert!(!query.matches(&doc! { "id": "1", "_DOCUMENT_TYPE": "Customer" }));
        assert!(!query.matches(&doc! { "id": 1, "_DOCUMENT_TYPE": "Order" }));
        assert!(Query::all().matches(&doc! {}));
    }

    #[test]
    fn filter_document() {
        assert_eq!(
            Query::point("1", "Order").to_document(),
            doc! { "id": "1", "_DOCUMENT_TYPE": "Order" }
        );
    }

    #[test]
    fn paging_offset() {
        assert_eq!(Paging::new(20, 3).offset(), 60);
        assert_eq!(Paging::new(20, 0).offset(), 0);
    }
}
