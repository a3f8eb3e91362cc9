use pgdev_core::TableKind;
use serde::{Deserialize, Serialize};

/// Type tag of an indexed catalog object
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Schema,
    Table,
    View,
    Function,
    Procedure,
}

impl From<TableKind> for ObjectKind {
    fn from(kind: TableKind) -> Self {
        match kind {
            TableKind::Table => ObjectKind::Table,
            TableKind::View => ObjectKind::View,
        }
    }
}

/// One searchable catalog object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRecord {
    pub name: String,
    pub kind: ObjectKind,
    /// Owning schema; a schema record names itself
    pub schema: String,
    pub parent: Option<String>,
}

impl SearchRecord {
    pub fn new(name: impl Into<String>, kind: ObjectKind, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            schema: schema.into(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn schema(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), ObjectKind::Schema, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_tags() {
        assert_eq!(ObjectKind::Procedure.to_string(), "PROCEDURE");
        assert_eq!(ObjectKind::from_str("VIEW").ok(), Some(ObjectKind::View));
        assert_eq!(ObjectKind::from(TableKind::Table), ObjectKind::Table);
    }

    #[test]
    fn schema_record_names_itself() {
        let record = SearchRecord::schema("public");
        assert_eq!(record.schema, "public");
        assert_eq!(record.kind, ObjectKind::Schema);
        assert_eq!(record.parent, None);
    }
}
