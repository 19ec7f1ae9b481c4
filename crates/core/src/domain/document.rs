use std::collections::BTreeMap;

use super::Indexable;

/// Field map stored in the search index for one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
    fields: BTreeMap<String, String>,
}

impl IndexDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects exactly the listed fields of `entity`. Fields the entity
    /// cannot supply are stored as empty strings so the document shape is
    /// always the declared field set.
    pub fn project<T: Indexable>(entity: &T, fields: &[&str]) -> Self {
        let fields = fields
            .iter()
            .map(|field| {
                let value = entity.field_value(field).unwrap_or_default();
                ((*field).to_string(), value)
            })
            .collect();

        Self { fields }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, String)> for IndexDocument {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
