use super::DocId;

/// Declares that an entity type is mirrored into the search index.
///
/// The namespace groups documents of one entity type; `fields` lists the
/// attributes projected into each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCapability {
    pub namespace: &'static str,
    pub fields: &'static [&'static str],
}

impl SearchCapability {
    pub const fn new(namespace: &'static str, fields: &'static [&'static str]) -> Self {
        Self { namespace, fields }
    }

    /// A capability with no namespace or no fields never produces documents.
    pub fn is_searchable(&self) -> bool {
        !self.namespace.is_empty() && !self.fields.is_empty()
    }
}

/// Any entity that can pass through a write transaction.
///
/// Types that are not searchable keep `CAPABILITY` as `None`; the index sync
/// step skips them.
pub trait Indexable {
    const CAPABILITY: Option<SearchCapability>;

    fn index_id(&self) -> DocId;

    fn field_value(&self, field: &str) -> Option<String>;
}
