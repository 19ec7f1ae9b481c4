use std::any::type_name;

use super::{DocId, IndexDocument, Indexable, SearchCapability};

/// Snapshot of one entity taken when a write was recorded in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEntity {
    kind: &'static str,
    capability: Option<SearchCapability>,
    id: DocId,
    document: IndexDocument,
}

impl CapturedEntity {
    pub fn capture<T: Indexable>(entity: &T) -> Self {
        let document = T::CAPABILITY
            .map(|capability| IndexDocument::project(entity, capability.fields))
            .unwrap_or_default();

        Self {
            kind: type_name::<T>(),
            capability: T::CAPABILITY,
            id: entity.index_id(),
            document,
        }
    }

    pub fn id(&self) -> DocId {
        self.id
    }

    pub fn document(&self) -> &IndexDocument {
        &self.document
    }

    /// The capability, when the entity type declares a usable one.
    pub fn searchable(&self) -> Option<SearchCapability> {
        self.capability.filter(SearchCapability::is_searchable)
    }

    fn same_entity(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

/// The inserted, updated and deleted entities of one committed transaction.
///
/// The three lists are disjoint and keep the order in which entities were
/// first recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    added: Vec<CapturedEntity>,
    updated: Vec<CapturedEntity>,
    deleted: Vec<CapturedEntity>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_added<T: Indexable>(&mut self, entity: &T) {
        let captured = CapturedEntity::capture(entity);
        self.remove_everywhere(&captured);
        self.added.push(captured);
    }

    pub fn record_updated<T: Indexable>(&mut self, entity: &T) {
        let captured = CapturedEntity::capture(entity);

        // Still pending insert: refresh the snapshot but keep it an insert.
        if let Some(slot) = self.added.iter_mut().find(|c| c.same_entity(&captured)) {
            *slot = captured;
            return;
        }
        if let Some(slot) = self.updated.iter_mut().find(|c| c.same_entity(&captured)) {
            *slot = captured;
            return;
        }
        self.updated.push(captured);
    }

    pub fn record_deleted<T: Indexable>(&mut self, entity: &T) {
        let captured = CapturedEntity::capture(entity);
        let was_added = self.added.iter().any(|c| c.same_entity(&captured));
        self.remove_everywhere(&captured);

        // Inserted and deleted inside one transaction: the index never saw it.
        if !was_added {
            self.deleted.push(captured);
        }
    }

    pub fn added(&self) -> &[CapturedEntity] {
        &self.added
    }

    pub fn updated(&self) -> &[CapturedEntity] {
        &self.updated
    }

    pub fn deleted(&self) -> &[CapturedEntity] {
        &self.deleted
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_everywhere(&mut self, captured: &CapturedEntity) {
        self.added.retain(|c| !c.same_entity(captured));
        self.updated.retain(|c| !c.same_entity(captured));
        self.deleted.retain(|c| !c.same_entity(captured));
    }
}

/// Value produced by a write together with the change-set of its commit.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub changes: ChangeSet,
}

impl<T> Committed<T> {
    pub fn new(value: T, changes: ChangeSet) -> Self {
        Self { value, changes }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed {
            value: f(self.value),
            changes: self.changes,
        }
    }
}
