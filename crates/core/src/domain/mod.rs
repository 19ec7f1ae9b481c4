mod capability;
mod change_set;
mod document;
mod error;
mod ids;
mod page;
mod rank;

pub use capability::{Indexable, SearchCapability};
pub use change_set::{CapturedEntity, ChangeSet, Committed};
pub use document::IndexDocument;
pub use error::DomainError;
pub use ids::{DocId, ProblemId, UserId};
pub use page::{PageRequest, SearchPage};
pub use rank::rerank_by_ids;
