//! GraphQL document handling.

mod document;

pub use document::OperationKind;
pub(crate) use document::find_operation;
pub(crate) use document::parse;
