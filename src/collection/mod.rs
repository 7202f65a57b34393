pub mod endpoint;
pub mod field_map;
pub mod loader;
pub mod orchestrator;

pub use endpoint::{segment, EndpointDescriptor};
pub use field_map::{Draft, FieldKind, FieldMap, FieldSpec, ViewRow};
pub use loader::{fetch_rows, load, LoadOutcome};
pub use orchestrator::{AssumeYes, CollectionSnapshot, Confirm, RemoteCollection, RemoveOutcome};
