//! StudyDesk core library.
//! Flat-file document store, the material catalog built on it, and the throttled study
//! assistant. The gateway crate wires these into HTTP routes.

pub mod assistant;
pub mod catalog;
pub mod config;
pub mod store;

pub use assistant::{
    AskError, Assistant, ChatMessage, ChatRequest, CompletionTransport, DispatchError,
    HttpTransport, Throttle, CLARIFY_MESSAGE,
};
pub use catalog::{
    Catalog, CatalogError, IdAssignment, Listing, Material, MaterialDraft, MaterialRecord,
};
pub use config::{api_key_from_env, AssistantConfig, StudyConfig};
pub use store::{ensure_defaults, Document, Store, StoreError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
