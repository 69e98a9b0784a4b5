pub mod search;
pub mod source;
pub mod store;

pub use search::search;
pub use source::parse_document;
pub use store::{ApplicationCatalog, CatalogStore, DirectorySource, SourceProvider, SourceText};
