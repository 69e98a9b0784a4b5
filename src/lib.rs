// Exports which are used in integration/e2e test cases.
pub mod catalog;
pub mod client;
pub mod combo;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod event;
pub mod executor;
pub mod keys;
pub mod listener;

pub use catalog::{search, ApplicationCatalog, CatalogStore};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use entry::{EntryAction, ShortcutEntry, Step};
pub use error::{Error, Result};
pub use executor::{InputSink, Outcome, SequenceExecutor};
