use crate::catalog::source::parse_document;
use crate::combo;
use crate::entry::{EntryAction, ShortcutEntry};
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Raw text of one shortcut document.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub text: String,
}

/// Where shortcut documents for an application come from.
pub trait SourceProvider: Send + Sync {
    /// Every document in the application's namespace, in a stable order.
    /// A missing namespace yields an empty list; a document that cannot be
    /// read yields an `Err` item without hiding the others.
    fn read_sources(&self, app_id: &str) -> Vec<Result<SourceText>>;
}

/// Reads `<root>/<app>.json` followed by every `*.json` in `<root>/<app>/`,
/// the latter sorted by file name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn candidate_paths(&self, app_id: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        let single = self.root.join(format!("{app_id}.json"));
        if single.is_file() {
            paths.push(single);
        }

        let dir = self.root.join(app_id);
        if let Ok(read_dir) = fs::read_dir(&dir) {
            let mut files: Vec<PathBuf> = read_dir
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && has_json_extension(path))
                .collect();
            files.sort();
            paths.extend(files);
        }
        paths
    }
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl SourceProvider for DirectorySource {
    fn read_sources(&self, app_id: &str) -> Vec<Result<SourceText>> {
        self.candidate_paths(app_id)
            .into_iter()
            .map(|path| match fs::read_to_string(&path) {
                Ok(text) => Ok(SourceText { path, text }),
                Err(source) => Err(Error::SourceRead { path, source }),
            })
            .collect()
    }
}

/// Merged, deduplicated shortcuts of one application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationCatalog {
    app_id: String,
    entries: Vec<ShortcutEntry>,
}

impl ApplicationCatalog {
    pub fn new(app_id: impl Into<String>, entries: Vec<ShortcutEntry>) -> Self {
        Self {
            app_id: app_id.into(),
            entries,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn entries(&self) -> &[ShortcutEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&ShortcutEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

/// Process-wide registry of application catalogs. Each application is read
/// from its provider at most once; later loads return the cached catalog.
pub struct CatalogStore {
    provider: Box<dyn SourceProvider>,
    cache: Mutex<HashMap<String, Arc<ApplicationCatalog>>>,
}

impl CatalogStore {
    pub fn new(provider: impl SourceProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(DirectorySource::new(root))
    }

    pub fn load(&self, app_id: &str) -> Arc<ApplicationCatalog> {
        let app_id = app_id.trim().to_lowercase();
        if app_id.is_empty() {
            warn!("Catalog requested for an empty application id");
            return Arc::new(ApplicationCatalog::default());
        }
        if !is_plain_app_id(&app_id) {
            warn!("Refusing application id {app_id:?}: not a plain name");
            return Arc::new(ApplicationCatalog::default());
        }

        // Held across population so concurrent first loads of one app read
        // the sources once.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(catalog) = cache.get(&app_id) {
            debug!("Catalog cache hit for {app_id}");
            return Arc::clone(catalog);
        }

        let catalog = Arc::new(merge(&app_id, self.provider.read_sources(&app_id)));
        if catalog.is_empty() {
            info!("No shortcuts found for {app_id}");
        } else {
            info!("Loaded {} shortcuts for {app_id}", catalog.len());
        }
        cache.insert(app_id, Arc::clone(&catalog));
        catalog
    }

    pub fn cached_apps(&self) -> Vec<String> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let mut apps: Vec<String> = cache.keys().cloned().collect();
        apps.sort();
        apps
    }
}

/// Ids become file names under the sources root, so they must not name a
/// path of their own.
pub(crate) fn is_plain_app_id(app_id: &str) -> bool {
    !app_id.contains(['/', '\\']) && app_id != "." && !app_id.contains("..")
}

fn merge(app_id: &str, sources: Vec<Result<SourceText>>) -> ApplicationCatalog {
    let mut seen_combos = HashSet::new();
    let mut entries = Vec::new();

    for source in sources {
        let parsed = source.and_then(|source| parse_document(&source.path, &source.text));
        let document = match parsed {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping shortcut source for {app_id}: {e}");
                continue;
            }
        };

        for entry in document {
            if let EntryAction::SingleCombo(hotkey) = &entry.action {
                if !seen_combos.insert(combo::canonical(hotkey)) {
                    debug!("Dropping duplicate {hotkey} ({}) for {app_id}", entry.name);
                    continue;
                }
            }
            entries.push(entry);
        }
    }

    ApplicationCatalog::new(app_id, entries)
}
