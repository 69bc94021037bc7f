use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::model::{ItemKind, SearchItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} provider failed: {message}")]
pub struct ProviderError {
    provider: &'static str,
    message: String,
}

impl ProviderError {
    pub fn new(provider: &'static str, message: impl Into<String>) -> Self {
        Self {
            provider,
            message: message.into(),
        }
    }
}

pub trait DiscoveryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;
    fn discover(&self) -> Result<Vec<SearchItem>, ProviderError>;
}

pub struct AppProvider {
    apps: Vec<SearchItem>,
}

impl AppProvider {
    pub fn from_apps(apps: Vec<SearchItem>) -> Self {
        Self { apps }
    }

    pub fn deterministic_fixture() -> Self {
        Self {
            apps: vec![
                SearchItem::new(
                    "app-code",
                    ItemKind::Application,
                    "Visual Studio Code",
                    "/usr/share/applications/code.desktop",
                ),
                SearchItem::new(
                    "app-term",
                    ItemKind::Application,
                    "Terminal",
                    "/usr/share/applications/terminal.desktop",
                ),
            ],
        }
    }
}

impl DiscoveryProvider for AppProvider {
    fn provider_name(&self) -> &'static str {
        "app"
    }

    fn discover(&self) -> Result<Vec<SearchItem>, ProviderError> {
        Ok(self.apps.clone())
    }
}

pub struct FileProvider {
    files: Vec<SearchItem>,
}

impl FileProvider {
    pub fn from_files(files: Vec<SearchItem>) -> Self {
        Self { files }
    }

    pub fn deterministic_fixture() -> Self {
        Self {
            files: vec![
                SearchItem::new(
                    "file-report",
                    ItemKind::File,
                    "Q4_Report.xlsx",
                    "/home/admin/Documents/Q4_Report.xlsx",
                ),
                SearchItem::new(
                    "file-notes",
                    ItemKind::File,
                    "Meeting Notes.txt",
                    "/home/admin/Documents/Meeting Notes.txt",
                ),
            ],
        }
    }
}

impl DiscoveryProvider for FileProvider {
    fn provider_name(&self) -> &'static str {
        "file"
    }

    fn discover(&self) -> Result<Vec<SearchItem>, ProviderError> {
        Ok(self.files.clone())
    }
}

const APP_EXTENSIONS: &[&str] = &["desktop", "lnk", "exe", "app", "appref-ms"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Applications,
    Files,
}

/// Outcome of one bounded walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scan {
    pub items: Vec<SearchItem>,
    /// Entries read from disk, whether or not they became items.
    pub visited: usize,
}

/// Bounded walk over a set of roots. Unreadable entries are skipped.
pub struct FileSystemProvider {
    roots: Vec<PathBuf>,
    mode: ScanMode,
    max_items: usize,
    max_depth: usize,
}

impl FileSystemProvider {
    pub fn applications(roots: Vec<PathBuf>, max_items: usize) -> Self {
        Self {
            roots,
            mode: ScanMode::Applications,
            max_items,
            max_depth: 3,
        }
    }

    pub fn files(roots: Vec<PathBuf>, max_items: usize, max_depth: usize) -> Self {
        Self {
            roots,
            mode: ScanMode::Files,
            max_items,
            max_depth,
        }
    }

    /// Walks the roots until `max_items` entries have been visited.
    pub fn scan(&self) -> Scan {
        let mut scan = Scan::default();
        for root in &self.roots {
            if scan.visited >= self.max_items {
                break;
            }
            if !root.is_dir() {
                debug!(root = %root.display(), "skipping missing scan root");
                continue;
            }

            let walker = WalkDir::new(root)
                .min_depth(1)
                .max_depth(self.max_depth)
                .into_iter()
                .filter_entry(|entry| !is_hidden(entry));
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(error) => {
                        debug!(%error, "skipping unreadable entry");
                        continue;
                    }
                };
                scan.visited += 1;
                if let Some(found) = self.item_for(&entry) {
                    scan.items.push(found);
                }
                if scan.visited >= self.max_items {
                    debug!(root = %root.display(), limit = self.max_items, "scan limit reached");
                    break;
                }
            }
        }
        scan
    }

    fn item_for(&self, entry: &DirEntry) -> Option<SearchItem> {
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();
        match self.mode {
            ScanMode::Applications => {
                let is_app_bundle = is_dir && has_extension(path, &["app"]);
                if is_dir && !is_app_bundle {
                    return None;
                }
                if !is_app_bundle && !has_extension(path, APP_EXTENSIONS) {
                    return None;
                }
                let title = path.file_stem()?.to_string_lossy().into_owned();
                Some(item(ItemKind::Application, title, path))
            }
            ScanMode::Files => {
                let title = path.file_name()?.to_string_lossy().into_owned();
                let kind = if is_dir { ItemKind::Folder } else { ItemKind::File };
                Some(item(kind, title, path))
            }
        }
    }
}

fn item(kind: ItemKind, title: String, path: &Path) -> SearchItem {
    SearchItem::at_path(kind, title, path.to_string_lossy().into_owned())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

impl DiscoveryProvider for FileSystemProvider {
    fn provider_name(&self) -> &'static str {
        match self.mode {
            ScanMode::Applications => "app",
            ScanMode::Files => "file",
        }
    }

    fn discover(&self) -> Result<Vec<SearchItem>, ProviderError> {
        Ok(self.scan().items)
    }
}

/// Memoizes another provider's results until [`CachedProvider::invalidate`].
pub struct CachedProvider {
    inner: Arc<dyn DiscoveryProvider>,
    cached: Mutex<Option<Vec<SearchItem>>>,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn DiscoveryProvider>) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
    }
}

impl DiscoveryProvider for CachedProvider {
    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn discover(&self) -> Result<Vec<SearchItem>, ProviderError> {
        if let Ok(cached) = self.cached.lock() {
            if let Some(items) = cached.as_ref() {
                return Ok(items.clone());
            }
        }

        let items = self.inner.discover()?;
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(items.clone());
        }
        Ok(items)
    }
}
