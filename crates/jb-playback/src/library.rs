//! In-memory clip library
//!
//! An [`AssetResolver`] backed by a table of known clips. Entries can be
//! registered directly or loaded from a JSON manifest:
//!
//! ```json
//! {
//!   "music": { "title_theme": 95000, "battle": 120000 },
//!   "sfx":   { "click": 120, "explosion": 1800 }
//! }
//! ```
//!
//! Values are clip durations in milliseconds. Names match exactly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use jb_core::{Category, Clip};
use serde::{Deserialize, Serialize};

use crate::backend::AssetResolver;

/// On-disk manifest format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipManifest {
    #[serde(default)]
    pub music: BTreeMap<String, u64>,
    #[serde(default)]
    pub sfx: BTreeMap<String, u64>,
}

/// Resolver counters shared with whoever built the library
#[derive(Debug, Default)]
pub struct LibraryCounters {
    resolves: AtomicUsize,
    misses: AtomicUsize,
    unloads: AtomicUsize,
}

impl LibraryCounters {
    /// Calls to `resolve`, hits and misses
    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Calls to `unload_unused`
    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct ClipLibrary {
    clips: HashMap<(Category, String), Clip>,
    counters: Arc<LibraryCounters>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifest(manifest: &ClipManifest) -> Self {
        let mut library = Self::new();
        for (name, duration_ms) in &manifest.music {
            library.register(Category::Music, name, *duration_ms);
        }
        for (name, duration_ms) in &manifest.sfx {
            library.register(Category::Sfx, name, *duration_ms);
        }
        library
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let manifest: ClipManifest = serde_json::from_str(json)?;
        Ok(Self::from_manifest(&manifest))
    }

    /// Register a payload-less clip
    pub fn register(&mut self, category: Category, name: &str, duration_ms: u64) {
        self.insert(category, Clip::silent(name, duration_ms));
    }

    /// Register a fully decoded clip under its own name
    pub fn insert(&mut self, category: Category, clip: Clip) {
        self.clips.insert((category, clip.name().to_string()), clip);
    }

    pub fn with(mut self, category: Category, name: &str, duration_ms: u64) -> Self {
        self.register(category, name, duration_ms);
        self
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn counters(&self) -> Arc<LibraryCounters> {
        Arc::clone(&self.counters)
    }
}

impl AssetResolver for ClipLibrary {
    fn resolve(&mut self, name: &str, category: Category) -> Option<Clip> {
        self.counters.resolves.fetch_add(1, Ordering::Relaxed);
        let clip = self.clips.get(&(category, name.to_string())).cloned();
        if clip.is_none() {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        }
        clip
    }

    fn unload_unused(&mut self) {
        self.counters.unloads.fetch_add(1, Ordering::Relaxed);
        log::debug!("[Library] unload_unused ({} clips registered)", self.clips.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_namespaces_are_separate() {
        let mut library = ClipLibrary::from_json(
            r#"{ "music": { "theme": 90000 }, "sfx": { "theme": 200, "click": 50 } }"#,
        )
        .unwrap();

        assert_eq!(library.len(), 3);
        let music = library.resolve("theme", Category::Music).unwrap();
        let sfx = library.resolve("theme", Category::Sfx).unwrap();
        assert_eq!(music.duration_ms(), 90000);
        assert_eq!(sfx.duration_ms(), 200);
        assert!(library.resolve("click", Category::Music).is_none());
    }

    #[test]
    fn test_names_match_exactly() {
        let mut library = ClipLibrary::new().with(Category::Sfx, "Click", 50);
        assert!(library.resolve("click", Category::Sfx).is_none());
        assert!(library.resolve("Click", Category::Sfx).is_some());
    }

    #[test]
    fn test_counters() {
        let mut library = ClipLibrary::new().with(Category::Sfx, "a", 10);
        let counters = library.counters();
        library.resolve("a", Category::Sfx);
        library.resolve("b", Category::Sfx);
        library.unload_unused();

        assert_eq!(counters.resolves(), 2);
        assert_eq!(counters.misses(), 1);
        assert_eq!(counters.unloads(), 1);
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let library = ClipLibrary::from_json(r#"{ "sfx": { "pop": 80 } }"#).unwrap();
        assert_eq!(library.len(), 1);
    }
}
