//! Clip Cache
//!
//! Lazily populated `name → Clip` maps, one namespace per category.
//! A miss asks the asset resolver once; failures are not cached, so a later
//! request for the same name tries again.
//!
//! Keys are stored and matched exactly (case-sensitive). The cache has no
//! knowledge of who is playing what; eviction takes a predicate so the
//! coordinator can answer "is this still referenced?" from live state at the
//! moment eviction runs.

use std::collections::HashMap;

use jb_core::{Category, Clip};
use serde::Serialize;

use crate::backend::AssetResolver;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub music_entries: usize,
    pub sfx_entries: usize,
}

/// Result of an eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub removed: Vec<(Category, String)>,
    /// Entries kept because something still references them
    pub in_use: Vec<(Category, String)>,
}

#[derive(Default)]
pub struct ClipCache {
    music: HashMap<String, Clip>,
    sfx: HashMap<String, Clip>,
    hits: u64,
    misses: u64,
}

impl ClipCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, category: Category) -> &HashMap<String, Clip> {
        match category {
            Category::Music => &self.music,
            Category::Sfx => &self.sfx,
        }
    }

    fn namespace_mut(&mut self, category: Category) -> &mut HashMap<String, Clip> {
        match category {
            Category::Music => &mut self.music,
            Category::Sfx => &mut self.sfx,
        }
    }

    /// Cached clip, or resolve-and-cache on miss
    pub fn get<R>(&mut self, name: &str, category: Category, resolver: &mut R) -> Option<Clip>
    where
        R: AssetResolver + ?Sized,
    {
        if let Some(clip) = self.namespace(category).get(name).cloned() {
            self.hits += 1;
            return Some(clip);
        }

        self.misses += 1;
        match resolver.resolve(name, category) {
            Some(clip) => {
                log::debug!(
                    "[Cache] Loaded {}/{} ({} ms)",
                    category,
                    name,
                    clip.duration_ms()
                );
                self.namespace_mut(category).insert(name.to_string(), clip.clone());
                Some(clip)
            }
            None => {
                log::debug!("[Cache] Resolver has no {}/{}", category, name);
                None
            }
        }
    }

    /// Cached clip without touching the resolver or the counters
    pub fn peek(&self, name: &str, category: Category) -> Option<&Clip> {
        self.namespace(category).get(name)
    }

    pub fn contains(&self, name: &str, category: Category) -> bool {
        self.namespace(category).contains_key(name)
    }

    /// Insert a pre-loaded clip, replacing any previous entry
    pub fn insert(&mut self, category: Category, name: impl Into<String>, clip: Clip) {
        self.namespace_mut(category).insert(name.into(), clip);
    }

    /// Remove every entry for which `is_referenced` returns false
    pub fn evict_unused<F>(&mut self, mut is_referenced: F) -> EvictionReport
    where
        F: FnMut(Category, &str, &Clip) -> bool,
    {
        let mut report = EvictionReport::default();

        for category in Category::ALL {
            let namespace = self.namespace_mut(category);
            namespace.retain(|name, clip| {
                if is_referenced(category, name, clip) {
                    report.in_use.push((category, name.clone()));
                    true
                } else {
                    report.removed.push((category, name.clone()));
                    false
                }
            });
        }

        report.removed.sort();
        report.in_use.sort();
        report
    }

    /// Drop both namespaces
    pub fn clear(&mut self) {
        self.music.clear();
        self.sfx.clear();
    }

    pub fn len(&self, category: Category) -> usize {
        self.namespace(category).len()
    }

    pub fn total_len(&self) -> usize {
        self.music.len() + self.sfx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Cached names in a namespace, sorted
    pub fn names(&self, category: Category) -> Vec<String> {
        let mut names: Vec<_> = self.namespace(category).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            music_entries: self.music.len(),
            sfx_entries: self.sfx.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::ClipLibrary;

    fn library() -> ClipLibrary {
        ClipLibrary::new()
            .with(Category::Music, "theme", 60_000)
            .with(Category::Sfx, "click", 100)
            .with(Category::Sfx, "boom", 900)
    }

    #[test]
    fn test_load_on_miss_then_hit() {
        let mut lib = library();
        let counters = lib.counters();
        let mut cache = ClipCache::new();

        let a = cache.get("theme", Category::Music, &mut lib).unwrap();
        let b = cache.get("theme", Category::Music, &mut lib).unwrap();

        assert!(a.ptr_eq(&b));
        assert_eq!(counters.resolves(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_failure_not_cached() {
        let mut lib = library();
        let counters = lib.counters();
        let mut cache = ClipCache::new();

        assert!(cache.get("missing", Category::Sfx, &mut lib).is_none());
        assert!(cache.get("missing", Category::Sfx, &mut lib).is_none());
        assert_eq!(counters.resolves(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_namespaces_are_separate() {
        let mut lib = library();
        let mut cache = ClipCache::new();

        assert!(cache.get("click", Category::Music, &mut lib).is_none());
        assert!(cache.get("click", Category::Sfx, &mut lib).is_some());
        assert!(cache.contains("click", Category::Sfx));
        assert!(!cache.contains("click", Category::Music));
    }

    #[test]
    fn test_evict_keeps_referenced() {
        let mut lib = library();
        let mut cache = ClipCache::new();
        cache.get("theme", Category::Music, &mut lib);
        cache.get("click", Category::Sfx, &mut lib);
        cache.get("boom", Category::Sfx, &mut lib);

        let report = cache.evict_unused(|_, name, _| name == "boom");

        assert_eq!(
            report.removed,
            vec![
                (Category::Music, "theme".to_string()),
                (Category::Sfx, "click".to_string())
            ]
        );
        assert_eq!(report.in_use, vec![(Category::Sfx, "boom".to_string())]);
        assert_eq!(cache.names(Category::Sfx), vec!["boom".to_string()]);
        assert_eq!(cache.len(Category::Music), 0);
    }

    #[test]
    fn test_exact_key_match() {
        let mut cache = ClipCache::new();
        cache.insert(Category::Sfx, "Click", Clip::silent("Click", 10));
        assert!(cache.peek("Click", Category::Sfx).is_some());
        assert!(cache.peek("click", Category::Sfx).is_none());
    }
}
