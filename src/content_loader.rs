use crate::prompt::{build_document, document_order};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Text of a file, or the inline placeholder that replaces it when the read
/// fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Unreadable(String),
}

/// Read `path` as UTF-8 (invalid sequences are replaced). Never fails: a
/// read error becomes `Error reading file: {basename}`.
pub fn load(path: &Path) -> FileContent {
    match fs::read(path) {
        Ok(bytes) => FileContent::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read file");
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            FileContent::Unreadable(format!("Error reading file: {}", name))
        }
    }
}

/// Loaded file text keyed by absolute path. Entries are only ever added;
/// the whole cache is dropped on a new scan or clear.
#[derive(Debug, Default)]
pub struct ContentCache {
    entries: HashMap<PathBuf, String>,
}

impl ContentCache {
    #[cfg(test)]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Keeps an existing entry untouched.
    pub fn insert(&mut self, path: PathBuf, text: String) {
        self.entries.entry(path).or_insert(text);
    }

    pub fn extend(&mut self, loaded: HashMap<PathBuf, String>) {
        for (path, text) in loaded {
            self.insert(path, text);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies out the cached entries for `paths`.
    pub fn snapshot<'a>(&self, paths: impl IntoIterator<Item = &'a PathBuf>) -> HashMap<PathBuf, String> {
        paths
            .into_iter()
            .filter_map(|p| self.entries.get(p).map(|text| (p.clone(), text.clone())))
            .collect()
    }
}

/// Everything a background aggregation pass needs, detached from the
/// session so it can run on another thread.
#[derive(Debug, Clone)]
pub struct AggregationJob {
    pub generation: u64,
    pub scan_root: PathBuf,
    pub selected: BTreeSet<PathBuf>,
    pub cached: HashMap<PathBuf, String>,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone)]
pub struct AggregationOutput {
    pub generation: u64,
    pub document: String,
    /// Newly read files, to be merged into the cache by the owner.
    pub loaded: HashMap<PathBuf, String>,
    pub file_count: usize,
    pub total_chars: usize,
}

impl AggregationJob {
    /// Loads whatever is not cached and serializes the document.
    pub fn run(self) -> AggregationOutput {
        let mut contents: HashMap<PathBuf, String> = HashMap::with_capacity(self.selected.len());
        let mut loaded = HashMap::new();
        let mut total_chars = 0;

        for path in document_order(&self.selected) {
            let text = match self.cached.get(path) {
                Some(text) => text.clone(),
                None => match load(path) {
                    FileContent::Text(text) => {
                        loaded.insert(path.clone(), text.clone());
                        text
                    }
                    FileContent::Unreadable(placeholder) => placeholder,
                },
            };
            total_chars += text.chars().count();
            contents.insert(path.clone(), text);
        }
        debug!(
            files = self.selected.len(),
            read = loaded.len(),
            total_chars,
            "aggregation pass done"
        );

        AggregationOutput {
            generation: self.generation,
            document: build_document(&self.selected, &contents, &self.scan_root),
            loaded,
            file_count: self.selected.len(),
            total_chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn load_returns_text_or_placeholder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        File::create(&path).unwrap().write_all(b"hi\n").unwrap();

        assert_eq!(load(&path), FileContent::Text("hi\n".into()));
        assert_eq!(
            load(&dir.path().join("gone.txt")),
            FileContent::Unreadable("Error reading file: gone.txt".into())
        );
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        File::create(&path).unwrap().write_all(&[b'a', 0xff, b'b']).unwrap();
        match load(&path) {
            FileContent::Text(text) => {
                assert!(text.starts_with('a'));
                assert!(text.ends_with('b'));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn cache_is_append_only() {
        let mut cache = ContentCache::default();
        cache.insert(PathBuf::from("/a"), "first".into());
        cache.insert(PathBuf::from("/a"), "second".into());
        let kept = cache.snapshot(&[PathBuf::from("/a")]);
        assert_eq!(kept.get(Path::new("/a")).map(String::as_str), Some("first"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn job_reads_only_uncached_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("proj");
        fs::create_dir_all(&root).unwrap();
        let fresh = root.join("fresh.txt");
        let cached = root.join("cached.txt");
        let missing = root.join("missing.txt");
        File::create(&fresh).unwrap().write_all(b"abcd").unwrap();

        let job = AggregationJob {
            generation: 3,
            scan_root: root.clone(),
            selected: [fresh.clone(), cached.clone(), missing.clone()].into_iter().collect(),
            cached: [(cached.clone(), "from cache".to_string())].into_iter().collect(),
        };
        let out = job.run();

        assert_eq!(out.generation, 3);
        assert_eq!(out.file_count, 3);
        assert_eq!(out.loaded.len(), 1);
        assert_eq!(out.loaded.get(&fresh).map(String::as_str), Some("abcd"));
        assert!(!out.loaded.contains_key(&missing));
        assert!(out.document.contains("from cache"));
        assert!(out.document.contains("Error reading file: missing.txt"));
        let expected_chars = "abcd".len() + "from cache".len() + "Error reading file: missing.txt".len();
        assert_eq!(out.total_chars, expected_chars);
    }
}
