use crate::error::ScanError;
use crate::tree_model::{ScanEntry, TreeModel};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_FILES: usize = 10_000;

/// Directory names that are never descended into.
pub const IGNORED_DIRECTORIES: &[&str] = &[
    "node_modules",
    "venv",
    ".git",
    "__pycache__",
    ".idea",
    ".vscode",
];

/// Exact file names that are always skipped.
const IGNORED_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", ".env"];

/// Suffixes (matched on the lowercased name) of files that are always skipped.
const IGNORED_EXTENSIONS: &[&str] = &[
    ".pyc", ".jpg", ".jpeg", ".png", ".gif", ".mp4", ".mov", ".avi", ".webp", ".mkv", ".wmv",
    ".flv", ".svg", ".zip", ".tar", ".gz", ".rar", ".exe", ".bin", ".iso", ".dll", ".psd", ".ai",
    ".eps", ".tiff", ".woff", ".woff2", ".ttf", ".otf", ".flac", ".m4a", ".aac", ".3gp",
];

/// Suffixes that are trusted to be text without sniffing the content.
const LIKELY_TEXT_SUFFIXES: &[&str] = &[
    ".txt", ".md", ".markdown", ".json", ".js", ".ts", ".jsx", ".tsx", ".css", ".scss", ".sass",
    ".less", ".html", ".htm", ".xml", ".yaml", ".yml", ".ini", ".conf", ".cfg", ".config", ".py",
    ".rb", ".php", ".java", ".c", ".cpp", ".h", ".hpp", ".cs", ".go", ".rs", ".swift", ".kt",
    ".kts", ".sh", ".bash", ".zsh", ".fish", ".sql", ".graphql", ".vue", ".svelte", ".astro",
    ".env.example", ".gitignore", ".dockerignore", ".editorconfig", ".eslintrc", ".prettierrc",
    ".babelrc", "license", "readme", "changelog", "todo", ".csv", ".tsv",
];

const SNIFF_LEN: usize = 4096;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Stop honouring `.gitignore` / `.ignore` files.
    pub include_ignored: bool,
    /// More candidate files than this aborts the scan.
    pub max_files: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            include_ignored: false,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

/// Walk `root` and build the tree of text files below it.
///
/// Directories without any kept file are pruned; the root always stays.
pub fn scan_tree(root: &Path, options: &ScanOptions) -> Result<TreeModel, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| ScanError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;

    info!(root = %root.display(), "scanning");
    let (dirs, candidates) = collect_candidates(root, options)?;

    let mut files = Vec::with_capacity(candidates.len());
    for path in candidates {
        let name = file_name_of(&path);
        match fs::metadata(&path) {
            Ok(meta) if is_text_file(&path, &name) => files.push(ScanEntry::file(path, meta.len())),
            Ok(_) => debug!(path = %path.display(), "skipping binary file"),
            Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }

    let mut non_empty: HashSet<PathBuf> = HashSet::new();
    for file in &files {
        for ancestor in file.path.ancestors().skip(1) {
            if ancestor == root || !non_empty.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }

    let file_count = files.len();
    let entries = dirs
        .into_iter()
        .filter(|d| non_empty.contains(d))
        .map(ScanEntry::dir)
        .chain(files);
    let tree = TreeModel::build(root, entries);
    info!(files = file_count, nodes = tree.len(), "scan finished");
    Ok(tree)
}

/// First pass: gather directories and candidate files, enforcing the cap
/// before any file content is read.
fn collect_candidates(
    root: &Path,
    options: &ScanOptions,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>), ScanError> {
    let mut walker = WalkBuilder::new(root);
    walker
        .hidden(false)
        .follow_links(false)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && entry.depth() > 0 && is_ignored_dir(&entry.file_name().to_string_lossy()))
        });
    if options.include_ignored {
        walker.git_ignore(false).git_exclude(false).ignore(false);
    }

    let mut dirs = Vec::new();
    let mut candidates = Vec::new();
    for result in walker.build() {
        let entry = match result {
            Ok(v) => v,
            Err(e) => {
                warn!("error during scan: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.into_path();
        if file_type.is_dir() {
            dirs.push(path);
        } else if file_type.is_file() {
            if is_ignored_file(&file_name_of(&path)) {
                continue;
            }
            candidates.push(path);
            if candidates.len() > options.max_files {
                warn!(limit = options.max_files, "scan aborted: too many files");
                return Err(ScanError::TooManyFiles {
                    limit: options.max_files,
                });
            }
        }
    }
    Ok((dirs, candidates))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRECTORIES.contains(&name)
}

pub fn is_ignored_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    IGNORED_FILE_NAMES.contains(&name) || IGNORED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn has_text_suffix(name: &str) -> bool {
    let lower = name.to_lowercase();
    LIKELY_TEXT_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Extension allow-list first, then a sniff of the leading bytes.
pub fn is_text_file(path: &Path, name: &str) -> bool {
    has_text_suffix(name) || sniff_is_text(path)
}

fn sniff_is_text(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut chunk = Vec::with_capacity(SNIFF_LEN);
    if file.take(SNIFF_LEN as u64).read_to_end(&mut chunk).is_err() {
        return false;
    }
    looks_like_text(&chunk)
}

/// No NUL byte and valid UTF-8, tolerating a code point cut off at the end
/// of the sample.
pub fn looks_like_text(chunk: &[u8]) -> bool {
    if chunk.contains(&0) {
        return false;
    }
    match std::str::from_utf8(chunk) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write(path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().write_all(bytes).unwrap();
    }

    fn names(tree: &TreeModel) -> Vec<String> {
        tree.preorder()
            .into_iter()
            .map(|id| tree.node(id).name.clone())
            .collect()
    }

    #[test]
    fn classification_rules() {
        assert!(is_ignored_dir("node_modules"));
        assert!(!is_ignored_dir("src"));
        assert!(is_ignored_file("photo.JPG"));
        assert!(is_ignored_file(".DS_Store"));
        assert!(!is_ignored_file("main.rs"));
        assert!(has_text_suffix("README"));
        assert!(has_text_suffix("notes.MD"));
        assert!(!has_text_suffix("data.dat"));
    }

    #[test]
    fn sniffing_detects_binary_content() {
        assert!(looks_like_text(b"plain ascii\n"));
        assert!(!looks_like_text(b"bin\0ary"));
        assert!(!looks_like_text(&[0xff, 0xfe, 0x41]));
        // "é" is 0xC3 0xA9; a sample ending after 0xC3 is still text.
        assert!(looks_like_text(&[b'a', 0xc3]));
    }

    #[test]
    fn scan_builds_sorted_tree_of_text_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("proj");
        write(&root.join("b.py"), b"print('b')\n");
        write(&root.join("a.dat"), b"text without a known suffix");
        write(&root.join("blob.dat"), &[1, 2, 0, 3]);
        write(&root.join("logo.png"), b"not really a png");
        write(&root.join("src/main.rs"), b"fn main() {}\n");
        write(&root.join("node_modules/pkg/index.js"), b"x");
        write(&root.join(".git/config"), b"[core]");
        write(&root.join("assets/pic.jpg"), b"jpeg");

        let tree = scan_tree(&root, &ScanOptions::default()).unwrap();
        assert_eq!(names(&tree), vec!["proj", "src", "main.rs", "a.dat", "b.py"]);

        let main = tree.id_of(&root.join("src/main.rs")).unwrap();
        assert_eq!(tree.node(main).size, Some(13));
    }

    #[test]
    fn hidden_text_files_are_kept() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("proj");
        write(&root.join(".editorconfig"), b"root = true\n");
        write(&root.join(".env"), b"SECRET=1\n");

        let tree = scan_tree(&root, &ScanOptions::default()).unwrap();
        assert_eq!(names(&tree), vec!["proj", ".editorconfig"]);
    }

    #[test]
    fn exceeding_the_cap_aborts() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("proj");
        for i in 0..4 {
            write(&root.join(format!("f{}.txt", i)), b"x");
        }
        let options = ScanOptions {
            max_files: 3,
            ..ScanOptions::default()
        };
        let err = scan_tree(&root, &options).unwrap_err();
        assert!(matches!(err, ScanError::TooManyFiles { limit: 3 }));

        let options = ScanOptions {
            max_files: 4,
            ..ScanOptions::default()
        };
        assert!(scan_tree(&root, &options).is_ok());
    }

    #[test]
    fn missing_root_is_rejected() {
        let dir = tempdir().unwrap();
        let err = scan_tree(&dir.path().join("nope"), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[test]
    fn empty_root_yields_lone_root_node() {
        let dir = tempdir().unwrap();
        let tree = scan_tree(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.file_count(), 0);
    }
}
