use crate::tree_builder::build_ascii_tree;
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

/// Shown instead of a document while nothing is selected.
pub const EMPTY_SELECTION_PLACEHOLDER: &str = "Select files from the left to generate a prompt.";

/// Assemble the prompt document for `selected` files.
///
/// Documents are emitted in lexicographic order of the path *string*, not
/// tree order. Paths missing from `contents` contribute an empty body.
pub fn build_document(
    selected: &BTreeSet<PathBuf>,
    contents: &HashMap<PathBuf, String>,
    scan_root: &Path,
) -> String {
    if selected.is_empty() {
        return EMPTY_SELECTION_PLACEHOLDER.to_string();
    }

    let ordered = document_order(selected);
    let structure = build_ascii_tree(ordered.iter().map(|p| p.as_path()), scan_root);
    let base = scan_root.parent().unwrap_or(scan_root);

    let blocks: Vec<String> = ordered
        .iter()
        .map(|path| {
            let content = contents.get(*path).map(String::as_str).unwrap_or("");
            format!(
                "<document path=\"{}\">\n{}\n</document>",
                display_relative(path, base),
                content
            )
        })
        .collect();

    format!(
        "<folder-structure>\n{}\n</folder-structure>\n\n{}",
        structure,
        blocks.join("\n\n")
    )
}

/// Selected paths sorted by their string form.
pub fn document_order(selected: &BTreeSet<PathBuf>) -> Vec<&PathBuf> {
    let mut ordered: Vec<&PathBuf> = selected.iter().collect();
    ordered.sort_by_cached_key(|p| p.to_string_lossy().into_owned());
    ordered
}

/// `path` relative to `base`, always joined with `/`.
fn display_relative(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(paths: &[&str]) -> BTreeSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn empty_selection_yields_placeholder() {
        let out = build_document(&BTreeSet::new(), &HashMap::new(), Path::new("/w/proj"));
        assert_eq!(out, EMPTY_SELECTION_PLACEHOLDER);
    }

    #[test]
    fn document_matches_the_published_layout() {
        let selected = set(&["/w/proj/file2.ext", "/w/proj/dirA/file1.ext"]);
        let mut contents = HashMap::new();
        contents.insert(PathBuf::from("/w/proj/dirA/file1.ext"), "one".to_string());
        contents.insert(PathBuf::from("/w/proj/file2.ext"), "two".to_string());

        let out = build_document(&selected, &contents, Path::new("/w/proj"));
        let expected = "<folder-structure>\n\
                        proj\n\
                        ├── dirA\n\
                        │   └── file1.ext\n\
                        └── file2.ext\n\
                        </folder-structure>\n\
                        \n\
                        <document path=\"proj/dirA/file1.ext\">\n\
                        one\n\
                        </document>\n\
                        \n\
                        <document path=\"proj/file2.ext\">\n\
                        two\n\
                        </document>";
        assert_eq!(out, expected);
    }

    #[test]
    fn documents_follow_string_order_not_component_order() {
        // '-' sorts before '/', so "a-c" precedes "a/b" as strings.
        let selected = set(&["/w/p/a/b.txt", "/w/p/a-c.txt"]);
        let ordered: Vec<_> = document_order(&selected)
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(ordered, vec!["/w/p/a-c.txt", "/w/p/a/b.txt"]);

        let out = build_document(&selected, &HashMap::new(), Path::new("/w/p"));
        let first = out.find("p/a-c.txt").unwrap();
        let second = out.find("p/a/b.txt").unwrap();
        assert!(first < second);
    }

    #[test]
    fn missing_content_renders_empty_body() {
        let selected = set(&["/w/p/x.txt"]);
        let out = build_document(&selected, &HashMap::new(), Path::new("/w/p"));
        assert!(out.ends_with("<document path=\"p/x.txt\">\n\n</document>"));
    }

    #[test]
    fn filesystem_root_keeps_its_diagram() {
        let selected = set(&["/etc/hosts"]);
        let out = build_document(&selected, &HashMap::new(), Path::new("/"));
        assert!(out.starts_with("<folder-structure>\n/\n└── etc\n    └── hosts\n</folder-structure>"));
        assert!(out.contains("<document path=\"etc/hosts\">"));
    }

    #[cfg(unix)]
    #[test]
    fn diagram_and_blocks_agree_on_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = PathBuf::from("/w/proj");
        let file = root.join(OsStr::from_bytes(b"d\xffir")).join("a.txt");
        let selected: BTreeSet<PathBuf> = [file].into_iter().collect();
        let out = build_document(&selected, &HashMap::new(), &root);
        assert!(out.contains("proj\n└── d\u{fffd}ir\n    └── a.txt"));
        assert!(out.contains("<document path=\"proj/d\u{fffd}ir/a.txt\">"));
    }
}
