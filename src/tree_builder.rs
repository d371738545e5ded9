use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};

/// A directory level synthesized from selected file paths.
#[derive(Default)]
struct Level<'a> {
    dirs: BTreeMap<Cow<'a, str>, Level<'a>>,
    files: BTreeSet<Cow<'a, str>>,
}

/// Render the folder diagram for `selected` file paths.
///
/// * Only the selected files and the directories implied by them appear.
/// * The first line is the basename of `scan_root` (the whole path when it
///   has none, e.g. `/`).
/// * At every level directories come before files, each group sorted by name.
/// * Names that are not valid UTF-8 are rendered lossily.
/// * Paths outside `scan_root` are skipped; no usable path yields `""`.
pub fn build_ascii_tree<'a, I>(selected: I, scan_root: &Path) -> String
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut top = Level::default();
    let mut any = false;
    for path in selected {
        let Ok(rel) = path.strip_prefix(scan_root) else {
            continue;
        };
        let parts: Vec<Cow<'a, str>> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect();
        let Some((file, dirs)) = parts.split_last() else {
            continue;
        };
        let mut level = &mut top;
        for dir in dirs {
            level = level.dirs.entry(dir.clone()).or_default();
        }
        level.files.insert(file.clone());
        any = true;
    }
    if !any {
        return String::new();
    }

    let mut lines = vec![root_label(scan_root)];
    render_level(&top, "", &mut lines);
    lines.join("\n")
}

fn root_label(scan_root: &Path) -> String {
    match scan_root.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => scan_root.display().to_string(),
    }
}

fn render_level(level: &Level<'_>, prefix: &str, lines: &mut Vec<String>) {
    let total = level.dirs.len() + level.files.len();
    let mut position = 0;

    for (name, sub) in &level.dirs {
        position += 1;
        let is_last = position == total;
        lines.push(format!("{}{}{}", prefix, connector(is_last), name));
        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        render_level(sub, &child_prefix, lines);
    }
    for name in &level.files {
        position += 1;
        lines.push(format!("{}{}{}", prefix, connector(position == total), name));
    }
}

fn connector(is_last: bool) -> &'static str {
    if is_last { "└── " } else { "├── " }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tree_of(paths: &[&str], root: &str) -> String {
        let owned: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
        build_ascii_tree(owned.iter().map(PathBuf::as_path), Path::new(root))
    }

    #[test]
    fn empty_selection_renders_nothing() {
        assert_eq!(tree_of(&[], "/work/proj"), "");
    }

    #[test]
    fn directories_are_listed_before_files() {
        let out = tree_of(&["/work/proj/a.py", "/work/proj/sub/b.py"], "/work/proj");
        assert_eq!(out, "proj\n├── sub\n│   └── b.py\n└── a.py");
    }

    #[test]
    fn nested_levels_use_continuation_prefixes() {
        let out = tree_of(
            &[
                "/r/proj/dirA/file1.ext",
                "/r/proj/dirA/deeper/x.rs",
                "/r/proj/dirB/y.rs",
                "/r/proj/file2.ext",
            ],
            "/r/proj",
        );
        let expected = [
            "proj",
            "├── dirA",
            "│   ├── deeper",
            "│   │   └── x.rs",
            "│   └── file1.ext",
            "├── dirB",
            "│   └── y.rs",
            "└── file2.ext",
        ]
        .join("\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn last_directory_gets_blank_continuation() {
        let out = tree_of(&["/p/x/only/deep.txt"], "/p/x");
        assert_eq!(out, "x\n└── only\n    └── deep.txt");
    }

    #[test]
    fn names_sort_by_plain_string_order() {
        let out = tree_of(&["/p/b.txt", "/p/B.txt", "/p/a.txt"], "/p");
        assert_eq!(out, "p\n├── B.txt\n├── a.txt\n└── b.txt");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_rendered_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/w/proj");
        let file = root
            .join(OsStr::from_bytes(b"d\xffir"))
            .join("a.txt");
        let out = build_ascii_tree([file.as_path()], root);
        assert_eq!(out, "proj\n└── d\u{fffd}ir\n    └── a.txt");

        let odd_root = Path::new("/w").join(OsStr::from_bytes(b"pr\xffoj"));
        let inside = odd_root.join("b.txt");
        let out = build_ascii_tree([inside.as_path()], &odd_root);
        assert_eq!(out, "pr\u{fffd}oj\n└── b.txt");
    }

    #[test]
    fn filesystem_root_is_labelled_by_its_path() {
        assert_eq!(tree_of(&["/etc/hosts"], "/"), "/\n└── etc\n    └── hosts");
    }

    #[test]
    fn paths_outside_root_are_skipped() {
        assert_eq!(tree_of(&["/elsewhere/a.txt"], "/p"), "");
        assert_eq!(tree_of(&["/elsewhere/a.txt", "/p/b.txt"], "/p"), "p\n└── b.txt");
    }
}
