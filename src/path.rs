//! Archive path parsing and composition (component F): `alias:/a/b/c` paths,
//! separator normalization, split/join/basename/dirname.
//!
//! Grounded on `original_source`'s `SgaPathResolver`.

const SEP: char = '/';

/// A parsed archive path: an optional drive alias plus a `/`-separated,
/// `\`-normalized rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgaPath {
    pub alias: Option<String>,
    pub rest: String,
}

/// Replace `\` with `/`.
pub fn fix_separator(path: &str) -> String {
    path.replace('\\', "/")
}

/// Split `path` at the first `:` into `(alias, rest)`; `alias` is `None` if
/// there is no `:`.
pub fn parse(path: &str) -> SgaPath {
    match path.split_once(':') {
        Some((alias, rest)) => SgaPath {
            alias: Some(alias.to_string()),
            rest: rest.to_string(),
        },
        None => SgaPath {
            alias: None,
            rest: path.to_string(),
        },
    }
}

/// Split a (separator-normalized) path into its `/`-delimited parts. A
/// leading separator is preserved as a literal `"/"` first element.
pub fn split_parts(path: &str) -> Vec<String> {
    let path = fix_separator(path);
    let mut parts: Vec<String> = path.split(SEP).map(str::to_string).collect();
    if let Some(first) = parts.first_mut() {
        if first.is_empty() && path.starts_with(SEP) {
            *first = SEP.to_string();
        }
    }
    parts
}

/// Join parts with `/`, collapsing duplicate separators at the joins. A
/// part beginning with `/` (or the first part, if `result` is still empty)
/// replaces whatever has been accumulated so far — this is how an absolute
/// part in the middle of a join resets to root, mirroring the Python
/// resolver's behavior.
pub fn join(parts: &[&str]) -> String {
    let mut result = String::new();
    for raw in parts {
        let part = fix_separator(raw);
        if part.is_empty() {
            continue;
        }
        if part.starts_with(SEP) || result.is_empty() {
            result = part;
        } else if result.ends_with(SEP) {
            result.push_str(&part);
        } else {
            result.push(SEP);
            result.push_str(&part);
        }
    }
    result
}

/// Split into `(parent, basename)`. `basename` of the root path is `""`.
pub fn split(path: &str) -> (String, String) {
    let parts = split_parts(path);
    match parts.split_last() {
        Some((last, init)) => {
            let init_refs: Vec<&str> = init.iter().map(String::as_str).collect();
            (join(&init_refs), last.clone())
        }
        None => (String::new(), path.to_string()),
    }
}

pub fn basename(path: &str) -> String {
    split(path).1
}

pub fn dirname(path: &str) -> String {
    split(path).0
}

/// Build a canonical path string from parts, optionally prefixed with a
/// drive alias. When an alias is given, the result always has a leading
/// `/` after the `:`.
pub fn build(parts: &[&str], alias: Option<&str>) -> String {
    let full = join(parts);
    match alias {
        Some(alias) => {
            let full = if full.is_empty() {
                SEP.to_string()
            } else if !full.starts_with(SEP) {
                format!("{SEP}{full}")
            } else {
                full
            };
            format!("{alias}:{full}")
        }
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_first_colon() {
        let p = parse("data:/a/b");
        assert_eq!(p.alias.as_deref(), Some("data"));
        assert_eq!(p.rest, "/a/b");
    }

    #[test]
    fn parse_with_no_alias() {
        let p = parse("/a/b");
        assert_eq!(p.alias, None);
        assert_eq!(p.rest, "/a/b");
    }

    #[test]
    fn normalizes_backslashes() {
        assert_eq!(fix_separator(r"a\b\c"), "a/b/c");
    }

    #[test]
    fn split_basename_dirname() {
        assert_eq!(split("/a/b/c"), ("/a/b".to_string(), "c".to_string()));
        assert_eq!(basename("/"), "");
        assert_eq!(dirname("/a"), "/");
    }

    #[test]
    fn build_drive_root() {
        assert_eq!(build(&[], Some("data")), "data:/");
        assert_eq!(build(&["x", "hello.txt"], Some("data")), "data:/x/hello.txt");
    }
}
