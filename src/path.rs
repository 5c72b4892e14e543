//! PathModel — classifies FUSE paths into the four shapes YTFS understands.
//!
//! A path is split on `/` into at most two non-empty segments. A leading
//! space on the second segment marks a control file (` next`/` prev`);
//! anything else with a leading space at open time is invalid.

use std::path::Path;

/// Direction requested by a control-file read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlDirection {
    Next,
    Prev,
}

/// Classification of a FUSE path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// `/`
    Root,
    /// `/<query>`
    SearchDir { query: String },
    /// `/<query>/<name>` where `name` has no leading space.
    ResultFile { query: String, name: String },
    /// `/<query>/<space><action>` where `action` is recognized.
    ControlFile { query: String, direction: ControlDirection },
    /// Anything else: too deep, empty, malformed, or an unrecognized
    /// control action.
    Invalid,
}

/// Media container extensions recognized and stripped before lookup.
const KNOWN_EXTENSIONS: &[&str] = &[".m4a", ".mp3", ".webm", ".mp4", ".mkv", ".opus"];

/// Display name of the "page forward" control file.
pub const CONTROL_NEXT: &str = " next";
/// Display name of the "page backward" control file.
pub const CONTROL_PREV: &str = " prev";

/// Strips a single recognized trailing extension, if present.
pub fn strip_extension(name: &str) -> &str {
    for ext in KNOWN_EXTENSIONS {
        if let Some(stripped) = name.strip_suffix(ext) {
            return stripped;
        }
    }
    name
}

/// Splits `path` into its non-empty `/`-separated segments, rejecting
/// anything that doesn't start with `/` or that has more than two segments.
fn segments(path: &Path) -> Option<Vec<String>> {
    let raw = path.to_str()?;
    if !raw.starts_with('/') {
        return None;
    }
    let parts: Vec<String> = raw
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect();
    if parts.len() > 2 {
        return None;
    }
    Some(parts)
}

/// Classifies `path`. `name` arguments elsewhere in the crate (e.g. as
/// passed by `fuser`'s `lookup`/`open`) should already be extension-stripped
/// by the caller via [`strip_extension`]; `classify` itself performs no
/// stripping since it only ever sees the already-decomposed path.
pub fn classify(path: &Path) -> PathKind {
    let parts = match segments(path) {
        Some(parts) => parts,
        None => return PathKind::Invalid,
    };

    match parts.as_slice() {
        [] => PathKind::Root,
        [query] => PathKind::SearchDir { query: query.clone() },
        [query, name] => {
            if name.starts_with(' ') {
                if name == CONTROL_NEXT {
                    PathKind::ControlFile { query: query.clone(), direction: ControlDirection::Next }
                } else if name == CONTROL_PREV {
                    PathKind::ControlFile { query: query.clone(), direction: ControlDirection::Prev }
                } else {
                    PathKind::Invalid
                }
            } else {
                PathKind::ResultFile { query: query.clone(), name: strip_extension(name).to_string() }
            }
        }
        _ => PathKind::Invalid,
    }
}

/// Classifies a two-segment `(query, name)` pair directly, for callers that
/// already have the parent query and a bare child name (e.g. `lookup`).
pub fn classify_entry(query: &str, name: &str) -> PathKind {
    if name.starts_with(' ') {
        if name == CONTROL_NEXT {
            PathKind::ControlFile { query: query.to_string(), direction: ControlDirection::Next }
        } else if name == CONTROL_PREV {
            PathKind::ControlFile { query: query.to_string(), direction: ControlDirection::Prev }
        } else {
            PathKind::Invalid
        }
    } else {
        PathKind::ResultFile { query: query.to_string(), name: strip_extension(name).to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_root() {
        assert_eq!(classify(Path::new("/")), PathKind::Root);
    }

    #[test]
    fn classifies_search_dir() {
        assert_eq!(
            classify(Path::new("/cats")),
            PathKind::SearchDir { query: "cats".to_string() }
        );
        assert_eq!(
            classify(Path::new("/cats/")),
            PathKind::SearchDir { query: "cats".to_string() }
        );
    }

    #[test]
    fn classifies_result_file_and_strips_extension() {
        assert_eq!(
            classify(Path::new("/cats/funny cat.m4a")),
            PathKind::ResultFile { query: "cats".to_string(), name: "funny cat".to_string() }
        );
    }

    #[test]
    fn classifies_control_files() {
        assert_eq!(
            classify(Path::new("/cats/ next")),
            PathKind::ControlFile {
                query: "cats".to_string(),
                direction: ControlDirection::Next
            }
        );
        assert_eq!(
            classify(Path::new("/cats/ prev")),
            PathKind::ControlFile {
                query: "cats".to_string(),
                direction: ControlDirection::Prev
            }
        );
    }

    #[test]
    fn rejects_unrecognized_control_action() {
        assert_eq!(classify(Path::new("/cats/ bogus")), PathKind::Invalid);
    }

    #[test]
    fn rejects_too_deep_paths() {
        assert_eq!(classify(Path::new("/cats/item/extra")), PathKind::Invalid);
    }

    #[test]
    fn round_trips_every_valid_class() {
        for (path, expect_roundtrip) in [
            ("/", PathKind::Root),
            ("/cats", PathKind::SearchDir { query: "cats".into() }),
            (
                "/cats/item",
                PathKind::ResultFile { query: "cats".into(), name: "item".into() },
            ),
            (
                "/cats/ next",
                PathKind::ControlFile { query: "cats".into(), direction: ControlDirection::Next },
            ),
        ] {
            assert_eq!(classify(Path::new(path)), expect_roundtrip);
        }
    }
}
