// Lightweight path display wrapper that renders with forward slashes.
// Avoids allocating strings until actually formatted for logs.
pub(crate) struct DisplayPath<'a>(pub(crate) &'a std::path::Path);

impl<'a> std::fmt::Display for DisplayPath<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.to_string_lossy().to_string();
        let out = normalize_path(&s, true);
        f.write_str(&out)
    }
}

pub(crate) fn display_path(p: &std::path::Path) -> DisplayPath<'_> {
    DisplayPath(p)
}

/// Normalize a path-like string for internal use:
/// - converts backslashes to forward slashes
/// - collapses repeated slashes
/// - optionally preserves a trailing slash
///
/// Relative paths inside a selection and archive entry names are always built
/// through this so grouping behaves the same on Windows.
pub fn normalize_path(p: &str, preserve_trailing_slash: bool) -> String {
    if p.is_empty() {
        return String::new();
    }
    let mut s = p.replace('\\', "/");
    while s.contains("//") {
        s = s.replace("//", "/");
    }
    if !preserve_trailing_slash {
        // Strip trailing slashes, but keep root "/"
        while s.len() > 1 && s.ends_with('/') {
            s.pop();
        }
    }
    s
}

/// Split a normalized relative path into its non-empty segments.
pub(crate) fn path_segments(rel: &str) -> Vec<&str> {
    rel.split('/').filter(|s| !s.is_empty() && *s != ".").collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_empty() {
        assert_eq!(normalize_path("", true), "");
        assert_eq!(normalize_path("", false), "");
    }

    #[test]
    fn normalize_windows_separators() {
        assert_eq!(normalize_path("clips\\intro\\a.mp4", false), "clips/intro/a.mp4");
    }

    #[test]
    fn preserve_and_strip_trailing_slash() {
        assert_eq!(normalize_path("/a/b/", true), "/a/b/");
        assert_eq!(normalize_path("/a/b/", false), "/a/b");
        assert_eq!(normalize_path("/", false), "/");
    }

    #[test]
    fn collapse_repeated_slashes() {
        assert_eq!(normalize_path("clips//intro///a.mp4", false), "clips/intro/a.mp4");
    }

    #[test]
    fn segments_skip_empty_and_dot() {
        assert_eq!(path_segments("clips/./intro//a.mp4"), vec!["clips", "intro", "a.mp4"]);
    }

    #[test]
    fn display_path_uses_normalize() {
        use std::path::Path;
        let p = Path::new("C:\\some\\path\\");
        assert_eq!(format!("{}", display_path(p)), "C:/some/path/");
    }
}
