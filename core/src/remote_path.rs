//! Client-side path algebra for remote filesystems.
//!
//! Webshell requests are independent round trips; the remote keeps no
//! working-directory state between them. "cd" is therefore emulated here:
//! the caller holds the current directory as a [`RemotePath`] and derives
//! the next one with [`RemotePath::resolve`]. The model is total (every
//! input resolves to some path, never an error) and it never touches a
//! shell, it is pure string algebra.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Path syntax dialect of the remote host.
///
/// Inferred once from the first path string observed for a host and then
/// carried inside every derived [`RemotePath`], so navigation can never
/// silently switch dialects mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStyle {
    Posix,
    Windows,
}

impl PathStyle {
    /// A string is Windows-styled iff it starts with a drive prefix
    /// (`X:\` or `X:/`); everything else is treated as POSIX.
    pub fn detect(input: &str) -> Self {
        if drive_prefix(input).is_some() {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }
}

fn drive_prefix(input: &str) -> Option<char> {
    let mut chars = input.chars();
    let drive = chars.next()?;
    if !drive.is_ascii_alphabetic() || chars.next() != Some(':') {
        return None;
    }
    matches!(chars.next(), Some('/' | '\\')).then_some(drive)
}

/// An ordered sequence of path segments plus the style they belong to.
///
/// Windows paths always carry a drive and are absolute by construction
/// (the drive prefix is what classifies a string as Windows in the first
/// place). POSIX paths may be relative.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    style: PathStyle,
    drive: Option<char>,
    absolute: bool,
    segments: Vec<String>,
}

impl RemotePath {
    /// Parse a path string, inferring its style.
    ///
    /// Repeated and trailing separators collapse, `.` segments drop, and
    /// `..` segments resolve immediately (saturating at the root). The
    /// empty string parses to an empty POSIX-relative path.
    pub fn parse(input: &str) -> Self {
        if let Some(drive) = drive_prefix(input) {
            let mut path = Self {
                style: PathStyle::Windows,
                drive: Some(drive),
                absolute: true,
                segments: Vec::new(),
            };
            path.push_relative(&input[2..]);
            return path;
        }
        let mut path = Self {
            style: PathStyle::Posix,
            drive: None,
            absolute: input.starts_with('/'),
            segments: Vec::new(),
        };
        path.push_relative(input);
        path
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True for the POSIX root `/` or a bare drive root like `C:\`.
    pub fn is_root(&self) -> bool {
        self.absolute && self.segments.is_empty()
    }

    /// Resolve a navigation entry against this directory.
    ///
    /// `.` (or an empty entry) is the identity, `..` is [`Self::parent`],
    /// and an entry that is absolute for this path's style replaces the
    /// whole path. Anything else, including entries with embedded
    /// separators, is appended as a relative (possibly multi-segment)
    /// entry. An entry that is absolute only for the *other* style is
    /// deliberately not treated as absolute here; it normalizes as a
    /// relative entry instead of desynchronizing the tracked style.
    pub fn resolve(&self, entry: &str) -> Self {
        match entry {
            "" | "." => return self.clone(),
            ".." => return self.parent(),
            _ => {}
        }
        let absolute_for_style = match self.style {
            PathStyle::Posix => entry.starts_with('/'),
            PathStyle::Windows => drive_prefix(entry).is_some(),
        };
        if absolute_for_style {
            return Self::parse(entry);
        }
        let mut next = self.clone();
        next.push_relative(entry);
        next
    }

    /// Parent directory; the parent of a root is that same root.
    pub fn parent(&self) -> Self {
        let mut parent = self.clone();
        parent.segments.pop();
        parent
    }

    fn push_relative(&mut self, entry: &str) {
        let is_separator = |c: char| match self.style {
            PathStyle::Posix => c == '/',
            PathStyle::Windows => c == '/' || c == '\\',
        };
        for segment in entry.split(is_separator) {
            match segment {
                "" | "." => {}
                ".." => {
                    self.segments.pop();
                }
                other => self.segments.push(other.to_string()),
            }
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.style, self.drive) {
            (PathStyle::Windows, Some(drive)) => {
                write!(f, "{drive}:\\")?;
                write!(f, "{}", self.segments.join("\\"))
            }
            _ => {
                if self.absolute {
                    write!(f, "/")?;
                } else if self.segments.is_empty() {
                    return write!(f, ".");
                }
                write!(f, "{}", self.segments.join("/"))
            }
        }
    }
}

impl FromStr for RemotePath {
    type Err = Infallible;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(input))
    }
}

impl From<&str> for RemotePath {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn style_detection() {
        assert_eq!(PathStyle::detect("C:\\Users\\x"), PathStyle::Windows);
        assert_eq!(PathStyle::detect("d:/srv"), PathStyle::Windows);
        assert_eq!(PathStyle::detect("/home/x"), PathStyle::Posix);
        assert_eq!(PathStyle::detect("relative/x"), PathStyle::Posix);
        // A colon without the separator is not a drive prefix.
        assert_eq!(PathStyle::detect("C:notadrive"), PathStyle::Posix);
        assert_eq!(PathStyle::detect("AB:\\x"), PathStyle::Posix);
    }

    #[test]
    fn dot_is_identity() {
        for raw in ["/var/www", "C:\\inetpub", "relative/x", "/"] {
            let path = RemotePath::parse(raw);
            assert_eq!(path.resolve("."), path);
            assert_eq!(path.resolve(""), path);
        }
    }

    #[test]
    fn append_then_pop_is_identity_off_root() {
        let path = RemotePath::parse("/var/www");
        assert_eq!(path.resolve("foo").resolve(".."), path);
    }

    #[test]
    fn parent_of_root_is_root() {
        let root = RemotePath::parse("/");
        assert!(root.is_root());
        assert_eq!(root.resolve(".."), root);
        assert_eq!(root.resolve("..").resolve(".."), root);

        let drive = RemotePath::parse("C:\\");
        assert!(drive.is_root());
        assert_eq!(drive.resolve(".."), drive);
    }

    #[test]
    fn absolute_entry_replaces_wholesale() {
        let path = RemotePath::parse("/var/www/html");
        assert_eq!(path.resolve("/etc"), RemotePath::parse("/etc"));

        let win = RemotePath::parse("C:\\inetpub\\wwwroot");
        assert_eq!(win.resolve("D:\\data"), RemotePath::parse("D:\\data"));
    }

    #[test]
    fn navigation_appends_with_style_separator() {
        let path = RemotePath::parse("/var/www").resolve("uploads");
        assert_eq!(path.to_string(), "/var/www/uploads");

        let win = RemotePath::parse("C:\\inetpub").resolve("wwwroot");
        assert_eq!(win.to_string(), "C:\\inetpub\\wwwroot");
    }

    #[test]
    fn repeated_and_trailing_separators_collapse() {
        assert_eq!(RemotePath::parse("/var//www/").to_string(), "/var/www");
        assert_eq!(
            RemotePath::parse("C:\\inetpub\\\\wwwroot\\").to_string(),
            "C:\\inetpub\\wwwroot"
        );
        // Windows accepts both separators interchangeably.
        assert_eq!(
            RemotePath::parse("C:/inetpub/wwwroot").to_string(),
            "C:\\inetpub\\wwwroot"
        );
    }

    #[test]
    fn embedded_separators_append_as_multi_segment_entry() {
        let path = RemotePath::parse("/srv").resolve("a/b/../c");
        assert_eq!(path.to_string(), "/srv/a/c");
    }

    #[test]
    fn cross_style_absolute_entry_stays_relative() {
        // A drive-prefixed entry on a POSIX path is a single odd-looking
        // segment, not an absolute jump: backslash is a legal POSIX
        // filename character.
        let path = RemotePath::parse("/srv").resolve("C:\\x");
        assert_eq!(path.style(), PathStyle::Posix);
        assert_eq!(path.to_string(), "/srv/C:\\x");

        // A leading slash on a Windows path is not a drive prefix either.
        let win = RemotePath::parse("C:\\inetpub").resolve("/wwwroot");
        assert_eq!(win.to_string(), "C:\\inetpub\\wwwroot");
    }

    #[test]
    fn dotdot_beyond_root_saturates() {
        let path = RemotePath::parse("/var").resolve("..").resolve("..");
        assert_eq!(path, RemotePath::parse("/"));

        let win = RemotePath::parse("C:\\a\\b");
        assert_eq!(
            win.resolve("..").resolve("..").resolve(".."),
            RemotePath::parse("C:\\")
        );
    }

    #[test]
    fn empty_current_directory_is_workable() {
        let empty = RemotePath::parse("");
        assert_eq!(empty.style(), PathStyle::Posix);
        assert!(!empty.is_root());
        assert_eq!(empty.to_string(), ".");
        assert_eq!(empty.resolve("x").to_string(), "x");
        // `..` on an empty relative path has nothing to pop.
        assert_eq!(empty.resolve(".."), empty);
    }

    #[test]
    fn relative_paths_render_without_leading_slash() {
        assert_eq!(RemotePath::parse("relative/x").to_string(), "relative/x");
    }
}
