use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Serialize, Serializer};
use url::Url;

/// Where a module lives. Decided once when an entry point is parsed or a
/// specifier is resolved, and carried through readers and sinks as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    Path(Arc<Path>),
    Url(Url),
}

impl Location {
    /// Parses `text` as an `http(s)` URL, a `file:` URL or a filesystem path.
    /// Relative paths are made absolute against `cwd` and lexically cleaned.
    pub fn parse(text: &str, cwd: &Path) -> Self {
        if let Ok(url) = Url::parse(text) {
            match url.scheme() {
                "http" | "https" => return Location::Url(url),
                "file" => {
                    if let Ok(path) = url.to_file_path() {
                        return Location::from_path(&path, cwd);
                    }
                }
                // drive letters and bundler namespaces parse as schemes too
                _ => {}
            }
        }
        Location::from_path(Path::new(text), cwd)
    }

    pub fn from_path(path: &Path, cwd: &Path) -> Self {
        Location::Path(path_clean::clean(cwd.join(path)).into())
    }

    /// Resolves symlinks for paths that exist, so entry points key the same
    /// way as resolver output. Missing paths and URLs are returned unchanged.
    pub fn canonicalize(self) -> Self {
        match self {
            Location::Path(path) => match dunce::canonicalize(&path) {
                Ok(canonical) => Location::Path(canonical.into()),
                Err(_) => Location::Path(path),
            },
            url @ Location::Url(_) => url,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Location::Path(path) => Some(path),
            Location::Url(_) => None,
        }
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Location::Path(_) => None,
            Location::Url(url) => Some(url),
        }
    }

    /// Path used to guess the source type: the file path itself, or the
    /// path component of a URL.
    pub fn source_path(&self) -> PathBuf {
        match self {
            Location::Path(path) => path.to_path_buf(),
            Location::Url(url) => PathBuf::from(url.path()),
        }
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path.into())
    }
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        Location::Url(url)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path(path) => write!(f, "{}", path.display()),
            Location::Url(url) => f.write_str(url.as_str()),
        }
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Relative or absolute path form, as opposed to a bare package name.
pub fn is_local_specifier(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

const NODE_BUILTIN_SUBPATHS: &[&str] = &[
    "assert/strict",
    "dns/promises",
    "fs/promises",
    "inspector/promises",
    "path/posix",
    "path/win32",
    "readline/promises",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "timers/promises",
    "util/types",
];

/// Whether `specifier` names a Node built-in, including `node:` forms and
/// the subpaths Node exposes such as `fs/promises`.
pub fn is_builtin_module(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    if specifier.contains('/') {
        NODE_BUILTIN_SUBPATHS.contains(&specifier)
    } else {
        NODE_BUILTINS.contains(&specifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("./a", true)]
    #[test_case("../lib/b.js", true)]
    #[test_case("/abs/c", true)]
    #[test_case(".", true)]
    #[test_case("lodash", false)]
    #[test_case("@scope/pkg/sub", false)]
    #[test_case("https://esm.sh/react", false)]
    fn test_is_local_specifier(specifier: &str, expected: bool) {
        assert_eq!(is_local_specifier(specifier), expected);
    }

    #[test_case("fs", true)]
    #[test_case("fs/promises", true)]
    #[test_case("path/posix", true)]
    #[test_case("stream/web", true)]
    #[test_case("fs/anything", false)]
    #[test_case("url/x", false)]
    #[test_case("fs/", false)]
    #[test_case("node:path", true)]
    #[test_case("node:test", true)]
    #[test_case("worker_threads", true)]
    #[test_case("lodash", false)]
    #[test_case("./fs", false)]
    #[test_case("fsevents", false)]
    fn test_is_builtin_module(specifier: &str, expected: bool) {
        assert_eq!(is_builtin_module(specifier), expected);
    }

    #[test]
    fn test_parse_relative_path() {
        let location = Location::parse("src/../lib/./entry.js", Path::new("/work"));
        assert_eq!(location, Location::Path(Path::new("/work/lib/entry.js").into()));
    }

    #[test]
    fn test_parse_absolute_path_ignores_cwd() {
        let location = Location::parse("/usr/someFolder/entry", Path::new("/work"));
        assert_eq!(location.as_path(), Some(Path::new("/usr/someFolder/entry")));
    }

    #[test]
    fn test_parse_url() {
        let location = Location::parse("http://localhost:9000/entry.js", Path::new("/work"));
        assert_eq!(
            location.as_url().map(Url::as_str),
            Some("http://localhost:9000/entry.js")
        );
        assert_eq!(location.source_path(), PathBuf::from("/entry.js"));
        assert_eq!(location.to_string(), "http://localhost:9000/entry.js");
    }

    #[test]
    fn test_canonicalize_missing_path_is_unchanged() {
        let location = Location::parse("/definitely/not/here.js", Path::new("/"));
        assert_eq!(location.clone().canonicalize(), location);
    }

    #[test]
    fn test_serializes_as_string() {
        let location = Location::parse("/a/b.js", Path::new("/"));
        assert_eq!(serde_json::to_string(&location).unwrap(), "\"/a/b.js\"");
    }
}
