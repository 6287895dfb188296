//! Rebuilds the import graph from a bundler metafile (esbuild's
//! `--metafile` shape) instead of reading and parsing sources.

use std::{
    convert::Infallible,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    edge::ImportEdge,
    hash::{HashMap, IndexMap},
    location::{is_builtin_module, Location},
    walk::{DiscoverImports, DiscoveredImport, StopTraversing, Walk},
};

#[derive(Debug, thiserror::Error)]
pub enum MetafileError {
    #[error("failed to read metafile {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid metafile: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metafile {
    /// Keyed by module path, usually relative to the bundler's working
    /// directory.
    pub inputs: IndexMap<String, MetafileInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetafileInput {
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub imports: Vec<MetafileImport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetafileImport {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub external: bool,
    /// The specifier as written, when the bundler records it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

impl Metafile {
    pub fn from_json(json: &str) -> Result<Self, MetafileError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, MetafileError> {
        let json = std::fs::read_to_string(path).map_err(|source| MetafileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Metafile inputs indexed by normalized location. Keys and import paths
/// go through the same `cwd`-relative normalization, otherwise lookups
/// would silently miss.
pub struct MetafileImports {
    imports_by_location: HashMap<Location, Vec<MetafileImport>>,
    cwd: PathBuf,
}

impl MetafileImports {
    pub fn new(metafile: &Metafile, cwd: &Path) -> Self {
        let imports_by_location = metafile
            .inputs
            .iter()
            .map(|(key, input)| (Location::parse(key, cwd), input.imports.clone()))
            .collect();
        Self {
            imports_by_location,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn location(&self, path: &str) -> Location {
        Location::parse(path, &self.cwd)
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.imports_by_location.contains_key(location)
    }
}

impl DiscoverImports for MetafileImports {
    type Error = Infallible;

    fn discover_imports(&self, importer: &Location) -> Result<Vec<DiscoveredImport>, Self::Error> {
        let Some(imports) = self.imports_by_location.get(importer) else {
            trace!(%importer, "not in metafile");
            return Ok(vec![]);
        };
        Ok(imports
            .iter()
            .filter_map(|import| {
                let specifier = import.original.as_deref().unwrap_or(&import.path);
                if is_builtin_module(specifier) {
                    return None;
                }
                let target = self.location(&import.path);
                // unknown to the bundler, e.g. externals: an unresolved leaf
                let resolved = self.contains(&target).then_some(target);
                Some(DiscoveredImport {
                    specifier: specifier.to_owned(),
                    resolved,
                    local: true,
                })
            })
            .collect())
    }
}

/// Walks the graph recorded in `metafile` from `entry`. Both `entry` and the
/// metafile's paths are interpreted relative to `cwd`, the directory the
/// bundler ran in.
pub fn metafile_edges(
    metafile: &Metafile,
    entry: &str,
    cwd: &Path,
    stop_traversing: Option<StopTraversing>,
) -> Walk<MetafileImports> {
    let imports = MetafileImports::new(metafile, cwd);
    let entry = imports.location(entry);
    Walk::new([entry], imports, stop_traversing)
}

/// Collects [`metafile_edges`]; reconstruction cannot fail.
pub fn metafile_to_edges(
    metafile: &Metafile,
    entry: &str,
    cwd: &Path,
    stop_traversing: Option<StopTraversing>,
) -> Vec<ImportEdge> {
    metafile_edges(metafile, entry, cwd, stop_traversing)
        .map(|edge| match edge {
            Ok(edge) => edge,
            Err(never) => match never {},
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traverse::{walk_es_modules_sync, TraverseOptions};
    use std::{fs, sync::Arc};
    use tempfile::TempDir;

    fn simple_metafile() -> Metafile {
        Metafile::from_json(
            r#"{
                "outputs": {},
                "inputs": {
                    "entry": { "bytes": 0, "imports": [{ "path": "some-file" }] },
                    "some-file": { "bytes": 0, "imports": [{ "path": "other-file" }] },
                    "other-file": { "bytes": 0, "imports": [] }
                }
            }"#,
        )
        .unwrap()
    }

    fn triples(edges: &[ImportEdge]) -> Vec<(String, String, Option<String>)> {
        edges
            .iter()
            .map(|edge| {
                (
                    edge.importer.to_string(),
                    edge.import_specifier.clone(),
                    edge.resolved.as_ref().map(ToString::to_string),
                )
            })
            .collect()
    }

    #[test]
    fn test_relative_keys_are_normalized_against_cwd() {
        let edges = metafile_to_edges(
            &simple_metafile(),
            "/usr/someFolder/entry",
            Path::new("/usr/someFolder"),
            None,
        );
        assert_eq!(
            triples(&edges),
            vec![
                (
                    "/usr/someFolder/entry".to_owned(),
                    "some-file".to_owned(),
                    Some("/usr/someFolder/some-file".to_owned())
                ),
                (
                    "/usr/someFolder/some-file".to_owned(),
                    "other-file".to_owned(),
                    Some("/usr/someFolder/other-file".to_owned())
                ),
            ]
        );
    }

    #[test]
    fn test_entry_relative_to_cwd() {
        let cwd = Path::new("/usr/someFolder");
        let edges = metafile_to_edges(&simple_metafile(), "./entry", cwd, None);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_wrong_cwd_finds_nothing() {
        let edges = metafile_to_edges(
            &simple_metafile(),
            "/usr/someFolder/entry",
            Path::new("/elsewhere"),
            None,
        );
        assert!(edges.is_empty());
    }

    #[test]
    fn test_missing_inputs_and_builtins() {
        let metafile = Metafile::from_json(
            r#"{
                "inputs": {
                    "src/entry.js": {
                        "bytes": 10,
                        "imports": [
                            { "path": "src/a.js", "kind": "import-statement", "original": "./a" },
                            { "path": "react", "kind": "import-statement", "external": true },
                            { "path": "node:fs", "kind": "import-statement", "external": true },
                            { "path": "src/a.js", "kind": "dynamic-import", "original": "./a.js" }
                        ]
                    },
                    "src/a.js": {
                        "bytes": 10,
                        "imports": [
                            { "path": "src/entry.js", "kind": "import-statement", "original": "./entry" }
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        let edges = metafile_to_edges(&metafile, "src/entry.js", Path::new("/repo"), None);
        assert_eq!(
            triples(&edges),
            vec![
                (
                    "/repo/src/entry.js".to_owned(),
                    "./a".to_owned(),
                    Some("/repo/src/a.js".to_owned())
                ),
                (
                    "/repo/src/a.js".to_owned(),
                    "./entry".to_owned(),
                    Some("/repo/src/entry.js".to_owned())
                ),
                ("/repo/src/entry.js".to_owned(), "react".to_owned(), None),
                (
                    "/repo/src/entry.js".to_owned(),
                    "./a.js".to_owned(),
                    Some("/repo/src/a.js".to_owned())
                ),
            ]
        );
    }

    #[test]
    fn test_stop_traversing_in_node_modules() {
        let metafile = Metafile::from_json(
            r#"{
                "inputs": {
                    "entry.js": { "imports": [{ "path": "node_modules/pkg/index.js", "original": "pkg" }] },
                    "node_modules/pkg/index.js": { "imports": [{ "path": "node_modules/pkg/dep.js", "original": "./dep" }] },
                    "node_modules/pkg/dep.js": { "imports": [] }
                }
            }"#,
        )
        .unwrap();
        let stop: StopTraversing =
            Arc::new(|location: &Location| location.to_string().contains("node_modules"));
        let edges = metafile_to_edges(&metafile, "entry.js", Path::new("/repo"), Some(stop));
        assert_eq!(edges.len(), 1);
        assert!(edges
            .iter()
            .all(|edge| !edge.importer.to_string().contains("node_modules")));
    }

    #[test]
    fn test_invalid_metafile() {
        assert!(matches!(
            Metafile::from_json(r#"{ "inputs": [] }"#),
            Err(MetafileError::Json(_))
        ));
        assert!(matches!(
            Metafile::from_path(Path::new("/definitely/not/here/meta.json")),
            Err(MetafileError::Io { .. })
        ));
    }

    #[test]
    fn test_matches_live_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(temp_dir.path()).unwrap();
        for (path, content) in [
            ("entry.js", "import './a';\nimport './b';\n"),
            ("a.js", "import './c';\n"),
            ("b.js", "import './c';\n"),
            ("c.js", "import './a';\n"),
        ] {
            fs::write(root.join(path), content).unwrap();
        }
        let metafile = Metafile::from_json(
            r#"{
                "inputs": {
                    "entry.js": { "imports": [
                        { "path": "a.js", "original": "./a" },
                        { "path": "b.js", "original": "./b" }
                    ] },
                    "a.js": { "imports": [{ "path": "c.js", "original": "./c" }] },
                    "b.js": { "imports": [{ "path": "c.js", "original": "./c" }] },
                    "c.js": { "imports": [{ "path": "a.js", "original": "./a" }] }
                }
            }"#,
        )
        .unwrap();
        let meta_path = root.join("meta.json");
        fs::write(&meta_path, serde_json::to_string(&metafile).unwrap()).unwrap();
        let metafile = Metafile::from_path(&meta_path).unwrap();

        let mut from_metafile = metafile_to_edges(&metafile, "entry.js", &root, None);
        let mut live = walk_es_modules_sync(TraverseOptions::new([Location::from(
            root.join("entry.js"),
        )]))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
        from_metafile.sort();
        live.sort();
        assert_eq!(live.len(), 5);
        assert_eq!(from_metafile, live);
    }
}
