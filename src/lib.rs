//! Static import graph discovery for ECMAScript module programs.
//!
//! Starting from one or more entry modules, every import specifier is
//! resolved and reported as an [`ImportEdge`]; local imports are followed
//! until the graph is exhausted. Edges come from either re-parsing sources
//! ([`walk_es_modules_sync`], [`traverse_es_modules`]) or a bundler
//! metafile ([`metafile_edges`]).
//!
//! ```no_run
//! use esm_walker::{walk_es_modules_sync, Location, TraverseOptions};
//!
//! let cwd = std::env::current_dir()?;
//! let options = TraverseOptions::new([Location::parse("src/index.ts", &cwd)])
//!     .stop_traversing(|location| location.to_string().contains("node_modules"));
//! for edge in walk_es_modules_sync(options)? {
//!     let edge = edge?;
//!     println!("{} imports {:?}", edge.importer, edge.import_specifier);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod edge;
mod hash;
mod js_resolver;
mod location;
mod metafile;
mod reader;
mod sink;
mod traverse;
mod walk;

pub use edge::ImportEdge;
pub use js_resolver::{
    default_resolve_options, ExtractSpecifiers, FsResolver, OsFileSystem, OxcExtractor,
    ParseError, Resolve, UrlResolver,
};
pub use location::{is_builtin_module, is_local_specifier, Location};
pub use metafile::{
    metafile_edges, metafile_to_edges, Metafile, MetafileError, MetafileImport, MetafileImports,
    MetafileInput,
};
pub use reader::{AsyncReadSource, FsReader, ReadError, ReadSource, UrlOrPathReader};
pub use sink::{AsyncFileSink, FileSink, NoopSink};
pub use traverse::{
    collect_edges_par, traverse_es_modules, walk_es_modules_sync, SourceImports, TraverseError,
    TraverseOptions,
};
pub use walk::{DiscoverImports, DiscoveredImport, StopTraversing, Visited, Walk};

pub use oxc_resolver::ResolveOptions;
