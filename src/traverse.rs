use std::sync::{Arc, Mutex};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, trace};

use crate::{
    edge::ImportEdge,
    hash::HashSet,
    js_resolver::{ExtractSpecifiers, FsResolver, OxcExtractor, ParseError, Resolve},
    location::{is_builtin_module, is_local_specifier, Location},
    reader::{AsyncReadSource, FsReader, ReadError, ReadSource},
    sink::{AsyncFileSink, FileSink, NoopSink},
    walk::{DiscoverImports, DiscoveredImport, StopTraversing, Step, Walk, WalkState},
};

#[derive(Debug, thiserror::Error)]
pub enum TraverseError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("file sink failed on {location}: {source}")]
    Sink {
        location: Location,
        #[source]
        source: anyhow::Error,
    },

    #[error("no entry points given")]
    NoEntryPoints,
}

/// Configuration of one live traversal.
pub struct TraverseOptions<R = FsReader, S = NoopSink> {
    pub entry_points: Vec<Location>,
    pub resolver: Arc<dyn Resolve>,
    pub extractor: Arc<dyn ExtractSpecifiers>,
    pub read_file: R,
    pub on_file: S,
    pub stop_traversing: Option<StopTraversing>,
}

impl TraverseOptions {
    /// Filesystem resolution with the default extensions, filesystem reads,
    /// no sink and no pruning.
    pub fn new(entry_points: impl IntoIterator<Item = Location>) -> Self {
        Self {
            entry_points: entry_points.into_iter().collect(),
            resolver: Arc::new(FsResolver::default()),
            extractor: Arc::new(OxcExtractor::new()),
            read_file: FsReader,
            on_file: NoopSink,
            stop_traversing: None,
        }
    }
}

impl<R, S> TraverseOptions<R, S> {
    pub fn with_resolver(mut self, resolver: impl Resolve + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_extractor(mut self, extractor: impl ExtractSpecifiers + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_reader<R2>(self, read_file: R2) -> TraverseOptions<R2, S> {
        TraverseOptions {
            entry_points: self.entry_points,
            resolver: self.resolver,
            extractor: self.extractor,
            read_file,
            on_file: self.on_file,
            stop_traversing: self.stop_traversing,
        }
    }

    pub fn with_sink<S2>(self, on_file: S2) -> TraverseOptions<R, S2> {
        TraverseOptions {
            entry_points: self.entry_points,
            resolver: self.resolver,
            extractor: self.extractor,
            read_file: self.read_file,
            on_file,
            stop_traversing: self.stop_traversing,
        }
    }

    pub fn stop_traversing(
        mut self,
        stop_traversing: impl Fn(&Location) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.stop_traversing = Some(Arc::new(stop_traversing));
        self
    }

    fn into_parts(
        self,
    ) -> Result<(Vec<Location>, SourceImports<R, S>, Option<StopTraversing>), TraverseError> {
        if self.entry_points.is_empty() {
            return Err(TraverseError::NoEntryPoints);
        }
        let entry_points = self
            .entry_points
            .into_iter()
            .map(Location::canonicalize)
            .collect();
        let source_imports = SourceImports {
            read_file: self.read_file,
            on_file: self.on_file,
            resolver: self.resolver,
            extractor: self.extractor,
        };
        Ok((entry_points, source_imports, self.stop_traversing))
    }
}

/// Discovers imports by reading and parsing each module's source.
pub struct SourceImports<R, S> {
    read_file: R,
    on_file: S,
    resolver: Arc<dyn Resolve>,
    extractor: Arc<dyn ExtractSpecifiers>,
}

impl<R, S> SourceImports<R, S> {
    fn imports_in(
        &self,
        importer: &Location,
        source: &str,
    ) -> Result<Vec<DiscoveredImport>, TraverseError> {
        Ok(self
            .extractor
            .extract(importer, source)?
            .into_iter()
            .filter_map(|specifier| {
                if is_builtin_module(&specifier) {
                    trace!(%importer, %specifier, "skipping built-in module");
                    return None;
                }
                let resolved = self.resolver.resolve(importer, &specifier);
                let local = is_local_specifier(&specifier);
                Some(DiscoveredImport {
                    specifier,
                    resolved,
                    local,
                })
            })
            .collect())
    }

    fn sink_error(location: &Location, source: anyhow::Error) -> TraverseError {
        TraverseError::Sink {
            location: location.clone(),
            source,
        }
    }
}

impl<R: ReadSource, S: FileSink> DiscoverImports for SourceImports<R, S> {
    type Error = TraverseError;

    fn discover_imports(&self, importer: &Location) -> Result<Vec<DiscoveredImport>, Self::Error> {
        let source = ReadSource::read(&self.read_file, importer)?;
        FileSink::on_file(&self.on_file, importer, &source)
            .map_err(|err| Self::sink_error(importer, err))?;
        self.imports_in(importer, &source)
    }
}

impl<R: AsyncReadSource, S: AsyncFileSink> SourceImports<R, S> {
    async fn discover_imports_async(
        &self,
        importer: &Location,
    ) -> Result<Vec<DiscoveredImport>, TraverseError> {
        let source = AsyncReadSource::read(&self.read_file, importer).await?;
        AsyncFileSink::on_file(&self.on_file, importer, &source)
            .await
            .map_err(|err| Self::sink_error(importer, err))?;
        self.imports_in(importer, &source)
    }
}

/// Walks the import graph lazily on the calling thread. Dropping the
/// iterator early skips the remaining work.
pub fn walk_es_modules_sync<R: ReadSource, S: FileSink>(
    options: TraverseOptions<R, S>,
) -> Result<Walk<SourceImports<R, S>>, TraverseError> {
    let (entry_points, source_imports, stop_traversing) = options.into_parts()?;
    Ok(Walk::new(entry_points, source_imports, stop_traversing))
}

/// Walks the import graph, awaiting one read and one sink call at a time so
/// edges keep the same order as [`walk_es_modules_sync`].
pub async fn traverse_es_modules<R: AsyncReadSource, S: AsyncFileSink>(
    options: TraverseOptions<R, S>,
) -> Result<Vec<ImportEdge>, TraverseError> {
    let (entry_points, source_imports, stop_traversing) = options.into_parts()?;
    let mut state = WalkState::new(
        entry_points,
        HashSet::<Location>::default(),
        stop_traversing,
    );
    let mut edges = vec![];
    loop {
        match state.step() {
            Step::Edge(edge) => edges.push(edge),
            Step::Expand(location) => {
                let imports = source_imports.discover_imports_async(&location).await?;
                state.push_frame(location, imports);
            }
            Step::Done => break,
        }
    }
    debug!(edges = edges.len(), "traversal finished");
    Ok(edges)
}

/// Walks each entry point on the rayon pool. Entry points share one visited
/// set, so a module reachable from several entries is expanded under
/// whichever gets there first. Edges are grouped by entry point, in order.
pub fn collect_edges_par<R: ReadSource, S: FileSink>(
    options: TraverseOptions<R, S>,
) -> Result<Vec<ImportEdge>, TraverseError> {
    let (entry_points, source_imports, stop_traversing) = options.into_parts()?;
    let visited = Mutex::new(HashSet::<Location>::default());
    let edges_by_entry = entry_points
        .into_par_iter()
        .map(|entry| {
            Walk::with_visited([entry], &source_imports, &visited, stop_traversing.clone())
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(edges_by_entry.into_iter().flatten().collect())
}
