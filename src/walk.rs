use std::{
    collections::VecDeque,
    iter::FusedIterator,
    sync::{Arc, Mutex, PoisonError},
    vec,
};

use tracing::{debug, trace};

use crate::{edge::ImportEdge, hash::HashSet, location::Location};

/// Returns `true` for locations whose own imports should not be walked.
pub type StopTraversing = Arc<dyn Fn(&Location) -> bool + Send + Sync>;

/// An import of some module, already resolved by the discovering strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredImport {
    pub specifier: String,
    pub resolved: Option<Location>,
    /// Only local imports are expanded, even when resolved.
    pub local: bool,
}

/// Lists the imports of one module, in source order.
pub trait DiscoverImports {
    type Error;
    fn discover_imports(&self, importer: &Location) -> Result<Vec<DiscoveredImport>, Self::Error>;
}

impl<D: DiscoverImports> DiscoverImports for &D {
    type Error = D::Error;
    fn discover_imports(&self, importer: &Location) -> Result<Vec<DiscoveredImport>, Self::Error> {
        (**self).discover_imports(importer)
    }
}

/// The set of locations already expanded.
pub trait Visited {
    /// Records `location` and returns `true` if it had not been seen before.
    fn first_visit(&mut self, location: &Location) -> bool;
}

impl Visited for HashSet<Location> {
    fn first_visit(&mut self, location: &Location) -> bool {
        if self.contains(location) {
            return false;
        }
        self.insert(location.clone())
    }
}

impl Visited for &Mutex<HashSet<Location>> {
    fn first_visit(&mut self, location: &Location) -> bool {
        let mut visited = self.lock().unwrap_or_else(PoisonError::into_inner);
        if visited.contains(location) {
            return false;
        }
        visited.insert(location.clone())
    }
}

struct Frame {
    importer: Location,
    imports: vec::IntoIter<DiscoveredImport>,
}

pub(crate) enum Step {
    Edge(ImportEdge),
    /// The driver must discover the imports of this location and hand them
    /// back through [`WalkState::push_frame`].
    Expand(Location),
    Done,
}

/// Depth-first walk bookkeeping shared by the sync, async and metafile
/// drivers. Edges come out in the order a recursive descent would yield
/// them: each local import's subtree before the importer's next sibling.
pub(crate) struct WalkState<V = HashSet<Location>> {
    visited: V,
    entries: VecDeque<Location>,
    stack: Vec<Frame>,
    pending: Option<Location>,
    stop_traversing: Option<StopTraversing>,
}

impl<V: Visited> WalkState<V> {
    pub fn new(
        entries: impl IntoIterator<Item = Location>,
        visited: V,
        stop_traversing: Option<StopTraversing>,
    ) -> Self {
        Self {
            visited,
            entries: entries.into_iter().collect(),
            stack: vec![],
            pending: None,
            stop_traversing,
        }
    }

    pub fn step(&mut self) -> Step {
        if let Some(location) = self.pending.take() {
            return Step::Expand(location);
        }
        while let Some(frame) = self.stack.last_mut() {
            let Some(import) = frame.imports.next() else {
                self.stack.pop();
                continue;
            };
            let edge = ImportEdge {
                import_specifier: import.specifier,
                importer: frame.importer.clone(),
                resolved: import.resolved,
            };
            if import.local {
                if let Some(target) = &edge.resolved {
                    if self.should_expand(target) {
                        self.pending = Some(target.clone());
                    }
                }
            }
            return Step::Edge(edge);
        }
        while let Some(entry) = self.entries.pop_front() {
            if self.visited.first_visit(&entry) {
                return Step::Expand(entry);
            }
            trace!(%entry, "entry point already expanded");
        }
        Step::Done
    }

    fn should_expand(&mut self, target: &Location) -> bool {
        if let Some(stop) = &self.stop_traversing {
            if stop(target) {
                trace!(%target, "stopped traversing");
                return false;
            }
        }
        self.visited.first_visit(target)
    }

    pub fn push_frame(&mut self, importer: Location, imports: Vec<DiscoveredImport>) {
        debug!(%importer, imports = imports.len(), "expanded module");
        self.stack.push(Frame {
            importer,
            imports: imports.into_iter(),
        });
    }

    /// Drops all outstanding work; [`WalkState::step`] returns `Done` afterwards.
    pub fn abort(&mut self) {
        self.entries.clear();
        self.stack.clear();
        self.pending = None;
    }
}

/// Lazy edge sequence. Stops after the first error; edges already yielded
/// stay valid.
pub struct Walk<D, V = HashSet<Location>> {
    state: WalkState<V>,
    discover: D,
}

impl<D: DiscoverImports> Walk<D> {
    pub fn new(
        entries: impl IntoIterator<Item = Location>,
        discover: D,
        stop_traversing: Option<StopTraversing>,
    ) -> Self {
        Self::with_visited(entries, discover, HashSet::default(), stop_traversing)
    }
}

impl<D: DiscoverImports, V: Visited> Walk<D, V> {
    pub fn with_visited(
        entries: impl IntoIterator<Item = Location>,
        discover: D,
        visited: V,
        stop_traversing: Option<StopTraversing>,
    ) -> Self {
        Self {
            state: WalkState::new(entries, visited, stop_traversing),
            discover,
        }
    }
}

impl<D: DiscoverImports, V: Visited> Iterator for Walk<D, V> {
    type Item = Result<ImportEdge, D::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state.step() {
                Step::Edge(edge) => return Some(Ok(edge)),
                Step::Expand(location) => match self.discover.discover_imports(&location) {
                    Ok(imports) => self.state.push_frame(location, imports),
                    Err(err) => {
                        self.state.abort();
                        return Some(Err(err));
                    }
                },
                Step::Done => return None,
            }
        }
    }
}

impl<D: DiscoverImports, V: Visited> FusedIterator for Walk<D, V> {}
