use std::{
    io,
    path::{Component, Path, PathBuf},
};

use oxc_resolver::{FileMetadata, FileSystem, ResolveOptions, ResolverGeneric};
use tracing::trace;
use url::Url;

use crate::location::{is_local_specifier, Location};

/// Maps a specifier found in `importer` to the location it refers to.
/// `None` means the specifier could not be resolved; that is not an error.
pub trait Resolve: Send + Sync {
    fn resolve(&self, importer: &Location, specifier: &str) -> Option<Location>;
}

#[derive(Default, Clone, Debug)]
pub struct OsFileSystem(());

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        std::fs::metadata(path).map(FileMetadata::from)
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        std::fs::symlink_metadata(path).map(FileMetadata::from)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        dunce::canonicalize(path)
    }
}

pub fn default_resolve_options() -> ResolveOptions {
    ResolveOptions {
        extensions: [".js", ".jsx", ".ts", ".tsx", ".mjs"]
            .into_iter()
            .map(String::from)
            .collect(),
        ..Default::default()
    }
}

/// Resolves against the filesystem with `oxc_resolver`, probing the
/// configured extensions and package entry points.
pub struct FsResolver<FS = OsFileSystem> {
    path_resolver: ResolverGeneric<FS>,
}

impl FsResolver {
    pub fn new(resolve_options: ResolveOptions) -> Self {
        Self::with_file_system(OsFileSystem::default(), resolve_options)
    }
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::new(default_resolve_options())
    }
}

impl<FS: FileSystem> FsResolver<FS> {
    pub fn with_file_system(fs: FS, resolve_options: ResolveOptions) -> Self {
        Self {
            path_resolver: ResolverGeneric::new_with_file_system(fs, resolve_options),
        }
    }

    pub fn resolve_in_dir(&self, dir: &Path, specifier: &str) -> Option<PathBuf> {
        match self.path_resolver.resolve(dir, specifier) {
            Ok(resolution) => Some(resolution.into_path_buf()),
            Err(err) => {
                trace!(specifier, dir = %dir.display(), %err, "unresolved specifier");
                None
            }
        }
    }
}

impl<FS: FileSystem + Send + Sync> Resolve for FsResolver<FS> {
    fn resolve(&self, importer: &Location, specifier: &str) -> Option<Location> {
        let Location::Path(importer_path) = importer else {
            trace!(%importer, specifier, "filesystem resolver cannot resolve from a URL");
            return None;
        };
        let dir = importer_path.parent().unwrap_or(importer_path);
        self.resolve_in_dir(dir, specifier).map(Location::from)
    }
}

/// Resolves modules served over HTTP from a local `root` directory.
///
/// An importer URL under `base_url` is mapped onto `root` and resolved on
/// disk. Local specifiers come back as URLs under `base_url`; bare
/// specifiers come back as filesystem paths (e.g. inside `node_modules`).
pub struct UrlResolver<FS = OsFileSystem> {
    root: PathBuf,
    base_url: Url,
    fs: FsResolver<FS>,
}

impl UrlResolver {
    pub fn new(root: impl Into<PathBuf>, base_url: Url) -> Self {
        Self::with_resolver(root, base_url, FsResolver::default())
    }
}

impl<FS: FileSystem> UrlResolver<FS> {
    pub fn with_resolver(root: impl Into<PathBuf>, mut base_url: Url, fs: FsResolver<FS>) -> Self {
        let root = root.into();
        // resolver output is canonical, so `root` has to be as well
        let root = dunce::canonicalize(&root).unwrap_or(root);
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { root, base_url, fs }
    }

    fn url_to_path(&self, url: &Url) -> Option<PathBuf> {
        if url.origin() != self.base_url.origin() {
            return None;
        }
        let relative = url.path().strip_prefix(self.base_url.path())?;
        Some(self.root.join(relative))
    }

    fn path_to_url(&self, path: &Path) -> Option<Url> {
        let relative = pathdiff::diff_paths(path, &self.root)?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?),
                // outside of `root`, not served
                _ => return None,
            }
        }
        self.base_url.join(&segments.join("/")).ok()
    }
}

impl<FS: FileSystem + Send + Sync> Resolve for UrlResolver<FS> {
    fn resolve(&self, importer: &Location, specifier: &str) -> Option<Location> {
        let importer_path = match importer {
            Location::Url(url) => self.url_to_path(url)?,
            Location::Path(path) => path.to_path_buf(),
        };
        let dir = importer_path.parent().unwrap_or(&importer_path);
        let resolved = self.fs.resolve_in_dir(dir, specifier)?;
        if is_local_specifier(specifier) {
            if let Some(url) = self.path_to_url(&resolved) {
                return Some(Location::Url(url));
            }
        }
        Some(Location::from(resolved))
    }
}
