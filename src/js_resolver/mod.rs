mod parse_imports;
mod resolve;

use std::cell::RefCell;

use oxc_allocator::Allocator;
use oxc_span::SourceType;
use thread_local::ThreadLocal;
use tracing::{debug, warn};

use crate::location::Location;
use parse_imports::{parse_imports, Imports, Unparsable};
pub use resolve::{default_resolve_options, FsResolver, OsFileSystem, Resolve, UrlResolver};

/// A module whose imports could not be determined.
#[derive(Debug, thiserror::Error)]
#[error("failed to parse {location}: {}", errors.join("; "))]
pub struct ParseError {
    pub location: Location,
    pub errors: Vec<String>,
}

/// Turns module source text into the raw specifiers it imports, in order.
pub trait ExtractSpecifiers: Send + Sync {
    fn extract(&self, location: &Location, source: &str) -> Result<Vec<String>, ParseError>;
}

pub struct ResetOnDrop<'a>(&'a mut Allocator);
impl<'a> Drop for ResetOnDrop<'a> {
    fn drop(&mut self) {
        self.0.reset()
    }
}

/// Extracts specifiers with `oxc_parser`, reusing one arena per thread.
#[derive(Default)]
pub struct OxcExtractor {
    allocator: ThreadLocal<RefCell<Allocator>>,
}

impl OxcExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

fn source_type_for(location: &Location) -> SourceType {
    SourceType::from_path(location.source_path())
        .unwrap_or_else(|_| SourceType::default().with_jsx(true).with_module(true))
}

impl ExtractSpecifiers for OxcExtractor {
    fn extract(&self, location: &Location, source: &str) -> Result<Vec<String>, ParseError> {
        let allocator_ref_cell = self.allocator.get_or_default();
        let mut allocator_mut_ref = allocator_ref_cell.borrow_mut();
        let reset_on_drop = ResetOnDrop(&mut allocator_mut_ref);
        let allocator = &*reset_on_drop.0;

        let (
            Imports {
                specifiers,
                non_literal_imports,
            },
            parse_errors,
        ) = parse_imports(allocator, source_type_for(location), source).map_err(
            |Unparsable(errors)| ParseError {
                location: location.clone(),
                errors: errors.iter().map(ToString::to_string).collect(),
            },
        )?;

        if !parse_errors.is_empty() {
            warn!(
                %location,
                errors = parse_errors.len(),
                "recovered from parse errors"
            );
        }
        if !non_literal_imports.is_empty() {
            debug!(
                %location,
                count = non_literal_imports.len(),
                "skipping non-literal imports"
            );
        }
        Ok(specifiers
            .into_iter()
            .map(|(specifier, _)| specifier.trim().to_owned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_extract_typescript_by_extension() {
        let extractor = OxcExtractor::new();
        let location = Location::parse("/src/app.ts", Path::new("/"));
        let specifiers = extractor
            .extract(
                &location,
                "import type { A } from './types';\nimport { b } from './b';\nexport * from './c';",
            )
            .unwrap();
        assert_eq!(specifiers, vec!["./b", "./c"]);
    }

    #[test]
    fn test_extract_jsx_from_url() {
        let extractor = OxcExtractor::new();
        let location = Location::parse("http://localhost:9000/view.jsx", Path::new("/"));
        let specifiers = extractor
            .extract(
                &location,
                "import Button from './button';\nexport default () => <Button />;",
            )
            .unwrap();
        assert_eq!(specifiers, vec!["./button"]);
    }

    #[test]
    fn test_extract_fails_on_syntax_error() {
        let extractor = OxcExtractor::new();
        let location = Location::parse("/src/broken.js", Path::new("/"));
        let err = extractor
            .extract(&location, "import a from './a';\nconst = ;")
            .unwrap_err();
        assert_eq!(err.location, location);
        assert!(!err.errors.is_empty());
        assert!(err.to_string().starts_with("failed to parse /src/broken.js: "));

        // the arena is reset even when parsing fails
        assert_eq!(
            extractor.extract(&location, "import a from './a';").unwrap(),
            vec!["./a"]
        );
    }

    #[test]
    fn test_arena_is_reused_across_files() {
        let extractor = OxcExtractor::new();
        let location = Location::parse("/src/a.mjs", Path::new("/"));
        for _ in 0..3 {
            assert_eq!(
                extractor.extract(&location, "import x from 'x';").unwrap(),
                vec!["x"]
            );
        }
    }
}
