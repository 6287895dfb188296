use serde::Serialize;

use crate::location::Location;

/// One `(importer, specifier, target)` triple found by a walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEdge {
    /// The specifier as written in the importing module.
    pub import_specifier: String,
    pub importer: Location,
    /// `None` when the specifier could not be resolved.
    pub resolved: Option<Location>,
}
