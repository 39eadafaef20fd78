//! Payload-to-page-template catalog.
//!
//! Catalog JSON follows the `pagetrack.catalog.v1` schema: a list of
//! templates, each pairing an exact payload string with page corners in
//! marker-unit space (the marker occupies the unit square, so a page corner
//! of `(-1.5, 4.0)` lies 1.5 marker widths left and 4 marker heights below
//! the marker's top-left corner).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Quad};

const CATALOG_SCHEMA_V1: &str = "pagetrack.catalog.v1";

/// A known page geometry, keyed by decoded marker payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTemplate {
    /// Identifier carried through to results (usually the payload itself).
    pub id: String,
    /// Page corners in marker-unit space.
    pub page: Quad,
}

/// Maps a decoded payload string to its page template.
///
/// Matching is exact string equality. A catalog that has not been loaded
/// behaves exactly like one with no matching entry; callers must treat
/// "no match" and "not loaded" identically.
pub trait TemplateCatalog {
    fn lookup(&self, payload: &str) -> Option<&PageTemplate>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogEntrySpec {
    payload: String,
    #[serde(default)]
    id: Option<String>,
    /// Corners as [x, y] pairs in TL, TR, BR, BL order.
    corners: [[f64; 2]; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogSpecV1 {
    schema: String,
    templates: Vec<CatalogEntrySpec>,
}

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnsupportedSchema(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "catalog io error: {}", e),
            Self::Parse(e) => write!(f, "catalog parse error: {}", e),
            Self::UnsupportedSchema(s) => {
                write!(f, "unsupported catalog schema {:?}, expected {:?}", s, CATALOG_SCHEMA_V1)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

// ── In-memory catalog ────────────────────────────────────────────────────

/// Exact-match catalog backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    templates: HashMap<String, PageTemplate>,
}

impl InMemoryCatalog {
    /// An empty (not-yet-loaded) catalog; every lookup returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, payload: impl Into<String>, template: PageTemplate) {
        self.templates.insert(payload.into(), template);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterator over (payload, template) entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PageTemplate)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let spec: CatalogSpecV1 = serde_json::from_str(json).map_err(CatalogError::Parse)?;
        if spec.schema != CATALOG_SCHEMA_V1 {
            return Err(CatalogError::UnsupportedSchema(spec.schema));
        }
        let mut catalog = Self::new();
        for entry in spec.templates {
            let c = entry.corners;
            let template = PageTemplate {
                id: entry.id.unwrap_or_else(|| entry.payload.clone()),
                page: Quad::new(
                    Point::new(c[0][0], c[0][1]),
                    Point::new(c[1][0], c[1][1]),
                    Point::new(c[2][0], c[2][1]),
                    Point::new(c[3][0], c[3][1]),
                ),
            };
            catalog.insert(entry.payload, template);
        }
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(CatalogError::Io)?;
        Self::from_json_str(&json)
    }
}

impl TemplateCatalog for InMemoryCatalog {
    fn lookup(&self, payload: &str) -> Option<&PageTemplate> {
        self.templates.get(payload)
    }
}
