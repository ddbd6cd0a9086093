//! C3: Product Repository.
//!
//! Three query shapes against the product graph: direct name lookup,
//! parameter-filtered search, and a compatibility-only fallback. The port
//! trait mirrors a `CatalogFilter`/`CatalogService` split: filters are a
//! plain data struct, matching happens in one place, and an in-memory
//! reference implementation sits behind the same trait a graph-backed one
//! would satisfy.

mod in_memory;

pub use in_memory::InMemoryProductRepository;

use crate::compatibility::CompatibilityPredicate;
use crate::errors::RepositoryError;
use crate::types::{ComponentKind, ParameterBag, Product};
use async_trait::async_trait;

pub const RESULT_CAP: usize = 5;

/// Result of a `search` call, tagged with whether the fallback rule fired.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub products: Vec<Product>,
    pub fallback: bool,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn lookup_by_name(
        &self,
        kind: ComponentKind,
        raw_name: &str,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Eligible only when `|parameter_bag| >= 1` or a direct mention is
    /// present; the Orchestrator enforces that eligibility check before
    /// calling this.
    async fn search(
        &self,
        kind: ComponentKind,
        bag: &ParameterBag,
        predicate: &CompatibilityPredicate,
    ) -> Result<SearchResult, RepositoryError>;

    async fn find_all_compatible(
        &self,
        kind: ComponentKind,
        predicate: &CompatibilityPredicate,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn is_ready(&self) -> bool;
}

/// Attribute match is case-insensitive substring over description + name,
/// OR across multiple values for one attribute, AND across attributes
///. Shared by every `ProductRepository` implementation so the
/// matching semantics stay in one place.
pub fn matches_attributes(product: &Product, bag: &ParameterBag) -> bool {
    if bag.attributes.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {}",
        product.name.to_lowercase(),
        product.description.to_lowercase()
    );
    bag.attributes.values().all(|wanted| {
        expand_measurement_tokens(wanted)
            .iter()
            .any(|needle| haystack.contains(needle))
    })
}

/// Expand a measurement token like `"5m"` into a word-boundary set
/// `{" 5m", " 5.0m"}` so that `"15.0m"` is not falsely matched by `"5.0m"`
///. Non-measurement tokens pass through unchanged (lowercased).
fn expand_measurement_tokens(token: &str) -> Vec<String> {
    let lower = token.to_lowercase();
    static MEASUREMENT: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"^(\d+)(\.\d+)?([a-z]+)$").unwrap());
    if let Some(caps) = MEASUREMENT.captures(&lower) {
        let int_part: &str = caps.get(1).unwrap().as_str();
        let unit: &str = caps.get(3).unwrap().as_str();
        vec![
            format!(" {int_part}{unit}"),
            format!(" {int_part}.0{unit}"),
        ]
    } else {
        vec![lower]
    }
}
