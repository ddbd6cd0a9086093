//! In-process reference `ProductRepository`, following the
//! `InMemoryArchive<T>` / `FileArchive` dual-backend pattern: a small fixed
//! catalogue plus a compatibility edge set, behind the same trait a
//! graph-backed implementation would satisfy.

use super::{matches_attributes, ProductRepository, SearchResult, RESULT_CAP};
use crate::compatibility::CompatibilityPredicate;
use crate::errors::RepositoryError;
use crate::types::{ComponentKind, Gin, ParameterBag, Product};
use async_trait::async_trait;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct InMemoryProductRepository {
    products: Vec<Product>,
    compatible_edges: HashSet<(Gin, Gin)>,
}

impl InMemoryProductRepository {
    pub fn new(products: Vec<Product>, compatible_pairs: Vec<(Gin, Gin)>) -> Self {
        let mut compatible_edges = HashSet::new();
        for (a, b) in compatible_pairs {
            compatible_edges.insert((a.clone(), b.clone()));
            compatible_edges.insert((b, a));
        }
        Self {
            products,
            compatible_edges,
        }
    }

    fn is_compatible(&self, a: &Gin, b: &Gin) -> bool {
        self.compatible_edges.contains(&(a.clone(), b.clone()))
    }

    fn eligible(&self, kind: ComponentKind, predicate: &CompatibilityPredicate) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.kind == kind && p.available)
            .filter(|p| {
                predicate
                    .anchors
                    .iter()
                    .all(|anchor| self.is_compatible(&p.gin, anchor))
            })
            .collect()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn lookup_by_name(
        &self,
        kind: ComponentKind,
        raw_name: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let needle = fuzzy_normalize(raw_name);
        let mut matches: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| p.kind == kind && p.available)
            .filter(|p| fuzzy_normalize(&p.name).contains(&needle) || needle.contains(&fuzzy_normalize(&p.name)))
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches.truncate(RESULT_CAP);
        Ok(matches.into_iter().cloned().collect())
    }

    async fn search(
        &self,
        kind: ComponentKind,
        bag: &ParameterBag,
        predicate: &CompatibilityPredicate,
    ) -> Result<SearchResult, RepositoryError> {
        let mut matches: Vec<Product> = self
            .eligible(kind, predicate)
            .into_iter()
            .filter(|p| matches_attributes(p, bag))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));

        if matches.is_empty() && !bag.attributes.is_empty() {
            let mut fallback: Vec<Product> = self.eligible(kind, predicate).into_iter().cloned().collect();
            fallback.sort_by(|a, b| a.name.cmp(&b.name));
            fallback.truncate(RESULT_CAP);
            return Ok(SearchResult {
                products: fallback,
                fallback: true,
            });
        }

        matches.truncate(RESULT_CAP);
        Ok(SearchResult {
            products: matches,
            fallback: false,
        })
    }

    async fn find_all_compatible(
        &self,
        kind: ComponentKind,
        predicate: &CompatibilityPredicate,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut matches: Vec<Product> = self.eligible(kind, predicate).into_iter().cloned().collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches.truncate(RESULT_CAP);
        Ok(matches)
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

fn fuzzy_normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
