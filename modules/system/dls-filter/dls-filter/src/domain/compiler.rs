//! Restriction compiler.
//!
//! Folds the per-collection DLS restrictions of a request scope into a single
//! composite filter and the whitelist of documents its lookup queries read.
//!
//! ## Index scoping
//!
//! | scope                        | unrestricted collection | restriction query `q`              |
//! |------------------------------|-------------------------|------------------------------------|
//! | one collection, not "all"    | nothing                 | `q`                                |
//! | several collections or "all" | `_collection == c`      | `_collection == c AND q`           |
//!
//! Remote collections get an allow-term when scoping; their own cluster
//! enforces their restrictions.
//!
//! Compilation has no side effects. A restriction that cannot be compiled
//! fails the whole request: a partially built filter could under-restrict.

use dls_filter_sdk::{DlsFilterError, IndexMap, Query, ResolvedIndices, TermsLookup};
use docguard_security::{DocumentRef, DocumentWhitelist};

/// Error while compiling restriction queries.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(
        "restriction on `{collection}` requires {minimum_match} of {clauses} clauses to match"
    )]
    InvalidMinimumMatch {
        collection: String,
        minimum_match: usize,
        clauses: usize,
    },

    #[error("restriction on `{collection}` has a lookup without collection or document id")]
    IncompleteLookup { collection: String },

    #[error("restriction on `{collection}` has a term without field")]
    EmptyField { collection: String },
}

impl From<CompileError> for DlsFilterError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e.to_string())
    }
}

/// The combined access-control filter for a request scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFilter {
    query: Query,
    requires_index_scoping: bool,
}

impl CompositeFilter {
    /// The filter query: an OR requiring at least one disjunct to match.
    #[inline]
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    #[inline]
    #[must_use]
    pub fn requires_index_scoping(&self) -> bool {
        self.requires_index_scoping
    }

    /// `AND(filter, query)`, or the filter alone when there is no query.
    #[must_use]
    pub fn and_with(&self, query: Option<Query>) -> Query {
        match query {
            Some(q) => Query::and(vec![self.query.clone(), q]),
            None => self.query.clone(),
        }
    }
}

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRestrictions {
    pub filter: CompositeFilter,
    pub whitelist: DocumentWhitelist,
    /// Cluster alias the collection names were prefixed with.
    pub cluster_alias: Option<String>,
}

/// Whether the filter must qualify queries with their collection.
#[must_use]
pub fn requires_index_scoping(resolved: &ResolvedIndices) -> bool {
    resolved.is_local_all() || resolved.scope_len() != 1
}

/// Compiles the restrictions that apply to `resolved`.
///
/// Returns `Ok(None)` when no restriction query applies anywhere in scope;
/// the request then needs no filter at all.
///
/// # Errors
///
/// Returns [`CompileError`] if any restriction query in scope is malformed.
pub fn compile(
    resolved: &ResolvedIndices,
    restrictions: &IndexMap,
    cluster_alias: Option<&str>,
) -> Result<Option<CompiledRestrictions>, CompileError> {
    let scoping = requires_index_scoping(resolved);

    let acc = resolved
        .local_union()
        .iter()
        .try_fold(Accumulator::default(), |acc, collection| -> Result<_, CompileError> {
            let name = prefixed(cluster_alias, collection);
            let restriction = restrictions.restriction_for(collection);

            if restriction.is_unrestricted() {
                return Ok(if scoping {
                    acc.allow(Query::collection(name))
                } else {
                    acc
                });
            }

            restriction.queries().iter().try_fold(acc, |acc, q| -> Result<_, CompileError> {
                validate(collection, q)?;
                let disjunct = if scoping {
                    Query::and(vec![Query::collection(name.clone()), q.clone()])
                } else {
                    q.clone()
                };
                Ok(acc.restrict(disjunct, q.lookups()))
            })
        })?;

    let acc = if scoping {
        resolved.remote().iter().fold(acc, |acc, remote| {
            acc.allow(Query::collection(prefixed(cluster_alias, remote)))
        })
    } else {
        acc
    };

    Ok(acc.finish(scoping, cluster_alias))
}

fn prefixed(cluster_alias: Option<&str>, collection: &str) -> String {
    match cluster_alias {
        Some(alias) => format!("{alias}:{collection}"),
        None => collection.to_owned(),
    }
}

fn validate(collection: &str, query: &Query) -> Result<(), CompileError> {
    let mut error = None;
    query.walk(|q| {
        if error.is_some() {
            return;
        }
        error = match q {
            Query::Or {
                clauses,
                minimum_match,
            } if *minimum_match == 0 || *minimum_match > clauses.len() => {
                Some(CompileError::InvalidMinimumMatch {
                    collection: collection.to_owned(),
                    minimum_match: *minimum_match,
                    clauses: clauses.len(),
                })
            }
            Query::Lookup { lookup, .. } if lookup.collection.is_empty() || lookup.id.is_empty() => {
                Some(CompileError::IncompleteLookup {
                    collection: collection.to_owned(),
                })
            }
            Query::Term { field, .. } | Query::Lookup { field, .. } if field.is_empty() => {
                Some(CompileError::EmptyField {
                    collection: collection.to_owned(),
                })
            }
            _ => None,
        };
    });
    error.map_or(Ok(()), Err)
}

#[derive(Default)]
struct Accumulator {
    disjuncts: Vec<Query>,
    whitelist: DocumentWhitelist,
    query_count: usize,
}

impl Accumulator {
    /// Adds a disjunct that lets a whole collection through.
    fn allow(mut self, disjunct: Query) -> Self {
        self.disjuncts.push(disjunct);
        self
    }

    /// Adds a restriction disjunct and the documents its lookups read.
    fn restrict(mut self, disjunct: Query, lookups: Vec<&TermsLookup>) -> Self {
        self.disjuncts.push(disjunct);
        self.whitelist.extend(
            lookups
                .into_iter()
                .map(|l| DocumentRef::new(l.collection.clone(), l.id.clone())),
        );
        self.query_count += 1;
        self
    }

    fn finish(self, scoping: bool, cluster_alias: Option<&str>) -> Option<CompiledRestrictions> {
        if self.query_count == 0 {
            return None;
        }
        Some(CompiledRestrictions {
            filter: CompositeFilter {
                query: Query::or(self.disjuncts),
                requires_index_scoping: scoping,
            },
            whitelist: self.whitelist,
            cluster_alias: cluster_alias.map(ToOwned::to_owned),
        })
    }
}
