//! Composable boolean query model.
//!
//! Queries are plain immutable values: building or traversing one never
//! touches the query engine. Lookup leaves only *describe* a dereference of
//! another document, so they can be discovered by walking the tree.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Reserved field holding the name of the collection a document lives in.
pub const COLLECTION_FIELD: &str = "_collection";

/// Reference to another document whose field values form a dynamic term list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TermsLookup {
    /// Collection of the referenced document.
    pub collection: String,
    /// Id of the referenced document.
    pub id: String,
    /// Field of the referenced document holding the terms.
    /// Defaults to the field the lookup query matches on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Boolean query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// `field == value`.
    Term {
        field: String,
        value: serde_json::Value,
    },
    /// Document id is one of `values`.
    Ids { values: BTreeSet<String> },
    /// `field` matches any term found in the referenced document.
    Lookup { field: String, lookup: TermsLookup },
    /// All clauses must match.
    And(Vec<Query>),
    /// At least `minimum_match` clauses must match.
    Or {
        clauses: Vec<Query>,
        minimum_match: usize,
    },
}

impl Query {
    #[must_use]
    pub fn term(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Term on [`COLLECTION_FIELD`].
    #[must_use]
    pub fn collection(name: impl Into<String>) -> Self {
        Self::term(COLLECTION_FIELD, name.into())
    }

    #[must_use]
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Ids {
            values: ids.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn lookup(
        field: impl Into<String>,
        collection: impl Into<String>,
        id: impl Into<String>,
        path: Option<String>,
    ) -> Self {
        Self::Lookup {
            field: field.into(),
            lookup: TermsLookup {
                collection: collection.into(),
                id: id.into(),
                path,
            },
        }
    }

    #[must_use]
    pub fn and(clauses: Vec<Query>) -> Self {
        Self::And(clauses)
    }

    /// Disjunction with "at least one of" semantics.
    #[must_use]
    pub fn or(clauses: Vec<Query>) -> Self {
        Self::Or {
            clauses,
            minimum_match: 1,
        }
    }

    /// Visits this query and every nested sub-query, parents first.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a Query)) {
        let mut stack = vec![self];
        while let Some(q) = stack.pop() {
            visit(q);
            match q {
                Self::And(clauses) | Self::Or { clauses, .. } => {
                    stack.extend(clauses.iter().rev());
                }
                Self::Term { .. } | Self::Ids { .. } | Self::Lookup { .. } => {}
            }
        }
    }

    /// All lookup references inside this query, in tree order.
    #[must_use]
    pub fn lookups(&self) -> Vec<&TermsLookup> {
        let mut found = Vec::new();
        self.walk(|q| {
            if let Self::Lookup { lookup, .. } = q {
                found.push(lookup);
            }
        });
        found
    }

    #[must_use]
    pub fn contains_lookup(&self) -> bool {
        !self.lookups().is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_found_at_any_depth() {
        let q = Query::and(vec![
            Query::term("region", "EU"),
            Query::or(vec![
                Query::lookup("dept", "users", "u1", None),
                Query::and(vec![Query::lookup(
                    "owner",
                    "teams",
                    "t9",
                    Some("members".to_owned()),
                )]),
            ]),
        ]);

        let refs: Vec<(&str, &str)> = q
            .lookups()
            .into_iter()
            .map(|l| (l.collection.as_str(), l.id.as_str()))
            .collect();
        assert_eq!(refs, vec![("users", "u1"), ("teams", "t9")]);
    }

    #[test]
    fn plain_terms_have_no_lookup() {
        let q = Query::or(vec![Query::term("a", 1), Query::ids(["x", "y"])]);
        assert!(!q.contains_lookup());
    }

    #[test]
    fn ids_are_deduplicated() {
        let Query::Ids { values } = Query::ids(["2", "1", "2"]) else {
            panic!("expected ids query");
        };
        assert_eq!(values.into_iter().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn restriction_rule_parses_from_yaml() {
        let yaml = r#"
and:
  - term:
      field: region
      value: EU
  - lookup:
      field: department
      lookup:
        collection: users
        id: alice
        path: departments
"#;
        let q: Query = serde_saphyr::from_str(yaml).unwrap();

        assert_eq!(
            q,
            Query::and(vec![
                Query::term("region", "EU"),
                Query::lookup("department", "users", "alice", Some("departments".to_owned())),
            ])
        );
    }
}
