//! Conversions from search hits back into fetch-shaped responses.

use std::collections::{BTreeMap, HashMap};

use dls_filter_sdk::{DocumentVersion, GetResult, MultiGetItem, MultiGetResponse, SearchHit};

/// Splits stored fields into `(document_fields, metadata_fields)`.
///
/// Metadata fields are the `_`-prefixed ones (`_routing`, `_ignored`, ...).
pub(crate) fn partition_fields(
    fields: BTreeMap<String, serde_json::Value>,
) -> (
    BTreeMap<String, serde_json::Value>,
    BTreeMap<String, serde_json::Value>,
) {
    let (metadata, document): (BTreeMap<_, _>, BTreeMap<_, _>) =
        fields.into_iter().partition(|(name, _)| name.starts_with('_'));
    (document, metadata)
}

/// Builds the result of a successful fetch from the single matching hit.
pub(crate) fn hit_to_get_result(hit: SearchHit) -> GetResult {
    let (document_fields, metadata_fields) = partition_fields(hit.fields);
    GetResult {
        collection: hit.collection,
        id: hit.id,
        found: true,
        version: Some(DocumentVersion {
            version: hit.version,
            seq_no: hit.seq_no,
            primary_term: hit.primary_term,
        }),
        source: hit.source,
        document_fields,
        metadata_fields,
    }
}

/// Pairs search hits with the requested items.
///
/// The response has exactly one entry per requested item, in request order.
/// Items without a hit are reported as not found. Hits matching no request
/// item are dropped.
pub(crate) fn reassociate(items: &[MultiGetItem], hits: Vec<SearchHit>) -> MultiGetResponse {
    let mut pending: HashMap<(&str, &str), usize> = HashMap::with_capacity(items.len());
    for item in items {
        *pending
            .entry((item.collection.as_str(), item.id.as_str()))
            .or_default() += 1;
    }

    let mut by_key: HashMap<(String, String), SearchHit> = HashMap::with_capacity(hits.len());
    for hit in hits {
        if pending.contains_key(&(hit.collection.as_str(), hit.id.as_str())) {
            by_key.insert((hit.collection.clone(), hit.id.clone()), hit);
        } else {
            tracing::warn!(
                collection = %hit.collection,
                id = %hit.id,
                "dropping multi-get hit that matches no requested document"
            );
        }
    }

    let items = items
        .iter()
        .map(|item| {
            let key = (item.collection.clone(), item.id.clone());
            let remaining = pending
                .get_mut(&(item.collection.as_str(), item.id.as_str()))
                .map_or(0, |n| {
                    *n -= 1;
                    *n
                });
            // The last request for a document takes the hit, earlier duplicates clone it.
            let hit = if remaining == 0 {
                by_key.remove(&key)
            } else {
                by_key.get(&key).cloned()
            };
            hit.map_or_else(
                || GetResult::not_found(&item.collection, &item.id),
                hit_to_get_result,
            )
        })
        .collect();

    MultiGetResponse { items }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(collection: &str, id: &str) -> SearchHit {
        SearchHit {
            collection: collection.to_owned(),
            id: id.to_owned(),
            version: 3,
            seq_no: 12,
            primary_term: 1,
            source: Some(json!({ "id": id })),
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn underscore_fields_are_metadata() {
        let fields = BTreeMap::from([
            ("_routing".to_owned(), json!("r1")),
            ("region".to_owned(), json!("EU")),
            ("_ignored".to_owned(), json!(["x"])),
        ]);

        let (document, metadata) = partition_fields(fields);

        assert_eq!(document.keys().collect::<Vec<_>>(), vec!["region"]);
        assert_eq!(metadata.keys().collect::<Vec<_>>(), vec!["_ignored", "_routing"]);
    }

    #[test]
    fn hit_becomes_found_result_with_version() {
        let mut h = hit("orders", "1");
        h.fields.insert("_routing".to_owned(), json!("r1"));

        let r = hit_to_get_result(h);

        assert!(r.found);
        assert_eq!(
            r.version,
            Some(DocumentVersion {
                version: 3,
                seq_no: 12,
                primary_term: 1
            })
        );
        assert_eq!(r.source, Some(json!({ "id": "1" })));
        assert!(r.metadata_fields.contains_key("_routing"));
    }

    #[test]
    fn reordered_hits_follow_request_order() {
        let items = vec![
            MultiGetItem::new("orders", "1"),
            MultiGetItem::new("orders", "2"),
            MultiGetItem::new("logs", "7"),
        ];
        let hits = vec![hit("logs", "7"), hit("orders", "1")];

        let response = reassociate(&items, hits);

        let summary: Vec<(&str, &str, bool)> = response
            .items
            .iter()
            .map(|r| (r.collection.as_str(), r.id.as_str(), r.found))
            .collect();
        assert_eq!(
            summary,
            vec![("orders", "1", true), ("orders", "2", false), ("logs", "7", true)]
        );
        assert!(response.items[1].version.is_none());
    }

    #[test]
    fn same_id_in_two_collections_is_not_confused() {
        let items = vec![MultiGetItem::new("orders", "1"), MultiGetItem::new("logs", "1")];
        let hits = vec![hit("logs", "1")];

        let response = reassociate(&items, hits);

        assert!(!response.items[0].found);
        assert!(response.items[1].found);
        assert_eq!(response.items[1].collection, "logs");
    }

    #[test]
    fn duplicate_requests_each_get_the_document() {
        let items = vec![MultiGetItem::new("orders", "1"), MultiGetItem::new("orders", "1")];

        let response = reassociate(&items, vec![hit("orders", "1")]);

        assert_eq!(response.items.len(), 2);
        assert!(response.items.iter().all(|r| r.found));
    }

    #[tracing_test::traced_test]
    #[test]
    fn orphan_hits_are_dropped_and_logged() {
        let items = vec![MultiGetItem::new("orders", "1")];
        let hits = vec![hit("orders", "1"), hit("orders", "99")];

        let response = reassociate(&items, hits);

        assert_eq!(response.items.len(), 1);
        assert!(logs_contain("matches no requested document"));
    }
}
