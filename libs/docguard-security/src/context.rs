use std::collections::HashMap;

use uuid::Uuid;

use crate::whitelist::{DOCUMENT_WHITELIST_HEADER, DocumentWhitelist};

/// Per-request execution context.
///
/// Passed by reference through the whole read path. It is never shared
/// between requests, so none of its state needs synchronisation.
///
/// It carries:
/// - the marker recording that filter-level rewriting already ran for this
///   logical request (re-entrant calls must pass through untouched)
/// - the [`DocumentWhitelist`] attached for the current downstream call
/// - free-form headers (ambient security attributes, DLS mode, ...)
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    request_id: Uuid,
    subject_id: Option<Uuid>,
    filter_level_marker: Option<String>,
    document_whitelist: Option<DocumentWhitelist>,
    headers: HashMap<String, String>,
}

/// Snapshot of the mutable part of an [`ExecutionContext`].
///
/// Produced by [`ExecutionContext::stash`] and handed back to
/// [`ExecutionContext::restore`] once the downstream call completed.
#[derive(Clone, Debug)]
#[must_use = "a stored context is useless unless restored"]
pub struct StoredContext {
    filter_level_marker: Option<String>,
    document_whitelist: Option<DocumentWhitelist>,
    headers: HashMap<String, String>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ExecutionContext {
    #[must_use]
    pub fn builder() -> ExecutionContextBuilder {
        ExecutionContextBuilder::default()
    }

    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    #[inline]
    #[must_use]
    pub fn subject_id(&self) -> Option<Uuid> {
        self.subject_id
    }

    // ── Filter-level marker ─────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn is_filter_level_applied(&self) -> bool {
        self.filter_level_marker.is_some()
    }

    #[must_use]
    pub fn filter_level_marker(&self) -> Option<&str> {
        self.filter_level_marker.as_deref()
    }

    /// Records that filter-level rewriting owns this request.
    ///
    /// The first marker wins; later calls keep the original value.
    pub fn mark_filter_level_applied(&mut self, marker: impl Into<String>) {
        if self.filter_level_marker.is_none() {
            self.filter_level_marker = Some(marker.into());
        }
    }

    // ── Document whitelist ──────────────────────────────────────────

    #[must_use]
    pub fn document_whitelist(&self) -> Option<&DocumentWhitelist> {
        self.document_whitelist.as_ref()
    }

    /// Attaches a whitelist for the next downstream call, replacing any
    /// previously attached one. The encoded form is mirrored into the
    /// [`DOCUMENT_WHITELIST_HEADER`] header.
    pub fn apply_document_whitelist(&mut self, whitelist: DocumentWhitelist) {
        self.headers.insert(
            DOCUMENT_WHITELIST_HEADER.to_owned(),
            whitelist.to_header_value(),
        );
        self.document_whitelist = Some(whitelist);
    }

    /// Whether the attached whitelist lets `(collection, id)` bypass restrictions.
    #[must_use]
    pub fn is_whitelisted(&self, collection: &str, id: &str) -> bool {
        self.document_whitelist
            .as_ref()
            .is_some_and(|wl| wl.is_whitelisted(collection, id))
    }

    // ── Headers ─────────────────────────────────────────────────────

    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Sets a header, returning the previous value.
    pub fn put_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.headers.insert(key.into(), value.into())
    }

    // ── Save / restore ──────────────────────────────────────────────

    /// Captures the current marker, whitelist and headers.
    pub fn stash(&self) -> StoredContext {
        StoredContext {
            filter_level_marker: self.filter_level_marker.clone(),
            document_whitelist: self.document_whitelist.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Reverts to a previously captured state.
    pub fn restore(&mut self, stored: StoredContext) {
        self.filter_level_marker = stored.filter_level_marker;
        self.document_whitelist = stored.document_whitelist;
        self.headers = stored.headers;
    }
}

/// Builder for [`ExecutionContext`].
#[derive(Debug, Default)]
pub struct ExecutionContextBuilder {
    request_id: Option<Uuid>,
    subject_id: Option<Uuid>,
    headers: HashMap<String, String>,
}

impl ExecutionContextBuilder {
    #[must_use]
    pub fn request_id(mut self, id: Uuid) -> Self {
        self.request_id = Some(id);
        self
    }

    #[must_use]
    pub fn subject_id(mut self, id: Uuid) -> Self {
        self.subject_id = Some(id);
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Builds the context. A random request id is assigned when none was set.
    #[must_use]
    pub fn build(self) -> ExecutionContext {
        ExecutionContext {
            request_id: self.request_id.unwrap_or_else(Uuid::new_v4),
            subject_id: self.subject_id,
            filter_level_marker: None,
            document_whitelist: None,
            headers: self.headers,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_unmarked() {
        let ctx = ExecutionContext::default();
        assert!(!ctx.is_filter_level_applied());
        assert!(ctx.document_whitelist().is_none());
    }

    #[test]
    fn first_marker_wins() {
        let mut ctx = ExecutionContext::default();
        ctx.mark_filter_level_applied("search orders");
        ctx.mark_filter_level_applied("get logs/7");

        assert_eq!(ctx.filter_level_marker(), Some("search orders"));
    }

    #[test]
    fn restore_drops_whitelist_attached_after_stash() {
        let mut ctx = ExecutionContext::builder()
            .header("tenant", "acme")
            .build();
        ctx.mark_filter_level_applied("search");

        let stored = ctx.stash();
        ctx.apply_document_whitelist(DocumentWhitelist::new().with("lookup", "1"));
        ctx.put_header("tenant", "other");
        assert!(ctx.is_whitelisted("lookup", "1"));
        let encoded = ctx.header(DOCUMENT_WHITELIST_HEADER).unwrap();
        assert!(
            DocumentWhitelist::parse_header_value(encoded)
                .unwrap()
                .is_whitelisted("lookup", "1")
        );

        ctx.restore(stored);

        assert!(!ctx.is_whitelisted("lookup", "1"));
        assert!(ctx.header(DOCUMENT_WHITELIST_HEADER).is_none());
        assert_eq!(ctx.header("tenant"), Some("acme"));
        assert!(ctx.is_filter_level_applied());
    }

    #[test]
    fn builder_keeps_explicit_ids() {
        let rid = Uuid::new_v4();
        let sid = Uuid::new_v4();
        let ctx = ExecutionContext::builder()
            .request_id(rid)
            .subject_id(sid)
            .build();

        assert_eq!(ctx.request_id(), rid);
        assert_eq!(ctx.subject_id(), Some(sid));
    }
}
