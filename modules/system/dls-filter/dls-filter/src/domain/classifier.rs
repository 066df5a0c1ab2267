//! Pre-filter deciding whether filter-level rewriting applies to an action.

use dls_filter_sdk::actions;
use docguard_security::ExecutionContext;

/// Why a request is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Rewriting already ran for this logical request (re-entrant call).
    AlreadyApplied,
    /// Administrative or cluster-scoped action.
    Administrative,
    /// Scroll continuation; restrictions were bound when the scroll opened.
    ScrollContinuation,
    /// Templated or composite search, restricted on a lower layer.
    CompositeSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Skip(SkipReason),
    Proceed,
}

/// Classifies `action` for the request behind `ctx`.
///
/// `Skip` leaves the context untouched. `Proceed` marks the context before
/// returning, so any call re-entering the read path with this context is
/// classified as [`SkipReason::AlreadyApplied`].
pub fn classify(ctx: &mut ExecutionContext, action: &str) -> Classification {
    if let Some(reason) = skip_reason(ctx, action) {
        tracing::trace!(action, ?reason, "filter-level DLS skipped");
        return Classification::Skip(reason);
    }

    ctx.mark_filter_level_applied(format!("{action} [{}]", ctx.request_id()));
    Classification::Proceed
}

fn skip_reason(ctx: &ExecutionContext, action: &str) -> Option<SkipReason> {
    if ctx.is_filter_level_applied() {
        return Some(SkipReason::AlreadyApplied);
    }

    if actions::ADMIN_PREFIXES
        .iter()
        .any(|prefix| action.starts_with(prefix))
    {
        return Some(SkipReason::Administrative);
    }

    if action.starts_with(actions::SCROLL_PREFIX) {
        return Some(SkipReason::ScrollContinuation);
    }

    if action == actions::SEARCH_TEMPLATE
        || action == actions::MULTI_SEARCH_TEMPLATE
        || action == actions::MULTI_SEARCH
    {
        return Some(SkipReason::CompositeSearch);
    }

    None
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn search_proceeds_and_marks_context() {
        let mut ctx = ExecutionContext::default();

        assert_eq!(classify(&mut ctx, actions::SEARCH), Classification::Proceed);
        assert!(ctx.is_filter_level_applied());
        assert!(
            ctx.filter_level_marker()
                .is_some_and(|m| m.starts_with(actions::SEARCH))
        );
    }

    #[test]
    fn reentry_is_skipped() {
        let mut ctx = ExecutionContext::default();
        assert_eq!(classify(&mut ctx, actions::GET), Classification::Proceed);

        for _ in 0..3 {
            assert_eq!(
                classify(&mut ctx, actions::SEARCH),
                Classification::Skip(SkipReason::AlreadyApplied)
            );
        }
    }

    #[test]
    fn administrative_actions_are_skipped_without_marking() {
        for action in [
            "cluster:monitor/health",
            "docguard:cluster:config/update",
            "indices:admin/template/put",
            "indices:admin/index_template/get",
        ] {
            let mut ctx = ExecutionContext::default();
            assert_eq!(
                classify(&mut ctx, action),
                Classification::Skip(SkipReason::Administrative),
                "{action}"
            );
            assert!(!ctx.is_filter_level_applied());
        }
    }

    #[test]
    fn scroll_continuation_is_skipped() {
        let mut ctx = ExecutionContext::default();
        assert_eq!(
            classify(&mut ctx, "indices:data/read/scroll"),
            Classification::Skip(SkipReason::ScrollContinuation)
        );
        assert_eq!(
            classify(&mut ctx, "indices:data/read/scroll/clear"),
            Classification::Skip(SkipReason::ScrollContinuation)
        );
    }

    #[test]
    fn composite_searches_are_skipped() {
        for action in [
            actions::SEARCH_TEMPLATE,
            actions::MULTI_SEARCH_TEMPLATE,
            actions::MULTI_SEARCH,
        ] {
            let mut ctx = ExecutionContext::default();
            assert_eq!(
                classify(&mut ctx, action),
                Classification::Skip(SkipReason::CompositeSearch)
            );
        }
    }

    #[test]
    fn shard_resolution_proceeds() {
        let mut ctx = ExecutionContext::default();
        assert_eq!(
            classify(&mut ctx, actions::SHARD_RESOLUTION),
            Classification::Proceed
        );
    }
}
