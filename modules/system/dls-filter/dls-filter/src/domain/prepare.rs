//! Request adjustments applied to every restricted read, whatever the DLS mode.

use dls_filter_sdk::{DlsFilterError, ReadRequest};

/// Makes `request` safe to run under document-level restrictions.
///
/// - searches: no profiling, no shard request cache, no zero-count buckets
/// - gets: never served from the realtime translog
///
/// # Errors
///
/// Returns [`DlsFilterError::Denied`] for searches DLS cannot honour.
pub(crate) fn prepare(
    request: &mut ReadRequest,
    force_min_doc_count_to_one: bool,
) -> Result<(), DlsFilterError> {
    match request {
        ReadRequest::Search(search) => {
            if search.profile {
                return Err(DlsFilterError::Denied(
                    "Profiling is not supported when DLS is activated".to_owned(),
                ));
            }

            for agg in search
                .aggregations
                .iter_mut()
                .filter(|agg| agg.min_doc_count == 0)
            {
                if !force_min_doc_count_to_one {
                    return Err(DlsFilterError::Denied(
                        "min_doc_count 0 is not supported when DLS is activated".to_owned(),
                    ));
                }
                tracing::debug!(aggregation = %agg.name, "forcing min_doc_count to 1");
                agg.min_doc_count = 1;
            }

            search.request_cache = Some(false);
        }
        ReadRequest::Get(get) => get.realtime = false,
        ReadRequest::MultiGet(mget) => mget.realtime = false,
        ReadRequest::ShardResolution(_) => {}
    }
    Ok(())
}
