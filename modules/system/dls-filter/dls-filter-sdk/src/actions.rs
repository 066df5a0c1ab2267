//! Action identifiers the request classifier recognises.

/// Prefixes of administrative and cluster-scoped actions.
pub const ADMIN_PREFIXES: &[&str] = &[
    "docguard:cluster:",
    "cluster:",
    "indices:admin/template/",
    "indices:admin/index_template/",
];

pub const SEARCH: &str = "indices:data/read/search";
pub const GET: &str = "indices:data/read/get";
pub const MULTI_GET: &str = "indices:data/read/mget";
pub const SHARD_RESOLUTION: &str = "indices:admin/shards/search_shards";

/// Scroll continuations; restrictions were bound when the scroll was opened.
pub const SCROLL_PREFIX: &str = "indices:data/read/scroll";

pub const SEARCH_TEMPLATE: &str = "indices:data/read/search/template";
pub const MULTI_SEARCH_TEMPLATE: &str = "indices:data/read/msearch/template";
pub const MULTI_SEARCH: &str = "indices:data/read/msearch";
