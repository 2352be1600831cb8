// -
// Database namespaces

/// Directory under `db_root_dir` holding the sled database
pub(crate) const SLED_DOCUMENTS_DIR: &str = "documents";

/// Sled tree holding every collection, keyed `<collection>/<id>`
pub(crate) const SLED_DOCUMENTS_TREE: &str = "_documents_tree";

// -
// Audit

/// Upper bound on entries returned by a cross-session audit listing
pub(crate) const MAX_RECENT_AUDIT_ENTRIES: usize = 100;

/// Tracing target of the tracing audit sink
pub(crate) const AUDIT_TRACING_TARGET: &str = "ballotbox::audit";
