//! Tracing and logging setup shared by portal binaries.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(None);
}

/// Like [`init`], but with an explicit filter directive used when `RUST_LOG`
/// is not set.
pub fn init_with_filter(default_directive: &str) {
    tracing::init(Some(default_directive));
}

/// Tracing configuration (filters, layers).
pub mod tracing;
