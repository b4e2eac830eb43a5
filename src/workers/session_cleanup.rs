use crate::store::Store;

/// Hourly sweep of expired session rows.
pub async fn run(store: &Store) {
    match store.cleanup_expired_sessions() {
        Ok(removed) => tracing::info!(removed, "session_cleanup: done"),
        Err(e) => tracing::error!(error=%e, "session_cleanup failed"),
    }
}
