/// Liveness check handler.
///
/// Returns "OK" if the process is running. Does not check dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}
