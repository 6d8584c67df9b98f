//! Shared background runtime for fetch and parse work.

use std::sync::OnceLock;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

/// Lazily-initialized runtime shared by all resolver instances in the
/// process. Fetches run here so the host render loop never blocks on I/O.
pub fn loader_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| Runtime::new().expect("Failed to create loader runtime"))
}

/// Spawns a load task onto the shared runtime. If the caller is already
/// inside a tokio runtime the task is spawned there instead, which keeps
/// tests on `#[tokio::test]` runtimes single-threaded and deterministic.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle.spawn(future),
        Err(_) => loader_runtime().spawn(future),
    }
}
