//! Binary module loading with progress hooks
//!
//! The loader fetches the module through the lifecycle host (so it is
//! served from cache once installed), hands the bytes to an
//! [`Instantiator`], and fires the [`LoaderHooks`] in order:
//! `on_start`, `on_progress`*, `on_complete`, then exactly one of
//! `on_success` or `on_failure`.

mod reporter;

pub use reporter::{LoaderHooks, ProgressEvent, ProgressReporter, ProgressSurface};

#[cfg(test)]
pub(crate) use reporter::tests::RecordingSurface;

use crate::error::{PrecacheError, PrecacheResult};
use crate::fetch::Request;
use crate::host::LifecycleHost;
use tracing::{debug, info};

/// Progress is reported once per chunk of this many bytes
const PROGRESS_CHUNK: usize = 64 * 1024;

/// Turns fetched module bytes into something runnable
pub trait Instantiator: Send + Sync {
    fn instantiate(&self, module: &[u8]) -> PrecacheResult<()>;
}

/// Accepts any well-formed WebAssembly binary header
#[derive(Debug, Clone, Copy, Default)]
pub struct WasmHeaderCheck;

impl Instantiator for WasmHeaderCheck {
    fn instantiate(&self, module: &[u8]) -> PrecacheResult<()> {
        const MAGIC: &[u8] = b"\0asm";
        const VERSION: &[u8] = &[1, 0, 0, 0];

        if module.len() < 8 || &module[..4] != MAGIC {
            return Err(PrecacheError::Instantiate(
                "not a WebAssembly module".to_string(),
            ));
        }
        if &module[4..8] != VERSION {
            return Err(PrecacheError::Instantiate(format!(
                "unsupported WebAssembly version {:?}",
                &module[4..8]
            )));
        }
        Ok(())
    }
}

/// Loads one binary module through a lifecycle host
pub struct ModuleLoader<'a> {
    host: &'a LifecycleHost,
    module: Request,
    instantiator: Box<dyn Instantiator + 'a>,
}

impl<'a> ModuleLoader<'a> {
    /// Load `module_path` and validate it as WebAssembly
    pub fn new(host: &'a LifecycleHost, module_path: &str) -> Self {
        Self {
            host,
            module: Request::get(module_path),
            instantiator: Box::new(WasmHeaderCheck),
        }
    }

    /// Use a different instantiation step
    pub fn with_instantiator(mut self, instantiator: impl Instantiator + 'a) -> Self {
        self.instantiator = Box::new(instantiator);
        self
    }

    /// Fetch and instantiate the module, reporting through `hooks`
    pub async fn load(&self, hooks: &dyn LoaderHooks) -> PrecacheResult<Vec<u8>> {
        hooks.on_start();

        match self.run(hooks).await {
            Ok(module) => {
                info!("Loaded {} ({} bytes)", self.module.path, module.len());
                hooks.on_success();
                Ok(module)
            }
            Err(e) => {
                hooks.on_failure(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run(&self, hooks: &dyn LoaderHooks) -> PrecacheResult<Vec<u8>> {
        let response = self.host.fetch(&self.module).await?;
        if !response.is_success() {
            return Err(PrecacheError::network(
                &self.module.path,
                format!("HTTP {}", response.status),
            ));
        }

        let total = response
            .header("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(response.body.len() as u64);

        let mut current = 0u64;
        for chunk in response.body.chunks(PROGRESS_CHUNK) {
            current += chunk.len() as u64;
            hooks.on_progress(ProgressEvent { current, total });
        }
        debug!("Received {} of {} bytes", current, total);

        hooks.on_complete();
        self.instantiator.instantiate(&response.body)?;
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheIdentity, MemoryStorage};
    use crate::controller::tests::{full_origin, manifest, FakeOrigin};
    use crate::controller::CacheController;
    use crate::fetch::Response;
    use std::sync::{Arc, Mutex};

    /// Hooks that record the call sequence
    #[derive(Default)]
    struct CallLog(Mutex<Vec<String>>);

    impl CallLog {
        fn calls(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl LoaderHooks for CallLog {
        fn on_start(&self) {
            self.0.lock().unwrap().push("start".into());
        }
        fn on_progress(&self, event: ProgressEvent) {
            self.0
                .lock()
                .unwrap()
                .push(format!("progress {}/{}", event.current, event.total));
        }
        fn on_complete(&self) {
            self.0.lock().unwrap().push("complete".into());
        }
        fn on_success(&self) {
            self.0.lock().unwrap().push("success".into());
        }
        fn on_failure(&self, error: &str) {
            self.0.lock().unwrap().push(format!("failure {}", error));
        }
    }

    const WASM: &[u8] = b"\0asm\x01\0\0\0";

    #[test]
    fn wasm_header_check() {
        assert!(WasmHeaderCheck.instantiate(WASM).is_ok());
        assert!(WasmHeaderCheck.instantiate(b"<html>").is_err());
        assert!(WasmHeaderCheck.instantiate(b"\0asm\x02\0\0\0").is_err());
        assert!(WasmHeaderCheck.instantiate(b"\0asm").is_err());
    }

    #[tokio::test]
    async fn successful_load_fires_hooks_in_order() {
        let origin = Arc::new(full_origin());
        let host = LifecycleHost::new(origin);
        let log = CallLog::default();

        let module = ModuleLoader::new(&host, "./app_bg.wasm")
            .load(&log)
            .await
            .unwrap();

        assert_eq!(module, WASM);
        assert_eq!(log.calls(), vec!["start", "progress 8/8", "complete", "success"]);
    }

    #[tokio::test]
    async fn large_module_reports_chunked_progress() {
        let mut body = WASM.to_vec();
        body.resize(PROGRESS_CHUNK * 2 + 10, 0);
        let mut origin = FakeOrigin::default();
        origin
            .responses
            .insert("big.wasm".to_string(), Response::new(200, body));
        let host = LifecycleHost::new(Arc::new(origin));
        let log = CallLog::default();

        ModuleLoader::new(&host, "./big.wasm").load(&log).await.unwrap();

        let progress: Vec<_> = log
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("progress"))
            .collect();
        assert_eq!(progress.len(), 3);
        assert_eq!(
            progress.last().unwrap(),
            &format!("progress {0}/{0}", PROGRESS_CHUNK * 2 + 10)
        );
    }

    #[tokio::test]
    async fn network_failure_reports_once_without_success() {
        let origin = Arc::new(full_origin().fail("./app_bg.wasm"));
        let host = LifecycleHost::new(origin);
        let log = CallLog::default();

        let result = ModuleLoader::new(&host, "./app_bg.wasm").load(&log).await;
        assert!(result.is_err());

        let calls = log.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], "start");
        assert!(calls[1].starts_with("failure"));
        assert!(calls[1].contains("connection refused"));
    }

    #[tokio::test]
    async fn instantiation_failure_comes_after_complete() {
        let origin = Arc::new(full_origin());
        let host = LifecycleHost::new(origin);
        let log = CallLog::default();

        let result = ModuleLoader::new(&host, "./app.js").load(&log).await;
        assert!(matches!(result, Err(PrecacheError::Instantiate(_))));

        let calls = log.calls();
        assert_eq!(calls[calls.len() - 2], "complete");
        assert!(calls.last().unwrap().starts_with("failure"));
        assert!(!calls.contains(&"success".to_string()));
    }

    #[tokio::test]
    async fn missing_module_is_a_failure() {
        let origin = Arc::new(full_origin());
        let host = LifecycleHost::new(origin);
        let log = CallLog::default();

        let err = ModuleLoader::new(&host, "./gone.wasm")
            .load(&log)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn failure_leaves_reporter_hidden_with_error() {
        let origin = Arc::new(full_origin().fail("./app_bg.wasm"));
        let host = LifecycleHost::new(origin);
        let reporter = ProgressReporter::new(RecordingSurface::default());

        let _ = ModuleLoader::new(&host, "./app_bg.wasm").load(&reporter).await;

        let state = reporter.surface().snapshot();
        assert!(!state.visible);
        assert!(state.status.contains("connection refused"));
    }

    #[tokio::test]
    async fn cached_module_loads_offline() {
        let storage = Arc::new(MemoryStorage::new());
        let online = Arc::new(full_origin());
        let mut host = LifecycleHost::new(online.clone());
        host.deploy(CacheController::new(
            CacheIdentity::versioned("app-cache", Some("b1")),
            manifest(),
            storage.clone(),
            online.clone(),
        ))
        .await
        .unwrap();

        let before = online.total_calls();
        let reporter = ProgressReporter::new(RecordingSurface::default());
        ModuleLoader::new(&host, "./app_bg.wasm")
            .load(&reporter)
            .await
            .unwrap();

        assert_eq!(online.total_calls(), before);
        let state = reporter.surface().snapshot();
        assert_eq!(state.percent, Some(100));
        assert_eq!(state.status, "Ready");
    }
}
