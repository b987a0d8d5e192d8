//! Per-model load requests.
//!
//! A request tracks outstanding texture loads. The counter starts at one
//! for the model itself; each texture request adds one and each completion
//! (model or texture) removes one. Whoever brings it to zero swaps in a
//! sentinel and fires [`AssetEvent::AssetLoaded`], so the event fires at
//! most once and late completions cannot re-trigger it.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use parking_lot::Mutex;

use crate::scene::NodeId;

use super::ImportSettings;
use super::events::{AssetEvent, AssetListener, EventDispatcher};

const COMPLETED: i32 = i32::MIN;

/// One model load.
pub struct AssetRequest {
    file: String,
    settings: ImportSettings,
    use_cache: bool,
    listeners: Vec<Arc<dyn AssetListener>>,
    pending: AtomicI32,
    errors: Mutex<Vec<String>>,
    root: Mutex<Option<NodeId>>,
}

impl AssetRequest {
    /// Request `file` with recommended settings and the texture cache on.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            settings: ImportSettings::recommended(),
            use_cache: true,
            listeners: Vec::new(),
            pending: AtomicI32::new(1),
            errors: Mutex::new(Vec::new()),
            root: Mutex::new(None),
        }
    }

    /// Set the import settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ImportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Enable or disable sharing textures through the texture cache.
    #[must_use]
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Add a listener that receives this request's events first.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn AssetListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Requested file.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Import settings.
    pub fn settings(&self) -> ImportSettings {
        self.settings
    }

    /// Whether textures go through the cache.
    pub fn uses_cache(&self) -> bool {
        self.use_cache
    }

    /// Per-request listeners.
    pub fn listeners(&self) -> &[Arc<dyn AssetListener>] {
        &self.listeners
    }

    /// Root of the imported subtree, once known.
    pub fn root(&self) -> Option<NodeId> {
        *self.root.lock()
    }

    pub(crate) fn set_root(&self, root: NodeId) {
        *self.root.lock() = Some(root);
    }

    /// Record a recoverable error.
    pub fn add_error(&self, error: impl Into<String>) {
        let error = error.into();
        log::error!("{}: {error}", self.file);
        self.errors.lock().push(error);
    }

    /// Append errors that were already logged where they occurred.
    pub(crate) fn extend_errors(&self, errors: impl IntoIterator<Item = String>) {
        self.errors.lock().extend(errors);
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    /// Number of outstanding completions, or `None` once completed.
    pub fn pending(&self) -> Option<i32> {
        let value = self.pending.load(Ordering::Acquire);
        (value != COMPLETED).then_some(value)
    }

    /// Count one more texture load. Returns `false` if the request has
    /// already completed.
    pub fn texture_started(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > 0).then(|| n + 1)
            })
            .is_ok()
    }

    /// Count one completion and fire [`AssetEvent::AssetLoaded`] if it was
    /// the last. Returns whether this call fired the event.
    pub fn complete_one(&self, dispatcher: &EventDispatcher) -> bool {
        let previous = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > 0).then(|| n - 1)
            });
        if previous != Ok(1) {
            return false;
        }
        if self
            .pending
            .compare_exchange(0, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let event = AssetEvent::AssetLoaded {
            file: self.file.clone(),
            root: self.root(),
            errors: self.errors(),
        };
        dispatcher.dispatch(&self.listeners, &event);
        true
    }
}

impl std::fmt::Debug for AssetRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetRequest")
            .field("file", &self.file)
            .field("settings", &self.settings)
            .field("use_cache", &self.use_cache)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_listener(count: &Arc<AtomicUsize>) -> Arc<dyn AssetListener> {
        let count = Arc::clone(count);
        Arc::new(move |event: &AssetEvent| {
            if matches!(event, AssetEvent::AssetLoaded { .. }) {
                count.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[test]
    fn use_cache_honours_argument() {
        assert!(!AssetRequest::new("a.glb").use_cache(false).uses_cache());
        assert!(AssetRequest::new("a.glb").use_cache(true).uses_cache());
    }

    #[test]
    fn completion_fires_once_after_last_texture() {
        let fired = Arc::new(AtomicUsize::new(0));
        let request = AssetRequest::new("a.glb").with_listener(counting_listener(&fired));
        let dispatcher = EventDispatcher::new();

        assert!(request.texture_started());
        assert!(request.texture_started());
        assert!(!request.complete_one(&dispatcher));
        assert!(!request.complete_one(&dispatcher));
        assert!(request.complete_one(&dispatcher));
        assert_eq!(request.pending(), None);

        assert!(!request.complete_one(&dispatcher));
        assert!(!request.texture_started());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_completions_leave_the_request_completed() {
        let fired = Arc::new(AtomicUsize::new(0));
        let request = AssetRequest::new("a.glb").with_listener(counting_listener(&fired));
        let dispatcher = EventDispatcher::new();
        assert!(request.complete_one(&dispatcher));

        for _ in 0..3 {
            assert!(!request.texture_started());
            assert!(!request.complete_one(&dispatcher));
        }
        assert_eq!(request.pending(), None);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_completions_fire_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let request = Arc::new(AssetRequest::new("a.glb").with_listener(counting_listener(&fired)));
        for _ in 0..64 {
            assert!(request.texture_started());
        }
        let dispatcher = Arc::new(EventDispatcher::new());
        let threads: Vec<_> = (0..65)
            .map(|_| {
                let request = Arc::clone(&request);
                let dispatcher = Arc::clone(&dispatcher);
                std::thread::spawn(move || request.complete_one(&dispatcher))
            })
            .collect();
        let winners = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|&fired| fired)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
