//! Asset lifecycle notifications.

use std::sync::Arc;

use crate::scene::NodeId;
use crate::texture::Texture;

/// A lifecycle notification for one asset request.
#[derive(Debug, Clone)]
pub enum AssetEvent {
    /// The node tree was built and attached. `errors` lists every
    /// recoverable problem met along the way.
    ModelLoaded {
        /// Requested file.
        file: String,
        /// Root of the imported subtree.
        root: NodeId,
        /// Accumulated recoverable errors.
        errors: Vec<String>,
    },
    /// The model could not be loaded at all.
    ModelError {
        /// Requested file.
        file: String,
        /// Why.
        error: String,
    },
    /// One texture finished decoding.
    TextureLoaded {
        /// Resolved texture key.
        key: String,
        /// The texture, now ready.
        texture: Arc<Texture>,
    },
    /// One texture failed; the white substitute is bound.
    TextureError {
        /// Resolved texture key.
        key: String,
        /// Why.
        error: String,
    },
    /// The model and every texture it requested are done.
    AssetLoaded {
        /// Requested file.
        file: String,
        /// Root of the imported subtree, if the model loaded.
        root: Option<NodeId>,
        /// Accumulated errors, texture failures included.
        errors: Vec<String>,
    },
}

/// Receives [`AssetEvent`]s. Called from whichever thread produced the
/// event.
pub trait AssetListener: Send + Sync {
    /// Handle one event.
    fn on_asset_event(&self, event: &AssetEvent);
}

impl<F> AssetListener for F
where
    F: Fn(&AssetEvent) + Send + Sync,
{
    fn on_asset_event(&self, event: &AssetEvent) {
        self(event)
    }
}

/// Delivers events to listeners in a fixed order: the request's own
/// listeners, then the asset loader's listener, then the context listener.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    loader: Option<Arc<dyn AssetListener>>,
    context: Option<Arc<dyn AssetListener>>,
}

impl EventDispatcher {
    /// Dispatcher with no loader or context listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the asset loader's listener.
    #[must_use]
    pub fn with_loader_listener(mut self, listener: Arc<dyn AssetListener>) -> Self {
        self.loader = Some(listener);
        self
    }

    /// Set the application-wide context listener.
    #[must_use]
    pub fn with_context_listener(mut self, listener: Arc<dyn AssetListener>) -> Self {
        self.context = Some(listener);
        self
    }

    /// Deliver `event`.
    pub fn dispatch(&self, request_listeners: &[Arc<dyn AssetListener>], event: &AssetEvent) {
        log::trace!("dispatching {event:?}");
        for listener in request_listeners {
            listener.on_asset_event(event);
        }
        if let Some(loader) = &self.loader {
            loader.on_asset_event(event);
        }
        if let Some(context) = &self.context {
            context.on_asset_event(event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("loader", &self.loader.is_some())
            .field("context", &self.context.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn delivery_order_is_request_loader_context() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tag = |name: &'static str| -> Arc<dyn AssetListener> {
            let log = Arc::clone(&log);
            Arc::new(move |_: &AssetEvent| log.lock().push(name))
        };
        let dispatcher = EventDispatcher::new()
            .with_context_listener(tag("context"))
            .with_loader_listener(tag("loader"));

        let event = AssetEvent::ModelError {
            file: "a.gltf".into(),
            error: "boom".into(),
        };
        dispatcher.dispatch(&[tag("request-1"), tag("request-2")], &event);
        assert_eq!(
            *log.lock(),
            ["request-1", "request-2", "loader", "context"]
        );
    }
}
