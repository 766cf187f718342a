//! Lifecycle notifications
//!
//! The generic repository publishes a [`LifecycleEvent`] before and after
//! every create and update. Listeners run synchronously, in registration
//! order. A failing listener is logged and never aborts the write.
//!
//! ```rust
//! use crud_service::repository::{LifecycleEvent, ListenerError, Notifier};
//!
//! let notifier = Notifier::new().with_listener(|event: &LifecycleEvent| {
//!     println!("{} {}", event.kind(), event.entity());
//!     Ok::<(), ListenerError>(())
//! });
//! assert_eq!(notifier.len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::record::Record;

/// A create or update seen by listeners
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Validated input about to be inserted
    BeforeCreate {
        /// Entity name
        entity: &'static str,
        /// Input as received, before secret columns are hashed
        data: Map<String, Value>,
    },
    /// Record just inserted
    AfterCreate {
        /// Entity name
        entity: &'static str,
        /// Stored record
        record: Record,
    },
    /// Validated input about to be applied to an existing record
    BeforeUpdate {
        /// Entity name
        entity: &'static str,
        /// Input as received, before secret columns are hashed
        data: Map<String, Value>,
        /// Record as stored before the update
        record: Record,
    },
    /// Record just updated
    AfterUpdate {
        /// Entity name
        entity: &'static str,
        /// Stored record after the update
        record: Record,
    },
}

impl LifecycleEvent {
    /// Event name, e.g. `before_create`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BeforeCreate { .. } => "before_create",
            Self::AfterCreate { .. } => "after_create",
            Self::BeforeUpdate { .. } => "before_update",
            Self::AfterUpdate { .. } => "after_update",
        }
    }

    /// Entity the event concerns
    pub fn entity(&self) -> &'static str {
        match self {
            Self::BeforeCreate { entity, .. }
            | Self::AfterCreate { entity, .. }
            | Self::BeforeUpdate { entity, .. }
            | Self::AfterUpdate { entity, .. } => *entity,
        }
    }

    /// Id of the record involved, if one exists yet
    pub fn record_id(&self) -> Option<i64> {
        match self {
            Self::BeforeCreate { .. } => None,
            Self::AfterCreate { record, .. }
            | Self::BeforeUpdate { record, .. }
            | Self::AfterUpdate { record, .. } => Some(record.id),
        }
    }
}

/// Error raised by a listener
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lifecycle listener failed: {0}")]
pub struct ListenerError(pub String);

/// Receives lifecycle events
pub trait LifecycleListener: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &LifecycleEvent) -> Result<(), ListenerError>;
}

impl<F> LifecycleListener for F
where
    F: Fn(&LifecycleEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Fan-out of lifecycle events to registered listeners
#[derive(Clone, Default)]
pub struct Notifier {
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Notifier {
    /// Notifier with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    #[must_use]
    pub fn with_listener(mut self, listener: impl LifecycleListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Add a shared listener
    pub fn register(&mut self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener
    pub fn publish(&self, event: LifecycleEvent) {
        for listener in &self.listeners {
            if let Err(error) = listener.on_event(&event) {
                tracing::warn!(
                    event = event.kind(),
                    entity = event.entity(),
                    record_id = ?event.record_id(),
                    error = %error,
                    "Lifecycle listener failed"
                );
            }
        }
    }
}

/// Logs every lifecycle event
///
/// Input payloads are not logged; only their keys are.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl LifecycleListener for TracingListener {
    fn on_event(&self, event: &LifecycleEvent) -> Result<(), ListenerError> {
        match event {
            LifecycleEvent::BeforeCreate { data, .. } | LifecycleEvent::BeforeUpdate { data, .. } => {
                let fields: Vec<&str> = data.keys().map(String::as_str).collect();
                tracing::info!(
                    event = event.kind(),
                    entity = event.entity(),
                    record_id = ?event.record_id(),
                    fields = ?fields,
                    "Lifecycle event"
                );
            }
            LifecycleEvent::AfterCreate { .. } | LifecycleEvent::AfterUpdate { .. } => {
                tracing::info!(
                    event = event.kind(),
                    entity = event.entity(),
                    record_id = ?event.record_id(),
                    "Lifecycle event"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    impl LifecycleListener for Recorder {
        fn on_event(&self, event: &LifecycleEvent) -> Result<(), ListenerError> {
            self.seen.lock().unwrap().push(event.kind());
            Ok(())
        }
    }

    fn before_create() -> LifecycleEvent {
        LifecycleEvent::BeforeCreate {
            entity: "User",
            data: Map::new(),
        }
    }

    #[test]
    fn test_listeners_run_in_order_and_failures_do_not_stop_delivery() {
        let recorder = Arc::new(Recorder::default());
        let mut notifier = Notifier::new()
            .with_listener(|_: &LifecycleEvent| Err::<(), _>(ListenerError("boom".to_string())));
        notifier.register(recorder.clone());
        notifier.register(Arc::new(TracingListener));

        notifier.publish(before_create());

        assert_eq!(notifier.len(), 3);
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["before_create"]);
    }

    #[test]
    fn test_event_accessors() {
        let event = before_create();
        assert_eq!(event.kind(), "before_create");
        assert_eq!(event.entity(), "User");
        assert_eq!(event.record_id(), None);
        assert!(Notifier::new().is_empty());
    }
}
