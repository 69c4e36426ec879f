//! Load lifecycle events
//!
//! Every loader owns one [`EventBus`]. Handlers subscribe to an [`EventKind`] and
//! receive the matching [`FontLoadEvent`] synchronously on whichever thread
//! emitted it; handlers are invoked outside the bus lock, so they may subscribe
//! or unsubscribe from inside a callback.

use crate::loader::errors::FontLoadError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
  FontLoadStart,
  FontLoadProgress,
  FontLoadTimeout,
  FontLoadError,
  FontLoadComplete,
  FontLoadFinished,
  FontLoadAdded,
  FontLoadResolved,
  FontAdded,
  FontRemoved,
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// Batch outcome reported once every face of a `load` call has settled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontLoadSummary {
  pub total: usize,
  pub succeeded: usize,
  pub failed: usize,
  pub failed_families: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum FontLoadEvent {
  /// A batch started
  Start { families: Vec<String> },
  /// One face of a batch settled
  Progress {
    family: String,
    completed: usize,
    total: usize,
  },
  Timeout { family: String, timeout: Duration },
  Error { family: String, error: FontLoadError },
  /// One face was registered
  Complete { family: String },
  Finished(FontLoadSummary),
  /// A face was submitted for loading
  Added { family: String },
  /// The resolver produced a loadable font for a failed face
  Resolved { family: String },
  /// The registry now knows the family
  FontAdded { family: String },
  FontRemoved { family: String },
}

impl FontLoadEvent {
  pub fn kind(&self) -> EventKind {
    match self {
      FontLoadEvent::Start { .. } => EventKind::FontLoadStart,
      FontLoadEvent::Progress { .. } => EventKind::FontLoadProgress,
      FontLoadEvent::Timeout { .. } => EventKind::FontLoadTimeout,
      FontLoadEvent::Error { .. } => EventKind::FontLoadError,
      FontLoadEvent::Complete { .. } => EventKind::FontLoadComplete,
      FontLoadEvent::Finished(_) => EventKind::FontLoadFinished,
      FontLoadEvent::Added { .. } => EventKind::FontLoadAdded,
      FontLoadEvent::Resolved { .. } => EventKind::FontLoadResolved,
      FontLoadEvent::FontAdded { .. } => EventKind::FontAdded,
      FontLoadEvent::FontRemoved { .. } => EventKind::FontRemoved,
    }
  }

  /// Family the event is about; `None` for batch-level events.
  pub fn family(&self) -> Option<&str> {
    match self {
      FontLoadEvent::Start { .. } | FontLoadEvent::Finished(_) => None,
      FontLoadEvent::Progress { family, .. }
      | FontLoadEvent::Timeout { family, .. }
      | FontLoadEvent::Error { family, .. }
      | FontLoadEvent::Complete { family }
      | FontLoadEvent::Added { family }
      | FontLoadEvent::Resolved { family }
      | FontLoadEvent::FontAdded { family }
      | FontLoadEvent::FontRemoved { family } => Some(family),
    }
  }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type EventHandler = Arc<dyn Fn(&FontLoadEvent) + Send + Sync>;

struct Listener {
  id: ListenerId,
  kind: EventKind,
  handler: EventHandler,
}

#[derive(Default)]
pub struct EventBus {
  listeners: RwLock<Vec<Listener>>,
  next_id: AtomicU64,
}

impl fmt::Debug for EventBus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventBus")
      .field("listeners", &self.listeners.read().len())
      .finish()
  }
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on(&self, kind: EventKind, handler: impl Fn(&FontLoadEvent) + Send + Sync + 'static) -> ListenerId {
    let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
    self.listeners.write().push(Listener {
      id,
      kind,
      handler: Arc::new(handler),
    });
    id
  }

  /// Returns whether a listener was removed.
  pub fn off(&self, id: ListenerId) -> bool {
    let mut listeners = self.listeners.write();
    let before = listeners.len();
    listeners.retain(|l| l.id != id);
    listeners.len() != before
  }

  pub fn emit(&self, event: &FontLoadEvent) {
    let kind = event.kind();
    let handlers: Vec<EventHandler> = self
      .listeners
      .read()
      .iter()
      .filter(|l| l.kind == kind)
      .map(|l| Arc::clone(&l.handler))
      .collect();
    for handler in handlers {
      handler(event);
    }
  }

  pub fn listener_count(&self, kind: EventKind) -> usize {
    self.listeners.read().iter().filter(|l| l.kind == kind).count()
  }

  /// Clears listeners of `kind`, or every listener when `kind` is `None`.
  pub fn remove_all_listeners(&self, kind: Option<EventKind>) {
    let mut listeners = self.listeners.write();
    match kind {
      Some(kind) => listeners.retain(|l| l.kind != kind),
      None => listeners.clear(),
    }
  }

  /// Kinds with at least one listener, sorted.
  pub fn event_kinds(&self) -> Vec<EventKind> {
    let mut kinds: Vec<EventKind> = self.listeners.read().iter().map(|l| l.kind).collect();
    kinds.sort_unstable();
    kinds.dedup();
    kinds
  }
}
