//! Index readiness as an explicit state machine.
//!
//! ```text
//!                 Loaded(non-empty, compatible)
//!   Empty ──────────────────────────────────────▶ Ready
//!     ▲  ╲  Loaded(non-empty, incompatible)        ▲ │
//!     │   ╲──────────────▶ Stale ──Ingested(n>0)───┘ │
//!     │                      │                       │
//!     └──── Reset / IncompatibilityDetected ◀────────┘
//! ```
//!
//! `Ingested` with at least one chunk moves any state to `Ready`.

use serde::Serialize;
use std::fmt;

/// Whether the vector index can serve queries for the current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// Nothing indexed
    #[default]
    Empty,
    /// Holds vectors built with a different model or chunking strategy
    Stale,
    /// Holds vectors matching the current model and strategy
    Ready,
}

/// Something that happened to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessEvent {
    /// A load attempt finished
    Loaded {
        /// At least one vector was restored
        non_empty: bool,
        /// Stored metadata matches the current model and strategy
        compatible: bool,
    },
    /// An ingest finished, adding this many chunks
    Ingested { chunks: usize },
    /// Metadata disagreed with the current configuration and the index was dropped
    IncompatibilityDetected,
    /// Explicit reset
    Reset,
}

impl Readiness {
    /// State after `event`.
    #[must_use]
    pub fn on(self, event: ReadinessEvent) -> Readiness {
        match event {
            ReadinessEvent::Loaded {
                non_empty: false, ..
            } => Readiness::Empty,
            ReadinessEvent::Loaded {
                non_empty: true,
                compatible: true,
            } => Readiness::Ready,
            ReadinessEvent::Loaded {
                non_empty: true,
                compatible: false,
            } => Readiness::Stale,
            ReadinessEvent::Ingested { chunks: 0 } => self,
            ReadinessEvent::Ingested { .. } => Readiness::Ready,
            ReadinessEvent::IncompatibilityDetected | ReadinessEvent::Reset => Readiness::Empty,
        }
    }

    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Readiness::Empty => "empty",
            Readiness::Stale => "stale",
            Readiness::Ready => "ready",
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
