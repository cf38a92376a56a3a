//! The Interactive Surface: everything the workflow may do to the live
//! document.
//!
//! Every method is a suspend point. Implementations must not assume that a
//! `Control` obtained before a mutating call (activate, event sequence,
//! deletion) still refers to anything afterwards; callers in this crate never
//! hold one across such a boundary.

use std::time::Duration;

use async_trait::async_trait;

use crate::identifier::Identifier;

/// Errors reported by a surface binding.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// The control no longer belongs to the document.
    #[error("stale control: {0}")]
    Stale(String),

    /// No element matching the container selector encloses the control.
    #[error("no enclosing container matches `{selector}`")]
    ContainerNotFound { selector: String },

    /// The container carries no usable identifier.
    #[error("container has no identifier")]
    MissingIdentifier,

    /// Transport or protocol failure talking to the document engine.
    #[error("surface engine error: {0}")]
    Engine(String),
}

/// Low-level pointer events the surface can synthesize on a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Press,
    Release,
    Activate,
}

impl PointerEvent {
    /// DOM event type name.
    pub fn dom_name(self) -> &'static str {
        match self {
            PointerEvent::Press => "mousedown",
            PointerEvent::Release => "mouseup",
            PointerEvent::Activate => "click",
        }
    }
}

/// Sequence required for popup list entries to register a selection. A lone
/// synthesized click is ignored by those entries.
pub const COMMIT_SEQUENCE: [PointerEvent; 3] = [
    PointerEvent::Press,
    PointerEvent::Release,
    PointerEvent::Activate,
];

/// Capability set over a live, asynchronously-updating document.
#[async_trait]
pub trait InteractiveSurface: Send + Sync {
    /// Transient handle to one interactive element.
    type Control: Send + Sync;
    /// Handle to the item container enclosing a control.
    type Container: Send + Sync;

    /// All controls currently matching `selector`, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Control>, SurfaceError>;

    /// Closest ancestor of `control` matching `container_selector`.
    async fn container_of(
        &self,
        control: &Self::Control,
        container_selector: &str,
    ) -> Result<Self::Container, SurfaceError>;

    async fn identifier_of(&self, container: &Self::Container)
    -> Result<Identifier, SurfaceError>;

    /// First control matching `selector` inside `container`, if any.
    async fn find_within(
        &self,
        container: &Self::Container,
        selector: &str,
    ) -> Result<Option<Self::Control>, SurfaceError>;

    /// Text content of the first descendant of `control` matching
    /// `selector`, untrimmed.
    async fn text_within(
        &self,
        control: &Self::Control,
        selector: &str,
    ) -> Result<Option<String>, SurfaceError>;

    async fn scroll_into_view(&self, control: &Self::Control) -> Result<(), SurfaceError>;

    async fn activate(&self, control: &Self::Control) -> Result<(), SurfaceError>;

    async fn synthesize_event_sequence(
        &self,
        control: &Self::Control,
        events: &[PointerEvent],
    ) -> Result<(), SurfaceError>;

    /// Waits until an element matching `marker` is visible, or `timeout`
    /// elapses (`Ok(None)`).
    async fn wait_for_visible(
        &self,
        marker: &str,
        timeout: Duration,
    ) -> Result<Option<Self::Control>, SurfaceError>;

    /// Every item identifier currently present, in document order.
    async fn all_visible_identifiers(&self) -> Result<Vec<Identifier>, SurfaceError>;

    /// Commits a popup entry with the full press/release/activate sequence.
    async fn commit_selection(&self, control: &Self::Control) -> Result<(), SurfaceError> {
        self.synthesize_event_sequence(control, &COMMIT_SEQUENCE).await
    }
}
