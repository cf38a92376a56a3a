use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use listmover_core::Identifier;
use listmover_core::surface::InteractiveSurface;
use listmover_core::surface::PointerEvent;
use listmover_core::surface::SurfaceError;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::script;
use crate::script::ContainerProbe;
use crate::script::Reply;

const VISIBILITY_POLL: Duration = Duration::from_millis(100);

/// Tag of one element in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Item container, addressed by its selector and identifier so that it can
/// be found again after the item re-renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemContainer {
    selector: String,
    identifier: Option<Identifier>,
}

/// [`InteractiveSurface`] over one Chrome page.
pub struct ChromeSurface {
    page: Page,
    identifier_attr: String,
    batch: AtomicU64,
}

impl ChromeSurface {
    pub fn new(page: Page, identifier_attr: impl Into<String>) -> Self {
        Self {
            page,
            identifier_attr: identifier_attr.into(),
            batch: AtomicU64::new(0),
        }
    }

    fn next_batch(&self) -> u64 {
        self.batch.fetch_add(1, Ordering::Relaxed)
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, SurfaceError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SurfaceError::Engine(e.to_string()))?;
        let value = result.value().cloned().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value)
            .map_err(|e| SurfaceError::Engine(format!("unexpected script result: {e}")))
    }

    /// Runs `body` against the element behind `control`.
    async fn on_control<T: DeserializeOwned>(
        &self,
        control: &ElementHandle,
        body: &str,
    ) -> Result<Option<T>, SurfaceError> {
        let reply: Reply<T> = self.eval(script::on_handle(&control.0, body)).await?;
        if reply.stale {
            return Err(SurfaceError::Stale(format!("element {} detached", control.0)));
        }
        Ok(reply.value)
    }

    async fn visible_handle(&self, marker: &str) -> Result<Option<ElementHandle>, SurfaceError> {
        let handle: Option<String> = self
            .eval(script::tag_if_visible(marker, self.next_batch()))
            .await?;
        Ok(handle.map(ElementHandle))
    }
}

/// Connection failures halt the run; anything else is the element's fault.
fn click_error(control: &ElementHandle, err: CdpError) -> SurfaceError {
    match err {
        CdpError::Ws(_) | CdpError::Io(_) | CdpError::NoResponse | CdpError::ChannelSendError(_) => {
            SurfaceError::Engine(err.to_string())
        }
        other => SurfaceError::Stale(format!("click on element {} failed: {other}", control.0)),
    }
}

#[async_trait]
impl InteractiveSurface for ChromeSurface {
    type Control = ElementHandle;
    type Container = ItemContainer;

    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>, SurfaceError> {
        let handles: Vec<String> = self
            .eval(script::tag_all(selector, self.next_batch()))
            .await?;
        debug!(selector, found = handles.len(), "find_all");
        Ok(handles.into_iter().map(ElementHandle).collect())
    }

    async fn container_of(
        &self,
        control: &ElementHandle,
        container_selector: &str,
    ) -> Result<ItemContainer, SurfaceError> {
        let probe: Option<ContainerProbe> = self
            .on_control(
                control,
                &script::closest_container(container_selector, &self.identifier_attr),
            )
            .await?;
        match probe {
            Some(ContainerProbe {
                found: true,
                identifier,
            }) => Ok(ItemContainer {
                selector: container_selector.to_string(),
                identifier: identifier.as_deref().and_then(Identifier::new),
            }),
            _ => Err(SurfaceError::ContainerNotFound {
                selector: container_selector.to_string(),
            }),
        }
    }

    async fn identifier_of(&self, container: &ItemContainer) -> Result<Identifier, SurfaceError> {
        container
            .identifier
            .clone()
            .ok_or(SurfaceError::MissingIdentifier)
    }

    async fn find_within(
        &self,
        container: &ItemContainer,
        selector: &str,
    ) -> Result<Option<ElementHandle>, SurfaceError> {
        let Some(identifier) = &container.identifier else {
            return Ok(None);
        };
        let handle: Option<String> = self
            .eval(script::tag_within(
                &container.selector,
                &self.identifier_attr,
                identifier.as_str(),
                selector,
                self.next_batch(),
            ))
            .await?;
        Ok(handle.map(ElementHandle))
    }

    async fn text_within(
        &self,
        control: &ElementHandle,
        selector: &str,
    ) -> Result<Option<String>, SurfaceError> {
        self.on_control(control, &script::text_of_descendant(selector))
            .await
    }

    async fn scroll_into_view(&self, control: &ElementHandle) -> Result<(), SurfaceError> {
        self.on_control::<bool>(control, script::SCROLL_INTO_VIEW)
            .await
            .map(drop)
    }

    /// Clicks through CDP input events, which the page treats as trusted.
    async fn activate(&self, control: &ElementHandle) -> Result<(), SurfaceError> {
        self.on_control::<bool>(control, script::SCROLL_INTO_VIEW)
            .await?;
        let element = self
            .page
            .find_element(script::handle_css(&control.0))
            .await
            .map_err(|e| click_error(control, e))?;
        element.click().await.map_err(|e| click_error(control, e))?;
        Ok(())
    }

    async fn synthesize_event_sequence(
        &self,
        control: &ElementHandle,
        events: &[PointerEvent],
    ) -> Result<(), SurfaceError> {
        let names: Vec<&str> = events.iter().copied().map(PointerEvent::dom_name).collect();
        self.on_control::<bool>(control, &script::dispatch_mouse_events(&names))
            .await
            .map(drop)
    }

    async fn wait_for_visible(
        &self,
        marker: &str,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>, SurfaceError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(handle) = self.visible_handle(marker).await? {
                return Ok(Some(handle));
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                debug!(marker, "not visible before timeout");
                return Ok(None);
            }
            tokio::time::sleep(VISIBILITY_POLL.min(deadline - now)).await;
        }
    }

    async fn all_visible_identifiers(&self) -> Result<Vec<Identifier>, SurfaceError> {
        let raw: Vec<String> = self
            .eval(script::all_identifiers(&self.identifier_attr))
            .await?;
        Ok(raw.into_iter().filter_map(Identifier::new).collect())
    }
}
