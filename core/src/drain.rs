//! Re-query-and-act loop over a collection that shrinks as it is processed.
//!
//! Acting on one item removes or re-renders it, which invalidates every other
//! handle from the same query. [`DrainCursor::next`] therefore queries the
//! document from scratch on every call and hands out exactly one control,
//! dropping the rest.

use std::collections::HashSet;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::identifier::Identifier;
use crate::surface::InteractiveSurface;
use crate::surface::SurfaceError;

/// One control resolved to its owning item.
pub struct DiscoveredItem<S: InteractiveSurface> {
    pub control: S::Control,
    pub container: S::Container,
    pub identifier: Identifier,
}

pub struct DrainCursor<'s, S: InteractiveSurface> {
    surface: &'s S,
    control_selector: &'s str,
    container_selector: &'s str,
    settle: Duration,
    yielded: HashSet<Identifier>,
    skip_unresolved: bool,
    unresolved: usize,
    queries: usize,
}

impl<'s, S: InteractiveSurface> DrainCursor<'s, S> {
    pub fn new(
        surface: &'s S,
        control_selector: &'s str,
        container_selector: &'s str,
        settle: Duration,
    ) -> Self {
        Self {
            surface,
            control_selector,
            container_selector,
            settle,
            yielded: HashSet::new(),
            skip_unresolved: false,
            unresolved: 0,
            queries: 0,
        }
    }

    /// Passes over controls whose container or identifier cannot be
    /// resolved instead of failing the query. Engine errors still fail.
    pub fn skip_unresolved(mut self) -> Self {
        self.skip_unresolved = true;
        self
    }

    /// First control, in document order, whose item has not been yielded
    /// yet. `Ok(None)` once no such control remains.
    ///
    /// Items are yielded at most once, so a control that survives its action
    /// (failed, or ignored by the document) is skipped instead of looping.
    pub async fn next(&mut self) -> Result<Option<DiscoveredItem<S>>, SurfaceError> {
        self.queries += 1;
        let controls = self.surface.find_all(self.control_selector).await?;
        debug!(
            selector = self.control_selector,
            found = controls.len(),
            "drain query"
        );

        self.unresolved = 0;
        for control in controls {
            let (container, identifier) = match self.resolve(&control).await {
                Ok(resolved) => resolved,
                Err(err @ SurfaceError::Engine(_)) => return Err(err),
                Err(err) if self.skip_unresolved => {
                    self.unresolved += 1;
                    warn!(
                        selector = self.control_selector,
                        "Skipping control whose item cannot be resolved: {err}"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };
            if self.yielded.insert(identifier.clone()) {
                return Ok(Some(DiscoveredItem {
                    control,
                    container,
                    identifier,
                }));
            }
            debug!(%identifier, "skipping control of an item already processed");
        }
        Ok(None)
    }

    async fn resolve(
        &self,
        control: &S::Control,
    ) -> Result<(S::Container, Identifier), SurfaceError> {
        let container = self
            .surface
            .container_of(control, self.container_selector)
            .await?;
        let identifier = self.surface.identifier_of(&container).await?;
        Ok((container, identifier))
    }

    /// Lets the document settle after a committed action.
    pub async fn settle(&self) {
        tokio::time::sleep(self.settle).await;
    }

    /// Controls passed over as unresolvable in the latest query.
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    /// Number of document queries issued so far.
    pub fn queries(&self) -> usize {
        self.queries
    }
}
