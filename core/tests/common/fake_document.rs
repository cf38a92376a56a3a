//! Scripted in-memory document.
//!
//! Models the cart page closely enough to exercise the workflow:
//! - moving a cart item re-renders it as a saved item at the end of the list
//! - activating an add-to-list control opens the list popup
//! - popup entries only register the full press/release/click sequence
//! - the delete control lives inside the saved item's container
//!
//! Every activation or event sequence mutates the document and bumps a
//! generation counter. Controls remember the generation they were found in;
//! using one after a mutation fails with `SurfaceError::Stale`.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use listmover_core::Identifier;
use listmover_core::config::Selectors;
use listmover_core::surface::COMMIT_SEQUENCE;
use listmover_core::surface::InteractiveSurface;
use listmover_core::surface::PointerEvent;
use listmover_core::surface::SurfaceError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ControlKind {
    SaveForLater(Identifier),
    AddToList(Identifier),
    PopupMarker,
    PopupEntry(usize),
    DeleteSaved(Identifier),
}

#[derive(Debug, Clone)]
pub struct FakeControl {
    kind: ControlKind,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Cart,
    Saved,
}

#[derive(Debug, Clone)]
pub struct FakeContainer {
    region: Region,
    identifier: Option<Identifier>,
}

#[derive(Default)]
struct State {
    generation: u64,
    cart: Vec<Identifier>,
    saved: Vec<Identifier>,
    popup_entries: Vec<String>,
    popup_for: Option<Identifier>,
    target_list: Vec<Identifier>,

    popup_missing: HashSet<Identifier>,
    fail_activate: HashSet<Identifier>,
    fail_delete: HashSet<Identifier>,
    fail_popup_entries: bool,
    unidentified: HashSet<Identifier>,
    /// Attempt (1-based) on which the delete control shows up; absent means 1.
    delete_appears_on: HashMap<Identifier, u32>,
    /// Add-to-list controls that stay rendered after their item is deleted.
    sticky_add: HashSet<Identifier>,
    engine_down_after: Option<usize>,

    calls: usize,
    find_all_calls: HashMap<String, usize>,
    delete_queries: HashMap<Identifier, u32>,
    ignored_clicks: usize,
    stale_uses: usize,
}

pub struct FakeDocument {
    selectors: Selectors,
    state: Mutex<State>,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self {
            selectors: Selectors::default(),
            state: Mutex::new(State::default()),
        }
    }

    fn state_mut(&mut self) -> &mut State {
        self.state.get_mut().unwrap()
    }

    pub fn with_cart(mut self, ids: &[Identifier]) -> Self {
        self.state_mut().cart.extend(ids.iter().cloned());
        self
    }

    pub fn with_saved(mut self, ids: &[Identifier]) -> Self {
        self.state_mut().saved.extend(ids.iter().cloned());
        self
    }

    pub fn with_popup_entries(mut self, labels: &[&str]) -> Self {
        self.state_mut().popup_entries = labels.iter().map(|l| (*l).to_string()).collect();
        self
    }

    /// The popup never opens for `id`.
    pub fn with_popup_missing(mut self, id: &Identifier) -> Self {
        self.state_mut().popup_missing.insert(id.clone());
        self
    }

    /// Activating any control of `id` fails.
    pub fn with_failing_activate(mut self, id: &Identifier) -> Self {
        self.state_mut().fail_activate.insert(id.clone());
        self
    }

    /// Activating the delete control of `id` fails; its other controls work.
    pub fn with_failing_delete(mut self, id: &Identifier) -> Self {
        self.state_mut().fail_delete.insert(id.clone());
        self
    }

    /// Reading popup entry labels fails.
    pub fn with_failing_popup_entries(mut self) -> Self {
        self.state_mut().fail_popup_entries = true;
        self
    }

    /// The container of `id` carries no identifier attribute.
    pub fn with_unidentified(mut self, id: &Identifier) -> Self {
        self.state_mut().unidentified.insert(id.clone());
        self
    }

    /// The delete control of `id` appears on query `attempt` (1-based);
    /// `u32::MAX` means never.
    pub fn with_delete_appearing_on(mut self, id: &Identifier, attempt: u32) -> Self {
        self.state_mut()
            .delete_appears_on
            .insert(id.clone(), attempt);
        self
    }

    /// The add-to-list control of `id` survives deletion of the item.
    pub fn with_sticky_add_control(mut self, id: &Identifier) -> Self {
        self.state_mut().sticky_add.insert(id.clone());
        self
    }

    /// Every surface call after the first `calls` fails with an engine error.
    pub fn with_engine_down_after(mut self, calls: usize) -> Self {
        self.state_mut().engine_down_after = Some(calls);
        self
    }

    pub fn cart(&self) -> Vec<Identifier> {
        self.state.lock().unwrap().cart.clone()
    }

    pub fn saved(&self) -> Vec<Identifier> {
        self.state.lock().unwrap().saved.clone()
    }

    pub fn target_list(&self) -> Vec<Identifier> {
        self.state.lock().unwrap().target_list.clone()
    }

    pub fn delete_queries(&self, id: &Identifier) -> u32 {
        self.state
            .lock()
            .unwrap()
            .delete_queries
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn find_all_calls(&self, selector: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .find_all_calls
            .get(selector)
            .copied()
            .unwrap_or(0)
    }

    /// Clicks that did not register (popup entries activated with a lone click).
    pub fn ignored_clicks(&self) -> usize {
        self.state.lock().unwrap().ignored_clicks
    }

    /// Times a control was used after the document had mutated.
    pub fn stale_uses(&self) -> usize {
        self.state.lock().unwrap().stale_uses
    }

    /// Locks the state, counting the call and applying engine-down injection.
    fn enter(&self) -> Result<std::sync::MutexGuard<'_, State>, SurfaceError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if let Some(limit) = state.engine_down_after
            && state.calls > limit
        {
            return Err(SurfaceError::Engine("browser disconnected".to_string()));
        }
        Ok(state)
    }

    fn control(state: &State, kind: ControlKind) -> FakeControl {
        FakeControl {
            kind,
            generation: state.generation,
        }
    }

    fn check_fresh(state: &mut State, control: &FakeControl) -> Result<(), SurfaceError> {
        if control.generation != state.generation {
            state.stale_uses += 1;
            return Err(SurfaceError::Stale(format!("{:?}", control.kind)));
        }
        Ok(())
    }

    fn owner(kind: &ControlKind) -> Option<&Identifier> {
        match kind {
            ControlKind::SaveForLater(id)
            | ControlKind::AddToList(id)
            | ControlKind::DeleteSaved(id) => Some(id),
            ControlKind::PopupMarker | ControlKind::PopupEntry(_) => None,
        }
    }
}

impl Default for FakeDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractiveSurface for FakeDocument {
    type Control = FakeControl;
    type Container = FakeContainer;

    async fn find_all(&self, selector: &str) -> Result<Vec<FakeControl>, SurfaceError> {
        let mut state = self.enter()?;
        *state.find_all_calls.entry(selector.to_string()).or_default() += 1;

        let kinds: Vec<ControlKind> = if selector == self.selectors.save_for_later {
            state
                .cart
                .iter()
                .cloned()
                .map(ControlKind::SaveForLater)
                .collect()
        } else if selector == self.selectors.add_to_list {
            let mut kinds: Vec<ControlKind> = state
                .saved
                .iter()
                .cloned()
                .map(ControlKind::AddToList)
                .collect();
            kinds.extend(
                state
                    .sticky_add
                    .iter()
                    .filter(|id| !state.saved.contains(id))
                    .cloned()
                    .map(ControlKind::AddToList),
            );
            kinds
        } else if selector == self.selectors.popup_entry && state.popup_for.is_some() {
            if state.fail_popup_entries {
                return Err(SurfaceError::Stale("popup re-rendered".to_string()));
            }
            (0..state.popup_entries.len())
                .map(ControlKind::PopupEntry)
                .collect()
        } else {
            Vec::new()
        };

        Ok(kinds
            .into_iter()
            .map(|kind| Self::control(&state, kind))
            .collect())
    }

    async fn container_of(
        &self,
        control: &FakeControl,
        container_selector: &str,
    ) -> Result<FakeContainer, SurfaceError> {
        let mut state = self.enter()?;
        Self::check_fresh(&mut state, control)?;

        let region = match &control.kind {
            ControlKind::SaveForLater(_)
                if container_selector == self.selectors.cart_item_container =>
            {
                Region::Cart
            }
            ControlKind::AddToList(_) | ControlKind::DeleteSaved(_)
                if container_selector == self.selectors.saved_item_container =>
            {
                Region::Saved
            }
            _ => {
                return Err(SurfaceError::ContainerNotFound {
                    selector: container_selector.to_string(),
                });
            }
        };
        let identifier = Self::owner(&control.kind)
            .filter(|id| !state.unidentified.contains(*id))
            .cloned();
        Ok(FakeContainer { region, identifier })
    }

    async fn identifier_of(&self, container: &FakeContainer) -> Result<Identifier, SurfaceError> {
        let _state = self.enter()?;
        container
            .identifier
            .clone()
            .ok_or(SurfaceError::MissingIdentifier)
    }

    async fn find_within(
        &self,
        container: &FakeContainer,
        selector: &str,
    ) -> Result<Option<FakeControl>, SurfaceError> {
        let mut state = self.enter()?;
        let Some(id) = container.identifier.clone() else {
            return Ok(None);
        };
        if container.region != Region::Saved || selector != self.selectors.delete_saved {
            return Ok(None);
        }

        let attempt = {
            let counter = state.delete_queries.entry(id.clone()).or_default();
            *counter += 1;
            *counter
        };
        let appears_on = state.delete_appears_on.get(&id).copied().unwrap_or(1);
        if attempt >= appears_on && state.saved.contains(&id) {
            Ok(Some(Self::control(&state, ControlKind::DeleteSaved(id))))
        } else {
            Ok(None)
        }
    }

    async fn text_within(
        &self,
        control: &FakeControl,
        selector: &str,
    ) -> Result<Option<String>, SurfaceError> {
        let mut state = self.enter()?;
        Self::check_fresh(&mut state, control)?;
        match control.kind {
            ControlKind::PopupEntry(index) if selector == self.selectors.popup_entry_label => {
                Ok(state.popup_entries.get(index).cloned())
            }
            _ => Ok(None),
        }
    }

    async fn scroll_into_view(&self, control: &FakeControl) -> Result<(), SurfaceError> {
        let mut state = self.enter()?;
        Self::check_fresh(&mut state, control)
    }

    async fn activate(&self, control: &FakeControl) -> Result<(), SurfaceError> {
        let mut state = self.enter()?;
        Self::check_fresh(&mut state, control)?;
        if let Some(owner) = Self::owner(&control.kind)
            && state.fail_activate.contains(owner)
        {
            return Err(SurfaceError::Stale(format!("{owner} detached during click")));
        }
        if let ControlKind::DeleteSaved(id) = &control.kind
            && state.fail_delete.contains(id)
        {
            return Err(SurfaceError::Stale(format!("{id} delete control detached")));
        }

        match &control.kind {
            ControlKind::SaveForLater(id) => {
                state.cart.retain(|c| c != id);
                state.saved.push(id.clone());
            }
            ControlKind::AddToList(id) => {
                state.popup_for = (!state.popup_missing.contains(id)).then(|| id.clone());
            }
            ControlKind::DeleteSaved(id) => {
                state.saved.retain(|s| s != id);
            }
            ControlKind::PopupEntry(_) => state.ignored_clicks += 1,
            ControlKind::PopupMarker => {}
        }
        state.generation += 1;
        Ok(())
    }

    async fn synthesize_event_sequence(
        &self,
        control: &FakeControl,
        events: &[PointerEvent],
    ) -> Result<(), SurfaceError> {
        let mut state = self.enter()?;
        Self::check_fresh(&mut state, control)?;
        state.generation += 1;

        let ControlKind::PopupEntry(_) = control.kind else {
            return Ok(());
        };
        if events != COMMIT_SEQUENCE {
            state.ignored_clicks += 1;
            return Ok(());
        }
        if let Some(owner) = state.popup_for.take() {
            state.target_list.push(owner);
        }
        Ok(())
    }

    async fn wait_for_visible(
        &self,
        marker: &str,
        timeout: Duration,
    ) -> Result<Option<FakeControl>, SurfaceError> {
        {
            let state = self.enter()?;
            if marker == self.selectors.popup_marker && state.popup_for.is_some() {
                return Ok(Some(Self::control(&state, ControlKind::PopupMarker)));
            }
        }
        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    async fn all_visible_identifiers(&self) -> Result<Vec<Identifier>, SurfaceError> {
        let state = self.enter()?;
        Ok(state.cart.iter().chain(state.saved.iter()).cloned().collect())
    }
}
