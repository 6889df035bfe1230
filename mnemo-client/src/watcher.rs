//! Section watcher.
//!
//! Each "document changed" notification runs [`observe`], a pure function
//! of the previous [`WatcherState`] and the current page. It returns the
//! next state plus the probes to run. [`SectionWatcher`] owns the state and
//! runs those probes as tokio tasks so the notification handler never waits
//! on the network.

use std::sync::Arc;

use mnemo_core::{AssetBase, CacheKey, Facet, SubjectId};
use tokio::task::JoinHandle;

use crate::layout::{Layout, SectionLocation};
use crate::page::{
    control_element_id, image_element_id, slot_present, HostPage, NodeId, SharedPage, SlotElement,
};
use crate::probe::{ProbeResult, Prober};

/// Facets in the order they are processed within one notification.
const FACET_ORDER: [Facet; 2] = [Facet::Reading, Facet::Meaning];

// ============================================================================
// STATE
// ============================================================================

/// What the watcher remembers between notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    pub subject: Option<SubjectId>,
    reading: Option<NodeId>,
    meaning: Option<NodeId>,
}

impl WatcherState {
    /// Container last recorded for `facet`.
    pub fn container(&self, facet: Facet) -> Option<NodeId> {
        match facet {
            Facet::Reading => self.reading,
            Facet::Meaning => self.meaning,
        }
    }

    fn record(&mut self, facet: Facet, node: NodeId) {
        match facet {
            Facet::Reading => self.reading = Some(node),
            Facet::Meaning => self.meaning = Some(node),
        }
    }
}

/// Observable state of one facet slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    UnknownSubject,
    /// Container found, nothing rendered yet.
    Probing,
    ShowingImage,
    ShowingControl,
    /// No container for the facet on the current page.
    ShowingNothing,
}

/// Derive the phase of a slot from the page.
pub fn slot_phase(state: &WatcherState, page: &dyn HostPage, layout: &Layout, facet: Facet) -> SlotPhase {
    let Some(subject) = state.subject else {
        return SlotPhase::UnknownSubject;
    };
    if layout.locate(page, facet).is_none() {
        return SlotPhase::ShowingNothing;
    }
    let key = CacheKey::new(subject, facet);
    if page.element_by_id(&image_element_id(&key)).is_some() {
        SlotPhase::ShowingImage
    } else if page.element_by_id(&control_element_id(&key)).is_some() {
        SlotPhase::ShowingControl
    } else {
        SlotPhase::Probing
    }
}

// ============================================================================
// TRANSITION
// ============================================================================

/// An existence probe the watcher decided to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAction {
    pub subject: SubjectId,
    pub facet: Facet,
    pub key: CacheKey,
    /// Public URL of the artifact, without cache busting.
    pub url: String,
    pub location: SectionLocation,
}

/// Whether a located container warrants a new probe.
///
/// Yes when nothing was recorded for the facet, when the container is a
/// different node, or when the recorded one has left the document and the
/// slot holds neither image nor control.
pub fn needs_probe(
    previous: Option<NodeId>,
    current: NodeId,
    page: &dyn HostPage,
    key: &CacheKey,
) -> bool {
    match previous {
        None => true,
        Some(previous) if previous != current => true,
        Some(previous) => !page.is_attached(previous) && !slot_present(page, key),
    }
}

/// Process one notification.
pub fn observe(
    state: &WatcherState,
    page: &dyn HostPage,
    layout: &Layout,
    assets: &AssetBase,
) -> (WatcherState, Vec<ProbeAction>) {
    let Some(subject) = layout.active_subject(page) else {
        return (state.clone(), Vec::new());
    };

    let mut next = state.clone();
    if next.subject != Some(subject) {
        tracing::info!(subject_id = %subject, previous = ?next.subject, "New subject loaded");
        next.subject = Some(subject);
    }

    let mut actions = Vec::new();
    for facet in FACET_ORDER {
        let Some(location) = layout.locate(page, facet) else {
            continue;
        };
        let key = CacheKey::new(subject, facet);
        let previous = next.container(facet);
        next.record(facet, location.container);

        if !needs_probe(previous, location.container, page, &key) {
            continue;
        }
        if slot_present(page, &key) {
            tracing::debug!(subject_id = %subject, facet = %facet, key = %key, "Slot already rendered, skipping injection");
            continue;
        }

        actions.push(ProbeAction {
            subject,
            facet,
            url: assets.url_for(&key),
            key,
            location,
        });
    }

    (next, actions)
}

// ============================================================================
// RENDERING
// ============================================================================

/// What a probe result did to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRender {
    Image(NodeId),
    Control(NodeId),
    Unchanged,
}

/// Render a probe result into the slot.
///
/// Does nothing when the container has gone or the slot was filled while
/// the probe was in flight.
pub fn apply_probe(page: &mut dyn HostPage, action: &ProbeAction, result: ProbeResult) -> SlotRender {
    let ProbeAction {
        subject,
        facet,
        key,
        url,
        location,
    } = action;

    if !page.is_attached(location.container) || slot_present(page, key) {
        tracing::debug!(subject_id = %subject, facet = %facet, key = %key, "Slot changed during probe, discarding result");
        return SlotRender::Unchanged;
    }

    match result {
        ProbeResult::Found => {
            let rendered = page
                .insert(location.placement, SlotElement::image(key, url.clone()))
                .map(SlotRender::Image)
                .unwrap_or(SlotRender::Unchanged);
            tracing::info!(subject_id = %subject, facet = %facet, key = %key, "Image loaded");
            rendered
        }
        ProbeResult::NotFound => {
            let rendered = page
                .insert(location.placement, SlotElement::control(key, *facet))
                .map(SlotRender::Control)
                .unwrap_or(SlotRender::Unchanged);
            tracing::info!(subject_id = %subject, facet = %facet, key = %key, "Image not found, adding generate control");
            rendered
        }
        ProbeResult::Unexpected(status) => {
            tracing::warn!(subject_id = %subject, facet = %facet, key = %key, status, "Unexpected probe status");
            SlotRender::Unchanged
        }
        ProbeResult::TransportError(error) => {
            tracing::warn!(subject_id = %subject, facet = %facet, key = %key, %error, "Probe request failed");
            SlotRender::Unchanged
        }
    }
}

// ============================================================================
// WATCHER
// ============================================================================

/// Owns the watcher state and dispatches probes.
pub struct SectionWatcher<P: HostPage + 'static> {
    page: SharedPage<P>,
    layout: Arc<Layout>,
    assets: AssetBase,
    prober: Arc<dyn Prober>,
    state: WatcherState,
}

impl<P: HostPage + 'static> SectionWatcher<P> {
    pub fn new(
        page: SharedPage<P>,
        layout: Arc<Layout>,
        assets: AssetBase,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self {
            page,
            layout,
            assets,
            prober,
            state: WatcherState::default(),
        }
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    /// Handle one "document changed" notification.
    ///
    /// Returns the spawned probe tasks; callers may ignore them.
    pub fn on_mutation(&mut self) -> Vec<JoinHandle<SlotRender>> {
        let (next, actions) = {
            let page = match self.page.lock() {
                Ok(page) => page,
                Err(_) => {
                    tracing::error!("Host page lock poisoned, ignoring notification");
                    return Vec::new();
                }
            };
            observe(&self.state, &*page, &self.layout, &self.assets)
        };
        self.state = next;

        actions
            .into_iter()
            .map(|action| self.spawn_probe(action))
            .collect()
    }

    fn spawn_probe(&self, action: ProbeAction) -> JoinHandle<SlotRender> {
        let page = self.page.clone();
        let prober = self.prober.clone();
        tokio::spawn(async move {
            let result = prober.probe(&action.url).await;
            match page.lock() {
                Ok(mut page) => apply_probe(&mut *page, &action, result),
                Err(_) => {
                    tracing::error!(key = %action.key, "Host page lock poisoned, dropping probe result");
                    SlotRender::Unchanged
                }
            }
        })
    }
}

impl<P: HostPage + 'static> std::fmt::Debug for SectionWatcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionWatcher")
            .field("state", &self.state)
            .field("assets", &self.assets.as_str())
            .field("layout", &self.layout)
            .finish()
    }
}
