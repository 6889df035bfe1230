//! Generation control activation.
//!
//! Busy → remote ensure → wait for availability → swap the control for the
//! image. Every failure puts the control back to idle, so afterwards the
//! slot holds exactly one of control or image. A busy control ignores
//! further activations.

use std::sync::Arc;

use mnemo_core::{AssetBase, CacheKey, Facet, SubjectId};

use crate::error::ClientError;
use crate::page::{busy_label, control_element_id, idle_label, HostPage, NodeId, SharedPage, SlotElement};
use crate::poller::{wait_until_available, PollPolicy, Sleeper};
use crate::probe::Prober;
use crate::remote::GenerationApi;

// ============================================================================
// COLLABORATORS
// ============================================================================

/// Supplies the viewer's synthesis credential, prompting if needed.
pub trait CredentialSource: Send + Sync {
    fn credential(&self) -> Option<String>;
}

/// A user-facing failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The generation request failed or was rejected.
    GenerationFailed,
    /// Generation succeeded but the image never became retrievable.
    AvailabilityTimedOut,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::GenerationFailed => "Failed to generate image or invalid API key.",
            Notice::AvailabilityTimedOut => {
                "The image was generated but is not available yet. Try reloading the page shortly."
            }
        }
    }
}

/// Shows notices to the viewer. Must not panic.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

// ============================================================================
// ACTIVATION
// ============================================================================

/// How an activation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The control was replaced by the image.
    Rendered(NodeId),
    /// The control was reset to idle after a failure.
    Restored(Notice),
    /// The viewer supplied no credential; nothing changed.
    NoCredential,
    /// The control was already busy with an earlier activation.
    InFlight,
    /// The control was no longer in the document.
    Abandoned,
}

/// Runs the click flow of generation controls.
pub struct ControlActivation<P: HostPage + 'static> {
    page: SharedPage<P>,
    api: Arc<dyn GenerationApi>,
    prober: Arc<dyn Prober>,
    sleeper: Arc<dyn Sleeper>,
    credentials: Arc<dyn CredentialSource>,
    notifier: Arc<dyn Notifier>,
    assets: AssetBase,
    policy: PollPolicy,
}

impl<P: HostPage + 'static> ControlActivation<P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        page: SharedPage<P>,
        api: Arc<dyn GenerationApi>,
        prober: Arc<dyn Prober>,
        sleeper: Arc<dyn Sleeper>,
        credentials: Arc<dyn CredentialSource>,
        notifier: Arc<dyn Notifier>,
        assets: AssetBase,
        policy: PollPolicy,
    ) -> Self {
        Self {
            page,
            api,
            prober,
            sleeper,
            credentials,
            notifier,
            assets,
            policy,
        }
    }

    /// Handle a click on the control for `(subject, facet)`.
    pub async fn activate(&self, subject: SubjectId, facet: Facet) -> ActivationOutcome {
        let key = CacheKey::new(subject, facet);
        let control_id = control_element_id(&key);

        let control = self.with_page(|page| {
            page.element_by_id(&control_id)
                .map(|node| page.control_busy(node))
        });
        match control.flatten() {
            None => return ActivationOutcome::Abandoned,
            Some(true) => return self.in_flight(&key),
            Some(false) => {}
        }

        let Some(credential) = self.credentials.credential() else {
            tracing::debug!(key = %key, "No credential supplied, generation skipped");
            return ActivationOutcome::NoCredential;
        };

        // Check and claim under one lock so only one activation gets through.
        let claimed = self.with_page(|page| {
            let node = page.element_by_id(&control_id)?;
            if page.control_busy(node) {
                return Some(false);
            }
            page.set_control_state(node, true, &busy_label(facet))
                .then_some(true)
        });
        match claimed.flatten() {
            Some(true) => {}
            Some(false) => return self.in_flight(&key),
            None => return ActivationOutcome::Abandoned,
        }

        tracing::info!(subject_id = %subject, facet = %facet, key = %key, "Requesting generation");
        let url = self.assets.url_for(&key);
        let result = match self.api.request_generation(subject, facet, &credential).await {
            Ok(receipt) => {
                tracing::info!(key = %key, created = receipt.created, "Generation confirmed");
                wait_until_available(&*self.prober, &*self.sleeper, &url, self.policy).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => self.render_image(&key, &control_id, url),
            Err(e) => self.restore(&key, &control_id, facet, e),
        }
    }

    fn in_flight(&self, key: &CacheKey) -> ActivationOutcome {
        tracing::debug!(key = %key, "Control already busy, activation ignored");
        ActivationOutcome::InFlight
    }

    fn render_image(&self, key: &CacheKey, control_id: &str, url: String) -> ActivationOutcome {
        let rendered = self.with_page(|page| {
            let node = page.element_by_id(control_id)?;
            page.replace(node, SlotElement::image(key, url))
        });
        match rendered.flatten() {
            Some(node) => {
                tracing::info!(key = %key, "Generated image rendered");
                ActivationOutcome::Rendered(node)
            }
            None => {
                tracing::debug!(key = %key, "Control left the page before the image arrived");
                ActivationOutcome::Abandoned
            }
        }
    }

    fn restore(&self, key: &CacheKey, control_id: &str, facet: Facet, error: ClientError) -> ActivationOutcome {
        let notice = if error.is_timeout() {
            Notice::AvailabilityTimedOut
        } else {
            Notice::GenerationFailed
        };
        tracing::warn!(key = %key, %error, "Generation flow failed");

        let restored = self.with_page(|page| match page.element_by_id(control_id) {
            Some(node) => page.set_control_state(node, false, &idle_label(facet)),
            None => false,
        });
        self.notifier.notify(notice);

        if restored == Some(true) {
            ActivationOutcome::Restored(notice)
        } else {
            ActivationOutcome::Abandoned
        }
    }

    /// Run `f` against the locked page; `None` if the lock is poisoned.
    fn with_page<T>(&self, f: impl FnOnce(&mut dyn HostPage) -> T) -> Option<T> {
        match self.page.lock() {
            Ok(mut page) => Some(f(&mut *page)),
            Err(_) => {
                tracing::error!("Host page lock poisoned");
                None
            }
        }
    }
}

impl<P: HostPage + 'static> std::fmt::Debug for ControlActivation<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlActivation")
            .field("assets", &self.assets.as_str())
            .field("policy", &self.policy)
            .finish()
    }
}
