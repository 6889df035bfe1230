//! Wiring of watcher and control flow for one page session.

use std::sync::Arc;

use mnemo_core::{AssetBase, Facet, SubjectId};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::control::{ActivationOutcome, ControlActivation, CredentialSource, Notifier};
use crate::error::ClientResult;
use crate::layout::Layout;
use crate::page::{HostPage, SharedPage};
use crate::poller::{PollPolicy, Sleeper, TokioSleeper};
use crate::probe::{HttpProber, Prober};
use crate::remote::{GenerationApi, HttpGenerationClient};
use crate::watcher::{SectionWatcher, SlotRender};

/// Collaborators of a session, swappable for tests.
pub struct SessionParts {
    pub layout: Layout,
    pub assets: AssetBase,
    pub prober: Arc<dyn Prober>,
    pub api: Arc<dyn GenerationApi>,
    pub sleeper: Arc<dyn Sleeper>,
    pub credentials: Arc<dyn CredentialSource>,
    pub notifier: Arc<dyn Notifier>,
    pub policy: PollPolicy,
}

/// The two entry points the host page drives: mutation notifications and
/// control clicks.
pub struct MnemonicImages<P: HostPage + 'static> {
    watcher: SectionWatcher<P>,
    activation: Arc<ControlActivation<P>>,
}

impl<P: HostPage + 'static> MnemonicImages<P> {
    pub fn new(page: SharedPage<P>, parts: SessionParts) -> Self {
        let watcher = SectionWatcher::new(
            page.clone(),
            Arc::new(parts.layout),
            parts.assets.clone(),
            parts.prober.clone(),
        );
        let activation = Arc::new(ControlActivation::new(
            page,
            parts.api,
            parts.prober,
            parts.sleeper,
            parts.credentials,
            parts.notifier,
            parts.assets,
            parts.policy,
        ));
        Self {
            watcher,
            activation,
        }
    }

    /// Build the HTTP-backed session described by `config`.
    pub fn from_config(
        config: &ClientConfig,
        page: SharedPage<P>,
        credentials: Arc<dyn CredentialSource>,
        notifier: Arc<dyn Notifier>,
    ) -> ClientResult<Self> {
        config.validate()?;
        let parts = SessionParts {
            layout: Layout::default(),
            assets: AssetBase::new(config.asset_base_url.clone()),
            prober: Arc::new(HttpProber::new(config.request_timeout())?),
            api: Arc::new(HttpGenerationClient::new(
                &config.api_base_url,
                config.request_timeout(),
            )?),
            sleeper: Arc::new(TokioSleeper),
            credentials,
            notifier,
            policy: config.poll.policy(),
        };
        Ok(Self::new(page, parts))
    }

    pub fn watcher(&self) -> &SectionWatcher<P> {
        &self.watcher
    }

    /// Document subtree changed.
    pub fn on_mutation(&mut self) -> Vec<JoinHandle<SlotRender>> {
        self.watcher.on_mutation()
    }

    /// A generation control was clicked. The flow runs on its own task so
    /// notifications keep being processed while it polls.
    pub fn on_control_click(&self, subject: SubjectId, facet: Facet) -> JoinHandle<ActivationOutcome> {
        let activation = self.activation.clone();
        tokio::spawn(async move { activation.activate(subject, facet).await })
    }
}
