//! Mnemo Client - Page-Embedded Mnemonic Images
//!
//! Watches a host page for facet sections, shows the stored image or a
//! generation control for each, and drives the generate-then-wait flow when
//! a control is clicked.

pub mod config;
pub mod control;
pub mod error;
pub mod layout;
pub mod page;
pub mod poller;
pub mod probe;
pub mod remote;
pub mod runtime;
pub mod watcher;

pub use config::{ClientConfig, ClientConfigError, PollConfig};
pub use control::{ActivationOutcome, ControlActivation, CredentialSource, Notice, Notifier};
pub use error::{ClientError, ClientResult};
pub use layout::{Layout, LayoutMode, SectionLocation, SectionStrategy, SubjectSignal};
pub use page::{HostPage, NodeId, Placement, Selector, SharedPage, SlotElement};
pub use poller::{retry, wait_until_available, PollPolicy, Sleeper, TokioSleeper};
pub use probe::{HttpProber, ProbeResult, Prober};
pub use remote::{GenerationApi, GenerationReceipt, HttpGenerationClient};
pub use runtime::{MnemonicImages, SessionParts};
pub use watcher::{observe, ProbeAction, SectionWatcher, SlotPhase, SlotRender, WatcherState};
