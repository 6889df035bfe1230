//! Control Activation and Availability Polling Tests
//!
//! The click flow runs against fakes for the remote endpoint, the prober and
//! the sleeper, so polling never touches the wall clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mnemo_client::page::control_element_id;
use mnemo_client::{
    wait_until_available, ActivationOutcome, ClientConfig, ClientError, ControlActivation,
    HostPage, Layout, MnemonicImages, Notice, PollPolicy, ProbeResult, SessionParts, SharedPage,
    SlotElement,
};
use mnemo_core::{CacheKey, Facet};
use mnemo_test_utils::assertions::{
    assert_exactly_one_slot_element, assert_shows_control, assert_shows_image,
};
use mnemo_test_utils::fixtures::{asset_url, assets, review_page, subject};
use mnemo_test_utils::generators::arb_transient_probe;
use mnemo_test_utils::{
    FakeGenerationApi, MemoryPage, RecordingNotifier, RecordingSleeper, ScriptedProber,
    StaticCredentials,
};
use proptest::prelude::*;

const INTERVAL: Duration = Duration::from_millis(1000);

// ============================================================================
// HARNESS
// ============================================================================

struct Session {
    page: SharedPage<MemoryPage>,
    images: MnemonicImages<MemoryPage>,
    api: Arc<FakeGenerationApi>,
    prober: Arc<ScriptedProber>,
    sleeper: Arc<RecordingSleeper>,
    notifier: Arc<RecordingNotifier>,
}

/// Review page for subject 5 with both controls already rendered.
async fn session(
    api: FakeGenerationApi,
    prober: ScriptedProber,
    credentials: StaticCredentials,
    max_attempts: u32,
) -> Session {
    let page: SharedPage<MemoryPage> = Arc::new(Mutex::new(review_page(5).page));
    let api = Arc::new(api);
    let prober = Arc::new(prober);
    let sleeper = Arc::new(RecordingSleeper::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let mut images = MnemonicImages::new(
        page.clone(),
        SessionParts {
            layout: Layout::default(),
            assets: assets(),
            prober: prober.clone(),
            api: api.clone(),
            sleeper: sleeper.clone(),
            credentials: Arc::new(credentials),
            notifier: notifier.clone(),
            policy: PollPolicy::new(max_attempts, INTERVAL),
        },
    );

    for handle in images.on_mutation() {
        handle.await.expect("probe task panicked");
    }

    Session {
        page,
        images,
        api,
        prober,
        sleeper,
        notifier,
    }
}

/// Watcher probes both facets NotFound first, then `then` answers in order.
fn prober_after_controls(then: Vec<ProbeResult>, fallback: ProbeResult) -> ScriptedProber {
    let mut script = vec![ProbeResult::NotFound, ProbeResult::NotFound];
    script.extend(then);
    ScriptedProber::sequence(script, fallback)
}

async fn click(session: &Session, facet: Facet) -> ActivationOutcome {
    session
        .images
        .on_control_click(subject(5), facet)
        .await
        .expect("activation task panicked")
}

// ============================================================================
// ACTIVATION
// ============================================================================

#[tokio::test]
async fn test_successful_generation_replaces_control_with_image() {
    let s = session(
        FakeGenerationApi::created(asset_url(5, Facet::Reading)),
        prober_after_controls(vec![ProbeResult::NotFound, ProbeResult::NotFound], ProbeResult::Found),
        StaticCredentials::key("sk-user"),
        30,
    )
    .await;
    let control = s
        .page
        .lock()
        .unwrap()
        .element_by_id("mnemonic-generate-00005_reading")
        .expect("control rendered");
    let reading = s.page.lock().unwrap().parent(control).expect("in section");

    let outcome = click(&s, Facet::Reading).await;

    let ActivationOutcome::Rendered(image) = outcome else {
        panic!("expected the image to render, got {:?}", outcome);
    };
    assert_eq!(s.api.calls(), vec![(subject(5), Facet::Reading, "sk-user".to_string())]);
    assert_eq!(s.prober.calls(), 2 + 3);
    assert_eq!(s.sleeper.sleeps(), vec![INTERVAL, INTERVAL]);
    assert!(s.notifier.notices().is_empty());

    let page = s.page.lock().unwrap();
    assert_shows_image(&page, subject(5), Facet::Reading);
    assert_shows_control(&page, subject(5), Facet::Meaning);
    assert_eq!(page.parent(image), Some(reading));
    assert_eq!(
        page.slot(image),
        Some(&SlotElement::Image {
            id: "mnemonic-image-00005_reading".to_string(),
            src: asset_url(5, Facet::Reading),
        })
    );
}

#[tokio::test]
async fn test_remote_failure_restores_control_and_notifies() {
    let s = session(
        FakeGenerationApi::failing(ClientError::Rejected {
            status: 500,
            message: "Image generation failed.".to_string(),
        }),
        prober_after_controls(vec![], ProbeResult::Found),
        StaticCredentials::key("sk-bad"),
        30,
    )
    .await;

    let outcome = click(&s, Facet::Meaning).await;

    assert_eq!(outcome, ActivationOutcome::Restored(Notice::GenerationFailed));
    assert_eq!(s.notifier.notices(), vec![Notice::GenerationFailed]);
    assert_eq!(s.prober.calls(), 2);
    assert!(s.sleeper.sleeps().is_empty());

    let page = s.page.lock().unwrap();
    assert_shows_control(&page, subject(5), Facet::Meaning);
    let control = page
        .element_by_id("mnemonic-generate-00005_meaning")
        .expect("control kept");
    assert_eq!(
        page.slot(control),
        Some(&SlotElement::Control {
            id: "mnemonic-generate-00005_meaning".to_string(),
            label: "Generate meaning image...".to_string(),
            busy: false,
        })
    );
    assert_eq!(page.attribute(control, "disabled"), None);
}

#[tokio::test]
async fn test_availability_timeout_restores_control_with_distinct_notice() {
    let s = session(
        FakeGenerationApi::created(asset_url(5, Facet::Reading)),
        ScriptedProber::always(ProbeResult::NotFound),
        StaticCredentials::key("sk-user"),
        4,
    )
    .await;

    let outcome = click(&s, Facet::Reading).await;

    assert_eq!(outcome, ActivationOutcome::Restored(Notice::AvailabilityTimedOut));
    assert_eq!(s.notifier.notices(), vec![Notice::AvailabilityTimedOut]);
    assert_eq!(s.prober.calls(), 2 + 4);
    assert_eq!(s.sleeper.sleeps().len(), 3);

    let page = s.page.lock().unwrap();
    assert_shows_control(&page, subject(5), Facet::Reading);
}

#[tokio::test]
async fn test_missing_credential_leaves_everything_as_is() {
    let s = session(
        FakeGenerationApi::created(asset_url(5, Facet::Reading)),
        prober_after_controls(vec![], ProbeResult::Found),
        StaticCredentials::none(),
        30,
    )
    .await;

    let outcome = click(&s, Facet::Reading).await;

    assert_eq!(outcome, ActivationOutcome::NoCredential);
    assert!(s.api.calls().is_empty());
    assert!(s.notifier.notices().is_empty());
    let page = s.page.lock().unwrap();
    assert_shows_control(&page, subject(5), Facet::Reading);
}

#[tokio::test]
async fn test_removed_control_is_abandoned() {
    let s = session(
        FakeGenerationApi::created(asset_url(5, Facet::Reading)),
        prober_after_controls(vec![], ProbeResult::Found),
        StaticCredentials::key("sk-user"),
        30,
    )
    .await;
    {
        let mut page = s.page.lock().unwrap();
        let control = page
            .element_by_id("mnemonic-generate-00005_reading")
            .expect("control rendered");
        assert!(page.remove(control));
    }

    let outcome = click(&s, Facet::Reading).await;

    assert_eq!(outcome, ActivationOutcome::Abandoned);
    assert!(s.api.calls().is_empty());
}

#[tokio::test]
async fn test_watcher_does_not_reprobe_after_render() {
    let mut s = session(
        FakeGenerationApi::created(asset_url(5, Facet::Reading)),
        prober_after_controls(vec![], ProbeResult::Found),
        StaticCredentials::key("sk-user"),
        30,
    )
    .await;
    click(&s, Facet::Reading).await;
    let probes = s.prober.calls();

    assert!(s.images.on_mutation().is_empty());

    assert_eq!(s.prober.calls(), probes);
    let page = s.page.lock().unwrap();
    assert_exactly_one_slot_element(&page, subject(5), Facet::Reading);
    assert_exactly_one_slot_element(&page, subject(5), Facet::Meaning);
}

#[tokio::test]
async fn test_control_is_busy_while_in_flight() {
    let mut page = review_page(5).page;
    let key = CacheKey::new(subject(5), Facet::Reading);
    let section = page.body();
    page.insert(
        mnemo_client::Placement::AppendTo(section),
        SlotElement::control(&key, Facet::Reading),
    );
    let page: SharedPage<MemoryPage> = Arc::new(Mutex::new(page));

    // A prober that inspects the control while the flow is polling.
    struct BusyCheck {
        page: SharedPage<MemoryPage>,
        seen: Mutex<Vec<Option<SlotElement>>>,
    }

    #[async_trait::async_trait]
    impl mnemo_client::Prober for BusyCheck {
        async fn probe(&self, _url: &str) -> ProbeResult {
            let page = self.page.lock().unwrap();
            let slot = page
                .element_by_id(&control_element_id(&CacheKey::new(subject(5), Facet::Reading)))
                .and_then(|node| page.slot(node).cloned());
            self.seen.lock().unwrap().push(slot);
            ProbeResult::Found
        }
    }

    let prober = Arc::new(BusyCheck {
        page: page.clone(),
        seen: Mutex::new(Vec::new()),
    });
    let activation = ControlActivation::new(
        page.clone(),
        Arc::new(FakeGenerationApi::created(asset_url(5, Facet::Reading))),
        prober.clone(),
        Arc::new(RecordingSleeper::new()),
        Arc::new(StaticCredentials::key("sk-user")),
        Arc::new(RecordingNotifier::new()),
        assets(),
        PollPolicy::default(),
    );

    let outcome = activation.activate(subject(5), Facet::Reading).await;

    assert!(matches!(outcome, ActivationOutcome::Rendered(_)));
    assert_eq!(
        *prober.seen.lock().unwrap(),
        vec![Some(SlotElement::Control {
            id: "mnemonic-generate-00005_reading".to_string(),
            label: "Generating reading image...".to_string(),
            busy: true,
        })]
    );
}

#[tokio::test]
async fn test_second_click_while_busy_is_ignored() {
    let s = session(
        FakeGenerationApi::created(asset_url(5, Facet::Reading)),
        prober_after_controls(vec![ProbeResult::NotFound], ProbeResult::Found),
        StaticCredentials::key("sk-user"),
        30,
    )
    .await;

    let first = s.images.on_control_click(subject(5), Facet::Reading);
    let second = s.images.on_control_click(subject(5), Facet::Reading);
    let mut outcomes = vec![
        first.await.expect("activation task panicked"),
        second.await.expect("activation task panicked"),
    ];
    outcomes.sort_by_key(|outcome| matches!(outcome, ActivationOutcome::InFlight));

    assert!(matches!(outcomes[0], ActivationOutcome::Rendered(_)), "{:?}", outcomes);
    assert_eq!(outcomes[1], ActivationOutcome::InFlight);
    assert_eq!(s.api.calls().len(), 1);
    assert!(s.notifier.notices().is_empty());
    let page = s.page.lock().unwrap();
    assert_exactly_one_slot_element(&page, subject(5), Facet::Reading);
    assert_shows_image(&page, subject(5), Facet::Reading);
}

#[tokio::test]
async fn test_click_on_busy_control_changes_nothing() {
    let s = session(
        FakeGenerationApi::created(asset_url(5, Facet::Reading)),
        prober_after_controls(vec![], ProbeResult::Found),
        StaticCredentials::key("sk-user"),
        30,
    )
    .await;
    {
        let mut page = s.page.lock().unwrap();
        let control = page
            .element_by_id("mnemonic-generate-00005_reading")
            .expect("control rendered");
        assert!(page.set_control_state(control, true, "Generating reading image..."));
    }

    let outcome = click(&s, Facet::Reading).await;

    assert_eq!(outcome, ActivationOutcome::InFlight);
    assert!(s.api.calls().is_empty());
    assert!(s.sleeper.sleeps().is_empty());
    let page = s.page.lock().unwrap();
    assert_shows_control(&page, subject(5), Facet::Reading);
}

// ============================================================================
// AVAILABILITY POLLING
// ============================================================================

#[tokio::test]
async fn test_poll_stops_at_first_success() {
    let prober = ScriptedProber::sequence(
        vec![ProbeResult::NotFound, ProbeResult::Unexpected(403)],
        ProbeResult::Found,
    );
    let sleeper = RecordingSleeper::new();
    let url = asset_url(5, Facet::Meaning);

    let result = wait_until_available(&prober, &sleeper, &url, PollPolicy::new(30, INTERVAL)).await;

    assert_eq!(result, Ok(()));
    assert_eq!(prober.urls(), vec![url.clone(), url.clone(), url]);
    assert_eq!(sleeper.sleeps(), vec![INTERVAL; 2]);
}

#[tokio::test]
async fn test_poll_exhaustion_probes_exactly_max_attempts() {
    let prober = ScriptedProber::always(ProbeResult::NotFound);
    let sleeper = RecordingSleeper::new();

    let result = wait_until_available(
        &prober,
        &sleeper,
        &asset_url(5, Facet::Meaning),
        PollPolicy::new(30, INTERVAL),
    )
    .await;

    assert_eq!(result, Err(ClientError::Timeout { attempts: 30 }));
    assert_eq!(prober.calls(), 30);
    assert_eq!(sleeper.sleeps().len(), 29);
}

#[tokio::test(start_paused = true)]
async fn test_real_sleeper_spaces_attempts_on_the_tokio_clock() {
    let prober = ScriptedProber::sequence(vec![ProbeResult::NotFound; 4], ProbeResult::Found);
    let started = tokio::time::Instant::now();

    let result = wait_until_available(
        &prober,
        &mnemo_client::TokioSleeper,
        &asset_url(5, Facet::Reading),
        PollPolicy::new(30, INTERVAL),
    )
    .await;

    assert_eq!(result, Ok(()));
    assert_eq!(started.elapsed(), INTERVAL * 4);
}

// ============================================================================
// CONFIGURED SESSION
// ============================================================================

#[tokio::test]
async fn test_session_from_config() {
    let config = ClientConfig::from_toml_str(
        r#"
        api_base_url = "https://api.wanikani-mnemonic-images.com"
        asset_base_url = "https://wanikani-mnemonic-images.com"
        request_timeout_ms = 120000

        [poll]
        max_attempts = 10
        interval_ms = 500
        "#,
    )
    .expect("valid config");
    let page: SharedPage<MemoryPage> = Arc::new(Mutex::new(MemoryPage::new()));

    let images = MnemonicImages::from_config(
        &config,
        page,
        Arc::new(StaticCredentials::none()),
        Arc::new(RecordingNotifier::new()),
    )
    .expect("session builds");

    assert_eq!(images.watcher().state().subject, None);
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Transient outcomes never end the poll early; the count of probes and
    /// sleeps depends only on when the first success arrives.
    #[test]
    fn prop_poll_counts(
        transient in prop::collection::vec(arb_transient_probe(), 0..12),
        max_attempts in 1u32..10,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))?;
        let failures = transient.len() as u32;
        let prober = ScriptedProber::sequence(transient, ProbeResult::Found);
        let sleeper = RecordingSleeper::new();

        let result = runtime.block_on(wait_until_available(
            &prober,
            &sleeper,
            "https://wanikani-mnemonic-images.com/00001_meaning.png",
            PollPolicy::new(max_attempts, INTERVAL),
        ));

        if failures < max_attempts {
            prop_assert_eq!(result, Ok(()));
            prop_assert_eq!(prober.calls() as u32, failures + 1);
            prop_assert_eq!(sleeper.sleeps().len() as u32, failures);
        } else {
            prop_assert_eq!(result, Err(ClientError::Timeout { attempts: max_attempts }));
            prop_assert_eq!(prober.calls() as u32, max_attempts);
            prop_assert_eq!(sleeper.sleeps().len() as u32, max_attempts - 1);
        }
    }
}
