//! Section Watcher Tests
//!
//! Runs the watcher against in-memory review and lesson pages with scripted
//! probe answers.

use std::sync::{Arc, Mutex};

use mnemo_client::page::{control_element_id, image_element_id};
use mnemo_client::watcher::{apply_probe, needs_probe, slot_phase};
use mnemo_client::{
    observe, HostPage, Layout, LayoutMode, Placement, ProbeResult, SectionWatcher, SharedPage,
    SlotElement, SlotPhase, SlotRender, WatcherState,
};
use mnemo_core::{CacheKey, Facet};
use mnemo_test_utils::assertions::{assert_shows_control, assert_shows_image, slot_counts};
use mnemo_test_utils::fixtures::{
    asset_url, assets, lesson_page, review_page, review_section, subject,
};
use mnemo_test_utils::generators::arb_subject_id;
use mnemo_test_utils::{MemoryPage, ScriptedProber};
use proptest::prelude::*;
use tokio::task::JoinHandle;

// ============================================================================
// HELPERS
// ============================================================================

fn watcher_for(page: &SharedPage<MemoryPage>, prober: &Arc<ScriptedProber>) -> SectionWatcher<MemoryPage> {
    SectionWatcher::new(page.clone(), Arc::new(Layout::default()), assets(), prober.clone())
}

async fn settle(handles: Vec<JoinHandle<SlotRender>>) -> Vec<SlotRender> {
    let mut renders = Vec::new();
    for handle in handles {
        renders.push(handle.await.expect("probe task panicked"));
    }
    renders
}

fn shared(page: MemoryPage) -> SharedPage<MemoryPage> {
    Arc::new(Mutex::new(page))
}

// ============================================================================
// REVIEW LAYOUT
// ============================================================================

#[tokio::test]
async fn test_review_page_renders_image_and_control_before_notes() {
    let fixture = review_page(5);
    let prober = Arc::new(
        ScriptedProber::always(ProbeResult::NotFound)
            .route(asset_url(5, Facet::Meaning), ProbeResult::Found),
    );
    let page = shared(fixture.page);
    let mut watcher = watcher_for(&page, &prober);

    let renders = settle(watcher.on_mutation()).await;

    assert_eq!(renders.len(), 2);
    assert_eq!(
        prober.urls(),
        vec![asset_url(5, Facet::Reading), asset_url(5, Facet::Meaning)]
    );

    let page = page.lock().unwrap();
    assert_shows_image(&page, subject(5), Facet::Meaning);
    assert_shows_control(&page, subject(5), Facet::Reading);

    let image = page
        .element_by_id(&image_element_id(&CacheKey::new(subject(5), Facet::Meaning)))
        .expect("image rendered");
    assert_eq!(page.children(fixture.meaning).last(), Some(&fixture.meaning_note));
    let meaning_children = page.children(fixture.meaning);
    let note_index = meaning_children.iter().position(|n| *n == fixture.meaning_note);
    let image_index = meaning_children.iter().position(|n| *n == image);
    assert_eq!(image_index.map(|i| i + 1), note_index);
    assert_eq!(
        page.attribute(image, "src").as_deref(),
        Some("https://wanikani-mnemonic-images.com/00005_meaning.png")
    );

    let control = page
        .element_by_id(&control_element_id(&CacheKey::new(subject(5), Facet::Reading)))
        .expect("control rendered");
    assert_eq!(page.parent(control), Some(fixture.reading));
    assert_eq!(
        page.slot(control),
        Some(&SlotElement::Control {
            id: "mnemonic-generate-00005_reading".to_string(),
            label: "Generate reading image...".to_string(),
            busy: false,
        })
    );
}

#[tokio::test]
async fn test_section_without_note_appends() {
    let mut page = MemoryPage::new();
    let body = page.body();
    page.append(
        body,
        "label",
        &[("for", "user-response"), ("data-subject-id", "31")],
    );
    let section = page.append(body, "section", &[("id", "section-meaning")]);
    let text = page.append(section, "p", &[]);
    let page = shared(page);
    let prober = Arc::new(ScriptedProber::always(ProbeResult::Found));
    let mut watcher = watcher_for(&page, &prober);

    settle(watcher.on_mutation()).await;

    let page = page.lock().unwrap();
    let children = page.children(section);
    assert_eq!(children.len(), 2);
    assert_eq!(children[0], text);
    assert!(matches!(page.slot(children[1]), Some(SlotElement::Image { .. })));
}

#[tokio::test]
async fn test_repeat_notifications_do_not_reprobe() {
    let fixture = review_page(5);
    let page = shared(fixture.page);
    let prober = Arc::new(ScriptedProber::always(ProbeResult::NotFound));
    let mut watcher = watcher_for(&page, &prober);

    settle(watcher.on_mutation()).await;
    assert_eq!(prober.calls(), 2);

    for _ in 0..5 {
        let handles = watcher.on_mutation();
        assert!(handles.is_empty());
    }
    assert_eq!(prober.calls(), 2);

    let page = page.lock().unwrap();
    assert_eq!(slot_counts(&page, subject(5), Facet::Reading), (0, 1));
    assert_eq!(slot_counts(&page, subject(5), Facet::Meaning), (0, 1));
}

#[tokio::test]
async fn test_rerendered_section_is_probed_again() {
    let fixture = review_page(5);
    let page = shared(fixture.page);
    let prober = Arc::new(ScriptedProber::always(ProbeResult::Found));
    let mut watcher = watcher_for(&page, &prober);
    settle(watcher.on_mutation()).await;

    // The host swaps in a fresh reading section; the old one leaves with its image.
    let fresh_reading = {
        let mut page = page.lock().unwrap();
        page.detach(fixture.reading);
        review_section(&mut page, Facet::Reading).0
    };

    let renders = settle(watcher.on_mutation()).await;

    assert_eq!(renders.len(), 1);
    assert!(matches!(renders[0], SlotRender::Image(_)));
    assert_eq!(prober.calls(), 3);
    assert_eq!(watcher.state().container(Facet::Reading), Some(fresh_reading));
    let page = page.lock().unwrap();
    assert_shows_image(&page, subject(5), Facet::Reading);
    assert_shows_image(&page, subject(5), Facet::Meaning);
}

#[tokio::test]
async fn test_new_subject_in_fresh_sections_gets_its_own_slots() {
    let fixture = review_page(5);
    let page = shared(fixture.page);
    let prober = Arc::new(ScriptedProber::always(ProbeResult::NotFound));
    let mut watcher = watcher_for(&page, &prober);
    settle(watcher.on_mutation()).await;

    {
        let mut page = page.lock().unwrap();
        page.set_attribute(fixture.label, "data-subject-id", "6");
        page.detach(fixture.reading);
        page.detach(fixture.meaning);
        review_section(&mut page, Facet::Meaning);
        review_section(&mut page, Facet::Reading);
    }
    settle(watcher.on_mutation()).await;

    assert_eq!(watcher.state().subject, Some(subject(6)));
    let page = page.lock().unwrap();
    assert_shows_control(&page, subject(6), Facet::Reading);
    assert_shows_control(&page, subject(6), Facet::Meaning);
    assert_eq!(slot_counts(&page, subject(5), Facet::Reading), (0, 0));
}

#[tokio::test]
async fn test_unexpected_status_and_transport_errors_render_nothing() {
    let fixture = review_page(8);
    let prober = Arc::new(
        ScriptedProber::always(ProbeResult::Unexpected(503)).route(
            asset_url(8, Facet::Reading),
            ProbeResult::TransportError("connection reset".to_string()),
        ),
    );
    let page = shared(fixture.page);
    let mut watcher = watcher_for(&page, &prober);

    let renders = settle(watcher.on_mutation()).await;

    assert_eq!(renders, vec![SlotRender::Unchanged, SlotRender::Unchanged]);
    let page = page.lock().unwrap();
    let layout = Layout::default();
    for facet in Facet::ALL {
        assert_eq!(slot_counts(&page, subject(8), facet), (0, 0));
        assert_eq!(
            slot_phase(watcher.state(), &*page, &layout, facet),
            SlotPhase::Probing
        );
    }
}

// ============================================================================
// LESSON LAYOUT
// ============================================================================

#[tokio::test]
async fn test_lesson_page_renders_after_content_block() {
    let fixture = lesson_page(440);
    let page = shared(fixture.page);
    let prober = Arc::new(ScriptedProber::always(ProbeResult::Found));
    let mut watcher = watcher_for(&page, &prober);

    settle(watcher.on_mutation()).await;

    let page = page.lock().unwrap();
    assert_shows_image(&page, subject(440), Facet::Meaning);
    assert_shows_image(&page, subject(440), Facet::Reading);

    let slides = page.parent(fixture.meaning).expect("slides container");
    let order: Vec<_> = page.children(slides);
    let meaning_image = page
        .element_by_id("mnemonic-image-00440_meaning")
        .expect("meaning image");
    let reading_image = page
        .element_by_id("mnemonic-image-00440_reading")
        .expect("reading image");
    assert_eq!(
        order,
        vec![fixture.meaning, meaning_image, fixture.reading, reading_image]
    );
}

#[tokio::test]
async fn test_replaced_lesson_block_with_surviving_image_is_not_duplicated() {
    let fixture = lesson_page(440);
    let page = shared(fixture.page);
    let prober = Arc::new(ScriptedProber::always(ProbeResult::Found));
    let mut watcher = watcher_for(&page, &prober);
    settle(watcher.on_mutation()).await;

    // The content block is swapped but our sibling image stays attached.
    {
        let mut page = page.lock().unwrap();
        let slides = page.parent(fixture.meaning).expect("slides container");
        page.detach(fixture.meaning);
        page.append(
            slides,
            "div",
            &[
                ("class", "subject-slide__content"),
                ("data-subject-slide", "meaning"),
            ],
        );
    }
    let handles = watcher.on_mutation();

    assert!(handles.is_empty());
    assert_eq!(prober.calls(), 2);
    let page = page.lock().unwrap();
    assert_shows_image(&page, subject(440), Facet::Meaning);
}

// ============================================================================
// OBSERVE
// ============================================================================

#[test]
fn test_observe_without_subject_changes_nothing() {
    let mut page = MemoryPage::new();
    let body = page.body();
    page.append(body, "section", &[("id", "section-reading")]);

    let (state, actions) = observe(&WatcherState::default(), &page, &Layout::default(), &assets());

    assert_eq!(state, WatcherState::default());
    assert!(actions.is_empty());
}

#[test]
fn test_answer_label_takes_precedence_over_meta() {
    let mut fixture = review_page(5);
    let body = fixture.page.body();
    fixture
        .page
        .append(body, "meta", &[("name", "subject_id"), ("content", "9")]);

    let layout = Layout::default();
    assert_eq!(layout.active_subject(&fixture.page), Some(subject(5)));

    fixture.page.detach(fixture.label);
    assert_eq!(layout.active_subject(&fixture.page), Some(subject(9)));
}

#[test]
fn test_unparsable_subject_falls_through() {
    let mut page = MemoryPage::new();
    let body = page.body();
    page.append(
        body,
        "label",
        &[("for", "user-response"), ("data-subject-id", "n/a")],
    );
    page.append(body, "meta", &[("name", "subject_id"), ("content", "77")]);

    assert_eq!(Layout::default().active_subject(&page), Some(subject(77)));
}

#[test]
fn test_observe_orders_reading_before_meaning() {
    let fixture = review_page(5);

    let (state, actions) =
        observe(&WatcherState::default(), &fixture.page, &Layout::default(), &assets());

    let facets: Vec<Facet> = actions.iter().map(|a| a.facet).collect();
    assert_eq!(facets, vec![Facet::Reading, Facet::Meaning]);
    assert_eq!(actions[0].location.mode, LayoutMode::Review);
    assert_eq!(actions[0].location.placement, Placement::Before(fixture.reading_note));
    assert_eq!(actions[0].url, asset_url(5, Facet::Reading));
    assert_eq!(state.container(Facet::Meaning), Some(fixture.meaning));
}

#[test]
fn test_guard_conditions() {
    let fixture = review_page(5);
    let mut page = fixture.page;
    let key = CacheKey::new(subject(5), Facet::Reading);

    assert!(needs_probe(None, fixture.reading, &page, &key));
    assert!(needs_probe(Some(fixture.meaning), fixture.reading, &page, &key));
    assert!(!needs_probe(Some(fixture.reading), fixture.reading, &page, &key));

    page.detach(fixture.reading);
    assert!(needs_probe(Some(fixture.reading), fixture.reading, &page, &key));

    let body = page.body();
    page.insert(Placement::AppendTo(body), SlotElement::control(&key, Facet::Reading));
    assert!(!needs_probe(Some(fixture.reading), fixture.reading, &page, &key));
}

#[test]
fn test_probe_result_is_discarded_when_slot_filled_meanwhile() {
    let fixture = review_page(5);
    let mut page = fixture.page;
    let (_, actions) = observe(&WatcherState::default(), &page, &Layout::default(), &assets());
    let action = &actions[0];

    page.insert(
        action.location.placement,
        SlotElement::image(&action.key, action.url.clone()),
    );
    assert_eq!(apply_probe(&mut page, action, ProbeResult::NotFound), SlotRender::Unchanged);
    assert_eq!(slot_counts(&page, subject(5), action.facet), (1, 0));

    page.detach(fixture.reading);
    assert_eq!(apply_probe(&mut page, action, ProbeResult::Found), SlotRender::Unchanged);
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// However many notifications arrive, each slot ends with at most one
    /// element and each facet is probed once.
    #[test]
    fn prop_notifications_never_duplicate_slots(
        id in arb_subject_id(),
        reading_found in any::<bool>(),
        meaning_found in any::<bool>(),
        notifications in 1usize..6,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))?;
        let outcome = |found: bool| if found { ProbeResult::Found } else { ProbeResult::NotFound };

        let fixture = review_page(id.get());
        let prober = Arc::new(
            ScriptedProber::always(outcome(meaning_found))
                .route(asset_url(id.get(), Facet::Reading), outcome(reading_found)),
        );
        let page = shared(fixture.page);

        runtime.block_on(async {
            let mut watcher = watcher_for(&page, &prober);
            for _ in 0..notifications {
                settle(watcher.on_mutation()).await;
            }
        });

        prop_assert_eq!(prober.calls(), 2);
        let page = page.lock().unwrap();
        prop_assert_eq!(
            slot_counts(&page, id, Facet::Reading),
            if reading_found { (1, 0) } else { (0, 1) }
        );
        prop_assert_eq!(
            slot_counts(&page, id, Facet::Meaning),
            if meaning_found { (1, 0) } else { (0, 1) }
        );
    }
}
