//! Where the host page exposes the active subject and the facet sections.
//!
//! Both are ordered lists tried front to back; the first hit wins. The host
//! markup is not under our control, so each list can be replaced wholesale.

use mnemo_core::{Facet, SubjectId};

use crate::page::{HostPage, NodeId, Placement, Selector};

// ============================================================================
// SUBJECT SIGNALS
// ============================================================================

/// An element attribute that carries the active subject id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSignal {
    pub selector: Selector,
    pub attribute: String,
}

impl SubjectSignal {
    pub fn new(selector: Selector, attribute: impl Into<String>) -> Self {
        Self {
            selector,
            attribute: attribute.into(),
        }
    }

    fn read(&self, page: &dyn HostPage) -> Option<SubjectId> {
        let node = page.query(&self.selector)?;
        page.attribute(node, &self.attribute)?.parse().ok()
    }
}

/// Answer label during quizzes first, then the page meta tag.
pub fn default_signals() -> Vec<SubjectSignal> {
    vec![
        SubjectSignal::new(
            Selector::tag("label")
                .with_attr_eq("for", "user-response")
                .with_attr("data-subject-id"),
            "data-subject-id",
        ),
        SubjectSignal::new(
            Selector::tag("meta").with_attr_eq("name", "subject_id"),
            "content",
        ),
    ]
}

// ============================================================================
// SECTION LOOKUP
// ============================================================================

/// Presentation mode the host page is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Lesson,
    Review,
}

/// A located facet section and where injected elements belong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLocation {
    pub container: NodeId,
    pub mode: LayoutMode,
    pub placement: Placement,
}

/// One way of finding a facet section.
pub trait SectionStrategy: Send + Sync {
    fn mode(&self) -> LayoutMode;

    fn locate(&self, page: &dyn HostPage, facet: Facet) -> Option<SectionLocation>;
}

/// Review and item pages: `#section-<facet>`, injected before the user note
/// when the section has one.
#[derive(Debug, Clone)]
pub struct ReviewSections {
    pub note_anchor: Selector,
}

impl Default for ReviewSections {
    fn default() -> Self {
        Self {
            note_anchor: Selector::class("subject-section__note"),
        }
    }
}

impl SectionStrategy for ReviewSections {
    fn mode(&self) -> LayoutMode {
        LayoutMode::Review
    }

    fn locate(&self, page: &dyn HostPage, facet: Facet) -> Option<SectionLocation> {
        let container = page.query(&Selector::id(format!("section-{}", facet)))?;
        let placement = match page.query_within(container, &self.note_anchor) {
            Some(anchor) => Placement::Before(anchor),
            None => Placement::AppendTo(container),
        };
        Some(SectionLocation {
            container,
            mode: LayoutMode::Review,
            placement,
        })
    }
}

/// Lesson slides: the facet's slide content block; injected right after it.
#[derive(Debug, Clone)]
pub struct LessonSections {
    pub content_class: String,
    pub facet_attribute: String,
}

impl Default for LessonSections {
    fn default() -> Self {
        Self {
            content_class: "subject-slide__content".to_string(),
            facet_attribute: "data-subject-slide".to_string(),
        }
    }
}

impl SectionStrategy for LessonSections {
    fn mode(&self) -> LayoutMode {
        LayoutMode::Lesson
    }

    fn locate(&self, page: &dyn HostPage, facet: Facet) -> Option<SectionLocation> {
        let selector = Selector::class(self.content_class.clone())
            .with_attr_eq(self.facet_attribute.clone(), facet.as_str());
        let container = page.query(&selector)?;
        Some(SectionLocation {
            container,
            mode: LayoutMode::Lesson,
            placement: Placement::After(container),
        })
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Ordered subject signals and section strategies.
pub struct Layout {
    pub signals: Vec<SubjectSignal>,
    pub strategies: Vec<Box<dyn SectionStrategy>>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            signals: default_signals(),
            strategies: vec![
                Box::new(ReviewSections::default()),
                Box::new(LessonSections::default()),
            ],
        }
    }
}

impl Layout {
    /// Active subject from the first signal that yields a valid id.
    pub fn active_subject(&self, page: &dyn HostPage) -> Option<SubjectId> {
        self.signals.iter().find_map(|signal| signal.read(page))
    }

    /// Section for `facet` from the first strategy that finds one.
    pub fn locate(&self, page: &dyn HostPage, facet: Facet) -> Option<SectionLocation> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.locate(page, facet))
    }
}

impl std::fmt::Debug for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let modes: Vec<LayoutMode> = self.strategies.iter().map(|s| s.mode()).collect();
        f.debug_struct("Layout")
            .field("signals", &self.signals)
            .field("strategies", &modes)
            .finish()
    }
}
