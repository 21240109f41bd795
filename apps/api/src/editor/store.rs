use serde::Serialize;
use tokio::sync::broadcast;

use super::highlight::TextHighlight;
use super::sections::SectionState;
use crate::models::resume::{Resume, SectionContent, SectionKey};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    ResumeReplaced,
    SectionCommitted { section: SectionKey },
}

/// The read-mostly store behind one editing session: the canonical resume,
/// its display state, and the highlight side channel.
///
/// Resume content changes only through `set_selected_resume` and `commit`;
/// both notify subscribers.
#[derive(Debug)]
pub struct EditorStore {
    resume: Resume,
    sections: SectionState,
    highlight: TextHighlight,
    events: broadcast::Sender<StoreEvent>,
}

impl EditorStore {
    pub fn new(resume: Resume) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sections: SectionState::for_resume(&resume),
            resume,
            highlight: TextHighlight::default(),
            events,
        }
    }

    pub fn resume(&self) -> &Resume {
        &self.resume
    }

    pub fn sections(&self) -> &SectionState {
        &self.sections
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlight.current()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn has_subscribers(&self) -> bool {
        self.events.receiver_count() > 0
    }

    /// Replaces the resume wholesale. Drafts belong to the old document and
    /// are dropped; section order and visibility are kept.
    pub fn set_selected_resume(&mut self, resume: Resume) {
        self.resume = resume;
        self.sections.clear_drafts();
        self.publish(StoreEvent::ResumeReplaced);
    }

    pub fn list_available_sections(&self) -> Vec<SectionKey> {
        self.sections.list_available_sections(&self.resume)
    }

    pub fn add_section(&mut self, key: SectionKey) -> bool {
        self.sections.add_section(&self.resume, key)
    }

    pub fn remove_section(&mut self, key: SectionKey) -> bool {
        self.sections.remove_section(key)
    }

    pub fn toggle_visibility(&mut self, key: SectionKey) {
        self.sections.toggle_visibility(key)
    }

    pub fn begin_edit(&mut self, key: SectionKey) {
        self.sections.begin_edit(&self.resume, key)
    }

    pub fn update_draft(&mut self, key: SectionKey, content: SectionContent) {
        self.sections.update_draft(key, content)
    }

    pub fn commit(&mut self, key: SectionKey) -> bool {
        let committed = self.sections.commit(&mut self.resume, key);
        if committed {
            self.publish(StoreEvent::SectionCommitted { section: key });
        }
        committed
    }

    pub fn cancel(&mut self, key: SectionKey) {
        self.sections.cancel(key)
    }

    pub fn record_selection(&mut self, selection: &str) {
        self.highlight.record_selection(selection)
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
