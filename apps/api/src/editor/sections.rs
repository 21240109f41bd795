use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::resume::{Resume, SectionContent, SectionKey};

/// Sections shown when an editing session starts.
pub const DEFAULT_SECTION_ORDER: [SectionKey; 3] = [
    SectionKey::Summary,
    SectionKey::Experience,
    SectionKey::Education,
];

/// Resume and store keys that are never offered as addable sections.
pub const NON_CONTENT_KEYS: &[&str] = &["id", "lastUpdated", "version", "error", "status", "isDirty"];

/// Keys rendered by the fixed sidebar rather than the section list.
pub const SIDEBAR_KEYS: &[&str] = &["name", "contact"];

/// Per-session display state: which sections are shown, in what order,
/// whether each is visible, and the uncommitted draft of each section
/// being edited.
///
/// Every operation is total. Invalid requests are logged and ignored so the
/// UI never has to handle errors from here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionState {
    section_order: Vec<SectionKey>,
    visible_sections: BTreeMap<SectionKey, bool>,
    #[serde(rename = "draft")]
    drafts: BTreeMap<SectionKey, SectionContent>,
}

impl SectionState {
    /// Seeds the default order from the keys the resume actually carries.
    pub fn for_resume(resume: &Resume) -> Self {
        let present: Vec<&str> = resume.keys().collect();
        let section_order: Vec<SectionKey> = DEFAULT_SECTION_ORDER
            .into_iter()
            .filter(|k| present.contains(&k.as_str()))
            .collect();
        let visible_sections = section_order.iter().map(|k| (*k, true)).collect();
        SectionState {
            section_order,
            visible_sections,
            drafts: BTreeMap::new(),
        }
    }

    pub fn section_order(&self) -> &[SectionKey] {
        &self.section_order
    }

    pub fn contains(&self, key: SectionKey) -> bool {
        self.section_order.contains(&key)
    }

    pub fn is_visible(&self, key: SectionKey) -> bool {
        self.visible_sections.get(&key).copied().unwrap_or(false)
    }

    pub fn is_editing(&self, key: SectionKey) -> bool {
        self.drafts.contains_key(&key)
    }

    #[cfg(test)]
    pub fn draft(&self, key: SectionKey) -> Option<&SectionContent> {
        self.drafts.get(&key)
    }

    /// Candidates for "add section": resume keys not already shown, minus
    /// non-content and sidebar keys.
    pub fn list_available_sections(&self, resume: &Resume) -> Vec<SectionKey> {
        resume
            .keys()
            .filter(|k| !NON_CONTENT_KEYS.contains(k) && !SIDEBAR_KEYS.contains(k))
            .filter_map(|k| k.parse::<SectionKey>().ok())
            .filter(|k| !self.contains(*k))
            .collect()
    }

    /// Appends an available section to the end of the order, visible.
    /// Returns whether the order changed.
    pub fn add_section(&mut self, resume: &Resume, key: SectionKey) -> bool {
        if !self.list_available_sections(resume).contains(&key) {
            warn!("Ignoring add of unavailable section '{key}'");
            return false;
        }
        self.section_order.push(key);
        self.visible_sections.insert(key, true);
        debug!("Added section '{key}' at position {}", self.section_order.len() - 1);
        true
    }

    /// Drops a section from the display. The resume content is left alone.
    pub fn remove_section(&mut self, key: SectionKey) -> bool {
        let before = self.section_order.len();
        self.section_order.retain(|k| *k != key);
        if self.section_order.len() == before {
            warn!("Ignoring removal of section '{key}' not in order");
            return false;
        }
        self.visible_sections.remove(&key);
        self.drafts.remove(&key);
        true
    }

    pub fn toggle_visibility(&mut self, key: SectionKey) {
        if !self.contains(key) {
            warn!("Ignoring visibility toggle for section '{key}' not in order");
            return;
        }
        let visible = self.visible_sections.entry(key).or_insert(true);
        *visible = !*visible;
    }

    /// Enters editing with a copy of the committed content. A section that
    /// is already being edited keeps its draft.
    pub fn begin_edit(&mut self, resume: &Resume, key: SectionKey) {
        if !self.contains(key) {
            warn!("Ignoring edit of section '{key}' not in order");
            return;
        }
        if self.is_editing(key) {
            debug!("Section '{key}' already in edit");
            return;
        }
        self.drafts.insert(key, resume.section(key));
    }

    /// Replaces the draft. Content is accepted as-is; last write wins.
    pub fn update_draft(&mut self, key: SectionKey, content: SectionContent) {
        match self.drafts.get_mut(&key) {
            Some(draft) => *draft = content,
            None => warn!("Ignoring draft update for section '{key}' not in edit"),
        }
    }

    /// Writes the draft into the resume and leaves editing. This is the only
    /// way resume content changes after load. Returns whether it did.
    pub fn commit(&mut self, resume: &mut Resume, key: SectionKey) -> bool {
        if !self.contains(key) {
            warn!("Ignoring commit of section '{key}' not in order");
            return false;
        }
        let Some(draft) = self.drafts.remove(&key) else {
            warn!("Ignoring commit of section '{key}' not in edit");
            return false;
        };
        match resume.replace_section(key, draft.clone()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Keeping draft after rejected commit: {e}");
                self.drafts.insert(key, draft);
                false
            }
        }
    }

    /// Discards the draft; the resume is unchanged.
    pub fn cancel(&mut self, key: SectionKey) {
        if self.drafts.remove(&key).is_none() {
            debug!("Cancel for section '{key}' with no draft");
        }
    }

    pub fn clear_drafts(&mut self) {
        self.drafts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::SectionItem;
    use chrono::Utc;
    use serde_json::json;

    fn setup() -> (Resume, SectionState) {
        let mut resume = Resume::blank(Utc::now());
        resume.summary = "Original".to_string();
        let state = SectionState::for_resume(&resume);
        (resume, state)
    }

    #[test]
    fn test_initial_state() {
        let (_, state) = setup();
        assert_eq!(state.section_order(), DEFAULT_SECTION_ORDER);
        for key in DEFAULT_SECTION_ORDER {
            assert!(state.is_visible(key));
            assert!(!state.is_editing(key));
        }
    }

    #[test]
    fn test_available_excludes_shown_and_sidebar() {
        let (resume, state) = setup();
        let available = state.list_available_sections(&resume);
        assert_eq!(available.len(), 10);
        assert_eq!(available[0], SectionKey::Skills);
        assert_eq!(available[9], SectionKey::HobbiesAndInterests);
        for key in DEFAULT_SECTION_ORDER {
            assert!(!available.contains(&key));
        }
    }

    #[test]
    fn test_add_appends_and_guards_duplicates() {
        let (resume, mut state) = setup();
        assert!(state.add_section(&resume, SectionKey::Skills));
        assert!(state.add_section(&resume, SectionKey::Awards));
        assert_eq!(
            state.section_order(),
            [
                SectionKey::Summary,
                SectionKey::Experience,
                SectionKey::Education,
                SectionKey::Skills,
                SectionKey::Awards
            ]
        );
        assert!(state.is_visible(SectionKey::Awards));

        let before = state.section_order().to_vec();
        assert!(!state.add_section(&resume, SectionKey::Skills));
        assert!(!state.add_section(&resume, SectionKey::Summary));
        assert_eq!(state.section_order(), before.as_slice());
    }

    #[test]
    fn test_toggle_is_an_involution() {
        let (resume, mut state) = setup();
        state.add_section(&resume, SectionKey::Projects);
        for key in state.section_order().to_vec() {
            let original = state.is_visible(key);
            state.toggle_visibility(key);
            assert_eq!(state.is_visible(key), !original);
            state.toggle_visibility(key);
            assert_eq!(state.is_visible(key), original);
        }
    }

    #[test]
    fn test_toggle_unknown_section_is_noop() {
        let (_, mut state) = setup();
        let before = state.clone();
        state.toggle_visibility(SectionKey::Languages);
        assert_eq!(state, before);
    }

    #[test]
    fn test_cancel_leaves_resume_unchanged() {
        let (mut resume, mut state) = setup();
        let committed = resume.clone();
        state.begin_edit(&resume, SectionKey::Summary);
        assert_eq!(
            state.draft(SectionKey::Summary),
            Some(&SectionContent::Text("Original".into()))
        );
        state.update_draft(SectionKey::Summary, SectionContent::Text("Changed".into()));
        state.cancel(SectionKey::Summary);
        assert!(!state.commit(&mut resume, SectionKey::Summary));
        assert_eq!(resume, committed);
        assert!(!state.is_editing(SectionKey::Summary));
    }

    #[test]
    fn test_commit_writes_draft_exactly() {
        let (mut resume, mut state) = setup();
        let item: SectionItem =
            serde_json::from_value(json!({ "title": "Engineer", "custom": true })).unwrap();
        let content = SectionContent::Items(vec![item]);

        state.begin_edit(&resume, SectionKey::Experience);
        state.update_draft(SectionKey::Experience, content.clone());
        assert!(state.commit(&mut resume, SectionKey::Experience));
        assert_eq!(resume.section(SectionKey::Experience), content);
        assert!(!state.is_editing(SectionKey::Experience));
    }

    #[test]
    fn test_mismatched_commit_keeps_editing() {
        let (mut resume, mut state) = setup();
        state.begin_edit(&resume, SectionKey::Education);
        state.update_draft(SectionKey::Education, SectionContent::Text("oops".into()));
        assert!(!state.commit(&mut resume, SectionKey::Education));
        assert!(state.is_editing(SectionKey::Education));
        assert!(resume.education.items.is_empty());
    }

    #[test]
    fn test_update_without_edit_is_ignored() {
        let (_, mut state) = setup();
        state.update_draft(SectionKey::Summary, SectionContent::Text("x".into()));
        assert!(!state.is_editing(SectionKey::Summary));
    }

    #[test]
    fn test_commit_outside_order_is_ignored() {
        let (mut resume, mut state) = setup();
        assert!(!state.commit(&mut resume, SectionKey::Skills));
    }

    #[test]
    fn test_remove_keeps_resume_and_resets_on_readd() {
        let (mut resume, mut state) = setup();
        resume.summary = "Keep me".into();
        state.toggle_visibility(SectionKey::Summary);
        state.begin_edit(&resume, SectionKey::Summary);

        assert!(state.remove_section(SectionKey::Summary));
        assert!(!state.contains(SectionKey::Summary));
        assert_eq!(resume.summary, "Keep me");
        assert!(state.list_available_sections(&resume).contains(&SectionKey::Summary));

        assert!(state.add_section(&resume, SectionKey::Summary));
        assert_eq!(state.section_order().last(), Some(&SectionKey::Summary));
        assert!(state.is_visible(SectionKey::Summary));
        assert!(!state.is_editing(SectionKey::Summary));
        assert!(!state.remove_section(SectionKey::Awards));
    }

    #[test]
    fn test_serializes_display_state() {
        let (resume, mut state) = setup();
        state.begin_edit(&resume, SectionKey::Summary);
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["sectionOrder"], json!(["summary", "experience", "education"]));
        assert_eq!(value["visibleSections"]["experience"], json!(true));
        assert_eq!(value["draft"]["summary"], json!("Original"));
    }
}
