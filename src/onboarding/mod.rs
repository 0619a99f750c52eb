//! # Onboarding progress state machine
//!
//! A four-step wizard (interests → skills → experience → studies) whose
//! state lives in memory and is snapshotted into the owner's `Profile`.
//!
//! - `save_partial` writes a non-terminal snapshot and keeps the state.
//! - `complete` writes the terminal snapshot and resets the state.
//! - `load_progress` rehydrates only from a non-completed profile.
//!
//! ## Concurrency
//!
//! `save_partial` and `complete` target the same document and the backend
//! is last-write-wins. A partial save that lands after a completion
//! silently un-completes the profile. Callers that can issue both for the
//! same owner concurrently must serialize them (one machine per owner
//! behind a mutex is enough).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::{InterestToGrow, ProfessionalExperience, Profile, Skill, Study};
use crate::query::QueryOptions;
use crate::storage::StoreBackend;
use crate::{DocumentStore, Result};

// ============================================================================
// Steps
// ============================================================================

/// Wizard step. Out-of-range indices clamp to the nearest step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Step {
    #[default]
    Interests,
    Skills,
    Experience,
    Studies,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Interests, Step::Skills, Step::Experience, Step::Studies];
    pub const LAST: Step = Step::Studies;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Step at `index`, clamped to the last step.
    pub fn from_index(index: usize) -> Step {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Step from a persisted integer, clamped to [0, 3].
    pub fn from_stored(raw: i64) -> Step {
        Self::from_index(usize::try_from(raw.max(0)).unwrap_or(usize::MAX))
    }

    pub fn next(self) -> Step {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Step {
        Self::from_index(self.index().saturating_sub(1))
    }
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingState {
    pub current_step: Step,
    pub selected_interests: Vec<InterestToGrow>,
    pub selected_skills: Vec<Skill>,
    pub experiences: Vec<ProfessionalExperience>,
    pub studies: Vec<Study>,
}

impl OnboardingState {
    /// Wizard state recovered from a stored profile. Duplicate uids in the
    /// selections keep their first occurrence.
    pub fn from_profile(profile: Profile) -> Self {
        Self {
            current_step: Step::from_stored(profile.current_step),
            selected_interests: dedup_by_uid(profile.interests, |i| &i.uid),
            selected_skills: dedup_by_uid(profile.skills, |s| &s.uid),
            experiences: profile.experiences,
            studies: profile.studies,
        }
    }

    fn to_profile(&self, owner_id: &str, completed: bool, now: DateTime<Utc>) -> Profile {
        let step = if completed { Step::LAST } else { self.current_step };
        Profile {
            owner_id: owner_id.to_string(),
            created_at: completed.then_some(now),
            updated_at: Some(now),
            completed,
            completed_step: step.index() as i64,
            current_step: step.index() as i64,
            interests: self.selected_interests.clone(),
            skills: self.selected_skills.clone(),
            experiences: self.experiences.clone(),
            studies: self.studies.clone(),
        }
    }
}

fn dedup_by_uid<T>(items: Vec<T>, uid: impl Fn(&T) -> &String) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|i| seen.insert(uid(i).clone())).collect()
}

/// Remove the item with the same uid if present, else append it.
fn toggle<T>(items: &mut Vec<T>, item: T, uid: impl Fn(&T) -> &String) {
    match items.iter().position(|i| uid(i) == uid(&item)) {
        Some(pos) => {
            items.remove(pos);
        }
        None => items.push(item),
    }
}

// ============================================================================
// Drafts
// ============================================================================

/// Form input for a professional experience. `role` and `organization` are
/// required; anything else defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperienceDraft {
    pub role: Option<String>,
    pub organization: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Form input for a study. `title` and `institution` are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyDraft {
    pub title: Option<String>,
    pub institution: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

fn present(field: &Option<String>) -> Option<String> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

// ============================================================================
// ProgressStateMachine
// ============================================================================

/// Owns the in-memory wizard state and persists it through the store.
///
/// State changes are published on a `watch` channel; see `subscribe`.
pub struct ProgressStateMachine<B: StoreBackend> {
    store: DocumentStore<B>,
    state: watch::Sender<OnboardingState>,
}

impl<B: StoreBackend> ProgressStateMachine<B> {
    pub fn new(store: DocumentStore<B>) -> Self {
        Self { store, state: watch::Sender::new(OnboardingState::default()) }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> OnboardingState {
        self.state.borrow().clone()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<OnboardingState> {
        self.state.subscribe()
    }

    pub fn current_step(&self) -> usize {
        self.state.borrow().current_step.index()
    }

    /// Completion percentage of the visible step, 25..=100.
    pub fn progress_percent(&self) -> u8 {
        ((self.current_step() + 1) * 100 / Step::ALL.len()) as u8
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn next(&self) {
        self.state.send_modify(|s| s.current_step = s.current_step.next());
    }

    pub fn previous(&self) {
        self.state.send_modify(|s| s.current_step = s.current_step.previous());
    }

    /// Jump to `step`, clamped to the last step.
    pub fn go_to(&self, step: usize) {
        self.state.send_modify(|s| s.current_step = Step::from_index(step));
    }

    // ========================================================================
    // Selections
    // ========================================================================

    pub fn toggle_interest(&self, interest: InterestToGrow) {
        self.state.send_modify(|s| toggle(&mut s.selected_interests, interest, |i| &i.uid));
    }

    pub fn toggle_skill(&self, skill: Skill) {
        self.state.send_modify(|s| toggle(&mut s.selected_skills, skill, |k| &k.uid));
    }

    pub fn is_interest_selected(&self, uid: &str) -> bool {
        self.state.borrow().selected_interests.iter().any(|i| i.uid == uid)
    }

    pub fn is_skill_selected(&self, uid: &str) -> bool {
        self.state.borrow().selected_skills.iter().any(|s| s.uid == uid)
    }

    // ========================================================================
    // Experiences and studies
    // ========================================================================

    /// Append an experience built from `draft`. Returns its uid, or `None`
    /// (state untouched) when role or organization is missing.
    pub fn add_experience(&self, draft: ExperienceDraft) -> Option<String> {
        let (Some(role), Some(organization)) = (present(&draft.role), present(&draft.organization)) else {
            tracing::debug!("experience draft missing role or organization; skipped");
            return None;
        };
        let now = Utc::now();
        let uid = format!("exp-{}", Uuid::new_v4().simple());
        let experience = ProfessionalExperience {
            uid: uid.clone(),
            role,
            organization,
            description: draft.description.unwrap_or_default(),
            category: draft.category.unwrap_or_default(),
            started_at: draft.started_at.unwrap_or(now),
            ended_at: draft.ended_at,
            created_at: now,
        };
        self.state.send_modify(|s| s.experiences.push(experience));
        Some(uid)
    }

    pub fn remove_experience(&self, uid: &str) {
        self.state.send_if_modified(|s| {
            let before = s.experiences.len();
            s.experiences.retain(|e| e.uid != uid);
            s.experiences.len() != before
        });
    }

    /// Append a study built from `draft`. Returns its uid, or `None`
    /// (state untouched) when title or institution is missing.
    pub fn add_study(&self, draft: StudyDraft) -> Option<String> {
        let (Some(title), Some(institution)) = (present(&draft.title), present(&draft.institution)) else {
            tracing::debug!("study draft missing title or institution; skipped");
            return None;
        };
        let now = Utc::now();
        let uid = format!("study-{}", Uuid::new_v4().simple());
        let study = Study {
            uid: uid.clone(),
            title,
            institution,
            started_at: draft.started_at.unwrap_or(now),
            ended_at: draft.ended_at,
            created_at: now,
        };
        self.state.send_modify(|s| s.studies.push(study));
        Some(uid)
    }

    pub fn remove_study(&self, uid: &str) {
        self.state.send_if_modified(|s| {
            let before = s.studies.len();
            s.studies.retain(|e| e.uid != uid);
            s.studies.len() != before
        });
    }

    /// Back to step 0 with nothing selected.
    pub fn reset(&self) {
        self.state.send_replace(OnboardingState::default());
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the current state as a non-completed profile. State is kept.
    pub async fn save_partial(&self, owner_id: &str) -> Result<()> {
        let profile = self.state.borrow().to_profile(owner_id, false, Utc::now());
        self.store.collection::<Profile>().create_with_id(owner_id, &profile).await?;
        tracing::info!(owner_id, step = profile.current_step, "onboarding progress saved");
        Ok(())
    }

    /// Write the terminal profile, then reset the in-memory state.
    ///
    /// On failure the state is left as it was.
    pub async fn complete(&self, owner_id: &str) -> Result<()> {
        let profile = self.state.borrow().to_profile(owner_id, true, Utc::now());
        self.store.collection::<Profile>().create_with_id(owner_id, &profile).await?;
        tracing::info!(owner_id, "onboarding completed");
        self.reset();
        Ok(())
    }

    /// Rehydrate from the owner's profile if one exists and is not
    /// completed. Returns whether state was loaded.
    pub async fn load_progress(&self, owner_id: &str) -> Result<bool> {
        match self.store.collection::<Profile>().get(owner_id).await? {
            Some(profile) if !profile.completed => {
                tracing::info!(owner_id, step = profile.current_step, "onboarding progress restored");
                self.state.send_replace(OnboardingState::from_profile(profile));
                Ok(true)
            }
            Some(_) => {
                tracing::debug!(owner_id, "profile already completed; starting fresh");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Every interest the user can pick from.
    pub async fn available_interests(&self) -> Result<Vec<InterestToGrow>> {
        self.store.collection::<InterestToGrow>().query(&QueryOptions::new()).await
    }

    /// Every skill the user can pick from.
    pub async fn available_skills(&self) -> Result<Vec<Skill>> {
        self.store.collection::<Skill>().query(&QueryOptions::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_clamping() {
        assert_eq!(Step::Interests.previous(), Step::Interests);
        assert_eq!(Step::Studies.next(), Step::Studies);
        assert_eq!(Step::from_index(17), Step::Studies);
        assert_eq!(Step::from_stored(-4), Step::Interests);
        assert_eq!(Step::from_stored(2), Step::Experience);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let mut items = vec![Skill::new("a", "A")];
        let original = items.clone();
        toggle(&mut items, Skill::new("b", "B"), |s| &s.uid);
        assert_eq!(items.len(), 2);
        toggle(&mut items, Skill::new("b", "B"), |s| &s.uid);
        assert_eq!(items, original);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let items = vec![Skill::new("a", "first"), Skill::new("b", "B"), Skill::new("a", "second")];
        let out = dedup_by_uid(items, |s| &s.uid);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "first");
    }

    #[test]
    fn test_blank_required_field_is_missing() {
        assert_eq!(present(&Some("   ".into())), None);
        assert_eq!(present(&Some(" Dev ".into())), Some("Dev".into()));
    }

    #[test]
    fn test_state_machine_navigation_and_drafts() {
        let machine = ProgressStateMachine::new(DocumentStore::open_memory());
        let mut rx = machine.subscribe();

        machine.previous();
        assert_eq!(machine.current_step(), 0);
        machine.go_to(9);
        assert_eq!(machine.current_step(), 3);
        assert_eq!(machine.progress_percent(), 100);
        machine.next();
        assert_eq!(machine.current_step(), 3);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().current_step, Step::Studies);

        assert_eq!(machine.add_experience(ExperienceDraft { role: Some("Dev".into()), ..Default::default() }), None);
        let uid = machine
            .add_experience(ExperienceDraft {
                role: Some("Dev".into()),
                organization: Some("Acme".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(uid.starts_with("exp-"));
        assert_eq!(machine.state().experiences.len(), 1);
        machine.remove_experience("nope");
        assert_eq!(machine.state().experiences.len(), 1);
        machine.remove_experience(&uid);
        assert!(machine.state().experiences.is_empty());
    }
}
