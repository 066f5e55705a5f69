//! In-memory [`ContentStore`] for tests and embedded use.
//!
//! All state lives behind a single mutex, so every operation (including
//! atomic version creation) is serialised. Failure injection, simulated
//! version-number races and artificial write latency let callers exercise
//! the engine's error paths deterministically.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use folio_core::content::DRAFT_STATUS;
use folio_core::publication::{ResultStatus, SubmissionKind};
use folio_core::types::{Content, DbId, Timestamp};
use folio_core::versioning::{ids_to_prune, next_version_number};
use folio_db::models::profile::CreatorProfile;
use folio_db::models::section_draft::{SectionDraft, UpsertSectionDraft};
use folio_db::models::section_version::{CreateSectionVersion, SectionVersion};
use folio_db::models::submission::{SubmissionResult, SubmissionTarget};
use parking_lot::Mutex;

use super::ContentStore;
use crate::error::{EngineError, EngineResult};

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    UpsertDraft,
    ReadDraft,
    DeleteDraft,
    MaxVersionNumber,
    InsertVersion,
    ListVersions,
    DeleteVersions,
    GetVersion,
    CreateVersionAtomic,
    CreatorProfiles,
    ReadSection,
    PublishSection,
    UpdateSubmissionStatus,
    ReadSubmissionStatuses,
}

#[derive(Debug, Clone)]
struct MemorySection {
    content: Content,
    published_at: Option<Timestamp>,
    published_by: Option<DbId>,
}

#[derive(Debug, Clone)]
struct MemorySubmission {
    kind: SubmissionKind,
    row: SubmissionResult,
}

#[derive(Default)]
struct MemoryState {
    next_id: DbId,
    sections: HashMap<DbId, MemorySection>,
    drafts: HashMap<DbId, SectionDraft>,
    versions: BTreeMap<DbId, SectionVersion>,
    profiles: HashMap<DbId, CreatorProfile>,
    submissions: BTreeMap<DbId, MemorySubmission>,
    draft_writes: Vec<SectionDraft>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn max_version(&self, unit_id: DbId) -> Option<i32> {
        self.versions
            .values()
            .filter(|v| v.section_id == unit_id)
            .map(|v| v.version_number)
            .max()
    }

    fn number_taken(&self, unit_id: DbId, version_number: i32) -> bool {
        self.versions
            .values()
            .any(|v| v.section_id == unit_id && v.version_number == version_number)
    }

    fn push_version(
        &mut self,
        unit_id: DbId,
        version_number: i32,
        content: Content,
        created_by: Option<DbId>,
    ) -> SectionVersion {
        let version = SectionVersion {
            id: self.allocate_id(),
            section_id: unit_id,
            version_number,
            content,
            created_by,
            created_at: Utc::now(),
        };
        self.versions.insert(version.id, version.clone());
        version
    }

    fn versions_desc(&self, unit_id: DbId) -> Vec<SectionVersion> {
        let mut versions: Vec<SectionVersion> = self
            .versions
            .values()
            .filter(|v| v.section_id == unit_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        versions
    }
}

#[derive(Default)]
struct Faults {
    failing: HashSet<StoreOp>,
    raced_inserts: u32,
}

/// Mutex-guarded in-memory content store.
pub struct MemoryContentStore {
    state: Mutex<MemoryState>,
    faults: Mutex<Faults>,
    write_latency: Mutex<Option<Duration>>,
    atomic_versioning: bool,
    atomic_installed: AtomicBool,
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContentStore {
    /// A store without atomic version creation (three-step path).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            faults: Mutex::new(Faults::default()),
            write_latency: Mutex::new(None),
            atomic_versioning: false,
            atomic_installed: AtomicBool::new(false),
        }
    }

    /// A store that advertises and implements atomic version creation.
    pub fn with_atomic_versioning() -> Self {
        Self {
            atomic_versioning: true,
            atomic_installed: AtomicBool::new(true),
            ..Self::new()
        }
    }

    // ── Fault injection ──

    /// Make every call of `op` fail with `StoreUnavailable` until recovered.
    pub fn fail(&self, op: StoreOp) {
        self.faults.lock().failing.insert(op);
    }

    pub fn recover(&self, op: StoreOp) {
        self.faults.lock().failing.remove(&op);
    }

    /// Simulate a concurrent creator winning the next `n` version inserts:
    /// each raced insert finds its number already taken.
    pub fn race_next_version_inserts(&self, n: u32) {
        self.faults.lock().raced_inserts = n;
    }

    /// Delay every draft write by `latency`.
    pub fn set_write_latency(&self, latency: Duration) {
        *self.write_latency.lock() = Some(latency);
    }

    /// Make the atomic creation path report `Unsupported` while still being
    /// advertised, as when the server-side function has been dropped.
    pub fn uninstall_atomic_versioning(&self) {
        self.atomic_installed.store(false, Ordering::SeqCst);
    }

    fn check(&self, op: StoreOp) -> EngineResult<()> {
        if self.faults.lock().failing.contains(&op) {
            return Err(EngineError::StoreUnavailable(format!(
                "injected failure for {op:?}"
            )));
        }
        Ok(())
    }

    fn take_raced_insert(&self) -> bool {
        let mut faults = self.faults.lock();
        if faults.raced_inserts > 0 {
            faults.raced_inserts -= 1;
            true
        } else {
            false
        }
    }

    // ── Seeding ──

    pub fn add_section(&self, content: Content) -> DbId {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.sections.insert(
            id,
            MemorySection {
                content,
                published_at: None,
                published_by: None,
            },
        );
        id
    }

    pub fn add_profile(&self, full_name: Option<&str>, email: Option<&str>) -> DbId {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.profiles.insert(
            id,
            CreatorProfile {
                id,
                full_name: full_name.map(str::to_string),
                email: email.map(str::to_string),
            },
        );
        id
    }

    /// Place a draft directly, bypassing the write log.
    pub fn seed_draft(
        &self,
        unit_id: DbId,
        content: Content,
        updated_by: Option<DbId>,
        updated_at: Timestamp,
    ) -> SectionDraft {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        let draft = SectionDraft {
            id,
            section_id: unit_id,
            content,
            status: DRAFT_STATUS.to_string(),
            updated_by,
            updated_at,
            created_at: updated_at,
        };
        state.drafts.insert(unit_id, draft.clone());
        draft
    }

    pub fn add_submission(
        &self,
        kind: SubmissionKind,
        assessment_id: DbId,
        result_status: Option<&str>,
        graded: bool,
    ) -> DbId {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        let row = SubmissionResult {
            id,
            assessment_id,
            result_status: result_status.map(str::to_string),
            published_at: None,
            graded_at: graded.then(Utc::now),
        };
        state.submissions.insert(id, MemorySubmission { kind, row });
        id
    }

    // ── Inspection ──

    pub fn draft(&self, unit_id: DbId) -> Option<SectionDraft> {
        self.state.lock().drafts.get(&unit_id).cloned()
    }

    /// Every draft written through [`ContentStore::upsert_draft`], in order.
    pub fn draft_writes(&self) -> Vec<SectionDraft> {
        self.state.lock().draft_writes.clone()
    }

    pub fn draft_write_count(&self) -> usize {
        self.state.lock().draft_writes.len()
    }

    /// Versions of a unit, newest first.
    pub fn versions_of(&self, unit_id: DbId) -> Vec<SectionVersion> {
        self.state.lock().versions_desc(unit_id)
    }

    pub fn section_content(&self, unit_id: DbId) -> Option<Content> {
        self.state.lock().sections.get(&unit_id).map(|s| s.content.clone())
    }

    pub fn section_published_by(&self, unit_id: DbId) -> Option<DbId> {
        self.state
            .lock()
            .sections
            .get(&unit_id)
            .and_then(|s| s.published_by)
    }

    pub fn submission(&self, id: DbId) -> Option<SubmissionResult> {
        self.state.lock().submissions.get(&id).map(|s| s.row.clone())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn upsert_draft(&self, input: &UpsertSectionDraft) -> EngineResult<SectionDraft> {
        self.check(StoreOp::UpsertDraft)?;
        let latency = *self.write_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        let existing = state
            .drafts
            .get(&input.section_id)
            .map(|d| (d.id, d.created_at));
        let (id, created_at) = match existing {
            Some(existing) => existing,
            None => (state.allocate_id(), input.updated_at),
        };
        let draft = SectionDraft {
            id,
            section_id: input.section_id,
            content: input.content.clone(),
            status: input.status.clone(),
            updated_by: Some(input.updated_by),
            updated_at: input.updated_at,
            created_at,
        };
        state.drafts.insert(input.section_id, draft.clone());
        state.draft_writes.push(draft.clone());
        Ok(draft)
    }

    async fn read_draft(&self, unit_id: DbId) -> EngineResult<Option<SectionDraft>> {
        self.check(StoreOp::ReadDraft)?;
        Ok(self.state.lock().drafts.get(&unit_id).cloned())
    }

    async fn delete_draft(&self, unit_id: DbId) -> EngineResult<bool> {
        self.check(StoreOp::DeleteDraft)?;
        Ok(self.state.lock().drafts.remove(&unit_id).is_some())
    }

    async fn max_version_number(&self, unit_id: DbId) -> EngineResult<Option<i32>> {
        self.check(StoreOp::MaxVersionNumber)?;
        Ok(self.state.lock().max_version(unit_id))
    }

    async fn insert_version(&self, input: &CreateSectionVersion) -> EngineResult<SectionVersion> {
        self.check(StoreOp::InsertVersion)?;
        let raced = self.take_raced_insert();

        let mut state = self.state.lock();
        if raced && !state.number_taken(input.section_id, input.version_number) {
            state.push_version(
                input.section_id,
                input.version_number,
                Content::Null,
                None,
            );
        }
        if state.number_taken(input.section_id, input.version_number) {
            return Err(EngineError::DuplicateVersion {
                unit_id: input.section_id,
                version_number: input.version_number,
            });
        }
        Ok(state.push_version(
            input.section_id,
            input.version_number,
            input.content.clone(),
            Some(input.created_by),
        ))
    }

    async fn list_versions(
        &self,
        unit_id: DbId,
        limit: Option<i64>,
    ) -> EngineResult<Vec<SectionVersion>> {
        self.check(StoreOp::ListVersions)?;
        let mut versions = self.state.lock().versions_desc(unit_id);
        if let Some(limit) = limit {
            versions.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(versions)
    }

    async fn delete_versions(&self, ids: &[DbId]) -> EngineResult<u64> {
        self.check(StoreOp::DeleteVersions)?;
        let mut state = self.state.lock();
        let removed = ids
            .iter()
            .filter(|id| state.versions.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn get_version_by_id(&self, id: DbId) -> EngineResult<Option<SectionVersion>> {
        self.check(StoreOp::GetVersion)?;
        Ok(self.state.lock().versions.get(&id).cloned())
    }

    async fn list_units_over_retention(&self, retention: usize) -> EngineResult<Vec<DbId>> {
        self.check(StoreOp::ListVersions)?;
        let state = self.state.lock();
        let mut counts: BTreeMap<DbId, usize> = BTreeMap::new();
        for version in state.versions.values() {
            *counts.entry(version.section_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count > retention)
            .map(|(unit_id, _)| unit_id)
            .collect())
    }

    async fn supports_atomic_versioning(&self) -> EngineResult<bool> {
        Ok(self.atomic_versioning)
    }

    async fn create_version_atomic(
        &self,
        unit_id: DbId,
        content: &Content,
        actor: DbId,
        retention: usize,
    ) -> EngineResult<SectionVersion> {
        self.check(StoreOp::CreateVersionAtomic)?;
        if !self.atomic_installed.load(Ordering::SeqCst) {
            return Err(EngineError::Unsupported(
                "function create_section_version does not exist".to_string(),
            ));
        }

        let mut state = self.state.lock();
        let number = next_version_number(state.max_version(unit_id))?;
        let version = state.push_version(unit_id, number, content.clone(), Some(actor));

        let pairs: Vec<(DbId, i32)> = state
            .versions
            .values()
            .filter(|v| v.section_id == unit_id)
            .map(|v| (v.id, v.version_number))
            .collect();
        for id in ids_to_prune(&pairs, retention.max(1)) {
            state.versions.remove(&id);
        }
        Ok(version)
    }

    async fn creator_profiles(&self, ids: &[DbId]) -> EngineResult<Vec<CreatorProfile>> {
        self.check(StoreOp::CreatorProfiles)?;
        let state = self.state.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }

    async fn read_section_content(&self, unit_id: DbId) -> EngineResult<Option<Content>> {
        self.check(StoreOp::ReadSection)?;
        Ok(self.section_content(unit_id))
    }

    async fn publish_section_content(
        &self,
        unit_id: DbId,
        content: &Content,
        actor: DbId,
        at: Timestamp,
    ) -> EngineResult<bool> {
        self.check(StoreOp::PublishSection)?;
        let mut state = self.state.lock();
        match state.sections.get_mut(&unit_id) {
            Some(section) => {
                section.content = content.clone();
                section.published_at = Some(at);
                section.published_by = Some(actor);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_submission_status(
        &self,
        kind: SubmissionKind,
        target: SubmissionTarget,
        status: ResultStatus,
        published_at: Option<Timestamp>,
    ) -> EngineResult<u64> {
        self.check(StoreOp::UpdateSubmissionStatus)?;
        let mut state = self.state.lock();
        let mut affected = 0;
        for submission in state.submissions.values_mut() {
            if submission.kind != kind {
                continue;
            }
            let row = &mut submission.row;
            let matches = match target {
                SubmissionTarget::One(id) => row.id == id,
                SubmissionTarget::GradedOf(assessment_id) => {
                    row.assessment_id == assessment_id && row.graded_at.is_some()
                }
            };
            if matches {
                row.result_status = Some(status.as_str().to_string());
                if published_at.is_some() {
                    row.published_at = published_at;
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn read_submission_statuses(
        &self,
        kind: SubmissionKind,
        assessment_id: DbId,
    ) -> EngineResult<Vec<Option<String>>> {
        self.check(StoreOp::ReadSubmissionStatuses)?;
        let state = self.state.lock();
        Ok(state
            .submissions
            .values()
            .filter(|s| {
                s.kind == kind && s.row.assessment_id == assessment_id && s.row.graded_at.is_some()
            })
            .map(|s| s.row.result_status.clone())
            .collect())
    }
}
