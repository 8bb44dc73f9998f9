//! In-process fakes for every collaborator trait.
//!
//! Available to this crate's tests and, with the `test-support` feature, to downstream crates.

use crate::consents::{Collaborators, ConsentsService};
use crate::coordinator::CompletionCoordinator;
use crate::resolver::RequirementResolver;
use crate::link::{CompanionLink, LinkId};
use crate::sources::{
    CaptureStore, ClinicalRecord, DefinitionSource, LinkStore, OptionSource, TaskStore,
};
use crate::stores::MemoryStore;
use crate::task::{CompanionTask, TaskStatus, TaskType};
use crate::CompanionResult;
use async_trait::async_trait;
use caravan::{
    Applicability, CapturesQuery, CaravanError, ConsentCapture, ConsentCategory,
    ConsentDefinition, ConsentOptions, DefinitionsQuery, Lookup, NewConsentCapture,
};
use chrono::Utc;
use companion_types::{
    CaptureId, CareRequestId, CategoryId, DefinitionId, LanguageId, PatientId, ServiceLineId,
    SignerId, StateCode, TaskId,
};
use dashboard::{CareRequest, ServiceLine};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_CARE_REQUEST: CareRequestId = CareRequestId(700);
pub const DEFAULT_PATIENT: PatientId = PatientId(42);
pub const DEFAULT_SERVICE_LINE: ServiceLineId = ServiceLineId(5);
pub const DEFAULT_STATE: &str = "CO";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An active English definition applicable everywhere, signable by anyone.
pub fn definition(id: u64, category: u64) -> ConsentDefinition {
    ConsentDefinition {
        id: DefinitionId(id),
        active: true,
        service_lines: Applicability::All,
        states: Applicability::All,
        category_id: CategoryId(category),
        language_id: LanguageId(1),
        mandatory: false,
        expiry: None,
        signer_ids: Vec::new(),
        name: format!("Definition {id}"),
        version: "1".into(),
    }
}

/// A capture of `definition_id` for the default episode.
pub fn capture(id: u64, definition_id: u64) -> ConsentCapture {
    ConsentCapture {
        id: CaptureId(id),
        definition_id: DefinitionId(definition_id),
        episode_id: DEFAULT_CARE_REQUEST,
        patient_id: DEFAULT_PATIENT,
        visit_id: DEFAULT_CARE_REQUEST,
        service_line_id: DEFAULT_SERVICE_LINE,
        signer: SignerId(1),
        verbal: false,
        witness: None,
        revoked_at: None,
        created_at: Some(Utc::now()),
    }
}

/// A care request for the default patient in Colorado.
pub fn care_request(id: u64, service_line: Option<u64>) -> CareRequest {
    CareRequest {
        id: CareRequestId(id),
        patient_id: DEFAULT_PATIENT,
        state: StateCode::parse(DEFAULT_STATE).expect("static state code is valid"),
        service_line: service_line.map(|id| ServiceLine {
            id: ServiceLineId(id),
            name: format!("Service line {id}"),
        }),
    }
}

/// Options with the given required and optional category ids.
pub fn options(required: &[u64], optional: &[u64]) -> ConsentOptions {
    let category = |id: u64, required: bool| ConsentCategory {
        id: CategoryId(id),
        name: format!("Category {id}"),
        order: u32::try_from(id).unwrap_or(u32::MAX),
        required,
    };
    ConsentOptions {
        categories: required
            .iter()
            .map(|id| category(*id, true))
            .chain(optional.iter().map(|id| category(*id, false)))
            .collect(),
        ..ConsentOptions::default()
    }
}

// ============================================================================
// Caravan
// ============================================================================

#[derive(Default)]
struct CaravanState {
    /// `None` answers every definitions query with not-found.
    definitions: Option<Vec<ConsentDefinition>>,
    definitions_failure: Option<CaravanError>,
    options: ConsentOptions,
    captures: Vec<ConsentCapture>,
    last_definitions_query: Option<DefinitionsQuery>,
    last_captures_query: Option<CapturesQuery>,
    options_calls: usize,
    created_captures: usize,
}

/// Fake Caravan: definitions, options and captures.
#[derive(Default)]
pub struct FakeCaravan {
    state: Mutex<CaravanState>,
}

impl FakeCaravan {
    pub fn new() -> Self {
        let fake = Self::default();
        lock(&fake.state).definitions = Some(Vec::new());
        fake
    }

    pub fn set_definitions(&self, definitions: Vec<ConsentDefinition>) {
        lock(&self.state).definitions = Some(definitions);
    }

    pub fn set_definitions_not_found(&self) {
        lock(&self.state).definitions = None;
    }

    /// Fail the next definitions query with `error`.
    pub fn fail_definitions(&self, error: CaravanError) {
        lock(&self.state).definitions_failure = Some(error);
    }

    pub fn set_options(&self, options: ConsentOptions) {
        lock(&self.state).options = options;
    }

    pub fn insert_capture(&self, capture: ConsentCapture) {
        lock(&self.state).captures.push(capture);
    }

    pub fn last_definitions_query(&self) -> Option<DefinitionsQuery> {
        lock(&self.state).last_definitions_query.clone()
    }

    pub fn last_captures_query(&self) -> Option<CapturesQuery> {
        lock(&self.state).last_captures_query.clone()
    }

    pub fn options_calls(&self) -> usize {
        lock(&self.state).options_calls
    }

    pub fn created_captures(&self) -> usize {
        lock(&self.state).created_captures
    }
}

#[async_trait]
impl DefinitionSource for FakeCaravan {
    async fn list(
        &self,
        query: &DefinitionsQuery,
    ) -> CompanionResult<Lookup<Vec<ConsentDefinition>>> {
        let mut state = lock(&self.state);
        state.last_definitions_query = Some(query.clone());
        if let Some(error) = state.definitions_failure.take() {
            return Err(error.into());
        }

        let Some(definitions) = &state.definitions else {
            return Ok(Lookup::NotFound);
        };
        let signers = query.signer_ids.clone().unwrap_or_default();
        Ok(Lookup::Found(
            definitions
                .iter()
                .filter(|d| d.active == query.active.unwrap_or(true))
                .filter(|d| d.service_lines.applies_to(&query.service_line))
                .filter(|d| d.states.applies_to(&query.state))
                .filter(|d| d.language_id == query.language_id)
                .filter(|d| {
                    signers.is_empty()
                        || d.signer_ids.is_empty()
                        || d.signer_ids.iter().any(|s| signers.contains(s))
                })
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl OptionSource for FakeCaravan {
    async fn options(&self) -> CompanionResult<ConsentOptions> {
        let mut state = lock(&self.state);
        state.options_calls += 1;
        Ok(state.options.clone())
    }
}

#[async_trait]
impl CaptureStore for FakeCaravan {
    async fn list(&self, query: &CapturesQuery) -> CompanionResult<Lookup<Vec<ConsentCapture>>> {
        let mut state = lock(&self.state);
        state.last_captures_query = Some(query.clone());
        let captures: Vec<ConsentCapture> = state
            .captures
            .iter()
            .filter(|c| c.episode_id == query.episode_id && c.patient_id == query.patient_id)
            .cloned()
            .collect();

        if captures.is_empty() {
            Ok(Lookup::NotFound)
        } else {
            Ok(Lookup::Found(captures))
        }
    }

    async fn create(&self, capture: &NewConsentCapture) -> CompanionResult<ConsentCapture> {
        let mut state = lock(&self.state);
        state.created_captures += 1;
        let created = ConsentCapture {
            id: CaptureId(state.captures.len() as u64 + 1),
            definition_id: capture.definition_id,
            episode_id: capture.episode_id,
            patient_id: capture.patient_id,
            visit_id: capture.visit_id,
            service_line_id: capture.service_line_id,
            signer: capture.signer,
            verbal: capture.verbal,
            witness: None,
            revoked_at: None,
            created_at: Some(Utc::now()),
        };
        state.captures.push(created.clone());
        Ok(created)
    }
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Default)]
struct DashboardState {
    care_requests: HashMap<CareRequestId, CareRequest>,
    medication_history: HashMap<PatientId, bool>,
    applied: Vec<CareRequestId>,
    care_request_calls: usize,
}

/// Fake clinical record recording every `apply_signed_consents` call.
#[derive(Default)]
pub struct FakeDashboard {
    state: Mutex<DashboardState>,
}

impl FakeDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_care_request(&self, care_request: CareRequest) {
        lock(&self.state)
            .care_requests
            .insert(care_request.id, care_request);
    }

    pub fn remove_care_request(&self, id: CareRequestId) {
        lock(&self.state).care_requests.remove(&id);
    }

    pub fn set_medication_history_consent(&self, patient_id: PatientId, consented: bool) {
        lock(&self.state)
            .medication_history
            .insert(patient_id, consented);
    }

    pub fn applied_care_requests(&self) -> Vec<CareRequestId> {
        lock(&self.state).applied.clone()
    }

    pub fn care_request_calls(&self) -> usize {
        lock(&self.state).care_request_calls
    }
}

#[async_trait]
impl ClinicalRecord for FakeDashboard {
    async fn care_request(&self, id: CareRequestId) -> CompanionResult<Option<CareRequest>> {
        let mut state = lock(&self.state);
        state.care_request_calls += 1;
        Ok(state.care_requests.get(&id).cloned())
    }

    async fn apply_signed_consents(&self, care_request_id: CareRequestId) -> CompanionResult<()> {
        lock(&self.state).applied.push(care_request_id);
        Ok(())
    }

    async fn medication_history_consent_status(
        &self,
        patient_id: PatientId,
    ) -> CompanionResult<Option<bool>> {
        Ok(lock(&self.state)
            .medication_history
            .get(&patient_id)
            .copied())
    }
}

// ============================================================================
// Stores
// ============================================================================

/// [`MemoryStore`] that counts task writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    metadata_writes: AtomicUsize,
    status_writes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata_writes(&self) -> usize {
        self.metadata_writes.load(Ordering::SeqCst)
    }

    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkStore for CountingStore {
    async fn find_link(&self, link_id: &LinkId) -> CompanionResult<Option<CompanionLink>> {
        self.inner.find_link(link_id).await
    }

    async fn initialise_link(
        &self,
        care_request_id: CareRequestId,
    ) -> CompanionResult<CompanionLink> {
        self.inner.initialise_link(care_request_id).await
    }
}

#[async_trait]
impl TaskStore for CountingStore {
    async fn find_task(
        &self,
        link_id: &LinkId,
        task_type: TaskType,
    ) -> CompanionResult<Option<CompanionTask>> {
        self.inner.find_task(link_id, task_type).await
    }

    async fn find_by_id(
        &self,
        link_id: &LinkId,
        task_id: TaskId,
    ) -> CompanionResult<Option<CompanionTask>> {
        self.inner.find_by_id(link_id, task_id).await
    }

    async fn tasks_for_link(&self, link_id: &LinkId) -> CompanionResult<Vec<CompanionTask>> {
        self.inner.tasks_for_link(link_id).await
    }

    async fn update_metadata(&self, task_id: TaskId, metadata: Value) -> CompanionResult<()> {
        self.metadata_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_metadata(task_id, metadata).await
    }

    async fn update_status(
        &self,
        task: &CompanionTask,
        status: TaskStatus,
    ) -> CompanionResult<CompanionTask> {
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_status(task, status).await
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Fakes wired into a [`ConsentsService`], with a default episode: care request 700 for
/// patient 42 in Colorado on service line 5.
pub struct Harness {
    pub caravan: Arc<FakeCaravan>,
    pub dashboard: Arc<FakeDashboard>,
    pub store: Arc<CountingStore>,
    pub consents: ConsentsService,
    pub resolver: RequirementResolver,
    pub coordinator: CompletionCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        let caravan = Arc::new(FakeCaravan::new());
        let dashboard = Arc::new(FakeDashboard::new());
        let store = Arc::new(CountingStore::new());
        dashboard.insert_care_request(care_request(
            DEFAULT_CARE_REQUEST.get(),
            Some(DEFAULT_SERVICE_LINE.get()),
        ));

        let consents = ConsentsService::new(
            Collaborators {
                definitions: caravan.clone(),
                options: caravan.clone(),
                captures: caravan.clone(),
                tasks: store.clone(),
                links: store.clone(),
                record: dashboard.clone(),
            },
            LanguageId(1),
        );
        let resolver = RequirementResolver::new(caravan.clone(), caravan.clone());
        let coordinator = CompletionCoordinator::new(
            store.clone(),
            store.clone(),
            dashboard.clone(),
            resolver.clone(),
            LanguageId(1),
        );

        Self {
            caravan,
            dashboard,
            store,
            consents,
            resolver,
            coordinator,
        }
    }

    /// Required categories {1, 2}; definitions 10 (category 1), 11 (category 2) and
    /// 12 (category 3, optional).
    pub fn with_required_scenario() -> Self {
        let harness = Self::new();
        harness
            .caravan
            .set_definitions(vec![definition(10, 1), definition(11, 2), definition(12, 3)]);
        harness.caravan.set_options(options(&[1, 2], &[3]));
        harness
    }

    /// A new link for the default care request.
    pub async fn link(&self) -> CompanionLink {
        self.store
            .initialise_link(DEFAULT_CARE_REQUEST)
            .await
            .expect("initialise link in memory")
    }

    pub async fn required_ids(&self) -> BTreeSet<DefinitionId> {
        let state = StateCode::parse(DEFAULT_STATE).expect("static state code is valid");
        self.resolver
            .required_definition_ids(DEFAULT_SERVICE_LINE, &state, LanguageId(1))
            .await
            .expect("resolve required ids")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
