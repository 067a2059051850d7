use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{
        entitlement::EntitlementStore,
        exam::{ExamDesk, QuestionBank},
        history::ExamHistory,
        payment::PaymentProcessor,
        progress::ProgressTracker,
    },
    storage::KeyValueStore,
    utils::clock::Clock,
};

#[derive(Clone)]
pub struct AppState {
    pub entitlements: Arc<EntitlementStore>,
    pub exams: Arc<ExamDesk>,
    pub history: Arc<ExamHistory>,
    pub progress: Arc<ProgressTracker>,
}

impl AppState {
    /// Wires every service on top of the given collaborators, loading persisted state.
    pub async fn initialize(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        payments: Arc<dyn PaymentProcessor>,
        bank: QuestionBank,
    ) -> Self {
        let entitlements =
            Arc::new(EntitlementStore::load(store.clone(), clock.clone(), payments).await);
        let history = Arc::new(ExamHistory::load(store.clone()).await);
        let progress = Arc::new(ProgressTracker::load(store).await);
        let exams = Arc::new(ExamDesk::new(
            Arc::new(bank),
            config.exam,
            clock,
            history.clone(),
        ));

        Self {
            entitlements,
            exams,
            history,
            progress,
        }
    }
}

impl FromRef<AppState> for Arc<EntitlementStore> {
    fn from_ref(state: &AppState) -> Self {
        state.entitlements.clone()
    }
}

impl FromRef<AppState> for Arc<ExamDesk> {
    fn from_ref(state: &AppState) -> Self {
        state.exams.clone()
    }
}

impl FromRef<AppState> for Arc<ExamHistory> {
    fn from_ref(state: &AppState) -> Self {
        state.history.clone()
    }
}
