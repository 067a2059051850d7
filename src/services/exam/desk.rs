// src/services/exam/desk.rs

use std::{ops::ControlFlow, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    bank::QuestionBank,
    countdown::Countdown,
    session::{ExamError, ExamSession, TickOutcome},
};
use crate::{
    config::ExamSettings,
    models::{exam_record::ExamView, question::QuestionExplanation},
    services::history::ExamHistory,
    utils::clock::Clock,
};

const TICK: Duration = Duration::from_secs(1);

/// The learner's single live session together with its countdown.
struct Seat {
    session: ExamSession,
    countdown: Option<Countdown>,
}

/// Owns the learner's current exam session.
///
/// Opening a new session discards the previous one and, with it, its
/// countdown. Every operation names the session it targets, so requests
/// against a discarded session fail with `SessionNotFound`.
pub struct ExamDesk {
    bank: Arc<QuestionBank>,
    settings: ExamSettings,
    clock: Arc<dyn Clock>,
    history: Arc<ExamHistory>,
    seat: Arc<Mutex<Option<Seat>>>,
}

impl ExamDesk {
    pub fn new(
        bank: Arc<QuestionBank>,
        settings: ExamSettings,
        clock: Arc<dyn Clock>,
        history: Arc<ExamHistory>,
    ) -> Self {
        Self {
            bank,
            settings,
            clock,
            history,
            seat: Arc::new(Mutex::new(None)),
        }
    }

    /// Replaces whatever session was open with a fresh, unstarted one.
    pub async fn open(&self, exam_type: &str) -> ExamView {
        let session = ExamSession::new(self.bank.clone(), self.settings, exam_type);
        let view = session.view();

        let previous = self.seat.lock().await.replace(Seat {
            session,
            countdown: None,
        });
        if let Some(previous) = previous {
            tracing::info!("Discarded exam session {}", previous.session.id());
        }

        view
    }

    pub async fn view(&self, id: Uuid) -> Result<ExamView, ExamError> {
        self.with_session(id, |s| Ok(s.view())).await
    }

    /// Starts the session and its countdown.
    pub async fn start(&self, id: Uuid) -> Result<ExamView, ExamError> {
        let mut guard = self.seat.lock().await;
        let seat = seat_for(&mut guard, id)?;

        seat.session.start(self.clock.now())?;
        seat.countdown = Some(self.spawn_countdown(id));
        tracing::info!(
            "Exam session {} started with {} questions",
            id,
            seat.session.questions().len()
        );

        Ok(seat.session.view())
    }

    pub async fn select_answer(
        &self,
        id: Uuid,
        question_id: u32,
        option_index: u8,
    ) -> Result<ExamView, ExamError> {
        self.with_session(id, |s| {
            s.select_answer(question_id, option_index)?;
            Ok(s.view())
        })
        .await
    }

    pub async fn advance(&self, id: Uuid) -> Result<ExamView, ExamError> {
        self.with_session(id, |s| {
            s.advance()?;
            Ok(s.view())
        })
        .await
    }

    pub async fn retreat(&self, id: Uuid) -> Result<ExamView, ExamError> {
        self.with_session(id, |s| {
            s.retreat()?;
            Ok(s.view())
        })
        .await
    }

    /// Submits the session and stops its countdown. Submitting again changes nothing.
    pub async fn submit(&self, id: Uuid) -> Result<ExamView, ExamError> {
        let mut guard = self.seat.lock().await;
        let seat = seat_for(&mut guard, id)?;

        if let Some(result) = seat.session.submit(self.clock.now())? {
            seat.countdown = None;
            self.history.record(result).await;
        }

        Ok(seat.session.view())
    }

    /// Replaces a finished (or never started) session with a fresh one.
    pub async fn retry(&self, id: Uuid) -> Result<ExamView, ExamError> {
        let mut guard = self.seat.lock().await;
        let seat = seat_for(&mut guard, id)?;

        let fresh = seat.session.retry()?;
        let view = fresh.view();
        *guard = Some(Seat {
            session: fresh,
            countdown: None,
        });

        Ok(view)
    }

    pub async fn explanation(
        &self,
        id: Uuid,
        question_id: u32,
    ) -> Result<QuestionExplanation, ExamError> {
        self.with_session(id, |s| s.explanation(question_id)).await
    }

    /// Drops the session, cancelling its countdown. An unfinished session leaves no history.
    pub async fn close(&self, id: Uuid) -> Result<(), ExamError> {
        let mut guard = self.seat.lock().await;
        seat_for(&mut guard, id)?;
        guard.take();
        Ok(())
    }

    async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ExamSession) -> Result<T, ExamError>,
    ) -> Result<T, ExamError> {
        let mut guard = self.seat.lock().await;
        let seat = seat_for(&mut guard, id)?;
        f(&mut seat.session)
    }

    fn spawn_countdown(&self, id: Uuid) -> Countdown {
        let seat = Arc::downgrade(&self.seat);
        let clock = self.clock.clone();
        let history = self.history.clone();

        Countdown::spawn(TICK, move || {
            let seat = seat.clone();
            let clock = clock.clone();
            let history = history.clone();
            async move {
                let Some(seat) = seat.upgrade() else {
                    return ControlFlow::Break(());
                };
                let mut guard = seat.lock().await;
                let Ok(seat) = seat_for(&mut guard, id) else {
                    return ControlFlow::Break(());
                };

                match seat.session.tick(clock.now()) {
                    Ok(TickOutcome::Running { .. }) => ControlFlow::Continue(()),
                    Ok(TickOutcome::TimedOut(result)) => {
                        tracing::info!("Exam session {} ran out of time", id);
                        history.record(result).await;
                        if let Some(countdown) = seat.countdown.take() {
                            countdown.detach();
                        }
                        ControlFlow::Break(())
                    }
                    Err(_) => ControlFlow::Break(()),
                }
            }
        })
    }
}

fn seat_for(slot: &mut Option<Seat>, id: Uuid) -> Result<&mut Seat, ExamError> {
    slot.as_mut()
        .filter(|seat| seat.session.id() == id)
        .ok_or(ExamError::SessionNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::exam_record::ExamState,
        storage::MemoryStore,
        utils::clock::SystemClock,
    };

    async fn desk(time_limit_secs: u32) -> (ExamDesk, Arc<ExamHistory>) {
        let history = Arc::new(ExamHistory::load(Arc::new(MemoryStore::new())).await);
        let desk = ExamDesk::new(
            Arc::new(QuestionBank::builtin()),
            ExamSettings {
                time_limit_secs,
                passing_percentage: 70,
            },
            Arc::new(SystemClock),
            history.clone(),
        );
        (desk, history)
    }

    async fn correct_answer(desk: &ExamDesk, index: usize) -> (u32, u8) {
        let guard = desk.seat.lock().await;
        let q = &guard.as_ref().unwrap().session.questions()[index];
        (q.id, q.correct_option)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_submits_with_recorded_answers() {
        let (desk, history) = desk(5).await;
        let id = desk.open("general").await.id;
        desk.start(id).await.unwrap();

        let (qid, option) = correct_answer(&desk, 0).await;
        desk.select_answer(id, qid, option).await.unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;

        let view = desk.view(id).await.unwrap();
        assert_eq!(view.state, ExamState::Completed);
        assert_eq!(view.remaining_seconds, 0);
        assert_eq!(view.result.unwrap().correct_count, 1);
        assert_eq!(history.list().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_submit_stops_countdown() {
        let (desk, history) = desk(5).await;
        let id = desk.open("general").await.id;
        desk.start(id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let view = desk.submit(id).await.unwrap();
        assert_eq!(view.result.as_ref().unwrap().time_spent_seconds, 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        desk.submit(id).await.unwrap();

        assert_eq!(desk.view(id).await.unwrap().remaining_seconds, 3);
        assert_eq!(history.list().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_opening_new_session_cancels_old_countdown() {
        let (desk, history) = desk(3).await;
        let old = desk.open("general").await.id;
        desk.start(old).await.unwrap();

        let new = desk.open("general").await.id;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(history.list().await.is_empty());
        assert_eq!(desk.view(old).await.unwrap_err(), ExamError::SessionNotFound(old));
        assert_eq!(desk.view(new).await.unwrap().state, ExamState::NotStarted);
    }

    #[tokio::test]
    async fn test_retry_replaces_completed_session() {
        let (desk, history) = desk(1200).await;
        let id = desk.open("signs").await.id;
        desk.start(id).await.unwrap();
        desk.submit(id).await.unwrap();

        let fresh = desk.retry(id).await.unwrap();
        assert_ne!(fresh.id, id);
        assert_eq!(fresh.state, ExamState::NotStarted);
        assert_eq!(fresh.exam_type, "signs");
        assert!(desk.view(id).await.is_err());
        assert_eq!(history.list().await[0].exam_type, "signs");
    }

    #[tokio::test]
    async fn test_close_discards_session() {
        let (desk, _) = desk(1200).await;
        let id = desk.open("general").await.id;
        desk.start(id).await.unwrap();

        desk.close(id).await.unwrap();
        assert_eq!(desk.submit(id).await.unwrap_err(), ExamError::SessionNotFound(id));
    }
}
