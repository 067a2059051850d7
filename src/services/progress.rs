// src/services/progress.rs

use std::{collections::BTreeSet, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    config::{COMPLETED_LESSONS_KEY, COMPLETED_VIDEOS_KEY},
    models::progress::{OverallProgress, ProgressResponse},
    services::history::ExamHistory,
    storage::{KeyValueStore, read_json, write_json},
};

/// Lessons and videos the learner has finished.
pub struct ProgressTracker {
    store: Arc<dyn KeyValueStore>,
    lessons: Mutex<BTreeSet<String>>,
    videos: Mutex<BTreeSet<String>>,
}

impl ProgressTracker {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let lessons: BTreeSet<String> = read_json(store.as_ref(), COMPLETED_LESSONS_KEY)
            .await
            .unwrap_or_default();
        let videos: BTreeSet<String> = read_json(store.as_ref(), COMPLETED_VIDEOS_KEY)
            .await
            .unwrap_or_default();

        Self {
            store,
            lessons: Mutex::new(lessons),
            videos: Mutex::new(videos),
        }
    }

    /// Returns `false` when the lesson was already marked.
    pub async fn mark_lesson_complete(&self, lesson_id: &str) -> bool {
        self.mark(&self.lessons, COMPLETED_LESSONS_KEY, lesson_id).await
    }

    /// Returns `false` when the video was already marked.
    pub async fn mark_video_complete(&self, video_id: &str) -> bool {
        self.mark(&self.videos, COMPLETED_VIDEOS_KEY, video_id).await
    }

    pub async fn snapshot(&self, history: &ExamHistory) -> ProgressResponse {
        let completed_lessons = self.lessons.lock().await.clone();
        let completed_videos = self.videos.lock().await.clone();
        let results = history.list().await;

        ProgressResponse {
            overall: OverallProgress {
                lessons_completed: completed_lessons.len(),
                videos_completed: completed_videos.len(),
                exams_completed: results.len(),
                exams_passed: results.iter().filter(|r| r.passed).count(),
            },
            completed_lessons,
            completed_videos,
        }
    }

    /// Forgets finished lessons and videos. Exam history is kept.
    pub async fn reset(&self) {
        let mut lessons = self.lessons.lock().await;
        let mut videos = self.videos.lock().await;
        lessons.clear();
        videos.clear();

        let keys = [
            COMPLETED_LESSONS_KEY.to_string(),
            COMPLETED_VIDEOS_KEY.to_string(),
        ];
        if let Err(e) = self.store.remove_many(&keys).await {
            tracing::warn!("Failed to clear stored progress: {}", e);
        }
        tracing::info!("Learner progress reset");
    }

    async fn mark(&self, set: &Mutex<BTreeSet<String>>, key: &str, id: &str) -> bool {
        let mut set = set.lock().await;
        if !set.insert(id.to_string()) {
            return false;
        }
        if let Err(e) = write_json(self.store.as_ref(), key, &*set).await {
            tracing::warn!("Failed to persist '{}', keeping it in memory: {}", key, e);
        }
        true
    }
}
