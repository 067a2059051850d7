// src/models/progress.rs

use std::collections::BTreeSet;

use serde::Serialize;

/// Counters shown on the learner dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverallProgress {
    pub lessons_completed: usize,
    pub videos_completed: usize,
    pub exams_completed: usize,
    pub exams_passed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressResponse {
    pub completed_lessons: BTreeSet<String>,
    pub completed_videos: BTreeSet<String>,
    pub overall: OverallProgress,
}
