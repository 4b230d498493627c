//! Checker for the subject/exam chapter agreement.

use serde::Serialize;

use crate::working_set::ProfileWorkingSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A regular exam chapter is absent from its subject.
    MissingFromSubject,
    /// An exam-only chapter is listed in its subject.
    ExamOnlyInSubject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    pub exam_id: String,
    pub subject: String,
    pub chapter: String,
    pub kind: ViolationKind,
}

/// List every exam chapter reference that disagrees with its subject.
///
/// Exam subjects without a matching subject record are not violations.
pub fn check_invariant(ws: &ProfileWorkingSet) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    for exam in &ws.exams {
        for (subject_name, chapter) in exam.chapter_refs() {
            let Some(subject) = ws.subject(subject_name) else {
                continue;
            };
            let present = subject.has_chapter(&chapter.name);
            let kind = match (chapter.exam_only, present) {
                (false, false) => ViolationKind::MissingFromSubject,
                (true, true) => ViolationKind::ExamOnlyInSubject,
                _ => continue,
            };
            violations.push(InvariantViolation {
                exam_id: exam.id.clone(),
                subject: subject_name.to_string(),
                chapter: chapter.name.clone(),
                kind,
            });
        }
    }
    violations
}
