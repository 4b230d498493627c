//! Integration tests for chapter/exam synchronization through the tracker.
//!
//! Covers persistence of each synchronizing operation, healing after an
//! interrupted multi-record write, and invariant preservation under
//! arbitrary operation sequences.

use chrono::NaiveDate;
use proptest::prelude::*;
use studytrack_core::sync::{self, check_invariant};
use studytrack_core::{
    create_profile, ActivationGuard, CoreError, EntityKind, Exam, ExamSubject, MemoryStore,
    Profile, ProfileTracker, ProfileWorkingSet, StorageError, Subject, TrackingMode,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 7).unwrap()
}

fn activate<'a>(store: &'a MemoryStore, profile_id: &str) -> ProfileTracker<&'a MemoryStore> {
    ProfileTracker::activate(store, profile_id, today(), &ActivationGuard::new())
        .unwrap()
        .0
}

/// Profile with a Maths subject and one exam sitting for it that covers
/// "Algebra".
fn seeded(store: &MemoryStore) -> (String, String) {
    let profile = create_profile(store, "Noor", "8", TrackingMode::Simple).unwrap();
    let mut t = activate(store, &profile.id);
    t.add_subject("Maths").unwrap();
    t.add_chapter("Maths", "Algebra").unwrap();
    let exam = t.add_exam("Midterm", today()).unwrap();
    t.add_exam_subject(&exam.id, "maths", None).unwrap();
    t.add_exam_chapter(&exam.id, 0, "Algebra", false).unwrap();
    (profile.id, exam.id)
}

#[test]
fn test_operations_persist_both_sides() {
    let store = MemoryStore::new();
    let (pid, exam_id) = seeded(&store);
    let mut t = activate(&store, &pid);

    t.add_exam_chapter(&exam_id, 0, "Geometry", false).unwrap();
    t.add_exam_chapter(&exam_id, 0, "Statistics", true).unwrap();

    let ws = ProfileWorkingSet::load(&store, &pid).unwrap();
    let maths = ws.subject("maths").unwrap();
    assert!(maths.has_chapter("Geometry"));
    assert!(!maths.has_chapter("Statistics"));
    assert_eq!(ws.exams[0].subjects[0].chapters.len(), 3);
    assert!(check_invariant(&ws).is_empty());

    t.set_exam_only(&exam_id, 0, 2, false).unwrap();
    t.delete_chapter("Maths", "Geometry").unwrap();

    let ws = ProfileWorkingSet::load(&store, &pid).unwrap();
    let names: Vec<_> = ws.subjects[0].chapters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Algebra", "Statistics"]);
    assert!(ws.exams[0].subjects[0]
        .chapters
        .iter()
        .all(|c| c.name != "Geometry"));
    assert!(check_invariant(&ws).is_empty());
}

#[test]
fn test_interrupted_exam_only_toggle_heals_on_next_activation() {
    let store = MemoryStore::new();
    let (pid, exam_id) = seeded(&store);
    let mut t = activate(&store, &pid);

    store.fail_writes(EntityKind::Subject);
    let err = t.set_exam_only(&exam_id, 0, 0, true).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Storage(StorageError::WriteRejected { kind: EntityKind::Subject, .. })
    ));
    store.heal();

    // The exam write landed, the subject write did not.
    let stored = ProfileWorkingSet::load(&store, &pid).unwrap();
    assert!(stored.exams[0].subjects[0].chapters[0].exam_only);
    assert!(stored.subjects[0].has_chapter("Algebra"));
    assert_eq!(check_invariant(&stored).len(), 1);

    let (t, report) =
        ProfileTracker::activate(&store, &pid, today(), &ActivationGuard::new()).unwrap();
    assert_eq!(report.cleaned.subjects.len(), 1);
    assert!(t.violations().is_empty());

    let stored = ProfileWorkingSet::load(&store, &pid).unwrap();
    assert!(!stored.subjects[0].has_chapter("Algebra"));
    assert!(check_invariant(&stored).is_empty());
}

#[test]
fn test_repair_backfills_missing_subject_chapter() {
    let store = MemoryStore::new();
    let (pid, exam_id) = seeded(&store);
    let mut t = activate(&store, &pid);
    t.set_exam_only(&exam_id, 0, 0, true).unwrap();

    // Exam goes back to regular but the subject write is lost.
    store.fail_writes(EntityKind::Subject);
    assert!(t.set_exam_only(&exam_id, 0, 0, false).is_err());
    store.heal();

    let mut t = activate(&store, &pid);
    assert_eq!(t.violations().len(), 1);
    let changes = t.repair().unwrap();
    assert_eq!(changes.subjects.len(), 1);

    let stored = ProfileWorkingSet::load(&store, &pid).unwrap();
    assert!(stored.subjects[0].has_chapter("algebra"));
    assert!(check_invariant(&stored).is_empty());
}

#[test]
fn test_only_touched_records_are_written() {
    let store = MemoryStore::new();
    let (pid, exam_id) = seeded(&store);
    let mut t = activate(&store, &pid);
    t.add_subject("Science").unwrap();

    let before = store.write_count();
    t.add_exam_chapter(&exam_id, 0, "Algebra", false).unwrap();
    assert_eq!(store.write_count(), before);

    t.add_chapter("Science", "Cells").unwrap();
    assert_eq!(store.write_count(), before + 1);
}

// =========================================================================
// Invariant preservation
// =========================================================================

#[derive(Debug, Clone)]
enum Op {
    AddChapter(usize, usize),
    DeleteChapter(usize, usize),
    AddExamChapter(usize, usize, usize, bool),
    RemoveExamChapter(usize, usize, usize),
    SetExamOnly(usize, usize, usize, bool),
    AddTask(usize, usize),
}

const SUBJECTS: [&str; 3] = ["Maths", "science", "Latin"];
const CHAPTERS: [&str; 4] = ["Algebra", "ALGEBRA ", "Cells", "Motion"];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 0..4usize).prop_map(|(s, c)| Op::AddChapter(s, c)),
        (0..3usize, 0..4usize).prop_map(|(s, c)| Op::DeleteChapter(s, c)),
        (0..2usize, 0..3usize, 0..4usize, any::<bool>())
            .prop_map(|(e, s, c, f)| Op::AddExamChapter(e, s, c, f)),
        (0..2usize, 0..3usize, 0..4usize).prop_map(|(e, s, c)| Op::RemoveExamChapter(e, s, c)),
        (0..2usize, 0..3usize, 0..4usize, any::<bool>())
            .prop_map(|(e, s, c, f)| Op::SetExamOnly(e, s, c, f)),
        (0..3usize, 0..4usize).prop_map(|(s, c)| Op::AddTask(s, c)),
    ]
}

fn fresh_working_set() -> ProfileWorkingSet {
    let mut profile = Profile::new("Prop", "1", TrackingMode::Comprehensive);
    profile.id = "p".into();
    let mut ws = ProfileWorkingSet::new(profile);
    // "Latin" has exam sittings but no subject record.
    ws.subjects.push(Subject::new("p", "maths"));
    ws.subjects.push(Subject::new("p", "Science"));
    for (i, name) in ["Midterm", "Final"].iter().enumerate() {
        let mut exam = Exam::new("p", *name, today());
        exam.id = format!("e{i}");
        for subject in SUBJECTS {
            exam.subjects.push(ExamSubject::new(subject, None));
        }
        ws.exams.push(exam);
    }
    ws
}

fn apply(ws: &mut ProfileWorkingSet, op: &Op) {
    let exam_id = |e: usize| format!("e{e}");
    match *op {
        Op::AddChapter(s, c) => {
            sync::add_chapter(ws, SUBJECTS[s], CHAPTERS[c]);
        }
        Op::DeleteChapter(s, c) => {
            sync::delete_chapter(ws, SUBJECTS[s], CHAPTERS[c]);
        }
        Op::AddExamChapter(e, s, c, flag) => {
            sync::add_exam_chapter(ws, &exam_id(e), s, CHAPTERS[c], flag);
        }
        Op::RemoveExamChapter(e, s, c) => {
            sync::remove_exam_chapter(ws, &exam_id(e), s, c);
        }
        Op::SetExamOnly(e, s, c, flag) => {
            sync::set_exam_only(ws, &exam_id(e), s, c, flag);
        }
        Op::AddTask(s, c) => {
            sync::sync_task_chapter(ws, SUBJECTS[s], CHAPTERS[c]);
        }
    }
}

proptest! {
    #[test]
    fn prop_invariant_holds_after_every_operation(
        ops in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let mut ws = fresh_working_set();
        for op in &ops {
            apply(&mut ws, op);
            let violations = check_invariant(&ws);
            prop_assert!(violations.is_empty(), "after {:?}: {:?}", op, violations);
        }
    }

    #[test]
    fn prop_passes_are_idempotent_after_any_sequence(
        ops in prop::collection::vec(op_strategy(), 0..25)
    ) {
        let mut ws = fresh_working_set();
        for op in &ops {
            apply(&mut ws, op);
        }
        sync::migration_pass(&mut ws);
        sync::cleanup_pass(&mut ws);
        let settled = ws.clone();
        prop_assert!(sync::migration_pass(&mut ws).is_empty());
        prop_assert!(sync::cleanup_pass(&mut ws).is_empty());
        prop_assert_eq!(ws, settled);
    }
}
