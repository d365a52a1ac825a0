use std::fmt;

use registrar_common::{Course, CourseId, Enrollment, Student, StudentId};
use registrar_kernel::{EntityStore, Record};

/// A reversible unit of mutation against the [`EntityStore`].
///
/// A command captures everything it needs for both directions when it is
/// built. Neither `execute` nor `undo` looks anything up that might have
/// moved on since construction.
pub trait Command: fmt::Debug {
    /// Apply the forward effect.
    fn execute(&self, store: &mut EntityStore);
    /// Apply the exact inverse of [`execute`](Command::execute).
    fn undo(&self, store: &mut EntityStore);
    /// Stable description for history display, e.g. `AddStudent(1000)`.
    fn label(&self) -> String;
}

/// A record kind that enrollments reference by foreign key.
pub trait Parent: Record {
    fn is_referenced_by(id: Self::Id, enrollment: &Enrollment) -> bool;
}

impl Parent for Student {
    fn is_referenced_by(id: StudentId, enrollment: &Enrollment) -> bool {
        enrollment.student_id() == id
    }
}

impl Parent for Course {
    fn is_referenced_by(id: CourseId, enrollment: &Enrollment) -> bool {
        enrollment.course_id() == id
    }
}

/// Insert a new record. Undo removes it by id.
#[derive(Debug, Clone)]
pub struct AddEntity<R> {
    record: R,
}

impl<R: Record> AddEntity<R> {
    pub fn new(record: R) -> Self {
        Self { record }
    }
}

impl<R: Record> Command for AddEntity<R> {
    fn execute(&self, store: &mut EntityStore) {
        store.insert(self.record.clone());
    }

    fn undo(&self, store: &mut EntityStore) {
        store.remove::<R>(self.record.record_id());
    }

    fn label(&self) -> String {
        format!("Add{}({})", R::KIND, self.record.record_id())
    }
}

/// Swap a record for a new value. Both full values are kept.
#[derive(Debug, Clone)]
pub struct UpdateEntity<R> {
    before: R,
    after: R,
}

impl<R: Record> UpdateEntity<R> {
    pub fn new(before: R, after: R) -> Self {
        debug_assert!(before.record_id() == after.record_id());
        Self { before, after }
    }
}

impl<R: Record> Command for UpdateEntity<R> {
    fn execute(&self, store: &mut EntityStore) {
        store.replace(self.after.clone());
    }

    fn undo(&self, store: &mut EntityStore) {
        store.replace(self.before.clone());
    }

    fn label(&self) -> String {
        format!("Update{}({})", R::KIND, self.after.record_id())
    }
}

/// Remove a record that nothing depends on. Undo puts it back where it was.
#[derive(Debug, Clone)]
pub struct RemoveEntity<R> {
    record: R,
    position: usize,
}

impl<R: Record> RemoveEntity<R> {
    /// `position` is the record's index in its table when the command is built.
    pub fn new(record: R, position: usize) -> Self {
        Self { record, position }
    }
}

impl<R: Record> Command for RemoveEntity<R> {
    fn execute(&self, store: &mut EntityStore) {
        store.remove::<R>(self.record.record_id());
    }

    fn undo(&self, store: &mut EntityStore) {
        store.insert_at(self.position, self.record.clone());
    }

    fn label(&self) -> String {
        format!("Remove{}({})", R::KIND, self.record.record_id())
    }
}

/// Remove a parent record together with its cascade set.
///
/// The cascade set is the exact list of enrollments removed with the parent,
/// each paired with its table position, in ascending position order.
#[derive(Debug, Clone)]
pub struct RemoveWithCascade<R> {
    record: R,
    position: usize,
    cascade: Vec<(usize, Enrollment)>,
}

impl<R: Parent> RemoveWithCascade<R> {
    pub fn new(record: R, position: usize, cascade: Vec<(usize, Enrollment)>) -> Self {
        debug_assert!(cascade.windows(2).all(|w| w[0].0 < w[1].0));
        Self {
            record,
            position,
            cascade,
        }
    }

    /// Enrollments removed along with the parent record.
    pub fn cascade(&self) -> impl Iterator<Item = &Enrollment> {
        self.cascade.iter().map(|(_, e)| e)
    }
}

impl<R: Parent> Command for RemoveWithCascade<R> {
    fn execute(&self, store: &mut EntityStore) {
        store.remove::<R>(self.record.record_id());
        for (_, enrollment) in &self.cascade {
            store.remove::<Enrollment>(enrollment.id());
        }
    }

    fn undo(&self, store: &mut EntityStore) {
        store.insert_at(self.position, self.record.clone());
        // ascending order: each slot is restored before any later one
        for (position, enrollment) in &self.cascade {
            store.insert_at(*position, enrollment.clone());
        }
    }

    fn label(&self) -> String {
        format!("Remove{}({})", R::KIND, self.record.record_id())
    }
}

/// Insert a batch of records, e.g. a CSV import.
#[derive(Debug, Clone)]
pub struct BulkAdd<R> {
    records: Vec<R>,
}

impl<R: Record> BulkAdd<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R: Record> Command for BulkAdd<R> {
    fn execute(&self, store: &mut EntityStore) {
        for record in &self.records {
            store.insert(record.clone());
        }
    }

    fn undo(&self, store: &mut EntityStore) {
        for record in &self.records {
            store.remove::<R>(record.record_id());
        }
    }

    fn label(&self) -> String {
        format!("BulkAdd{}s({})", R::KIND, self.records.len())
    }
}

pub type AddStudent = AddEntity<Student>;
pub type AddCourse = AddEntity<Course>;
pub type AddEnrollment = AddEntity<Enrollment>;
pub type UpdateStudent = UpdateEntity<Student>;
pub type UpdateCourse = UpdateEntity<Course>;
pub type UpdateEnrollment = UpdateEntity<Enrollment>;
pub type RemoveStudent = RemoveWithCascade<Student>;
pub type RemoveCourse = RemoveWithCascade<Course>;
pub type RemoveEnrollment = RemoveEntity<Enrollment>;
pub type BulkAddStudents = BulkAdd<Student>;
pub type BulkAddCourses = BulkAdd<Course>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use registrar_common::{EnrollmentId, Grade};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    /// Two students, two courses, three enrollments, interleaved so that the
    /// cascade positions are not contiguous.
    fn fixture() -> EntityStore {
        let mut store = EntityStore::new();
        for name in ["Aman", "Riya"] {
            let id = store.allocate_student_id().unwrap();
            store.insert(Student::new(id, name, None, None, None));
        }
        for code in ["CS101", "MA102"] {
            let id = store.allocate_course_id().unwrap();
            store.insert(Course::new(id, code, "Title", 3));
        }
        for (s, c) in [(1000, 2000), (1001, 2000), (1000, 2001)] {
            let id = store.allocate_enrollment_id().unwrap();
            store.insert(Enrollment::new(id, StudentId(s), CourseId(c), day()));
        }
        store
    }

    fn remove_student(store: &EntityStore, id: StudentId) -> RemoveStudent {
        let record = store.get::<Student>(id).unwrap().clone();
        let position = store.position::<Student>(id).unwrap();
        let cascade = store
            .enrollments()
            .iter()
            .enumerate()
            .filter(|(_, e)| Student::is_referenced_by(id, e))
            .map(|(i, e)| (i, e.clone()))
            .collect();
        RemoveStudent::new(record, position, cascade)
    }

    #[test]
    fn add_and_undo() {
        let mut store = EntityStore::new();
        let before = store.clone();
        let cmd = AddCourse::new(Course::new(CourseId(2000), "CS101", "Intro", 4));

        cmd.execute(&mut store);
        assert!(store.contains::<Course>(CourseId(2000)));
        cmd.undo(&mut store);
        assert_eq!(store, before);
        assert_eq!(cmd.label(), "AddCourse(2000)");
    }

    #[test]
    fn update_swaps_full_values() {
        let mut store = fixture();
        let id = EnrollmentId(3001);
        let before = store.get::<Enrollment>(id).unwrap().clone();
        let after = before.clone().with_grade(Some(Grade::A));
        let cmd = UpdateEnrollment::new(before.clone(), after);

        cmd.execute(&mut store);
        assert_eq!(store.get::<Enrollment>(id).unwrap().grade, Some(Grade::A));
        cmd.undo(&mut store);
        assert_eq!(store.get::<Enrollment>(id).unwrap(), &before);
        assert_eq!(cmd.label(), "UpdateEnrollment(3001)");
    }

    #[test]
    fn cascading_remove_is_atomic_and_reversible() {
        let mut store = fixture();
        let before = store.clone();
        let cmd = remove_student(&store, StudentId(1000));
        assert_eq!(cmd.cascade().count(), 2);

        cmd.execute(&mut store);
        assert!(store.get::<Student>(StudentId(1000)).is_none());
        assert_eq!(store.enrollments().len(), 1);
        assert_eq!(store.enrollments_for_student(StudentId(1000)).count(), 0);

        cmd.undo(&mut store);
        assert_eq!(store, before);
        assert_eq!(cmd.label(), "RemoveStudent(1000)");
    }

    #[test]
    fn remove_enrollment_restores_position() {
        let mut store = fixture();
        let before = store.clone();
        let id = EnrollmentId(3001);
        let cmd = RemoveEnrollment::new(
            store.get::<Enrollment>(id).unwrap().clone(),
            store.position::<Enrollment>(id).unwrap(),
        );

        cmd.execute(&mut store);
        assert_eq!(store.enrollments().len(), 2);
        cmd.undo(&mut store);
        assert_eq!(store, before);
    }

    #[test]
    fn bulk_add_label_and_undo() {
        let mut store = fixture();
        let before = store.clone();
        let cmd = BulkAddStudents::new(vec![
            Student::new(StudentId(1500), "A", None, None, None),
            Student::new(StudentId(1501), "B", None, None, None),
        ]);

        cmd.execute(&mut store);
        assert_eq!(store.students().len(), 4);
        cmd.undo(&mut store);
        assert_eq!(store, before);
        assert_eq!(cmd.label(), "BulkAddStudents(2)");
        assert_eq!(cmd.len(), 2);
    }
}
