use std::fmt;

use registrar_common::{Course, CourseId, Enrollment, EnrollmentId, Student, StudentId};

use crate::allocator::{COURSE_SEED, ENROLLMENT_SEED, IdAllocator, STUDENT_SEED};
use crate::table::Table;

/// A record kind held in its own table of the [`EntityStore`].
///
/// Lets generic code (commands, import batches) reach the right table
/// without matching on the entity kind.
pub trait Record: Clone + fmt::Debug {
    type Id: Copy + Eq + std::hash::Hash + fmt::Display + fmt::Debug + Into<u32>;

    /// Human-readable kind name, used in labels and errors.
    const KIND: &'static str;

    fn record_id(&self) -> Self::Id;
    fn table(store: &EntityStore) -> &Table<Self>;
    fn table_mut(store: &mut EntityStore) -> &mut Table<Self>;
}

impl Record for Student {
    type Id = StudentId;
    const KIND: &'static str = "Student";

    fn record_id(&self) -> StudentId {
        self.id()
    }

    fn table(store: &EntityStore) -> &Table<Self> {
        &store.students
    }

    fn table_mut(store: &mut EntityStore) -> &mut Table<Self> {
        &mut store.students
    }
}

impl Record for Course {
    type Id = CourseId;
    const KIND: &'static str = "Course";

    fn record_id(&self) -> CourseId {
        self.id()
    }

    fn table(store: &EntityStore) -> &Table<Self> {
        &store.courses
    }

    fn table_mut(store: &mut EntityStore) -> &mut Table<Self> {
        &mut store.courses
    }
}

impl Record for Enrollment {
    type Id = EnrollmentId;
    const KIND: &'static str = "Enrollment";

    fn record_id(&self) -> EnrollmentId {
        self.id()
    }

    fn table(store: &EntityStore) -> &Table<Self> {
        &store.enrollments
    }

    fn table_mut(store: &mut EntityStore) -> &mut Table<Self> {
        &mut store.enrollments
    }
}

/// The next id each allocator will issue. Persisted alongside the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextIds {
    pub student: u32,
    pub course: u32,
    pub enrollment: u32,
}

/// The authoritative registrar state: three ordered tables plus the
/// allocators for their id spaces.
///
/// All mutation goes through the service layer's commands; this type only
/// offers raw insert/remove/replace/lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStore {
    students: Table<Student>,
    courses: Table<Course>,
    enrollments: Table<Enrollment>,
    student_ids: IdAllocator<StudentId>,
    course_ids: IdAllocator<CourseId>,
    enrollment_ids: IdAllocator<EnrollmentId>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self {
            students: Table::new(),
            courses: Table::new(),
            enrollments: Table::new(),
            student_ids: IdAllocator::new(STUDENT_SEED),
            course_ids: IdAllocator::new(COURSE_SEED),
            enrollment_ids: IdAllocator::new(ENROLLMENT_SEED),
        }
    }
}

impl EntityStore {
    /// Create an empty store with freshly seeded allocators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted parts.
    ///
    /// Allocators are advanced past every id present so a damaged counter
    /// can never cause reuse.
    pub fn from_parts(
        students: Vec<Student>,
        courses: Vec<Course>,
        enrollments: Vec<Enrollment>,
        next: NextIds,
    ) -> Self {
        let mut store = Self::new();
        store.student_ids.observe(next.student.saturating_sub(1));
        store.course_ids.observe(next.course.saturating_sub(1));
        store.enrollment_ids.observe(next.enrollment.saturating_sub(1));
        for s in &students {
            store.student_ids.observe(s.id().get());
        }
        for c in &courses {
            store.course_ids.observe(c.id().get());
        }
        for e in &enrollments {
            store.enrollment_ids.observe(e.id().get());
        }
        store.students = students.into_iter().collect();
        store.courses = courses.into_iter().collect();
        store.enrollments = enrollments.into_iter().collect();
        store
    }

    /// All students in insertion order.
    pub fn students(&self) -> &Table<Student> {
        &self.students
    }

    /// All courses in insertion order.
    pub fn courses(&self) -> &Table<Course> {
        &self.courses
    }

    /// All enrollments in insertion order.
    pub fn enrollments(&self) -> &Table<Enrollment> {
        &self.enrollments
    }

    /// Whether all three tables are empty.
    pub fn is_empty(&self) -> bool {
        self.students.is_empty() && self.courses.is_empty() && self.enrollments.is_empty()
    }

    /// The next id each allocator would issue.
    pub fn next_ids(&self) -> NextIds {
        NextIds {
            student: self.student_ids.peek(),
            course: self.course_ids.peek(),
            enrollment: self.enrollment_ids.peek(),
        }
    }

    /// Student allocator, for batches that carry their own ids.
    pub fn student_ids_mut(&mut self) -> &mut IdAllocator<StudentId> {
        &mut self.student_ids
    }

    /// Course allocator, for batches that carry their own ids.
    pub fn course_ids_mut(&mut self) -> &mut IdAllocator<CourseId> {
        &mut self.course_ids
    }

    /// Issue a student id. `None` once the id space is exhausted.
    pub fn allocate_student_id(&mut self) -> Option<StudentId> {
        self.student_ids.allocate()
    }

    /// Issue a course id. `None` once the id space is exhausted.
    pub fn allocate_course_id(&mut self) -> Option<CourseId> {
        self.course_ids.allocate()
    }

    /// Issue an enrollment id. `None` once the id space is exhausted.
    pub fn allocate_enrollment_id(&mut self) -> Option<EnrollmentId> {
        self.enrollment_ids.allocate()
    }

    // Generic access by record kind.

    /// Look up a record by id.
    pub fn get<R: Record>(&self, id: R::Id) -> Option<&R> {
        R::table(self).get(id)
    }

    /// Whether a record with this id exists.
    pub fn contains<R: Record>(&self, id: R::Id) -> bool {
        R::table(self).contains(id)
    }

    /// Index of the record within its table.
    pub fn position<R: Record>(&self, id: R::Id) -> Option<usize> {
        R::table(self).position(id)
    }

    /// Append a record to the end of its table.
    pub fn insert<R: Record>(&mut self, record: R) {
        R::table_mut(self).push(record);
    }

    /// Insert a record at `index`, clamped to the table length.
    pub fn insert_at<R: Record>(&mut self, index: usize, record: R) {
        R::table_mut(self).insert_at(index, record);
    }

    /// Remove a record by id. A missing id is a no-op.
    pub fn remove<R: Record>(&mut self, id: R::Id) -> Option<R> {
        R::table_mut(self).remove(id).map(|(_, r)| r)
    }

    /// Swap in a record with the same id, keeping its position.
    /// Returns the previous value, or `None` (and does nothing) if absent.
    pub fn replace<R: Record>(&mut self, record: R) -> Option<R> {
        R::table_mut(self).replace(record)
    }

    // Referential lookups. Read-only.

    /// Enrollments of one student, in table order.
    pub fn enrollments_for_student(&self, student: StudentId) -> impl Iterator<Item = &Enrollment> {
        self.enrollments.iter().filter(move |e| e.student_id() == student)
    }

    /// Enrollments in one course, in table order.
    pub fn enrollments_for_course(&self, course: CourseId) -> impl Iterator<Item = &Enrollment> {
        self.enrollments.iter().filter(move |e| e.course_id() == course)
    }

    /// The enrollment linking `student` to `course`, if any.
    pub fn find_enrollment(&self, student: StudentId, course: CourseId) -> Option<&Enrollment> {
        self.enrollments
            .iter()
            .find(|e| e.student_id() == student && e.course_id() == course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    fn populated() -> (EntityStore, StudentId, CourseId) {
        let mut store = EntityStore::new();
        let sid = store.allocate_student_id().unwrap();
        let cid = store.allocate_course_id().unwrap();
        store.insert(Student::new(sid, "Aman Gupta", None, None, None));
        store.insert(Course::new(cid, "CS101", "Intro to Programming", 4));
        let eid = store.allocate_enrollment_id().unwrap();
        store.insert(Enrollment::new(eid, sid, cid, today()));
        (store, sid, cid)
    }

    #[test]
    fn id_spaces_start_at_their_seeds() {
        let (store, sid, cid) = populated();
        assert_eq!(sid, StudentId(1000));
        assert_eq!(cid, CourseId(2000));
        assert_eq!(store.enrollments().iter().next().unwrap().id(), EnrollmentId(3000));
    }

    #[test]
    fn generic_access_reaches_the_right_table() {
        let (mut store, sid, cid) = populated();
        assert_eq!(store.get::<Student>(sid).unwrap().name, "Aman Gupta");
        assert!(store.contains::<Course>(cid));

        let mut renamed = store.get::<Student>(sid).unwrap().clone();
        renamed.name = "Aman G.".into();
        store.replace(renamed);
        assert_eq!(store.get::<Student>(sid).unwrap().name, "Aman G.");

        assert!(store.remove::<Course>(cid).is_some());
        assert!(store.get::<Course>(cid).is_none());
        // passive container: the dangling enrollment is still there
        assert_eq!(store.enrollments().len(), 1);
    }

    #[test]
    fn referential_lookups() {
        let (store, sid, cid) = populated();
        assert_eq!(store.enrollments_for_student(sid).count(), 1);
        assert_eq!(store.enrollments_for_course(cid).count(), 1);
        assert!(store.find_enrollment(sid, cid).is_some());
        assert!(store.find_enrollment(StudentId(1), cid).is_none());
    }

    #[test]
    fn from_parts_never_reissues_present_ids() {
        let (store, _, _) = populated();
        let rebuilt = EntityStore::from_parts(
            store.students().iter().cloned().collect(),
            store.courses().iter().cloned().collect(),
            store.enrollments().iter().cloned().collect(),
            NextIds {
                student: 0,
                course: 0,
                enrollment: 0,
            },
        );
        assert_eq!(rebuilt.next_ids().student, 1001);
        assert_eq!(rebuilt.next_ids().course, 2001);
        assert_eq!(rebuilt.next_ids().enrollment, 3001);
        assert_eq!(rebuilt, store);
    }
}
