use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};
use registrar_common::{
    Course, CourseId, Enrollment, EnrollmentId, Grade, MAX_CREDITS, MIN_CREDITS, Student,
    StudentId,
};
use registrar_kernel::{EntityStore, Record};

use crate::command::{
    AddCourse, AddEnrollment, AddStudent, BulkAdd, Command, Parent, RemoveEnrollment,
    RemoveWithCascade, UpdateCourse, UpdateEnrollment, UpdateStudent,
};
use crate::error::{RegistrarError, Result};
use crate::history::History;

/// Fields to change on a student. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Fields to change on a course. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePatch {
    pub code: Option<String>,
    pub title: Option<String>,
    pub credits: Option<u32>,
}

/// The registrar service: the only write path into the [`EntityStore`].
///
/// Every operation checks its preconditions, captures the before/after
/// values it needs, and hands a complete command to the [`History`].
#[derive(Debug, Default)]
pub struct Registrar {
    pub(crate) store: EntityStore,
    history: History,
}

impl Registrar {
    /// Wrap an existing store with an empty history.
    pub fn new(store: EntityStore) -> Self {
        Self {
            store,
            history: History::new(),
        }
    }

    /// Load the snapshot at `path`, or start empty if it is missing or unreadable.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(registrar_persist::load_or_fresh(path))
    }

    /// Read-only view of the store.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Consume the registrar, dropping its history.
    pub fn into_store(self) -> EntityStore {
        self.store
    }

    fn submit(&mut self, cmd: impl Command + 'static) {
        self.history.submit(&mut self.store, Box::new(cmd));
    }

    fn require<R: Record>(&self, id: R::Id) -> Result<&R> {
        self.store
            .get::<R>(id)
            .ok_or_else(|| RegistrarError::not_found::<R>(id))
    }

    // Students

    /// Add a student with a freshly allocated id.
    pub fn add_student(
        &mut self,
        name: &str,
        dob: Option<NaiveDate>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Student> {
        validate_required("name", name)?;
        let id = self
            .store
            .allocate_student_id()
            .ok_or_else(RegistrarError::ids_exhausted::<Student>)?;
        let student = Student::new(id, name, dob, email, phone);
        self.submit(AddStudent::new(student.clone()));
        Ok(student)
    }

    /// Look up a student by id.
    pub fn get_student(&self, id: StudentId) -> Option<&Student> {
        self.store.get(id)
    }

    /// All students in insertion order.
    pub fn students(&self) -> &[Student] {
        self.store.students().as_slice()
    }

    /// Apply a patch to a student. Fields left `None` keep their value.
    pub fn update_student(&mut self, id: StudentId, patch: StudentPatch) -> Result<Student> {
        if let Some(name) = &patch.name {
            validate_required("name", name)?;
        }
        let before = self.require::<Student>(id)?.clone();
        let mut after = before.clone();
        if let Some(name) = patch.name {
            after.name = name;
        }
        if let Some(dob) = patch.dob {
            after.dob = Some(dob);
        }
        if let Some(email) = patch.email {
            after.email = Some(email);
        }
        if let Some(phone) = patch.phone {
            after.phone = Some(phone);
        }
        self.submit(UpdateStudent::new(before, after.clone()));
        Ok(after)
    }

    /// Remove a student and every enrollment that references it.
    /// Returns the number of enrollments removed with it.
    pub fn remove_student(&mut self, id: StudentId) -> Result<usize> {
        self.remove_parent::<Student>(id)
    }

    // Courses

    /// Add a course with a freshly allocated id. Credits must be in range.
    pub fn add_course(&mut self, code: &str, title: &str, credits: u32) -> Result<Course> {
        validate_required("code", code)?;
        validate_required("title", title)?;
        validate_credits(credits)?;
        let id = self
            .store
            .allocate_course_id()
            .ok_or_else(RegistrarError::ids_exhausted::<Course>)?;
        let course = Course::new(id, code, title, credits);
        self.submit(AddCourse::new(course.clone()));
        Ok(course)
    }

    /// Look up a course by id.
    pub fn get_course(&self, id: CourseId) -> Option<&Course> {
        self.store.get(id)
    }

    /// All courses in insertion order.
    pub fn courses(&self) -> &[Course] {
        self.store.courses().as_slice()
    }

    /// Apply a patch to a course. Fields left `None` keep their value.
    pub fn update_course(&mut self, id: CourseId, patch: CoursePatch) -> Result<Course> {
        if let Some(code) = &patch.code {
            validate_required("code", code)?;
        }
        if let Some(title) = &patch.title {
            validate_required("title", title)?;
        }
        if let Some(credits) = patch.credits {
            validate_credits(credits)?;
        }
        let before = self.require::<Course>(id)?.clone();
        let mut after = before.clone();
        if let Some(code) = patch.code {
            after.code = code;
        }
        if let Some(title) = patch.title {
            after.title = title;
        }
        if let Some(credits) = patch.credits {
            after.credits = credits;
        }
        self.submit(UpdateCourse::new(before, after.clone()));
        Ok(after)
    }

    /// Remove a course and every enrollment that references it.
    /// Returns the number of enrollments removed with it.
    pub fn remove_course(&mut self, id: CourseId) -> Result<usize> {
        self.remove_parent::<Course>(id)
    }

    fn remove_parent<R: Parent + 'static>(&mut self, id: R::Id) -> Result<usize> {
        let record = self.require::<R>(id)?.clone();
        let position = self.store.position::<R>(id).unwrap_or_default();
        // read-only scan; the store is only touched inside the command
        let cascade: Vec<(usize, Enrollment)> = self
            .store
            .enrollments()
            .iter()
            .enumerate()
            .filter(|(_, e)| R::is_referenced_by(id, e))
            .map(|(i, e)| (i, e.clone()))
            .collect();
        let removed = cascade.len();
        self.submit(RemoveWithCascade::new(record, position, cascade));
        Ok(removed)
    }

    // Enrollments

    /// Enroll a student in a course, dated today.
    pub fn enroll(&mut self, student: StudentId, course: CourseId) -> Result<Enrollment> {
        self.enroll_on(student, course, Local::now().date_naive())
    }

    /// Enroll a student in a course on a given date.
    /// A second enrollment of the same pair is a conflict.
    pub fn enroll_on(
        &mut self,
        student: StudentId,
        course: CourseId,
        date: NaiveDate,
    ) -> Result<Enrollment> {
        self.require::<Student>(student)?;
        self.require::<Course>(course)?;
        if self.store.find_enrollment(student, course).is_some() {
            return Err(RegistrarError::DuplicateEnrollment { student, course });
        }
        let id = self
            .store
            .allocate_enrollment_id()
            .ok_or_else(RegistrarError::ids_exhausted::<Enrollment>)?;
        let enrollment = Enrollment::new(id, student, course, date);
        self.submit(AddEnrollment::new(enrollment.clone()));
        Ok(enrollment)
    }

    /// Look up an enrollment by id.
    pub fn get_enrollment(&self, id: EnrollmentId) -> Option<&Enrollment> {
        self.store.get(id)
    }

    /// All enrollments in insertion order.
    pub fn enrollments(&self) -> &[Enrollment] {
        self.store.enrollments().as_slice()
    }

    /// Set or replace the grade on an enrollment.
    pub fn assign_grade(&mut self, id: EnrollmentId, grade: Grade) -> Result<Enrollment> {
        let before = self.require::<Enrollment>(id)?.clone();
        let after = before.clone().with_grade(Some(grade));
        self.submit(UpdateEnrollment::new(before, after.clone()));
        Ok(after)
    }

    /// Remove one enrollment. Returns the removed record.
    pub fn drop_enrollment(&mut self, id: EnrollmentId) -> Result<Enrollment> {
        let record = self.require::<Enrollment>(id)?.clone();
        let position = self.store.position::<Enrollment>(id).unwrap_or_default();
        self.submit(RemoveEnrollment::new(record.clone(), position));
        Ok(record)
    }

    // CSV import/export

    /// Import students from CSV as a single undoable batch.
    /// Returns how many were added.
    pub fn import_students_csv(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let imported = registrar_interchange::import_students(path, self.store.student_ids_mut())?;
        self.bulk_add(imported)
    }

    /// Import courses from CSV as a single undoable batch.
    /// Returns how many were added.
    pub fn import_courses_csv(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let imported = registrar_interchange::import_courses(path, self.store.course_ids_mut())?;
        self.bulk_add(imported)
    }

    fn bulk_add<R: Record + 'static>(&mut self, records: Vec<R>) -> Result<usize> {
        let mut seen = HashSet::new();
        for record in &records {
            let id = record.record_id();
            if self.store.contains::<R>(id) || !seen.insert(id) {
                return Err(RegistrarError::Conflict {
                    reason: format!("{} #{id} already exists", R::KIND),
                });
            }
        }
        let count = records.len();
        if count > 0 {
            self.submit(BulkAdd::new(records));
        }
        Ok(count)
    }

    /// Write all students to a CSV file.
    pub fn export_students_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        registrar_interchange::export_students(self.store.students(), path)?;
        Ok(())
    }

    /// Write all courses to a CSV file.
    pub fn export_courses_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        registrar_interchange::export_courses(self.store.courses(), path)?;
        Ok(())
    }

    // Snapshots

    /// Write a snapshot of the store to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        registrar_persist::save(&self.store, path)?;
        Ok(())
    }

    /// Save a timestamped copy (`backup_<unix-millis>.dat`) into `dir`.
    pub fn backup(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir
            .as_ref()
            .join(format!("backup_{}.dat", Utc::now().timestamp_millis()));
        self.save(&path)?;
        Ok(path)
    }

    /// Replace the store with the snapshot at `path` and clear all history.
    /// On failure nothing changes.
    pub fn restore(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let store = registrar_persist::load(path)?;
        self.store = store;
        self.history.clear();
        Ok(())
    }

    // Undo/redo

    /// Undo the latest command. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.store)
    }

    /// Redo the latest undone command. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.store)
    }

    /// Labels of all undoable commands, most recent first.
    pub fn history(&self) -> Vec<String> {
        self.history.labels()
    }

    /// Whether [`undo`](Self::undo) would do anything.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether [`redo`](Self::redo) would do anything.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Populate an empty registrar with a few demo records.
    /// Returns false (and does nothing) if students or courses already exist.
    /// The demo records become the baseline: they leave no undo history.
    pub fn seed_demo(&mut self) -> Result<bool> {
        if !self.store.students().is_empty() || !self.store.courses().is_empty() {
            return Ok(false);
        }
        let s1 = self.add_student(
            "Aman Gupta",
            NaiveDate::from_ymd_opt(2004, 3, 12),
            Some("aman@example.com".into()),
            Some("9876543210".into()),
        )?;
        let s2 = self.add_student(
            "Riya Sharma",
            NaiveDate::from_ymd_opt(2003, 11, 2),
            Some("riya@example.com".into()),
            None,
        )?;
        let s3 = self.add_student(
            "Karan Mehta",
            NaiveDate::from_ymd_opt(2005, 6, 25),
            Some("karan@example.com".into()),
            Some("9811112222".into()),
        )?;
        let c1 = self.add_course("CS101", "Intro to Programming", 4)?;
        let c2 = self.add_course("MA102", "Discrete Mathematics", 3)?;
        let c3 = self.add_course("DB201", "Databases", 4)?;

        for (student, course, grade) in [
            (s1.id(), c1.id(), Some(Grade::A)),
            (s1.id(), c2.id(), Some(Grade::BPlus)),
            (s2.id(), c1.id(), Some(Grade::AMinus)),
            (s2.id(), c3.id(), Some(Grade::B)),
            (s3.id(), c3.id(), None),
        ] {
            let enrollment = self.enroll(student, course)?;
            if let Some(grade) = grade {
                self.assign_grade(enrollment.id(), grade)?;
            }
        }
        self.history.clear();
        tracing::info!("seeded demo records");
        Ok(true)
    }
}

fn validate_required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RegistrarError::validation(field, "must not be blank"));
    }
    Ok(())
}

fn validate_credits(credits: u32) -> Result<()> {
    if !(MIN_CREDITS..=MAX_CREDITS).contains(&credits) {
        return Err(RegistrarError::validation(
            "credits",
            format!("{credits} is outside {MIN_CREDITS}..={MAX_CREDITS}"),
        ));
    }
    Ok(())
}
