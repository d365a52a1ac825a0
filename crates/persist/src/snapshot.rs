use std::collections::HashSet;

use chrono::NaiveDate;
use registrar_common::{
    Course, CourseId, Enrollment, EnrollmentId, Grade, MAX_CREDITS, MIN_CREDITS, Student,
    StudentId,
};
use registrar_kernel::{EntityStore, NextIds};
use serde::{Deserialize, Serialize};

use crate::file::PersistError;

/// On-disk image of an [`EntityStore`]: the three tables plus the next id
/// of each allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreImage {
    pub students: Vec<StudentRow>,
    pub courses: Vec<CourseRow>,
    pub enrollments: Vec<EnrollmentRow>,
    pub next_ids: NextIdsRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRow {
    pub id: u32,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRow {
    pub id: u32,
    pub code: String,
    pub title: String,
    pub credits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRow {
    pub id: u32,
    pub student_id: u32,
    pub course_id: u32,
    pub enrolled_on: NaiveDate,
    /// Grade label (`A`, `A-`, ...), so the enum can be reordered freely.
    pub grade: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextIdsRow {
    pub student: u32,
    pub course: u32,
    pub enrollment: u32,
}

impl StoreImage {
    /// Capture the current store contents.
    pub fn capture(store: &EntityStore) -> Self {
        let next = store.next_ids();
        Self {
            students: store
                .students()
                .iter()
                .map(|s| StudentRow {
                    id: s.id().get(),
                    name: s.name.clone(),
                    dob: s.dob,
                    email: s.email.clone(),
                    phone: s.phone.clone(),
                })
                .collect(),
            courses: store
                .courses()
                .iter()
                .map(|c| CourseRow {
                    id: c.id().get(),
                    code: c.code.clone(),
                    title: c.title.clone(),
                    credits: c.credits,
                })
                .collect(),
            enrollments: store
                .enrollments()
                .iter()
                .map(|e| EnrollmentRow {
                    id: e.id().get(),
                    student_id: e.student_id().get(),
                    course_id: e.course_id().get(),
                    enrolled_on: e.enrolled_on(),
                    grade: e.grade.map(|g| g.label().to_string()),
                })
                .collect(),
            next_ids: NextIdsRow {
                student: next.student,
                course: next.course,
                enrollment: next.enrollment,
            },
        }
    }

    /// Rebuild a store from this image.
    ///
    /// Rejects images the service layer could never have produced: repeated
    /// ids, credits out of range, or enrollments whose student or course is
    /// missing.
    pub fn restore(self) -> Result<EntityStore, PersistError> {
        self.validate()?;
        let students = self
            .students
            .into_iter()
            .map(|r| Student::new(StudentId(r.id), r.name, r.dob, r.email, r.phone))
            .collect();
        let courses = self
            .courses
            .into_iter()
            .map(|r| Course::new(CourseId(r.id), r.code, r.title, r.credits))
            .collect();
        let enrollments = self
            .enrollments
            .into_iter()
            .map(|r| {
                let grade = r
                    .grade
                    .map(|label| label.parse::<Grade>())
                    .transpose()
                    .map_err(|e| PersistError::InvalidRecord(format!("enrollment {}: {e}", r.id)))?;
                Ok(Enrollment::new(
                    EnrollmentId(r.id),
                    StudentId(r.student_id),
                    CourseId(r.course_id),
                    r.enrolled_on,
                )
                .with_grade(grade))
            })
            .collect::<Result<Vec<_>, PersistError>>()?;
        Ok(EntityStore::from_parts(
            students,
            courses,
            enrollments,
            NextIds {
                student: self.next_ids.student,
                course: self.next_ids.course,
                enrollment: self.next_ids.enrollment,
            },
        ))
    }

    fn validate(&self) -> Result<(), PersistError> {
        let students = unique_ids("student", self.students.iter().map(|r| r.id))?;
        let courses = unique_ids("course", self.courses.iter().map(|r| r.id))?;
        unique_ids("enrollment", self.enrollments.iter().map(|r| r.id))?;

        if let Some(c) = self
            .courses
            .iter()
            .find(|c| !(MIN_CREDITS..=MAX_CREDITS).contains(&c.credits))
        {
            return Err(PersistError::InvalidRecord(format!(
                "course {}: credits {} outside {MIN_CREDITS}..={MAX_CREDITS}",
                c.id, c.credits
            )));
        }
        for e in &self.enrollments {
            if !students.contains(&e.student_id) {
                return Err(PersistError::InvalidRecord(format!(
                    "enrollment {}: missing student {}",
                    e.id, e.student_id
                )));
            }
            if !courses.contains(&e.course_id) {
                return Err(PersistError::InvalidRecord(format!(
                    "enrollment {}: missing course {}",
                    e.id, e.course_id
                )));
            }
        }
        Ok(())
    }
}

fn unique_ids(kind: &str, ids: impl Iterator<Item = u32>) -> Result<HashSet<u32>, PersistError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(PersistError::InvalidRecord(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(seen)
}
