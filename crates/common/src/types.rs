use chrono::NaiveDate;
use std::fmt;

use crate::{CourseId, EnrollmentId, Grade, StudentId};

/// Smallest credit count a course may carry.
pub const MIN_CREDITS: u32 = 1;
/// Largest credit count a course may carry.
pub const MAX_CREDITS: u32 = 6;

/// A student record. Identity is the id; every other field may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    id: StudentId,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Student {
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        dob: Option<NaiveDate>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            dob,
            email,
            phone,
        }
    }

    pub fn id(&self) -> StudentId {
        self.id
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} | {} | DOB: {} | email: {} | phone: {}",
            self.id,
            self.name,
            self.dob.map_or_else(|| "-".to_string(), |d| d.to_string()),
            self.email.as_deref().unwrap_or("-"),
            self.phone.as_deref().unwrap_or("-"),
        )
    }
}

/// A course record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    pub code: String,
    pub title: String,
    pub credits: u32,
}

impl Course {
    pub fn new(id: CourseId, code: impl Into<String>, title: impl Into<String>, credits: u32) -> Self {
        Self {
            id,
            code: code.into(),
            title: title.into(),
            credits,
        }
    }

    pub fn id(&self) -> CourseId {
        self.id
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} | {} | {} | {} credits",
            self.id, self.code, self.title, self.credits
        )
    }
}

/// Association of one student with one course.
///
/// The foreign keys and the enrollment date are fixed at creation;
/// only the grade changes over the record's life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    id: EnrollmentId,
    student_id: StudentId,
    course_id: CourseId,
    enrolled_on: NaiveDate,
    pub grade: Option<Grade>,
}

impl Enrollment {
    pub fn new(
        id: EnrollmentId,
        student_id: StudentId,
        course_id: CourseId,
        enrolled_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            student_id,
            course_id,
            enrolled_on,
            grade: None,
        }
    }

    /// Builder-style grade setter, used when rebuilding stored records.
    pub fn with_grade(mut self, grade: Option<Grade>) -> Self {
        self.grade = grade;
        self
    }

    pub fn id(&self) -> EnrollmentId {
        self.id
    }

    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn enrolled_on(&self) -> NaiveDate {
        self.enrolled_on
    }
}

impl fmt::Display for Enrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Enroll#{} | student={} | course={} | on={} | grade={}",
            self.id,
            self.student_id,
            self.course_id,
            self.enrolled_on,
            self.grade.map_or("-", Grade::label),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn student_display_uses_dashes_for_missing_fields() {
        let s = Student::new(StudentId(1000), "Riya Sharma", None, None, None);
        assert_eq!(
            s.to_string(),
            "#1000 | Riya Sharma | DOB: - | email: - | phone: -"
        );
    }

    #[test]
    fn enrollment_starts_ungraded() {
        let e = Enrollment::new(EnrollmentId(3000), StudentId(1000), CourseId(2000), date(2024, 9, 1));
        assert_eq!(e.grade, None);
        assert_eq!(e.student_id(), StudentId(1000));
        assert!(e.to_string().ends_with("grade=-"));

        let graded = e.with_grade(Some(Grade::BPlus));
        assert!(graded.to_string().ends_with("grade=B+"));
    }

    #[test]
    fn course_display() {
        let c = Course::new(CourseId(2000), "CS101", "Intro to Programming", 4);
        assert_eq!(c.to_string(), "#2000 | CS101 | Intro to Programming | 4 credits");
    }
}
