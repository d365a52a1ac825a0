use std::fmt;

use registrar_common::{Course, CourseId, Enrollment, EnrollmentId, Student, StudentId};
use registrar_kernel::{EntityStore, NextIds};

/// Store inspector for developer tooling.
///
/// Read-only views of the store for debugging and the shell's status
/// commands.
pub struct StoreInspector;

impl StoreInspector {
    /// Produce a summary of the store.
    pub fn summary(store: &EntityStore) -> StoreSummary {
        StoreSummary {
            students: store.students().len(),
            courses: store.courses().len(),
            enrollments: store.enrollments().len(),
            graded: store.enrollments().iter().filter(|e| e.grade.is_some()).count(),
            next_ids: store.next_ids(),
        }
    }

    /// Describe one enrollment with its student's name and course code
    /// resolved.
    pub fn describe_enrollment(store: &EntityStore, id: EnrollmentId) -> Option<EnrollmentInfo> {
        let e = store.get::<Enrollment>(id)?;
        Some(EnrollmentInfo {
            id,
            student: store
                .get::<Student>(e.student_id())
                .map_or_else(|| format!("#{}", e.student_id()), |s| s.name.clone()),
            course: store
                .get::<Course>(e.course_id())
                .map_or_else(|| format!("#{}", e.course_id()), |c| c.code.clone()),
            enrolled_on: e.enrolled_on().to_string(),
            grade: e.grade.map(|g| g.label().to_string()),
        })
    }

    /// Every enrollment whose student or course is missing.
    ///
    /// The service layer keeps this empty; a non-empty report means the store
    /// was edited around it (for example a hand-built snapshot).
    pub fn dangling_references(store: &EntityStore) -> Vec<DanglingReference> {
        let mut out = Vec::new();
        for e in store.enrollments() {
            if !store.contains::<Student>(e.student_id()) {
                out.push(DanglingReference::Student {
                    enrollment: e.id(),
                    student: e.student_id(),
                });
            }
            if !store.contains::<Course>(e.course_id()) {
                out.push(DanglingReference::Course {
                    enrollment: e.id(),
                    course: e.course_id(),
                });
            }
        }
        out
    }
}

/// Summary of store state for the inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub students: usize,
    pub courses: usize,
    pub enrollments: usize,
    pub graded: usize,
    pub next_ids: NextIds,
}

impl fmt::Display for StoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store: students={} courses={} enrollments={} (graded={}) next=#{}/#{}/#{}",
            self.students,
            self.courses,
            self.enrollments,
            self.graded,
            self.next_ids.student,
            self.next_ids.course,
            self.next_ids.enrollment,
        )
    }
}

/// One enrollment with its references resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentInfo {
    pub id: EnrollmentId,
    /// Student name, or `#id` when the student is missing.
    pub student: String,
    /// Course code, or `#id` when the course is missing.
    pub course: String,
    pub enrolled_on: String,
    pub grade: Option<String>,
}

impl fmt::Display for EnrollmentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} | {} | {} (id={})",
            self.student,
            self.course,
            self.enrolled_on,
            self.grade.as_deref().unwrap_or("-"),
            self.id,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DanglingReference {
    Student {
        enrollment: EnrollmentId,
        student: StudentId,
    },
    Course {
        enrollment: EnrollmentId,
        course: CourseId,
    },
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student { enrollment, student } => {
                write!(f, "enrollment #{enrollment} references missing student #{student}")
            }
            Self::Course { enrollment, course } => {
                write!(f, "enrollment #{enrollment} references missing course #{course}")
            }
        }
    }
}
