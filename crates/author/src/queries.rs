//! Read-only queries over the registrar. Nothing here builds a command.

use std::cmp::Reverse;
use std::fmt;

use registrar_common::{Course, CourseId, Enrollment, Grade, Student, StudentId};

use crate::error::{RegistrarError, Result};
use crate::service::Registrar;

/// A student paired with their GPA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudentGpa<'a> {
    pub student: &'a Student,
    pub gpa: f64,
}

/// A course paired with its enrollment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoursePopularity<'a> {
    pub course: &'a Course,
    pub enrolled: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentOrder {
    Name,
    /// Oldest first; students without a date of birth sort last.
    Dob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseOrder {
    Code,
    Title,
    Credits,
}

/// One line of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    /// `None` when the course no longer exists.
    pub course_code: Option<String>,
    pub credits: u32,
    pub grade: Option<Grade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub student: Student,
    pub lines: Vec<TranscriptLine>,
    /// Credits of graded courses only, the GPA denominator.
    pub graded_credits: u32,
    pub gpa: f64,
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transcript for {} (#{})", self.student.name, self.student.id())?;
        writeln!(
            f,
            "DOB: {} | Email: {}",
            self.student
                .dob
                .map_or_else(|| "-".to_string(), |d| d.to_string()),
            self.student.email.as_deref().unwrap_or("-"),
        )?;
        for line in &self.lines {
            writeln!(
                f,
                " - {:<10} | credits={} | grade={}",
                line.course_code.as_deref().unwrap_or("?"),
                line.credits,
                line.grade.map_or("-", Grade::label),
            )?;
        }
        write!(
            f,
            "Graded Credits: {} | GPA: {:.2}",
            self.graded_credits, self.gpa
        )
    }
}

impl Registrar {
    /// Credit-weighted grade-point average.
    ///
    /// Only graded enrollments count, in both the numerator and the
    /// denominator. A student with no graded enrollments has GPA 0.0.
    pub fn gpa(&self, student: StudentId) -> f64 {
        let (points, credits) = self
            .store
            .enrollments_for_student(student)
            .filter_map(|e| {
                let grade = e.grade?;
                let credits = u64::from(self.get_course(e.course_id())?.credits);
                Some((u64::from(grade.points()) * credits, credits))
            })
            .fold((0u64, 0u64), |(p, c), (dp, dc)| {
                (p.saturating_add(dp), c.saturating_add(dc))
            });
        if credits == 0 {
            0.0
        } else {
            points as f64 / credits as f64
        }
    }

    /// Enrollments of one student, in store order.
    pub fn enrollments_for_student(&self, student: StudentId) -> Vec<&Enrollment> {
        self.store.enrollments_for_student(student).collect()
    }

    /// Enrollments in one course, in store order.
    pub fn enrollments_for_course(&self, course: CourseId) -> Vec<&Enrollment> {
        self.store.enrollments_for_course(course).collect()
    }

    /// Every course with its enrollment count, most popular first.
    /// Ties keep store order.
    pub fn course_popularity(&self) -> Vec<CoursePopularity<'_>> {
        let mut ranked: Vec<CoursePopularity<'_>> = self
            .courses()
            .iter()
            .map(|course| CoursePopularity {
                course,
                enrolled: self.store.enrollments_for_course(course.id()).count(),
            })
            .collect();
        ranked.sort_by_key(|p| Reverse(p.enrolled));
        ranked
    }

    /// The `n` students with the highest GPA. Ties keep store order.
    pub fn top_students(&self, n: usize) -> Vec<StudentGpa<'_>> {
        let mut ranked: Vec<StudentGpa<'_>> = self
            .students()
            .iter()
            .map(|student| StudentGpa {
                student,
                gpa: self.gpa(student.id()),
            })
            .collect();
        ranked.sort_by(|a, b| b.gpa.total_cmp(&a.gpa));
        ranked.truncate(n);
        ranked
    }

    /// Students whose name or email contains `needle`, case-insensitively.
    pub fn search_students(&self, needle: &str) -> Vec<&Student> {
        let needle = needle.to_lowercase();
        self.students()
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s
                        .email
                        .as_ref()
                        .is_some_and(|e| e.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Courses whose code or title contains `needle`, case-insensitively.
    pub fn search_courses(&self, needle: &str) -> Vec<&Course> {
        let needle = needle.to_lowercase();
        self.courses()
            .iter()
            .filter(|c| {
                c.code.to_lowercase().contains(&needle) || c.title.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// All students sorted by `order`. The sort is stable.
    pub fn students_sorted(&self, order: StudentOrder) -> Vec<&Student> {
        let mut list: Vec<&Student> = self.students().iter().collect();
        match order {
            StudentOrder::Name => list.sort_by(|a, b| a.name.cmp(&b.name)),
            StudentOrder::Dob => list.sort_by_key(|s| (s.dob.is_none(), s.dob)),
        }
        list
    }

    /// All courses sorted by `order`. The sort is stable.
    pub fn courses_sorted(&self, order: CourseOrder) -> Vec<&Course> {
        let mut list: Vec<&Course> = self.courses().iter().collect();
        match order {
            CourseOrder::Code => list.sort_by(|a, b| a.code.cmp(&b.code)),
            CourseOrder::Title => list.sort_by(|a, b| a.title.cmp(&b.title)),
            CourseOrder::Credits => list.sort_by_key(|c| c.credits),
        }
        list
    }

    /// Every enrollment of a student with course code, credits and grade,
    /// plus GPA and graded credits.
    pub fn transcript(&self, student: StudentId) -> Result<Transcript> {
        let record = self
            .get_student(student)
            .ok_or_else(|| RegistrarError::not_found::<Student>(student))?
            .clone();
        let lines: Vec<TranscriptLine> = self
            .store
            .enrollments_for_student(student)
            .map(|e| {
                let course = self.get_course(e.course_id());
                TranscriptLine {
                    course_code: course.map(|c| c.code.clone()),
                    credits: course.map_or(0, |c| c.credits),
                    grade: e.grade,
                }
            })
            .collect();
        let graded_credits = lines
            .iter()
            .filter(|l| l.grade.is_some())
            .map(|l| l.credits)
            .fold(0, u32::saturating_add);
        Ok(Transcript {
            gpa: self.gpa(student),
            student: record,
            lines,
            graded_credits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use registrar_common::EnrollmentId;
    use registrar_kernel::EntityStore;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    fn demo() -> Registrar {
        let mut reg = Registrar::default();
        reg.seed_demo().unwrap();
        reg
    }

    #[test]
    fn gpa_weights_by_credits() {
        let reg = demo();
        // Aman: A (10) in 4 credits, B+ (8) in 3 credits
        let expected = (10.0 * 4.0 + 8.0 * 3.0) / 7.0;
        assert!((reg.gpa(StudentId(1000)) - expected).abs() < 1e-12);
    }

    #[test]
    fn gpa_does_not_overflow_on_oversized_credits() {
        let mut store = EntityStore::new();
        store.insert(Student::new(StudentId(1000), "Big", None, None, None));
        store.insert(Course::new(CourseId(2000), "HUGE", "Unchecked", 1_000_000_000));
        store.insert(
            Enrollment::new(EnrollmentId(3000), StudentId(1000), CourseId(2000), day())
                .with_grade(Some(Grade::A)),
        );
        let reg = Registrar::new(store);
        assert_eq!(reg.gpa(StudentId(1000)), 10.0);
    }

    #[test]
    fn gpa_ignores_ungraded_credits() {
        let mut reg = Registrar::default();
        let s = reg.add_student("S", None, None, None).unwrap().id();
        let graded = reg.add_course("G1", "Graded", 3).unwrap().id();
        let ungraded = reg.add_course("U1", "Ungraded", 6).unwrap().id();
        assert_eq!(reg.gpa(s), 0.0);

        let e = reg.enroll_on(s, graded, day()).unwrap();
        reg.enroll_on(s, ungraded, day()).unwrap();
        assert_eq!(reg.gpa(s), 0.0);

        reg.assign_grade(e.id(), Grade::C).unwrap();
        assert_eq!(reg.gpa(s), 6.0);
    }

    #[test]
    fn popularity_is_descending_and_stable() {
        let reg = demo();
        let codes: Vec<(&str, usize)> = reg
            .course_popularity()
            .iter()
            .map(|p| (p.course.code.as_str(), p.enrolled))
            .collect();
        // CS101 and DB201 tie at 2; CS101 comes first in the store
        assert_eq!(codes, vec![("CS101", 2), ("DB201", 2), ("MA102", 1)]);
    }

    #[test]
    fn top_students_truncates_and_breaks_ties_by_store_order() {
        let mut reg = demo();
        let tied = reg.add_student("Zed", None, None, None).unwrap();
        let top = reg.top_students(10);
        assert_eq!(top.len(), 4);
        assert!(top.windows(2).all(|w| w[0].gpa >= w[1].gpa));
        // Karan and Zed both have 0.0; Karan was added first
        assert_eq!(top[2].student.name, "Karan Mehta");
        assert_eq!(top[3].student.id(), tied.id());

        assert_eq!(reg.top_students(1).len(), 1);
        assert!(reg.top_students(0).is_empty());
    }

    #[test]
    fn search_and_sort() {
        let mut reg = demo();
        reg.add_student("Ann", None, None, None).unwrap();

        let hits: Vec<&str> = reg.search_students("RIYA").iter().map(|s| s.name.as_str()).collect();
        assert_eq!(hits, vec!["Riya Sharma"]);
        assert_eq!(reg.search_students("example.com").len(), 3);
        assert_eq!(reg.search_courses("data").len(), 1);

        let by_dob: Vec<&str> = reg
            .students_sorted(StudentOrder::Dob)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(by_dob, vec!["Riya Sharma", "Aman Gupta", "Karan Mehta", "Ann"]);

        let by_credits: Vec<u32> = reg
            .courses_sorted(CourseOrder::Credits)
            .iter()
            .map(|c| c.credits)
            .collect();
        assert_eq!(by_credits, vec![3, 4, 4]);
        // listing never reorders the store
        assert_eq!(reg.courses()[0].code, "CS101");
    }

    #[test]
    fn transcript_lists_every_enrollment() {
        let reg = demo();
        let t = reg.transcript(StudentId(1002)).unwrap();
        assert_eq!(t.lines.len(), 1);
        assert_eq!(t.graded_credits, 0);
        assert_eq!(t.gpa, 0.0);
        assert!(t.to_string().contains("DB201"));

        assert!(reg.transcript(StudentId(1)).is_err());
    }
}
