use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::Writer;
use registrar_common::{Course, Student};

use crate::Result;

const STUDENT_HEADER: [&str; 5] = ["id", "name", "dob", "email", "phone"];
const COURSE_HEADER: [&str; 4] = ["id", "code", "title", "credits"];

/// Export students to `path`, replacing any existing file.
/// Returns the number of rows written.
pub fn export_students<'a>(
    students: impl IntoIterator<Item = &'a Student>,
    path: impl AsRef<Path>,
) -> Result<usize> {
    let path = path.as_ref();
    let count = write_students(students, File::create(path)?)?;
    tracing::info!(path = %path.display(), count, "exported students");
    Ok(count)
}

/// Export courses to `path`, replacing any existing file.
pub fn export_courses<'a>(
    courses: impl IntoIterator<Item = &'a Course>,
    path: impl AsRef<Path>,
) -> Result<usize> {
    let path = path.as_ref();
    let count = write_courses(courses, File::create(path)?)?;
    tracing::info!(path = %path.display(), count, "exported courses");
    Ok(count)
}

/// Write a header plus one row per student to `output`.
pub fn write_students<'a, W: Write>(
    students: impl IntoIterator<Item = &'a Student>,
    output: W,
) -> Result<usize> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(STUDENT_HEADER)?;
    let mut count = 0;
    for s in students {
        writer.write_record([
            s.id().to_string(),
            s.name.clone(),
            s.dob.map(|d| d.to_string()).unwrap_or_default(),
            s.email.clone().unwrap_or_default(),
            s.phone.clone().unwrap_or_default(),
        ])?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Write a header plus one row per course to `output`.
pub fn write_courses<'a, W: Write>(
    courses: impl IntoIterator<Item = &'a Course>,
    output: W,
) -> Result<usize> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(COURSE_HEADER)?;
    let mut count = 0;
    for c in courses {
        writer.write_record([
            c.id().to_string(),
            c.code.clone(),
            c.title.clone(),
            c.credits.to_string(),
        ])?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use registrar_common::{CourseId, StudentId};
    use registrar_kernel::IdAllocator;

    use crate::{read_courses, read_students};

    fn to_string(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn students_quote_only_when_needed() {
        let students = [
            Student::new(
                StudentId(1000),
                "O'Brien, T.",
                NaiveDate::from_ymd_opt(2001, 2, 3),
                Some("tob@example.com".into()),
                None,
            ),
            Student::new(StudentId(1001), "Said \"Sam\" Ali", None, None, Some("555".into())),
        ];
        let mut out = Vec::new();
        assert_eq!(write_students(&students, &mut out).unwrap(), 2);
        assert_eq!(
            to_string(out),
            "id,name,dob,email,phone\n\
             1000,\"O'Brien, T.\",2001-02-03,tob@example.com,\n\
             1001,\"Said \"\"Sam\"\" Ali\",,,555\n"
        );
    }

    #[test]
    fn written_courses_read_back_identically() {
        let courses = [
            Course::new(CourseId(2000), "CS101", "Intro, \"Part 1\"", 4),
            Course::new(CourseId(2001), "MA102", "Multi\nline", 3),
        ];
        let mut out = Vec::new();
        write_courses(&courses, &mut out).unwrap();

        let mut ids = IdAllocator::<CourseId>::new(2000);
        let back = read_courses(out.as_slice(), &mut ids).unwrap();
        assert_eq!(back, courses);
        assert_eq!(ids.peek(), 2002);
    }

    #[test]
    fn empty_table_writes_header_only() {
        let mut out = Vec::new();
        assert_eq!(write_students(std::iter::empty(), &mut out).unwrap(), 0);
        assert_eq!(to_string(out), "id,name,dob,email,phone\n");

        let mut ids = IdAllocator::<StudentId>::new(1000);
        assert!(read_students(&b"id,name,dob,email,phone\n"[..], &mut ids).unwrap().is_empty());
    }

    #[test]
    fn export_to_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("courses.csv");
        let courses = [Course::new(CourseId(2000), "DB201", "Databases", 4)];
        assert_eq!(export_courses(&courses, &path).unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "id,code,title,credits\n2000,DB201,Databases,4\n"
        );
    }
}
