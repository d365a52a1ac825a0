use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use registrar_common::{Course, CourseId, MAX_CREDITS, MIN_CREDITS, Student, StudentId};
use registrar_kernel::{IdAllocator, MAX_ID};

use crate::{InterchangeError, Result};

/// Columns a student row must have: `id,name,dob,email,phone`.
pub const STUDENT_COLUMNS: usize = 5;
/// Columns a course row must have: `id,code,title,credits`.
pub const COURSE_COLUMNS: usize = 4;
/// Credits given to a course whose credits field is not a number.
pub const DEFAULT_CREDITS: u32 = 3;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A data row that passed the shape check.
struct Row {
    line: u64,
    /// `None` when the id field is blank or not a number.
    id: Option<u32>,
    record: StringRecord,
}

impl Row {
    fn field(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or_default()
    }

    fn optional(&self, index: usize) -> Option<String> {
        Some(self.field(index)).filter(|s| !s.is_empty()).map(str::to_string)
    }

    fn required(&self, index: usize, field: &'static str) -> Result<String> {
        self.optional(index).ok_or_else(|| InterchangeError::InvalidField {
            line: self.line,
            field,
            value: String::new(),
            reason: "must not be blank".into(),
        })
    }
}

/// Import students from the CSV file at `path`.
///
/// Ids taken from the file advance `ids`; rows without a usable id are
/// assigned fresh ones from it.
pub fn import_students(path: impl AsRef<Path>, ids: &mut IdAllocator<StudentId>) -> Result<Vec<Student>> {
    let path = path.as_ref();
    let students = read_students(File::open(path)?, ids)?;
    tracing::info!(path = %path.display(), count = students.len(), "imported students");
    Ok(students)
}

/// Import courses from the CSV file at `path`.
pub fn import_courses(path: impl AsRef<Path>, ids: &mut IdAllocator<CourseId>) -> Result<Vec<Course>> {
    let path = path.as_ref();
    let courses = read_courses(File::open(path)?, ids)?;
    tracing::info!(path = %path.display(), count = courses.len(), "imported courses");
    Ok(courses)
}

/// Parse student rows from any reader. See [`import_students`].
pub fn read_students<R: Read>(input: R, ids: &mut IdAllocator<StudentId>) -> Result<Vec<Student>> {
    let rows = read_rows(input, STUDENT_COLUMNS)?;
    let mut fields = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = row.required(1, "name")?;
        let dob = row
            .optional(2)
            .map(|raw| parse_date(row.line, raw))
            .transpose()?;
        fields.push((name, dob, row.optional(3), row.optional(4)));
    }

    let assigned = resolve_ids(&rows, ids)?;
    Ok(assigned
        .into_iter()
        .zip(fields)
        .map(|(id, (name, dob, email, phone))| Student::new(id, name, dob, email, phone))
        .collect())
}

/// Parse course rows from any reader. Non-numeric credits become
/// [`DEFAULT_CREDITS`].
pub fn read_courses<R: Read>(input: R, ids: &mut IdAllocator<CourseId>) -> Result<Vec<Course>> {
    let rows = read_rows(input, COURSE_COLUMNS)?;
    let mut fields = Vec::with_capacity(rows.len());
    for row in &rows {
        let code = row.required(1, "code")?;
        let title = row.required(2, "title")?;
        let credits = parse_credits(row.line, row.field(3))?;
        fields.push((code, title, credits));
    }

    let assigned = resolve_ids(&rows, ids)?;
    Ok(assigned
        .into_iter()
        .zip(fields)
        .map(|(id, (code, title, credits))| Course::new(id, code, title, credits))
        .collect())
}

fn read_rows<R: Read>(input: R, columns: usize) -> Result<Vec<Row>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < columns {
            tracing::warn!(line, found = record.len(), expected = columns, "skipping short CSV row");
            continue;
        }
        let id = record.get(0).and_then(|raw| raw.parse::<u32>().ok());
        if let Some(raw) = id.filter(|raw| *raw > MAX_ID) {
            return Err(InterchangeError::InvalidField {
                line,
                field: "id",
                value: raw.to_string(),
                reason: format!("must not exceed {MAX_ID}"),
            });
        }
        rows.push(Row { line, id, record });
    }
    Ok(rows)
}

/// Two passes: every explicit id first advances the allocator, then rows
/// without one draw fresh ids, so a fresh id never collides with a later
/// explicit one in the same file.
fn resolve_ids<I: From<u32>>(rows: &[Row], ids: &mut IdAllocator<I>) -> Result<Vec<I>> {
    for raw in rows.iter().filter_map(|r| r.id) {
        ids.observe(raw);
    }
    rows.iter()
        .map(|r| match r.id {
            Some(raw) => Ok(I::from(raw)),
            None => ids.allocate().ok_or_else(|| InterchangeError::InvalidField {
                line: r.line,
                field: "id",
                value: r.field(0).to_string(),
                reason: "no ids left to assign".into(),
            }),
        })
        .collect()
}

fn parse_date(line: u64, raw: String) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| InterchangeError::InvalidField {
        line,
        field: "dob",
        value: raw,
        reason: e.to_string(),
    })
}

fn parse_credits(line: u64, raw: &str) -> Result<u32> {
    let Ok(value) = raw.parse::<i64>() else {
        return Ok(DEFAULT_CREDITS);
    };
    u32::try_from(value)
        .ok()
        .filter(|c| (MIN_CREDITS..=MAX_CREDITS).contains(c))
        .ok_or_else(|| InterchangeError::InvalidField {
            line,
            field: "credits",
            value: raw.to_string(),
            reason: format!("must be between {MIN_CREDITS} and {MAX_CREDITS}"),
        })
}
