//! Line-oriented interactive shell.
//!
//! Each input line is split into words (double quotes group words) and parsed
//! with clap, so `help` and per-command usage come for free. A failing
//! command prints `error: ...` and the loop carries on.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::bail;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use registrar_author::{
    CourseOrder, CoursePatch, Registrar, RegistrarError, StudentOrder, StudentPatch,
};
use registrar_common::{Course, CourseId, EnrollmentId, Grade, Student, StudentId};
use registrar_tools::StoreInspector;

use crate::config::Config;

const PROMPT: &str = "registrar> ";

#[derive(Debug, Parser)]
#[command(name = "registrar", no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    /// Add, update, remove, list or show students
    #[command(subcommand)]
    Student(StudentCommand),
    /// Add, update, remove, list or show courses
    #[command(subcommand)]
    Course(CourseCommand),
    /// Enroll a student in a course
    Enroll {
        student: u32,
        course: u32,
        /// Enrollment date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        on: Option<NaiveDate>,
    },
    /// Assign or change the grade of an enrollment (A, A-, B+, B, C, D, E, F)
    Grade { enrollment: u32, grade: Grade },
    /// Drop an enrollment
    Drop { enrollment: u32 },
    /// List the enrollments of one student or one course
    Enrollments {
        #[arg(long, required_unless_present = "course", conflicts_with = "course")]
        student: Option<u32>,
        #[arg(long)]
        course: Option<u32>,
    },
    /// Reports: course popularity, top students, transcripts
    #[command(subcommand)]
    Report(ReportCommand),
    /// Import students or courses from CSV
    #[command(subcommand)]
    Import(Transfer),
    /// Export students or courses to CSV
    #[command(subcommand)]
    Export(Transfer),
    /// Save a snapshot (to the data file unless a path is given)
    Save { path: Option<PathBuf> },
    /// Write a timestamped snapshot into the backup directory
    Backup,
    /// Replace everything with a snapshot; clears undo history
    Restore { path: PathBuf },
    /// Undo the last change
    Undo,
    /// Redo the last undone change
    Redo,
    /// Show undoable changes, most recent first
    History,
    /// List every student, course and enrollment
    List,
    /// Store summary and reference check
    Stats,
    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

#[derive(Debug, Subcommand)]
enum StudentCommand {
    Add {
        name: String,
        #[arg(long)]
        dob: Option<NaiveDate>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Change only the fields given
    Update {
        id: u32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dob: Option<NaiveDate>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Remove a student and all of their enrollments
    Remove { id: u32 },
    List {
        #[arg(long, value_enum, conflicts_with = "search")]
        sort: Option<StudentSort>,
        /// Case-insensitive match on name or email
        #[arg(long)]
        search: Option<String>,
    },
    Show { id: u32 },
}

#[derive(Debug, Subcommand)]
enum CourseCommand {
    Add {
        code: String,
        title: String,
        credits: u32,
    },
    /// Change only the fields given
    Update {
        id: u32,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        credits: Option<u32>,
    },
    /// Remove a course and all of its enrollments
    Remove { id: u32 },
    List {
        #[arg(long, value_enum, conflicts_with = "search")]
        sort: Option<CourseSort>,
        /// Case-insensitive match on code or title
        #[arg(long)]
        search: Option<String>,
    },
    Show { id: u32 },
}

#[derive(Debug, Subcommand)]
enum ReportCommand {
    /// Courses by enrollment count
    Popularity,
    /// Students with the highest GPA
    Top {
        #[arg(default_value_t = 3)]
        n: usize,
    },
    Transcript { student: u32 },
}

#[derive(Debug, Subcommand)]
enum Transfer {
    Students { path: PathBuf },
    Courses { path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StudentSort {
    Name,
    Dob,
}

impl From<StudentSort> for StudentOrder {
    fn from(sort: StudentSort) -> Self {
        match sort {
            StudentSort::Name => StudentOrder::Name,
            StudentSort::Dob => StudentOrder::Dob,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CourseSort {
    Code,
    Title,
    Credits,
}

impl From<CourseSort> for CourseOrder {
    fn from(sort: CourseSort) -> Self {
        match sort {
            CourseSort::Code => CourseOrder::Code,
            CourseSort::Title => CourseOrder::Title,
            CourseSort::Credits => CourseOrder::Credits,
        }
    }
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell {
    registrar: Registrar,
    config: Config,
}

impl Shell {
    pub fn new(registrar: Registrar, config: Config) -> Self {
        Self { registrar, config }
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// Read commands until `exit` or end of input, then save if configured.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        writeln!(out, "Course registrar. Type 'help' for commands.")?;
        write!(out, "{PROMPT}")?;
        out.flush()?;
        for line in input.lines() {
            let line = line?;
            match self.execute(&line, out) {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(out, "error: {e:#}")?,
            }
            write!(out, "{PROMPT}")?;
            out.flush()?;
        }
        writeln!(out)?;
        self.finish(out)
    }

    fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if !self.config.save_on_exit {
            return Ok(());
        }
        match self.registrar.save(&self.config.data_file) {
            Ok(()) => writeln!(out, "Saved to {}", self.config.data_file.display()),
            Err(e) => writeln!(out, "error: {e}"),
        }
    }

    /// Run one input line.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let words = tokenize(line)?;
        if words.is_empty() {
            return Ok(Flow::Continue);
        }
        match Line::try_parse_from(words) {
            Ok(parsed) => self.dispatch(parsed.command, out),
            Err(e) => {
                // help output, or a usage error already prefixed with "error:"
                write!(out, "{e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch<W: Write>(&mut self, command: ShellCommand, out: &mut W) -> anyhow::Result<Flow> {
        match command {
            ShellCommand::Student(cmd) => self.student(cmd, out)?,
            ShellCommand::Course(cmd) => self.course(cmd, out)?,
            ShellCommand::Enroll { student, course, on } => {
                let (student, course) = (StudentId(student), CourseId(course));
                let enrollment = match on {
                    Some(date) => self.registrar.enroll_on(student, course, date)?,
                    None => self.registrar.enroll(student, course)?,
                };
                self.describe(enrollment.id(), "Enrolled", out)?;
            }
            ShellCommand::Grade { enrollment, grade } => {
                let enrollment = self.registrar.assign_grade(EnrollmentId(enrollment), grade)?;
                self.describe(enrollment.id(), "Graded", out)?;
            }
            ShellCommand::Drop { enrollment } => {
                let dropped = self.registrar.drop_enrollment(EnrollmentId(enrollment))?;
                writeln!(out, "Dropped: {dropped}")?;
            }
            ShellCommand::Enrollments { student, course } => {
                let list = match (student, course) {
                    (Some(id), _) => self.registrar.enrollments_for_student(StudentId(id)),
                    (None, Some(id)) => self.registrar.enrollments_for_course(CourseId(id)),
                    (None, None) => bail!("give --student or --course"),
                };
                let ids: Vec<EnrollmentId> = list.iter().map(|e| e.id()).collect();
                if ids.is_empty() {
                    writeln!(out, "(no enrollments)")?;
                }
                for id in ids {
                    self.describe(id, " -", out)?;
                }
            }
            ShellCommand::Report(cmd) => self.report(cmd, out)?,
            ShellCommand::Import(Transfer::Students { path }) => {
                let n = self.registrar.import_students_csv(&path)?;
                writeln!(out, "Imported {n} students from {}", path.display())?;
            }
            ShellCommand::Import(Transfer::Courses { path }) => {
                let n = self.registrar.import_courses_csv(&path)?;
                writeln!(out, "Imported {n} courses from {}", path.display())?;
            }
            ShellCommand::Export(Transfer::Students { path }) => {
                self.registrar.export_students_csv(&path)?;
                writeln!(out, "Exported students to {}", path.display())?;
            }
            ShellCommand::Export(Transfer::Courses { path }) => {
                self.registrar.export_courses_csv(&path)?;
                writeln!(out, "Exported courses to {}", path.display())?;
            }
            ShellCommand::Save { path } => {
                let path = path.unwrap_or_else(|| self.config.data_file.clone());
                self.registrar.save(&path)?;
                writeln!(out, "Saved to {}", path.display())?;
            }
            ShellCommand::Backup => {
                let path = self.registrar.backup(&self.config.backup_dir)?;
                writeln!(out, "Backup written to {}", path.display())?;
            }
            ShellCommand::Restore { path } => {
                self.registrar.restore(&path)?;
                writeln!(out, "Restored from {}", path.display())?;
            }
            ShellCommand::Undo => {
                let msg = if self.registrar.undo() { "Undone." } else { "Nothing to undo." };
                writeln!(out, "{msg}")?;
            }
            ShellCommand::Redo => {
                let msg = if self.registrar.redo() { "Redone." } else { "Nothing to redo." };
                writeln!(out, "{msg}")?;
            }
            ShellCommand::History => {
                let labels = self.registrar.history();
                if labels.is_empty() {
                    writeln!(out, "(no history)")?;
                }
                for (i, label) in labels.iter().enumerate() {
                    writeln!(out, "{:>3}. {label}", i + 1)?;
                }
            }
            ShellCommand::List => {
                writeln!(out, "Students:")?;
                print_all(self.registrar.students(), out)?;
                writeln!(out, "Courses:")?;
                print_all(self.registrar.courses(), out)?;
                writeln!(out, "Enrollments:")?;
                print_all(self.registrar.enrollments(), out)?;
            }
            ShellCommand::Stats => {
                let store = self.registrar.store();
                writeln!(out, "{}", StoreInspector::summary(store))?;
                for dangling in StoreInspector::dangling_references(store) {
                    writeln!(out, "warning: {dangling}")?;
                }
            }
            ShellCommand::Exit => {
                writeln!(out, "Bye.")?;
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    fn student<W: Write>(&mut self, cmd: StudentCommand, out: &mut W) -> anyhow::Result<()> {
        match cmd {
            StudentCommand::Add {
                name,
                dob,
                email,
                phone,
            } => {
                let student = self.registrar.add_student(&name, dob, email, phone)?;
                writeln!(out, "Added: {student}")?;
            }
            StudentCommand::Update {
                id,
                name,
                dob,
                email,
                phone,
            } => {
                let patch = StudentPatch {
                    name,
                    dob,
                    email,
                    phone,
                };
                let student = self.registrar.update_student(StudentId(id), patch)?;
                writeln!(out, "Updated: {student}")?;
            }
            StudentCommand::Remove { id } => {
                let cascaded = self.registrar.remove_student(StudentId(id))?;
                writeln!(out, "Removed student #{id} and {cascaded} enrollment(s)")?;
            }
            StudentCommand::List { sort, search } => {
                let list: Vec<&Student> = match (sort, search) {
                    (_, Some(needle)) => self.registrar.search_students(&needle),
                    (Some(sort), None) => self.registrar.students_sorted(sort.into()),
                    (None, None) => self.registrar.students().iter().collect(),
                };
                print_all(list, out)?;
            }
            StudentCommand::Show { id } => {
                let id = StudentId(id);
                let student = self
                    .registrar
                    .get_student(id)
                    .ok_or_else(|| RegistrarError::not_found::<Student>(id))?;
                writeln!(out, "{student}")?;
                writeln!(out, "GPA: {:.2}", self.registrar.gpa(id))?;
                let ids: Vec<EnrollmentId> = self
                    .registrar
                    .enrollments_for_student(id)
                    .iter()
                    .map(|e| e.id())
                    .collect();
                for e in ids {
                    self.describe(e, " -", out)?;
                }
            }
        }
        Ok(())
    }

    fn course<W: Write>(&mut self, cmd: CourseCommand, out: &mut W) -> anyhow::Result<()> {
        match cmd {
            CourseCommand::Add {
                code,
                title,
                credits,
            } => {
                let course = self.registrar.add_course(&code, &title, credits)?;
                writeln!(out, "Added: {course}")?;
            }
            CourseCommand::Update {
                id,
                code,
                title,
                credits,
            } => {
                let patch = CoursePatch {
                    code,
                    title,
                    credits,
                };
                let course = self.registrar.update_course(CourseId(id), patch)?;
                writeln!(out, "Updated: {course}")?;
            }
            CourseCommand::Remove { id } => {
                let cascaded = self.registrar.remove_course(CourseId(id))?;
                writeln!(out, "Removed course #{id} and {cascaded} enrollment(s)")?;
            }
            CourseCommand::List { sort, search } => {
                let list: Vec<&Course> = match (sort, search) {
                    (_, Some(needle)) => self.registrar.search_courses(&needle),
                    (Some(sort), None) => self.registrar.courses_sorted(sort.into()),
                    (None, None) => self.registrar.courses().iter().collect(),
                };
                print_all(list, out)?;
            }
            CourseCommand::Show { id } => {
                let id = CourseId(id);
                let course = self
                    .registrar
                    .get_course(id)
                    .ok_or_else(|| RegistrarError::not_found::<Course>(id))?;
                writeln!(out, "{course}")?;
                writeln!(
                    out,
                    "Enrolled: {}",
                    self.registrar.enrollments_for_course(id).len()
                )?;
            }
        }
        Ok(())
    }

    fn report<W: Write>(&self, cmd: ReportCommand, out: &mut W) -> anyhow::Result<()> {
        match cmd {
            ReportCommand::Popularity => {
                for p in self.registrar.course_popularity() {
                    writeln!(
                        out,
                        "{} | {} | enrolled={}",
                        p.course.code, p.course.title, p.enrolled
                    )?;
                }
            }
            ReportCommand::Top { n } => {
                for (rank, entry) in self.registrar.top_students(n).iter().enumerate() {
                    writeln!(
                        out,
                        "{}. {} (#{}) GPA: {:.2}",
                        rank + 1,
                        entry.student.name,
                        entry.student.id(),
                        entry.gpa
                    )?;
                }
            }
            ReportCommand::Transcript { student } => {
                let transcript = self.registrar.transcript(StudentId(student))?;
                writeln!(out, "{transcript}")?;
            }
        }
        Ok(())
    }

    fn describe<W: Write>(&self, id: EnrollmentId, prefix: &str, out: &mut W) -> io::Result<()> {
        match StoreInspector::describe_enrollment(self.registrar.store(), id) {
            Some(info) => writeln!(out, "{prefix} {info}"),
            None => writeln!(out, "{prefix} #{id}"),
        }
    }
}

fn print_all<T: std::fmt::Display, W: Write>(
    items: impl IntoIterator<Item = T>,
    out: &mut W,
) -> io::Result<()> {
    let mut any = false;
    for item in items {
        writeln!(out, "  {item}")?;
        any = true;
    }
    if !any {
        writeln!(out, "  (none)")?;
    }
    Ok(())
}

/// Split a line into words. Whitespace separates words; a double-quoted run
/// (which may be empty) is part of one word.
pub fn tokenize(line: &str) -> anyhow::Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        bail!("unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> (Shell, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            data_file: tmp.path().join("university.dat"),
            backup_dir: tmp.path().to_path_buf(),
            seed_demo: false,
            save_on_exit: false,
        };
        (Shell::new(Registrar::default(), config), tmp)
    }

    fn run(shell: &mut Shell, script: &str) -> String {
        let mut out = Vec::new();
        shell.run(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn tokenize_groups_quoted_words() {
        assert_eq!(
            tokenize(r#"student add "O'Brien, T."  --email a@b.c"#).unwrap(),
            vec!["student", "add", "O'Brien, T.", "--email", "a@b.c"]
        );
        assert_eq!(tokenize(r#"x "" y"#).unwrap(), vec!["x", "", "y"]);
        assert_eq!(tokenize(r#"pre"fix suf"fix"#).unwrap(), vec!["prefix suffix"]);
        assert!(tokenize("   ").unwrap().is_empty());
        assert!(tokenize(r#"student add "oops"#).is_err());
    }

    #[test]
    fn grade_and_undo_through_the_shell() {
        let (mut sh, _tmp) = shell();
        let out = run(
            &mut sh,
            "student add \"Aman Gupta\" --dob 2004-03-12\n\
             course add CS101 \"Intro to Programming\" 4\n\
             enroll 1000 2000 --on 2024-09-01\n\
             grade 3000 B\n\
             report transcript 1000\n\
             undo\n\
             report transcript 1000\n",
        );
        assert!(out.contains("Added: #1000 | Aman Gupta | DOB: 2004-03-12"), "{out}");
        assert!(out.contains("Added: #2000 | CS101 | Intro to Programming | 4 credits"));
        assert!(out.contains("Enrolled Aman Gupta -> CS101 | 2024-09-01 | - (id=3000)"));
        assert!(out.contains("Graded Aman Gupta -> CS101 | 2024-09-01 | B (id=3000)"));
        assert!(out.contains("GPA: 7.00"));
        assert!(out.contains("Undone."));
        assert!(out.contains("GPA: 0.00"));
    }

    #[test]
    fn errors_do_not_stop_the_loop() {
        let (mut sh, _tmp) = shell();
        let out = run(
            &mut sh,
            "student remove 42\n\
             bogus\n\
             course add X Y 9\n\
             student add \"unterminated\n\
             grade 3000 Q\n\
             student add Ann\n",
        );
        assert!(out.contains("error: Student #42 not found"), "{out}");
        assert!(out.contains("error: unrecognized subcommand 'bogus'"));
        assert!(out.contains("error: invalid credits: 9 is outside 1..=6"));
        assert!(out.contains("error: unterminated quote"));
        assert!(out.contains("error: invalid value 'Q'"));
        assert!(out.contains("Added: #1000 | Ann"));
        assert_eq!(sh.registrar().students().len(), 1);
    }

    #[test]
    fn help_lists_commands() {
        let (mut sh, _tmp) = shell();
        let out = run(&mut sh, "help\nstudent --help\n");
        assert!(out.contains("enroll"));
        assert!(out.contains("transcript") || out.contains("report"));
        assert!(out.contains("update"));
    }

    #[test]
    fn exit_stops_reading_and_saves() {
        let (mut sh, tmp) = shell();
        sh.config.save_on_exit = true;
        let out = run(&mut sh, "student add Ann\nquit\nstudent add Bob\n");
        assert!(out.contains("Bye."));
        assert!(out.contains("Saved to"));

        let reopened = Registrar::open(tmp.path().join("university.dat"));
        assert_eq!(reopened.students().len(), 1);
        assert_eq!(reopened.students()[0].name, "Ann");
    }

    #[test]
    fn end_of_input_without_save() {
        let (mut sh, tmp) = shell();
        run(&mut sh, "student add Ann\n");
        assert!(!tmp.path().join("university.dat").exists());
    }

    #[test]
    fn history_redo_and_listing() {
        let (mut sh, _tmp) = shell();
        let out = run(
            &mut sh,
            "student add Zoe\nstudent add Adam\nhistory\nundo\nredo\nredo\nstudent list --sort name\n",
        );
        assert!(out.contains("  1. AddStudent(1001)\n  2. AddStudent(1000)"), "{out}");
        assert!(out.contains("Redone."));
        assert!(out.contains("Nothing to redo."));
        let adam = out.rfind("#1001 | Adam").unwrap();
        let zoe = out.rfind("#1000 | Zoe").unwrap();
        assert!(adam < zoe);
    }

    #[test]
    fn cascade_remove_and_enrollment_listing() {
        let (mut sh, _tmp) = shell();
        let out = run(
            &mut sh,
            "student add Ann\ncourse add CS101 Intro 3\ncourse add MA102 Maths 3\n\
             enroll 1000 2000\nenroll 1000 2001\nenroll 1000 2000\n\
             enrollments --course 2000\nstudent remove 1000\nenrollments --student 1000\nstats\n",
        );
        assert!(out.contains("error: student #1000 is already enrolled in course #2000"), "{out}");
        assert!(out.contains("Removed student #1000 and 2 enrollment(s)"));
        assert!(out.contains("(no enrollments)"));
        assert!(out.contains("students=0 courses=2 enrollments=0"));
    }

    #[test]
    fn csv_and_snapshot_commands() {
        let (mut sh, tmp) = shell();
        let csv = tmp.path().join("courses.csv");
        let snap = tmp.path().join("copy.dat");
        let script = format!(
            "course add CS101 \"Intro, Part 1\" 4\n\
             export courses {csv}\n\
             save {snap}\n\
             course remove 2000\n\
             import courses {csv}\n\
             course remove 2000\n\
             restore {snap}\n\
             backup\n\
             course list\n",
            csv = csv.display(),
            snap = snap.display(),
        );
        let out = run(&mut sh, &script);
        assert!(out.contains("Imported 1 courses"), "{out}");
        assert!(out.contains("Restored from"));
        assert!(out.contains("Backup written to"));
        assert!(out.contains("#2000 | CS101 | Intro, Part 1 | 4 credits"));
        assert!(!sh.registrar().can_undo());
    }
}
