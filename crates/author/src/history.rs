use registrar_kernel::EntityStore;

use crate::command::Command;

/// Two-stack undo/redo log.
///
/// Every submitted command lands on the undo stack. Undo moves the most
/// recent command to the redo stack; redo moves it back. Submitting a new
/// command discards the redo stack.
#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `cmd` against `store` and record it.
    pub fn submit(&mut self, store: &mut EntityStore, cmd: Box<dyn Command>) {
        cmd.execute(store);
        tracing::debug!(command = %cmd.label(), "submitted");
        self.undo_stack.push(cmd);
        self.redo_stack.clear();
    }

    /// Undo the most recent command. Returns false when there is nothing to undo.
    pub fn undo(&mut self, store: &mut EntityStore) -> bool {
        let Some(cmd) = self.undo_stack.pop() else {
            return false;
        };
        cmd.undo(store);
        tracing::debug!(command = %cmd.label(), "undone");
        self.redo_stack.push(cmd);
        true
    }

    /// Re-apply the most recently undone command. Returns false when there is nothing to redo.
    pub fn redo(&mut self, store: &mut EntityStore) -> bool {
        let Some(cmd) = self.redo_stack.pop() else {
            return false;
        };
        cmd.execute(store);
        tracing::debug!(command = %cmd.label(), "redone");
        self.undo_stack.push(cmd);
        true
    }

    /// Labels of all undoable commands, most recent first.
    pub fn labels(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|c| c.label()).collect()
    }

    /// Drop both stacks, e.g. after the store is replaced wholesale.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Number of operations on the undo stack.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of operations on the redo stack.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Whether there is a command to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether there is a command to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{AddCourse, AddStudent};
    use registrar_common::{Course, CourseId, Student, StudentId};

    fn add_student(id: u32) -> Box<dyn Command> {
        Box::new(AddStudent::new(Student::new(StudentId(id), "S", None, None, None)))
    }

    #[test]
    fn submit_and_undo() {
        let mut store = EntityStore::new();
        let mut history = History::new();

        history.submit(&mut store, add_student(1000));
        assert_eq!(store.students().len(), 1);

        assert!(history.undo(&mut store));
        assert!(store.students().is_empty());
        assert_eq!(history.redo_count(), 1);
    }

    #[test]
    fn undo_redo_roundtrip() {
        let mut store = EntityStore::new();
        let mut history = History::new();

        history.submit(&mut store, add_student(1000));
        let after = store.clone();
        history.undo(&mut store);
        assert!(history.redo(&mut store));
        assert_eq!(store, after);
    }

    #[test]
    fn redo_cleared_on_new_submit() {
        let mut store = EntityStore::new();
        let mut history = History::new();

        history.submit(&mut store, add_student(1000));
        history.undo(&mut store);
        assert!(history.can_redo());

        history.submit(&mut store, add_student(1001));
        assert!(!history.can_redo());
        assert!(!history.redo(&mut store));
    }

    #[test]
    fn undo_empty_returns_false() {
        let mut store = EntityStore::new();
        let mut history = History::new();
        assert!(!history.undo(&mut store));
    }

    #[test]
    fn redo_empty_returns_false() {
        let mut store = EntityStore::new();
        let mut history = History::new();
        assert!(!history.redo(&mut store));
    }

    #[test]
    fn labels_are_most_recent_first() {
        let mut store = EntityStore::new();
        let mut history = History::new();

        history.submit(&mut store, add_student(1000));
        history.submit(
            &mut store,
            Box::new(AddCourse::new(Course::new(CourseId(2000), "CS101", "Intro", 4))),
        );
        assert_eq!(history.labels(), vec!["AddCourse(2000)", "AddStudent(1000)"]);

        history.undo(&mut store);
        assert_eq!(history.labels(), vec!["AddStudent(1000)"]);
    }
}
