use crate::store::Record;

/// An ordered collection of records keyed by id.
///
/// Lookups are linear scans. That is fine at interactive scale; a larger
/// deployment would add secondary indexes without changing the semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table<R> {
    rows: Vec<R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R: Record> Table<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn as_slice(&self) -> &[R] {
        &self.rows
    }

    /// Append a record at the end.
    pub fn push(&mut self, record: R) {
        self.rows.push(record);
    }

    /// Insert a record at `index`, clamped to the current length.
    pub fn insert_at(&mut self, index: usize, record: R) {
        let index = index.min(self.rows.len());
        self.rows.insert(index, record);
    }

    /// Position of the record with the given id.
    pub fn position(&self, id: R::Id) -> Option<usize> {
        self.rows.iter().position(|r| r.record_id() == id)
    }

    pub fn get(&self, id: R::Id) -> Option<&R> {
        self.rows.iter().find(|r| r.record_id() == id)
    }

    pub fn contains(&self, id: R::Id) -> bool {
        self.position(id).is_some()
    }

    /// Remove the record with the given id, returning where it was.
    /// Missing ids are a no-op.
    pub fn remove(&mut self, id: R::Id) -> Option<(usize, R)> {
        let index = self.position(id)?;
        Some((index, self.rows.remove(index)))
    }

    /// Replace the record sharing `record`'s id, keeping its position.
    /// Returns the previous value; missing ids are a no-op.
    pub fn replace(&mut self, record: R) -> Option<R> {
        let index = self.position(record.record_id())?;
        Some(std::mem::replace(&mut self.rows[index], record))
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl<R: Record> FromIterator<R> for Table<R> {
    fn from_iter<T: IntoIterator<Item = R>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registrar_common::{Course, CourseId};

    fn course(id: u32, code: &str) -> Course {
        Course::new(CourseId(id), code, "Title", 3)
    }

    #[test]
    fn replace_keeps_position() {
        let mut table: Table<Course> = [course(1, "A"), course(2, "B"), course(3, "C")]
            .into_iter()
            .collect();

        let old = table.replace(course(2, "B2")).unwrap();
        assert_eq!(old.code, "B");
        assert_eq!(table.position(CourseId(2)), Some(1));
        assert_eq!(table.get(CourseId(2)).unwrap().code, "B2");
    }

    #[test]
    fn missing_ids_are_noops() {
        let mut table: Table<Course> = [course(1, "A")].into_iter().collect();
        assert!(table.remove(CourseId(9)).is_none());
        assert!(table.replace(course(9, "Z")).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_then_insert_at_restores_order() {
        let mut table: Table<Course> = [course(1, "A"), course(2, "B"), course(3, "C")]
            .into_iter()
            .collect();
        let before = table.clone();

        let (index, removed) = table.remove(CourseId(2)).unwrap();
        assert_eq!(index, 1);
        table.insert_at(index, removed);
        assert_eq!(table, before);
    }

    #[test]
    fn insert_at_clamps_past_end() {
        let mut table = Table::new();
        table.insert_at(10, course(1, "A"));
        assert_eq!(table.position(CourseId(1)), Some(0));
    }
}
