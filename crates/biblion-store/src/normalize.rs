//! Normalised lookup tables derived from populated work tables.
//!
//! Affiliation and subject names repeat across millions of work rows. These
//! passes replace them with integer ids: one name table plus link tables.
//! Ids are assigned in name order, so rebuilding from the same input gives
//! the same ids.

use crate::error::StoreError;
use crate::store::Store;

/// Table the affiliation pass reads.
pub const AUTHOR_AFFILIATIONS: &str = "author_affiliations";
/// Table the subject pass reads.
pub const WORK_SUBJECTS: &str = "work_subjects";

fn affiliation_sql() -> [&'static str; 4] {
    [
        "DROP TABLE IF EXISTS affiliation_names; \
         DROP TABLE IF EXISTS authors_affiliations; \
         DROP TABLE IF EXISTS affiliations_works",
        "CREATE TABLE affiliation_names AS \
         SELECT CAST(row_number() OVER (ORDER BY name) AS BIGINT) AS id, name \
         FROM (SELECT DISTINCT name FROM author_affiliations WHERE name IS NOT NULL)",
        "CREATE TABLE authors_affiliations AS \
         SELECT n.id AS affiliation_id, a.work_doi, a.author_seq \
         FROM author_affiliations a JOIN affiliation_names n ON a.name = n.name \
         ORDER BY a.work_doi, a.author_seq, n.id",
        "CREATE TABLE affiliations_works AS \
         SELECT DISTINCT affiliation_id, work_doi FROM authors_affiliations \
         ORDER BY affiliation_id, work_doi",
    ]
}

fn subject_sql() -> [&'static str; 3] {
    [
        "DROP TABLE IF EXISTS subject_names; DROP TABLE IF EXISTS works_subjects",
        "CREATE TABLE subject_names AS \
         SELECT CAST(row_number() OVER (ORDER BY name) AS BIGINT) AS id, name \
         FROM (SELECT DISTINCT name FROM work_subjects WHERE name IS NOT NULL)",
        "CREATE TABLE works_subjects AS \
         SELECT DISTINCT n.id AS subject_id, s.work_doi \
         FROM work_subjects s JOIN subject_names n ON s.name = n.name \
         ORDER BY subject_id, s.work_doi",
    ]
}

impl Store {
    fn rebuild(&self, input: &str, statements: &[&str]) -> Result<(), StoreError> {
        if !self.table_exists(input)? {
            return Err(StoreError::MissingTable(input.to_string()));
        }
        let mut batch = self.begin_batch()?;
        for sql in statements {
            batch.execute(sql)?;
        }
        batch.commit()
    }

    /// Build `affiliation_names`, `authors_affiliations` and
    /// `affiliations_works` from `author_affiliations`.
    ///
    /// Returns the number of distinct affiliation names.
    pub fn normalize_affiliations(&self) -> Result<u64, StoreError> {
        self.rebuild(AUTHOR_AFFILIATIONS, &affiliation_sql())?;
        self.create_index("affiliation_names", "name")?;
        self.create_index("affiliations_works", "work_doi")?;
        let names = self.row_count("affiliation_names")?;
        log::info!("Normalised {names} affiliation names");
        Ok(names)
    }

    /// Build `subject_names` and `works_subjects` from `work_subjects`.
    ///
    /// Returns the number of distinct subjects.
    pub fn normalize_subjects(&self) -> Result<u64, StoreError> {
        self.rebuild(WORK_SUBJECTS, &subject_sql())?;
        self.create_index("works_subjects", "work_doi")?;
        let names = self.row_count("subject_names")?;
        log::info!("Normalised {names} subjects");
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use biblion_core::Value;

    use super::*;

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        let mut batch = store.begin_batch().unwrap();
        batch
            .execute(
                "CREATE TABLE author_affiliations (work_doi VARCHAR, author_seq BIGINT, seq BIGINT, name VARCHAR, ror_id VARCHAR);
                 INSERT INTO author_affiliations VALUES
                   ('10.1/a', 0, 0, 'Univ B', NULL),
                   ('10.1/a', 1, 0, 'Univ A', NULL),
                   ('10.1/a', 1, 1, 'Univ B', NULL),
                   ('10.1/b', 0, 0, 'Univ B', NULL),
                   ('10.1/b', 1, 0, NULL, NULL);
                 CREATE TABLE work_subjects (work_doi VARCHAR, seq BIGINT, name VARCHAR);
                 INSERT INTO work_subjects VALUES
                   ('10.1/a', 0, 'Ceramics'), ('10.1/a', 1, 'Glass'), ('10.1/b', 0, 'Ceramics');",
            )
            .unwrap();
        batch.commit().unwrap();
        store
    }

    #[test]
    fn affiliations_get_name_ordered_ids() {
        let store = seeded();
        assert_eq!(store.normalize_affiliations().unwrap(), 2);

        let names = store.query("SELECT id, name FROM affiliation_names ORDER BY id").unwrap();
        assert_eq!(names[0], vec![Value::Integer(1), Value::text("Univ A")]);
        assert_eq!(names[1], vec![Value::Integer(2), Value::text("Univ B")]);

        assert_eq!(store.row_count("authors_affiliations").unwrap(), 4);
        let works = store
            .query("SELECT affiliation_id, work_doi FROM affiliations_works")
            .unwrap();
        assert_eq!(works.len(), 3);
    }

    #[test]
    fn subjects_and_rebuild() {
        let store = seeded();
        assert_eq!(store.normalize_subjects().unwrap(), 2);
        assert_eq!(store.normalize_subjects().unwrap(), 2);
        let rows = store
            .query("SELECT work_doi FROM works_subjects WHERE subject_id = 1 ORDER BY work_doi")
            .unwrap();
        assert_eq!(rows, vec![vec![Value::text("10.1/a")], vec![Value::text("10.1/b")]]);
    }

    #[test]
    fn missing_input_table() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.normalize_subjects(),
            Err(StoreError::MissingTable(t)) if t == "work_subjects"
        ));
    }
}
