//! Row allocation and scanning into records.

use super::schema::{Entity, Field, schema};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Maps rows with a fixed column list into `T`.
///
/// Every column is resolved when the scanner is created; a column with no field to
/// receive it is an error, unlike extraction where unknown names are skipped.
#[derive(Debug)]
pub struct Scanner<T> {
    columns: Vec<String>,
    fields: Vec<Field<T>>,
}

impl<T: Entity> Scanner<T> {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> OrmResult<Self> {
        let schema = schema::<T>();
        let fields = columns
            .iter()
            .map(|c| {
                schema
                    .field(c.as_ref())
                    .ok_or_else(|| OrmError::UnknownColumn(c.as_ref().to_string()))
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            fields,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Empty scan targets, one per column.
    pub fn allocate(&self) -> Vec<Value> {
        vec![Value::Null; self.fields.len()]
    }

    /// Build a record from one row.
    pub fn scan(&self, row: Vec<Value>) -> OrmResult<T> {
        let mut record = T::default();
        self.scan_into(&mut record, row)?;
        Ok(record)
    }

    /// Populate an existing record from one row.
    pub fn scan_into(&self, record: &mut T, row: Vec<Value>) -> OrmResult<()> {
        if row.len() != self.fields.len() {
            return Err(OrmError::Other(format!(
                "row has {} value(s) but {} column(s) were described",
                row.len(),
                self.fields.len()
            )));
        }
        for (field, value) in self.fields.iter().zip(row) {
            field.set(record, value)?;
        }
        Ok(())
    }

    pub fn scan_all(&self, rows: Vec<Vec<Value>>) -> OrmResult<Vec<T>> {
        rows.into_iter().map(|row| self.scan(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{Column, SchemaBuilder};

    #[derive(Debug, Default, PartialEq)]
    struct Owner {
        id: i64,
        email: Option<String>,
    }

    impl Entity for Owner {
        fn describe(s: &mut SchemaBuilder<Self>) {
            s.scalar(Column::new("id").primary_key(), |r| &r.id, |r| &mut r.id);
            s.scalar(Column::new("email"), |r| &r.email, |r| &mut r.email);
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Repo {
        id: i64,
        name: String,
        owner: Option<Owner>,
    }

    impl Entity for Repo {
        fn table() -> Option<&'static str> {
            Some("repos")
        }

        fn describe(s: &mut SchemaBuilder<Self>) {
            s.scalar(Column::new("id").primary_key(), |r| &r.id, |r| &mut r.id);
            s.scalar(Column::new("name"), |r| &r.name, |r| &mut r.name);
            s.nested(
                Column::new("owner"),
                |r| r.owner.as_ref(),
                |r| r.owner.get_or_insert_with(Default::default),
            );
        }
    }

    #[test]
    fn scans_nested_projection() {
        let scanner = Scanner::<Repo>::new(&["repos.id", "name", "owner.id", "owner.email"]).unwrap();
        assert_eq!(scanner.allocate().len(), 4);
        let repo = scanner
            .scan(vec![
                Value::Int(1),
                Value::from("sqlgate"),
                Value::Int(9),
                Value::from("o@x.io"),
            ])
            .unwrap();
        assert_eq!(
            repo,
            Repo {
                id: 1,
                name: "sqlgate".into(),
                owner: Some(Owner {
                    id: 9,
                    email: Some("o@x.io".into())
                }),
            }
        );
    }

    #[test]
    fn null_join_keeps_holder_empty() {
        let scanner = Scanner::<Repo>::new(&["id", "owner.id"]).unwrap();
        let repo = scanner.scan(vec![Value::Int(1), Value::Null]).unwrap();
        assert_eq!(repo.owner, None);
    }

    #[test]
    fn unknown_column_fails() {
        let err = Scanner::<Repo>::new(&["id", "stars"]).unwrap_err();
        assert!(matches!(err, OrmError::UnknownColumn(ref c) if c == "stars"));
    }

    #[test]
    fn width_mismatch_fails() {
        let scanner = Scanner::<Repo>::new(&["id", "name"]).unwrap();
        assert!(scanner.scan(vec![Value::Int(1)]).is_err());
    }
}
