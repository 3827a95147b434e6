//! Column metadata discovered from record fields.

/// Option flags attached to a column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    /// Part of the primary key; drives the WHERE clause of entity mutations.
    pub primary_key: bool,
    /// Row column holding the related record's key.
    pub foreign_key: Option<String>,
    /// Column of the related record that `foreign_key` refers to.
    pub reference_key: Option<String>,
    /// Never written by UPDATE.
    pub read_only: bool,
    /// Written on INSERT, never changed afterwards.
    pub immutable: bool,
    /// Generated by the database; omitted from INSERT while unset.
    pub auto: bool,
    /// Flatten the nested record's columns into the parent.
    pub inline: bool,
    /// With `inline`, prefix flattened names with `<column>_`.
    pub prefix: bool,
}

/// A column name plus its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub options: ColumnOptions,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: ColumnOptions::default(),
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.options.primary_key = true;
        self
    }

    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.options.foreign_key = Some(column.into());
        self
    }

    pub fn reference_key(mut self, column: impl Into<String>) -> Self {
        self.options.reference_key = Some(column.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.options.read_only = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.options.immutable = true;
        self
    }

    pub fn auto(mut self) -> Self {
        self.options.auto = true;
        self
    }

    pub fn inline(mut self) -> Self {
        self.options.inline = true;
        self
    }

    pub fn prefix(mut self) -> Self {
        self.options.prefix = true;
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.options.primary_key
    }

    /// Whether an UPDATE may place this column in SET.
    pub fn is_updatable(&self) -> bool {
        !self.options.primary_key && !self.options.read_only && !self.options.immutable
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_flags() {
        let c = Column::new("group")
            .foreign_key("group_id")
            .reference_key("id")
            .read_only();
        assert_eq!(c.options.foreign_key.as_deref(), Some("group_id"));
        assert_eq!(c.options.reference_key.as_deref(), Some("id"));
        assert!(!c.is_updatable());
    }

    #[test]
    fn key_columns_are_not_updatable() {
        assert!(!Column::new("id").primary_key().is_updatable());
        assert!(!Column::new("created_at").immutable().is_updatable());
        assert!(Column::new("name").is_updatable());
        assert!(Column::new("Name").is("name"));
    }
}
