//! Per-type column schemas and the registry that caches them.
//!
//! A [`Schema`] is computed once per record type from [`Entity::describe`] and
//! leaked into a process-wide registry keyed by `TypeId`. Every field carries a
//! getter and a setter working on [`Value`]s, already composed through inline and
//! foreign-key nesting, so extraction and scanning never walk types at runtime.

use super::column::Column;
use crate::error::{OrmError, OrmResult};
use crate::ident::unquote;
use crate::value::{FromValue, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, Value) -> OrmResult<()> + Send + Sync>;
type Resolver<T> = Arc<dyn Fn(&str) -> Option<Field<T>> + Send + Sync>;

/// A record type mapped to table columns.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Default, Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(primary_key)]
///     id: i64,
///     name: String,
///     #[orm(foreign_key = "group_id", reference_key = "id")]
///     group: Option<Group>,
/// }
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    /// Table the record is stored in, when it has one.
    fn table() -> Option<&'static str> {
        None
    }

    /// Register the record's columns.
    fn describe(schema: &mut SchemaBuilder<Self>);
}

/// A column of `T` with value accessors.
pub struct Field<T> {
    column: Column,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<T> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("column", &self.column).finish()
    }
}

impl<T> Field<T> {
    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn name(&self) -> &str {
        &self.column.name
    }

    /// Read the field's value from `record`.
    pub fn get(&self, record: &T) -> Value {
        (self.get)(record)
    }

    /// Write `value` into `record`, allocating empty nested holders on the way.
    pub fn set(&self, record: &mut T, value: Value) -> OrmResult<()> {
        (self.set)(record, value)
    }
}

struct Relation<T> {
    name: String,
    resolve: Resolver<T>,
}

/// Column layout of a record type.
pub struct Schema<T> {
    table: Option<&'static str>,
    type_name: &'static str,
    fields: Vec<Field<T>>,
    relations: Vec<Relation<T>>,
}

impl<T: Entity> Schema<T> {
    fn build() -> Self {
        let mut builder = SchemaBuilder {
            fields: Vec::new(),
            relations: Vec::new(),
        };
        T::describe(&mut builder);
        Self {
            table: T::table(),
            type_name: std::any::type_name::<T>(),
            fields: builder.fields,
            relations: builder.relations,
        }
    }

    pub fn table(&self) -> Option<&'static str> {
        self.table
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields in declaration order, inline records flattened.
    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.fields.iter().map(Field::column)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Field<T>> {
        self.fields.iter().filter(|f| f.column.is_primary_key())
    }

    /// Find the field receiving `name`.
    ///
    /// Quotes are ignored, matching is case-insensitive, a leading `<table>.` is
    /// dropped, and `relation.column` paths descend into nested records.
    pub fn field(&self, name: &str) -> Option<Field<T>> {
        let name = unquote(name);
        if let Some(field) = self.direct(&name) {
            return Some(field.clone());
        }

        if let Some(rest) = self.table.and_then(|table| strip_prefix_ci(&name, table)) {
            if let Some(field) = self.direct(rest) {
                return Some(field.clone());
            }
        }

        let (head, rest) = name.split_once('.')?;
        self.relations
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(head))
            .and_then(|r| (r.resolve)(rest))
    }

    fn direct(&self, name: &str) -> Option<&Field<T>> {
        self.fields.iter().find(|f| f.column.is(name))
    }

    /// Ordered values for `columns` (all columns when empty). Unknown names are skipped.
    pub fn values<S: AsRef<str>>(&self, record: &T, columns: &[S]) -> Vec<Value> {
        if columns.is_empty() {
            return self.fields.iter().map(|f| f.get(record)).collect();
        }
        columns
            .iter()
            .filter_map(|c| self.field(c.as_ref()))
            .map(|f| f.get(record))
            .collect()
    }

    /// `(column, value)` pairs for every column.
    pub fn column_values<'a>(&'a self, record: &T) -> Vec<(&'a Column, Value)> {
        self.fields
            .iter()
            .map(|f| (f.column(), f.get(record)))
            .collect()
    }
}

fn strip_prefix_ci<'a>(name: &'a str, table: &str) -> Option<&'a str> {
    let head = name.get(..table.len())?;
    if !head.eq_ignore_ascii_case(table) {
        return None;
    }
    name[table.len()..].strip_prefix('.')
}

/// Collects the fields of `T` inside [`Entity::describe`].
pub struct SchemaBuilder<T> {
    fields: Vec<Field<T>>,
    relations: Vec<Relation<T>>,
}

impl<T: Entity> SchemaBuilder<T> {
    /// Register a scalar field.
    pub fn scalar<V, G, M>(&mut self, column: Column, get: G, get_mut: M) -> &mut Self
    where
        V: Clone + Into<Value> + FromValue + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let name = column.name.clone();
        self.fields.push(Field {
            column,
            get: Arc::new(move |record: &T| get(record).clone().into()),
            set: Arc::new(move |record: &mut T, value: Value| {
                *get_mut(record) =
                    V::from_value(value).map_err(|e| OrmError::decode(&name, e.to_string()))?;
                Ok(())
            }),
        });
        self
    }

    /// Register a field holding a nested record.
    ///
    /// `get` returns `None` for an empty holder; `get_mut` must allocate one
    /// (`Option::get_or_insert_with(Default::default)`). Behaviour follows the
    /// column options:
    ///
    /// - `inline`: the nested columns are flattened into this schema, named
    ///   `<column>_<nested>` when `prefix` is also set.
    /// - `foreign_key`: the field is stored in the `foreign_key` column, whose value
    ///   is the nested record's `reference_key` column.
    ///
    /// Except for `inline`, the nested record is also reachable as `<column>.<nested>`.
    pub fn nested<E, G, M>(&mut self, column: Column, get: G, get_mut: M) -> &mut Self
    where
        E: Entity,
        G: Fn(&T) -> Option<&E> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut E + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);

        if column.options.inline {
            let inner_schema = schema::<E>();
            for inner in inner_schema.fields() {
                let name = if column.options.prefix {
                    format!("{}_{}", column.name, inner.name())
                } else {
                    inner.name().to_string()
                };
                let mut flat = inner.column.clone();
                flat.name = name;
                self.fields
                    .push(compose(flat, inner.clone(), get.clone(), get_mut.clone()));
            }
            for relation in &inner_schema.relations {
                let resolve = Arc::clone(&relation.resolve);
                let (get, get_mut) = (get.clone(), get_mut.clone());
                self.relations.push(Relation {
                    name: relation.name.clone(),
                    resolve: Arc::new(move |rest: &str| {
                        let inner = resolve(rest)?;
                        let column = inner.column.clone();
                        Some(compose(column, inner, get.clone(), get_mut.clone()))
                    }),
                });
            }
            return self;
        }

        if let Some(fk) = column.options.foreign_key.clone() {
            let reference = column
                .options
                .reference_key
                .clone()
                .unwrap_or_else(|| "id".to_string());
            let mut stored = column.clone();
            stored.name = fk;
            self.fields
                .push(foreign(stored, reference, get.clone(), get_mut.clone()));
        }

        let (get, get_mut) = (get.clone(), get_mut.clone());
        let prefix = column.name.clone();
        self.relations.push(Relation {
            name: column.name,
            resolve: Arc::new(move |rest: &str| {
                let inner = schema::<E>().field(rest)?;
                let mut path = inner.column.clone();
                path.name = format!("{prefix}.{}", inner.name());
                Some(compose(path, inner, get.clone(), get_mut.clone()))
            }),
        });
        self
    }
}

/// Lift a field of `E` into `T` through a nested holder.
fn compose<T, E, G, M>(column: Column, inner: Field<E>, get: Arc<G>, get_mut: Arc<M>) -> Field<T>
where
    T: 'static,
    E: 'static,
    G: Fn(&T) -> Option<&E> + Send + Sync + 'static,
    M: Fn(&mut T) -> &mut E + Send + Sync + 'static,
{
    let reader = inner.clone();
    let read_holder = Arc::clone(&get);
    Field {
        column,
        get: Arc::new(move |record: &T| match read_holder(record) {
            Some(nested) => reader.get(nested),
            None => Value::Null,
        }),
        set: Arc::new(move |record: &mut T, value: Value| {
            // NULL into an empty holder leaves it empty (e.g. LEFT JOIN misses).
            if value.is_null() && get(record).is_none() {
                return Ok(());
            }
            inner.set(get_mut(record), value)
        }),
    }
}

/// Field stored as the related record's key column. The related schema is
/// resolved on use so self-referencing records are allowed.
fn foreign<T, E, G, M>(column: Column, reference: String, get: Arc<G>, get_mut: Arc<M>) -> Field<T>
where
    T: 'static,
    E: Entity,
    G: Fn(&T) -> Option<&E> + Send + Sync + 'static,
    M: Fn(&mut T) -> &mut E + Send + Sync + 'static,
{
    let read_reference = reference.clone();
    let read_holder = Arc::clone(&get);
    Field {
        column,
        get: Arc::new(move |record: &T| {
            read_holder(record)
                .and_then(|nested| {
                    schema::<E>()
                        .field(&read_reference)
                        .map(|f| f.get(nested))
                })
                .unwrap_or(Value::Null)
        }),
        set: Arc::new(move |record: &mut T, value: Value| {
            if value.is_null() && get(record).is_none() {
                return Ok(());
            }
            let field = schema::<E>()
                .field(&reference)
                .ok_or_else(|| OrmError::UnknownColumn(reference.clone()))?;
            field.set(get_mut(record), value)
        }),
    }
}

type Registry = RwLock<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The cached schema of `T`, computed on first use.
pub fn schema<T: Entity>() -> &'static Schema<T> {
    let registry = REGISTRY.get_or_init(Default::default);
    let key = TypeId::of::<T>();

    let cached = registry
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .copied();
    if let Some(schema) = cached.and_then(|s| s.downcast_ref::<Schema<T>>()) {
        return schema;
    }

    // Built outside the lock: describing T may need the schemas of nested types.
    let built: &'static Schema<T> = Box::leak(Box::new(Schema::<T>::build()));
    let mut map = registry.write().unwrap_or_else(PoisonError::into_inner);
    let stored = *map
        .entry(key)
        .or_insert(built as &'static (dyn Any + Send + Sync));
    stored.downcast_ref::<Schema<T>>().unwrap_or(built)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Address {
        street: String,
        city: Option<String>,
    }

    impl Entity for Address {
        fn describe(s: &mut SchemaBuilder<Self>) {
            s.scalar(Column::new("street"), |r| &r.street, |r| &mut r.street);
            s.scalar(Column::new("city"), |r| &r.city, |r| &mut r.city);
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Group {
        id: String,
        name: String,
    }

    impl Entity for Group {
        fn table() -> Option<&'static str> {
            Some("groups")
        }

        fn describe(s: &mut SchemaBuilder<Self>) {
            s.scalar(Column::new("id").primary_key(), |r| &r.id, |r| &mut r.id);
            s.scalar(Column::new("name"), |r| &r.name, |r| &mut r.name);
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
        address: Address,
        group: Option<Group>,
    }

    impl Entity for User {
        fn table() -> Option<&'static str> {
            Some("users")
        }

        fn describe(s: &mut SchemaBuilder<Self>) {
            s.scalar(Column::new("id").primary_key(), |r| &r.id, |r| &mut r.id);
            s.scalar(Column::new("name"), |r| &r.name, |r| &mut r.name);
            s.nested(
                Column::new("address").inline().prefix(),
                |r| Some(&r.address),
                |r| &mut r.address,
            );
            s.nested(
                Column::new("group").foreign_key("group_id").reference_key("id"),
                |r| r.group.as_ref(),
                |r| r.group.get_or_insert_with(Default::default),
            );
        }
    }

    #[derive(Debug, Default)]
    struct Category {
        id: i64,
        parent: Option<Box<Category>>,
    }

    impl Entity for Category {
        fn describe(s: &mut SchemaBuilder<Self>) {
            s.scalar(Column::new("id").primary_key(), |r| &r.id, |r| &mut r.id);
            s.nested(
                Column::new("parent").foreign_key("parent_id"),
                |r| r.parent.as_deref(),
                |r| &mut **r.parent.get_or_insert_with(Default::default),
            );
        }
    }

    fn user() -> User {
        User {
            id: 7,
            name: "Jack".into(),
            address: Address {
                street: "Main".into(),
                city: None,
            },
            group: Some(Group {
                id: "guest".into(),
                name: "Guests".into(),
            }),
        }
    }

    #[test]
    fn flattens_inline_with_prefix() {
        assert_eq!(
            schema::<User>().column_names(),
            vec!["id", "name", "address_street", "address_city", "group_id"]
        );
    }

    #[test]
    fn schema_is_cached() {
        assert!(std::ptr::eq(schema::<User>(), schema::<User>()));
    }

    #[test]
    fn extracts_through_foreign_key() {
        let values = schema::<User>().values(&user(), &["group_id", "id"]);
        assert_eq!(values, vec![Value::from("guest"), Value::Int(7)]);
    }

    #[test]
    fn extraction_skips_unknown_columns() {
        let values = schema::<User>().values(&user(), &["nope", "name"]);
        assert_eq!(values, vec![Value::from("Jack")]);
    }

    #[test]
    fn lookup_strips_quotes_and_table() {
        let s = schema::<User>();
        assert!(s.field(r#""users"."NAME""#).is_some());
        assert!(s.field("group.name").is_some());
        assert!(s.field("group.missing").is_none());
    }

    #[test]
    fn set_allocates_empty_holder() {
        let s = schema::<User>();
        let mut u = User::default();
        s.field("group.name")
            .unwrap()
            .set(&mut u, Value::from("Admins"))
            .unwrap();
        assert_eq!(u.group.as_ref().map(|g| g.name.as_str()), Some("Admins"));
    }

    #[test]
    fn null_does_not_allocate() {
        let s = schema::<User>();
        let mut u = User::default();
        s.field("group_id").unwrap().set(&mut u, Value::Null).unwrap();
        assert!(u.group.is_none());
    }

    #[test]
    fn self_reference_resolves_lazily() {
        let s = schema::<Category>();
        assert_eq!(s.column_names(), vec!["id", "parent_id"]);
        let mut c = Category::default();
        s.field("parent_id").unwrap().set(&mut c, Value::Int(3)).unwrap();
        assert_eq!(c.parent.as_ref().map(|p| p.id), Some(3));
        assert_eq!(s.values(&c, &["parent_id"]), vec![Value::Int(3)]);
        assert!(s.field("parent.parent.id").is_some());
    }

    #[test]
    fn decode_error_names_column() {
        let s = schema::<User>();
        let err = s
            .field("id")
            .unwrap()
            .set(&mut User::default(), Value::from("x"))
            .unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "id"));
    }
}
