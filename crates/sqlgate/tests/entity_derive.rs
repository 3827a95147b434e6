use chrono::{TimeZone, Utc};
use sqlgate::mapper::{self, schema};
use sqlgate::{Dialect, Entity, OrmError, Scanner, SqlQb, Value, qb};

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[orm(table = "groups")]
struct Group {
    #[orm(primary_key)]
    id: String,
    name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
struct Address {
    street: String,
    city: String,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[orm(table = "users")]
struct User {
    #[orm(primary_key)]
    id: String,
    name: String,
    #[orm(foreign_key = "group_id", reference_key = "id")]
    group: Option<Group>,
    #[orm(inline, prefix)]
    home: Address,
    #[orm(column = "created", immutable)]
    created_at: Option<chrono::DateTime<Utc>>,
    #[orm(skip)]
    scratch: Vec<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[orm(table = "categories")]
struct Category {
    #[orm(primary_key)]
    id: i64,
    title: String,
    #[orm(foreign_key = "parent_id")]
    parent: Option<Box<Category>>,
}

#[derive(Debug, Default, Entity)]
struct AuditEntry {
    #[orm(primary_key, auto)]
    id: Option<i64>,
    r#type: String,
    #[orm(read_only)]
    seen: bool,
}

fn alice() -> User {
    User {
        id: "u1".into(),
        name: "Alice".into(),
        group: Some(Group {
            id: "admins".into(),
            name: "Admins".into(),
        }),
        home: Address {
            street: "1 Main St".into(),
            city: "Oslo".into(),
        },
        created_at: None,
        scratch: vec![1, 2, 3],
    }
}

#[test]
fn derived_columns_follow_declaration_order() {
    assert_eq!(
        schema::<User>().column_names(),
        vec!["id", "name", "group_id", "home_street", "home_city", "created"]
    );
    assert_eq!(User::table(), Some("users"));
    assert_eq!(Address::table(), Some("address"));
    assert_eq!(AuditEntry::table(), Some("audit_entry"));
    assert_eq!(schema::<AuditEntry>().column_names(), vec!["id", "type", "seen"]);
}

#[test]
fn insert_reference_output() {
    let c = qb::insert_entity(&alice())
        .unwrap()
        .compile(Dialect::MySql)
        .unwrap();
    assert_eq!(
        c.sql,
        "INSERT INTO users (id, name, group_id, home_street, home_city, created) VALUES (?, ?, ?, ?, ?, NULL)"
    );
    assert_eq!(
        c.args,
        vec![
            Value::from("u1"),
            Value::from("Alice"),
            Value::from("admins"),
            Value::from("1 Main St"),
            Value::from("Oslo"),
        ]
    );
}

#[test]
fn update_skips_key_and_immutable_columns() {
    let c = qb::update_entity(&alice())
        .unwrap()
        .compile(Dialect::Postgres)
        .unwrap();
    assert_eq!(
        c.sql,
        "UPDATE users SET name = $1, group_id = $2, home_street = $3, home_city = $4 WHERE id = $5"
    );
    assert_eq!(c.args.last(), Some(&Value::from("u1")));
}

#[test]
fn auto_key_is_left_to_the_database() {
    let entry = AuditEntry {
        r#type: "login".into(),
        ..Default::default()
    };
    let sql = qb::insert_entity(&entry)
        .unwrap()
        .to_sql(Dialect::Sqlite)
        .unwrap();
    assert_eq!(sql, "INSERT INTO audit_entry (type, seen) VALUES (?, ?)");

    let sql = qb::update_entity(&AuditEntry {
        id: Some(4),
        ..entry
    })
    .unwrap()
    .to_sql(Dialect::Sqlite)
    .unwrap();
    assert_eq!(sql, "UPDATE audit_entry SET type = ? WHERE id = ?");
}

#[test]
fn extraction_skips_unknown_names() {
    let values = mapper::values(&alice(), &["name", "missing", "group_id", "home_city"]);
    assert_eq!(
        values,
        vec![Value::from("Alice"), Value::from("admins"), Value::from("Oslo")]
    );
}

#[test]
fn scan_resolves_paths_and_prefixes() {
    let columns = ["users.id", "\"name\"", "GROUP.NAME", "group_id", "home_city", "created"];
    let scanner = Scanner::<User>::new(&columns).unwrap();
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let user = scanner
        .scan(vec![
            Value::from("u2"),
            Value::from("Bob"),
            Value::from("Staff"),
            Value::from("staff"),
            Value::from("Bergen"),
            Value::Timestamp(ts),
        ])
        .unwrap();

    assert_eq!(user.id, "u2");
    assert_eq!(user.name, "Bob");
    assert_eq!(
        user.group,
        Some(Group {
            id: "staff".into(),
            name: "Staff".into()
        })
    );
    assert_eq!(user.home.city, "Bergen");
    assert_eq!(user.created_at, Some(ts));
    assert!(user.scratch.is_empty());
}

#[test]
fn null_keeps_missing_relation_empty() {
    let scanner = Scanner::<User>::new(&["id", "group_id", "group.name"]).unwrap();
    let user = scanner
        .scan(vec![Value::from("u3"), Value::Null, Value::Null])
        .unwrap();
    assert_eq!(user.group, None);
}

#[test]
fn unknown_and_mistyped_columns() {
    assert!(matches!(
        Scanner::<User>::new(&["id", "nickname"]),
        Err(OrmError::UnknownColumn(ref c)) if c == "nickname"
    ));
    let err = Scanner::<User>::new(&["name"])
        .unwrap()
        .scan(vec![Value::Int(3)])
        .unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "name"));
}

#[test]
fn self_referencing_foreign_key() {
    let child = Category {
        id: 2,
        title: "Rust".into(),
        parent: Some(Box::new(Category {
            id: 1,
            title: "Languages".into(),
            parent: None,
        })),
    };
    let c = qb::insert_entity(&child)
        .unwrap()
        .compile(Dialect::SqlServer)
        .unwrap();
    assert_eq!(
        c.sql,
        "INSERT INTO categories (id, title, parent_id) VALUES (@p1, @p2, @p3)"
    );
    assert_eq!(c.args, vec![Value::Int(2), Value::from("Rust"), Value::Int(1)]);

    let scanner = Scanner::<Category>::new(&["id", "title", "parent_id"]).unwrap();
    let rows = scanner
        .scan_all(vec![
            vec![Value::Int(1), Value::from("Languages"), Value::Null],
            vec![Value::Int(2), Value::from("Rust"), Value::Int(1)],
        ])
        .unwrap();
    assert_eq!(rows[0].parent, None);
    assert_eq!(rows[1].parent.as_ref().map(|p| p.id), Some(1));
}

#[test]
fn primary_key_lookup_through_projection() {
    let sql = qb::select("categories c")
        .project::<Category>("c", "")
        .eq("c.id", 1)
        .to_sql(Dialect::Postgres)
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT c.id AS "id", c.title AS "title", c.parent_id AS "parent_id" FROM categories c WHERE c.id = $1"#
    );
}
