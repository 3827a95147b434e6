//! Integration tests for the qb module.

use crate::dialect::Dialect;
use crate::error::OrmError;
use crate::mapper::{Column, Entity, SchemaBuilder};
use crate::qb::expr::Expr;
use crate::qb::{SqlQb, delete, delete_entity, insert, insert_entity, select, update, update_entity};
use crate::value::Value;
use chrono::{DateTime, Utc};

#[derive(Debug, Default, Clone)]
struct Group {
    id: String,
}

impl Entity for Group {
    fn table() -> Option<&'static str> {
        Some("groups")
    }

    fn describe(s: &mut SchemaBuilder<Self>) {
        s.scalar(Column::new("id").primary_key(), |r| &r.id, |r| &mut r.id);
    }
}

#[derive(Debug, Default, Clone)]
struct Member {
    id: String,
    name: String,
    group: Option<Group>,
}

impl Entity for Member {
    fn table() -> Option<&'static str> {
        Some("users")
    }

    fn describe(s: &mut SchemaBuilder<Self>) {
        s.scalar(Column::new("id").primary_key(), |r| &r.id, |r| &mut r.id);
        s.scalar(Column::new("name"), |r| &r.name, |r| &mut r.name);
        s.nested(
            Column::new("group").foreign_key("group_id").primary_key(),
            |r| r.group.as_ref(),
            |r| r.group.get_or_insert_with(Default::default),
        );
    }
}

#[derive(Debug, Default, Clone)]
struct Account {
    id: Option<i64>,
    email: String,
    karma: i64,
    created_at: Option<DateTime<Utc>>,
    login_count: i64,
}

impl Entity for Account {
    fn table() -> Option<&'static str> {
        Some("accounts")
    }

    fn describe(s: &mut SchemaBuilder<Self>) {
        s.scalar(Column::new("id").primary_key().auto(), |r| &r.id, |r| &mut r.id);
        s.scalar(Column::new("email"), |r| &r.email, |r| &mut r.email);
        s.scalar(Column::new("karma").auto(), |r| &r.karma, |r| &mut r.karma);
        s.scalar(
            Column::new("created_at").immutable(),
            |r| &r.created_at,
            |r| &mut r.created_at,
        );
        s.scalar(
            Column::new("login_count").read_only(),
            |r| &r.login_count,
            |r| &mut r.login_count,
        );
    }
}

#[derive(Debug, Default)]
struct Keyless {
    note: String,
}

impl Entity for Keyless {
    fn table() -> Option<&'static str> {
        Some("notes")
    }

    fn describe(s: &mut SchemaBuilder<Self>) {
        s.scalar(Column::new("note"), |r| &r.note, |r| &mut r.note);
    }
}

fn jack() -> Member {
    Member {
        id: "007".into(),
        name: "Jack".into(),
        group: Some(Group { id: "guest".into() }),
    }
}

#[test]
fn test_select_basic() {
    let qb = select("users")
        .eq("status", "active")
        .gt("age", 18)
        .limit(10);
    assert_eq!(
        qb.to_sql(Dialect::Postgres).unwrap(),
        "SELECT * FROM users WHERE status = $1 AND age > $2 LIMIT 10"
    );
}

#[test]
fn test_entity_insert_reference_output() {
    let c = insert_entity(&jack()).unwrap().compile(Dialect::MySql).unwrap();
    assert_eq!(c.sql, "INSERT INTO users (id, name, group_id) VALUES (?, ?, ?)");
    assert_eq!(
        c.args,
        vec![Value::from("007"), Value::from("Jack"), Value::from("guest")]
    );
}

#[test]
fn test_entity_update_reference_output() {
    let c = update_entity(&jack()).unwrap().compile(Dialect::MySql).unwrap();
    assert_eq!(c.sql, "UPDATE users SET name = ? WHERE id = ? AND group_id = ?");
    assert_eq!(
        c.args,
        vec![Value::from("Jack"), Value::from("007"), Value::from("guest")]
    );
}

#[test]
fn test_entity_delete_reference_output() {
    let c = delete_entity(&jack()).unwrap().compile(Dialect::MySql).unwrap();
    assert_eq!(c.sql, "DELETE FROM users WHERE id = ? AND group_id = ?");
    assert_eq!(c.args.len(), 2);
}

#[test]
fn test_null_key_renders_is_null() {
    let member = Member {
        group: None,
        ..jack()
    };
    let sql = delete_entity(&member).unwrap().to_sql(Dialect::Postgres).unwrap();
    assert_eq!(sql, "DELETE FROM users WHERE id = $1 AND group_id IS NULL");
}

#[test]
fn test_auto_columns_skipped_only_when_null() {
    let account = Account {
        email: "a@x.io".into(),
        ..Default::default()
    };
    let sql = insert_entity(&account).unwrap().to_sql(Dialect::MySql).unwrap();
    // karma is auto but holds a zero value, which is still written
    assert_eq!(
        sql,
        "INSERT INTO accounts (email, karma, created_at, login_count) VALUES (?, ?, NULL, ?)"
    );

    let with_id = Account {
        id: Some(5),
        ..account
    };
    let sql = insert_entity(&with_id).unwrap().to_sql(Dialect::MySql).unwrap();
    assert!(sql.starts_with("INSERT INTO accounts (id, email, karma"));
}

#[test]
fn test_update_excludes_key_read_only_and_immutable() {
    let account = Account {
        id: Some(1),
        email: "a@x.io".into(),
        karma: 3,
        created_at: None,
        login_count: 9,
    };
    let c = update_entity(&account).unwrap().compile(Dialect::Postgres).unwrap();
    assert_eq!(c.sql, "UPDATE accounts SET email = $1, karma = $2 WHERE id = $3");
    assert_eq!(c.args, vec![Value::from("a@x.io"), Value::Int(3), Value::Int(1)]);
}

#[test]
fn test_update_entity_columns_subset() {
    let account = Account {
        id: Some(1),
        email: "a@x.io".into(),
        karma: 3,
        ..Default::default()
    };
    let sql = update("accounts")
        .entity_columns(&account, &["KARMA", "id", "login_count"])
        .unwrap()
        .to_sql(Dialect::MySql)
        .unwrap();
    assert_eq!(sql, "UPDATE accounts SET karma = ? WHERE id = ?");
}

#[test]
fn test_update_with_nothing_writable_fails() {
    let account = Account {
        id: Some(1),
        ..Default::default()
    };
    let err = update("accounts")
        .entity_columns(&account, &["login_count"])
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_keyless_entity_mutations_fail() {
    let note = Keyless { note: "x".into() };
    assert!(matches!(
        update_entity(&note).unwrap_err(),
        OrmError::MissingPrimaryKey(_)
    ));
    assert!(matches!(
        delete_entity(&note).unwrap_err(),
        OrmError::MissingPrimaryKey(_)
    ));
    assert!(insert_entity(&note).is_ok());
}

#[test]
fn test_complex_where_expr() {
    let expr = Expr::and([
        Some(Expr::eq("status", "active")),
        Expr::or([
            Some(Expr::eq("role", "admin")),
            Expr::and([Expr::eq("role", "user"), Expr::gt("reputation", 100)]),
        ]),
    ]);
    let qb = select("users").filter(expr);
    assert_eq!(
        qb.to_sql(Dialect::Postgres).unwrap(),
        "SELECT * FROM users WHERE status = $1 AND (role = $2 OR (role = $3 AND reputation > $4))"
    );
}

#[test]
fn test_same_builder_many_dialects() {
    let qb = select(r#""Users""#)
        .eq("id", 1)
        .order_by("-id")
        .limit(5)
        .offset(10);
    assert_eq!(
        qb.to_sql(Dialect::MySql).unwrap(),
        "SELECT * FROM `Users` WHERE id = ? ORDER BY id DESC LIMIT 5 OFFSET 10"
    );
    assert_eq!(
        qb.to_sql(Dialect::Oracle).unwrap(),
        r#"SELECT * FROM "Users" WHERE id = :1 ORDER BY id DESC OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"#
    );
}

#[test]
fn test_project_nested_entity() {
    let qb = select("users u")
        .project::<Member>("u", "")
        .project::<Group>("g", "group")
        .left_join("groups g", "g.id = u.group_id");
    assert_eq!(
        qb.to_sql(Dialect::Postgres).unwrap(),
        r#"SELECT u.id AS "id", u.name AS "name", u.group_id AS "group_id", g.id AS "group.id" FROM users u LEFT JOIN groups g ON g.id = u.group_id"#
    );
}

#[test]
fn test_insert_update_delete_basic() {
    assert_eq!(
        insert("users").set("username", "alice").to_sql(Dialect::Sqlite).unwrap(),
        "INSERT INTO users (username) VALUES (?)"
    );
    assert_eq!(
        update("users").set("status", "x").eq("id", 1).to_sql(Dialect::Postgres).unwrap(),
        "UPDATE users SET status = $1 WHERE id = $2"
    );
    assert_eq!(
        delete("users").to_sql(Dialect::Postgres).unwrap(),
        "DELETE FROM users WHERE 1=0"
    );
}
