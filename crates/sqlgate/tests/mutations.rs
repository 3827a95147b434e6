use sqlgate::{Dialect, Entity, OrmError, SqlQb, Value, qb};

#[derive(Debug, Default, Clone, Entity)]
#[orm(table = "memberships")]
struct Membership {
    #[orm(primary_key)]
    user_id: i64,
    #[orm(primary_key)]
    group_id: i64,
    role: String,
    #[orm(read_only)]
    joined_at: Option<chrono::NaiveDate>,
}

fn admin() -> Membership {
    Membership {
        user_id: 4,
        group_id: 9,
        role: "admin".into(),
        joined_at: None,
    }
}

#[test]
fn composite_key_update_per_dialect() {
    let update = qb::update_entity(&admin()).unwrap();
    let expected = [
        (Dialect::MySql, "UPDATE memberships SET role = ? WHERE user_id = ? AND group_id = ?"),
        (Dialect::Postgres, "UPDATE memberships SET role = $1 WHERE user_id = $2 AND group_id = $3"),
        (Dialect::SqlServer, "UPDATE memberships SET role = @p1 WHERE user_id = @p2 AND group_id = @p3"),
        (Dialect::Oracle, "UPDATE memberships SET role = :1 WHERE user_id = :2 AND group_id = :3"),
    ];
    for (dialect, sql) in expected {
        let c = update.compile(dialect).unwrap();
        assert_eq!(c.sql, sql, "{dialect}");
        assert_eq!(c.args, vec![Value::from("admin"), Value::Int(4), Value::Int(9)]);
    }
}

#[test]
fn delete_by_composite_key() {
    let sql = qb::delete_entity(&admin())
        .unwrap()
        .to_sql(Dialect::Sqlite)
        .unwrap();
    assert_eq!(sql, "DELETE FROM memberships WHERE user_id = ? AND group_id = ?");
}

#[test]
fn unfiltered_delete_is_a_no_op_unless_allowed() {
    assert_eq!(
        qb::delete("sessions").to_sql(Dialect::MySql).unwrap(),
        "DELETE FROM sessions WHERE 1=0"
    );
    assert_eq!(
        qb::delete("sessions")
            .allow_delete_all(true)
            .to_sql(Dialect::MySql)
            .unwrap(),
        "DELETE FROM sessions"
    );
}

#[test]
fn returning_only_where_supported() {
    let insert = qb::insert_entity(&admin()).unwrap().returning("joined_at");
    assert_eq!(
        insert.to_sql(Dialect::Postgres).unwrap(),
        "INSERT INTO memberships (user_id, group_id, role, joined_at) VALUES ($1, $2, $3, NULL) RETURNING joined_at"
    );
    for dialect in [Dialect::MySql, Dialect::SqlServer, Dialect::Oracle] {
        assert!(matches!(insert.compile(dialect), Err(OrmError::Validation(_))));
    }
}

#[test]
fn multi_row_insert() {
    let c = qb::insert("tags")
        .columns(&["name", "weight"])
        .values([Value::from("rust"), Value::Int(3)])
        .values([Value::from("sql"), Value::Null])
        .compile(Dialect::Postgres)
        .unwrap();
    assert_eq!(
        c.sql,
        "INSERT INTO tags (name, weight) VALUES ($1, $2), ($3, NULL)"
    );
    assert_eq!(c.args.len(), 3);

    let err = qb::insert("tags")
        .columns(&["name", "weight"])
        .values([Value::from("short")])
        .compile(Dialect::Postgres)
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn update_subset_by_column_name() {
    let c = qb::update("memberships")
        .entity_columns(&admin(), &["role", "joined_at"])
        .unwrap()
        .compile(Dialect::MySql)
        .unwrap();
    assert_eq!(
        c.sql,
        "UPDATE memberships SET role = ? WHERE user_id = ? AND group_id = ?"
    );
}
