//! [`Driver`] implementation for `tokio_postgres::Client`.
//!
//! [`Value`] converts to and from PostgreSQL's binary format by delegating to the
//! `tokio-postgres` implementations of the matching Rust types.

use crate::dialect::Dialect;
use crate::driver::{Context, Driver, ExecResult, Rows};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error;
use std::future::Future;
use tokio_postgres::Client;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql_checked(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql_checked(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql_checked(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql_checked(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            Value::Text(s) => s.to_sql_checked(ty, out),
            Value::Bytes(b) => b.to_sql_checked(ty, out),
            Value::Uuid(u) => u.to_sql_checked(ty, out),
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMP => ts.naive_utc().to_sql_checked(ty, out),
                _ => ts.to_sql_checked(ty, out),
            },
            Value::Date(d) => d.to_sql_checked(ty, out),
            Value::Json(j) => j.to_sql_checked(ty, out),
        }
    }

    // Per-variant checks happen in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::BYTEA => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Type::UUID => Value::Uuid(uuid::Uuid::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::TIMESTAMP => NaiveDateTime::from_sql(ty, raw)?.into(),
            Type::DATE => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            _ if <String as FromSql>::accepts(ty) => Value::Text(String::from_sql(ty, raw)?),
            _ => return Err(format!("unsupported column type {ty}").into()),
        })
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// Run `fut` under `ctx`; on timeout or cancellation also cancel the statement on
/// the server.
async fn guarded<T>(
    client: &Client,
    ctx: &Context,
    fut: impl Future<Output = OrmResult<T>>,
) -> OrmResult<T> {
    let result = ctx.run(fut).await;
    if let Err(err @ (OrmError::Timeout(_) | OrmError::Cancelled)) = &result {
        tracing::debug!(target: "sqlgate.sql", reason = %err, "cancelling running statement");
        let token = client.cancel_token();
        tokio::spawn(async move {
            let _ = token.cancel_query(tokio_postgres::NoTls).await;
        });
    }
    result
}

impl Driver for Client {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn query(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<Rows>> + Send {
        async move {
            let params = params(args);
            let fut = async {
                let stmt = self.prepare(sql).await.map_err(OrmError::from_db_error)?;
                let rows = Client::query(self, &stmt, &params)
                    .await
                    .map_err(OrmError::from_db_error)?;
                Ok((stmt, rows))
            };
            let (stmt, rows) = guarded(self, ctx, fut).await?;

            let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
            let rows = rows
                .iter()
                .map(|row| {
                    (0..columns.len())
                        .map(|i| {
                            row.try_get::<_, Value>(i)
                                .map_err(|e| OrmError::decode(columns[i].as_str(), e.to_string()))
                        })
                        .collect::<OrmResult<Vec<_>>>()
                })
                .collect::<OrmResult<Vec<_>>>()?;
            Ok(Rows { columns, rows })
        }
    }

    fn exec(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        async move {
            let params = params(args);
            let fut = async {
                Client::execute(self, sql, &params)
                    .await
                    .map_err(OrmError::from_db_error)
            };
            let rows_affected = guarded(self, ctx, fut).await?;
            Ok(ExecResult {
                rows_affected,
                last_insert_id: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<Option<Vec<u8>>, BoxError> {
        let mut out = BytesMut::new();
        match value.to_sql_checked(ty, &mut out)? {
            IsNull::Yes => Ok(None),
            IsNull::No => Ok(Some(out.to_vec())),
        }
    }

    #[test]
    fn ints_narrow_to_column_type() {
        assert_eq!(encode(&Value::Int(7), &Type::INT4).unwrap(), Some(7i32.to_be_bytes().to_vec()));
        assert_eq!(encode(&Value::Int(7), &Type::INT8).unwrap(), Some(7i64.to_be_bytes().to_vec()));
        assert!(encode(&Value::Int(i64::MAX), &Type::INT2).is_err());
    }

    #[test]
    fn null_and_mismatches() {
        assert_eq!(encode(&Value::Null, &Type::TEXT).unwrap(), None);
        assert!(encode(&Value::from("x"), &Type::INT4).is_err());
    }

    #[test]
    fn decodes_by_column_type() {
        let raw = 42i32.to_be_bytes();
        assert_eq!(Value::from_sql(&Type::INT4, &raw).unwrap(), Value::Int(42));
        assert_eq!(Value::from_sql(&Type::TEXT, b"hi").unwrap(), Value::from("hi"));
        assert_eq!(Value::from_sql_null(&Type::TEXT).unwrap(), Value::Null);
        assert!(Value::from_sql(&Type::POINT, &[0; 16]).is_err());
    }
}
