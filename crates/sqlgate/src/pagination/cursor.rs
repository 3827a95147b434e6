//! Opaque continuation tokens.

use crate::error::{OrmError, OrmResult};
use crate::qb::{OrderColumn, SortDir};
use crate::value::Value;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Value of one ORDER BY column on the last row of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WirePosition", into = "WirePosition")]
pub struct Position {
    pub column: String,
    pub order: SortDir,
    pub value: Value,
}

/// Token form of a [`Position`]. Values JSON cannot tell apart from text or
/// arrays carry their kind in `type`.
#[derive(Serialize, Deserialize)]
struct WirePosition {
    column: String,
    order: SortDir,
    value: serde_json::Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

impl From<Position> for WirePosition {
    fn from(position: Position) -> Self {
        let kind = match position.value {
            Value::Uuid(_)
            | Value::Timestamp(_)
            | Value::Date(_)
            | Value::Bytes(_)
            | Value::Json(_) => Some(position.value.kind().to_string()),
            _ => None,
        };
        Self {
            value: position.value.to_json(),
            column: position.column,
            order: position.order,
            kind,
        }
    }
}

impl TryFrom<WirePosition> for Position {
    type Error = String;

    fn try_from(wire: WirePosition) -> Result<Self, Self::Error> {
        let text = || {
            wire.value
                .as_str()
                .ok_or_else(|| format!("value of '{}' must be a string", wire.column))
        };
        let value = match wire.kind.as_deref() {
            None => Value::from_json(wire.value.clone()),
            Some("uuid") => Value::Uuid(Uuid::parse_str(text()?).map_err(|e| e.to_string())?),
            Some("timestamp") => Value::Timestamp(
                DateTime::parse_from_rfc3339(text()?)
                    .map_err(|e| e.to_string())?
                    .with_timezone(&Utc),
            ),
            Some("date") => Value::Date(text()?.parse::<NaiveDate>().map_err(|e| e.to_string())?),
            Some("bytes") => Value::Bytes(
                serde_json::from_value(wire.value.clone()).map_err(|e| e.to_string())?,
            ),
            Some("json") => Value::Json(wire.value.clone()),
            Some(other) => return Err(format!("unknown value type '{other}'")),
        };
        Ok(Self {
            column: wire.column,
            order: wire.order,
            value,
        })
    }
}

impl Position {
    pub fn new(column: impl Into<String>, order: SortDir, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            order,
            value: value.into(),
        }
    }

    /// The ORDER BY entry this position continues.
    pub fn order_column(&self) -> OrderColumn {
        OrderColumn::new(self.column.clone(), self.order)
    }
}

/// Keyset cursor: one [`Position`] per ORDER BY column.
///
/// Tokens are unpadded base64url over the JSON array
/// `[{"column":..,"order":"asc"|"desc","value":..}]`, with a `"type"` entry for uuid,
/// timestamp, date, bytes and json values; the empty cursor is `""`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(Vec<Position>);

impl Cursor {
    pub fn new(positions: Vec<Position>) -> Self {
        Self(positions)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    pub fn push(&mut self, position: Position) {
        self.0.push(position);
    }

    pub fn encode(&self) -> OrmResult<String> {
        if self.0.is_empty() {
            return Ok(String::new());
        }
        let json = serde_json::to_vec(&self.0)
            .map_err(|e| OrmError::Cursor(format!("cannot serialize cursor: {e}")))?;
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode a token. Padded tokens are accepted too.
    pub fn decode(token: &str) -> OrmResult<Self> {
        let token = token.trim().trim_end_matches('=');
        if token.is_empty() {
            return Ok(Self::empty());
        }
        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| OrmError::Cursor(e.to_string()))?;
        let positions: Vec<Position> =
            serde_json::from_slice(&bytes).map_err(|e| OrmError::Cursor(e.to_string()))?;
        Ok(Self(positions))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode().map_err(|_| fmt::Error)?)
    }
}

impl FromStr for Cursor {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl FromIterator<Position> for Cursor {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
