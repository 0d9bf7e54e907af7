//! Zabbix JSON-RPC 2.0 envelope and record types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{QueryError, Sample};

/// `history.get` value type for numeric floats
pub const HISTORY_FLOAT: u8 = 0;
/// `history.get` value type for numeric unsigned integers
pub const HISTORY_UNSIGNED: u8 = 3;

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Value,
    pub auth: &'a str,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: String,
}

impl<T> RpcResponse<T> {
    pub fn into_result(self) -> Result<T, QueryError> {
        if let Some(error) = self.error {
            return Err(QueryError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        self.result
            .ok_or_else(|| QueryError::Malformed("response has neither result nor error".to_string()))
    }
}

/// Row of an `item.get` result
#[derive(Debug, Deserialize)]
pub struct ItemRecord {
    pub itemid: Value,
}

/// Row of a `history.get` result
#[derive(Debug, Deserialize)]
pub struct HistoryRecord {
    pub value: Value,
    pub clock: Value,
}

/// Zabbix encodes most numbers as strings; accept either form
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Item id of the first `item.get` row, if any
pub fn parse_item_id(records: &[ItemRecord]) -> Result<Option<u64>, QueryError> {
    let Some(record) = records.first() else {
        return Ok(None);
    };
    as_text(&record.itemid)
        .and_then(|s| s.parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| QueryError::Malformed(format!("invalid itemid {}", record.itemid)))
}

/// Sample of the first `history.get` row, if any
pub fn parse_sample(records: &[HistoryRecord]) -> Result<Option<Sample>, QueryError> {
    let Some(record) = records.first() else {
        return Ok(None);
    };

    let value = as_text(&record.value)
        .map(|s| s.replace(',', "."))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| QueryError::Malformed(format!("non-numeric value {}", record.value)))?;

    let clock = as_text(&record.clock)
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| QueryError::Malformed(format!("invalid clock {}", record.clock)))?;

    Ok(Some(Sample::new(value, clock)))
}
