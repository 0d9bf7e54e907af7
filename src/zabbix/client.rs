use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::rpc::{
    parse_item_id, parse_sample, HistoryRecord, ItemRecord, RpcRequest, RpcResponse,
    HISTORY_FLOAT, HISTORY_UNSIGNED,
};
use crate::backend::{MetricBackend, QueryError, Sample};
use crate::config::ZabbixSettings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Zabbix JSON-RPC API
#[derive(Debug)]
pub struct ZabbixClient {
    http_client: reqwest::Client,
    url: String,
    api_token: String,
    next_request_id: AtomicU64,
}

impl ZabbixClient {
    pub fn new(settings: &ZabbixSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            url: settings.url.clone(),
            api_token: settings.api_token.clone(),
            next_request_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call and unwrap its result
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, QueryError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            auth: &self.api_token,
            id: self.next_request_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(QueryError::Status(response.status().as_u16()));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))?;

        envelope.into_result()
    }

    async fn latest_of_type(&self, item_id: u64, history: u8) -> Result<Option<Sample>, QueryError> {
        let params = json!({
            "output": "extend",
            "history": history,
            "itemids": [item_id],
            "sortfield": "clock",
            "sortorder": "DESC",
            "limit": 1,
        });
        let records: Vec<HistoryRecord> = self.call("history.get", params).await?;
        parse_sample(&records)
    }
}

#[async_trait]
impl MetricBackend for ZabbixClient {
    fn name(&self) -> &str {
        "Zabbix"
    }

    async fn resolve_id(&self, host: &str, key: &str) -> Result<Option<u64>, QueryError> {
        let params = json!({
            "output": ["itemid"],
            "filter": { "host": host },
            "search": { "key_": key },
            "limit": 1,
        });
        let records: Vec<ItemRecord> = self.call("item.get", params).await?;
        parse_item_id(&records)
    }

    /// Looks in float history first, then unsigned
    async fn fetch_latest(&self, item_id: u64) -> Result<Option<Sample>, QueryError> {
        if let Some(sample) = self.latest_of_type(item_id, HISTORY_FLOAT).await? {
            return Ok(Some(sample));
        }
        self.latest_of_type(item_id, HISTORY_UNSIGNED).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;

    use crate::testing::spawn_http;

    type Calls = Arc<Mutex<Vec<Value>>>;

    /// Fake Zabbix: item 100 has float history, item 200 only unsigned, item 300 nothing
    async fn fake_zabbix(State(calls): State<Calls>, Json(req): Json<Value>) -> Json<Value> {
        calls.lock().push(req.clone());
        let id = req["id"].clone();

        if req["auth"] != "token" {
            return Json(json!({
                "jsonrpc": "2.0",
                "error": { "code": -32602, "message": "Invalid params.", "data": "Not authorised." },
                "id": id
            }));
        }

        let result = match req["method"].as_str() {
            Some("item.get") if req["params"]["filter"]["host"] == "db01" => {
                json!([{ "itemid": "100" }])
            }
            Some("item.get") => json!([]),
            Some("history.get") => {
                let item = req["params"]["itemids"][0].as_u64();
                let history = req["params"]["history"].as_u64();
                match (item, history) {
                    (Some(100), Some(0)) => json!([{ "itemid": "100", "clock": "1720771200", "value": "91.5" }]),
                    (Some(200), Some(3)) => json!([{ "itemid": "200", "clock": "1720771260", "value": "7" }]),
                    _ => json!([]),
                }
            }
            _ => json!([]),
        };

        Json(json!({ "jsonrpc": "2.0", "result": result, "id": id }))
    }

    async fn broken() -> StatusCode {
        StatusCode::BAD_GATEWAY
    }

    async fn client_for(token: &str) -> (ZabbixClient, Calls, String) {
        let calls: Calls = Arc::default();
        let app = Router::new()
            .route("/api_jsonrpc.php", post(fake_zabbix))
            .route("/broken", post(broken))
            .with_state(Arc::clone(&calls));
        let base = spawn_http(app).await;

        let settings = ZabbixSettings {
            url: format!("{}/api_jsonrpc.php", base),
            api_token: token.to_string(),
        };
        (ZabbixClient::new(&settings).unwrap(), calls, base)
    }

    #[tokio::test]
    async fn test_resolve_id() {
        let (client, calls, _) = client_for("token").await;

        assert_eq!(client.resolve_id("db01", "system.cpu.load").await.unwrap(), Some(100));
        assert_eq!(client.resolve_id("db99", "system.cpu.load").await.unwrap(), None);

        let calls = calls.lock();
        assert_eq!(calls[0]["jsonrpc"], "2.0");
        assert_eq!(calls[0]["method"], "item.get");
        assert_eq!(calls[0]["params"]["search"]["key_"], "system.cpu.load");
        assert_ne!(calls[0]["id"], calls[1]["id"]);
    }

    #[tokio::test]
    async fn test_fetch_latest_falls_back_to_unsigned() {
        let (client, calls, _) = client_for("token").await;

        let float = tokio_test::assert_ok!(client.fetch_latest(100).await);
        assert_eq!(float, Some(Sample::new(91.5, 1_720_771_200)));
        assert_eq!(calls.lock().len(), 1);

        let unsigned = tokio_test::assert_ok!(client.fetch_latest(200).await);
        assert_eq!(unsigned, Some(Sample::new(7.0, 1_720_771_260)));
        assert_eq!(calls.lock().len(), 3);

        let missing = tokio_test::assert_ok!(client.fetch_latest(300).await);
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_rpc_error_is_query_error() {
        let (client, _, _) = client_for("wrong").await;
        let err = client.fetch_latest(100).await.unwrap_err();
        assert!(matches!(err, QueryError::Rpc { code: -32602, .. }));
    }

    #[tokio::test]
    async fn test_http_status_is_query_error() {
        let (_, _, base) = client_for("token").await;
        let settings = ZabbixSettings {
            url: format!("{}/broken", base),
            api_token: "token".to_string(),
        };
        let client = ZabbixClient::new(&settings).unwrap();

        let err = client.fetch_latest(100).await.unwrap_err();
        assert!(matches!(err, QueryError::Status(502)));
    }
}
