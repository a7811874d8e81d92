use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::api::{
    AccountingRecord, AccountingSummary, CashFlowDetail, CashFlowQueryCriteria, CashFlowSummary,
    ErrorResponse, EventRecord, ExportFormat, LifecycleProgress, OperationGuide, PagedResult,
    PaginationParams, PaymentInfo, PaymentProgress, TransactionDetail, TransactionQueryCriteria,
    TransactionSummary,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, FALLBACK_ERROR_MESSAGE};
use crate::token::{FileTokenStore, TokenStore};

/// Fixed timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// HTTP client for the settlement API.
///
/// Every request carries JSON content headers, a fresh request id and, when
/// one is stored, `Authorization: Bearer <token>`. Successful responses are
/// decoded straight into the caller's type. Failures are logged and returned
/// as [`ClientError`] with the backend's message when it sent one.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

/// File returned by an export endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Name suggested by `Content-Disposition`, if any
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

pub struct ApiClientBuilder {
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    timeout: Duration,
    system_proxy: bool,
}

impl ApiClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ignore proxy settings from the environment.
    pub fn no_proxy(mut self) -> Self {
        self.system_proxy = false;
        self
    }

    pub fn build(self) -> ClientResult<ApiClient> {
        let mut base_url = self.base_url;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut http = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers);
        if !self.system_proxy {
            http = http.no_proxy();
        }

        Ok(ApiClient {
            http: http.build()?,
            base_url,
            tokens: self.tokens,
        })
    }
}

impl ApiClient {
    pub fn builder(base_url: Url, tokens: Arc<dyn TokenStore>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url,
            tokens,
            timeout: DEFAULT_TIMEOUT,
            system_proxy: true,
        }
    }

    pub fn new(base_url: Url, tokens: Arc<dyn TokenStore>) -> ClientResult<Self> {
        Self::builder(base_url, tokens).build()
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let tokens = Arc::new(FileTokenStore::new(&config.token_file));
        Self::new(config.api_base_url.clone(), tokens)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // ========================================================================
    // Generic requests
    // ========================================================================

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.http.get(self.url(path)?);
        self.fetch(request).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.http.get(self.url(path)?).query(query);
        self.fetch(request).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.http.post(self.url(path)?).json(body);
        self.fetch(request).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.http.put(self.url(path)?).json(body);
        self.fetch(request).await
    }

    /// Deletes a resource; any response body is discarded.
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let request = self.http.delete(self.url(path)?);
        self.execute(request).await.map(|_| ())
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    pub async fn list_transactions(
        &self,
        pagination: &PaginationParams,
    ) -> ClientResult<PagedResult<TransactionSummary>> {
        self.search_transactions(&TransactionQueryCriteria::default(), pagination)
            .await
    }

    pub async fn search_transactions(
        &self,
        criteria: &TransactionQueryCriteria,
        pagination: &PaginationParams,
    ) -> ClientResult<PagedResult<TransactionSummary>> {
        validate(criteria)?;
        validate(pagination)?;
        let mut query = criteria.to_query();
        query.extend(pagination.to_query());
        self.get_with_query("transactions", &query).await
    }

    /// Event history, keyed by external id like the detail lookup.
    pub async fn transaction_events(
        &self,
        external_id: &str,
        pagination: &PaginationParams,
    ) -> ClientResult<PagedResult<EventRecord>> {
        validate(pagination)?;
        self.get_segments_with_query(
            &["transactions", external_id, "events"],
            &page_query(pagination),
        )
        .await
    }

    pub async fn payment_info(&self, transaction_id: &str) -> ClientResult<PaymentInfo> {
        self.get_segments(&["transactions", transaction_id, "payment-info"])
            .await
    }

    pub async fn accounting_records(
        &self,
        transaction_id: &str,
        pagination: &PaginationParams,
    ) -> ClientResult<PagedResult<AccountingRecord>> {
        validate(pagination)?;
        self.get_segments_with_query(
            &["transactions", transaction_id, "accounting-records"],
            &page_query(pagination),
        )
        .await
    }

    pub async fn accounting_summary(&self, transaction_id: &str) -> ClientResult<AccountingSummary> {
        self.get_segments(&["transactions", transaction_id, "accounting-summary"])
            .await
    }

    pub async fn transaction(&self, external_id: &str) -> ClientResult<TransactionDetail> {
        self.get_segments(&["transactions", external_id]).await
    }

    pub async fn transaction_progress(
        &self,
        transaction_id: &str,
    ) -> ClientResult<LifecycleProgress> {
        self.get_segments(&["transactions", transaction_id, "progress"])
            .await
    }

    pub async fn transaction_operation_guide(
        &self,
        transaction_id: &str,
    ) -> ClientResult<OperationGuide> {
        self.get_segments(&["transactions", transaction_id, "operation-guide"])
            .await
    }

    // ========================================================================
    // Cash flows
    // ========================================================================

    pub async fn list_cash_flows(
        &self,
        pagination: &PaginationParams,
    ) -> ClientResult<PagedResult<CashFlowSummary>> {
        self.search_cash_flows(&CashFlowQueryCriteria::default(), pagination)
            .await
    }

    pub async fn search_cash_flows(
        &self,
        criteria: &CashFlowQueryCriteria,
        pagination: &PaginationParams,
    ) -> ClientResult<PagedResult<CashFlowSummary>> {
        validate(criteria)?;
        validate(pagination)?;
        let mut query = criteria.to_query();
        query.extend(pagination.to_query());
        self.get_with_query("cash-flows", &query).await
    }

    pub async fn cash_flow(&self, cash_flow_id: &str) -> ClientResult<CashFlowDetail> {
        self.get_segments(&["cash-flows", cash_flow_id]).await
    }

    pub async fn cash_flow_progress(&self, cash_flow_id: &str) -> ClientResult<PaymentProgress> {
        self.get_segments(&["cash-flows", cash_flow_id, "progress"])
            .await
    }

    pub async fn cash_flow_operation_guide(
        &self,
        cash_flow_id: &str,
    ) -> ClientResult<OperationGuide> {
        self.get_segments(&["cash-flows", cash_flow_id, "operation-guide"])
            .await
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Downloads matching transactions. An empty `fields` exports every
    /// column.
    pub async fn export_transactions(
        &self,
        format: ExportFormat,
        criteria: &TransactionQueryCriteria,
        fields: &[&str],
    ) -> ClientResult<ExportedFile> {
        validate(criteria)?;
        let mut query = vec![("format", format.as_str().to_string())];
        query.extend(criteria.to_query());
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }
        self.download(&["export", "transactions"], format, &query)
            .await
    }

    pub async fn export_cash_flows(
        &self,
        format: ExportFormat,
        criteria: &CashFlowQueryCriteria,
    ) -> ClientResult<ExportedFile> {
        validate(criteria)?;
        let mut query = vec![("format", format.as_str().to_string())];
        query.extend(criteria.to_query());
        self.download(&["export", "cash-flows"], format, &query)
            .await
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    async fn get_segments<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let request = self.http.get(self.endpoint(segments)?);
        self.fetch(request).await
    }

    async fn get_segments_with_query<T, Q>(&self, segments: &[&str], query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.http.get(self.endpoint(segments)?).query(query);
        self.fetch(request).await
    }

    async fn download(
        &self,
        segments: &[&str],
        format: ExportFormat,
        query: &[(&str, String)],
    ) -> ClientResult<ExportedFile> {
        let request = self
            .http
            .get(self.endpoint(segments)?)
            .header(ACCEPT, format.media_type())
            .query(query);
        let response = self.execute(request).await?;

        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v: &HeaderValue| v.to_str().ok())
                .map(str::to_string)
        };
        let filename = header(CONTENT_DISPOSITION).and_then(|v| attachment_filename(&v));
        let content_type = header(CONTENT_TYPE);

        let content = response.bytes().await.map_err(|e| report(e.into()))?;
        Ok(ExportedFile {
            filename,
            content_type,
            content: content.to_vec(),
        })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.endpoint(&segments)
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Stores may touch the filesystem, so the lookup runs on the blocking pool.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let tokens = Arc::clone(&self.tokens);
        let token = tokio::task::spawn_blocking(move || tokens.token())
            .await
            .unwrap_or_else(|e| Err(io::Error::new(io::ErrorKind::Other, e)));

        match token {
            Ok(Some(token)) => request.bearer_auth(token),
            Ok(None) => request,
            Err(e) => {
                tracing::warn!("Failed to read stored token, sending without it: {}", e);
                request
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = self.execute(request).await?;
        let body = response.bytes().await.map_err(|e| report(e.into()))?;
        serde_json::from_slice(&body).map_err(|e| report(e.into()))
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<Response> {
        let request = self
            .authorize(request)
            .await
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());

        let response = request.send().await.map_err(|e| report(e.into()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let error_body = serde_json::from_slice::<ErrorResponse>(&body).ok();
        let message = error_body
            .as_ref()
            .map(|b| b.message_or(FALLBACK_ERROR_MESSAGE))
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());

        Err(report(ClientError::Api {
            status: status.as_u16(),
            code: error_body.and_then(|b| b.code),
            message,
        }))
    }
}

fn validate<V: Validate>(params: &V) -> ClientResult<()> {
    params
        .validate()
        .map_err(|e| ClientError::InvalidRequest(e.to_string()))
}

/// Sub-resource lists take only `page` and `page_size`.
fn page_query(pagination: &PaginationParams) -> [(&'static str, u32); 2] {
    [("page", pagination.page), ("page_size", pagination.page_size)]
}

/// Extracts `filename` from a `Content-Disposition` value.
fn attachment_filename(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

fn report(err: ClientError) -> ClientError {
    match &err {
        ClientError::Api { status, .. } => tracing::error!(status, "API error: {}", err),
        _ => tracing::error!("API error: {}", err),
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;
    use axum::extract::Query;
    use axum::http::{header, HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{delete, get};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use shared::api::{CurrencyTotals, PaginationMeta};
    use shared::models::{CashFlowStatus, DebitCreditIndicator, Direction, TransactionStatus};
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    type Captured = Arc<Mutex<Vec<(String, String)>>>;

    /// Route that records its query pairs and answers with an empty page.
    fn capturing_list(path: &str, captured: &Captured) -> Router {
        let captured = Arc::clone(captured);
        Router::new().route(
            path,
            get(move |Query(pairs): Query<Vec<(String, String)>>| {
                let captured = Arc::clone(&captured);
                async move {
                    *captured.lock().unwrap() = pairs;
                    Json(json!({
                        "data": [],
                        "pagination": {
                            "current_page": 1,
                            "total_pages": 0,
                            "total_records": 0,
                            "page_size": 20
                        }
                    }))
                }
            }),
        )
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    fn header_value(headers: &AxumHeaders, name: &str) -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn spawn_backend() -> Url {
        let app = Router::new()
            .route(
                "/api/echo",
                get(|headers: AxumHeaders| async move {
                    Json(json!({
                        "authorization": header_value(&headers, header::AUTHORIZATION.as_str()),
                        "content_type": header_value(&headers, header::CONTENT_TYPE.as_str()),
                        "request_id": header_value(&headers, "x-request-id"),
                    }))
                }),
            )
            .route(
                "/api/transactions/:id",
                get(|| async { Json(transaction_json()) }),
            )
            .route(
                "/api/transactions/:id/progress",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({"detail": "RESOURCE_NOT_FOUND: 未找到交易 T-404"})),
                    )
                }),
            )
            .route(
                "/api/cash-flows",
                get(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "code": "VALIDATION_ERROR",
                            "message": "page_size out of range",
                            "timestamp": "2024-05-01T00:00:00",
                            "request_id": "abc"
                        })),
                    )
                }),
            )
            .route(
                "/api/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
            )
            .route("/api/garbage", get(|| async { "not json" }))
            .route(
                "/api/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({}))
                }),
            )
            .route("/api/items/:id", delete(|| async { StatusCode::NO_CONTENT }));

        serve(app).await
    }

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!("http://{}/api", addr)).unwrap()
    }

    fn transaction_json() -> Value {
        json!({
            "external_id": "EXT-001",
            "transaction_id": "T-001",
            "parent_transaction_id": null,
            "entry_date": "2024-05-01T09:00:00",
            "trade_date": "2024-05-01T09:00:00",
            "value_date": "2024-05-03T00:00:00",
            "maturity_date": "2024-08-03T00:00:00",
            "account": "ACC-1",
            "product": "外汇即期",
            "direction": "BUY",
            "underlying": "USD/CNY",
            "counterparty": "Bank A",
            "status": "生效",
            "back_office_status": "已证实",
            "settlement_method": "全额",
            "confirmation_number": "CONF-1",
            "confirmation_type": "SWIFT",
            "confirmation_match_type": null,
            "confirmation_match_status": "匹配成功",
            "nature": "spot",
            "source": "FXO",
            "latest_event_type": "NEW",
            "operating_institution": "HQ",
            "business_institution": null,
            "trader": "alice",
            "version": 3,
            "last_modified_date": "2024-05-01T10:00:00",
            "last_modified_by": "system"
        })
    }

    fn client(base: Url, tokens: Arc<dyn TokenStore>) -> ApiClient {
        ApiClient::builder(base, tokens).no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_attaches_bearer_token_when_present() {
        let base = spawn_backend().await;
        let api = client(base, Arc::new(MemoryTokenStore::with_token("secret-token")));

        let echo: Value = api.get("/echo").await.unwrap();
        assert_eq!(echo["authorization"], "Bearer secret-token");
        assert_eq!(echo["content_type"], "application/json");
        assert!(Uuid::parse_str(echo["request_id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_no_authorization_without_token() {
        let base = spawn_backend().await;
        let tokens = Arc::new(MemoryTokenStore::new());
        let api = client(base, tokens.clone());

        let echo: Value = api.get("echo").await.unwrap();
        assert!(echo["authorization"].is_null());

        tokens.set_token("later").unwrap();
        let echo: Value = api.get("echo").await.unwrap();
        assert_eq!(echo["authorization"], "Bearer later");
    }

    #[tokio::test]
    async fn test_unwraps_typed_body() {
        let base = spawn_backend().await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let detail = api.transaction("EXT-001").await.unwrap();
        assert_eq!(detail.transaction_id, "T-001");
        assert_eq!(
            detail.back_office_status,
            shared::models::BackOfficeStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_extracts_message_from_error_body() {
        let base = spawn_backend().await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let err = api
            .list_cash_flows(&PaginationParams::default())
            .await
            .unwrap_err();
        match err {
            ClientError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("VALIDATION_ERROR"));
                assert_eq!(message, "page_size out of range");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_framework_error_uses_detail() {
        let base = spawn_backend().await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let err = api.transaction_progress("T-404").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message(), "RESOURCE_NOT_FOUND: 未找到交易 T-404");
    }

    #[tokio::test]
    async fn test_unreadable_error_body_uses_fallback() {
        let base = spawn_backend().await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let err = api.get::<Value>("broken").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.message(), FALLBACK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let base = spawn_backend().await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let err = api.get::<Value>("garbage").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let base = spawn_backend().await;
        let api = ApiClient::builder(base, Arc::new(MemoryTokenStore::new()))
            .no_proxy()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();

        let err = api.get::<Value>("slow").await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{}/api", addr)).unwrap();
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let err = api.get::<Value>("echo").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.message(), FALLBACK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_delete_discards_empty_body() {
        let base = spawn_backend().await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        api.delete("items/42").await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_pagination_rejected_before_sending() {
        let api = client(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            Arc::new(MemoryTokenStore::new()),
        );

        let err = api
            .list_transactions(&PaginationParams::page(0, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = client(
            Url::parse("http://localhost:3000/api").unwrap(),
            Arc::new(MemoryTokenStore::new()),
        );
        assert_eq!(api.base_url().as_str(), "http://localhost:3000/api/");

        let url = api.endpoint(&["transactions", "EXT 1/2", "progress"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/transactions/EXT%201%2F2/progress"
        );
    }

    #[tokio::test]
    async fn test_search_transactions_sends_criteria_and_paging() {
        let captured = Captured::default();
        let base = serve(capturing_list("/api/transactions", &captured)).await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let criteria = TransactionQueryCriteria {
            status: Some(TransactionStatus::Effective),
            trade_date_from: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            counterparty: Some("Bank A".to_string()),
            ..Default::default()
        };
        let page = api
            .search_transactions(&criteria, &PaginationParams::page(2, 50))
            .await
            .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(
            page.pagination,
            PaginationMeta {
                current_page: 1,
                total_pages: 0,
                total_records: 0,
                page_size: 20
            }
        );
        assert_eq!(
            *captured.lock().unwrap(),
            vec![
                pair("status", "生效"),
                pair("trade_date_from", "2024-05-01"),
                pair("counterparty", "Bank A"),
                pair("page", "2"),
                pair("page_size", "50"),
                pair("sort_order", "DESC"),
            ]
        );
    }

    #[tokio::test]
    async fn test_search_cash_flows_sends_criteria() {
        let captured = Captured::default();
        let base = serve(capturing_list("/api/cash-flows", &captured)).await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let criteria = CashFlowQueryCriteria {
            direction: Some(Direction::Receive),
            amount_min: Some(1000.0),
            status: Some(CashFlowStatus::PendingNetting),
            ..Default::default()
        };
        api.search_cash_flows(&criteria, &PaginationParams::default())
            .await
            .unwrap();

        let captured = captured.lock().unwrap();
        assert!(captured.contains(&pair("direction", "RECEIVE")));
        assert!(captured.contains(&pair("amount_min", "1000")));
        assert!(captured.contains(&pair("status", "待轧差")));
    }

    #[tokio::test]
    async fn test_inverted_criteria_rejected_before_sending() {
        let api = client(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            Arc::new(MemoryTokenStore::new()),
        );
        let criteria = CashFlowQueryCriteria {
            amount_min: Some(10.0),
            amount_max: Some(1.0),
            ..Default::default()
        };

        let err = api
            .search_cash_flows(&criteria, &PaginationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_transaction_sub_resources() {
        let captured = Captured::default();
        let app = capturing_list("/api/transactions/:id/events", &captured)
            .route(
                "/api/transactions/:id/accounting-records",
                get(|| async {
                    Json(json!({
                        "data": [{
                            "voucher_id": "V-1",
                            "transaction_id": "T-001",
                            "actual_accounting_date": "2024-05-03T00:00:00",
                            "planned_accounting_date": "2024-05-03T00:00:00",
                            "event_number": "E-1",
                            "debit_credit_indicator": "DEBIT",
                            "currency": "USD",
                            "account_subject": "1001",
                            "transaction_amount": 1000.0
                        }],
                        "pagination": {
                            "current_page": 1,
                            "total_pages": 1,
                            "total_records": 1,
                            "page_size": 15
                        }
                    }))
                }),
            )
            .route(
                "/api/transactions/:id/accounting-summary",
                get(|| async { Json(json!({"USD": {"debit": 1000.0, "credit": 250.0}})) }),
            )
            .route(
                "/api/transactions/:id/payment-info",
                get(|| async {
                    Json(json!({
                        "our_bank_name": "Head Office",
                        "our_bank_code": "001",
                        "our_account_name": "Treasury",
                        "our_account_number": "111",
                        "counterparty_bank_name": "Bank A",
                        "counterparty_bank_code": "002",
                        "counterparty_account_name": "Bank A Nostro",
                        "counterparty_account_number": "222",
                        "instruction_id": "INS-1",
                        "payment_date": "2024-05-03T00:00:00",
                        "message_type": "MT202",
                        "currency": "USD",
                        "amount": 1000.0,
                        "message_sender": "HQ",
                        "message_send_time": "2024-05-03T09:30:00"
                    }))
                }),
            );
        let base = serve(app).await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let events = api
            .transaction_events("EXT-001", &PaginationParams::page(1, 15))
            .await
            .unwrap();
        assert!(events.data.is_empty());
        assert_eq!(
            *captured.lock().unwrap(),
            vec![pair("page", "1"), pair("page_size", "15")]
        );

        let records = api
            .accounting_records("T-001", &PaginationParams::page(1, 15))
            .await
            .unwrap();
        assert_eq!(
            records.data[0].debit_credit_indicator,
            DebitCreditIndicator::Debit
        );

        let summary = api.accounting_summary("T-001").await.unwrap();
        assert_eq!(
            summary["USD"],
            CurrencyTotals {
                debit: 1000.0,
                credit: 250.0
            }
        );

        let info = api.payment_info("T-001").await.unwrap();
        assert_eq!(info.message_type, "MT202");
    }

    #[tokio::test]
    async fn test_export_returns_file() {
        let captured = Captured::default();
        let recorded = Arc::clone(&captured);
        let app = Router::new().route(
            "/api/export/transactions",
            get(
                move |Query(mut pairs): Query<Vec<(String, String)>>, headers: AxumHeaders| {
                    let recorded = Arc::clone(&recorded);
                    async move {
                        if let Some(accept) = header_value(&headers, header::ACCEPT.as_str()) {
                            pairs.push(("accept".to_string(), accept));
                        }
                        *recorded.lock().unwrap() = pairs;
                        (
                            [
                                (header::CONTENT_TYPE, "text/csv"),
                                (
                                    header::CONTENT_DISPOSITION,
                                    "attachment; filename=\"transactions_20240501.csv\"",
                                ),
                            ],
                            "external_id,status\nEXT-001,生效\n",
                        )
                    }
                },
            ),
        );
        let base = serve(app).await;
        let api = client(base, Arc::new(MemoryTokenStore::new()));

        let criteria = TransactionQueryCriteria {
            external_id: Some("EXT-001".to_string()),
            ..Default::default()
        };
        let file = api
            .export_transactions(ExportFormat::Csv, &criteria, &["external_id", "status"])
            .await
            .unwrap();

        assert_eq!(file.filename.as_deref(), Some("transactions_20240501.csv"));
        assert_eq!(file.content_type.as_deref(), Some("text/csv"));
        assert_eq!(
            String::from_utf8(file.content).unwrap(),
            "external_id,status\nEXT-001,生效\n"
        );
        assert_eq!(
            *captured.lock().unwrap(),
            vec![
                pair("format", "csv"),
                pair("external_id", "EXT-001"),
                pair("fields", "external_id,status"),
                pair("accept", "text/csv"),
            ]
        );
    }

    #[test]
    fn test_attachment_filename() {
        assert_eq!(
            attachment_filename("attachment; filename=\"cash_flows.xlsx\"").as_deref(),
            Some("cash_flows.xlsx")
        );
        assert_eq!(
            attachment_filename("attachment;filename=report.csv").as_deref(),
            Some("report.csv")
        );
        assert_eq!(attachment_filename("inline"), None);
    }

    /// Records which thread each token lookup ran on.
    #[derive(Default)]
    struct ThreadRecordingStore {
        threads: Mutex<Vec<ThreadId>>,
    }

    impl TokenStore for ThreadRecordingStore {
        fn token(&self) -> io::Result<Option<String>> {
            self.threads.lock().unwrap().push(thread::current().id());
            Ok(Some("t".to_string()))
        }

        fn set_token(&self, _token: &str) -> io::Result<()> {
            Ok(())
        }

        fn clear(&self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_token_lookup_runs_off_the_runtime_thread() {
        let base = spawn_backend().await;
        let store = Arc::new(ThreadRecordingStore::default());
        let api = client(base, store.clone());

        let echo: Value = api.get("echo").await.unwrap();
        assert_eq!(echo["authorization"], "Bearer t");

        let threads = store.threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], thread::current().id());
    }
}
