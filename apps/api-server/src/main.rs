//! api-server — HTTP API for the Owner/Company registry.
//!
//! Exposes CRUD endpoints over two in-memory stores:
//! - `/companies` keyed by EIN, filterable by name, street, city, state, postal_code.
//! - `/owners` keyed by SSN, filterable by ssn, first_name, last_name, email,
//!   phone, birth_date, and city (of any embedded company).
//!
//! State lives for the process lifetime only; the stores are built once in
//! `main` and injected into handlers through axum `State`.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # JSON logs with the sample records loaded
//! LOG_FORMAT=json SEED_DEMO_DATA=1 cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use domain::adapters::memory_repo::{InMemoryCompanyRepo, InMemoryOwnerRepo};
use domain::service::{CompanyService, OwnerService};
use domain::{
    Clock, Company, CompanyFields, CompanyFilter, CompanyPatch, CoreError, Ein, Email, NewOwner,
    Owner, OwnerFilter, OwnerPatch, Ssn,
};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone)]
struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> std::time::SystemTime {
        std::time::SystemTime::now()
    }
}

type Companies = CompanyService<InMemoryCompanyRepo, StdClock>;
type Owners = OwnerService<InMemoryOwnerRepo, StdClock>;

#[derive(Clone)]
struct AppState {
    companies: Arc<Companies>,
    owners: Arc<Owners>,
}

impl AppState {
    fn new() -> Self {
        Self {
            companies: Arc::new(CompanyService::new(InMemoryCompanyRepo::new(), StdClock)),
            owners: Arc::new(OwnerService::new(InMemoryOwnerRepo::new(), StdClock)),
        }
    }

    /// Load the sample records; returns (companies, owners) inserted.
    fn seed_demo(&self) -> Result<(usize, usize), CoreError> {
        let companies = domain::sample::companies()?;
        let owners = domain::sample::owners()?;
        let counts = (companies.len(), owners.len());
        for fields in companies {
            self.companies.create(fields)?;
        }
        for input in owners {
            self.owners.create(input)?;
        }
        Ok(counts)
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_insecure();

    let state = AppState::new();
    if cfg.seed_demo_data {
        match state.seed_demo() {
            Ok((companies, owners)) => info!(companies, owners, "seeded demo data"),
            Err(e) => {
                error!(err = %e, "failed to seed demo data");
                std::process::exit(1);
            }
        }
    }

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr = SocketAddr::new(cfg.host, cfg.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/companies", post(create_company).get(list_companies))
        .route(
            "/companies/:ein",
            get(get_company)
                .put(replace_company)
                .patch(update_company)
                .delete(delete_company),
        )
        .route("/owners", post(create_owner).get(list_owners))
        .route(
            "/owners/:ssn",
            get(get_owner)
                .put(replace_owner)
                .patch(update_owner)
                .delete(delete_owner),
        )
        .with_state(state)
}

// ============================================================================
// Request / response bodies
// ============================================================================

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

/// A required field may be left out of a patch but never cleared.
fn required<T>(field: &str, value: Option<Option<T>>) -> Result<Option<T>, CoreError> {
    match value {
        Some(None) => Err(CoreError::InvalidInput(format!("{} cannot be null", field))),
        Some(Some(v)) => Ok(Some(v)),
        None => Ok(None),
    }
}

/// Keys outside the identifier range can never be stored, so they are absent.
fn company_key(raw: u64) -> Result<Ein, CoreError> {
    Ein::new(raw).map_err(|_| CoreError::NotFound {
        kind: "company",
        key: raw.to_string(),
    })
}

fn owner_key(raw: u64) -> Result<Ssn, CoreError> {
    Ssn::new(raw).map_err(|_| CoreError::NotFound {
        kind: "owner",
        key: raw.to_string(),
    })
}

#[derive(Deserialize)]
struct CompanyIn {
    #[serde(alias = "EIN")]
    ein: u64,
    name: String,
    street: String,
    city: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

impl CompanyIn {
    fn into_fields(self) -> Result<CompanyFields, CoreError> {
        Ok(CompanyFields {
            ein: Ein::new(self.ein)?,
            name: self.name,
            street: self.street,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
        })
    }
}

/// Full replacement body; the EIN defaults to the one in the path.
#[derive(Deserialize)]
struct ReplaceCompanyReq {
    #[serde(default, alias = "EIN")]
    ein: Option<u64>,
    name: String,
    street: String,
    city: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

impl ReplaceCompanyReq {
    fn into_fields(self, path_ein: Ein) -> Result<CompanyFields, CoreError> {
        let ein = match self.ein {
            Some(raw) => Ein::new(raw)?,
            None => path_ein,
        };
        Ok(CompanyFields {
            ein,
            name: self.name,
            street: self.street,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
        })
    }
}

#[derive(Deserialize)]
struct UpdateCompanyReq {
    #[serde(default, deserialize_with = "double_option")]
    street: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    postal_code: Option<Option<String>>,
}

impl UpdateCompanyReq {
    fn into_patch(self) -> Result<CompanyPatch, CoreError> {
        Ok(CompanyPatch {
            street: required("street", self.street)?,
            city: required("city", self.city)?,
            state: self.state,
            postal_code: self.postal_code,
        })
    }
}

/// Create and full-replacement body for owners.
#[derive(Deserialize)]
struct OwnerIn {
    #[serde(default)]
    ssn: Option<u64>,
    first_name: String,
    last_name: String,
    email: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default, alias = "Companies")]
    companies: Vec<CompanyIn>,
}

fn parse_birth_date(s: &str) -> Result<chrono::NaiveDate, CoreError> {
    http_common::parse_date(s)
        .map_err(|e| CoreError::InvalidInput(format!("invalid birth_date '{}': {}", s, e)))
}

fn parse_companies(companies: Vec<CompanyIn>) -> Result<Vec<CompanyFields>, CoreError> {
    companies.into_iter().map(CompanyIn::into_fields).collect()
}

impl OwnerIn {
    fn into_new_owner(self) -> Result<NewOwner, CoreError> {
        Ok(NewOwner {
            ssn: self.ssn.map(Ssn::new).transpose()?,
            first_name: self.first_name,
            last_name: self.last_name,
            email: Email::new(self.email)?,
            phone: self.phone,
            birth_date: self
                .birth_date
                .as_deref()
                .map(parse_birth_date)
                .transpose()?,
            companies: parse_companies(self.companies)?,
        })
    }
}

#[derive(Deserialize)]
struct UpdateOwnerReq {
    #[serde(default, deserialize_with = "double_option")]
    first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    birth_date: Option<Option<String>>,
    #[serde(default, alias = "Companies", deserialize_with = "double_option")]
    companies: Option<Option<Vec<CompanyIn>>>,
}

impl UpdateOwnerReq {
    fn into_patch(self) -> Result<OwnerPatch, CoreError> {
        let birth_date = match self.birth_date {
            Some(Some(s)) => Some(Some(parse_birth_date(&s)?)),
            Some(None) => Some(None),
            None => None,
        };
        Ok(OwnerPatch {
            first_name: required("first_name", self.first_name)?,
            last_name: required("last_name", self.last_name)?,
            email: required("email", self.email)?
                .map(Email::new)
                .transpose()?,
            phone: self.phone,
            birth_date,
            companies: required("companies", self.companies)?
                .map(parse_companies)
                .transpose()?,
        })
    }
}

#[derive(Serialize)]
struct CompanyFieldsOut {
    ein: u64,
    name: String,
    street: String,
    city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_code: Option<String>,
}

#[derive(Serialize)]
struct CompanyOut {
    #[serde(flatten)]
    fields: CompanyFieldsOut,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize)]
struct OwnerOut {
    ssn: u64,
    first_name: String,
    last_name: String,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    birth_date: Option<String>,
    companies: Vec<CompanyFieldsOut>,
    created_at: String,
    updated_at: String,
}

fn fields_to_out(f: CompanyFields) -> CompanyFieldsOut {
    CompanyFieldsOut {
        ein: f.ein.get(),
        name: f.name,
        street: f.street,
        city: f.city,
        state: f.state,
        postal_code: f.postal_code,
    }
}

fn company_to_out(c: Company) -> CompanyOut {
    CompanyOut {
        created_at: http_common::system_time_to_rfc3339(c.created_at),
        updated_at: http_common::system_time_to_rfc3339(c.updated_at),
        fields: fields_to_out(c.fields()),
    }
}

fn owner_to_out(o: Owner) -> OwnerOut {
    OwnerOut {
        ssn: o.ssn.get(),
        first_name: o.first_name,
        last_name: o.last_name,
        email: o.email.as_str().to_string(),
        phone: o.phone,
        birth_date: o.birth_date.as_ref().map(domain::filter::canonical_date),
        companies: o.companies.into_iter().map(fields_to_out).collect(),
        created_at: http_common::system_time_to_rfc3339(o.created_at),
        updated_at: http_common::system_time_to_rfc3339(o.updated_at),
    }
}

#[derive(Deserialize)]
struct CompanyQuery {
    name: Option<String>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
}

impl From<CompanyQuery> for CompanyFilter {
    fn from(q: CompanyQuery) -> Self {
        CompanyFilter {
            name: q.name,
            street: q.street,
            city: q.city,
            state: q.state,
            postal_code: q.postal_code,
        }
    }
}

#[derive(Deserialize)]
struct OwnerQuery {
    ssn: Option<u64>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    birth_date: Option<String>,
    city: Option<String>,
}

impl OwnerQuery {
    /// `None` when the query names an SSN no owner can hold.
    fn into_filter(self) -> Option<OwnerFilter> {
        let ssn = match self.ssn {
            Some(raw) => Some(Ssn::new(raw).ok()?),
            None => None,
        };
        Some(OwnerFilter {
            ssn,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            birth_date: self.birth_date,
            city: self.city,
        })
    }
}

// ============================================================================
// Error mapping
// ============================================================================

/// Translate a domain error into a JSON error response.
fn error_response(op: &'static str, err: CoreError) -> Response {
    let message = err.to_string();
    match err {
        CoreError::NotFound { .. } => {
            warn!(op, err = %message, "not found");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message("not_found", &message)),
            )
                .into_response()
        }
        CoreError::Conflict { .. } => {
            warn!(op, err = %message, "conflict");
            (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_error_with_message("conflict", &message)),
            )
                .into_response()
        }
        CoreError::InvalidInput(_) => {
            warn!(op, err = %message, "invalid request");
            (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_error_with_message(
                    "invalid_request",
                    &message,
                )),
            )
                .into_response()
        }
        CoreError::Repository(_) => {
            error!(op, err = %message, "repository error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_err("internal")),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to the Owner/Company API."
    }))
}

async fn create_company(
    State(state): State<AppState>,
    Json(body): Json<CompanyIn>,
) -> impl IntoResponse {
    match body
        .into_fields()
        .and_then(|fields| state.companies.create(fields))
    {
        Ok(company) => {
            info!(ein = %company.ein, "company created");
            (StatusCode::CREATED, Json(company_to_out(company))).into_response()
        }
        Err(e) => error_response("create_company", e),
    }
}

async fn list_companies(
    State(state): State<AppState>,
    Query(q): Query<CompanyQuery>,
) -> impl IntoResponse {
    match state.companies.list(&CompanyFilter::from(q)) {
        Ok(found) => {
            let out: Vec<CompanyOut> = found.into_iter().map(company_to_out).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => error_response("list_companies", e),
    }
}

async fn get_company(State(state): State<AppState>, Path(ein): Path<u64>) -> impl IntoResponse {
    match company_key(ein).and_then(|ein| state.companies.get(&ein)) {
        Ok(company) => (StatusCode::OK, Json(company_to_out(company))).into_response(),
        Err(e) => error_response("get_company", e),
    }
}

async fn replace_company(
    State(state): State<AppState>,
    Path(ein): Path<u64>,
    Json(body): Json<ReplaceCompanyReq>,
) -> impl IntoResponse {
    let result = company_key(ein).and_then(|ein| {
        let fields = body.into_fields(ein)?;
        state.companies.replace(&ein, fields)
    });
    match result {
        Ok(company) => {
            info!(ein = %company.ein, "company replaced");
            (StatusCode::OK, Json(company_to_out(company))).into_response()
        }
        Err(e) => error_response("replace_company", e),
    }
}

async fn update_company(
    State(state): State<AppState>,
    Path(ein): Path<u64>,
    Json(body): Json<UpdateCompanyReq>,
) -> impl IntoResponse {
    let result = company_key(ein).and_then(|ein| {
        let patch = body.into_patch()?;
        state.companies.update(&ein, patch)
    });
    match result {
        Ok(company) => {
            info!(ein = %company.ein, "company updated");
            (StatusCode::OK, Json(company_to_out(company))).into_response()
        }
        Err(e) => error_response("update_company", e),
    }
}

async fn delete_company(
    State(state): State<AppState>,
    Path(ein): Path<u64>,
) -> impl IntoResponse {
    match company_key(ein).and_then(|ein| state.companies.delete(&ein)) {
        Ok(()) => {
            info!(ein, "company deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response("delete_company", e),
    }
}

async fn create_owner(
    State(state): State<AppState>,
    Json(body): Json<OwnerIn>,
) -> impl IntoResponse {
    match body
        .into_new_owner()
        .and_then(|input| state.owners.create(input))
    {
        Ok(owner) => {
            info!(ssn = %owner.ssn, companies = owner.companies.len(), "owner created");
            (StatusCode::CREATED, Json(owner_to_out(owner))).into_response()
        }
        Err(e) => error_response("create_owner", e),
    }
}

async fn list_owners(
    State(state): State<AppState>,
    Query(q): Query<OwnerQuery>,
) -> impl IntoResponse {
    let Some(filter) = q.into_filter() else {
        return (StatusCode::OK, Json(Vec::<OwnerOut>::new())).into_response();
    };
    match state.owners.list(&filter) {
        Ok(found) => {
            let out: Vec<OwnerOut> = found.into_iter().map(owner_to_out).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => error_response("list_owners", e),
    }
}

async fn get_owner(State(state): State<AppState>, Path(ssn): Path<u64>) -> impl IntoResponse {
    match owner_key(ssn).and_then(|ssn| state.owners.get(&ssn)) {
        Ok(owner) => (StatusCode::OK, Json(owner_to_out(owner))).into_response(),
        Err(e) => error_response("get_owner", e),
    }
}

async fn replace_owner(
    State(state): State<AppState>,
    Path(ssn): Path<u64>,
    Json(body): Json<OwnerIn>,
) -> impl IntoResponse {
    let result = owner_key(ssn).and_then(|ssn| {
        let input = body.into_new_owner()?;
        state.owners.replace(&ssn, input)
    });
    match result {
        Ok(owner) => {
            info!(ssn = %owner.ssn, "owner replaced");
            (StatusCode::OK, Json(owner_to_out(owner))).into_response()
        }
        Err(e) => error_response("replace_owner", e),
    }
}

async fn update_owner(
    State(state): State<AppState>,
    Path(ssn): Path<u64>,
    Json(body): Json<UpdateOwnerReq>,
) -> impl IntoResponse {
    let result = owner_key(ssn).and_then(|ssn| {
        let patch = body.into_patch()?;
        state.owners.update(&ssn, patch)
    });
    match result {
        Ok(owner) => {
            info!(ssn = %owner.ssn, "owner updated");
            (StatusCode::OK, Json(owner_to_out(owner))).into_response()
        }
        Err(e) => error_response("update_owner", e),
    }
}

async fn delete_owner(State(state): State<AppState>, Path(ssn): Path<u64>) -> impl IntoResponse {
    match owner_key(ssn).and_then(|ssn| state.owners.delete(&ssn)) {
        Ok(()) => {
            info!(ssn, "owner deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response("delete_owner", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn app() -> Router {
        router(AppState::new())
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        // Extractor rejections answer in plain text; treat them as no JSON.
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn lucky_deli() -> Value {
        json!({
            "ein": 923345678,
            "name": "Lucky Deli",
            "street": "117 Broadway",
            "city": "New York",
            "state": "NY",
            "postal_code": "10027"
        })
    }

    fn great_bakery() -> Value {
        json!({
            "ein": 922345776,
            "name": "Great Bakery",
            "street": "112 Main St",
            "city": "New York",
            "state": "NY",
            "postal_code": "10028"
        })
    }

    fn clara(ssn: Option<u64>) -> Value {
        let mut v = json!({
            "first_name": "Clara",
            "last_name": "Green",
            "email": "apple@gmail.com",
            "phone": "+1-718-555-0053",
            "birth_date": "1999-12-10",
            "companies": [lucky_deli()]
        });
        if let Some(ssn) = ssn {
            v["ssn"] = json!(ssn);
        }
        v
    }

    #[tokio::test]
    async fn root_returns_welcome_message() {
        let (status, body) = send(&app(), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("Owner/Company"));
    }

    #[tokio::test]
    async fn create_and_get_company_flow() {
        let router = app();
        let (status, created) = send(&router, "POST", "/companies", Some(lucky_deli())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["ein"], 923345678);
        assert_eq!(created["name"], "Lucky Deli");
        assert!(created["created_at"].as_str().unwrap().ends_with('Z'));
        assert_eq!(created["created_at"], created["updated_at"]);

        let (status, got) = send(&router, "GET", "/companies/923345678", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(got, created);
    }

    #[tokio::test]
    async fn duplicate_company_is_rejected_with_400() {
        let router = app();
        send(&router, "POST", "/companies", Some(lucky_deli())).await;
        let mut dup = great_bakery();
        dup["ein"] = json!(923345678);
        let (status, body) = send(&router, "POST", "/companies", Some(dup)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "conflict");

        let (_, got) = send(&router, "GET", "/companies/923345678", None).await;
        assert_eq!(got["name"], "Lucky Deli");
    }

    #[tokio::test]
    async fn list_companies_applies_filters() {
        let router = app();
        send(&router, "POST", "/companies", Some(lucky_deli())).await;
        send(&router, "POST", "/companies", Some(great_bakery())).await;

        let (status, all) = send(&router, "GET", "/companies", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, ny) = send(&router, "GET", "/companies?city=New%20York", None).await;
        assert_eq!(ny.as_array().unwrap().len(), 2);

        let (_, deli) = send(&router, "GET", "/companies?name=Lucky%20Deli", None).await;
        let deli = deli.as_array().unwrap();
        assert_eq!(deli.len(), 1);
        assert_eq!(deli[0]["ein"], 923345678);

        let (_, none) = send(&router, "GET", "/companies?postal_code=99999", None).await;
        assert!(none.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_company_is_404() {
        let router = app();
        let (status, body) = send(&router, "GET", "/companies/123", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
        let (status, _) = send(&router, "DELETE", "/companies/123", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_company_then_get_is_404() {
        let router = app();
        send(&router, "POST", "/companies", Some(lucky_deli())).await;
        let (status, _) = send(&router, "DELETE", "/companies/923345678", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&router, "GET", "/companies/923345678", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_replaces_company_and_checks_ein() {
        let router = app();
        send(&router, "POST", "/companies", Some(lucky_deli())).await;

        let body = json!({"name": "Lucky Deli", "street": "1 Queens Blvd", "city": "Queens"});
        let (status, replaced) = send(&router, "PUT", "/companies/923345678", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced["city"], "Queens");
        assert!(replaced.get("state").is_none());

        let mismatched = json!({"ein": 111111111, "name": "X", "street": "Y", "city": "Z"});
        let (status, body) =
            send(&router, "PUT", "/companies/923345678", Some(mismatched)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");

        let absent = json!({"name": "X", "street": "Y", "city": "Z"});
        let (status, _) = send(&router, "PUT", "/companies/555", Some(absent)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_company_distinguishes_missing_from_null() {
        let router = app();
        send(&router, "POST", "/companies", Some(lucky_deli())).await;
        let (status, patched) = send(
            &router,
            "PATCH",
            "/companies/923345678",
            Some(json!({"city": "Queens", "state": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["city"], "Queens");
        assert!(patched.get("state").is_none());
        assert_eq!(patched["postal_code"], "10027");
    }

    #[tokio::test]
    async fn create_owner_with_and_without_ssn() {
        let router = app();
        let (status, with_ssn) =
            send(&router, "POST", "/owners", Some(clara(Some(917260053)))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(with_ssn["ssn"], 917260053);
        assert_eq!(with_ssn["birth_date"], "1999-12-10");
        assert_eq!(with_ssn["companies"][0]["name"], "Lucky Deli");
        assert!(with_ssn["companies"][0].get("created_at").is_none());

        let (status, generated) = send(&router, "POST", "/owners", Some(clara(None))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(generated["ssn"], 1);

        let (status, body) = send(&router, "POST", "/owners", Some(clara(Some(917260053)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn create_owner_rejects_bad_email_and_date() {
        let router = app();
        let mut bad_email = clara(None);
        bad_email["email"] = json!("not-an-email");
        let (status, body) = send(&router, "POST", "/owners", Some(bad_email)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");

        let mut bad_date = clara(None);
        bad_date["birth_date"] = json!("12/10/1999");
        let (status, _) = send(&router, "POST", "/owners", Some(bad_date)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, all) = send(&router, "GET", "/owners", None).await;
        assert!(all.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_owners_by_city_and_birth_date() {
        let router = app();
        send(&router, "POST", "/owners", Some(clara(Some(917260053)))).await;
        let jack = json!({
            "ssn": 123456778,
            "first_name": "Jack",
            "last_name": "Reed",
            "email": "123@gmail.com",
            "birth_date": "2002-12-09",
            "companies": [{
                "ein": 556775358,
                "name": "24 Pizza",
                "street": "10 Downing St",
                "city": "San Diego"
            }]
        });
        send(&router, "POST", "/owners", Some(jack)).await;

        let (_, ny) = send(&router, "GET", "/owners?city=New%20York", None).await;
        let ny = ny.as_array().unwrap();
        assert_eq!(ny.len(), 1);
        assert_eq!(ny[0]["first_name"], "Clara");

        let (_, born) = send(&router, "GET", "/owners?birth_date=2002-12-09", None).await;
        let born = born.as_array().unwrap();
        assert_eq!(born.len(), 1);
        assert_eq!(born[0]["ssn"], 123456778);

        let (_, both) = send(&router, "GET", "/owners?ssn=917260053&last_name=Green", None).await;
        assert_eq!(both.as_array().unwrap().len(), 1);

        let (_, all) = send(&router, "GET", "/owners", None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (status, _) = send(&router, "GET", "/owners?ssn=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn owner_replace_patch_and_delete() {
        let router = app();
        send(&router, "POST", "/owners", Some(clara(Some(917260053)))).await;

        let mut replacement = clara(None);
        replacement["first_name"] = json!("Nathan");
        replacement["last_name"] = json!("Briar");
        let (status, replaced) =
            send(&router, "PUT", "/owners/917260053", Some(replacement)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced["first_name"], "Nathan");
        assert_eq!(replaced["ssn"], 917260053);

        let patch = json!({
            "phone": null,
            "companies": [{
                "ein": 914444023,
                "name": "Post Fkkd",
                "street": "10 Main St",
                "city": "San Diego",
                "state": "CA",
                "postal_code": "92201"
            }]
        });
        let (status, patched) = send(&router, "PATCH", "/owners/917260053", Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(patched.get("phone").is_none());
        assert_eq!(patched["companies"][0]["city"], "San Diego");
        assert_eq!(patched["last_name"], "Briar");

        let (status, _) = send(&router, "DELETE", "/owners/917260053", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&router, "GET", "/owners/917260053", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&router, "DELETE", "/owners/917260053", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn keys_outside_identifier_range_are_not_found() {
        let router = app();
        let (status, body) = send(&router, "GET", "/companies/0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");

        let (status, _) = send(&router, "DELETE", "/owners/1000000000", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let body = json!({"name": "X", "street": "Y", "city": "Z"});
        let (status, _) = send(&router, "PUT", "/companies/0", Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, "PATCH", "/owners/0", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn owner_ssn_filter_outside_range_matches_nothing() {
        let router = app();
        send(&router, "POST", "/owners", Some(clara(None))).await;

        let (status, body) = send(&router, "GET", "/owners?ssn=0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) = send(&router, "GET", "/owners?ssn=1000000000", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn patch_rejects_null_for_required_fields() {
        let router = app();
        send(&router, "POST", "/companies", Some(lucky_deli())).await;
        let (status, body) = send(
            &router,
            "PATCH",
            "/companies/923345678",
            Some(json!({"city": null})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
        let (_, got) = send(&router, "GET", "/companies/923345678", None).await;
        assert_eq!(got["city"], "New York");

        send(&router, "POST", "/owners", Some(clara(Some(917260053)))).await;
        for field in ["first_name", "last_name", "email", "companies"] {
            let mut patch = json!({});
            patch[field] = Value::Null;
            let (status, _) = send(&router, "PATCH", "/owners/917260053", Some(patch)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", field);
        }
        let (_, got) = send(&router, "GET", "/owners/917260053", None).await;
        assert_eq!(got["email"], "apple@gmail.com");
        assert_eq!(got["companies"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seeded_state_serves_sample_records() {
        let state = AppState::new();
        assert_eq!(state.seed_demo().unwrap(), (3, 2));
        let router = router(state);
        let (_, owners) = send(&router, "GET", "/owners?city=San%20Diego", None).await;
        assert_eq!(owners.as_array().unwrap().len(), 1);
    }
}
