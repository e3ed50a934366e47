//! # API REST
//!
//! REST API implementation for prior-authorization drafting.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - API key authentication and CORS
//!
//! Uses `api-shared` for wire types and `pa-core` for all business logic.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use api_shared::{
    auth::validate_api_key, AddMaterialReq, ChatReq, ChatRes, CitationRes, CountRes,
    CreateRequestReq, ErrorRes, HealthRes, HealthService, KpiReportRes, ListMaterialsRes,
    ListRequestsRes, MaterialRes, OrgSettingsDoc, PreparePaReq, PreparePaRes, ReplaceRulesRes,
    RequestRes, RulesDocument, RulesRes, SoapNote, SummarizeReq, UpdateStatusReq, API_KEY_HEADER,
};
use pa_core::{
    reports::CountEntry, ChatAnswer, ClinicalNote, CoreConfig, KpiReport, LabelledSoapParser,
    Material, MaterialKind, NewRequest, OrgSettings, PaError, PaRequest, PaResult, PrepareInput,
    PriorAuthDraft, PriorAuthService, RequestService, RequestStatus, RuleStore, SettingsStore,
    Summariser,
};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<SettingsStore>,
    prior_auth: PriorAuthService,
    requests: RequestService,
    summariser: Arc<dyn Summariser>,
    api_key: Arc<str>,
}

impl AppState {
    /// Build state from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured rules file cannot be loaded.
    pub fn from_config(cfg: Arc<CoreConfig>, api_key: impl Into<String>) -> PaResult<Self> {
        let rules = Arc::new(RuleStore::open(cfg.rules_path())?);
        Ok(Self::new(
            cfg,
            rules,
            RequestService::in_memory(),
            Arc::new(LabelledSoapParser),
            api_key,
        ))
    }

    pub fn new(
        cfg: Arc<CoreConfig>,
        rules: Arc<RuleStore>,
        requests: RequestService,
        summariser: Arc<dyn Summariser>,
        api_key: impl Into<String>,
    ) -> Self {
        let api_key: String = api_key.into();
        Self {
            settings: Arc::new(SettingsStore::new(OrgSettings::from_config(&cfg))),
            prior_auth: PriorAuthService::new(rules),
            requests,
            summariser,
            api_key: Arc::from(api_key),
        }
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        self.prior_auth.rules()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        prepare_pa,
        summarize,
        get_rules,
        replace_rules,
        create_request,
        list_requests,
        get_request,
        update_request_status,
        add_material,
        list_materials,
        chat,
        get_settings,
        replace_settings,
        get_reports,
        export_reports,
    ),
    components(schemas(
        HealthRes,
        SoapNote,
        PreparePaReq,
        PreparePaRes,
        SummarizeReq,
        RulesDocument,
        RulesRes,
        ReplaceRulesRes,
        CreateRequestReq,
        RequestRes,
        ListRequestsRes,
        UpdateStatusReq,
        AddMaterialReq,
        MaterialRes,
        ListMaterialsRes,
        ChatReq,
        CitationRes,
        ChatRes,
        OrgSettingsDoc,
        CountRes,
        KpiReportRes,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Build the application router.
///
/// Every route except `/health` and the Swagger UI requires the `x-api-key` header.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/prepare-pa", post(prepare_pa))
        .route("/summarize", post(summarize))
        .route("/admin/rules", get(get_rules).put(replace_rules))
        .route("/admin/settings", get(get_settings).put(replace_settings))
        .route("/requests", get(list_requests).post(create_request))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/status", put(update_request_status))
        .route(
            "/requests/:id/materials",
            get(list_materials).post(add_material),
        )
        .route("/requests/:id/chat", post(chat))
        .route("/reports", get(get_reports))
        .route("/reports/export", get(export_reports))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

type ApiError = (StatusCode, Json<ErrorRes>);

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

/// Map a core error to an HTTP status, logging it on the way out.
fn pa_error(context: &str, err: PaError) -> ApiError {
    let status = match &err {
        PaError::UnknownPayer(_)
        | PaError::UnknownProcedure { .. }
        | PaError::MalformedInput(_)
        | PaError::InvalidRules(_)
        | PaError::RulesParse(_)
        | PaError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
        PaError::RequestNotFound(_) => StatusCode::NOT_FOUND,
        PaError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PaError::RulesRead(_)
        | PaError::RulesSerialization(_)
        | PaError::InvalidConfig(_)
        | PaError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("{} error: {:?}", context, err);
    } else {
        tracing::warn!("{} rejected: {}", context, err);
    }

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "Internal error".to_string()
    } else {
        err.to_string()
    };
    error_body(status, message)
}

async fn require_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match validate_api_key(&state.api_key, provided) {
        Ok(()) => Ok(next.run(request).await),
        Err(e) => {
            tracing::warn!("rejected {} {}: {}", request.method(), request.uri().path(), e);
            Err(error_body(StatusCode::UNAUTHORIZED, e.to_string()))
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn note_from_wire(note: SoapNote) -> ClinicalNote {
    ClinicalNote {
        subjective: note.subjective,
        objective: note.objective,
        assessment: note.assessment,
        plan: note.plan,
    }
}

fn note_to_wire(note: ClinicalNote) -> SoapNote {
    SoapNote {
        subjective: note.subjective,
        objective: note.objective,
        assessment: note.assessment,
        plan: note.plan,
    }
}

fn draft_to_wire(draft: PriorAuthDraft) -> PreparePaRes {
    PreparePaRes {
        fields: draft.fields,
        attachments: draft.attachments,
        missing: draft.missing,
        draft: draft.draft,
        confidence: draft
            .confidence
            .into_iter()
            .map(|(key, level)| (key, level.as_str().to_string()))
            .collect(),
    }
}

fn request_to_wire(request: PaRequest) -> RequestRes {
    RequestRes {
        id: request.id.to_string(),
        payer: request.payer.into_string(),
        specialty: request.specialty.into_string(),
        procedure_code: request.procedure_code.into_string(),
        procedure_name: request.procedure_name,
        patient_name: request.patient_name,
        status: request.status.to_string(),
        created_at: request.created_at.to_rfc3339(),
        updated_at: request.updated_at.to_rfc3339(),
    }
}

fn material_to_wire(material: Material) -> MaterialRes {
    MaterialRes {
        id: material.id.to_string(),
        request_id: material.request_id.to_string(),
        kind: material.kind.as_str().to_string(),
        content: material.content,
        created_at: material.created_at.to_rfc3339(),
    }
}

fn answer_to_wire(answer: ChatAnswer) -> ChatRes {
    ChatRes {
        answer: answer.answer,
        citations: answer
            .citations
            .into_iter()
            .map(|c| CitationRes {
                source: c.source.as_str().to_string(),
                material_id: c.material_id.to_string(),
                excerpt: c.excerpt,
            })
            .collect(),
    }
}

fn settings_to_wire(settings: OrgSettings) -> OrgSettingsDoc {
    OrgSettingsDoc {
        name: settings.name,
        retention_days: settings.retention_days,
        baseline_minutes: settings.baseline_minutes,
        logo_url: settings.logo_url,
    }
}

fn settings_from_wire(doc: OrgSettingsDoc) -> OrgSettings {
    OrgSettings {
        name: doc.name,
        retention_days: doc.retention_days,
        baseline_minutes: doc.baseline_minutes,
        logo_url: doc.logo_url,
    }
}

fn counts_to_wire(counts: Vec<CountEntry>) -> Vec<CountRes> {
    counts
        .into_iter()
        .map(|c| CountRes {
            key: c.key,
            count: c.count,
        })
        .collect()
}

fn report_to_wire(report: KpiReport) -> KpiReportRes {
    KpiReportRes {
        requests_this_week: report.requests_this_week,
        total_requests: report.total_requests,
        pending_requests: report.pending_requests,
        approved_requests: report.approved_requests,
        denied_requests: report.denied_requests,
        avg_turnaround_days: report.avg_turnaround_days,
        first_pass_clean_rate: report.first_pass_clean_rate,
        total_minutes_saved: report.total_minutes_saved,
        requests_by_payer: counts_to_wire(report.requests_by_payer),
        requests_by_procedure: counts_to_wire(report.requests_by_procedure),
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers. No API key required.
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/prepare-pa",
    request_body = PreparePaReq,
    responses(
        (status = 200, description = "Draft prepared", body = PreparePaRes),
        (status = 400, description = "Unknown payer/procedure or malformed input", body = ErrorRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes)
    )
)]
/// Run the prepare pipeline against the live payer rules.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the payer or procedure is unknown, or
/// - the payer, procedure code or clinical note is missing.
async fn prepare_pa(
    State(state): State<AppState>,
    Json(req): Json<PreparePaReq>,
) -> Result<Json<PreparePaRes>, ApiError> {
    let input = PrepareInput {
        payer: req.payer,
        procedure_code: req.procedure_code,
        soap: req.soap.map(note_from_wire),
        transcript: req.transcript,
    };

    state
        .prior_auth
        .prepare(&input)
        .map(|draft| Json(draft_to_wire(draft)))
        .map_err(|e| pa_error("Prepare PA", e))
}

#[utoipa::path(
    post,
    path = "/summarize",
    request_body = SummarizeReq,
    responses(
        (status = 200, description = "Structured clinical note", body = SoapNote),
        (status = 400, description = "No text provided", body = ErrorRes),
        (status = 503, description = "Summarisation service unavailable", body = ErrorRes)
    )
)]
/// Turn consultation text into a SOAP note.
async fn summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeReq>,
) -> Result<Json<SoapNote>, ApiError> {
    state
        .summariser
        .summarise(&req.text)
        .map(|note| Json(note_to_wire(note)))
        .map_err(|e| pa_error("Summarise", e))
}

#[utoipa::path(
    get,
    path = "/admin/rules",
    responses(
        (status = 200, description = "Current rule set and version", body = RulesRes)
    )
)]
async fn get_rules(State(state): State<AppState>) -> Result<Json<RulesRes>, ApiError> {
    let snapshot = state.rules().snapshot();
    let rules = snapshot
        .rules()
        .to_json_value()
        .map_err(|e| pa_error("Read rules", e))?;

    Ok(Json(RulesRes {
        version: snapshot.version(),
        rules: RulesDocument(rules),
    }))
}

#[utoipa::path(
    put,
    path = "/admin/rules",
    request_body = RulesDocument,
    responses(
        (status = 200, description = "Rules replaced", body = ReplaceRulesRes),
        (status = 400, description = "Rules failed validation", body = ErrorRes)
    )
)]
/// Validate and atomically replace the whole rule set.
///
/// An invalid document leaves the current rules untouched.
async fn replace_rules(
    State(state): State<AppState>,
    Json(document): Json<RulesDocument>,
) -> Result<Json<ReplaceRulesRes>, ApiError> {
    let version = state
        .rules()
        .replace_from_json(document.0)
        .map_err(|e| pa_error("Replace rules", e))?;
    Ok(Json(ReplaceRulesRes { version }))
}

#[utoipa::path(
    post,
    path = "/requests",
    request_body = CreateRequestReq,
    responses(
        (status = 201, description = "Request created", body = RequestRes),
        (status = 400, description = "Bad request", body = ErrorRes)
    )
)]
async fn create_request(
    State(state): State<AppState>,
    Json(req): Json<CreateRequestReq>,
) -> Result<(StatusCode, Json<RequestRes>), ApiError> {
    let status: Option<RequestStatus> = req
        .status
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e| pa_error("Create request", e))?;

    let new = NewRequest {
        payer: req.payer,
        procedure_code: req.procedure_code,
        specialty: req.specialty,
        procedure_name: req.procedure_name,
        patient_name: req.patient_name,
        status,
    };

    let request = state
        .requests
        .create(new)
        .map_err(|e| pa_error("Create request", e))?;
    Ok((StatusCode::CREATED, Json(request_to_wire(request))))
}

#[utoipa::path(
    get,
    path = "/requests",
    responses(
        (status = 200, description = "Requests, newest first", body = ListRequestsRes)
    )
)]
async fn list_requests(State(state): State<AppState>) -> Result<Json<ListRequestsRes>, ApiError> {
    let requests = state
        .requests
        .list()
        .map_err(|e| pa_error("List requests", e))?;
    Ok(Json(ListRequestsRes {
        requests: requests.into_iter().map(request_to_wire).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/requests/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request", body = RequestRes),
        (status = 404, description = "Request not found", body = ErrorRes)
    )
)]
async fn get_request(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<RequestRes>, ApiError> {
    state
        .requests
        .get(id)
        .map(|r| Json(request_to_wire(r)))
        .map_err(|e| pa_error("Get request", e))
}

#[utoipa::path(
    put,
    path = "/requests/{id}/status",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status updated", body = RequestRes),
        (status = 400, description = "Unknown status or forbidden transition", body = ErrorRes),
        (status = 404, description = "Request not found", body = ErrorRes)
    )
)]
async fn update_request_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
    Json(req): Json<UpdateStatusReq>,
) -> Result<Json<RequestRes>, ApiError> {
    let next: RequestStatus = req
        .status
        .parse()
        .map_err(|e| pa_error("Update status", e))?;

    state
        .requests
        .update_status(id, next)
        .map(|r| Json(request_to_wire(r)))
        .map_err(|e| pa_error("Update status", e))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/materials",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = AddMaterialReq,
    responses(
        (status = 201, description = "Material attached", body = MaterialRes),
        (status = 400, description = "Unknown material kind", body = ErrorRes),
        (status = 404, description = "Request not found", body = ErrorRes)
    )
)]
async fn add_material(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
    Json(req): Json<AddMaterialReq>,
) -> Result<(StatusCode, Json<MaterialRes>), ApiError> {
    let kind: MaterialKind = req.kind.parse().map_err(|e| pa_error("Add material", e))?;

    let material = state
        .requests
        .add_material(id, kind, req.content)
        .map_err(|e| pa_error("Add material", e))?;
    Ok((StatusCode::CREATED, Json(material_to_wire(material))))
}

#[utoipa::path(
    get,
    path = "/requests/{id}/materials",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Materials, oldest first", body = ListMaterialsRes),
        (status = 404, description = "Request not found", body = ErrorRes)
    )
)]
async fn list_materials(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<ListMaterialsRes>, ApiError> {
    let materials = state
        .requests
        .materials(id)
        .map_err(|e| pa_error("List materials", e))?;
    Ok(Json(ListMaterialsRes {
        materials: materials.into_iter().map(material_to_wire).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/chat",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = ChatReq,
    responses(
        (status = 200, description = "Answer quoted from the request's materials", body = ChatRes),
        (status = 400, description = "Blank question", body = ErrorRes),
        (status = 404, description = "Request not found", body = ErrorRes)
    )
)]
/// Answer a question from the request's materials.
///
/// Only text found in the materials is returned. With no match the answer says so and carries
/// no citations.
async fn chat(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
    Json(req): Json<ChatReq>,
) -> Result<Json<ChatRes>, ApiError> {
    state
        .requests
        .answer(id, &req.question)
        .map(|answer| Json(answer_to_wire(answer)))
        .map_err(|e| pa_error("Chat", e))
}

#[utoipa::path(
    get,
    path = "/admin/settings",
    responses(
        (status = 200, description = "Organisation settings", body = OrgSettingsDoc)
    )
)]
async fn get_settings(State(state): State<AppState>) -> Json<OrgSettingsDoc> {
    Json(settings_to_wire(state.settings.get()))
}

#[utoipa::path(
    put,
    path = "/admin/settings",
    request_body = OrgSettingsDoc,
    responses(
        (status = 200, description = "Settings replaced", body = OrgSettingsDoc),
        (status = 400, description = "Blank name or zero days/minutes", body = ErrorRes)
    )
)]
async fn replace_settings(
    State(state): State<AppState>,
    Json(doc): Json<OrgSettingsDoc>,
) -> Result<Json<OrgSettingsDoc>, ApiError> {
    state
        .settings
        .replace(settings_from_wire(doc))
        .map(|settings| Json(settings_to_wire(settings)))
        .map_err(|e| pa_error("Replace settings", e))
}

#[utoipa::path(
    get,
    path = "/reports",
    responses(
        (status = 200, description = "KPI summary", body = KpiReportRes)
    )
)]
async fn get_reports(State(state): State<AppState>) -> Result<Json<KpiReportRes>, ApiError> {
    let requests = state
        .requests
        .list()
        .map_err(|e| pa_error("Reports", e))?;
    let report = pa_core::kpi_report(
        &requests,
        chrono::Utc::now(),
        state.settings.get().baseline_minutes,
    );
    Ok(Json(report_to_wire(report)))
}

#[utoipa::path(
    get,
    path = "/reports/export",
    responses(
        (status = 200, description = "CSV export of all requests", content_type = "text/csv", body = String)
    )
)]
async fn export_reports(State(state): State<AppState>) -> Result<Response, ApiError> {
    let requests = state
        .requests
        .list()
        .map_err(|e| pa_error("Export reports", e))?;
    let csv = pa_core::export_csv(&requests).map_err(|e| pa_error("Export reports", e))?;
    let disposition = format!(
        "attachment; filename=\"pa-requests-{}.csv\"",
        chrono::Utc::now().format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Method;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    struct OfflineSummariser;

    impl Summariser for OfflineSummariser {
        fn summarise(&self, _text: &str) -> PaResult<ClinicalNote> {
            Err(PaError::ServiceUnavailable("upstream model unreachable".into()))
        }
    }

    fn state() -> AppState {
        AppState::from_config(Arc::new(CoreConfig::default()), KEY).unwrap()
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
        let builder = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(API_KEY_HEADER, KEY)
            .header(header::CONTENT_TYPE, "application/json");
        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: axum::http::Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, req: axum::http::Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, req).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        let app = router(state());
        let req = axum::http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn protected_routes_require_key() {
        let app = router(state());

        let req = axum::http::Request::builder()
            .uri("/requests")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = axum::http::Request::builder()
            .uri("/requests")
            .header(API_KEY_HEADER, "wrong")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn prepare_pa_returns_draft() {
        let app = router(state());
        let body = json!({
            "payer": "Discovery",
            "procedure_code": "TKR",
            "soap": { "assessment": "Severe osteoarthritis of right knee" },
            "transcript": "The patient is a 65 year old..."
        });

        let (status, body) = send_json(&app, request(Method::POST, "/prepare-pa", Some(body))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fields"]["patient_age"], "65");
        assert_eq!(body["fields"]["diagnosis"], "Severe osteoarthritis of right knee");
        assert_eq!(body["confidence"]["patient_age"], "high");
        assert_eq!(body["confidence"]["imaging_findings"], "low");
        assert!(body["missing"]
            .as_array()
            .unwrap()
            .contains(&json!("Imaging Findings")));
        assert!(body["draft"]
            .as_str()
            .unwrap()
            .contains("Medical Aid: Discovery"));
    }

    #[tokio::test]
    async fn prepare_pa_rejects_unknown_payer_and_missing_note() {
        let app = router(state());

        let body = json!({ "payer": "Acme", "procedure_code": "TKR", "soap": {} });
        let (status, body) = send_json(&app, request(Method::POST, "/prepare-pa", Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Acme"));

        let body = json!({ "payer": "Discovery", "procedure_code": "TKR" });
        let (status, _) = send(&app, request(Method::POST, "/prepare-pa", Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn summarize_parses_labelled_text() {
        let app = router(state());
        let body = json!({ "text": "SUBJECTIVE: knee pain\nASSESSMENT: osteoarthritis" });

        let (status, body) = send_json(&app, request(Method::POST, "/summarize", Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subjective"], "knee pain");
        assert_eq!(body["assessment"], "osteoarthritis");

        let (status, _) = send(
            &app,
            request(Method::POST, "/summarize", Some(json!({ "text": "  " }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn summarize_reports_outage_as_unavailable() {
        let base = state();
        let offline = AppState::new(
            Arc::new(CoreConfig::default()),
            base.rules().clone(),
            RequestService::in_memory(),
            Arc::new(OfflineSummariser),
            KEY,
        );
        let app = router(offline);

        let body = json!({ "text": "Doctor: how are you feeling?" });
        let (status, _) = send(&app, request(Method::POST, "/summarize", Some(body))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn rules_can_be_read_and_replaced() {
        let app = router(state());

        let (status, body) = send_json(&app, request(Method::GET, "/admin/rules", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 1);
        assert!(body["rules"]["payers"]["Discovery"]["procedures"]["TKR"].is_object());

        let invalid = json!({ "payers": {} });
        let (status, _) = send(&app, request(Method::PUT, "/admin/rules", Some(invalid))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let valid = json!({
            "payers": {
                "Bonitas": {
                    "procedures": {
                        "THR": { "name": "Total Hip Replacement", "requirements": ["Diagnosis"] }
                    }
                }
            }
        });
        let (status, body) = send_json(&app, request(Method::PUT, "/admin/rules", Some(valid))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 2);

        let prepare = json!({ "payer": "Bonitas", "procedure_code": "THR", "soap": {} });
        let (status, body) = send_json(&app, request(Method::POST, "/prepare-pa", Some(prepare))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["missing"], json!(["Diagnosis"]));
    }

    #[tokio::test]
    async fn request_lifecycle() {
        let app = router(state());

        let create = json!({
            "payer": "Discovery",
            "procedure_code": "TKR",
            "patient_name": "Jane Doe"
        });
        let (status, created) = send_json(&app, request(Method::POST, "/requests", Some(create))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "draft");
        assert_eq!(created["specialty"], "orthopedics");
        let id = created["id"].as_str().unwrap().to_string();

        let approve = json!({ "status": "approved" });
        let (status, _) = send(
            &app,
            request(Method::PUT, &format!("/requests/{id}/status"), Some(approve.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            request(
                Method::PUT,
                &format!("/requests/{id}/status"),
                Some(json!({ "status": "pending" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(
            &app,
            request(Method::PUT, &format!("/requests/{id}/status"), Some(approve)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "approved");

        let (status, body) = send_json(&app, request(Method::GET, &format!("/requests/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "approved");

        let (status, body) = send_json(&app, request(Method::GET, "/requests", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requests"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let app = router(state());
        let uri = format!("/requests/{}", Uuid::new_v4());
        let (status, _) = send(&app, request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn materials_are_attached_and_listed() {
        let app = router(state());
        let (_, created) = send_json(
            &app,
            request(
                Method::POST,
                "/requests",
                Some(json!({ "payer": "Discovery", "procedure_code": "THR" })),
            ),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        let uri = format!("/requests/{id}/materials");

        let material = json!({ "kind": "transcript", "content": { "text": "hello" } });
        let (status, body) = send_json(&app, request(Method::POST, &uri, Some(material))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["kind"], "transcript");

        let bad = json!({ "kind": "video", "content": {} });
        let (status, _) = send(&app, request(Method::POST, &uri, Some(bad))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(&app, request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["materials"][0]["content"]["text"], "hello");
    }

    #[tokio::test]
    async fn reports_and_export() {
        let app = router(state());
        for code in ["TKR", "THR"] {
            send(
                &app,
                request(
                    Method::POST,
                    "/requests",
                    Some(json!({ "payer": "Discovery", "procedure_code": code })),
                ),
            )
            .await;
        }

        let (status, body) = send_json(&app, request(Method::GET, "/reports", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_requests"], 2);
        assert_eq!(body["requests_this_week"], 2);
        assert_eq!(body["total_minutes_saved"], 30);
        assert_eq!(body["requests_by_payer"][0]["key"], "Discovery");

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/reports/export", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("Request ID,Patient Name"));
    }

    #[tokio::test]
    async fn chat_answers_from_materials_with_citations() {
        let app = router(state());
        let (_, created) = send_json(
            &app,
            request(
                Method::POST,
                "/requests",
                Some(json!({ "payer": "Discovery", "procedure_code": "TKR" })),
            ),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let transcript = json!({
            "kind": "transcript",
            "content": "Patient: The knee pain keeps me up at night. Doctor: Any injections?"
        });
        send(
            &app,
            request(Method::POST, &format!("/requests/{id}/materials"), Some(transcript)),
        )
        .await;

        let uri = format!("/requests/{id}/chat");
        let (status, body) = send_json(
            &app,
            request(Method::POST, &uri, Some(json!({ "question": "Describe the pain" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["answer"],
            "[transcript] Patient: The knee pain keeps me up at night"
        );
        assert_eq!(body["citations"][0]["source"], "transcript");
        assert!(body["citations"][0]["excerpt"]
            .as_str()
            .unwrap()
            .starts_with("Patient: The knee pain"));

        let (status, body) = send_json(
            &app,
            request(Method::POST, &uri, Some(json!({ "question": "Body mass index?" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], pa_core::constants::NO_ANSWER_FOUND);
        assert_eq!(body["citations"], json!([]));

        let (status, _) = send(
            &app,
            request(Method::POST, &uri, Some(json!({ "question": " " }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = format!("/requests/{}/chat", Uuid::new_v4());
        let (status, _) = send(
            &app,
            request(Method::POST, &missing, Some(json!({ "question": "pain?" }))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn settings_drive_report_minutes() {
        let app = router(state());

        let (status, body) = send_json(&app, request(Method::GET, "/admin/settings", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["baseline_minutes"], 15);
        assert_eq!(body["retention_days"], 180);

        let update = json!({ "name": "Cape Joint Clinic", "retention_days": 90, "baseline_minutes": 40 });
        let (status, body) = send_json(&app, request(Method::PUT, "/admin/settings", Some(update))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Cape Joint Clinic");

        let invalid = json!({ "name": "", "retention_days": 90, "baseline_minutes": 40 });
        let (status, _) = send(&app, request(Method::PUT, "/admin/settings", Some(invalid))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(
            &app,
            request(
                Method::POST,
                "/requests",
                Some(json!({ "payer": "Discovery", "procedure_code": "TKR" })),
            ),
        )
        .await;
        let (_, body) = send_json(&app, request(Method::GET, "/reports", None)).await;
        assert_eq!(body["total_minutes_saved"], 40);
    }
}
