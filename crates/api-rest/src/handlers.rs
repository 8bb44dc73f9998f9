use crate::convert::{capture_res, definition_res, options_res, task_res};
use crate::{error_response, AppState};
use api_shared::auth::{validate_api_key, API_KEY_HEADER};
use api_shared::{
    ConsentCaptureRes, ConsentDefinitionRes, ConsentOptionsRes, ConsentStatusRes, HealthRes,
    HealthService, TaskRes, UpdateTaskStatusReq,
};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use companion_core::{LinkId, TaskStatus};
use companion_types::{DefinitionId, SignerId, TaskId};
use serde::Deserialize;

type HandlerResult<T> = Result<T, (StatusCode, &'static str)>;

fn parse_link_id(link_id: &str) -> HandlerResult<LinkId> {
    LinkId::parse(link_id).map_err(|e| error_response("Parse link id", e))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DefinitionsParams {
    signer_id: Option<String>,
    #[serde(default)]
    incomplete: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/companion/{link_id}/consents/definitions",
    params(
        ("link_id" = String, Path, description = "Companion link id"),
        ("signerId" = u64, Query, description = "Signer the definitions are listed for"),
        ("incomplete" = Option<bool>, Query, description = "Only definitions without a capture")
    ),
    responses(
        (status = 200, description = "Applicable consent definitions", body = [ConsentDefinitionRes]),
        (status = 400, description = "Missing or invalid signerId, or no service line"),
        (status = 404, description = "Unknown companion link or care request"),
        (status = 500, description = "Internal server error")
    )
)]
/// List the consent definitions a signer may sign for the link's episode.
///
/// With `incomplete=true`, definitions already captured for the episode are left out.
#[axum::debug_handler]
pub(crate) async fn get_definitions(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    Query(params): Query<DefinitionsParams>,
) -> HandlerResult<Json<Vec<ConsentDefinitionRes>>> {
    let link_id = parse_link_id(&link_id)?;
    let signer: SignerId = params
        .signer_id
        .as_deref()
        .and_then(|s| s.trim().parse().ok())
        .ok_or((StatusCode::BAD_REQUEST, "signerId must be a number"))?;

    let definitions = state
        .consents
        .definitions_for_link(&link_id, signer, params.incomplete)
        .await
        .map_err(|e| error_response("Get consent definitions", e))?;

    Ok(Json(definitions.iter().map(definition_res).collect()))
}

#[utoipa::path(
    get,
    path = "/companion/{link_id}/consents/options",
    params(("link_id" = String, Path, description = "Companion link id")),
    responses(
        (status = 200, description = "Consent options", body = ConsentOptionsRes),
        (status = 404, description = "Companion link not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_options(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> HandlerResult<Json<ConsentOptionsRes>> {
    let link_id = parse_link_id(&link_id)?;
    let options = state
        .consents
        .options_for_link(&link_id)
        .await
        .map_err(|e| error_response("Get consent options", e))?;
    Ok(Json(options_res(&options)))
}

#[utoipa::path(
    post,
    path = "/companion/{link_id}/consents/captures",
    params(("link_id" = String, Path, description = "Companion link id")),
    request_body(content = api_shared::CreateCaptureForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Consent capture recorded", body = ConsentCaptureRes),
        (status = 400, description = "Missing or invalid form fields, or no service line"),
        (status = 404, description = "Unknown companion link or care request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Record a signed consent and track it on the link's consents task.
#[axum::debug_handler]
pub(crate) async fn create_capture(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    mut multipart: Multipart,
) -> HandlerResult<(StatusCode, Json<ConsentCaptureRes>)> {
    let link_id = parse_link_id(&link_id)?;

    let mut definition_id: Option<DefinitionId> = None;
    let mut signer: Option<SignerId> = None;
    let mut signature_image: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Read multipart field error: {:?}", e);
        (StatusCode::BAD_REQUEST, "Invalid multipart body")
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("definitionId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid multipart body"))?;
                definition_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| (StatusCode::BAD_REQUEST, "definitionId must be a number"))?,
                );
            }
            Some("signer") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid multipart body"))?;
                signer = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| (StatusCode::BAD_REQUEST, "signer must be a number"))?,
                );
            }
            Some("signatureImage") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid multipart body"))?;
                signature_image = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let definition_id =
        definition_id.ok_or((StatusCode::BAD_REQUEST, "definitionId is required"))?;
    let signer = signer.ok_or((StatusCode::BAD_REQUEST, "signer is required"))?;
    let signature_image = signature_image
        .filter(|bytes| !bytes.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "signatureImage is required"))?;

    let capture = state
        .consents
        .create_capture_for_link(&link_id, definition_id, signer, signature_image)
        .await
        .map_err(|e| error_response("Create consent capture", e))?;

    Ok((StatusCode::CREATED, Json(capture_res(&capture))))
}

#[utoipa::path(
    get,
    path = "/companion/{link_id}/consents/status/{consent_type}",
    params(
        ("link_id" = String, Path, description = "Companion link id"),
        ("consent_type" = String, Path, description = "For example MEDICATION_HISTORY_AUTHORITY")
    ),
    responses(
        (status = 200, description = "Upstream consent status", body = ConsentStatusRes),
        (status = 404, description = "Unknown companion link or care request"),
        (status = 500, description = "Internal server error, including unknown consent types")
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_consent_status(
    State(state): State<AppState>,
    Path((link_id, consent_type)): Path<(String, String)>,
) -> HandlerResult<Json<ConsentStatusRes>> {
    let link_id = parse_link_id(&link_id)?;
    let status = state
        .consents
        .consent_status_by_type(&link_id, &consent_type)
        .await
        .map_err(|e| error_response("Get consent status", e))?;

    Ok(Json(ConsentStatusRes {
        consent_type,
        status,
    }))
}

#[utoipa::path(
    put,
    path = "/companion/{link_id}/tasks/{task_id}/status",
    params(
        ("link_id" = String, Path, description = "Companion link id"),
        ("task_id" = u64, Path, description = "Task id"),
        ("x-api-key" = Option<String>, Header, description = "Required when an API key is configured")
    ),
    request_body = UpdateTaskStatusReq,
    responses(
        (status = 200, description = "Task status updated", body = TaskRes),
        (status = 400, description = "Unknown status, or no service line"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Unknown companion link, task or care request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Change a task's status. Completing the consents task propagates signed consents upstream
/// once every required definition has been captured.
#[axum::debug_handler]
pub(crate) async fn update_task_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((link_id, task_id)): Path<(String, u64)>,
    Json(req): Json<UpdateTaskStatusReq>,
) -> HandlerResult<Json<TaskRes>> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    validate_api_key(state.api_key.as_deref(), provided).map_err(|e| {
        tracing::warn!("Update task status rejected: {e}");
        (StatusCode::UNAUTHORIZED, "Invalid API key")
    })?;

    let link_id = parse_link_id(&link_id)?;
    let status: TaskStatus = req
        .status
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "Unknown task status"))?;

    let task = state
        .consents
        .update_task_status(&link_id, TaskId(task_id), status)
        .await
        .map_err(|e| error_response("Update task status", e))?;

    Ok(Json(task_res(&task)))
}
