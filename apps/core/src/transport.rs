use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::contract::{
    ClipboardResponse, CommandResponse, CoreRequest, CoreResponse, ExecuteResponse,
    SubmittedResponse,
};
use crate::core_service::{CoreService, Executed, QueryView, ServiceError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    InvalidRequest,
    NothingSelected,
    Launch,
    Store,
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransportResponse {
    Ok { response: CoreResponse },
    Err { error: ErrorResponse },
}

pub async fn handle_request(service: &CoreService, request: CoreRequest) -> TransportResponse {
    let handled = match request {
        CoreRequest::Search(request) => Ok(view_response(service.search(&request.query).await)),
        CoreRequest::Type(request) => Ok(view_response(service.type_text(&request.query))),
        CoreRequest::Tab(request) => Ok(view_response(service.tab(request.index))),
        CoreRequest::Escape => Ok(view_response(service.escape().await)),
        CoreRequest::Backspace => Ok(view_response(service.backspace().await)),
        CoreRequest::Param(request) => Ok(view_response(service.set_param(&request.param))),
        CoreRequest::Execute(request) => service.execute(request.index).map(executed_response),
        CoreRequest::Clipboard(request) => Ok(CoreResponse::Clipboard(ClipboardResponse {
            captured: service.capture_clipboard(&request.text),
        })),
    };

    match handled {
        Ok(response) => TransportResponse::Ok { response },
        Err(error) => TransportResponse::Err {
            error: map_service_error(error),
        },
    }
}

pub async fn handle_json(service: &CoreService, payload: &str) -> String {
    let response = match serde_json::from_str::<CoreRequest>(payload) {
        Ok(request) => handle_request(service, request).await,
        Err(error) => TransportResponse::Err {
            error: ErrorResponse {
                code: ErrorCode::InvalidJson,
                message: error.to_string(),
            },
        },
    };
    encode(&response)
}

pub fn encode(response: &TransportResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|error| {
        warn!(%error, "failed to encode transport response");
        r#"{"status":"err","error":{"code":"invalid_request","message":"unencodable response"}}"#
            .to_string()
    })
}

pub fn view_response(view: QueryView) -> CoreResponse {
    match view {
        QueryView::Results(outcome) => CoreResponse::Results(outcome.into()),
        QueryView::Command(result) => CoreResponse::Command(CommandResponse {
            result: result.into(),
        }),
        QueryView::Submitted(query_id) => CoreResponse::Submitted(SubmittedResponse { query_id }),
        QueryView::Superseded => CoreResponse::Superseded,
        QueryView::Unchanged => CoreResponse::Unchanged,
    }
}

fn executed_response(executed: Executed) -> CoreResponse {
    CoreResponse::Executed(ExecuteResponse {
        action: executed.payload,
        built_in: executed.built_in.map(str::to_string),
    })
}

fn map_service_error(error: ServiceError) -> ErrorResponse {
    let message = error.to_string();
    let code = match error {
        ServiceError::InvalidRequest(_) => ErrorCode::InvalidRequest,
        ServiceError::NothingSelected => ErrorCode::NothingSelected,
        ServiceError::Launch(_) => ErrorCode::Launch,
        ServiceError::Store(_) => ErrorCode::Store,
        ServiceError::Config(_) => ErrorCode::Config,
    };
    ErrorResponse { code, message }
}
