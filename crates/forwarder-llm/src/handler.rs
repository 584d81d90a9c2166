//! Axum route handlers for the `OpenAI`-compatible chat, responses and
//! models endpoints

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing};
use forwarder_core::{HttpError, RequestContext};
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};

use crate::error::LlmError;
use crate::normalize::{normalize, unix_now};
use crate::protocol::openai::{OpenAiModel, OpenAiModelList, OpenAiRequest, OpenAiResponse};
use crate::protocol::responses::{ResponsesRequest, ResponsesStreamEvent};
use crate::responses::{ResponsesStreamTranslator, to_response_object};
use crate::state::{ChatReply, LlmState};
use crate::stream::{ChatFrame, ChatStreamTranslator, translate};
use crate::types::CompletionRequest;

/// Build the router for chat completions, responses and model listing
pub fn llm_router(state: LlmState) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(chat_completions))
        .route("/v1/responses", routing::post(responses))
        .route("/v1/models", routing::get(list_models))
        .with_state(state)
}

/// Handle `POST /v1/chat/completions`
async fn chat_completions(
    State(state): State<LlmState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<OpenAiRequest>, JsonRejection>,
) -> Response {
    let wire_request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&LlmError::InvalidRequest(rejection.body_text())),
    };

    let model = wire_request.model.clone();
    let is_stream = wire_request.stream.unwrap_or(false);
    let request = CompletionRequest::from(wire_request);

    if is_stream {
        match state.complete_stream(request, &context).await {
            Ok((cap, reply)) => chat_stream_response(ChatStreamTranslator::new(model, &cap), reply).into_response(),
            Err(e) => error_response(&e),
        }
    } else {
        match state.complete(request, &context).await {
            Ok((cap, reply)) => Json(OpenAiResponse::from(normalize(reply, &cap, &model))).into_response(),
            Err(e) => error_response(&e),
        }
    }
}

/// Handle `POST /v1/responses`
async fn responses(
    State(state): State<LlmState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<ResponsesRequest>, JsonRejection>,
) -> Response {
    let wire_request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&LlmError::InvalidRequest(rejection.body_text())),
    };

    let model = wire_request.model.clone();
    let is_stream = wire_request.stream.unwrap_or(false);
    let request = match CompletionRequest::try_from(wire_request) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    if is_stream {
        match state.complete_stream(request, &context).await {
            Ok((cap, reply)) => {
                responses_stream_response(ResponsesStreamTranslator::new(model, &cap), reply).into_response()
            }
            Err(e) => error_response(&e),
        }
    } else {
        match state.complete(request, &context).await {
            Ok((cap, reply)) => Json(to_response_object(reply, &cap, &model)).into_response(),
            Err(e) => error_response(&e),
        }
    }
}

/// Handle `GET /v1/models`
async fn list_models(State(state): State<LlmState>) -> Json<OpenAiModelList> {
    let created = unix_now();

    let data = state
        .registry()
        .entries()
        .map(|cap| OpenAiModel {
            id: cap.model_id.clone(),
            object: "model".to_owned(),
            created,
            owned_by: state.owner_of(cap).unwrap_or("forwarder").to_owned(),
        })
        .collect();

    Json(OpenAiModelList {
        object: "list".to_owned(),
        data,
    })
}

/// SSE body for a chat stream, native or replayed
fn chat_stream_response(
    translator: ChatStreamTranslator,
    reply: ChatReply,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let frames: BoxStream<'static, ChatFrame> = match reply {
        ChatReply::Stream(events) => translate(events, translator).boxed(),
        ChatReply::Complete(reply) => stream::iter(translator.replay(reply)).boxed(),
    };

    let events = frames.map(|frame| {
        frame
            .data()
            .map(|data| Event::default().data(data))
            .map_err(axum::Error::new)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// SSE body for a Responses stream; each event is named after its `type`
fn responses_stream_response(
    translator: ResponsesStreamTranslator,
    reply: ChatReply,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events: BoxStream<'static, ResponsesStreamEvent> = match reply {
        ChatReply::Stream(events) => translate(events, translator).boxed(),
        ChatReply::Complete(reply) => stream::iter(translator.replay(reply)).boxed(),
    };

    let events = events.map(|event| Event::default().event(event.event_type()).json_data(&event));

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Render an error as an `OpenAI` error envelope
fn error_response(error: &LlmError) -> Response {
    let status = error.status_code();

    if status.is_server_error() {
        tracing::error!(error = %error, "request failed");
    } else {
        tracing::debug!(error = %error, "request rejected");
    }

    (status, Json(error.to_body())).into_response()
}
