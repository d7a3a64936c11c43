use std::{convert::Infallible, net::SocketAddr};

use axum::{
	Json, Router,
	body::Bytes,
	extract::{ConnectInfo, FromRequestParts, Path, Query, State},
	http::{HeaderMap, StatusCode, header, request::Parts},
	response::{Html, IntoResponse, Redirect, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{auth, rpc, state::AppState};
use coach_service::{
	Error as ServiceError,
	email_tracking::{TrackEventRequest, UnsubscribeRequest},
};

const DEFAULT_CLICK_TARGET: &str = "https://www.google.com";
const STRIPE_SIGNATURE: &str = "stripe-signature";

/// 1x1 transparent GIF.
pub const TRACKING_PIXEL: [u8; 42] = [
	0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
	0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00,
	0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/trpc/{path}", get(rpc_query).post(rpc_mutation))
		.route("/api/track/open/{tracking_id}", get(track_open))
		.route("/api/track/click/{tracking_id}", get(track_click))
		.route("/unsubscribe/{email}/{token}", get(unsubscribe))
		.route("/api/stripe/webhook", post(stripe_webhook))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct RpcQuery {
	input: Option<String>,
}

async fn rpc_query(
	State(state): State<AppState>,
	Path(path): Path<String>,
	headers: HeaderMap,
	Query(query): Query<RpcQuery>,
) -> Result<Json<Value>, ApiError> {
	let input = match query.input.as_deref().map(str::trim) {
		Some(raw) if !raw.is_empty() => serde_json::from_str(raw).map_err(|err| {
			ApiError::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", format!("Invalid input: {err}."))
		})?,
		_ => Value::Null,
	};

	procedure(&state, &path, &headers, input).await
}

async fn rpc_mutation(
	State(state): State<AppState>,
	Path(path): Path<String>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Json<Value>, ApiError> {
	let input = if body.iter().all(u8::is_ascii_whitespace) {
		Value::Null
	} else {
		serde_json::from_slice(&body).map_err(|err| {
			ApiError::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", format!("Invalid input: {err}."))
		})?
	};

	procedure(&state, &path, &headers, input).await
}

async fn procedure(
	state: &AppState,
	path: &str,
	headers: &HeaderMap,
	input: Value,
) -> Result<Json<Value>, ApiError> {
	let caller = auth::identify(
		&state.service.cfg.security,
		headers,
		OffsetDateTime::now_utc().unix_timestamp(),
	);
	let data = rpc::call(&state.service, caller, path, input).await?;

	Ok(Json(json!({ "result": { "data": data } })))
}

/// Request origin for tracking rows.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}
impl<S> FromRequestParts<S> for ClientMeta
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let forwarded = parts
			.headers
			.get("x-forwarded-for")
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.split(',').next())
			.map(|value| value.trim().to_string())
			.filter(|value| !value.is_empty());
		let ip_address = forwarded.or_else(|| {
			parts
				.extensions
				.get::<ConnectInfo<SocketAddr>>()
				.map(|ConnectInfo(addr)| addr.ip().to_string())
		});
		let user_agent = parts
			.headers
			.get(header::USER_AGENT)
			.and_then(|value| value.to_str().ok())
			.map(str::to_string);

		Ok(Self { ip_address, user_agent })
	}
}

async fn track_open(
	State(state): State<AppState>,
	Path(tracking_id): Path<String>,
	meta: ClientMeta,
) -> Response {
	let req = TrackEventRequest {
		tracking_id,
		user_agent: meta.user_agent,
		ip_address: meta.ip_address,
	};

	match state.service.email_tracking_track_open(req).await {
		Ok(outcome) if !outcome.success => {
			tracing::debug!(error = ?outcome.error, "Open pixel for an unknown tracking id.");
		},
		Ok(_) => {},
		Err(err) => tracing::warn!(error = %err, "Failed to record email open."),
	}

	(
		[
			(header::CONTENT_TYPE, "image/gif"),
			(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, proxy-revalidate"),
			(header::PRAGMA, "no-cache"),
			(header::EXPIRES, "0"),
		],
		TRACKING_PIXEL.as_slice(),
	)
		.into_response()
}

#[derive(Debug, Deserialize)]
struct ClickQuery {
	url: Option<String>,
}

async fn track_click(
	State(state): State<AppState>,
	Path(tracking_id): Path<String>,
	Query(query): Query<ClickQuery>,
	meta: ClientMeta,
) -> Redirect {
	let req = TrackEventRequest {
		tracking_id,
		user_agent: meta.user_agent,
		ip_address: meta.ip_address,
	};

	if let Err(err) = state.service.email_tracking_track_click(req).await {
		tracing::warn!(error = %err, "Failed to record email click.");
	}

	let target = query.url.as_deref().map(str::trim).filter(|url| !url.is_empty());

	Redirect::to(target.unwrap_or(DEFAULT_CLICK_TARGET))
}

async fn unsubscribe(
	State(state): State<AppState>,
	Path((email, token)): Path<(String, String)>,
) -> (StatusCode, Html<String>) {
	match state.service.email_tracking_unsubscribe(UnsubscribeRequest { email, token }).await {
		Ok(outcome) if outcome.success => (
			StatusCode::OK,
			Html(unsubscribe_page(
				"Désinscription confirmée",
				"Vous ne recevrez plus nos emails. Vous pouvez fermer cette page.",
			)),
		),
		Ok(_) => (
			StatusCode::BAD_REQUEST,
			Html(unsubscribe_page(
				"Lien invalide",
				"Ce lien de désinscription est invalide ou a été modifié.",
			)),
		),
		Err(err) => {
			tracing::error!(error = %err, "Unsubscribe failed.");

			(
				StatusCode::INTERNAL_SERVER_ERROR,
				Html(unsubscribe_page(
					"Erreur",
					"Une erreur est survenue. Merci de réessayer plus tard.",
				)),
			)
		},
	}
}

fn unsubscribe_page(title: &str, message: &str) -> String {
	format!(
		"<!DOCTYPE html>\
<html lang=\"fr\"><head><meta charset=\"utf-8\"><title>{title}</title></head>\
<body style=\"font-family: sans-serif; max-width: 480px; margin: 80px auto; text-align: center;\">\
<h1>{title}</h1><p>{message}</p></body></html>"
	)
}

async fn stripe_webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Response {
	let Some(signature) = headers.get(STRIPE_SIGNATURE).and_then(|value| value.to_str().ok())
	else {
		return (
			StatusCode::BAD_REQUEST,
			Json(json!({ "error": "Webhook Error: Missing stripe-signature header" })),
		)
			.into_response();
	};
	let event = match state.service.stripe_verify_event(&body, signature) {
		Ok(event) => event,
		Err(err) => {
			tracing::warn!(error = %err, "Rejected Stripe webhook.");

			return (
				StatusCode::BAD_REQUEST,
				Json(json!({ "error": format!("Webhook Error: {}", err.message()) })),
			)
				.into_response();
		},
	};

	match state.service.stripe_apply_event(event).await {
		Ok(ack) => Json(ack).into_response(),
		Err(err) => {
			tracing::error!(error = %err, "Stripe webhook processing failed.");

			(
				StatusCode::INTERNAL_SERVER_ERROR,
				Json(json!({ "error": "Webhook processing failed" })),
			)
				.into_response()
		},
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	pub fn new(status: StatusCode, error_code: &str, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.to_string(), message: message.into(), fields: None }
	}

	pub fn with_fields(mut self, fields: Vec<String>) -> Self {
		self.fields = Some(fields);

		self
	}

	pub fn internal() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", "Internal error.")
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn fields(&self) -> Option<&[String]> {
		self.fields.as_deref()
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
			ServiceError::Unauthorized { message } =>
				Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
			ServiceError::Forbidden { message } =>
				Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message),
			ServiceError::NotFound { message } =>
				Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
			ServiceError::Conflict { message } =>
				Self::new(StatusCode::CONFLICT, "CONFLICT", message),
			ServiceError::Provider { message } =>
				Self::new(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message),
			ServiceError::Storage { message } => {
				tracing::error!(%message, "Storage error.");

				Self::internal()
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tracking_pixel_is_a_gif() {
		assert!(TRACKING_PIXEL.starts_with(b"GIF89a"));
		assert_eq!(TRACKING_PIXEL.last(), Some(&0x3b));
	}

	#[test]
	fn service_errors_map_to_http_statuses() {
		let cases = [
			(ServiceError::InvalidRequest { message: "bad".to_string() }, StatusCode::BAD_REQUEST),
			(ServiceError::Unauthorized { message: "no".to_string() }, StatusCode::UNAUTHORIZED),
			(ServiceError::NotFound { message: "gone".to_string() }, StatusCode::NOT_FOUND),
			(ServiceError::Conflict { message: "dup".to_string() }, StatusCode::CONFLICT),
			(ServiceError::Provider { message: "smtp".to_string() }, StatusCode::BAD_GATEWAY),
		];

		for (err, status) in cases {
			assert_eq!(ApiError::from(err).status(), status);
		}
	}

	#[test]
	fn storage_errors_do_not_leak_details() {
		let err = ApiError::from(ServiceError::Storage { message: "relation missing".to_string() });

		assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(err.message(), "Internal error.");
	}
}
