//! Mapping of failures to JSON error responses.

use std::borrow::Cow;

use ricette_blog::Error;
use salvo::http::{ParseError, StatusCode};
use salvo::Scribe;
use salvo::prelude::*;
use serde::Serialize;

pub(crate) const GENERIC_MESSAGE: &str = "Si è verificato un errore. Riprova più tardi.";
pub(crate) const NOT_FOUND_MESSAGE: &str = "Risorsa non trovata.";
pub(crate) const AUTH_REQUIRED: &str = "Le credenziali di autenticazione non sono state fornite.";
pub(crate) const PERMISSION_DENIED: &str = "Non hai il permesso di eseguire questa azione.";
pub(crate) const BAD_REQUEST: &str = "Richiesta non valida.";
const MAX_MESSAGE_LEN: usize = 200;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: Option<&'a str>,
}

/// An error answered to the client as `{"error": <message>, "detail": null}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub(crate) fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub(crate) fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, PERMISSION_DENIED)
    }

    pub(crate) fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    }

    pub(crate) fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE)
    }

    /// Status code of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Message shown to the client.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { message, .. } if message.chars().count() > MAX_MESSAGE_LEN => {
                tracing::info!(%message, "validation message too long for the client");
                Self::bad_request(GENERIC_MESSAGE)
            }
            Error::Validation { message, .. } | Error::Conflict(message) => Self::bad_request(message),
            Error::Unauthorized(message) => Self::unauthorized(message),
            Error::Forbidden(message) => Self::new(StatusCode::FORBIDDEN, message),
            Error::NotFound => Self::not_found(),
            err => {
                tracing::error!(error = ?err, "request failed");
                Self::internal()
            }
        }
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        tracing::info!(error = %err, "malformed request body");
        Self::bad_request(BAD_REQUEST)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err).into()
    }
}

impl Scribe for ApiError {
    fn render(self, res: &mut Response) {
        res.status_code(self.status);
        res.render(Json(ErrorBody {
            error: &self.message,
            detail: None,
        }));
    }
}

fn status_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => NOT_FOUND_MESSAGE,
        StatusCode::UNAUTHORIZED => AUTH_REQUIRED,
        StatusCode::FORBIDDEN => PERMISSION_DENIED,
        StatusCode::METHOD_NOT_ALLOWED => "Metodo non consentito.",
        StatusCode::PAYLOAD_TOO_LARGE => "La richiesta è troppo grande.",
        status if status.is_server_error() => GENERIC_MESSAGE,
        _ => BAD_REQUEST,
    }
}

/// Catcher hoop rendering framework errors (unmatched routes, rejected tokens, panics)
/// in the same shape as [`ApiError`].
#[handler]
pub(crate) async fn json_errors(res: &mut Response, ctrl: &mut FlowCtrl) {
    let status = res.status_code.unwrap_or(StatusCode::NOT_FOUND);
    if !(status.is_client_error() || status.is_server_error()) {
        return;
    }
    if !(res.body.is_none() || res.body.is_error()) {
        return;
    }
    if status.is_server_error() {
        tracing::error!(%status, "request failed inside the framework");
    }
    ApiError::new(status, status_message(status)).render(res);
    ctrl.skip_rest();
}
