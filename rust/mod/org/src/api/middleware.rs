//! Identity resolution middleware.
//!
//! Extracts the bearer token from `Authorization: Bearer <token>`,
//! resolves it to an account document, and stores a [`RequestContext`]
//! in request extensions. Requests without a token proceed as
//! anonymous; the access layer decides what anonymous callers may do
//! (public intake resources only). A token that resolves to nothing is
//! rejected here.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use muster_core::{QueryOptions, RequestContext, ServiceError};

use crate::service::{OrgService, USERS_COLLECTION};

pub async fn identity_middleware(
    State(service): State<Arc<OrgService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let ctx = match token {
        Some(token) => {
            let identity = identity_for_token(&service, &token)?
                .ok_or_else(|| ServiceError::Unauthorized("invalid token".into()))?;
            RequestContext::authenticated(identity)
        }
        None => RequestContext::anonymous(),
    };

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Look up the account holding this token and return its id.
fn identity_for_token(
    service: &OrgService,
    token: &str,
) -> Result<Option<String>, ServiceError> {
    let mut filter = serde_json::Map::new();
    filter.insert("token".to_string(), Value::String(token.to_string()));

    let matches = service
        .collection(USERS_COLLECTION)
        .find(&filter, &QueryOptions::default())
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

    Ok(matches
        .into_iter()
        .next()
        .and_then(|doc| doc.get("id").and_then(Value::as_str).map(str::to_string)))
}
