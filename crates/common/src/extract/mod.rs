//! Request extractors that reject with `AppError`
//!
//! axum's own `Json`, `Query` and `Path` reject with plain-text bodies. These
//! wrappers run the same extraction and turn the rejection into the standard
//! `{error, message, details?}` body.

use crate::errors::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON request body. Unparsable or mistyped input is a validation error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string. Unparsable parameters are an invalid argument.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters. Unparsable segments are an invalid argument.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
