use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::ServiceError;

/// JSON body extractor whose rejections render as the error envelope
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as the error envelope
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServiceError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections render as the error envelope
#[derive(Debug, Clone, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct ApiQuery<T>(pub T);
