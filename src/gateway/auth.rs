//! Authentication middleware for the gateway.
//!
//! Bearer token authentication for every route. CORS preflight requests
//! pass through untouched.

use crate::config::GatewayConfig;
use crate::error::Error;
use crate::gateway::actix_error::ApiError;

use actix_web::{
    Error as ActixError,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{LocalBoxFuture, Ready, ready};
use std::sync::Arc;

/// Authentication middleware factory
pub struct Authentication {
    config: Arc<GatewayConfig>,
}

impl Authentication {
    /// Create a new Authentication middleware
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self { config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Transform = AuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddleware {
            service,
            config: self.config.clone(),
        }))
    }
}

/// Authentication middleware implementation
pub struct AuthenticationMiddleware<S> {
    service: S,
    config: Arc<GatewayConfig>,
}

impl<S> AuthenticationMiddleware<S> {
    fn expected_token(&self) -> Option<&str> {
        self.config
            .authenticate
            .as_ref()
            .and_then(|auth| auth.bearer.as_ref())
            .map(|bearer| bearer.token.as_str())
    }
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Skip authentication for OPTIONS requests (CORS preflight)
        let authorized = req.method() == "OPTIONS"
            || match self.expected_token() {
                None => true,
                Some(expected) => req
                    .headers()
                    .get("Authorization")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .is_some_and(|token| token == expected),
            };

        if !authorized {
            tracing::warn!(path = %req.path(), "Authentication failed: Invalid or missing bearer token");
            return Box::pin(async move {
                Err(ApiError::from(Error::Unauthorized(
                    "Invalid or missing bearer token".to_string(),
                ))
                .into())
            });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
