use axum::{
    extract::Request,
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

/// Bearer credential from the `Authorization` header, when one was sent.
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Self(token)
    }
}

/// Never rejects: routes without a bearer just see `BearerToken(None)`.
pub async fn bearer(mut req: Request, next: Next) -> Response {
    let token = BearerToken::from_headers(req.headers());
    req.extensions_mut().insert(token);

    next.run(req).await
}
