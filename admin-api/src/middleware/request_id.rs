use axum::http::{HeaderName, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Ensure every request carries an `x-request-id`, minting one when the
/// caller did not supply it, and echo it on the response so log lines and
/// client reports can be correlated.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = match req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .filter(|value| !value.is_empty())
    {
        Some(value) => value.clone(),
        None => {
            let minted = HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("-"));
            req.headers_mut()
                .insert(&REQUEST_ID_HEADER, minted.clone());
            minted
        }
    };

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(&REQUEST_ID_HEADER, request_id);
    response
}
