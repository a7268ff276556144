use std::net::SocketAddr;

use axum::{ extract::{ ConnectInfo, Request }, http::header, middleware::Next, response::Response };

use crate::context::{ self, RequestContext };

/// Creates the request's context and runs everything further down the stack inside it.
///
/// Register it as the outermost application layer so handlers, extractors and the other
/// middleware all see the same instance.
pub async fn request_context(request: Request, next: Next) -> Response {
    let ctx = context_from_request(&request);
    context::run(ctx, next.run(request)).await
}

pub fn context_from_request(request: &Request) -> RequestContext {
    let ip_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let protocol = request.uri().scheme_str().unwrap_or("http").to_string();

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .or_else(|| request.uri().authority().map(|authority| authority.to_string()));

    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let full_url = host.as_ref().map(|host| format!("{}://{}{}", protocol, host, path));

    RequestContext {
        ip_address,
        host,
        full_url,
        path: Some(path),
        http_method: Some(request.method().as_str().to_string()),
        protocol: Some(protocol),
        user_id: None,
    }
}
