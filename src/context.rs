use std::convert::Infallible;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use axum::http::uri::Authority;

use cloudprobe_gcp::HttpRequestContext;

/// Request-scoped view of the inbound HTTP request, used for host lookups and error reports.
#[derive(Clone, Debug)]
pub struct RequestContext {
    host: Option<String>,
    http_request: HttpRequestContext,
}

impl RequestContext {
    /// The raw `Host` header (or URI authority), port included.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The host name with any port and IPv6 brackets removed.
    pub fn hostname(&self) -> Option<String> {
        self.host().map(strip_port)
    }

    pub fn http_request(&self) -> &HttpRequestContext {
        &self.http_request
    }

    pub fn into_http_request(self) -> HttpRequestContext {
        self.http_request
    }

    fn from_parts(parts: &Parts) -> Self {
        let headers = &parts.headers;
        let header_value = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_owned())
        };

        let host = header_value(header::HOST)
            .or_else(|| parts.uri.authority().map(|authority| authority.to_string()));

        let url = if parts.uri.scheme().is_some() {
            parts.uri.to_string()
        } else {
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("http");
            let path = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            match &host {
                Some(host) => format!("{scheme}://{host}{path}"),
                None => path.to_owned(),
            }
        };

        let remote_ip = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });

        Self {
            http_request: HttpRequestContext {
                method: parts.method.to_string(),
                url,
                user_agent: header_value(header::USER_AGENT),
                referrer: header_value(header::REFERER),
                remote_ip,
            },
            host,
        }
    }
}

fn strip_port(host: &str) -> String {
    let name = host
        .parse::<Authority>()
        .map(|authority| authority.host().to_owned())
        .unwrap_or_else(|_| host.to_owned());
    name.trim_start_matches('[').trim_end_matches(']').to_owned()
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
