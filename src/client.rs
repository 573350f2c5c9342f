use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, Response};
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::csrf::{CookieTokenSource, MetaTokenSource, TokenChain, TokenSource};
use crate::errors::{ClientError, RequestFailure};
use crate::response::{
    content_disposition_filename, decode_body, failure_message, Download, RequestOutcome,
    ResponseBody, Success,
};

#[derive(Debug)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Text(String),
    /// Content type, including the boundary, is left to reqwest.
    Multipart(Form),
}

impl RequestBody {
    fn is_json(&self) -> bool {
        matches!(self, RequestBody::Json(_))
    }
}

/// HTTP client for the FinBot web app.
///
/// Every call is independent: no retries, no timeouts and no coalescing of
/// identical concurrent requests. Cookies (session and CSRF) are kept in a
/// shared jar and sent with every request.
#[derive(Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    base_url: Url,
    jar: Arc<Jar>,
    meta_token: Arc<MetaTokenSource>,
    tokens: TokenChain,
    csrf_header: HeaderName,
    session_cookie: String,
}

impl RequestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(config.base_url()).map_err(|source| ClientError::InvalidBaseUrl {
            url: config.base_url().to_string(),
            source,
        })?;
        let csrf_header = HeaderName::from_bytes(config.csrf_header_name().as_bytes())
            .map_err(|_| ClientError::InvalidHeader(config.csrf_header_name().to_string()))?;

        let jar = Arc::new(Jar::default());
        let mut builder = reqwest::Client::builder().cookie_provider(Arc::clone(&jar));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        let http = builder.build()?;

        let meta_token = Arc::new(MetaTokenSource::new(config.csrf_meta_name()));
        let cookie_token = Arc::new(CookieTokenSource::new(
            Arc::clone(&jar),
            config.csrf_cookie_name(),
            base_url.clone(),
        ));
        let tokens = TokenChain::new()
            .with(Arc::clone(&meta_token) as Arc<dyn TokenSource>)
            .with(cookie_token);

        log::debug!("Request client ready for {}", base_url);

        Ok(Self {
            http,
            base_url,
            jar,
            meta_token,
            tokens,
            csrf_header,
            session_cookie: config.session_cookie_name().to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    /// The page-level token; set it from a rendered page's meta tag.
    pub fn meta_token(&self) -> &Arc<MetaTokenSource> {
        &self.meta_token
    }

    /// Seeds the jar with an existing session, e.g. one copied from a browser.
    pub fn set_session(&self, session_id: &str) {
        let cookie = format!("{}={}; Path=/", self.session_cookie, session_id);
        self.jar.add_cookie_str(&cookie, &self.base_url);
        log::debug!("Session cookie {} set for {}", self.session_cookie, self.base_url);
    }

    pub fn resolve(&self, endpoint: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(endpoint)
            .map_err(|source| ClientError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        headers: HeaderMap,
        body: RequestBody,
    ) -> RequestOutcome {
        let response = self.send(endpoint, method, headers, body, "application/json").await?;

        let status = response.status();
        let headers = response.headers().clone();
        let raw = response
            .bytes()
            .await
            .map_err(|e| RequestFailure::transport(format!("Failed to read response body: {}", e)))?;

        let data = decode_body(&headers, &raw).map_err(|failure| {
            log::warn!("{} from {}", failure.message, endpoint);
            failure
        })?;

        if !status.is_success() {
            let failure = RequestFailure {
                message: failure_message(status, &data),
                status_code: status.as_u16(),
                payload: Some(data),
            };
            log::debug!("{} failed with {}: {}", endpoint, failure.status_code, failure.message);
            return Err(failure);
        }

        Ok(Success {
            data,
            status_code: status.as_u16(),
            headers,
        })
    }

    pub async fn get(&self, endpoint: &str) -> RequestOutcome {
        self.request(endpoint, Method::GET, HeaderMap::new(), RequestBody::Empty)
            .await
    }

    pub async fn post(&self, endpoint: &str, body: &Value) -> RequestOutcome {
        self.request(endpoint, Method::POST, HeaderMap::new(), RequestBody::Json(body.clone()))
            .await
    }

    pub async fn put(&self, endpoint: &str, body: &Value) -> RequestOutcome {
        self.request(endpoint, Method::PUT, HeaderMap::new(), RequestBody::Json(body.clone()))
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> RequestOutcome {
        self.request(endpoint, Method::DELETE, HeaderMap::new(), RequestBody::Empty)
            .await
    }

    pub async fn upload(&self, endpoint: &str, form: Form) -> RequestOutcome {
        self.request(endpoint, Method::POST, HeaderMap::new(), RequestBody::Multipart(form))
            .await
    }

    /// Fetches a file as raw bytes. The body is never decoded on success;
    /// writing it somewhere is up to the caller.
    pub async fn download(&self, endpoint: &str) -> Result<Download, RequestFailure> {
        let response = self
            .send(endpoint, Method::GET, HeaderMap::new(), RequestBody::Empty, "*/*")
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let raw = response
            .bytes()
            .await
            .map_err(|e| RequestFailure::transport(format!("Failed to read download: {}", e)))?;

        if !status.is_success() {
            let payload = decode_body(&headers, &raw)
                .unwrap_or_else(|_| ResponseBody::Bytes(raw.clone()));
            return Err(RequestFailure {
                message: failure_message(status, &payload),
                status_code: status.as_u16(),
                payload: Some(payload),
            });
        }

        let download = Download {
            filename: content_disposition_filename(&headers),
            content_type: headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            status_code: status.as_u16(),
            bytes: raw,
        };
        log::debug!("Downloaded {} bytes from {}", download.bytes.len(), endpoint);
        Ok(download)
    }

    async fn send(
        &self,
        endpoint: &str,
        method: Method,
        headers: HeaderMap,
        body: RequestBody,
        accept: &'static str,
    ) -> Result<Response, RequestFailure> {
        let url = self.resolve(endpoint).map_err(|e| {
            log::error!("{}", e);
            RequestFailure::transport(e.to_string())
        })?;
        let headers = self.merge_headers(&method, headers, body.is_json(), accept);

        log::debug!("{} {}", method, url);
        let mut builder = self.http.request(method.clone(), url.clone()).headers(headers);
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        builder.send().await.map_err(|e| {
            log::error!("{} {} failed: {}", method, url, e);
            RequestFailure::transport(e.to_string())
        })
    }

    /// Client defaults first, caller headers last so the caller wins.
    fn merge_headers(
        &self,
        method: &Method,
        caller: HeaderMap,
        json_body: bool,
        accept: &'static str,
    ) -> HeaderMap {
        let mut merged = HeaderMap::new();
        merged.insert(ACCEPT, HeaderValue::from_static(accept));
        if json_body {
            merged.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if method != Method::GET {
            match self.tokens.token() {
                Some(token) => match HeaderValue::from_str(&token) {
                    Ok(value) => {
                        merged.insert(self.csrf_header.clone(), value);
                    }
                    Err(_) => log::warn!("Ignoring CSRF token that is not a valid header value"),
                },
                None => log::debug!("No CSRF token available for {} request", method),
            }
        }

        for name in caller.keys() {
            merged.remove(name);
        }
        for (name, value) in caller.iter() {
            merged.append(name.clone(), value.clone());
        }
        merged
    }
}
