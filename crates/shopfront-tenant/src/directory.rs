use async_trait::async_trait;
use reqwest::StatusCode;
use shopfront_client_state::stores::tenant::TenantRecord;

#[derive(Debug, thiserror::Error)]
pub enum TenantFetchError {
    #[error("tenant base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("tenant_request_failed:{message}")]
    Request { message: String },
    #[error("tenant_http_{status}")]
    Http { status: StatusCode },
    #[error("tenant_decode_failed:{message}")]
    Decode { message: String },
}

/// Tenant-info lookup. Failures surface to the caller, which owns retry and
/// degradation policy; nothing here retries or times out beyond the HTTP
/// client's own configuration.
#[async_trait]
pub trait TenantDirectory {
    async fn fetch_info(&self, tenant_id: &str) -> Result<TenantRecord, TenantFetchError>;
}

/// Directory client over the backend's tenant-info endpoint.
#[derive(Debug, Clone)]
pub struct HttpTenantDirectory {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTenantDirectory {
    pub fn new(base_url: &str) -> Result<Self, TenantFetchError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn tenant_info_path(tenant_id: &str) -> String {
        format!("/api/v1/tenants/{}", tenant_id.trim())
    }

    fn endpoint(&self, tenant_id: &str) -> String {
        format!("{}{}", self.base_url, Self::tenant_info_path(tenant_id))
    }
}

#[async_trait]
impl TenantDirectory for HttpTenantDirectory {
    async fn fetch_info(&self, tenant_id: &str) -> Result<TenantRecord, TenantFetchError> {
        let response = self
            .http
            .get(self.endpoint(tenant_id))
            .send()
            .await
            .map_err(|error| TenantFetchError::Request {
                message: error.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TenantFetchError::Http { status });
        }
        response
            .json::<TenantRecord>()
            .await
            .map_err(|error| TenantFetchError::Decode {
                message: error.to_string(),
            })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, TenantFetchError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(TenantFetchError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(TenantFetchError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(TenantFetchError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}
