use super::{GenovaApi, GenovaConfig, GenovaEndpoint, GenovaError, GenovaForm, GenovaResponse};
use async_trait::async_trait;

/// HTTP transport for the Genova API
#[derive(Debug, Clone)]
pub struct GenovaClient {
    http: reqwest::Client,
    base_url: String,
}

impl GenovaClient {
    pub fn new(config: &GenovaConfig) -> Result<Self, GenovaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenovaError::Build(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, endpoint: GenovaEndpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl GenovaApi for GenovaClient {
    async fn post_form(
        &self,
        endpoint: GenovaEndpoint,
        form: &GenovaForm,
    ) -> Result<GenovaResponse, GenovaError> {
        let url = self.url(endpoint);
        tracing::debug!(url = %url, fields = form.len(), "posting to Genova");

        let response = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| GenovaError::Request {
                endpoint: endpoint.path().to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint = %endpoint, status = status.as_u16(), "Genova rejected request");
            return Err(GenovaError::Status {
                endpoint: endpoint.path().to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<GenovaResponse>()
            .await
            .map_err(|e| GenovaError::Decode {
                endpoint: endpoint.path().to_string(),
                message: e.to_string(),
            })
    }
}
