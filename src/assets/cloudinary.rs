//! Cloudinary backend
//!
//! Listing goes through the Admin search API (basic auth with the API key and
//! secret). Uploads and deletions go through the signed upload API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::Duration;

use super::{
    AssetDescriptor, AssetError, AssetFilter, AssetHost, AssetKind, AssetListRequest, AssetPage,
    AssetResult, UploadSource,
};
use crate::config::AssetHostConfig;

/// Cloudinary asset host
#[derive(Clone, Debug)]
pub struct CloudinaryHost {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

impl CloudinaryHost {
    pub fn new(config: &AssetHostConfig) -> AssetResult<Self> {
        if config.cloud_name.is_empty() || config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(AssetError::Config(
                "cloud_name, api_key and api_secret must be set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AssetError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/{}",
                config.api_base_url.trim_end_matches('/'),
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.trim_matches('/').to_string(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Search expression for a listing request
    fn search_expression(&self, request: &AssetListRequest) -> String {
        let mut clauses = vec![match request.filter {
            AssetFilter::Image => "resource_type:image".to_string(),
            AssetFilter::Video => "resource_type:video".to_string(),
            AssetFilter::All => "(resource_type:image OR resource_type:video)".to_string(),
        }];

        if !self.folder.is_empty() {
            clauses.push(format!("folder:{}/*", self.folder));
        }

        if let Some(query) = request.query.as_deref().map(sanitize_query) {
            if !query.is_empty() {
                clauses.push(format!("(filename:{q}* OR tags:{q})", q = query));
            }
        }

        clauses.join(" AND ")
    }

    /// Signed form fields shared by upload and destroy
    fn signed_form(&self, mut params: Vec<(&'static str, String)>) -> Form {
        params.push(("timestamp", Utc::now().timestamp().to_string()));
        let signature = sign_params(&params, &self.api_secret);

        let mut form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }
        form
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AssetResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AssetError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssetError::Rejected {
                status: status.as_u16(),
                message: error_message(&error_text),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl AssetHost for CloudinaryHost {
    async fn list(&self, request: &AssetListRequest) -> AssetResult<AssetPage> {
        let mut body = json!({
            "expression": self.search_expression(request),
            "max_results": request.page_size(),
            "sort_by": [{ "created_at": "desc" }],
        });
        if let Some(cursor) = &request.cursor {
            body["next_cursor"] = json!(cursor);
        }

        tracing::debug!("Cloudinary search: {}", body);

        let response = self
            .send(
                self.client
                    .post(self.build_url("/resources/search"))
                    .basic_auth(&self.api_key, Some(&self.api_secret))
                    .json(&body),
            )
            .await?;

        let page: SearchResponse = response
            .json()
            .await
            .map_err(|e| AssetError::InvalidResponse(e.to_string()))?;

        Ok(page.into_page())
    }

    async fn upload(&self, source: UploadSource) -> AssetResult<AssetDescriptor> {
        let kind = source.kind();

        let mut params = Vec::new();
        if !self.folder.is_empty() {
            params.push(("folder", self.folder.clone()));
        }
        let form = self.signed_form(params);

        let form = match source {
            UploadSource::File {
                filename,
                content_type,
                data,
            } => {
                let part = Part::bytes(data)
                    .file_name(filename)
                    .mime_str(&content_type)
                    .map_err(|e| AssetError::InvalidResponse(format!("Invalid content type: {}", e)))?;
                form.part("file", part)
            }
            UploadSource::RemoteUrl(url) => form.text("file", url),
        };

        let path = format!("/{}/upload", kind.resource_type());
        let response = self
            .send(self.client.post(self.build_url(&path)).multipart(form))
            .await?;

        let resource: Resource = response
            .json()
            .await
            .map_err(|e| AssetError::InvalidResponse(e.to_string()))?;

        tracing::info!("Uploaded {} to Cloudinary as {}", kind, resource.public_id);
        Ok(resource.into_descriptor())
    }

    async fn delete(&self, public_id: &str, kind: AssetKind) -> AssetResult<bool> {
        let form = self.signed_form(vec![("public_id", public_id.to_string())]);
        let path = format!("/{}/destroy", kind.resource_type());

        let response = self
            .send(self.client.post(self.build_url(&path)).multipart(form))
            .await?;

        let result: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AssetError::InvalidResponse(e.to_string()))?;

        match result.result.as_str() {
            "ok" => Ok(true),
            "not found" => Ok(false),
            other => Err(AssetError::InvalidResponse(format!(
                "Unexpected destroy result: {}",
                other
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}

/// Request signature: SHA-256 hex of the parameters sorted by key, joined as
/// `k=v&k=v`, followed by the API secret. Empty values are not signed.
pub(crate) fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut signed: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    signed.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = signed
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{:x}", Sha256::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
}

/// Keep search terms to characters the expression language treats literally
fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

/// Extract `error.message` from a Cloudinary error body, or return it as is
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    resources: Vec<Resource>,
    next_cursor: Option<String>,
}

impl SearchResponse {
    fn into_page(self) -> AssetPage {
        AssetPage {
            assets: self
                .resources
                .into_iter()
                .filter(|r| matches!(r.resource_type.as_str(), "image" | "video"))
                .map(Resource::into_descriptor)
                .collect(),
            next_cursor: self.next_cursor,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Resource {
    public_id: String,
    #[serde(default = "default_resource_type")]
    resource_type: String,
    secure_url: String,
    format: Option<String>,
    bytes: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<f64>,
    created_at: Option<DateTime<Utc>>,
}

fn default_resource_type() -> String {
    "image".to_string()
}

impl Resource {
    fn into_descriptor(self) -> AssetDescriptor {
        AssetDescriptor {
            kind: self.resource_type.parse().unwrap_or_default(),
            public_id: self.public_id,
            url: self.secure_url,
            format: self.format,
            bytes: self.bytes,
            width: self.width,
            height: self.height,
            duration: self.duration,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn signature_ignores_parameter_order(
            folder in "[a-z]{1,10}",
            timestamp in 1_000_000_000i64..2_000_000_000,
            secret in "[a-zA-Z0-9]{8,20}",
        ) {
            let forward = vec![("folder", folder.clone()), ("timestamp", timestamp.to_string())];
            let backward = vec![("timestamp", timestamp.to_string()), ("folder", folder)];
            prop_assert_eq!(sign_params(&forward, &secret), sign_params(&backward, &secret));
        }
    }
}
