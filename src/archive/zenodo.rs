use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use tracing::{debug, info};

use super::{ArchiveRegistry, Deposition, DepositionFile, DepositionMetadata};
use crate::error::{ReleaseNotesError, Result};

const SERVICE: &str = "zenodo";
const SEARCH_SIZE: &str = "100";

/// Blocking client for the Zenodo deposition REST API.
///
/// The access token travels as the `access_token` query parameter. Server
/// errors are returned as [ReleaseNotesError::RemoteService] and never retried.
pub struct ZenodoClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl ZenodoClient {
    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self> {
        let client = Client::builder().user_agent("git-release-notes").build()?;
        Ok(ZenodoClient {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.query(&[("access_token", token.as_str())]),
            None => builder,
        }
    }

    fn send(&self, what: &str, builder: RequestBuilder) -> Result<Value> {
        debug!("{}", what);
        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReleaseNotesError::remote(
                SERVICE,
                status.as_u16(),
                format!("{}: {}", what, body.trim()),
            ));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Ok(response.json()?)
    }

    fn send_as<T: DeserializeOwned>(&self, what: &str, builder: RequestBuilder) -> Result<T> {
        Ok(serde_json::from_value(self.send(what, builder)?)?)
    }

    fn depositions_url(&self) -> String {
        format!("{}/deposit/depositions", self.api_url)
    }
}

impl ArchiveRegistry for ZenodoClient {
    fn find_deposition(&mut self, title: &str) -> Result<Option<Deposition>> {
        let url = self.depositions_url();
        let builder = self
            .request(Method::GET, &url)
            .query(&[("q", title), ("page", "1"), ("size", SEARCH_SIZE)]);
        let found: Vec<Deposition> = self.send_as(&format!("GET {}", url), builder)?;

        if let Some(exact) = found.iter().find(|d| d.title() == Some(title)) {
            return Ok(Some(exact.clone()));
        }
        if !found.is_empty() {
            info!("No exact match for {}; found:", title);
            for d in &found {
                info!("- {}: {}", d.title().unwrap_or("(untitled)"), d.html_url());
            }
        }
        Ok(None)
    }

    fn create_deposition(&mut self, metadata: &DepositionMetadata) -> Result<Deposition> {
        let url = self.depositions_url();
        let builder = self
            .request(Method::POST, &url)
            .json(&json!({ "metadata": metadata }));
        let deposition: Deposition = self.send_as(&format!("POST {}", url), builder)?;
        info!(
            "Created deposition {} at {}: {}",
            deposition.id,
            deposition.html_url(),
            metadata.title
        );
        Ok(deposition)
    }

    fn get_deposition(&mut self, id: u64) -> Result<Deposition> {
        let url = format!("{}/{}", self.depositions_url(), id);
        let builder = self.request(Method::GET, &url);
        self.send_as(&format!("GET {}", url), builder)
    }

    fn create_new_version(&mut self, deposition: &Deposition) -> Result<Option<Deposition>> {
        if deposition.is_draft() {
            return Ok(None);
        }
        let url = deposition.require_link("newversion")?.to_string();
        let builder = self.request(Method::POST, &url).json(&json!({}));
        let result: Deposition = self.send_as(&format!("POST {}", url), builder)?;

        // The response describes the parent; the new draft hangs off it
        let draft_url = result
            .link("latest_draft")
            .filter(|_| result.id == deposition.id)
            .map(str::to_string);
        let draft = match draft_url {
            Some(draft_url) => {
                let builder = self.request(Method::GET, &draft_url);
                self.send_as(&format!("GET {}", draft_url), builder)?
            }
            None => result,
        };
        info!("Created new version {}: {}", draft.id, draft.html_url());
        Ok(Some(draft))
    }

    fn update(
        &mut self,
        deposition: &Deposition,
        metadata: &DepositionMetadata,
    ) -> Result<Deposition> {
        let url = deposition.require_link("self")?.to_string();
        let builder = self
            .request(Method::PUT, &url)
            .json(&json!({ "metadata": metadata }));
        let updated: Deposition = self.send_as(&format!("PUT {}", url), builder)?;
        info!("Updated deposition at {}: {}", updated.html_url(), metadata.title);
        Ok(updated)
    }

    fn upload(&mut self, deposition: &Deposition, content: &[u8], name: &str) -> Result<Value> {
        let bucket = deposition.require_link("bucket")?;
        let url = format!("{}/{}", bucket.trim_end_matches('/'), name);
        let builder = self
            .request(Method::PUT, &url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content.to_vec());
        let uploaded = self.send(&format!("PUT {}", url), builder)?;
        let key = uploaded.get("key").and_then(Value::as_str).unwrap_or(name);
        let version_id = uploaded
            .get("version_id")
            .and_then(Value::as_str)
            .unwrap_or("?");
        info!("Uploaded {}: version {}", key, version_id);
        Ok(uploaded)
    }

    fn get_files(&mut self, deposition: &Deposition) -> Result<Vec<DepositionFile>> {
        if !deposition.files.is_empty() {
            return Ok(deposition.files.clone());
        }
        let Some(url) = deposition.link("files") else {
            return Ok(Vec::new());
        };
        let url = url.to_string();
        let builder = self.request(Method::GET, &url);
        let files: Option<Vec<DepositionFile>> = self.send_as(&format!("GET {}", url), builder)?;
        Ok(files.unwrap_or_default())
    }

    fn delete_file(&mut self, file: &DepositionFile) -> Result<()> {
        let url = file
            .link("self")
            .ok_or_else(|| {
                ReleaseNotesError::schema(format!("file {} has no 'self' link", file.filename))
            })?
            .to_string();
        let builder = self.request(Method::DELETE, &url);
        self.send(&format!("DELETE {}", url), builder)?;
        info!("Deleted {}", file.filename);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> ZenodoClient {
        // Port 9 (discard) makes any network access fail fast
        ZenodoClient::new("http://127.0.0.1:9/api/", Some("token")).unwrap()
    }

    fn deposition(state: &str, links: Value) -> Deposition {
        serde_json::from_value(json!({
            "id": 1,
            "state": state,
            "metadata": {"title": "proj 0.6.1"},
            "links": links,
        }))
        .unwrap()
    }

    #[test]
    fn test_draft_has_no_new_version() {
        let mut client = offline();
        let draft = deposition("unsubmitted", json!({}));
        assert!(client.create_new_version(&draft).unwrap().is_none());
    }

    #[test]
    fn test_missing_link_is_schema_error() {
        let mut client = offline();
        let published = deposition("done", json!({}));
        let err = client.create_new_version(&published).unwrap_err();
        assert!(matches!(err, ReleaseNotesError::Schema(_)));
    }

    #[test]
    fn test_embedded_files_need_no_request() {
        let mut client = offline();
        let mut dep = deposition("done", json!({}));
        dep.files = vec![DepositionFile {
            filename: "proj.tar.gz".to_string(),
            links: Default::default(),
        }];
        let files = client.get_files(&dep).unwrap();
        assert_eq!(files[0].filename, "proj.tar.gz");
    }

    #[test]
    fn test_transport_failure_is_transient() {
        let mut client = offline();
        assert_eq!(client.depositions_url(), "http://127.0.0.1:9/api/deposit/depositions");
        let err = client.get_deposition(3).unwrap_err();
        assert!(err.is_transient());
    }
}
