use std::path::{Component, Path, PathBuf};

use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tokio::fs;
use walkdir::WalkDir;

use crate::error::StoreError;

/// A flat key space with `/`-separated keys, such as a storage bucket.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// All keys in the store, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StoreError>;
    /// Human-readable location of `key`, for logs.
    fn location(&self, key: &str) -> String;
}

/// A local directory used as a bucket.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for DirStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(|e| StoreError::Io {
                path: self.root.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                keys.push(parts.join("/"));
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        fs::read(&path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        fs::write(&path, body)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    fn location(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}

/// An S3-compatible bucket addressed path-style at `{endpoint}/{bucket}`.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListedObject>,
    #[serde(default)]
    is_truncated: bool,
    next_continuation_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
}

impl HttpStore {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            token,
        }
    }

    fn bucket_url(&self) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|_| StoreError::InvalidEndpoint(self.endpoint.clone()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint(self.endpoint.clone()))?
            .pop_if_empty()
            .push(&self.bucket);
        Ok(url)
    }

    fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        let mut url = self.bucket_url()?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint(self.endpoint.clone()))?
            .extend(key.split('/'));
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<reqwest::Response, StoreError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                url: url.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(StoreError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

impl ObjectStore for HttpStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut url = self.bucket_url()?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("list-type", "2");
                if let Some(token) = &continuation {
                    query.append_pair("continuation-token", token);
                }
            }

            let body = self
                .send(self.client.get(url.clone()), &url)
                .await?
                .text()
                .await
                .map_err(|source| StoreError::Http {
                    url: url.to_string(),
                    source,
                })?;

            let page = parse_listing(&body)?;
            keys.extend(page.contents.into_iter().map(|o| o.key));

            match page.next_continuation_token {
                Some(token) if page.is_truncated => continuation = Some(token),
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.object_url(key)?;
        let bytes = self
            .send(self.client.get(url.clone()), &url)
            .await?
            .bytes()
            .await
            .map_err(|source| StoreError::Http {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        let url = self.object_url(key)?;
        let request = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, content_type)
            .body(body);
        self.send(request, &url).await?;
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("{}/{}/{key}", self.endpoint.trim_end_matches('/'), self.bucket)
    }
}

/// Either store, chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Dir(DirStore),
    Http(HttpStore),
}

impl AnyStore {
    /// An HTTP bucket when an endpoint is configured, otherwise `bucket` is
    /// taken as a local directory.
    pub fn open(
        client: &reqwest::Client,
        endpoint: Option<&str>,
        bucket: &str,
        token: Option<String>,
    ) -> Self {
        match endpoint {
            Some(endpoint) => Self::Http(HttpStore::new(client.clone(), endpoint, bucket, token)),
            None => Self::Dir(DirStore::new(bucket)),
        }
    }
}

impl ObjectStore for AnyStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Dir(s) => s.list().await,
            Self::Http(s) => s.list().await,
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        match self {
            Self::Dir(s) => s.get(key).await,
            Self::Http(s) => s.get(key).await,
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        match self {
            Self::Dir(s) => s.put(key, body, content_type).await,
            Self::Http(s) => s.put(key, body, content_type).await,
        }
    }

    fn location(&self, key: &str) -> String {
        match self {
            Self::Dir(s) => s.location(key),
            Self::Http(s) => s.location(key),
        }
    }
}

fn parse_listing(xml: &str) -> Result<ListBucketResult, StoreError> {
    Ok(quick_xml::de::from_str(xml)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_listing() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>tracks</Name>
  <KeyCount>2</KeyCount>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>abc123</NextContinuationToken>
  <Contents><Key>Hiking/Alps/Day_One.gpx</Key><Size>1024</Size></Contents>
  <Contents><Key>Biking/Jura/Loop.gpx</Key><Size>2048</Size></Contents>
</ListBucketResult>"#;
        let page = parse_listing(xml).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token.as_deref(), Some("abc123"));
        let keys: Vec<_> = page.contents.into_iter().map(|o| o.key).collect();
        assert_eq!(keys, ["Hiking/Alps/Day_One.gpx", "Biking/Jura/Loop.gpx"]);
    }

    #[test]
    fn empty_listing_has_no_contents() {
        let xml = r#"<ListBucketResult><Name>tracks</Name><IsTruncated>false</IsTruncated></ListBucketResult>"#;
        let page = parse_listing(xml).unwrap();
        assert!(page.contents.is_empty());
        assert!(!page.is_truncated);
    }

    #[test]
    fn object_urls_are_path_style_and_encoded() {
        let store = HttpStore::new(
            reqwest::Client::new(),
            "https://storage.example.com/",
            "tracks",
            None,
        );
        let url = store.object_url("Hiking/Lake Trail/a b.gpx").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.example.com/tracks/Hiking/Lake%20Trail/a%20b.gpx"
        );
        assert_eq!(
            store.location("map.html"),
            "https://storage.example.com/tracks/map.html"
        );
    }

    #[tokio::test]
    async fn dir_store_round_trips_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        store
            .put("site/map.html", b"<html></html>".to_vec(), "text/html")
            .await
            .unwrap();
        store.put("a.txt", b"a".to_vec(), "text/plain").await.unwrap();

        assert_eq!(store.list().await.unwrap(), ["a.txt", "site/map.html"]);
        assert_eq!(store.get("site/map.html").await.unwrap(), b"<html></html>");
    }

    #[tokio::test]
    async fn dir_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        assert!(matches!(
            store.get("../secret").await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dir_store_lists_symlinked_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.gpx");
        std::fs::write(&target, "<gpx/>").unwrap();
        std::fs::create_dir_all(dir.path().join("bucket/Hiking")).unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("bucket/Hiking/Link.gpx")).unwrap();

        let store = DirStore::new(dir.path().join("bucket"));
        assert_eq!(store.list().await.unwrap(), ["Hiking/Link.gpx"]);
        assert_eq!(store.get("Hiking/Link.gpx").await.unwrap(), b"<gpx/>");
    }

    #[tokio::test]
    async fn missing_dir_lists_nothing() {
        let store = DirStore::new("/nonexistent/trailmap/bucket");
        assert!(store.list().await.unwrap().is_empty());
    }
}
