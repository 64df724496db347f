use crate::error::{Result, SplitterError};
use crate::types::{FetchedDocument, SourceType};
use std::path::Path;
use tokio::fs;
use tracing::info;
use url::Url;

pub struct ContentFetcher;

impl ContentFetcher {
    pub async fn fetch_document(source: &str) -> Result<FetchedDocument> {
        if Self::is_url(source) {
            Self::fetch_from_url(source).await
        } else {
            Self::fetch_from_file(source).await
        }
    }

    async fn fetch_from_url(url: &str) -> Result<FetchedDocument> {
        info!("Downloading document from URL: {}", url);

        let parsed_url = Url::parse(url)?;
        let client = reqwest::Client::new();
        let response = client.get(parsed_url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(SplitterError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        let file_name = Self::extract_filename_from_url(&parsed_url);

        Ok(Self::document(file_name, SourceType::Url, bytes))
    }

    async fn fetch_from_file(file_path: &str) -> Result<FetchedDocument> {
        info!("Reading file: {}", file_path);

        let path = Path::new(file_path);

        if !path.exists() {
            return Err(SplitterError::FileNotFound {
                path: file_path.to_string(),
            });
        }

        let bytes = fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        Ok(Self::document(file_name, SourceType::LocalFile, bytes))
    }

    fn document(file_name: String, source_type: SourceType, bytes: Vec<u8>) -> FetchedDocument {
        FetchedDocument {
            base_name: Self::base_name(&file_name),
            file_name,
            source_type,
            fetched_at: chrono::Utc::now().to_rfc3339(),
            bytes,
        }
    }

    /// File name with its extension stripped, used to name the parts.
    pub fn base_name(file_name: &str) -> String {
        Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document")
            .to_string()
    }

    fn is_url(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    fn extract_filename_from_url(url: &Url) -> String {
        url.path_segments()
            .and_then(|segments| segments.last())
            .and_then(|name| if name.is_empty() { None } else { Some(name) })
            .unwrap_or("downloaded.pdf")
            .to_string()
    }

    pub async fn validate_source(source: &str) -> Result<()> {
        if Self::is_url(source) {
            Url::parse(source)?;
            return Ok(());
        }

        let path = Path::new(source);
        if path.is_file() {
            Ok(())
        } else {
            Err(SplitterError::FileNotFound {
                path: source.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(ContentFetcher::base_name("report.pdf"), "report");
        assert_eq!(ContentFetcher::base_name("archive.2024.pdf"), "archive.2024");
        assert_eq!(ContentFetcher::base_name("noext"), "noext");
        assert_eq!(ContentFetcher::base_name(""), "document");
    }

    #[test]
    fn test_filename_from_url() {
        let url = Url::parse("https://example.com/files/scan.pdf?x=1").unwrap();
        assert_eq!(ContentFetcher::extract_filename_from_url(&url), "scan.pdf");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(ContentFetcher::extract_filename_from_url(&url), "downloaded.pdf");
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.pdf");
        std::fs::write(&path, b"%PDF-1.5").unwrap();

        let doc = ContentFetcher::fetch_document(path.to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(doc.file_name, "input.pdf");
        assert_eq!(doc.base_name, "input");
        assert_eq!(doc.bytes, b"%PDF-1.5");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = ContentFetcher::fetch_document("/definitely/not/here.pdf").await;
        assert!(matches!(result, Err(SplitterError::FileNotFound { .. })));
        assert!(ContentFetcher::validate_source("/definitely/not/here.pdf")
            .await
            .is_err());
    }
}
