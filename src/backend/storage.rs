//! Object storage: uploads and public URLs.
use anyhow::{anyhow, Context, Result};
use reqwest::{Request, Url};
use std::path::Path;
use tokio::fs;

use super::SupabaseClient;

/// An image picked by the user, held in memory until upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("invalid file name"))?
            .to_string();
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("failed to read file: {}", path.display()))?;
        Ok(Self { name, bytes })
    }

    /// Extension after the last dot, lowercased; `jpg` when there is none.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
            _ => "jpg".to_string(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.extension().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            _ => "application/octet-stream",
        }
    }
}

pub(crate) fn object_url(base: &Url, bucket: &str, path: &str) -> Result<Url> {
    base.join(&format!("storage/v1/object/{}/{}", bucket, path))
        .context("invalid storage URL")
}

pub fn public_url(base: &Url, bucket: &str, path: &str) -> String {
    format!("{}storage/v1/object/public/{}/{}", base, bucket, path)
}

impl SupabaseClient {
    pub fn build_upload(
        &self,
        bucket: &str,
        path: &str,
        file: &ImageFile,
        overwrite: bool,
    ) -> Result<Request> {
        let url = object_url(&self.base_url, bucket, path)?;
        self.authed(self.http.post(url))
            .header("Content-Type", file.content_type())
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", if overwrite { "true" } else { "false" })
            .body(file.bytes.clone())
            .build()
            .context("failed to build upload request")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_and_content_type() {
        let f = ImageFile::new("Cat.PNG", vec![1, 2]);
        assert_eq!(f.extension(), "png");
        assert_eq!(f.content_type(), "image/png");
        let f = ImageFile::new("noext", vec![]);
        assert_eq!(f.extension(), "jpg");
        assert_eq!(f.content_type(), "image/jpeg");
        let f = ImageFile::new("trailing.", vec![]);
        assert_eq!(f.extension(), "jpg");
        let f = ImageFile::new("doc.pdf", vec![]);
        assert_eq!(f.content_type(), "application/octet-stream");
    }

    #[test]
    fn upload_request_shape() {
        let c = SupabaseClient::new("https://demo.supabase.co/", "k".into()).unwrap();
        let f = ImageFile::new("a.jpg", vec![9, 9, 9]);
        let req = c.build_upload("announcements", "pets/42.jpg", &f, true).unwrap();
        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(
            req.url().as_str(),
            "https://demo.supabase.co/storage/v1/object/announcements/pets/42.jpg"
        );
        let h = req.headers();
        assert_eq!(h.get("x-upsert").unwrap(), "true");
        assert_eq!(h.get("Content-Type").unwrap(), "image/jpeg");
        assert_eq!(h.get("apikey").unwrap(), "k");
    }

    #[test]
    fn public_url_shape() {
        let base = Url::parse("https://demo.supabase.co/").unwrap();
        assert_eq!(
            public_url(&base, "announcements", "announcements/1-abc.png"),
            "https://demo.supabase.co/storage/v1/object/public/announcements/announcements/1-abc.png"
        );
    }

    #[tokio::test]
    async fn from_path_reads_bytes() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("dog.webp");
        std::fs::write(&p, b"img").unwrap();
        let f = ImageFile::from_path(&p).await.unwrap();
        assert_eq!(f.name, "dog.webp");
        assert_eq!(f.bytes, b"img".to_vec());
        assert_eq!(f.content_type(), "image/webp");
    }
}
