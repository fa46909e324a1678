use crate::error::{DashboardError, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use std::path::Path;

/// A photo ready to hand to a share target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// `data:<mime>;base64,<payload>`, the form photos are stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    pub fn parse(value: &'a str) -> Result<Self> {
        let rest = value
            .strip_prefix("data:")
            .ok_or_else(|| DashboardError::InvalidPhoto("missing data: prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| DashboardError::InvalidPhoto("missing payload".to_string()))?;
        let mime = header.strip_suffix(";base64").ok_or_else(|| {
            DashboardError::InvalidPhoto("only base64 photos are supported".to_string())
        })?;
        if !mime.starts_with("image/") {
            return Err(DashboardError::InvalidPhoto(format!(
                "{mime} is not an image type"
            )));
        }
        Ok(DataUrl { mime, payload })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        B64.decode(self.payload)
            .map_err(|err| DashboardError::InvalidPhoto(err.to_string()))
    }
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", B64.encode(bytes))
}

pub fn photo_file(data_url: &str, name: String) -> Result<PhotoFile> {
    let parsed = DataUrl::parse(data_url)?;
    Ok(PhotoFile {
        name,
        mime: parsed.mime.to_string(),
        bytes: parsed.decode()?,
    })
}

/// Guesses the image type from the file extension of a picked photo.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|value| value.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_and_decodes_base64_images() {
        let url = encode_data_url("image/png", b"\x89PNG");
        let parsed = DataUrl::parse(url.as_str()).unwrap();
        assert_eq!(parsed.mime, "image/png");
        assert_eq!(parsed.decode().unwrap(), b"\x89PNG".to_vec());

        let file = photo_file(url.as_str(), "nota-dl-001.jpg".to_string()).unwrap();
        assert_eq!(file.name, "nota-dl-001.jpg");
        assert_eq!(file.bytes.len(), 4);
    }

    #[test]
    fn rejects_non_image_or_non_base64() {
        for bad in [
            "hello",
            "data:image/png,abc",
            "data:text/plain;base64,aGk=",
            "data:image/png;base64",
        ] {
            assert!(DataUrl::parse(bad).is_err(), "{bad} should be rejected");
        }
        let broken = DataUrl::parse("data:image/png;base64,@@@").unwrap();
        assert!(broken.decode().is_err());
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(&PathBuf::from("a/B.PNG")), "image/png");
        assert_eq!(mime_for_path(&PathBuf::from("a/b.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(&PathBuf::from("noext")), "image/jpeg");
    }
}
