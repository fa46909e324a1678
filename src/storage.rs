use crate::error::Result;
use crate::model::now_millis;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub const STORAGE_KEY: &str = "renovki_dashboard_state";

/// Where the whole document lives between sessions. One key, one blob.
pub trait DocumentStorage: Send {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, text: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;

    /// Keeps a copy of a blob the guard could not use.
    fn backup(&self, _raw: &str) -> Result<()> {
        Ok(())
    }

    /// Keeps whatever is stored when `read` itself failed.
    fn backup_unreadable(&self) -> Result<()> {
        Ok(())
    }
}

pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStorage { root: root.into() }
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join(format!("{STORAGE_KEY}.json"))
    }

    fn corrupt_path(&self) -> PathBuf {
        self.root
            .join(format!("{STORAGE_KEY}.corrupt-{}.json", now_millis()))
    }
}

impl DocumentStorage for FileStorage {
    fn read(&self) -> Result<Option<String>> {
        let path = self.document_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, text: &str) -> Result<()> {
        write_text_file(self.document_path(), text)
    }

    fn clear(&self) -> Result<()> {
        let path = self.document_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn backup(&self, raw: &str) -> Result<()> {
        let path = self.corrupt_path();
        write_text_file(path.clone(), raw)?;
        log::warn!("Kept unreadable document at {}", path.display());
        Ok(())
    }

    fn backup_unreadable(&self) -> Result<()> {
        let source = self.document_path();
        if !source.exists() {
            return Ok(());
        }
        let path = self.corrupt_path();
        fs::copy(&source, &path)?;
        log::warn!("Kept unreadable document at {}", path.display());
        Ok(())
    }
}

/// Volatile storage, mostly for tests. Can be told to fail every write.
#[derive(Default)]
pub struct MemoryStorage {
    text: Mutex<Option<String>>,
    backups: Mutex<Vec<String>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        MemoryStorage {
            text: Mutex::new(Some(text.into())),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        MemoryStorage {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Option<String> {
        self.text.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn backups(&self) -> Vec<String> {
        self.backups
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl DocumentStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.snapshot())
    }

    fn write(&self, text: &str) -> Result<()> {
        if self.fail_writes {
            return Err(std::io::Error::other("storage is read-only").into());
        }
        if let Ok(mut guard) = self.text.lock() {
            *guard = Some(text.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.text.lock() {
            *guard = None;
        }
        Ok(())
    }

    fn backup(&self, raw: &str) -> Result<()> {
        if let Ok(mut guard) = self.backups.lock() {
            guard.push(raw.to_string());
        }
        Ok(())
    }
}

pub fn write_text_file(path: PathBuf, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn write_bytes_file(path: PathBuf, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "renovki-share".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_filename("nota-dl-001.jpg"), "nota-dl-001.jpg");
        assert_eq!(sanitize_filename("nota dl/../12"), "nota_dl_.._12");
        assert_eq!(sanitize_filename("///"), "renovki-share");
    }

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read().unwrap(), None);
        storage.write("{}").unwrap();
        assert_eq!(storage.read().unwrap().as_deref(), Some("{}"));
        storage.clear().unwrap();
        assert_eq!(storage.read().unwrap(), None);
    }

    #[test]
    fn failing_storage_rejects_writes() {
        let storage = MemoryStorage::failing();
        assert!(storage.write("{}").is_err());
    }
}
