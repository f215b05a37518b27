use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load(db_override: Option<&Path>) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "recipebox").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = db_override.map_or_else(|| data_dir.join("recipebox.db"), Path::to_path_buf);

        Ok(Config { db_path, data_dir })
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        load_or_create_api_key_at(&self.data_dir.join("api_key"))
    }
}

fn load_or_create_api_key_at(path: &Path) -> Result<(String, bool)> {
    use rand::Rng;
    use std::fmt::Write;

    if path.exists() {
        let key = std::fs::read_to_string(path).context("Failed to read API key file")?;
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Ok((key, false));
        }
    }

    let bytes: [u8; 32] = rand::rng().random();
    let key = bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc: String, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        });
    std::fs::write(path, &key).context("Failed to write API key file")?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .context("Failed to set API key file permissions")?;
    }
    eprintln!("Generated new API key: {key}");
    eprintln!("Include in requests: Authorization: Bearer {key}");
    Ok((key, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_key");

        let (key, created) = load_or_create_api_key_at(&path).unwrap();
        assert!(created);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));

        let (again, created) = load_or_create_api_key_at(&path).unwrap();
        assert!(!created);
        assert_eq!(again, key);
    }

    #[test]
    fn test_blank_api_key_file_regenerates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_key");
        std::fs::write(&path, "  \n").unwrap();

        let (key, created) = load_or_create_api_key_at(&path).unwrap();
        assert!(created);
        assert_eq!(key.len(), 64);
    }
}
