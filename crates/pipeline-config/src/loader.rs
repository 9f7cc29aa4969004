//! Reads a bootstrap TOML file from disk.

use std::path::Path;

use crate::error::ConfigError;
use crate::model::Bootstrap;

pub fn load_bootstrap(path: impl AsRef<Path>) -> Result<Bootstrap, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Toml { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_bootstrap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[models]]
            name = "gpt-4o-mini"
            provider = "ovh"
            input_price_per_million = 0.15
            output_price_per_million = 0.6
            max_tokens = 4096
            "#
        )
        .unwrap();

        let bootstrap = load_bootstrap(file.path()).unwrap();
        assert_eq!(bootstrap.models.len(), 1);
        assert_eq!(bootstrap.models[0].name, "gpt-4o-mini");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_bootstrap("/nonexistent/bootstrap.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
