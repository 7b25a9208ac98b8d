use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub mod buffer2;
pub mod file_utils;
pub mod float_ext;
pub mod log_setup;
pub mod parallel;
pub mod test_utils;

pub const EPSILON: f64 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum FileExtensionError {
    #[error("Failed to get file extension")]
    MissingFileExtension,
    #[error("Unsupported file extension for file: {0}")]
    UnsupportedFileExtension(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SerdeFormatError {
    #[error(transparent)]
    Extension(#[from] FileExtensionError),
    #[error("YAML serialization failed")]
    Yaml(#[from] serde_yml::Error),
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type SerdeFormatResult<T> = Result<T, SerdeFormatError>;

pub fn get_file_extension(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|os_str| os_str.to_str())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, FileExtensionError> {
        let extension = get_file_extension(file_name)
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or(FileExtensionError::MissingFileExtension)?;

        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(FileExtensionError::UnsupportedFileExtension(
                file_name.to_string(),
            )),
        }
    }
}

pub fn serialize<T: Serialize>(value: &T, format: FileFormat) -> SerdeFormatResult<String> {
    Ok(match format {
        FileFormat::Yaml => serde_yml::to_string(value)?,
        FileFormat::Json => serde_json::to_string_pretty(value)?,
    })
}

pub fn deserialize<T: DeserializeOwned>(
    serialized: &str,
    format: FileFormat,
) -> SerdeFormatResult<T> {
    match format {
        FileFormat::Yaml => Ok(serde_yml::from_str(serialized)?),
        FileFormat::Json => Ok(serde_json::from_str(serialized)?),
    }
}

/// Read and deserialize a config file, picking the format from its extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> SerdeFormatResult<T> {
    let format = FileFormat::from_file_name(&path.to_string_lossy())?;
    let text = std::fs::read_to_string(path).map_err(|source| SerdeFormatError::Io {
        path: path.display().to_string(),
        source,
    })?;
    deserialize(&text, format)
}

/// Serialize and write a config file, picking the format from its extension.
pub fn save_file<T: Serialize>(value: &T, path: &Path) -> SerdeFormatResult<()> {
    let format = FileFormat::from_file_name(&path.to_string_lossy())?;
    let text = serialize(value, format)?;
    std::fs::write(path, text).map_err(|source| SerdeFormatError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        boost: f32,
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(FileFormat::from_file_name("a.YML").unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_file_name("dir/a.json").unwrap(), FileFormat::Json);
        assert!(matches!(
            FileFormat::from_file_name("a.toml"),
            Err(FileExtensionError::UnsupportedFileExtension(_))
        ));
        assert!(matches!(
            FileFormat::from_file_name("noext"),
            Err(FileExtensionError::MissingFileExtension)
        ));
    }

    #[test]
    fn test_yaml_and_json_agree() {
        let value = Sample {
            name: "m42".into(),
            boost: 8.0,
        };
        for format in [FileFormat::Yaml, FileFormat::Json] {
            let text = serialize(&value, format).unwrap();
            let back: Sample = deserialize(&text, format).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_save_then_load_file() {
        let path = test_utils::test_output_path("common_sample.yaml");
        let value = Sample {
            name: "flat".into(),
            boost: 2.5,
        };
        save_file(&value, &path).unwrap();
        let loaded: Sample = load_file(&path).unwrap();
        assert_eq!(loaded, value);
    }
}
