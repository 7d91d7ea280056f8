use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_valid::Validate;
use serde_valid::validation::{Error, Errors};
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] Errors<Error>),
}

/// Reads a single YAML document and validates it.
pub fn read_configuration<T>(reader: impl Read) -> Result<T, ReadError>
where
    T: DeserializeOwned + Validate,
{
    let configuration = serde_yaml::from_reader::<_, T>(reader)?;

    configuration.validate()?;
    Ok(configuration)
}

/// Reads every document of a `---` separated YAML stream. Empty documents are skipped.
pub fn read_documents(reader: impl Read) -> Result<Vec<serde_yaml::Value>, ReadError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_reader(reader) {
        let value = serde_yaml::Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertables::{assert_err, assert_ok};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[validate(min_length = 1)]
        name: String,
        #[validate(maximum = 10)]
        count: u32,
    }

    #[test]
    fn test_read_configuration() {
        let yaml = "name: sample\ncount: 3\n".as_bytes();

        let sample: Sample = assert_ok!(read_configuration(yaml));
        assert_eq!(sample.name, "sample");
        assert_eq!(sample.count, 3);
    }

    #[test]
    fn test_read_configuration_invalid() {
        let yaml = "name: \"\"\ncount: 30\n".as_bytes();

        let result = read_configuration::<Sample>(yaml);
        assert!(matches!(
            assert_err!(result),
            ReadError::InvalidConfiguration(_)
        ));
    }

    #[test]
    fn test_read_configuration_malformed() {
        let result = read_configuration::<Sample>("name: [".as_bytes());
        assert!(matches!(assert_err!(result), ReadError::Parse(_)));
    }

    #[test]
    fn test_read_documents() {
        let yaml = r"
kind: A
---
---
kind: B
"
        .as_bytes();

        let documents = assert_ok!(read_documents(yaml));
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[1]["kind"].as_str(), Some("B"));
    }
}
