use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CoreError, UtcDateTime};

/// Envelope field that breaks the output contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeValidationError {
    #[error("request id must be at least 8 characters")]
    InvalidRequestId,
    #[error("trace id must be 32 hex characters and not all zeros")]
    InvalidTraceId,
    #[error("schema version '{value}' must look like vMAJOR.MINOR.PATCH")]
    InvalidSchemaVersion { value: String },
    #[error("error code must not be empty")]
    EmptyErrorCode,
    #[error("error message must not be empty")]
    EmptyErrorMessage,
}

/// Response wrapper for every `pricemark` machine-readable output.
///
/// `data` is `null` when the command failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failure(
        meta: EnvelopeMeta,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, EnvelopeValidationError> {
        meta.validate_schema_compliance()?;
        for error in &errors {
            error.validate()?;
        }

        Ok(Self {
            meta,
            data: None,
            errors,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub trace_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        trace_id: impl Into<String>,
        schema_version: impl Into<String>,
        latency_ms: u64,
    ) -> Result<Self, EnvelopeValidationError> {
        let meta = Self {
            request_id: request_id.into(),
            trace_id: trace_id.into(),
            schema_version: schema_version.into(),
            generated_at: UtcDateTime::now(),
            latency_ms,
            warnings: Vec::new(),
        };
        meta.validate_schema_compliance()?;
        Ok(meta)
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn validate_schema_compliance(&self) -> Result<(), EnvelopeValidationError> {
        if self.request_id.trim().len() < 8 {
            return Err(EnvelopeValidationError::InvalidRequestId);
        }
        if !is_valid_trace_id(&self.trace_id) {
            return Err(EnvelopeValidationError::InvalidTraceId);
        }
        if !is_valid_schema_version(&self.schema_version) {
            return Err(EnvelopeValidationError::InvalidSchemaVersion {
                value: self.schema_version.clone(),
            });
        }
        Ok(())
    }
}

/// Failure entry. `date` is the instant the failure refers to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<UtcDateTime>,
}

impl EnvelopeError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, EnvelopeValidationError> {
        let error = Self {
            code: code.into(),
            message: message.into(),
            date: None,
        };
        error.validate()?;
        Ok(error)
    }

    pub fn with_date(mut self, date: UtcDateTime) -> Self {
        self.date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<(), EnvelopeValidationError> {
        if self.code.trim().is_empty() {
            return Err(EnvelopeValidationError::EmptyErrorCode);
        }
        if self.message.trim().is_empty() {
            return Err(EnvelopeValidationError::EmptyErrorMessage);
        }
        Ok(())
    }
}

impl From<&CoreError> for EnvelopeError {
    fn from(error: &CoreError) -> Self {
        Self {
            code: error.code().to_owned(),
            message: error.to_string(),
            date: error.date(),
        }
    }
}

fn is_valid_schema_version(value: &str) -> bool {
    let Some(version) = value.strip_prefix('v') else {
        return false;
    };

    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
}

fn is_valid_trace_id(value: &str) -> bool {
    value.len() == 32
        && value.chars().all(|ch| ch.is_ascii_hexdigit())
        && value.chars().any(|ch| ch != '0')
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn rejects_bad_schema_version() {
        let err = EnvelopeMeta::new("request-12345", TRACE, "1.0", 1).expect_err("must fail");
        assert!(matches!(err, EnvelopeValidationError::InvalidSchemaVersion { .. }));
    }

    #[test]
    fn rejects_all_zero_trace_id() {
        let err = EnvelopeMeta::new("request-12345", "0".repeat(32), "v1.0.0", 1)
            .expect_err("must fail");
        assert_eq!(err, EnvelopeValidationError::InvalidTraceId);
    }

    #[test]
    fn no_data_failure_carries_date_and_null_data() {
        let start = UtcDateTime::parse("01/01/2018 02:46:40").expect("valid");
        let meta = EnvelopeMeta::new("request-12345", TRACE, "v1.0.0", 3).expect("valid meta");
        let envelope: Envelope<()> =
            Envelope::failure(meta, vec![EnvelopeError::from(&CoreError::NoData { start })])
                .expect("valid envelope");

        let json = serde_json::to_value(&envelope).expect("serializes");
        assert!(json["data"].is_null());
        assert_eq!(json["errors"][0]["code"], "report.no_data");
        assert_eq!(json["errors"][0]["date"], "2018-01-01T02:46:40Z");
    }

    #[test]
    fn rejects_empty_error_message() {
        let err = EnvelopeError::new("request.format", " ").expect_err("must fail");
        assert_eq!(err, EnvelopeValidationError::EmptyErrorMessage);
    }
}
