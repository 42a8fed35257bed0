//! Licensing capability

/// Why a license check failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LicenseError {
    #[error("No license key was provided")]
    Missing,

    #[error("License key is invalid: {reason}")]
    Invalid { reason: String },
}

/// Gate consulted by a batch job before it starts any work.
pub trait LicenseCheck: Send + Sync {
    fn check_feature_license(&self) -> Result<(), LicenseError>;
}

/// License taken from configuration (connection string or environment).
///
/// A key is accepted when present and non-blank; entitlement checks
/// belong to the licensing service.
#[derive(Debug, Clone, Default)]
pub struct LicenseKey {
    key: Option<String>,
}

impl LicenseKey {
    pub fn new(key: Option<String>) -> Self {
        Self { key }
    }
}

impl LicenseCheck for LicenseKey {
    fn check_feature_license(&self) -> Result<(), LicenseError> {
        match self.key.as_deref().map(str::trim) {
            None => Err(LicenseError::Missing),
            Some("") => Err(LicenseError::Invalid {
                reason: "key is blank".to_string(),
            }),
            Some(key) if key.chars().any(char::is_control) => Err(LicenseError::Invalid {
                reason: "key contains control characters".to_string(),
            }),
            Some(_) => Ok(()),
        }
    }
}
