//! AWS error classification
//!
//! Provides typed errors for EC2 operations using the error `.code()`
//! instead of string matching on the Debug format. Classification never
//! triggers a retry; it only decides how a failure is reported.

use aws_sdk_ec2::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::operation::{
    create_image::CreateImageError, create_tags::CreateTagsError,
    delete_snapshot::DeleteSnapshotError, deregister_image::DeregisterImageError,
    describe_images::DescribeImagesError, describe_instances::DescribeInstancesError,
};
use thiserror::Error;

/// AWS error categories
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (already deleted, or never existed)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Resource is still referenced by another resource
    #[error("Resource is in use: {message}")]
    InUse { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Caller lacks the IAM permission for the operation
    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if this is an "in use" error
    pub fn is_in_use(&self) -> bool {
        matches!(self, AwsError::InUse { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AwsError::Unauthorized { .. } => suggestion_for_code("UnauthorizedOperation"),
            AwsError::Throttled => suggestion_for_code("RequestLimitExceeded"),
            AwsError::InUse { .. } => suggestion_for_code("InvalidSnapshot.InUse"),
            AwsError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            _ => None,
        }
    }
}

/// Known EC2 error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidAMIID.NotFound",
    "InvalidAMIID.Unavailable",
    "InvalidSnapshot.NotFound",
    "InvalidInstanceID.NotFound",
];

/// Known EC2 error codes for resources still referenced elsewhere
const IN_USE_CODES: &[&str] = &["InvalidSnapshot.InUse", "DependencyViolation"];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known AWS error codes for missing permissions
const UNAUTHORIZED_CODES: &[&str] = &["UnauthorizedOperation", "AuthFailure"];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if IN_USE_CODES.contains(&c) => AwsError::InUse { message },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some(c) if UNAUTHORIZED_CODES.contains(&c) => AwsError::Unauthorized { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Try to read error metadata from one link of an error chain.
fn classify_sdk_cause<E>(cause: &(dyn std::error::Error + 'static)) -> Option<AwsError>
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    cause
        .downcast_ref::<SdkError<E>>()
        .map(|e| classify_aws_error(e.code(), e.message()))
}

/// Classify an error from an anyhow::Error by extracting the AWS error code.
///
/// Walks the error chain looking for an SDK error from any EC2 operation
/// ami-backup calls. Falls back to scanning the Debug representation for a
/// known code if no typed error is found.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    for cause in error.chain() {
        let classified = classify_sdk_cause::<CreateImageError>(cause)
            .or_else(|| classify_sdk_cause::<CreateTagsError>(cause))
            .or_else(|| classify_sdk_cause::<DescribeImagesError>(cause))
            .or_else(|| classify_sdk_cause::<DescribeInstancesError>(cause))
            .or_else(|| classify_sdk_cause::<DeregisterImageError>(cause))
            .or_else(|| classify_sdk_cause::<DeleteSnapshotError>(cause));
        if let Some(classified) = classified {
            return classified;
        }
    }

    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&error.to_string()));
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Extract an AWS error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    let known = NOT_FOUND_CODES
        .iter()
        .chain(IN_USE_CODES)
        .chain(THROTTLING_CODES)
        .chain(UNAUTHORIZED_CODES);
    for code in known {
        if debug_str.contains(code) {
            return Some((*code).to_string());
        }
    }

    // Try to extract any code from `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "UnauthorizedOperation",
        "Grant ec2:CreateImage, ec2:CreateTags, ec2:DescribeImages, ec2:DescribeInstances, \
         ec2:DeregisterImage and ec2:DeleteSnapshot to the invoking role.",
    ),
    (
        "RequestLimitExceeded",
        "AWS API rate limit hit. The next scheduled run will pick up what was skipped.",
    ),
    (
        "InvalidSnapshot.InUse",
        "The snapshot still backs a registered image; it will be removed once that image is.",
    ),
    (
        "InvalidAMIID.Malformed",
        "Check that the image ID starts with 'ami-'.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
