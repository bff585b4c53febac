//! Format to media type mapping

use crate::error::{DepositError, Result};

/// Known distribution formats and the media type served for each
const MEDIA_TYPES: &[(&str, &str)] = &[
    (
        "https://www.iana.org/assignments/media-types/application/pdf",
        "application/pdf",
    ),
    (
        "https://www.iana.org/assignments/media-types/image/png",
        "image/png",
    ),
];

/// Media type for a format URI; unknown formats are an error, never a default
pub fn media_type_for(format_uri: &str) -> Result<&'static str> {
    MEDIA_TYPES
        .iter()
        .find(|(uri, _)| *uri == format_uri)
        .map(|(_, media_type)| *media_type)
        .ok_or_else(|| DepositError::MappingFailure(format_uri.to_string()))
}
