use crate::sdk::ImageSource;
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub const ALLOWED_MEDIA_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

/// Ceiling on the estimated decoded size of a base64 image.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageRejection {
    #[error("unsupported media type `{0}`")]
    MediaType(String),
    #[error("missing media type")]
    MissingMediaType,
    #[error("missing or non-string base64 payload")]
    Payload,
    #[error("estimated size {estimated} bytes exceeds {max} bytes")]
    TooLarge { estimated: u64, max: u64 },
    #[error("missing or non-string url")]
    MissingUrl,
    #[error("malformed url: {0}")]
    MalformedUrl(String),
    #[error("url scheme `{0}` is not http or https")]
    Scheme(String),
    #[error("unsupported image source")]
    UnknownSource,
}

/// Turns an image source into something a browser can render: a data URL for
/// base64 payloads, or the original URL for http(s) references.
pub fn validate(source: &ImageSource) -> Option<String> {
    match check(source) {
        Ok(reference) => Some(reference),
        Err(reason) => {
            warn!(%reason, "dropping image block");
            None
        }
    }
}

pub fn check(source: &ImageSource) -> Result<String, ImageRejection> {
    match source {
        ImageSource::Base64 { media_type, data } => check_base64(media_type, data),
        ImageSource::Url { url } => match url {
            Some(Value::String(raw)) => check_url(raw),
            _ => Err(ImageRejection::MissingUrl),
        },
        ImageSource::Unknown => Err(ImageRejection::UnknownSource),
    }
}

fn check_base64(
    media_type: &Option<Value>,
    data: &Option<Value>,
) -> Result<String, ImageRejection> {
    let media_type = match media_type {
        Some(Value::String(media_type)) => media_type.as_str(),
        Some(other) => return Err(ImageRejection::MediaType(other.to_string())),
        None => return Err(ImageRejection::MissingMediaType),
    };
    if !ALLOWED_MEDIA_TYPES.contains(&media_type) {
        return Err(ImageRejection::MediaType(media_type.to_string()));
    }

    let Some(Value::String(payload)) = data else {
        return Err(ImageRejection::Payload);
    };

    // len * 3 / 4 > max, kept in integers so fractional estimates round the right way
    let len = payload.len() as u64;
    if len * 3 > MAX_IMAGE_BYTES * 4 {
        return Err(ImageRejection::TooLarge {
            estimated: len * 3 / 4,
            max: MAX_IMAGE_BYTES,
        });
    }

    Ok(format!("data:{media_type};base64,{payload}"))
}

fn check_url(raw: &str) -> Result<String, ImageRejection> {
    let url = Url::parse(raw).map_err(|err| ImageRejection::MalformedUrl(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        other => Err(ImageRejection::Scheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base64(media_type: &str, data: Value) -> ImageSource {
        ImageSource::Base64 {
            media_type: Some(json!(media_type)),
            data: Some(data),
        }
    }

    fn url(url: &str) -> ImageSource {
        ImageSource::Url {
            url: Some(json!(url)),
        }
    }

    #[test]
    fn png_under_ceiling_becomes_data_url() {
        let source = base64("image/png", json!("iVBORw0KGgo="));
        assert_eq!(
            validate(&source).as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );
    }

    #[test]
    fn png_over_ceiling_is_dropped() {
        // 4/3 of the ceiling is exactly 10 MiB decoded; four more chars tips it over
        let len = (MAX_IMAGE_BYTES * 4 / 3) as usize + 4;
        let source = base64("image/png", json!("A".repeat(len)));

        assert!(matches!(check(&source), Err(ImageRejection::TooLarge { .. })));
        assert_eq!(validate(&source), None);
    }

    #[test]
    fn payload_at_ceiling_is_accepted() {
        let len = (MAX_IMAGE_BYTES * 4 / 3) as usize;
        let source = base64("image/jpeg", json!("A".repeat(len)));
        assert!(check(&source).is_ok());
    }

    #[test]
    fn disallowed_media_type_is_rejected() {
        let source = base64("image/bmp", json!("Qk0="));
        assert_eq!(
            check(&source),
            Err(ImageRejection::MediaType("image/bmp".to_string()))
        );
    }

    #[test]
    fn every_allowed_media_type_passes() {
        for media_type in ALLOWED_MEDIA_TYPES {
            assert!(check(&base64(media_type, json!("AAAA"))).is_ok(), "{media_type}");
        }
    }

    #[test]
    fn non_string_or_missing_payload_is_rejected() {
        assert_eq!(
            check(&base64("image/png", json!(42))),
            Err(ImageRejection::Payload)
        );
        let missing = ImageSource::Base64 {
            media_type: Some(json!("image/png")),
            data: None,
        };
        assert_eq!(check(&missing), Err(ImageRejection::Payload));
    }

    #[test]
    fn https_url_passes_through_unchanged() {
        let raw = "https://example.com/cat.png?size=large";
        assert_eq!(validate(&url(raw)).as_deref(), Some(raw));
        assert!(validate(&url("http://example.com/a.gif")).is_some());
    }

    #[test]
    fn other_schemes_and_malformed_urls_are_rejected() {
        assert_eq!(
            check(&url("ftp://example.com/cat.png")),
            Err(ImageRejection::Scheme("ftp".to_string()))
        );
        assert!(matches!(
            check(&url("not a url")),
            Err(ImageRejection::MalformedUrl(_))
        ));
        assert_eq!(validate(&url("javascript:alert(1)")), None);
    }

    #[test]
    fn non_string_fields_are_rejected() {
        let numeric_type = ImageSource::Base64 {
            media_type: Some(json!(5)),
            data: Some(json!("AAAA")),
        };
        assert_eq!(
            check(&numeric_type),
            Err(ImageRejection::MediaType("5".to_string()))
        );
        assert_eq!(
            check(&ImageSource::Url { url: Some(json!(7)) }),
            Err(ImageRejection::MissingUrl)
        );
        assert_eq!(
            check(&ImageSource::Url { url: None }),
            Err(ImageRejection::MissingUrl)
        );
    }

    #[test]
    fn unknown_source_is_rejected() {
        assert_eq!(check(&ImageSource::Unknown), Err(ImageRejection::UnknownSource));
    }
}
