//! Google Cloud Vision `images:annotate` client (`TEXT_DETECTION`).

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

use super::{OcrProvider, OcrResult, ProviderError, TextBlock};
use crate::config::ProvidersConfig;

const ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Requires the `GOOGLE_VISION_API_KEY` environment variable.
pub struct GoogleVisionOcr {
    client: reqwest::Client,
    api_key: String,
    timeout: Duration,
}

impl GoogleVisionOcr {
    pub fn new(config: &ProvidersConfig) -> Result<Self> {
        let api_key = match std::env::var("GOOGLE_VISION_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("GOOGLE_VISION_API_KEY environment variable not set"),
        };
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            api_key,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl OcrProvider for GoogleVisionOcr {
    fn name(&self) -> &str {
        "google-vision"
    }

    async fn detect_text(&self, image: &[u8]) -> Result<OcrResult, ProviderError> {
        let body = serde_json::json!({
            "requests": [{
                "image": { "content": base64::engine::general_purpose::STANDARD.encode(image) },
                "features": [{ "type": "TEXT_DETECTION" }],
            }]
        });

        let response = self
            .client
            .post(ANNOTATE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_request(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_annotate_response(&json)
    }
}

/// Parse an `images:annotate` response.
///
/// The first text annotation holds the whole text; the rest are individual
/// tokens with bounding polygons.
pub fn parse_annotate_response(json: &serde_json::Value) -> Result<OcrResult, ProviderError> {
    let first = json
        .get("responses")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .ok_or_else(|| ProviderError::InvalidResponse("missing responses[0]".to_string()))?;

    if let Some(message) = first
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Err(ProviderError::InvalidResponse(message.to_string()));
    }

    let annotations = match first.get("textAnnotations").and_then(|a| a.as_array()) {
        Some(a) if !a.is_empty() => a,
        _ => return Ok(OcrResult::default()),
    };

    let text = annotations[0]
        .get("description")
        .and_then(|d| d.as_str())
        .unwrap_or_default()
        .to_string();

    let blocks = annotations[1..]
        .iter()
        .map(|annotation| {
            let vertices = annotation
                .pointer("/boundingPoly/vertices")
                .and_then(|v| v.as_array())
                .map(|vs| {
                    vs.iter()
                        .map(|v| {
                            // Vision omits zero coordinates.
                            let x = v.get("x").and_then(|x| x.as_i64()).unwrap_or(0);
                            let y = v.get("y").and_then(|y| y.as_i64()).unwrap_or(0);
                            (x, y)
                        })
                        .collect()
                })
                .unwrap_or_default();
            TextBlock {
                text: annotation
                    .get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or_default()
                    .to_string(),
                vertices,
            }
        })
        .collect();

    Ok(OcrResult { text, blocks })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_text_and_tokens() {
        let json = serde_json::json!({
            "responses": [{
                "textAnnotations": [
                    { "description": "Total 42" },
                    { "description": "Total", "boundingPoly": { "vertices": [
                        { "x": 10, "y": 20 }, { "x": 50, "y": 20 }, { "x": 50, "y": 30 }, { "y": 30 }
                    ]}},
                    { "description": "42", "boundingPoly": { "vertices": [{ "x": 60, "y": 22 }] }}
                ]
            }]
        });
        let result = parse_annotate_response(&json).unwrap();
        assert_eq!(result.text, "Total 42");
        assert_eq!(result.blocks.len(), 2);
        assert_eq!(result.blocks[0].vertices[3], (0, 30));
        assert_eq!(result.blocks[1].top_y(), 22);
    }

    #[test]
    fn empty_annotations_mean_no_text() {
        let json = serde_json::json!({ "responses": [{}] });
        assert_eq!(parse_annotate_response(&json).unwrap(), OcrResult::default());
    }

    #[test]
    fn per_image_error_is_surfaced() {
        let json = serde_json::json!({ "responses": [{ "error": { "message": "Bad image data." } }] });
        let err = parse_annotate_response(&json).unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }
}
