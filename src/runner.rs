//! Per-image pipeline and batch results.

use std::time::{Duration, Instant};

use crate::clean::clean_grounding;
use crate::config::OcrConfig;
use crate::ocr::{OcrClient, OcrError, OcrProgress, OcrResult, build_prompt, build_request};
use crate::scan::ImagePath;

/// Text produced for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrPage {
    /// Source image
    pub image: ImagePath,

    /// Recognized Markdown, or a failure marker
    pub text: String,

    /// Whether `text` is a failure marker
    pub failed: bool,
}

impl OcrPage {
    pub fn success(image: ImagePath, text: String) -> Self {
        Self {
            image,
            text,
            failed: false,
        }
    }

    pub fn failure(image: ImagePath, error: &OcrError) -> Self {
        Self {
            image,
            text: failure_marker(error),
            failed: true,
        }
    }
}

/// Inline text written in place of OCR output when an image fails
pub fn failure_marker(error: &OcrError) -> String {
    format!("<OCR failed: {}>", error)
}

/// Whole milliseconds, saturating at `u64::MAX`
fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Read, encode, send, and clean one image
pub async fn process_image(
    client: &OcrClient,
    config: &OcrConfig,
    image: &ImagePath,
) -> OcrResult<String> {
    let prompt = build_prompt(config.prompt.as_deref(), config.grounding);
    let payload = build_request(config, image, &prompt)?;

    let text = client
        .recognize_with_progress(&payload, |progress| match progress {
            OcrProgress::Connected => tracing::debug!("Server accepted request"),
            OcrProgress::Receiving(partial) => {
                tracing::trace!(chars = partial.chars().count(), "Receiving")
            }
            OcrProgress::Complete(full) => {
                tracing::debug!(chars = full.chars().count(), "Response complete")
            }
        })
        .await?;

    if config.clean {
        Ok(clean_grounding(&text))
    } else {
        Ok(text)
    }
}

/// Process every image in order. A failing image becomes a page holding a
/// failure marker; it never stops the batch.
pub async fn run_batch(client: &OcrClient, config: &OcrConfig, images: &[ImagePath]) -> Vec<OcrPage> {
    let mut pages = Vec::with_capacity(images.len());

    for (index, image) in images.iter().enumerate() {
        tracing::info!(
            image = %image.path.display(),
            step = index + 1,
            total = images.len(),
            "Processing image"
        );
        let started = Instant::now();

        let page = match process_image(client, config, image).await {
            Ok(text) => {
                tracing::info!(
                    image = %image.path.display(),
                    elapsed_ms = elapsed_millis(started.elapsed()),
                    "Image converted"
                );
                OcrPage::success(image.clone(), text)
            }
            Err(e) => {
                tracing::warn!(image = %image.path.display(), error = %e, "OCR failed");
                OcrPage::failure(image.clone(), &e)
            }
        };
        pages.push(page);
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_marker_embeds_error() {
        let marker = failure_marker(&OcrError::MissingChoice);
        assert_eq!(marker, "<OCR failed: invalid response: no choices returned>");
    }

    #[test]
    fn test_failure_page() {
        let page = OcrPage::failure(
            ImagePath::new("a.png"),
            &OcrError::Status {
                status: 500,
                body: "boom".to_string(),
            },
        );
        assert!(page.failed);
        assert_eq!(page.text, "<OCR failed: HTTP 500: boom>");
    }

    #[test]
    fn test_elapsed_millis_saturates() {
        assert_eq!(elapsed_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(elapsed_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_unreadable_image_does_not_stop_batch() {
        let config = OcrConfig::new("http://127.0.0.1:9").timeout_secs(2);
        let client = OcrClient::new(&config).unwrap();
        let images = vec![
            ImagePath::new("/missing/one.png"),
            ImagePath::new("/missing/two.png"),
        ];

        let pages = run_batch(&client, &config, &images).await;
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].image, images[0]);
        assert_eq!(pages[1].image, images[1]);
        assert!(pages.iter().all(|p| p.failed));
        assert!(pages[0].text.starts_with("<OCR failed: cannot read"));
    }
}
