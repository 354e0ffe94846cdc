//! # Batch Slide Renderer
//!
//! Renders every slide of one carousel strictly in `slide_order`.
//!
//! For each slide the template markup is resolved against the slide values,
//! rasterized at the template size and written to the content store. A failed
//! rasterization falls back to a placeholder image; only when the fallback
//! fails too does the slide end in `error`. A missing template fails that
//! slide and the batch moves on.
//!
//! Persistence failures abort the batch. Whatever happens, the carousel ends
//! `completed` or `error` and no slide is left `pending`.
//!
//! The renderer is synchronous. Callers decide whether it runs in the request
//! path or on a blocking worker (see `job_controller::dispatch`).

use crate::error::{ServiceError, ServiceResult};
use crate::render::content::ContentStore;
use crate::render::placeholder;
use crate::render::raster::{FallbackRasterizer, Rasterizer};
use crate::storage::CarouselStore;
use common::jobs::{CarouselStatus, SlideStatus};
use common::model::carousel::Slide;
use log::{error, info, warn};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What a batch does after a slide ends in `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideFailurePolicy {
    /// Keep rendering; the carousel still completes.
    #[default]
    Continue,
    /// Stop, mark the remaining slides `error` and fail the carousel.
    FailCarousel,
}

impl FromStr for SlideFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(SlideFailurePolicy::Continue),
            "fail-carousel" | "fail_carousel" => Ok(SlideFailurePolicy::FailCarousel),
            other => Err(format!(
                "unknown slide failure policy '{}', expected 'continue' or 'fail-carousel'",
                other
            )),
        }
    }
}

impl fmt::Display for SlideFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlideFailurePolicy::Continue => f.write_str("continue"),
            SlideFailurePolicy::FailCarousel => f.write_str("fail-carousel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideOutcome {
    pub slide_order: u32,
    pub status: SlideStatus,
    pub output_url: Option<String>,
    pub error: Option<String>,
}

impl SlideOutcome {
    fn failed(slide_order: u32, error: String) -> Self {
        SlideOutcome {
            slide_order,
            status: SlideStatus::Error,
            output_url: None,
            error: Some(error),
        }
    }
}

/// Result of one batch, in slide order.
///
/// `slides` holds the slides the batch got to; when a persistence failure
/// aborts the batch the rest are only marked in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub carousel_id: String,
    pub status: CarouselStatus,
    pub slides: Vec<SlideOutcome>,
    pub error: Option<String>,
}

pub struct BatchRenderer {
    store: Arc<dyn CarouselStore>,
    rasterizer: Arc<dyn Rasterizer>,
    fallback: Arc<dyn Rasterizer>,
    content: Arc<dyn ContentStore>,
    policy: SlideFailurePolicy,
}

impl BatchRenderer {
    pub fn new(
        store: Arc<dyn CarouselStore>,
        rasterizer: Arc<dyn Rasterizer>,
        content: Arc<dyn ContentStore>,
        policy: SlideFailurePolicy,
    ) -> Self {
        BatchRenderer {
            store,
            rasterizer,
            fallback: Arc::new(FallbackRasterizer),
            content,
            policy,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Rasterizer>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Claims the carousel and renders it in the calling thread.
    pub fn generate(&self, carousel_id: &str) -> ServiceResult<BatchReport> {
        self.store.begin_generation(carousel_id)?;
        Ok(self.run(carousel_id))
    }

    /// Renders a carousel already claimed with `CarouselStore::begin_generation`.
    /// Always leaves the carousel in a terminal status.
    pub fn run(&self, carousel_id: &str) -> BatchReport {
        info!("Rendering carousel {}", carousel_id);
        let mut slides = Vec::new();

        let (status, failure) = match self.run_slides(carousel_id, &mut slides) {
            Ok(None) => (CarouselStatus::Completed, None),
            Ok(Some(reason)) => (CarouselStatus::Error, Some(reason)),
            Err(e) => {
                error!("Carousel {} aborted: {}", carousel_id, e);
                (CarouselStatus::Error, Some(e.to_string()))
            }
        };

        let error = match self
            .store
            .finish_carousel(carousel_id, status, failure.as_deref())
        {
            Ok(()) => failure,
            Err(e) => {
                // Startup recovery picks this carousel up if the store stays down.
                error!("Could not finish carousel {}: {}", carousel_id, e);
                Some(match failure {
                    Some(reason) => format!("{}; {}", reason, e),
                    None => e.to_string(),
                })
            }
        };
        let status = if error.is_some() {
            CarouselStatus::Error
        } else {
            status
        };

        let completed = slides
            .iter()
            .filter(|s| s.status == SlideStatus::Completed)
            .count();
        info!(
            "Carousel {} finished as {} ({}/{} slides completed)",
            carousel_id,
            status,
            completed,
            slides.len()
        );

        BatchReport {
            carousel_id: carousel_id.to_string(),
            status,
            slides,
            error,
        }
    }

    /// Returns the reason the carousel failed under `FailCarousel`.
    fn run_slides(
        &self,
        carousel_id: &str,
        outcomes: &mut Vec<SlideOutcome>,
    ) -> ServiceResult<Option<String>> {
        let slides = self.store.list_slides(carousel_id)?;
        let total = slides.len();

        let mut remaining = slides.iter();
        while let Some(slide) = remaining.next() {
            let outcome = self.render_slide(slide)?;
            self.store.record_slide(
                carousel_id,
                outcome.slide_order,
                outcome.status,
                outcome.output_url.as_deref(),
                outcome.error.as_deref(),
            )?;
            info!(
                "Carousel {} slide {}/{} (order {}): {}",
                carousel_id,
                outcomes.len() + 1,
                total,
                outcome.slide_order,
                outcome.status
            );

            let failed = outcome.status == SlideStatus::Error;
            let reason = format!(
                "slide {} failed: {}",
                outcome.slide_order,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            outcomes.push(outcome);

            if failed && self.policy == SlideFailurePolicy::FailCarousel {
                let skipped = format!("skipped after {}", reason);
                for rest in remaining.by_ref() {
                    self.store.record_slide(
                        carousel_id,
                        rest.slide_order,
                        SlideStatus::Error,
                        None,
                        Some(&skipped),
                    )?;
                    outcomes.push(SlideOutcome::failed(rest.slide_order, skipped.clone()));
                }
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }

    /// Only persistence failures escape; everything else becomes the outcome.
    fn render_slide(&self, slide: &Slide) -> ServiceResult<SlideOutcome> {
        let order = slide.slide_order;
        let template = match self.store.get_template(&slide.template_id) {
            Ok(template) => template,
            Err(ServiceError::NotFound(what)) => {
                warn!(
                    "Carousel {} slide {}: {} not found",
                    slide.carousel_id, order, what
                );
                return Ok(SlideOutcome::failed(order, format!("{} not found", what)));
            }
            Err(e) => return Err(e),
        };

        let markup = placeholder::resolve(&template.svg_content, &slide.replacements);
        let (width, height) = (template.width, template.height);

        let (bytes, note) = match self.rasterizer.render_to_raster(&markup, width, height) {
            Ok(bytes) => (bytes, None),
            Err(raster_err) => {
                warn!(
                    "Carousel {} slide {}: {}, using fallback image",
                    slide.carousel_id, order, raster_err
                );
                match self.fallback.render_to_raster(&markup, width, height) {
                    Ok(bytes) => (bytes, Some(raster_err.to_string())),
                    Err(fallback_err) => {
                        error!(
                            "Carousel {} slide {}: fallback image failed too: {}",
                            slide.carousel_id, order, fallback_err
                        );
                        return Ok(SlideOutcome::failed(
                            order,
                            format!("{}; fallback: {}", raster_err, fallback_err),
                        ));
                    }
                }
            }
        };

        let location = self.content.put_output(&slide.carousel_id, order, &bytes)?;
        Ok(SlideOutcome {
            slide_order: order,
            status: SlideStatus::Completed,
            output_url: Some(location),
            error: note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::content::FsContentStore;
    use crate::storage::seed::seed_if_empty;
    use crate::storage::sqlite::SqliteStore;
    use crate::storage::UpsertOutcome;
    use common::jobs::Progress;
    use common::model::carousel::{Carousel, NewSlide, Substitutions};
    use common::model::template::Template;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Returns the resolved markup as the "image" and remembers what it saw.
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, u32, u32)>>,
    }

    impl Rasterizer for Recording {
        fn render_to_raster(&self, markup: &str, width: u32, height: u32) -> ServiceResult<Vec<u8>> {
            self.calls
                .lock()
                .unwrap()
                .push((markup.to_string(), width, height));
            Ok(markup.as_bytes().to_vec())
        }
    }

    /// Fails whenever the markup contains the marker.
    struct FailOn(&'static str);

    impl Rasterizer for FailOn {
        fn render_to_raster(&self, markup: &str, _: u32, _: u32) -> ServiceResult<Vec<u8>> {
            if markup.contains(self.0) {
                Err(ServiceError::Rasterization("renderer crashed".to_string()))
            } else {
                Ok(markup.as_bytes().to_vec())
            }
        }
    }

    struct AlwaysFails;

    impl Rasterizer for AlwaysFails {
        fn render_to_raster(&self, _: &str, _: u32, _: u32) -> ServiceResult<Vec<u8>> {
            Err(ServiceError::Rasterization("no canvas".to_string()))
        }
    }

    /// Delegates to SQLite but refuses to record one slide.
    struct BrokenRecords {
        inner: SqliteStore,
        fail_order: u32,
    }

    impl CarouselStore for BrokenRecords {
        fn upsert_template(&self, template: &Template) -> ServiceResult<UpsertOutcome> {
            self.inner.upsert_template(template)
        }
        fn get_template(&self, id: &str) -> ServiceResult<Template> {
            self.inner.get_template(id)
        }
        fn list_templates(&self) -> ServiceResult<Vec<Template>> {
            self.inner.list_templates()
        }
        fn create_carousel(&self, name: &str, slides: &[NewSlide]) -> ServiceResult<Carousel> {
            self.inner.create_carousel(name, slides)
        }
        fn get_carousel(&self, id: &str) -> ServiceResult<Carousel> {
            self.inner.get_carousel(id)
        }
        fn list_slides(&self, carousel_id: &str) -> ServiceResult<Vec<Slide>> {
            self.inner.list_slides(carousel_id)
        }
        fn progress(&self, carousel_id: &str) -> ServiceResult<Progress> {
            self.inner.progress(carousel_id)
        }
        fn begin_generation(&self, carousel_id: &str) -> ServiceResult<()> {
            self.inner.begin_generation(carousel_id)
        }
        fn record_slide(
            &self,
            carousel_id: &str,
            slide_order: u32,
            status: SlideStatus,
            output_url: Option<&str>,
            error: Option<&str>,
        ) -> ServiceResult<()> {
            if slide_order == self.fail_order {
                return Err(ServiceError::Persistence("database is locked".to_string()));
            }
            self.inner
                .record_slide(carousel_id, slide_order, status, output_url, error)
        }
        fn finish_carousel(
            &self,
            carousel_id: &str,
            status: CarouselStatus,
            error: Option<&str>,
        ) -> ServiceResult<()> {
            self.inner.finish_carousel(carousel_id, status, error)
        }
        fn recover_interrupted(&self) -> ServiceResult<usize> {
            self.inner.recover_interrupted()
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<SqliteStore>,
        content: Arc<FsContentStore>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path().join("flyers.db")).unwrap());
        seed_if_empty(store.as_ref()).unwrap();
        let content = Arc::new(FsContentStore::new(dir.path().join("output")).unwrap());
        Fixture {
            _dir: dir,
            store,
            content,
        }
    }

    impl Fixture {
        fn renderer(&self, rasterizer: Arc<dyn Rasterizer>, policy: SlideFailurePolicy) -> BatchRenderer {
            BatchRenderer::new(self.store.clone(), rasterizer, self.content.clone(), policy)
        }

        fn output(&self, carousel_id: &str, order: u32) -> String {
            String::from_utf8(self.content.get_output(carousel_id, order).unwrap()).unwrap()
        }
    }

    fn values(value: serde_json::Value) -> Substitutions {
        serde_json::from_value(value).unwrap()
    }

    fn slide(template_id: &str, order: u32, replacements: serde_json::Value) -> NewSlide {
        NewSlide {
            template_id: template_id.to_string(),
            replacements: values(replacements),
            slide_order: order,
        }
    }

    #[test]
    fn listing_renders_every_slide_with_its_values() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel(
                "Listing A",
                &[
                    slide(
                        "open-house-main",
                        1,
                        json!({"propertyaddress": "12 Oak St", "name": "Jane Doe"}),
                    ),
                    slide(
                        "open-house-photo",
                        2,
                        json!({"photo": "https://img.example.com/a.jpg", "propertyaddress": "12 Oak St"}),
                    ),
                ],
            )
            .unwrap();

        let recorder = Arc::new(Recording::default());
        let report = f
            .renderer(recorder.clone(), SlideFailurePolicy::Continue)
            .generate(&carousel.id)
            .unwrap();

        assert_eq!(report.status, CarouselStatus::Completed);
        assert_eq!(report.error, None);
        assert_eq!(
            report.slides.iter().map(|s| s.slide_order).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(report.slides.iter().all(|s| s.status == SlideStatus::Completed));
        assert_eq!(
            report.slides[0].output_url.as_deref(),
            Some(format!("/output/{}/slide_1.png", carousel.id).as_str())
        );

        let first = f.output(&carousel.id, 1);
        assert!(first.contains("12 Oak St"));
        assert!(first.contains("Agent: Jane Doe"));
        assert!(!first.contains("{dyno.propertyaddress}"));
        let second = f.output(&carousel.id, 2);
        assert!(second.contains(r#"href="https://img.example.com/a.jpg""#));

        let calls = recorder.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, w, h)| (*w, *h) == (400, 600)));

        let stored = f.store.get_carousel(&carousel.id).unwrap();
        assert_eq!(stored.status, CarouselStatus::Completed);
        assert!(stored.completed_at.is_some());
        assert_eq!(
            f.store.progress(&carousel.id).unwrap(),
            Progress { done: 2, total: 2 }
        );
    }

    #[test]
    fn unmapped_tokens_pass_through_per_slide() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel(
                "Listing A",
                &[
                    slide(
                        "open-house-main",
                        1,
                        json!({"propertyaddress": "12 Elm St", "name": "Jane Doe", "phone": "555-1234"}),
                    ),
                    slide(
                        "sold-main",
                        2,
                        json!({"propertyaddress": "12 Elm St", "name": "Jane Doe"}),
                    ),
                ],
            )
            .unwrap();

        let report = f
            .renderer(Arc::new(Recording::default()), SlideFailurePolicy::Continue)
            .generate(&carousel.id)
            .unwrap();
        assert_eq!(report.status, CarouselStatus::Completed);
        assert!(report.slides.iter().all(|s| s.status == SlideStatus::Completed));

        let first = f.output(&carousel.id, 1);
        assert!(first.contains("12 Elm St"));
        assert!(first.contains("Agent: Jane Doe"));
        assert!(first.contains("Phone: 555-1234"));
        assert!(!first.contains("{dyno.phone}"));

        let second = f.output(&carousel.id, 2);
        assert!(second.contains("12 Elm St"));
        assert!(second.contains("Sold by: Jane Doe"));
        assert!(second.contains("Phone: {dyno.phone}"));
        assert!(!second.contains("555-1234"));
    }

    #[test]
    fn slides_render_in_order_index_order() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel(
                "ordered",
                &[
                    slide("sold-main", 3, json!({"name": "third"})),
                    slide("sold-main", 1, json!({"name": "first"})),
                    slide("sold-main", 2, json!({"name": "second"})),
                ],
            )
            .unwrap();

        let recorder = Arc::new(Recording::default());
        let report = f
            .renderer(recorder.clone(), SlideFailurePolicy::Continue)
            .generate(&carousel.id)
            .unwrap();

        assert_eq!(
            report.slides.iter().map(|s| s.slide_order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        let seen: Vec<bool> = recorder
            .calls
            .lock()
            .unwrap()
            .iter()
            .zip(["first", "second", "third"])
            .map(|((markup, _, _), name)| markup.contains(&format!("Sold by: {}", name)))
            .collect();
        assert_eq!(seen, vec![true, true, true]);
    }

    #[test]
    fn failed_rasterization_falls_back_and_completes() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel(
                "fallback",
                &[
                    slide("sold-main", 1, json!({"name": "ok"})),
                    slide("sold-main", 2, json!({"name": "BROKEN"})),
                    slide("sold-main", 3, json!({"name": "ok"})),
                ],
            )
            .unwrap();

        let report = f
            .renderer(Arc::new(FailOn("BROKEN")), SlideFailurePolicy::Continue)
            .generate(&carousel.id)
            .unwrap();

        assert_eq!(report.status, CarouselStatus::Completed);
        let second = &report.slides[1];
        assert_eq!(second.status, SlideStatus::Completed);
        assert!(second.output_url.is_some());
        assert!(second
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("renderer crashed"));

        let fallback = f.content.get_output(&carousel.id, 2).unwrap();
        assert!(fallback.starts_with(b"\x89PNG"));
        assert_eq!(f.store.list_slides(&carousel.id).unwrap()[1].status, SlideStatus::Completed);
    }

    #[test]
    fn failed_fallback_errors_the_slide_only() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel(
                "no fallback",
                &[
                    slide("sold-main", 1, json!({"name": "BROKEN"})),
                    slide("sold-main", 2, json!({"name": "ok"})),
                ],
            )
            .unwrap();

        let report = f
            .renderer(Arc::new(FailOn("BROKEN")), SlideFailurePolicy::Continue)
            .with_fallback(Arc::new(AlwaysFails))
            .generate(&carousel.id)
            .unwrap();

        assert_eq!(report.status, CarouselStatus::Completed);
        assert_eq!(report.slides[0].status, SlideStatus::Error);
        assert_eq!(report.slides[0].output_url, None);
        assert_eq!(report.slides[1].status, SlideStatus::Completed);

        let stored = f.store.list_slides(&carousel.id).unwrap();
        assert_eq!(stored[0].status, SlideStatus::Error);
        assert_eq!(stored[0].output_url, None);
        assert!(f.content.get_output(&carousel.id, 1).is_err());
    }

    #[test]
    fn missing_template_errors_the_slide_and_continues() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel(
                "missing",
                &[
                    slide("no-such-template", 1, json!({})),
                    slide("sold-main", 2, json!({})),
                ],
            )
            .unwrap();

        let report = f
            .renderer(Arc::new(Recording::default()), SlideFailurePolicy::Continue)
            .generate(&carousel.id)
            .unwrap();

        assert_eq!(report.status, CarouselStatus::Completed);
        assert_eq!(report.slides[0].status, SlideStatus::Error);
        assert!(report.slides[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("no-such-template"));
        assert_eq!(report.slides[1].status, SlideStatus::Completed);
    }

    #[test]
    fn uncoercible_values_do_not_fail_the_slide() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel(
                "odd values",
                &[slide("sold-main", 1, json!({"name": null, "phone": [1, 2]}))],
            )
            .unwrap();

        let report = f
            .renderer(Arc::new(Recording::default()), SlideFailurePolicy::Continue)
            .generate(&carousel.id)
            .unwrap();

        assert_eq!(report.slides[0].status, SlideStatus::Completed);
        assert!(f.output(&carousel.id, 1).contains("{dyno.name}"));
    }

    #[test]
    fn fail_carousel_policy_stops_at_the_first_error() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel(
                "strict",
                &[
                    slide("sold-main", 1, json!({"name": "ok"})),
                    slide("sold-main", 2, json!({"name": "BROKEN"})),
                    slide("sold-main", 3, json!({"name": "ok"})),
                ],
            )
            .unwrap();

        let renderer = f
            .renderer(Arc::new(FailOn("BROKEN")), SlideFailurePolicy::FailCarousel)
            .with_fallback(Arc::new(AlwaysFails));
        let report = renderer.generate(&carousel.id).unwrap();

        assert_eq!(report.status, CarouselStatus::Error);
        assert!(report.error.as_deref().unwrap_or_default().starts_with("slide 2 failed"));
        let statuses: Vec<SlideStatus> = report.slides.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![SlideStatus::Completed, SlideStatus::Error, SlideStatus::Error]
        );
        assert!(report.slides[2]
            .error
            .as_deref()
            .unwrap_or_default()
            .starts_with("skipped"));

        let stored = f.store.get_carousel(&carousel.id).unwrap();
        assert_eq!(stored.status, CarouselStatus::Error);
        assert!(f
            .store
            .list_slides(&carousel.id)
            .unwrap()
            .iter()
            .all(|s| s.status.is_terminal()));
    }

    #[test]
    fn persistence_failure_aborts_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let inner = SqliteStore::open(dir.path().join("flyers.db")).unwrap();
        seed_if_empty(&inner).unwrap();
        let store = Arc::new(BrokenRecords {
            inner,
            fail_order: 2,
        });
        let content = Arc::new(FsContentStore::new(dir.path().join("output")).unwrap());
        let carousel = store
            .create_carousel(
                "unlucky",
                &[
                    slide("sold-main", 1, json!({})),
                    slide("sold-main", 2, json!({})),
                    slide("sold-main", 3, json!({})),
                ],
            )
            .unwrap();

        let renderer = BatchRenderer::new(
            store.clone(),
            Arc::new(Recording::default()),
            content,
            SlideFailurePolicy::Continue,
        );
        let report = renderer.generate(&carousel.id).unwrap();

        assert_eq!(report.status, CarouselStatus::Error);
        assert!(report
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("database is locked"));
        assert_eq!(report.slides.len(), 1);

        let stored = store.get_carousel(&carousel.id).unwrap();
        assert_eq!(stored.status, CarouselStatus::Error);
        let slides = store.list_slides(&carousel.id).unwrap();
        assert_eq!(slides[0].status, SlideStatus::Completed);
        assert_eq!(slides[1].status, SlideStatus::Error);
        assert_eq!(slides[2].status, SlideStatus::Error);
    }

    #[test]
    fn a_claimed_carousel_cannot_be_generated_twice() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel("busy", &[slide("sold-main", 1, json!({}))])
            .unwrap();
        f.store.begin_generation(&carousel.id).unwrap();

        let err = f
            .renderer(Arc::new(Recording::default()), SlideFailurePolicy::Continue)
            .generate(&carousel.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyGenerating(_)));
    }

    #[test]
    fn template_updates_do_not_touch_existing_outputs() {
        let f = fixture();
        let carousel = f
            .store
            .create_carousel("stable", &[slide("sold-main", 1, json!({"name": "Ann"}))])
            .unwrap();
        let renderer = f.renderer(Arc::new(Recording::default()), SlideFailurePolicy::Continue);
        renderer.generate(&carousel.id).unwrap();
        let before = f.output(&carousel.id, 1);

        let mut template = f.store.get_template("sold-main").unwrap();
        template.svg_content = "<svg width=\"400\" height=\"600\"><text>new</text></svg>".to_string();
        assert_eq!(f.store.upsert_template(&template).unwrap(), UpsertOutcome::Updated);

        assert_eq!(f.output(&carousel.id, 1), before);
        assert!(before.contains("Sold by: Ann"));
    }

    #[test]
    fn failure_policy_parses() {
        assert_eq!(
            "continue".parse::<SlideFailurePolicy>(),
            Ok(SlideFailurePolicy::Continue)
        );
        assert_eq!(
            " Fail-Carousel ".parse::<SlideFailurePolicy>(),
            Ok(SlideFailurePolicy::FailCarousel)
        );
        assert!("sometimes".parse::<SlideFailurePolicy>().is_err());
        assert_eq!(SlideFailurePolicy::FailCarousel.to_string(), "fail-carousel");
    }
}
