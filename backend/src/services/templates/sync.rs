//! # Template Sync
//!
//! `POST /api/templates/sync` takes the full template set of the admin side.
//! Entries are validated in parallel with rayon; the valid ones are upserted
//! in request order and the invalid ones come back under `skipped`.

use crate::error::{ServiceError, ServiceResult};
use crate::job_controller::state::AppState;
use crate::services::templates::upload::prepare_template;
use crate::storage::{CarouselStore, UpsertOutcome};
use actix_web::{web, HttpResponse};
use common::requests::{SyncTemplatesRequest, UploadTemplateRequest};
use log::{info, warn};
use rayon::prelude::*;

pub(crate) async fn process(
    state: web::Data<AppState>,
    payload: web::Json<SyncTemplatesRequest>,
) -> ServiceResult<HttpResponse> {
    let entries = payload
        .into_inner()
        .templates
        .ok_or_else(|| ServiceError::Validation("Missing templates array".to_string()))?;

    let store = state.store.clone();
    let SyncResult {
        created,
        updated,
        unchanged,
        skipped,
    } = web::block(move || sync_blocking(store.as_ref(), entries))
        .await
        .map_err(|e| ServiceError::Persistence(e.to_string()))??;

    let synced_count = created.len() + updated.len() + unchanged.len();
    info!(
        "Synced {} templates ({} created, {} updated, {} skipped)",
        synced_count,
        created.len(),
        updated.len(),
        skipped.len()
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Synced {} templates", synced_count),
        "synced_count": synced_count,
        "created": created,
        "updated": updated,
        "unchanged": unchanged,
        "skipped": skipped,
    })))
}

#[derive(Default)]
struct SyncResult {
    created: Vec<String>,
    updated: Vec<String>,
    unchanged: Vec<String>,
    skipped: Vec<serde_json::Value>,
}

/// Validates on the rayon pool, then upserts in request order.
fn sync_blocking(
    store: &dyn CarouselStore,
    entries: Vec<UploadTemplateRequest>,
) -> ServiceResult<SyncResult> {
    let prepared: Vec<_> = entries
        .into_par_iter()
        .enumerate()
        .map(|(idx, entry)| {
            let label = entry
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("#{}", idx + 1));
            (label, prepare_template(entry))
        })
        .collect();

    let mut result = SyncResult::default();
    for (label, prepared) in prepared {
        match prepared {
            Ok((template, _)) => match store.upsert_template(&template)? {
                UpsertOutcome::Created => result.created.push(template.id),
                UpsertOutcome::Updated => result.updated.push(template.id),
                UpsertOutcome::Unchanged => result.unchanged.push(template.id),
            },
            Err(e) => {
                warn!("Sync skipped template {}: {}", label, e);
                result
                    .skipped
                    .push(serde_json::json!({ "id": label, "reason": e.to_string() }));
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use crate::services::json_config;
    use crate::services::test_support::{app_state, EchoRasterizer};
    use actix_web::{http::StatusCode, test, web, App};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn entry(id: &str, svg: &str) -> Value {
        json!({
            "id": id,
            "name": id,
            "category": "sold",
            "template_type": "flyer",
            "template_role": "main",
            "svg_content": svg,
        })
    }

    #[actix_web::test]
    async fn sync_reports_each_entry() {
        let (_dir, state) = app_state(Arc::new(EchoRasterizer));
        let app = test::init_service(
            App::new()
                .app_data(json_config(1 << 20))
                .app_data(web::Data::new(state.clone()))
                .service(super::super::configure_routes()),
        )
        .await;

        let seeded = state.store.get_template("sold-main").unwrap();
        let req = test::TestRequest::post()
            .uri("/api/templates/sync")
            .set_json(json!({
                "templates": [
                    entry("fresh", "<svg><text>{dyno.name}</text></svg>"),
                    entry("sold-main", &seeded.svg_content),
                    entry("broken", "<svg><text>"),
                    {"name": "no id"},
                ]
            }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp["success"], true);
        assert_eq!(resp["synced_count"], 2);
        assert_eq!(resp["created"], json!(["fresh"]));
        assert_eq!(resp["unchanged"], json!(["sold-main"]));
        assert_eq!(resp["skipped"][0]["id"], "broken");
        assert_eq!(resp["skipped"][1]["id"], "#4");
        assert_eq!(resp["skipped"][1]["reason"], "Missing required field: id");
    }

    #[actix_web::test]
    async fn sync_requires_a_templates_array() {
        let (_dir, state) = app_state(Arc::new(EchoRasterizer));
        let app = test::init_service(
            App::new()
                .app_data(json_config(1 << 20))
                .app_data(web::Data::new(state))
                .service(super::super::configure_routes()),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/templates/sync")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
