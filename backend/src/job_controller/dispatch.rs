//! # Render Dispatch
//!
//! A batch is always claimed in the request (`begin_generation`), so a second
//! generate call for the same carousel is rejected before anything runs. The
//! batch itself is synchronous and runs on tokio's blocking pool:
//!
//! - `schedule_generation` spawns it and returns at once; clients poll the
//!   slides endpoint, which reads progress straight from the store.
//! - `generate_now` awaits it and hands back the report.
//!
//! If the blocking task dies, the carousel is failed here so it never stays
//! `generating`.

use crate::error::{ServiceError, ServiceResult};
use crate::job_controller::state::AppState;
use crate::render::batch::BatchReport;
use common::jobs::CarouselStatus;
use log::{error, info};
use tokio::task::JoinError;

/// Claims the carousel and renders it in the background.
pub async fn schedule_generation(state: &AppState, carousel_id: &str) -> ServiceResult<()> {
    state.store.begin_generation(carousel_id)?;

    let state = state.clone();
    let carousel_id = carousel_id.to_string();
    tokio::spawn(async move {
        match run_claimed(&state, &carousel_id).await {
            Ok(report) => info!(
                "Background batch for carousel {} ended as {}",
                carousel_id, report.status
            ),
            Err(e) => error!("Background batch for carousel {} failed: {}", carousel_id, e),
        }
    });

    Ok(())
}

/// Claims the carousel and waits for the whole batch.
pub async fn generate_now(state: &AppState, carousel_id: &str) -> ServiceResult<BatchReport> {
    let renderer = state.renderer.clone();
    let id = carousel_id.to_string();
    match tokio::task::spawn_blocking(move || renderer.generate(&id)).await {
        Ok(result) => result,
        Err(join_err) => Err(fail_interrupted(state, carousel_id, join_err)),
    }
}

async fn run_claimed(state: &AppState, carousel_id: &str) -> ServiceResult<BatchReport> {
    let renderer = state.renderer.clone();
    let id = carousel_id.to_string();
    match tokio::task::spawn_blocking(move || renderer.run(&id)).await {
        Ok(report) => Ok(report),
        Err(join_err) => Err(fail_interrupted(state, carousel_id, join_err)),
    }
}

fn fail_interrupted(state: &AppState, carousel_id: &str, join_err: JoinError) -> ServiceError {
    let message = format!("render task failed: {}", join_err);
    error!("Carousel {}: {}", carousel_id, message);
    if let Err(e) = state
        .store
        .finish_carousel(carousel_id, CarouselStatus::Error, Some(&message))
    {
        error!("Could not fail carousel {}: {}", carousel_id, e);
    }
    ServiceError::Rasterization(message)
}
