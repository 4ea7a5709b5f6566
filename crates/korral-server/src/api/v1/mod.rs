/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

mod clusters;
mod events;
mod exec;

use crate::api::AppState;
use axum::Router;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(clusters::routes())
        .merge(events::routes())
        .merge(exec::routes())
}
