/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Storage records shared by the korral server: the diesel schema, the
//! watched event models and the SQL migrations under `migrations/`.

pub mod models;
pub mod schema;
