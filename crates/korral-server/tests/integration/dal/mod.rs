/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Database-backed tests. Run with `--ignored` against a PostgreSQL at
//! `DATABASE_URL`.

mod watched_events;
