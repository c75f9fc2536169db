// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verdant Auth - account and session service for the Verdant plant-care
//! platform.
//!
//! Issues and validates bearer tokens, keeps a server-side session registry
//! next to them, and runs the single-use password reset protocol.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Tokens, password hashing, reset secrets, request gates
//! - `email` - Fire-and-forget outbound email
//! - `storage` - Embedded redb database (principals, sessions, reset secrets)
//! - `sweeper` - Background purge of expired rows

pub mod api;
pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod sweeper;
