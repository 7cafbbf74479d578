// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Middleware modules.

pub mod security;

pub use security::add_security_headers;
