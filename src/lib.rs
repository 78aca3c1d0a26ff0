// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Library entry exposing compiler modules.
pub mod cli;
pub mod compiler;
pub mod exprparse;
