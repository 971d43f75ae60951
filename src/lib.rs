// Copyright 2026 Vaultwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Vaultwatch library — DeFi vault Net APY tracker.
//!
//! Collects net APY readings for a registry of vaults from structured
//! APIs and provider web pages, persists dated snapshots, and serves
//! historical trend analysis over them.

pub mod acquisition;
pub mod collector;
pub mod error;
pub mod extraction;
pub mod reading;
pub mod registry;
pub mod renderer;
pub mod resolver;
pub mod temporal;
