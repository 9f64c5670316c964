// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backend plugin implementations

pub mod cassandra;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
