/*
 * IoT Mesh Platform Operator - Convergence Controller
 * Copyright (C) 2026 IoT Mesh
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::doc_markdown)]

//! Platform operator core library
//!
//! Watches `Platform` custom resources and converges the cluster toward
//! the stack each one declares: compiling desired child objects,
//! creating or correcting them, and bootstrapping the root credential.

pub mod crds;
pub mod platform;

// Re-export commonly used types
pub use crds::{Platform, PlatformSpec, PlatformStatus};
pub use platform::config::OperatorConfig;
pub use platform::{reconcile_platform, run_platform_controller};
