/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

//! Recursive directory tree operations on top of [`ftpmill::FtpClient`]:
//! recursive listing, upload/download mirroring, recursive delete and
//! size/count aggregation.
//!
//! All operations run on the single control connection of the wrapped
//! client and are strictly sequential. Operations that move the server
//! side working directory always restore it before returning.

mod error;
pub use error::FtpTreeError;

mod session;
pub use session::FtpTreeSession;

mod scan;
pub use scan::{FtpDirEntry, FtpListOrder};

mod delete;

mod mirror;
