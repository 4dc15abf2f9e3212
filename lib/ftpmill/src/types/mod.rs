/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

mod addr;
pub use addr::FtpServerAddr;

mod auth;
pub use auth::{Password, Username};
