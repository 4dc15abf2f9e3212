/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

mod line;

pub use line::FtpLineDataReceiver;
pub(crate) use line::FtpLineDataTransfer;

/// FTP representation type (TYPE command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtpTransferType {
    /// TYPE A, line ending translation on the wire
    Ascii,
    /// TYPE I, verbatim octets
    #[default]
    Image,
}
