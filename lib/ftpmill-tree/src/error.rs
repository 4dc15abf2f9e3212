/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::io;

use thiserror::Error;

use ftpmill::error::{
    FtpCommandError, FtpFileListError, FtpFileRetrieveStartError, FtpFileStatError,
    FtpFileTransferError,
};

#[derive(Debug, Error)]
pub enum FtpTreeError {
    #[error("command failed: {0}")]
    CommandFailed(#[from] FtpCommandError),
    #[error("file stat failed: {0}")]
    StatFailed(#[from] FtpFileStatError),
    #[error("list start failed: {0}")]
    ListStartFailed(#[from] FtpFileRetrieveStartError),
    #[error("list failed: {0}")]
    ListFailed(#[from] FtpFileListError),
    #[error("file transfer failed: {0}")]
    TransferFailed(#[from] FtpFileTransferError),
    #[error("local io failed: {0:?}")]
    LocalIoFailed(#[from] io::Error),
}
