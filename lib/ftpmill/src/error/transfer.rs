/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::io;

use thiserror::Error;

use super::FtpRawResponseError;
use super::command::FtpCommandError;
use crate::control::FtpCommand;

/// Errors while negotiating and opening a data connection.
///
/// Connection provider failures are carried as rendered strings so that
/// the transfer error types stay independent of the provider error type.
#[derive(Debug, Error)]
pub enum FtpTransferSetupError {
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("command error: {0}")]
    CommandError(FtpCommandError),
    #[error("data connect failed: {0}")]
    DataConnectFailed(String),
    #[error("timed out to connect data channel")]
    DataConnectTimedOut,
    #[error("data listen failed: {0}")]
    DataListenFailed(String),
    #[error("data accept failed: {0}")]
    DataAcceptFailed(String),
    #[error("timed out to accept data connection")]
    DataAcceptTimedOut,
    #[error("tls upgrade on data connection failed: {0}")]
    DataTlsUpgradeFailed(String),
    #[error("no usable data channel mode")]
    NoUsableDataChannelMode,
}

impl From<FtpCommandError> for FtpTransferSetupError {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpTransferSetupError::ServiceNotAvailable,
            _ => FtpTransferSetupError::CommandError(e),
        }
    }
}

/// Failure reported by the server at the end of a data transfer.
#[derive(Debug, Error)]
pub enum FtpTransferServerError {
    #[error("unable to recv reply: {0}")]
    RecvFailed(#[from] FtpRawResponseError),
    #[error("restart needed")]
    RestartNeeded,
    #[error("data transfer not established")]
    DataTransferNotEstablished,
    #[error("data transfer lost")]
    DataTransferLost,
    #[error("server failed")]
    ServerFailed,
    #[error("page type unknown")]
    PageTypeUnknown,
    #[error("exceeded storage allocation")]
    ExceededStorageAllocation,
    #[error("unexpected end reply code ({0} -> {1})")]
    UnexpectedEndReplyCode(FtpCommand, u16),
}

#[derive(Debug, Error)]
pub enum FtpLineDataReadError {
    #[error("read failed: {0:?}")]
    ReadFailed(#[from] io::Error),
    #[error("unsupported encoding")]
    UnsupportedEncoding,
    #[error("line {0} is too long")]
    LineTooLong(usize),
    #[error("too many lines")]
    TooManyLines,
    #[error("aborted by callback")]
    AbortedByCallback,
}
