/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

mod connect;
pub use connect::FtpConnectError;

mod response;
pub use response::FtpRawResponseError;

mod command;
pub use command::FtpCommandError;

mod session;
pub(crate) use session::FtpAuthStatus;
pub use session::FtpSessionOpenError;

mod transfer;
pub use transfer::{FtpLineDataReadError, FtpTransferServerError, FtpTransferSetupError};

mod file;
pub(crate) use file::FtpFilePreTransferStatus;
pub use file::{
    FtpFileFactsParseError, FtpFileListError, FtpFileRetrieveStartError, FtpFileStatError,
    FtpFileStoreStartError, FtpFileTransferError,
};
