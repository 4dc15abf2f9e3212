/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

//! An async FTP / FTPS client protocol implementation.
//!
//! The control channel is generic over any `AsyncRead + AsyncWrite` stream.
//! Connection establishment, passive/active data sockets and optional TLS
//! wrapping are delegated to a [`FtpConnectionProvider`], so the same client
//! works over plain TCP, TLS, or any caller supplied transport.

mod debug;
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};

mod config;
pub use config::{
    FtpClientConfig, FtpControlConfig, FtpDataChannelMode, FtpTlsMode, FtpTransferConfig,
};

pub mod error;

mod types;
pub use types::{FtpServerAddr, Password, Username};

mod io_ext;

mod feature;
pub use feature::FtpServerFeature;

mod control;

mod transfer;
pub use transfer::{FtpLineDataReceiver, FtpTransferType};

mod facts;
pub use facts::{FtpFileEntryType, FtpFileFacts};

pub mod listing;
pub use listing::{FtpListEntry, FtpListEntryType, FtpListingAccumulator};

mod connection;
pub use connection::{FtpConnectionProvider, FtpTcpConnectionProvider};
#[cfg(feature = "tls")]
pub use connection::{FtpMaybeTlsStream, FtpTlsConnectionProvider};

mod client;
pub use client::FtpClient;
