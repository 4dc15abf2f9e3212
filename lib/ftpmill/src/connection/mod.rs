/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::error::Error;
use std::net::SocketAddr;

use async_trait::async_trait;

use crate::types::FtpServerAddr;

mod tcp;
pub use tcp::FtpTcpConnectionProvider;

#[cfg(feature = "tls")]
mod stream;
#[cfg(feature = "tls")]
pub use stream::FtpMaybeTlsStream;

#[cfg(feature = "tls")]
mod tls;
#[cfg(feature = "tls")]
pub use tls::FtpTlsConnectionProvider;

/// Supplies control and data streams to [`FtpClient`](crate::FtpClient).
///
/// `T` is the stream type, `E` the provider's own error type, and `UD` is
/// opaque user data passed through on every call.
#[async_trait]
pub trait FtpConnectionProvider<T, E, UD>: Send
where
    T: Send + 'static,
    E: Error,
    UD: Sync,
{
    async fn new_control_connection(
        &mut self,
        server: &FtpServerAddr,
        user_data: &UD,
    ) -> Result<T, E>;

    /// Connect to a server advertised passive address. The address host
    /// from PASV may be overridden by the provider, e.g. to reuse the
    /// control connection peer ip.
    async fn new_data_connection(
        &mut self,
        server_addr: &FtpServerAddr,
        user_data: &UD,
    ) -> Result<T, E>;

    /// Open a local listener for an active mode transfer and return the
    /// address to advertise with PORT / EPRT. `Ok(None)` means active
    /// mode is not supported by this provider.
    async fn new_data_listener(&mut self, _user_data: &UD) -> Result<Option<SocketAddr>, E> {
        Ok(None)
    }

    /// Accept the server's inbound connection on the listener opened by
    /// [`new_data_listener`](Self::new_data_listener).
    async fn accept_data_connection(&mut self, user_data: &UD) -> Result<T, E>;

    /// Wrap the control stream in TLS after AUTH TLS was accepted.
    /// The default is a pass-through for plaintext providers.
    async fn upgrade_control_tls(&mut self, stream: T, _user_data: &UD) -> Result<T, E> {
        Ok(stream)
    }

    /// Wrap a data stream in TLS when PROT P is active.
    async fn upgrade_data_tls(&mut self, stream: T, _user_data: &UD) -> Result<T, E> {
        Ok(stream)
    }
}
