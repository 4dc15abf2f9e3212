/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::io;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio_native_tls::TlsConnector;

use super::{FtpConnectionProvider, FtpMaybeTlsStream, FtpTcpConnectionProvider};
use crate::types::FtpServerAddr;

/// TLS capable connection provider built on top of
/// [`FtpTcpConnectionProvider`].
///
/// With `implicit` set the control connection is wrapped right after
/// connect. Otherwise the wrap happens when the client calls
/// [`upgrade_control_tls`](FtpConnectionProvider::upgrade_control_tls)
/// after a successful AUTH TLS.
pub struct FtpTlsConnectionProvider {
    inner: FtpTcpConnectionProvider,
    connector: TlsConnector,
    domain: String,
    implicit: bool,
}

impl FtpTlsConnectionProvider {
    pub fn new(connector: native_tls::TlsConnector, domain: impl Into<String>) -> Self {
        FtpTlsConnectionProvider {
            inner: FtpTcpConnectionProvider::new(),
            connector: TlsConnector::from(connector),
            domain: domain.into(),
            implicit: false,
        }
    }

    /// Build with a default connector, trusting the system roots.
    pub fn with_default_connector(domain: impl Into<String>) -> Result<Self, native_tls::Error> {
        let connector = native_tls::TlsConnector::new()?;
        Ok(FtpTlsConnectionProvider::new(connector, domain))
    }

    pub fn set_implicit(&mut self, implicit: bool) {
        self.implicit = implicit;
    }

    pub fn set_bind_ip(&mut self, ip: IpAddr) {
        self.inner.set_bind_ip(ip);
    }

    async fn wrap(&self, stream: FtpMaybeTlsStream) -> io::Result<FtpMaybeTlsStream> {
        match stream {
            FtpMaybeTlsStream::Plain(tcp) => {
                let tls = self
                    .connector
                    .connect(&self.domain, tcp)
                    .await
                    .map_err(io::Error::other)?;
                Ok(FtpMaybeTlsStream::Tls(Box::new(tls)))
            }
            FtpMaybeTlsStream::Tls(_) => Ok(stream),
        }
    }
}

#[async_trait]
impl FtpConnectionProvider<FtpMaybeTlsStream, io::Error, ()> for FtpTlsConnectionProvider {
    async fn new_control_connection(
        &mut self,
        server: &FtpServerAddr,
        user_data: &(),
    ) -> io::Result<FtpMaybeTlsStream> {
        let tcp = self.inner.new_control_connection(server, user_data).await?;
        let stream = FtpMaybeTlsStream::Plain(tcp);
        if self.implicit {
            self.wrap(stream).await
        } else {
            Ok(stream)
        }
    }

    async fn new_data_connection(
        &mut self,
        server_addr: &FtpServerAddr,
        user_data: &(),
    ) -> io::Result<FtpMaybeTlsStream> {
        let tcp = self.inner.new_data_connection(server_addr, user_data).await?;
        Ok(FtpMaybeTlsStream::Plain(tcp))
    }

    async fn new_data_listener(&mut self, user_data: &()) -> io::Result<Option<SocketAddr>> {
        self.inner.new_data_listener(user_data).await
    }

    async fn accept_data_connection(&mut self, user_data: &()) -> io::Result<FtpMaybeTlsStream> {
        let tcp = self.inner.accept_data_connection(user_data).await?;
        Ok(FtpMaybeTlsStream::Plain(tcp))
    }

    async fn upgrade_control_tls(
        &mut self,
        stream: FtpMaybeTlsStream,
        _user_data: &(),
    ) -> io::Result<FtpMaybeTlsStream> {
        self.wrap(stream).await
    }

    async fn upgrade_data_tls(
        &mut self,
        stream: FtpMaybeTlsStream,
        _user_data: &(),
    ) -> io::Result<FtpMaybeTlsStream> {
        self.wrap(stream).await
    }
}
