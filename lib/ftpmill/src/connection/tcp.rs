/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::io;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use super::FtpConnectionProvider;
use crate::types::FtpServerAddr;

/// Plain TCP connection provider.
///
/// The data connection in passive mode always goes to the ip the control
/// connection was established to, as the address part of a PASV reply is
/// unreliable behind NAT.
#[derive(Default)]
pub struct FtpTcpConnectionProvider {
    bind_ip: Option<IpAddr>,
    local_addr: Option<SocketAddr>,
    remote_addr: Option<SocketAddr>,
    listener: Option<TcpListener>,
}

impl FtpTcpConnectionProvider {
    pub fn new() -> Self {
        FtpTcpConnectionProvider::default()
    }

    pub fn set_bind_ip(&mut self, ip: IpAddr) {
        self.bind_ip = Some(ip);
    }

    async fn connect_to(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if let Some(ip) = self.bind_ip {
            socket.bind(SocketAddr::new(ip, 0))?;
        }
        socket.connect(addr).await
    }
}

#[async_trait]
impl FtpConnectionProvider<TcpStream, io::Error, ()> for FtpTcpConnectionProvider {
    async fn new_control_connection(
        &mut self,
        server: &FtpServerAddr,
        _user_data: &(),
    ) -> io::Result<TcpStream> {
        let mut err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addr resolved");
        for addr in tokio::net::lookup_host(server.to_string()).await? {
            match self.connect_to(addr).await {
                Ok(stream) => {
                    self.local_addr = Some(stream.local_addr()?);
                    self.remote_addr = Some(addr);
                    return Ok(stream);
                }
                Err(e) => err = e,
            }
        }

        Err(err)
    }

    async fn new_data_connection(
        &mut self,
        server_addr: &FtpServerAddr,
        _user_data: &(),
    ) -> io::Result<TcpStream> {
        match self.remote_addr {
            Some(addr) => {
                let data_addr = SocketAddr::new(addr.ip(), server_addr.port());
                self.connect_to(data_addr).await
            }
            None => Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no connected control addr found",
            )),
        }
    }

    async fn new_data_listener(&mut self, _user_data: &()) -> io::Result<Option<SocketAddr>> {
        let Some(local) = self.local_addr else {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no connected control addr found",
            ));
        };

        let listener = TcpListener::bind(SocketAddr::new(local.ip(), 0)).await?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(Some(addr))
    }

    async fn accept_data_connection(&mut self, _user_data: &()) -> io::Result<TcpStream> {
        let Some(listener) = self.listener.take() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no data listener opened",
            ));
        };

        let (stream, _peer) = listener.accept().await?;
        Ok(stream)
    }
}
