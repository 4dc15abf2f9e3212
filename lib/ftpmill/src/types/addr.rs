/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

pub const FTP_DEFAULT_PORT: u16 = 21;

#[derive(Debug, Error)]
pub enum FtpServerAddrParseError {
    #[error("empty host")]
    EmptyHost,
    #[error("invalid port")]
    InvalidPort,
    #[error("invalid ipv6 address")]
    InvalidIpv6Addr,
}

/// Address of the FTP server, as a host (domain or IP) and a port.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FtpServerAddr {
    host: String,
    port: u16,
}

impl FtpServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        FtpServerAddr {
            host: host.into(),
            port,
        }
    }

    pub fn from_ip_addr(ip: IpAddr, port: u16) -> Self {
        FtpServerAddr {
            host: ip.to_string(),
            port,
        }
    }

    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        Self::from_ip_addr(addr.ip(), addr.port())
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

impl fmt::Display for FtpServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for FtpServerAddr {
    type Err = FtpServerAddrParseError;

    /// Parse `host`, `host:port`, `[v6-addr]` or `[v6-addr]:port`.
    /// The port defaults to 21 when absent.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(FtpServerAddrParseError::EmptyHost);
        }

        if let Some(r) = s.strip_prefix('[') {
            let Some((host, rest)) = r.split_once(']') else {
                return Err(FtpServerAddrParseError::InvalidIpv6Addr);
            };
            if IpAddr::from_str(host).is_err() {
                return Err(FtpServerAddrParseError::InvalidIpv6Addr);
            }
            let port = match rest.strip_prefix(':') {
                Some(p) => u16::from_str(p).map_err(|_| FtpServerAddrParseError::InvalidPort)?,
                None if rest.is_empty() => FTP_DEFAULT_PORT,
                None => return Err(FtpServerAddrParseError::InvalidPort),
            };
            return Ok(FtpServerAddr::new(host, port));
        }

        match s.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                if host.is_empty() {
                    return Err(FtpServerAddrParseError::EmptyHost);
                }
                let port = u16::from_str(port).map_err(|_| FtpServerAddrParseError::InvalidPort)?;
                Ok(FtpServerAddr::new(host, port))
            }
            // a bare ipv6 address
            Some(_) => {
                if IpAddr::from_str(s).is_err() {
                    return Err(FtpServerAddrParseError::InvalidIpv6Addr);
                }
                Ok(FtpServerAddr::new(s, FTP_DEFAULT_PORT))
            }
            None => Ok(FtpServerAddr::new(s, FTP_DEFAULT_PORT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_domain() {
        let addr = FtpServerAddr::from_str("ftp.example.net").unwrap();
        assert_eq!(addr.host(), "ftp.example.net");
        assert_eq!(addr.port(), 21);
    }

    #[test]
    fn parse_domain_with_port() {
        let addr = FtpServerAddr::from_str("ftp.example.net:2121").unwrap();
        assert_eq!(addr.host(), "ftp.example.net");
        assert_eq!(addr.port(), 2121);
    }

    #[test]
    fn parse_v6() {
        let addr = FtpServerAddr::from_str("[2001:db8::1]:990").unwrap();
        assert_eq!(addr.host(), "2001:db8::1");
        assert_eq!(addr.port(), 990);

        let addr = FtpServerAddr::from_str("2001:db8::1").unwrap();
        assert_eq!(addr.host(), "2001:db8::1");
        assert_eq!(addr.port(), 21);
    }

    #[test]
    fn parse_invalid() {
        assert!(FtpServerAddr::from_str("").is_err());
        assert!(FtpServerAddr::from_str("host:70000").is_err());
        assert!(FtpServerAddr::from_str("[not-v6]:21").is_err());
    }
}
