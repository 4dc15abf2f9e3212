/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::time::Duration;

const DEFAULT_CONTROL_MAX_LINE_LEN: usize = 2048;
const DEFAULT_CONTROL_MAX_MULTI_LINES: usize = 64;
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_LIST_MAX_LINE_LEN: usize = 2048;
const DEFAULT_LIST_MAX_ENTRIES: usize = 8192;

const MINIMAL_LIST_ALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Default threshold for the large upload SIZE verification, see
/// [`FtpClientConfig::large_store_verify_size`].
const DEFAULT_LARGE_STORE_VERIFY_SIZE: u64 = 512 << 20;

#[derive(Clone)]
pub struct FtpControlConfig {
    pub max_line_len: usize,
    pub max_multi_lines: usize,
    pub command_timeout: Duration,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: DEFAULT_CONTROL_MAX_LINE_LEN,
            max_multi_lines: DEFAULT_CONTROL_MAX_MULTI_LINES,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct FtpTransferConfig {
    pub list_max_line_len: usize,
    pub list_max_entries: usize,
    list_all_timeout: Duration,
    pub end_wait_timeout: Duration,
    pub data_connect_timeout: Duration,
}

impl Default for FtpTransferConfig {
    fn default() -> Self {
        FtpTransferConfig {
            list_max_line_len: DEFAULT_LIST_MAX_LINE_LEN,
            list_max_entries: DEFAULT_LIST_MAX_ENTRIES,
            list_all_timeout: Duration::from_secs(60),
            end_wait_timeout: Duration::from_secs(30),
            data_connect_timeout: Duration::from_secs(30),
        }
    }
}

impl FtpTransferConfig {
    pub fn set_list_all_timeout(&mut self, timeout: Duration) {
        self.list_all_timeout = timeout.max(MINIMAL_LIST_ALL_TIMEOUT);
    }

    #[inline]
    pub fn list_all_timeout(&self) -> Duration {
        self.list_all_timeout
    }
}

/// How data connections get established.
///
/// Passive is the default and the recommended mode, it works through
/// NAT and stateful firewalls without any inbound rule.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FtpDataChannelMode {
    #[default]
    Passive,
    Active,
}

/// TLS usage on the control channel.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FtpTlsMode {
    #[default]
    None,
    /// TLS from the first byte, usually on port 990
    Implicit,
    /// plain connect, then upgrade via AUTH TLS (RFC 4217)
    Explicit,
}

impl FtpTlsMode {
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, FtpTlsMode::None)
    }
}

#[derive(Clone)]
pub struct FtpClientConfig {
    pub control: FtpControlConfig,
    pub transfer: FtpTransferConfig,
    pub connect_timeout: Duration,
    pub greeting_timeout: Duration,
    pub always_try_epsv: bool,
    pub data_channel: FtpDataChannelMode,
    pub tls: FtpTlsMode,
    /// wrap data connections with TLS (PROT P) when TLS is enabled
    pub protect_data: bool,
    /// Stores of at least this many bytes that miss the final control reply
    /// are still accepted if a SIZE query returns exactly the uploaded byte
    /// count. Some servers are known to drop the end reply for large uploads.
    pub large_store_verify_size: u64,
}

impl Default for FtpClientConfig {
    fn default() -> Self {
        FtpClientConfig {
            control: FtpControlConfig::default(),
            transfer: FtpTransferConfig::default(),
            connect_timeout: Duration::from_secs(30),
            greeting_timeout: Duration::from_secs(10),
            always_try_epsv: true,
            data_channel: FtpDataChannelMode::default(),
            tls: FtpTlsMode::default(),
            protect_data: true,
            large_store_verify_size: DEFAULT_LARGE_STORE_VERIFY_SIZE,
        }
    }
}
