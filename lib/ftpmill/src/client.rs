/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::error::Error;
use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::{FtpClientConfig, FtpDataChannelMode, FtpTlsMode};
use crate::connection::FtpConnectionProvider;
use crate::control::FtpControlChannel;
use crate::error::{
    FtpAuthStatus, FtpCommandError, FtpConnectError, FtpFileListError, FtpFilePreTransferStatus,
    FtpFileRetrieveStartError, FtpFileStatError, FtpFileStoreStartError, FtpFileTransferError,
    FtpRawResponseError, FtpSessionOpenError, FtpTransferServerError, FtpTransferSetupError,
};
use crate::facts::FtpFileFacts;
use crate::feature::FtpServerFeature;
use crate::transfer::{FtpLineDataReceiver, FtpLineDataTransfer, FtpTransferType};
use crate::types::{FtpServerAddr, Password, Username};

enum FtpDataChannel<T> {
    Connected(T),
    PendingAccept,
}

/// An FTP client session over one control connection.
///
/// All operations are strictly sequential, FTP does not allow pipelining
/// transfers over a single control connection. Callers needing parallel
/// transfers should open independent sessions.
pub struct FtpClient<CP, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
    E: Error,
    UD: Sync,
    CP: FtpConnectionProvider<T, E, UD>,
{
    config: FtpClientConfig,
    server: FtpServerAddr,
    control: FtpControlChannel<T>,
    connection_provider: CP,
    feature: FtpServerFeature,
    transfer_type: Option<FtpTransferType>,
    _phantom: PhantomData<(E, UD)>,
}

impl<CP, T, E, UD> FtpClient<CP, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: Error,
    UD: Sync,
    CP: FtpConnectionProvider<T, E, UD>,
{
    /// Open the control connection, wait for the server greeting and run
    /// feature negotiation (and the AUTH TLS upgrade in explicit TLS mode).
    ///
    /// The connection provider is handed back on failure so the caller can
    /// still inspect it.
    pub async fn connect_to(
        server: FtpServerAddr,
        mut connection_provider: CP,
        user_data: &UD,
        config: &FtpClientConfig,
    ) -> Result<Self, (FtpConnectError<E>, CP)> {
        let stream = match tokio::time::timeout(
            config.connect_timeout,
            connection_provider.new_control_connection(&server, user_data),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err((FtpConnectError::ConnectIoError(e), connection_provider)),
            Err(_) => return Err((FtpConnectError::ConnectTimedOut, connection_provider)),
        };

        let mut control = FtpControlChannel::new(stream, config.control.clone());
        match tokio::time::timeout(config.greeting_timeout, control.wait_greetings()).await {
            Ok(Ok(_)) => {}
            Ok(Err(FtpCommandError::ServiceNotAvailable)) => {
                return Err((FtpConnectError::ServiceNotAvailable, connection_provider));
            }
            Ok(Err(e)) => return Err((FtpConnectError::GreetingFailed(e), connection_provider)),
            Err(_) => return Err((FtpConnectError::GreetingTimedOut, connection_provider)),
        }

        if matches!(config.tls, FtpTlsMode::Explicit) {
            match control.request_auth_tls().await {
                Ok(_) => {}
                Err(FtpCommandError::ServiceNotAvailable) => {
                    return Err((FtpConnectError::ServiceNotAvailable, connection_provider));
                }
                Err(e) => {
                    return Err((FtpConnectError::NegotiationFailed(e), connection_provider));
                }
            }

            let stream = control.into_stream();
            let stream = match connection_provider
                .upgrade_control_tls(stream, user_data)
                .await
            {
                Ok(stream) => stream,
                Err(e) => return Err((FtpConnectError::TlsUpgradeFailed(e), connection_provider)),
            };
            control = FtpControlChannel::new(stream, config.control.clone());
        }

        let feature = match control.check_server_feature().await {
            Ok(feature) => feature,
            Err(FtpCommandError::ServiceNotAvailable) => {
                return Err((FtpConnectError::ServiceNotAvailable, connection_provider));
            }
            Err(e) => return Err((FtpConnectError::NegotiationFailed(e), connection_provider)),
        };

        if feature.support_utf8() {
            match control.set_use_utf8().await {
                Ok(_) => {}
                Err(FtpCommandError::ServiceNotAvailable) => {
                    return Err((FtpConnectError::ServiceNotAvailable, connection_provider));
                }
                Err(e) => {
                    return Err((FtpConnectError::NegotiationFailed(e), connection_provider));
                }
            }
        }

        Ok(FtpClient {
            config: config.clone(),
            server,
            control,
            connection_provider,
            feature,
            transfer_type: None,
            _phantom: PhantomData,
        })
    }

    #[inline]
    pub fn connection_provider(&self) -> &CP {
        &self.connection_provider
    }

    #[inline]
    pub fn server(&self) -> &FtpServerAddr {
        &self.server
    }

    #[inline]
    pub fn server_feature(&self) -> &FtpServerFeature {
        &self.feature
    }

    #[inline]
    pub fn transfer_end_wait_timeout(&self) -> Duration {
        self.config.transfer.end_wait_timeout
    }

    /// Log in. `None` credentials mean anonymous login.
    ///
    /// When TLS is enabled with data protection this also negotiates
    /// PBSZ 0 / PROT P so following data connections get encrypted.
    pub async fn new_user_session(
        &mut self,
        username: Option<&Username>,
        password: Option<&Password>,
    ) -> Result<(), FtpSessionOpenError> {
        match self.control.send_username(username).await? {
            FtpAuthStatus::LoggedIn => {}
            FtpAuthStatus::NeedPassword => match self.control.send_password(password).await? {
                FtpAuthStatus::LoggedIn => {}
                FtpAuthStatus::NeedAccount => return Err(FtpSessionOpenError::AccountIsNeeded),
                _ => return Err(FtpSessionOpenError::NotLoggedIn),
            },
            FtpAuthStatus::NeedAccount => return Err(FtpSessionOpenError::AccountIsNeeded),
            FtpAuthStatus::NotLoggedIn => return Err(FtpSessionOpenError::NotLoggedIn),
        }

        if self.config.tls.is_enabled() && self.config.protect_data {
            self.control.set_protection_buffer_zero().await?;
            self.control.set_data_protection_private().await?;
        }

        Ok(())
    }

    /// Send QUIT and drop the control connection.
    pub async fn quit_and_close(mut self) -> Result<(), FtpCommandError> {
        self.control.send_quit().await
    }

    /// Resolve as ready when the server pushed data on the control channel,
    /// e.g. an early end-of-transfer reply.
    pub async fn wait_control_read_ready(&mut self) -> Result<(), FtpRawResponseError> {
        self.control.wait_read_ready().await
    }

    pub async fn abort_transfer(&mut self) -> Result<(), FtpCommandError> {
        self.control.abort_transfer().await
    }

    pub async fn get_current_dir(&mut self) -> Result<String, FtpCommandError> {
        self.control.get_current_dir().await
    }

    pub async fn change_dir(&mut self, path: &str) -> Result<(), FtpFileStatError> {
        self.control.change_dir(path).await
    }

    pub async fn change_to_parent_dir(&mut self) -> Result<(), FtpFileStatError> {
        self.control.change_to_parent_dir().await
    }

    pub async fn make_dir(&mut self, path: &str) -> Result<(), FtpFileStatError> {
        self.control.make_dir(path).await
    }

    pub async fn remove_dir(&mut self, path: &str) -> Result<(), FtpFileStatError> {
        self.control.remove_dir(path).await
    }

    pub async fn delete_file(&mut self, path: &str) -> Result<(), FtpFileStatError> {
        self.control.delete_file(path).await
    }

    pub async fn rename(&mut self, from: &str, to: &str) -> Result<(), FtpFileStatError> {
        self.control.rename_from(from).await?;
        self.control.rename_to(to).await
    }

    pub async fn site_chmod(&mut self, mode: &str, path: &str) -> Result<(), FtpFileStatError> {
        self.control.site_chmod(mode, path).await
    }

    pub async fn site_chown(&mut self, owner: &str, path: &str) -> Result<(), FtpFileStatError> {
        self.control.site_chown(owner, path).await
    }

    pub async fn site_chgrp(&mut self, group: &str, path: &str) -> Result<(), FtpFileStatError> {
        self.control.site_chgrp(group, path).await
    }

    pub async fn file_size(&mut self, path: &str) -> Result<Option<u64>, FtpFileStatError> {
        if !self.feature.support_size() {
            return Err(FtpFileStatError::FeatUnavailable);
        }
        self.control.request_size(path).await.map_err(|e| e.into())
    }

    pub async fn file_modified_time(
        &mut self,
        path: &str,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, FtpFileStatError> {
        if !self.feature.support_mdtm() {
            return Err(FtpFileStatError::FeatUnavailable);
        }
        self.control.request_mtime(path).await.map_err(|e| e.into())
    }

    /// Fetch facts about a path, via MLST where advertised, with a SIZE
    /// and MDTM based fallback otherwise.
    pub async fn fetch_file_facts(&mut self, path: &str) -> Result<FtpFileFacts, FtpFileStatError> {
        if self.feature.support_mlst() {
            return match self.control.request_mlst(path).await {
                Ok(Some(ff)) => Ok(ff),
                Ok(None) => Err(FtpFileStatError::FileUnavailable),
                Err(e) => Err(e.into()),
            };
        }

        let mut ff = FtpFileFacts::new(path);
        if self.feature.support_size() {
            if let Some(size) = self.control.request_size(path).await? {
                ff.set_size(size);
            }
        }
        if self.feature.support_mdtm() {
            if let Some(mtime) = self.control.request_mtime(path).await? {
                ff.set_mtime(mtime);
            }
        }
        Ok(ff)
    }

    async fn ensure_transfer_type(&mut self, t: FtpTransferType) -> Result<(), FtpCommandError> {
        if self.transfer_type == Some(t) {
            return Ok(());
        }
        self.control.request_transfer_type(t).await?;
        self.transfer_type = Some(t);
        Ok(())
    }

    async fn passive_data_addr(&mut self) -> Result<FtpServerAddr, FtpTransferSetupError> {
        if self.config.always_try_epsv || self.feature.support_epsv() {
            match self.control.request_epsv_port().await {
                Ok(port) => {
                    let mut addr = self.server.clone();
                    addr.set_port(port);
                    return Ok(addr);
                }
                Err(
                    FtpCommandError::CommandNotImplemented(_)
                    | FtpCommandError::RejectedCommandSyntax(_)
                    | FtpCommandError::ParameterNotImplemented(_),
                ) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let addr = self.control.request_pasv_port().await?;
        Ok(FtpServerAddr::from_socket_addr(addr))
    }

    /// Negotiate the data channel before sending the transfer command.
    /// In passive mode this connects right away, in active mode the
    /// server connects back only after the transfer command, so the
    /// accept is deferred to [`finish_data_channel`](Self::finish_data_channel).
    async fn prepare_data_channel(
        &mut self,
        user_data: &UD,
    ) -> Result<FtpDataChannel<T>, FtpTransferSetupError> {
        match self.config.data_channel {
            FtpDataChannelMode::Passive => {
                let addr = self.passive_data_addr().await?;
                match tokio::time::timeout(
                    self.config.transfer.data_connect_timeout,
                    self.connection_provider.new_data_connection(&addr, user_data),
                )
                .await
                {
                    Ok(Ok(stream)) => Ok(FtpDataChannel::Connected(stream)),
                    Ok(Err(e)) => Err(FtpTransferSetupError::DataConnectFailed(e.to_string())),
                    Err(_) => Err(FtpTransferSetupError::DataConnectTimedOut),
                }
            }
            FtpDataChannelMode::Active => {
                let local = self
                    .connection_provider
                    .new_data_listener(user_data)
                    .await
                    .map_err(|e| FtpTransferSetupError::DataListenFailed(e.to_string()))?
                    .ok_or(FtpTransferSetupError::NoUsableDataChannelMode)?;
                if self.feature.support_eprt() || local.is_ipv6() {
                    self.control.send_active_eprt(local).await?;
                } else {
                    self.control.send_active_port(local).await?;
                }
                Ok(FtpDataChannel::PendingAccept)
            }
        }
    }

    async fn finish_data_channel(
        &mut self,
        setup: FtpDataChannel<T>,
        user_data: &UD,
    ) -> Result<T, FtpTransferSetupError> {
        let stream = match setup {
            FtpDataChannel::Connected(stream) => stream,
            FtpDataChannel::PendingAccept => {
                match tokio::time::timeout(
                    self.config.transfer.data_connect_timeout,
                    self.connection_provider.accept_data_connection(user_data),
                )
                .await
                {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => return Err(FtpTransferSetupError::DataAcceptFailed(e.to_string())),
                    Err(_) => return Err(FtpTransferSetupError::DataAcceptTimedOut),
                }
            }
        };

        if self.config.tls.is_enabled() && self.config.protect_data {
            self.connection_provider
                .upgrade_data_tls(stream, user_data)
                .await
                .map_err(|e| FtpTransferSetupError::DataTlsUpgradeFailed(e.to_string()))
        } else {
            Ok(stream)
        }
    }

    /// Start a LIST transfer and return the data stream. Feed it to
    /// [`list_directory_receive`](Self::list_directory_receive).
    pub async fn list_directory_detailed_start(
        &mut self,
        path: &str,
        user_data: &UD,
    ) -> Result<T, FtpFileRetrieveStartError> {
        self.ensure_transfer_type(FtpTransferType::Ascii).await?;
        if self.feature.support_pret() {
            if let FtpFilePreTransferStatus::Invalid = self.control.pre_list(path).await? {
                return Err(FtpFileRetrieveStartError::FileUnavailable);
            }
        }

        let setup = self.prepare_data_channel(user_data).await?;
        self.control.start_list(path).await?;
        let stream = self.finish_data_channel(setup, user_data).await?;
        Ok(stream)
    }

    /// Start a NLST (name only) transfer.
    pub async fn list_directory_names_start(
        &mut self,
        path: &str,
        user_data: &UD,
    ) -> Result<T, FtpFileRetrieveStartError> {
        self.ensure_transfer_type(FtpTransferType::Ascii).await?;

        let setup = self.prepare_data_channel(user_data).await?;
        self.control.start_nlst(path).await?;
        let stream = self.finish_data_channel(setup, user_data).await?;
        Ok(stream)
    }

    /// Drive a listing data stream to EOF, feeding each line to `receiver`,
    /// then wait for the end reply on the control channel.
    pub async fn list_directory_receive<R>(
        &mut self,
        data_stream: T,
        receiver: &mut R,
    ) -> Result<(), FtpFileListError>
    where
        R: FtpLineDataReceiver + Send,
    {
        let transfer = FtpLineDataTransfer::new(data_stream, &self.config.transfer);
        match tokio::time::timeout(
            self.config.transfer.list_all_timeout(),
            transfer.read_to_end(receiver),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(FtpFileListError::TimeoutToWaitAllData),
        }

        match tokio::time::timeout(
            self.config.transfer.end_wait_timeout,
            self.control.wait_list(),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(FtpFileListError::TimeoutToWaitEndReply),
        }
    }

    /// Start a RETR transfer, optionally from a restart offset.
    ///
    /// The transfer is done once the data stream hits EOF *and*
    /// [`wait_retrieve_end_reply`](Self::wait_retrieve_end_reply) returned
    /// the final 2xx. A closed data socket alone is not success.
    pub async fn retrieve_file_start(
        &mut self,
        path: &str,
        transfer_type: FtpTransferType,
        offset: Option<u64>,
        user_data: &UD,
    ) -> Result<T, FtpFileRetrieveStartError> {
        self.ensure_transfer_type(transfer_type).await?;
        if self.feature.support_pret() {
            if let FtpFilePreTransferStatus::Invalid = self.control.pre_retrieve(path).await? {
                return Err(FtpFileRetrieveStartError::FileUnavailable);
            }
        }

        let setup = self.prepare_data_channel(user_data).await?;
        if let Some(offset) = offset {
            if offset > 0 {
                self.control.request_restart(offset).await?;
            }
        }
        self.control.start_retrieve(path).await?;
        let stream = self.finish_data_channel(setup, user_data).await?;
        Ok(stream)
    }

    pub async fn wait_retrieve_end_reply(&mut self) -> Result<(), FtpTransferServerError> {
        self.control.wait_retrieve().await
    }

    /// Start a STOR transfer.
    pub async fn store_file_start(
        &mut self,
        path: &str,
        transfer_type: FtpTransferType,
        user_data: &UD,
    ) -> Result<T, FtpFileStoreStartError> {
        self.ensure_transfer_type(transfer_type).await?;
        if self.feature.support_pret() {
            if let FtpFilePreTransferStatus::Invalid = self.control.pre_store(path).await? {
                return Err(FtpFileStoreStartError::FileUnavailable);
            }
        }

        let setup = self.prepare_data_channel(user_data).await?;
        self.control.start_store(path).await?;
        let stream = self.finish_data_channel(setup, user_data).await?;
        Ok(stream)
    }

    pub async fn wait_store_end_reply(&mut self) -> Result<(), FtpTransferServerError> {
        self.control.wait_store().await
    }

    /// Download a whole file into `writer` and wait for the end reply.
    /// Returns the copied byte count.
    pub async fn retrieve_file<W>(
        &mut self,
        path: &str,
        transfer_type: FtpTransferType,
        writer: &mut W,
        user_data: &UD,
    ) -> Result<u64, FtpFileTransferError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut data_stream = self
            .retrieve_file_start(path, transfer_type, None, user_data)
            .await?;
        let copied = tokio::io::copy(&mut data_stream, writer)
            .await
            .map_err(FtpFileTransferError::DataCopyFailed)?;
        drop(data_stream);

        match tokio::time::timeout(
            self.config.transfer.end_wait_timeout,
            self.control.wait_retrieve(),
        )
        .await
        {
            Ok(Ok(_)) => Ok(copied),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(FtpFileTransferError::TimeoutToWaitEndReply),
        }
    }

    /// Some servers drop the final store reply for large uploads while the
    /// file actually arrived intact. Accept such a store if SIZE returns
    /// exactly the uploaded byte count.
    async fn large_store_arrived(&mut self, path: &str, copied: u64) -> bool {
        if copied < self.config.large_store_verify_size {
            return false;
        }
        matches!(self.control.request_size(path).await, Ok(Some(size)) if size == copied)
    }

    /// Upload `reader` to a whole remote file and wait for the end reply.
    /// Returns the copied byte count.
    pub async fn store_file<R>(
        &mut self,
        path: &str,
        transfer_type: FtpTransferType,
        reader: &mut R,
        user_data: &UD,
    ) -> Result<u64, FtpFileTransferError>
    where
        R: AsyncRead + Unpin,
    {
        let mut data_stream = self
            .store_file_start(path, transfer_type, user_data)
            .await?;
        let copied = match tokio::io::copy(reader, &mut data_stream).await {
            Ok(copied) => {
                let _ = data_stream.shutdown().await;
                copied
            }
            Err(e) => {
                drop(data_stream);
                return Err(FtpFileTransferError::DataCopyFailed(e));
            }
        };
        drop(data_stream);

        match tokio::time::timeout(
            self.config.transfer.end_wait_timeout,
            self.control.wait_store(),
        )
        .await
        {
            Ok(Ok(_)) => Ok(copied),
            Ok(Err(e)) => {
                if self.large_store_arrived(path, copied).await {
                    Ok(copied)
                } else {
                    Err(e.into())
                }
            }
            Err(_) => {
                if self.large_store_arrived(path, copied).await {
                    Ok(copied)
                } else {
                    Err(FtpFileTransferError::TimeoutToWaitEndReply)
                }
            }
        }
    }
}
