/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::error::Error;

use tokio::io::{AsyncRead, AsyncWrite};

use ftpmill::error::FtpFileStatError;
use ftpmill::{FtpClient, FtpConnectionProvider};

use crate::FtpTreeError;

/// Tree operations bound to one client session.
///
/// Borrows the client mutably for the lifetime of the session, so no
/// plain client operation can interleave with a tree traversal.
pub struct FtpTreeSession<'a, CP, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
    E: Error,
    UD: Sync,
    CP: FtpConnectionProvider<T, E, UD>,
{
    pub(crate) client: &'a mut FtpClient<CP, T, E, UD>,
    pub(crate) user_data: &'a UD,
}

impl<'a, CP, T, E, UD> FtpTreeSession<'a, CP, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: Error,
    UD: Sync,
    CP: FtpConnectionProvider<T, E, UD>,
{
    pub fn new(client: &'a mut FtpClient<CP, T, E, UD>, user_data: &'a UD) -> Self {
        FtpTreeSession { client, user_data }
    }

    #[inline]
    pub fn client(&mut self) -> &mut FtpClient<CP, T, E, UD> {
        self.client
    }

    /// Probe whether `path` is an enterable directory by changing into it.
    ///
    /// A failed probe is a negative answer, not an error, as non-existent
    /// paths are an expected outcome. The working directory is restored on
    /// both outcomes, a failed restore is surfaced.
    pub async fn is_directory(&mut self, path: &str) -> Result<bool, FtpTreeError> {
        let prev_dir = self.client.get_current_dir().await?;

        let entered = match self.client.change_dir(path).await {
            Ok(_) => true,
            Err(FtpFileStatError::ServiceNotAvailable) => {
                return Err(FtpFileStatError::ServiceNotAvailable.into());
            }
            Err(_) => false,
        };

        self.client.change_dir(&prev_dir).await?;
        Ok(entered)
    }

    /// Create `path` with all missing parent directories.
    ///
    /// Walks the path components, entering each and creating the ones that
    /// cannot be entered. The working directory is restored afterwards even
    /// when the walk fails partway.
    pub async fn make_dir_all(&mut self, path: &str) -> Result<(), FtpTreeError> {
        if self.is_directory(path).await? {
            return Ok(());
        }

        let prev_dir = self.client.get_current_dir().await?;

        let mut walk: Result<(), FtpFileStatError> = if path.starts_with('/') {
            self.client.change_dir("/").await
        } else {
            Ok(())
        };
        if walk.is_ok() {
            for comp in path.split('/').filter(|c| !c.is_empty()) {
                if self.client.change_dir(comp).await.is_ok() {
                    continue;
                }
                walk = match self.client.make_dir(comp).await {
                    Ok(_) => self.client.change_dir(comp).await,
                    Err(e) => Err(e),
                };
                if walk.is_err() {
                    break;
                }
            }
        }

        let restore = self.client.change_dir(&prev_dir).await;
        walk?;
        restore?;
        Ok(())
    }
}
