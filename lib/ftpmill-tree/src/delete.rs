/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::error::Error;

use log::warn;
use tokio::io::{AsyncRead, AsyncWrite};

use ftpmill::FtpConnectionProvider;
use ftpmill::error::FtpFileStatError;
use ftpmill::listing::FtpListEntryType;

use crate::scan::FtpListOrder;
use crate::{FtpTreeError, FtpTreeSession};

fn sanitize_path(path: &str) -> String {
    path.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '/')
        .collect()
}

impl<CP, T, E, UD> FtpTreeSession<'_, CP, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: Error,
    UD: Sync,
    CP: FtpConnectionProvider<T, E, UD>,
{
    /// Delete `dir` and everything below it.
    ///
    /// Removal failures of single entries are tolerated: each failed entry
    /// is retried once under a sanitized name, and the traversal continues
    /// either way. Returns whether every removal succeeded. Transport and
    /// listing failures still abort with an error.
    pub async fn recursive_delete(&mut self, dir: &str) -> Result<bool, FtpTreeError> {
        let mut all_removed = self.delete_children(dir).await?;
        if !self.remove_one(dir, true).await? {
            all_removed = false;
        }
        Ok(all_removed)
    }

    /// Delete everything below `dir` but keep `dir` itself.
    pub async fn clean_dir(&mut self, dir: &str) -> Result<bool, FtpTreeError> {
        self.delete_children(dir).await
    }

    async fn delete_children(&mut self, dir: &str) -> Result<bool, FtpTreeError> {
        // descending path order removes children before their parents
        let entries = self.recursive_list(dir, FtpListOrder::Descending).await?;

        let mut all_removed = true;
        for e in entries {
            let is_dir = e.entry.entry_type() == FtpListEntryType::Directory;
            if !self.remove_one(&e.path, is_dir).await? {
                warn!("failed to remove {}", e.path);
                all_removed = false;
            }
        }
        Ok(all_removed)
    }

    async fn remove_one(&mut self, path: &str, is_dir: bool) -> Result<bool, FtpTreeError> {
        match self.remove_path(path, is_dir).await {
            Ok(_) => Ok(true),
            Err(FtpFileStatError::ServiceNotAvailable) => {
                Err(FtpFileStatError::ServiceNotAvailable.into())
            }
            Err(_) => self.remove_sanitized(path, is_dir).await,
        }
    }

    async fn remove_path(&mut self, path: &str, is_dir: bool) -> Result<(), FtpFileStatError> {
        if is_dir {
            self.client.remove_dir(path).await
        } else {
            self.client.delete_file(path).await
        }
    }

    /// Retry a rejected removal once: rename to a name stripped of any
    /// character the server may choke on, then remove under that name.
    async fn remove_sanitized(&mut self, path: &str, is_dir: bool) -> Result<bool, FtpTreeError> {
        let sanitized = sanitize_path(path);
        if sanitized.is_empty() || sanitized == path {
            return Ok(false);
        }

        match self.client.rename(path, &sanitized).await {
            Ok(_) => Ok(self.remove_path(&sanitized, is_dir).await.is_ok()),
            Err(FtpFileStatError::ServiceNotAvailable) => {
                Err(FtpFileStatError::ServiceNotAvailable.into())
            }
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize() {
        assert_eq!(sanitize_path("/srv/bad name (1).txt"), "/srv/badname1txt");
        assert_eq!(sanitize_path("/srv/plain"), "/srv/plain");
        assert_eq!(sanitize_path("~!@"), "");
    }
}
