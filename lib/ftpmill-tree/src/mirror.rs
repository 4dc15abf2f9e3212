/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::error::Error;
use std::path::Path;

use log::warn;
use tokio::io::{AsyncRead, AsyncWrite};

use ftpmill::listing::FtpListEntryType;
use ftpmill::{FtpConnectionProvider, FtpTransferType};

use crate::{FtpTreeError, FtpTreeSession};

fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

impl<CP, T, E, UD> FtpTreeSession<'_, CP, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: Error,
    UD: Sync,
    CP: FtpConnectionProvider<T, E, UD>,
{
    /// Mirror a local directory tree onto the remote side, creating missing
    /// remote directories before descending. Returns the number of files
    /// transferred. Local symlinks and non UTF-8 file names are skipped.
    pub async fn put_all(
        &mut self,
        local_dir: &Path,
        remote_dir: &str,
        transfer_type: FtpTransferType,
    ) -> Result<u64, FtpTreeError> {
        self.make_dir_all(remote_dir).await?;

        let mut transferred = 0u64;
        let mut pending = vec![(local_dir.to_path_buf(), remote_dir.to_string())];
        while let Some((local, remote)) = pending.pop() {
            let mut read_dir = tokio::fs::read_dir(&local).await?;
            while let Some(dent) = read_dir.next_entry().await? {
                let name = dent.file_name();
                let Some(name) = name.to_str() else {
                    warn!("skipped non utf-8 file name in {}", local.display());
                    continue;
                };
                let remote_path = join_remote(&remote, name);

                let file_type = dent.file_type().await?;
                if file_type.is_dir() {
                    if let Err(e) = self.client.make_dir(&remote_path).await {
                        if !self.is_directory(&remote_path).await? {
                            return Err(e.into());
                        }
                    }
                    pending.push((dent.path(), remote_path));
                } else if file_type.is_file() {
                    let mut file = tokio::fs::File::open(dent.path()).await?;
                    self.client
                        .store_file(&remote_path, transfer_type, &mut file, self.user_data)
                        .await?;
                    transferred += 1;
                }
            }
        }

        Ok(transferred)
    }

    /// Mirror a remote directory tree into a local directory. Returns the
    /// number of files transferred. Remote symlinks are not followed.
    pub async fn get_all(
        &mut self,
        remote_dir: &str,
        local_dir: &Path,
        transfer_type: FtpTransferType,
    ) -> Result<u64, FtpTreeError> {
        tokio::fs::create_dir_all(local_dir).await?;

        let mut transferred = 0u64;
        let mut pending = vec![(remote_dir.to_string(), local_dir.to_path_buf())];
        while let Some((remote, local)) = pending.pop() {
            for (path, entry) in self.list_dir(&remote).await? {
                let local_path = local.join(entry.name());
                match entry.entry_type() {
                    FtpListEntryType::Directory => {
                        tokio::fs::create_dir_all(&local_path).await?;
                        pending.push((path, local_path));
                    }
                    FtpListEntryType::File => {
                        let mut file = tokio::fs::File::create(&local_path).await?;
                        self.client
                            .retrieve_file(&path, transfer_type, &mut file, self.user_data)
                            .await?;
                        transferred += 1;
                    }
                    _ => {}
                }
            }
        }

        Ok(transferred)
    }
}
