/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::collections::HashMap;
use std::error::Error;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use ftpmill::listing::{FtpListEntry, FtpListEntryType, FtpListingAccumulator};
use ftpmill::{FtpConnectionProvider, FtpLineDataReceiver};

use crate::{FtpTreeError, FtpTreeSession};

/// Ordering of a flattened recursive listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FtpListOrder {
    #[default]
    Ascending,
    /// children sort before their parents, used for bulk removal
    Descending,
}

/// One entry of a recursive scan, with its full path from the scan root.
#[derive(Debug, Clone)]
pub struct FtpDirEntry {
    pub path: String,
    pub entry: FtpListEntry,
}

impl FtpDirEntry {
    /// De-duplication key within one scan result. Colliding keys mean an
    /// ambiguous listing and the later entry wins.
    pub fn key(&self) -> String {
        format!("{}#{}", self.entry.entry_type().as_str(), self.path)
    }
}

/// NLST receiver, collects names and drops `.` / `..`.
#[derive(Default)]
struct NameCollector {
    names: Vec<String>,
}

#[async_trait]
impl FtpLineDataReceiver for NameCollector {
    async fn recv_line(&mut self, line: &str) {
        let name = line.trim_end_matches(['\r', '\n']);
        if name.is_empty() || name == "." || name == ".." {
            return;
        }
        self.names.push(name.to_string());
    }

    fn should_return_early(&self) -> bool {
        false
    }
}

impl<CP, T, E, UD> FtpTreeSession<'_, CP, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: Error,
    UD: Sync,
    CP: FtpConnectionProvider<T, E, UD>,
{
    /// Structured single-directory listing via LIST.
    pub async fn list_dir(&mut self, dir: &str) -> Result<Vec<(String, FtpListEntry)>, FtpTreeError> {
        let mut acc = FtpListingAccumulator::new(dir);
        let data_stream = self
            .client
            .list_directory_detailed_start(dir, self.user_data)
            .await?;
        self.client.list_directory_receive(data_stream, &mut acc).await?;
        Ok(acc.into_entries())
    }

    /// Name only single-directory listing via NLST.
    pub async fn list_names(&mut self, dir: &str) -> Result<Vec<String>, FtpTreeError> {
        let mut collector = NameCollector::default();
        let data_stream = self
            .client
            .list_directory_names_start(dir, self.user_data)
            .await?;
        self.client
            .list_directory_receive(data_stream, &mut collector)
            .await?;
        Ok(collector.names)
    }

    pub(crate) async fn scan_tree(
        &mut self,
        dir: &str,
    ) -> Result<HashMap<String, FtpDirEntry>, FtpTreeError> {
        let mut found = HashMap::new();
        let mut pending = vec![dir.to_string()];

        while let Some(d) = pending.pop() {
            for (path, entry) in self.list_dir(&d).await? {
                if entry.entry_type() == FtpListEntryType::Directory {
                    pending.push(path.clone());
                }
                let dir_entry = FtpDirEntry { path, entry };
                found.insert(dir_entry.key(), dir_entry);
            }
        }

        Ok(found)
    }

    /// Recursively list `dir`, flattening nested results into one sequence
    /// sorted by path in the requested order. Symlinked directories are
    /// listed as link entries but not descended into.
    pub async fn recursive_list(
        &mut self,
        dir: &str,
        order: FtpListOrder,
    ) -> Result<Vec<FtpDirEntry>, FtpTreeError> {
        let found = self.scan_tree(dir).await?;
        let mut entries: Vec<FtpDirEntry> = found.into_values().collect();
        match order {
            FtpListOrder::Ascending => entries.sort_by(|a, b| a.path.cmp(&b.path)),
            FtpListOrder::Descending => entries.sort_by(|a, b| b.path.cmp(&a.path)),
        }
        Ok(entries)
    }

    /// Sum of the server reported size fields of every entry under `dir`.
    /// Directory and link sizes are included as reported, no normalization.
    pub async fn dir_size(&mut self, dir: &str, recursive: bool) -> Result<u64, FtpTreeError> {
        let size = if recursive {
            self.scan_tree(dir)
                .await?
                .values()
                .map(|e| e.entry.size())
                .sum()
        } else {
            self.list_dir(dir)
                .await?
                .iter()
                .map(|(_, e)| e.size())
                .sum()
        };
        Ok(size)
    }

    /// Count entries under `dir`, optionally filtered by entry type.
    /// Without a filter the cheaper name-only listing is used where possible.
    pub async fn count_items(
        &mut self,
        dir: &str,
        entry_type: Option<FtpListEntryType>,
        recursive: bool,
    ) -> Result<usize, FtpTreeError> {
        let count = match (entry_type, recursive) {
            (None, false) => self.list_names(dir).await?.len(),
            (None, true) => self.scan_tree(dir).await?.len(),
            (Some(t), false) => self
                .list_dir(dir)
                .await?
                .iter()
                .filter(|(_, e)| e.entry_type() == t)
                .count(),
            (Some(t), true) => self
                .scan_tree(dir)
                .await?
                .values()
                .filter(|e| e.entry.entry_type() == t)
                .count(),
        };
        Ok(count)
    }
}
