/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

//! Best effort parsing of UNIX `ls -l` style LIST output.
//!
//! Servers differ in the details, so lines that do not look like
//! `permissions links owner group size month day time name[ -> target]`
//! are skipped instead of reported as errors.

use async_trait::async_trait;

use crate::transfer::FtpLineDataReceiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FtpListEntryType {
    File,
    Directory,
    Link,
    Unknown,
}

impl FtpListEntryType {
    /// The entry type is taken from the first character of the
    /// permissions field and nothing else.
    fn classify(permissions: &str) -> Self {
        match permissions.as_bytes().first() {
            Some(b'-') => FtpListEntryType::File,
            Some(b'd') => FtpListEntryType::Directory,
            Some(b'l') => FtpListEntryType::Link,
            _ => FtpListEntryType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FtpListEntryType::File => "file",
            FtpListEntryType::Directory => "directory",
            FtpListEntryType::Link => "link",
            FtpListEntryType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpListEntry {
    permissions: String,
    link_count: u32,
    owner: String,
    group: String,
    size: u64,
    month: String,
    day: String,
    time: String,
    name: String,
    entry_type: FtpListEntryType,
    link_target: Option<String>,
}

impl FtpListEntry {
    /// Parse one listing line. Lines with fewer than 9 fields, and the
    /// `.` / `..` entries, yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut fields = [""; 8];
        for field in fields.iter_mut() {
            rest = rest.trim_start();
            let end = rest.find(char::is_whitespace)?;
            *field = &rest[..end];
            rest = &rest[end..];
        }
        // the name may contain embedded spaces, keep the remainder whole
        let name_field = rest.trim_start().trim_end();
        if name_field.is_empty() {
            return None;
        }

        let permissions = fields[0];
        let entry_type = FtpListEntryType::classify(permissions);
        let link_count = fields[1].parse::<u32>().ok()?;
        let size = fields[4].parse::<u64>().ok()?;

        let (name, link_target) = match name_field.split_once(" -> ") {
            Some((name, target)) => (name.trim_end(), Some(target.trim().to_string())),
            None => (name_field, None),
        };
        if name == "." || name == ".." {
            return None;
        }

        Some(FtpListEntry {
            permissions: permissions.to_string(),
            link_count,
            owner: fields[2].to_string(),
            group: fields[3].to_string(),
            size,
            month: fields[5].to_string(),
            day: fields[6].to_string(),
            time: fields[7].to_string(),
            name: name.to_string(),
            entry_type,
            link_target,
        })
    }

    #[inline]
    pub fn permissions(&self) -> &str {
        &self.permissions
    }

    #[inline]
    pub fn link_count(&self) -> u32 {
        self.link_count
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn month(&self) -> &str {
        &self.month
    }

    #[inline]
    pub fn day(&self) -> &str {
        &self.day
    }

    #[inline]
    pub fn time(&self) -> &str {
        &self.time
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn entry_type(&self) -> FtpListEntryType {
        self.entry_type
    }

    #[inline]
    pub fn link_target(&self) -> Option<&str> {
        self.link_target.as_deref()
    }

    /// Identifier of this entry within one scan result. For symlinks the
    /// link side alone forms the key, the target is not part of it.
    pub fn key(&self) -> String {
        format!("{}#{}", self.entry_type.as_str(), self.name)
    }
}

pub(crate) fn join_entry_path(base: &str, name: &str) -> String {
    if name.starts_with('/') || base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Collects parsed entries from raw LIST output.
///
/// Batched recursive output may interleave directory header markers
/// (a single token ending in `:`) that switch the base path of the
/// following entries. A blank line switches back to the initial base.
pub struct FtpListingAccumulator {
    initial_dir: String,
    base_dir: String,
    entries: Vec<(String, FtpListEntry)>,
}

impl FtpListingAccumulator {
    pub fn new(dir: &str) -> Self {
        FtpListingAccumulator {
            initial_dir: dir.to_string(),
            base_dir: dir.to_string(),
            entries: Vec::new(),
        }
    }

    fn feed_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.base_dir = self.initial_dir.clone();
            return;
        }

        if let Some(marker) = trimmed.strip_suffix(':') {
            if !marker.is_empty() && !marker.contains(char::is_whitespace) {
                self.base_dir = marker.to_string();
                return;
            }
        }

        if let Some(entry) = FtpListEntry::parse_line(line) {
            let path = join_entry_path(&self.base_dir, entry.name());
            self.entries.push((path, entry));
        }
    }

    /// Paired (full path, entry) records in listing order.
    pub fn into_entries(self) -> Vec<(String, FtpListEntry)> {
        self.entries
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl FtpLineDataReceiver for FtpListingAccumulator {
    async fn recv_line(&mut self, line: &str) {
        self.feed_line(line);
    }

    fn should_return_early(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_line() {
        let e =
            FtpListEntry::parse_line("-rw-r--r-- 1 www-data www-data 5120 Dec 10 09:30 index.html")
                .unwrap();
        assert_eq!(e.entry_type(), FtpListEntryType::File);
        assert_eq!(e.name(), "index.html");
        assert_eq!(e.size(), 5120);
        assert_eq!(e.link_count(), 1);
        assert_eq!(e.owner(), "www-data");
        assert_eq!(e.group(), "www-data");
        assert_eq!(e.month(), "Dec");
        assert_eq!(e.day(), "10");
        assert_eq!(e.time(), "09:30");
        assert!(e.link_target().is_none());
        assert_eq!(e.key(), "file#index.html");
    }

    #[test]
    fn parse_dir_line() {
        let e = FtpListEntry::parse_line("drwxr-xr-x 3 1000 staff 4096 Jan  2 2024 assets")
            .unwrap();
        assert_eq!(e.entry_type(), FtpListEntryType::Directory);
        assert_eq!(e.name(), "assets");
        assert_eq!(e.key(), "directory#assets");
    }

    #[test]
    fn parse_symlink_line() {
        let e = FtpListEntry::parse_line(
            "lrwxrwxrwx 1 1000 staff 20 Dec 10 09:30 logo.png -> /var/www/shared/logo.png",
        )
        .unwrap();
        assert_eq!(e.entry_type(), FtpListEntryType::Link);
        assert_eq!(e.name(), "logo.png");
        assert_eq!(e.link_target(), Some("/var/www/shared/logo.png"));
        assert_eq!(e.key(), "link#logo.png");
    }

    #[test]
    fn parse_name_with_spaces() {
        let e = FtpListEntry::parse_line(
            "-rw-r--r-- 1 ftp ftp 100 Mar  1 12:00 Annual Report 2024.pdf",
        )
        .unwrap();
        assert_eq!(e.name(), "Annual Report 2024.pdf");
    }

    #[test]
    fn skip_dot_entries() {
        assert!(FtpListEntry::parse_line("drwxr-xr-x 2 ftp ftp 4096 Mar  1 12:00 .").is_none());
        assert!(FtpListEntry::parse_line("drwxr-xr-x 2 ftp ftp 4096 Mar  1 12:00 ..").is_none());
    }

    #[test]
    fn skip_short_lines() {
        assert!(FtpListEntry::parse_line("total 12").is_none());
        assert!(FtpListEntry::parse_line("").is_none());
        assert!(FtpListEntry::parse_line("drwxr-xr-x 2 ftp ftp 4096 Mar 1").is_none());
    }

    #[test]
    fn unknown_type() {
        let e = FtpListEntry::parse_line("crw-rw-rw- 1 root root 0 Mar  1 12:00 null").unwrap();
        assert_eq!(e.entry_type(), FtpListEntryType::Unknown);
    }

    #[test]
    fn accumulate_with_dir_markers() {
        let mut acc = FtpListingAccumulator::new("/srv");
        for line in [
            "-rw-r--r-- 1 ftp ftp 10 Mar  1 12:00 a.txt\r\n",
            "/srv/sub:\r\n",
            "-rw-r--r-- 1 ftp ftp 20 Mar  1 12:00 b.txt\r\n",
            "\r\n",
            "-rw-r--r-- 1 ftp ftp 30 Mar  1 12:00 c.txt\r\n",
        ] {
            acc.feed_line(line);
        }
        let entries = acc.into_entries();
        let paths: Vec<&str> = entries.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, ["/srv/a.txt", "/srv/sub/b.txt", "/srv/c.txt"]);
    }

    #[test]
    fn accumulate_skips_noise() {
        let mut acc = FtpListingAccumulator::new("");
        acc.feed_line("total 8\r\n");
        acc.feed_line("drwxr-xr-x 2 ftp ftp 4096 Mar  1 12:00 .\r\n");
        acc.feed_line("-rw-r--r-- 1 ftp ftp 10 Mar  1 12:00 a.txt\r\n");
        let entries = acc.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "a.txt");
    }
}
