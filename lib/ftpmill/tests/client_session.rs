/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};

use ftpmill::error::{FtpFileRetrieveStartError, FtpFileTransferError, FtpTransferSetupError};
use ftpmill::listing::FtpListingAccumulator;
use ftpmill::{
    FtpClient, FtpClientConfig, FtpConnectionProvider, FtpDataChannelMode, FtpServerAddr,
    FtpTransferType, Password, Username,
};

struct MockConnectionProvider {
    control: Option<DuplexStream>,
    data: VecDeque<DuplexStream>,
}

#[async_trait]
impl FtpConnectionProvider<DuplexStream, io::Error, ()> for MockConnectionProvider {
    async fn new_control_connection(
        &mut self,
        _server: &FtpServerAddr,
        _user_data: &(),
    ) -> io::Result<DuplexStream> {
        self.control
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no control stream"))
    }

    async fn new_data_connection(
        &mut self,
        _server_addr: &FtpServerAddr,
        _user_data: &(),
    ) -> io::Result<DuplexStream> {
        self.data
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no data stream"))
    }

    async fn accept_data_connection(&mut self, _user_data: &()) -> io::Result<DuplexStream> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "active mode not supported",
        ))
    }
}

const LISTING: &str = "drwxr-xr-x 2 ftp ftp 4096 Mar  1 12:00 .\r\n\
                       drwxr-xr-x 2 ftp ftp 4096 Mar  1 12:00 ..\r\n\
                       -rw-r--r-- 1 ftp ftp 12 Mar  1 12:00 hello.txt\r\n\
                       lrwxrwxrwx 1 ftp ftp 9 Mar  1 12:00 link.txt -> hello.txt\r\n";

async fn run_server(ctrl: DuplexStream, mut data: VecDeque<DuplexStream>) -> Vec<u8> {
    let (r, mut w) = tokio::io::split(ctrl);
    let mut lines = BufReader::new(r).lines();
    let mut stored = Vec::new();

    w.write_all(b"220 mock server ready\r\n").await.unwrap();
    while let Ok(Some(line)) = lines.next_line().await {
        let (cmd, arg) = match line.split_once(' ') {
            Some((cmd, arg)) => (cmd, arg),
            None => (line.as_str(), ""),
        };
        match cmd {
            "FEAT" => {
                w.write_all(
                    b"211-Features:\r\n UTF8\r\n EPSV\r\n SIZE\r\n MLST type*;size*;modify*;\r\n211 End\r\n",
                )
                .await
                .unwrap();
            }
            "OPTS" | "TYPE" | "SITE" => w.write_all(b"200 ok\r\n").await.unwrap(),
            "USER" => {
                assert_eq!(arg, "tester");
                w.write_all(b"331 need password\r\n").await.unwrap();
            }
            "PASS" => {
                assert_eq!(arg, "secret");
                w.write_all(b"230 logged in\r\n").await.unwrap();
            }
            "EPSV" => {
                w.write_all(b"229 Entering Extended Passive Mode (|||40000|)\r\n")
                    .await
                    .unwrap();
            }
            "LIST" => {
                w.write_all(b"150 here it comes\r\n").await.unwrap();
                let mut d = data.pop_front().unwrap();
                d.write_all(LISTING.as_bytes()).await.unwrap();
                drop(d);
                w.write_all(b"226 done\r\n").await.unwrap();
            }
            "RETR" => {
                assert_eq!(arg, "/pub/hello.txt");
                w.write_all(b"150 opening\r\n").await.unwrap();
                let mut d = data.pop_front().unwrap();
                d.write_all(b"hello world\n").await.unwrap();
                drop(d);
                w.write_all(b"226 done\r\n").await.unwrap();
            }
            "STOR" => {
                assert_eq!(arg, "/pub/up.bin");
                w.write_all(b"150 go on\r\n").await.unwrap();
                let mut d = data.pop_front().unwrap();
                d.read_to_end(&mut stored).await.unwrap();
                drop(d);
                w.write_all(b"226 done\r\n").await.unwrap();
            }
            "MLST" => {
                w.write_all(
                    b"250-Listing\r\n type=file;size=12;modify=20240301120000; /pub/hello.txt\r\n250 End\r\n",
                )
                .await
                .unwrap();
            }
            "QUIT" => {
                w.write_all(b"221 bye\r\n").await.unwrap();
                break;
            }
            _ => w.write_all(b"502 not implemented\r\n").await.unwrap(),
        }
    }

    stored
}

#[tokio::test]
async fn session_round_trip() {
    let (ctrl_c, ctrl_s) = tokio::io::duplex(16 * 1024);
    let mut data_c = VecDeque::new();
    let mut data_s = VecDeque::new();
    for _ in 0..4 {
        let (c, s) = tokio::io::duplex(64 * 1024);
        data_c.push_back(c);
        data_s.push_back(s);
    }
    let server = tokio::spawn(run_server(ctrl_s, data_s));

    let provider = MockConnectionProvider {
        control: Some(ctrl_c),
        data: data_c,
    };
    let config = FtpClientConfig::default();
    let mut client = FtpClient::connect_to(FtpServerAddr::new("mock.test", 21), provider, &(), &config)
        .await
        .map_err(|(e, _)| e)
        .unwrap();
    assert!(client.server_feature().support_epsv());

    let username = Username::from_original("tester").unwrap();
    let password = Password::from_original("secret").unwrap();
    client
        .new_user_session(Some(&username), Some(&password))
        .await
        .unwrap();

    let mut acc = FtpListingAccumulator::new("/pub");
    let data_stream = client.list_directory_detailed_start("/pub", &()).await.unwrap();
    client.list_directory_receive(data_stream, &mut acc).await.unwrap();
    let entries = acc.into_entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "/pub/hello.txt");
    assert_eq!(entries[1].1.link_target(), Some("hello.txt"));

    let ff = client.fetch_file_facts("/pub/hello.txt").await.unwrap();
    assert_eq!(ff.size(), Some(12));
    assert!(ff.maybe_file());

    let mut body = Vec::new();
    let n = client
        .retrieve_file("/pub/hello.txt", FtpTransferType::Image, &mut body, &())
        .await
        .unwrap();
    assert_eq!(n, 12);
    assert_eq!(body, b"hello world\n");

    let mut src: &[u8] = b"uploaded data";
    let n = client
        .store_file("/pub/up.bin", FtpTransferType::Image, &mut src, &())
        .await
        .unwrap();
    assert_eq!(n, 13);

    client.site_chmod("644", "/pub/up.bin").await.unwrap();
    client.site_chown("www", "/pub/up.bin").await.unwrap();
    client.site_chgrp("staff", "/pub/up.bin").await.unwrap();

    client.quit_and_close().await.unwrap();

    let stored = server.await.unwrap();
    assert_eq!(stored, b"uploaded data");
}

/// Server that always fails the STOR end reply with 552 but reports the
/// stored size truthfully (off by one for `two.bin`) on SIZE.
async fn run_store_flaky_server(ctrl: DuplexStream, mut data: VecDeque<DuplexStream>) {
    let (r, mut w) = tokio::io::split(ctrl);
    let mut lines = BufReader::new(r).lines();
    let mut sizes: std::collections::HashMap<String, u64> = std::collections::HashMap::new();

    w.write_all(b"220 flaky store server\r\n").await.unwrap();
    while let Ok(Some(line)) = lines.next_line().await {
        let (cmd, arg) = match line.split_once(' ') {
            Some((cmd, arg)) => (cmd, arg),
            None => (line.as_str(), ""),
        };
        match cmd {
            "FEAT" => {
                w.write_all(b"211-Features:\r\n EPSV\r\n SIZE\r\n211 End\r\n")
                    .await
                    .unwrap();
            }
            "OPTS" | "TYPE" => w.write_all(b"200 ok\r\n").await.unwrap(),
            "USER" => w.write_all(b"331 need password\r\n").await.unwrap(),
            "PASS" => w.write_all(b"230 logged in\r\n").await.unwrap(),
            "EPSV" => {
                w.write_all(b"229 Entering Extended Passive Mode (|||40000|)\r\n")
                    .await
                    .unwrap();
            }
            "STOR" => {
                w.write_all(b"150 go on\r\n").await.unwrap();
                let mut d = data.pop_front().unwrap();
                let mut content = Vec::new();
                d.read_to_end(&mut content).await.unwrap();
                drop(d);
                sizes.insert(arg.to_string(), content.len() as u64);
                w.write_all(b"552 Exceeded storage allocation\r\n")
                    .await
                    .unwrap();
            }
            "SIZE" => {
                let mut size = sizes.get(arg).copied().unwrap_or(0);
                if arg == "/big/two.bin" {
                    size += 1;
                }
                w.write_all(format!("213 {size}\r\n").as_bytes())
                    .await
                    .unwrap();
            }
            "QUIT" => {
                w.write_all(b"221 bye\r\n").await.unwrap();
                break;
            }
            _ => w.write_all(b"502 not implemented\r\n").await.unwrap(),
        }
    }
}

#[tokio::test]
async fn large_store_size_fallback() {
    let (ctrl_c, ctrl_s) = tokio::io::duplex(16 * 1024);
    let mut data_c = VecDeque::new();
    let mut data_s = VecDeque::new();
    for _ in 0..4 {
        let (c, s) = tokio::io::duplex(64 * 1024);
        data_c.push_back(c);
        data_s.push_back(s);
    }
    let server = tokio::spawn(run_store_flaky_server(ctrl_s, data_s));

    let provider = MockConnectionProvider {
        control: Some(ctrl_c),
        data: data_c,
    };
    let mut config = FtpClientConfig::default();
    config.large_store_verify_size = 8;
    let mut client = FtpClient::connect_to(FtpServerAddr::new("mock.test", 21), provider, &(), &config)
        .await
        .map_err(|(e, _)| e)
        .unwrap();
    let username = Username::from_original("tester").unwrap();
    let password = Password::from_original("secret").unwrap();
    client
        .new_user_session(Some(&username), Some(&password))
        .await
        .unwrap();

    // end reply failed, but SIZE matches the uploaded byte count
    let mut src: &[u8] = b"uploaded data";
    let n = client
        .store_file("/big/one.bin", FtpTransferType::Image, &mut src, &())
        .await
        .unwrap();
    assert_eq!(n, 13);

    // SIZE mismatch keeps the server error
    let mut src: &[u8] = b"uploaded data";
    let err = client
        .store_file("/big/two.bin", FtpTransferType::Image, &mut src, &())
        .await
        .unwrap_err();
    assert!(matches!(err, FtpFileTransferError::ServerReportedError(_)));

    // below the verify threshold no SIZE check happens at all
    let mut src: &[u8] = b"abc";
    let err = client
        .store_file("/big/tiny.bin", FtpTransferType::Image, &mut src, &())
        .await
        .unwrap_err();
    assert!(matches!(err, FtpFileTransferError::ServerReportedError(_)));

    client.quit_and_close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn active_mode_needs_provider_listener() {
    let (ctrl_c, ctrl_s) = tokio::io::duplex(16 * 1024);
    let server = tokio::spawn(async move {
        let (r, mut w) = tokio::io::split(ctrl_s);
        let mut lines = BufReader::new(r).lines();
        w.write_all(b"220 ready\r\n").await.unwrap();
        while let Ok(Some(line)) = lines.next_line().await {
            let cmd = line.split_once(' ').map(|(c, _)| c).unwrap_or(line.as_str());
            match cmd {
                "FEAT" => w.write_all(b"211-Features:\r\n EPSV\r\n211 End\r\n").await.unwrap(),
                "USER" => w.write_all(b"331 need password\r\n").await.unwrap(),
                "PASS" => w.write_all(b"230 logged in\r\n").await.unwrap(),
                "TYPE" => w.write_all(b"200 ok\r\n").await.unwrap(),
                _ => w.write_all(b"502 not implemented\r\n").await.unwrap(),
            }
        }
    });

    let provider = MockConnectionProvider {
        control: Some(ctrl_c),
        data: VecDeque::new(),
    };
    let mut config = FtpClientConfig::default();
    config.data_channel = FtpDataChannelMode::Active;
    let mut client = FtpClient::connect_to(FtpServerAddr::new("mock.test", 21), provider, &(), &config)
        .await
        .map_err(|(e, _)| e)
        .unwrap();
    let username = Username::from_original("tester").unwrap();
    let password = Password::from_original("secret").unwrap();
    client
        .new_user_session(Some(&username), Some(&password))
        .await
        .unwrap();

    // the mock provider leaves the listener methods at their defaults
    let err = client
        .list_directory_detailed_start("/pub", &())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FtpFileRetrieveStartError::TransferSetupFailed(
            FtpTransferSetupError::NoUsableDataChannelMode
        )
    ));

    drop(client);
    server.await.unwrap();
}
