/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

use ftpmill::listing::FtpListEntryType;
use ftpmill::{
    FtpClient, FtpClientConfig, FtpConnectionProvider, FtpServerAddr, FtpTransferType, Password,
    Username,
};
use ftpmill_tree::{FtpListOrder, FtpTreeSession};

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

enum Node {
    File(Vec<u8>),
    Dir(BTreeMap<String, Node>),
    Link(String),
}

fn dir(entries: Vec<(&str, Node)>) -> Node {
    Node::Dir(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn file(content: &[u8]) -> Node {
    Node::File(content.to_vec())
}

fn lookup<'a>(root: &'a Node, comps: &[String]) -> Option<&'a Node> {
    let mut cur = root;
    for c in comps {
        match cur {
            Node::Dir(m) => cur = m.get(c)?,
            _ => return None,
        }
    }
    Some(cur)
}

fn lookup_dir_mut<'a>(root: &'a mut Node, comps: &[String]) -> Option<&'a mut BTreeMap<String, Node>> {
    let mut cur = root;
    for c in comps {
        match cur {
            Node::Dir(m) => cur = m.get_mut(c)?,
            _ => return None,
        }
    }
    match cur {
        Node::Dir(m) => Some(m),
        _ => None,
    }
}

fn remove_node(root: &mut Node, comps: &[String]) -> Option<Node> {
    let (name, parent) = comps.split_last()?;
    lookup_dir_mut(root, parent)?.remove(name)
}

fn insert_node(root: &mut Node, comps: &[String], node: Node) -> bool {
    let Some((name, parent)) = comps.split_last() else {
        return false;
    };
    match lookup_dir_mut(root, parent) {
        Some(m) => {
            m.insert(name.clone(), node);
            true
        }
        None => false,
    }
}

fn list_lines(entries: &BTreeMap<String, Node>) -> String {
    let mut out = String::new();
    out.push_str("drwxr-xr-x 2 ftp ftp 4096 Jan  1 00:00 .\r\n");
    out.push_str("drwxr-xr-x 2 ftp ftp 4096 Jan  1 00:00 ..\r\n");
    for (name, node) in entries {
        match node {
            Node::File(data) => out.push_str(&format!(
                "-rw-r--r-- 1 ftp ftp {} Jan  1 00:00 {}\r\n",
                data.len(),
                name
            )),
            Node::Dir(_) => out.push_str(&format!(
                "drwxr-xr-x 2 ftp ftp 4096 Jan  1 00:00 {}\r\n",
                name
            )),
            Node::Link(target) => out.push_str(&format!(
                "lrwxrwxrwx 1 ftp ftp {} Jan  1 00:00 {} -> {}\r\n",
                target.len(),
                name,
                target
            )),
        }
    }
    out
}

fn nlst_lines(entries: &BTreeMap<String, Node>) -> String {
    let mut out = String::new();
    for name in entries.keys() {
        out.push_str(name);
        out.push_str("\r\n");
    }
    out
}

// mimics servers that choke on odd file names
fn reject_name(name: &str) -> bool {
    name.contains(' ') || name.contains('(')
}

// this name fails removal and rename alike
fn hard_stuck(name: &str) -> bool {
    name.contains("stuck")
}

struct FakeFsServer {
    root: Node,
    cwd: Vec<String>,
    rename_from: Option<Vec<String>>,
}

impl FakeFsServer {
    fn resolve(&self, path: &str) -> Vec<String> {
        let mut comps = if path.starts_with('/') {
            Vec::new()
        } else {
            self.cwd.clone()
        };
        for c in path.split('/') {
            match c {
                "" | "." => {}
                ".." => {
                    comps.pop();
                }
                c => comps.push(c.to_string()),
            }
        }
        comps
    }

    async fn run(mut self, ctrl: DuplexStream, mut data: VecDeque<DuplexStream>) -> Node {
        let (r, mut w) = tokio::io::split(ctrl);
        let mut lines = BufReader::new(r).lines();

        w.write_all(b"220 fake fs server\r\n").await.unwrap();
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
                "PWD" => {
                    let path = if self.cwd.is_empty() {
                        "/".to_string()
                    } else {
                        format!("/{}", self.cwd.join("/"))
                    };
                    w.write_all(format!("257 \"{path}\" is cwd\r\n").as_bytes())
                        .await
                        .unwrap();
                }
                "CWD" => {
                    let comps = self.resolve(arg);
                    if matches!(lookup(&self.root, &comps), Some(Node::Dir(_))) {
                        self.cwd = comps;
                        w.write_all(b"250 ok\r\n").await.unwrap();
                    } else {
                        w.write_all(b"550 no such dir\r\n").await.unwrap();
                    }
                }
                "MKD" => {
                    let comps = self.resolve(arg);
                    if insert_node(&mut self.root, &comps, Node::Dir(BTreeMap::new())) {
                        w.write_all(format!("257 \"{arg}\" created\r\n").as_bytes())
                            .await
                            .unwrap();
                    } else {
                        w.write_all(b"550 create failed\r\n").await.unwrap();
                    }
                }
                "RMD" => {
                    let comps = self.resolve(arg);
                    let removable = match comps.last() {
                        Some(name) if reject_name(name) || hard_stuck(name) => false,
                        _ => matches!(lookup(&self.root, &comps), Some(Node::Dir(m)) if m.is_empty()),
                    };
                    if removable {
                        remove_node(&mut self.root, &comps);
                        w.write_all(b"250 removed\r\n").await.unwrap();
                    } else {
                        w.write_all(b"550 remove failed\r\n").await.unwrap();
                    }
                }
                "DELE" => {
                    let comps = self.resolve(arg);
                    let removable = match comps.last() {
                        Some(name) if reject_name(name) || hard_stuck(name) => false,
                        _ => matches!(
                            lookup(&self.root, &comps),
                            Some(Node::File(_) | Node::Link(_))
                        ),
                    };
                    if removable {
                        remove_node(&mut self.root, &comps);
                        w.write_all(b"250 deleted\r\n").await.unwrap();
                    } else {
                        w.write_all(b"550 delete failed\r\n").await.unwrap();
                    }
                }
                "RNFR" => {
                    let comps = self.resolve(arg);
                    let stuck = comps.last().map(|n| hard_stuck(n)).unwrap_or(false);
                    if !stuck && lookup(&self.root, &comps).is_some() {
                        self.rename_from = Some(comps);
                        w.write_all(b"350 waiting for target\r\n").await.unwrap();
                    } else {
                        w.write_all(b"550 no such path\r\n").await.unwrap();
                    }
                }
                "RNTO" => {
                    let done = match self.rename_from.take() {
                        Some(from) => match remove_node(&mut self.root, &from) {
                            Some(node) => {
                                let to = self.resolve(arg);
                                insert_node(&mut self.root, &to, node)
                            }
                            None => false,
                        },
                        None => false,
                    };
                    if done {
                        w.write_all(b"250 renamed\r\n").await.unwrap();
                    } else {
                        w.write_all(b"553 rename failed\r\n").await.unwrap();
                    }
                }
                "SIZE" => {
                    let comps = self.resolve(arg);
                    match lookup(&self.root, &comps) {
                        Some(Node::File(data)) => {
                            w.write_all(format!("213 {}\r\n", data.len()).as_bytes())
                                .await
                                .unwrap();
                        }
                        _ => w.write_all(b"550 no such file\r\n").await.unwrap(),
                    }
                }
                "LIST" | "NLST" => {
                    let comps = self.resolve(arg);
                    match lookup(&self.root, &comps) {
                        Some(Node::Dir(m)) => {
                            let body = if cmd == "LIST" {
                                list_lines(m)
                            } else {
                                nlst_lines(m)
                            };
                            w.write_all(b"150 here it comes\r\n").await.unwrap();
                            let mut d = data.pop_front().unwrap();
                            d.write_all(body.as_bytes()).await.unwrap();
                            drop(d);
                            w.write_all(b"226 done\r\n").await.unwrap();
                        }
                        _ => w.write_all(b"550 no such dir\r\n").await.unwrap(),
                    }
                }
                "RETR" => {
                    let comps = self.resolve(arg);
                    match lookup(&self.root, &comps) {
                        Some(Node::File(content)) => {
                            let content = content.clone();
                            w.write_all(b"150 opening\r\n").await.unwrap();
                            let mut d = data.pop_front().unwrap();
                            d.write_all(&content).await.unwrap();
                            drop(d);
                            w.write_all(b"226 done\r\n").await.unwrap();
                        }
                        _ => w.write_all(b"550 no such file\r\n").await.unwrap(),
                    }
                }
                "STOR" => {
                    let comps = self.resolve(arg);
                    let parent_ok = comps
                        .split_last()
                        .map(|(_, parent)| {
                            matches!(lookup(&self.root, parent), Some(Node::Dir(_)))
                        })
                        .unwrap_or(false);
                    if parent_ok {
                        w.write_all(b"150 go on\r\n").await.unwrap();
                        let mut d = data.pop_front().unwrap();
                        let mut content = Vec::new();
                        d.read_to_end(&mut content).await.unwrap();
                        drop(d);
                        insert_node(&mut self.root, &comps, Node::File(content));
                        w.write_all(b"226 done\r\n").await.unwrap();
                    } else {
                        w.write_all(b"550 no such dir\r\n").await.unwrap();
                    }
                }
                "QUIT" => {
                    w.write_all(b"221 bye\r\n").await.unwrap();
                    break;
                }
                _ => w.write_all(b"502 not implemented\r\n").await.unwrap(),
            }
        }

        self.root
    }
}

type TestClient = FtpClient<MockConnectionProvider, DuplexStream, io::Error, ()>;

async fn start_session(root: Node, n_data: usize) -> (TestClient, JoinHandle<Node>) {
    let (ctrl_c, ctrl_s) = tokio::io::duplex(16 * 1024);
    let mut data_c = VecDeque::new();
    let mut data_s = VecDeque::new();
    for _ in 0..n_data {
        let (c, s) = tokio::io::duplex(64 * 1024);
        data_c.push_back(c);
        data_s.push_back(s);
    }

    let server = FakeFsServer {
        root,
        cwd: Vec::new(),
        rename_from: None,
    };
    let handle = tokio::spawn(server.run(ctrl_s, data_s));

    let provider = MockConnectionProvider {
        control: Some(ctrl_c),
        data: data_c,
    };
    let config = FtpClientConfig::default();
    let mut client =
        FtpClient::connect_to(FtpServerAddr::new("fake.test", 21), provider, &(), &config)
            .await
            .map_err(|(e, _)| e)
            .unwrap();
    let username = Username::from_original("tester").unwrap();
    let password = Password::from_original("secret").unwrap();
    client
        .new_user_session(Some(&username), Some(&password))
        .await
        .unwrap();
    (client, handle)
}

#[tokio::test]
async fn recursive_list_and_aggregates() {
    let root = dir(vec![(
        "srv",
        dir(vec![
            ("a.txt", file(b"abc")),
            ("link.txt", Node::Link("a.txt".to_string())),
            (
                "sub",
                dir(vec![
                    ("b.txt", file(b"hello")),
                    ("deep", dir(vec![("c.txt", file(b"seven77"))])),
                ]),
            ),
        ]),
    )]);
    let (mut client, handle) = start_session(root, 20).await;
    let mut tree = FtpTreeSession::new(&mut client, &());

    let entries = tree.recursive_list("/srv", FtpListOrder::Ascending).await.unwrap();
    let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "/srv/a.txt",
            "/srv/link.txt",
            "/srv/sub",
            "/srv/sub/b.txt",
            "/srv/sub/deep",
            "/srv/sub/deep/c.txt",
        ]
    );
    assert_eq!(entries[1].entry.entry_type(), FtpListEntryType::Link);
    assert_eq!(entries[1].entry.link_target(), Some("a.txt"));

    let entries = tree
        .recursive_list("/srv", FtpListOrder::Descending)
        .await
        .unwrap();
    assert_eq!(entries[0].path, "/srv/sub/deep/c.txt");

    // two dirs of 4096, files of 3, 5 and 7, link size 5
    let size = tree.dir_size("/srv", true).await.unwrap();
    assert_eq!(size, 4096 * 2 + 3 + 5 + 7 + 5);

    let files = tree
        .count_items("/srv", Some(FtpListEntryType::File), true)
        .await
        .unwrap();
    assert_eq!(files, 3);

    // name only listing of the top level dir
    let top = tree.count_items("/srv", None, false).await.unwrap();
    assert_eq!(top, 3);

    assert!(tree.is_directory("/srv/sub").await.unwrap());
    assert!(!tree.is_directory("/srv/a.txt").await.unwrap());
    assert!(!tree.is_directory("/nowhere").await.unwrap());
    // the probes must not move the working directory
    assert_eq!(tree.client().get_current_dir().await.unwrap(), "/");

    client.quit_and_close().await.unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn recursive_delete_with_rename_fallback() {
    let root = dir(vec![(
        "srv",
        dir(vec![
            ("bad name.txt", file(b"xx")),
            ("ok.txt", file(b"x")),
            ("sub", dir(vec![("x y.txt", file(b"y"))])),
        ]),
    )]);
    let (mut client, handle) = start_session(root, 8).await;
    let mut tree = FtpTreeSession::new(&mut client, &());

    let all_removed = tree.recursive_delete("/srv").await.unwrap();
    assert!(all_removed);

    client.quit_and_close().await.unwrap();
    let root = handle.await.unwrap();
    match root {
        Node::Dir(m) => assert!(m.is_empty()),
        _ => panic!("root is not a dir"),
    }
}

#[tokio::test]
async fn recursive_delete_partial_failure() {
    let root = dir(vec![(
        "srv",
        dir(vec![("stuck.txt", file(b"z")), ("fine.txt", file(b"a"))]),
    )]);
    let (mut client, handle) = start_session(root, 8).await;
    let mut tree = FtpTreeSession::new(&mut client, &());

    let all_removed = tree.recursive_delete("/srv").await.unwrap();
    assert!(!all_removed);

    client.quit_and_close().await.unwrap();
    let root = handle.await.unwrap();
    let srv = lookup(&root, &["srv".to_string()]).expect("srv should survive");
    match srv {
        Node::Dir(m) => {
            assert!(m.contains_key("stuck.txt"));
            assert!(!m.contains_key("fine.txt"));
        }
        _ => panic!("srv is not a dir"),
    }
}

#[tokio::test]
async fn make_dir_all_nested() {
    let (mut client, handle) = start_session(dir(vec![]), 2).await;
    let mut tree = FtpTreeSession::new(&mut client, &());

    tree.make_dir_all("/deep/x/y").await.unwrap();
    assert!(tree.is_directory("/deep/x/y").await.unwrap());
    assert_eq!(tree.client().get_current_dir().await.unwrap(), "/");

    client.quit_and_close().await.unwrap();
    handle.await.unwrap();
}

async fn mirror_round_trip_with(transfer_type: FtpTransferType, tag: &str) {
    let base =
        std::env::temp_dir().join(format!("ftpmill-tree-test-{tag}-{}", std::process::id()));
    let src = base.join("src");
    std::fs::create_dir_all(src.join("sub")).unwrap();
    std::fs::write(src.join("a.txt"), b"alpha").unwrap();
    std::fs::write(src.join("sub").join("b.txt"), b"bravo").unwrap();

    let (mut client, handle) = start_session(dir(vec![]), 16).await;
    let mut tree = FtpTreeSession::new(&mut client, &());

    let uploaded = tree.put_all(&src, "/mirror", transfer_type).await.unwrap();
    assert_eq!(uploaded, 2);
    let files = tree
        .count_items("/mirror", Some(FtpListEntryType::File), true)
        .await
        .unwrap();
    assert_eq!(files, 2);

    let out: PathBuf = base.join("out");
    let downloaded = tree.get_all("/mirror", &out, transfer_type).await.unwrap();
    assert_eq!(downloaded, 2);
    assert_eq!(std::fs::read(out.join("a.txt")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(out.join("sub").join("b.txt")).unwrap(), b"bravo");

    client.quit_and_close().await.unwrap();
    handle.await.unwrap();

    std::fs::remove_dir_all(&base).unwrap();
}

#[tokio::test]
async fn mirror_round_trip_image() {
    mirror_round_trip_with(FtpTransferType::Image, "image").await;
}

#[tokio::test]
async fn mirror_round_trip_ascii() {
    mirror_round_trip_with(FtpTransferType::Ascii, "ascii").await;
}
