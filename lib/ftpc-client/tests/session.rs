/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use ftpc_client::{FtpClientConfig, FtpCommandError, FtpFileKind, FtpSession, FtpTransferError};

mod common;
use common::{PASSWORD, ScriptedServer, ServerTls, USER};

const TIMEOUT: Duration = Duration::from_secs(5);

fn client_config(passive: bool) -> Arc<FtpClientConfig> {
    let mut config = FtpClientConfig::default();
    config.set_passive(passive);
    config.set_rw_timeout(TIMEOUT);
    Arc::new(config)
}

async fn logged_in(server: &ScriptedServer, passive: bool) -> FtpSession {
    let mut session = FtpSession::connect(&server.addr(), TIMEOUT, client_config(passive))
        .await
        .unwrap();
    session.login(USER, PASSWORD).await.unwrap();
    session
}

async fn start_v6() -> Option<ScriptedServer> {
    match ScriptedServer::start_at(ServerTls::None, IpAddr::V6(Ipv6Addr::LOCALHOST)).await {
        Ok(server) => Some(server),
        Err(e) => {
            eprintln!("no ipv6 loopback, skipped: {e}");
            None
        }
    }
}

fn is_data_setup(cmd: &str) -> bool {
    ["PASV", "EPSV", "PORT", "EPRT"]
        .iter()
        .any(|verb| cmd == *verb || cmd.starts_with(&format!("{verb} ")))
}

#[tokio::test]
async fn login_and_pwd() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;
    assert!(!session.is_tls());
    assert_eq!(session.pwd().await.unwrap(), "/home/user");
    assert_eq!(session.syst().await.unwrap(), "UNIX Type: L8");
    assert_eq!(session.feat().await.unwrap(), vec!["EPSV", "PASV", "SIZE"]);
    session.quit().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn login_unknown_user() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = FtpSession::connect(&server.addr(), TIMEOUT, client_config(true))
        .await
        .unwrap();
    let e = session.login("nobody", PASSWORD).await.unwrap_err();
    match e {
        FtpCommandError::LoginFailed(msg) => assert_eq!(msg, "unknown user"),
        e => panic!("unexpected error {e}"),
    }
    session.quit().await.unwrap();
    let commands = server.commands();
    server.finish().await;
    assert!(!commands.iter().any(|c| c.starts_with("PASS")));
}

#[tokio::test]
async fn login_bad_password() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = FtpSession::connect(&server.addr(), TIMEOUT, client_config(true))
        .await
        .unwrap();
    let e = session.login(USER, "wrong").await.unwrap_err();
    assert_eq!(e.reply_code(), Some(530));
    assert_eq!(e.reply_message(), Some("login incorrect"));
    session.quit().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn delete_missing_file() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;
    let e = session.delete("missing.txt").await.unwrap_err();
    assert_eq!(e.reply_code(), Some(550));
    assert_eq!(
        e.reply_message(),
        Some("missing.txt: No such file or directory")
    );
    session.delete("a.txt").await.unwrap();
    assert!(server.file("a.txt").is_none());
    session.quit().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn passive_dir() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;

    let entries = session.dir(&[]).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].name(), "mydir");
    assert_eq!(entries[0].mode().kind(), FtpFileKind::Directory);
    assert_eq!(entries[1].name(), "a file.txt");
    assert_eq!(entries[1].size(), 1234);
    assert_eq!(entries[2].name(), "dos.txt");
    assert_eq!(entries[2].size(), 77);

    let names = session.nlst(&[]).await.unwrap();
    assert_eq!(names, vec!["a.txt", "big.bin"]);

    session.quit().await.unwrap();
    let commands = server.commands();
    server.finish().await;

    for (i, cmd) in commands.iter().enumerate() {
        if cmd == "LIST" || cmd == "NLST" {
            assert_eq!(commands[i - 1], "PASV");
        }
    }
}

#[tokio::test]
async fn active_retrieve() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, false).await;

    let mut data = Vec::new();
    let n = session.retrieve_to("big.bin", &mut data).await.unwrap();
    assert_eq!(n, 200_000);
    assert_eq!(Some(data), server.file("big.bin"));

    session.quit().await.unwrap();
    let commands = server.commands();
    server.finish().await;

    let pos = commands.iter().position(|c| c == "RETR big.bin").unwrap();
    assert!(commands[pos - 1].starts_with("PORT 127,0,0,1,"));
}

#[tokio::test]
async fn store_then_retrieve() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;

    let content = b"some uploaded content\n".repeat(100);
    let n = session
        .store_from("upload.txt", &mut content.as_slice())
        .await
        .unwrap();
    assert_eq!(n, content.len() as u64);
    assert_eq!(session.size("upload.txt").await.unwrap(), n);

    session.set_passive(false);
    let mut data = Vec::new();
    session.retrieve_to("upload.txt", &mut data).await.unwrap();
    assert_eq!(data, content);

    session.quit().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn one_setup_command_per_transfer() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;

    session.list(&[]).await.unwrap();
    session.set_passive(false);
    session.nlst(&[]).await.unwrap();
    let mut data = Vec::new();
    session.retrieve_to("a.txt", &mut data).await.unwrap();

    session.quit().await.unwrap();
    let commands = server.commands();
    server.finish().await;

    let setups = commands.iter().filter(|c| is_data_setup(c)).count();
    assert_eq!(setups, 3);
    for (i, cmd) in commands.iter().enumerate() {
        if is_data_setup(cmd) {
            let next = &commands[i + 1];
            assert!(
                next == "LIST" || next == "NLST" || next.starts_with("RETR "),
                "{cmd} followed by {next}"
            );
        }
    }
}

#[tokio::test]
async fn transfer_end_failure() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;

    let mut data = Vec::new();
    let e = session
        .retrieve_to("broken.txt", &mut data)
        .await
        .unwrap_err();
    assert!(matches!(e, FtpTransferError::EndReplyFailed(_)));
    assert_eq!(e.reply_code(), Some(451));
    assert_eq!(data, b"partial");

    // the control connection is still in sync
    session.noop().await.unwrap();

    let e = session
        .retrieve_to("missing.txt", &mut data)
        .await
        .unwrap_err();
    assert!(matches!(e, FtpTransferError::Setup(_)));
    assert_eq!(e.reply_code(), Some(550));

    session.quit().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn retrieve_local_file() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;

    let path = std::env::temp_dir().join(format!("ftpc-client-test-{}.txt", std::process::id()));
    let n = session.retrieve_file("a.txt", &path).await.unwrap();
    assert_eq!(n, 12);
    assert_eq!(std::fs::read(&path).unwrap(), b"hello world\n");

    let n = session.store_file(&path, "copy.txt").await.unwrap();
    assert_eq!(n, 12);
    assert_eq!(server.file("copy.txt").unwrap(), b"hello world\n");
    std::fs::remove_file(&path).unwrap();

    session.quit().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn quit_closes_connection() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let session = logged_in(&server, true).await;
    session.quit().await.unwrap();
    let commands = server.commands();
    server.finish().await;
    assert_eq!(commands.last().map(|s| s.as_str()), Some("QUIT"));
}

#[tokio::test]
async fn dir_with_legacy_encoded_name() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;

    let lines = session.list(&["legacy"]).await.unwrap();
    assert_eq!(lines.len(), 3);

    let entries = session.dir(&["legacy"]).await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, ["mydir", "caf\u{fffd}.txt", "ok.txt"]);
    assert_eq!(entries[2].size(), 20);

    session.quit().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn passive_ipv6_uses_epsv() {
    let Some(server) = start_v6().await else {
        return;
    };
    let mut session = logged_in(&server, true).await;

    let lines = session.list(&[]).await.unwrap();
    assert_eq!(lines.len(), 4);

    session.quit().await.unwrap();
    let commands = server.commands();
    server.finish().await;

    assert!(!commands.iter().any(|c| c == "PASV"));
    let pos = commands.iter().position(|c| c == "LIST").unwrap();
    assert_eq!(commands[pos - 1], "EPSV");
    assert_eq!(commands.iter().filter(|c| is_data_setup(c)).count(), 1);
}

#[tokio::test]
async fn active_ipv6_uses_eprt() {
    let Some(server) = start_v6().await else {
        return;
    };
    let mut session = logged_in(&server, false).await;

    let mut data = Vec::new();
    session.retrieve_to("a.txt", &mut data).await.unwrap();
    assert_eq!(data, b"hello world\n");

    session.quit().await.unwrap();
    let commands = server.commands();
    server.finish().await;

    assert!(!commands.iter().any(|c| c.starts_with("PORT")));
    let pos = commands.iter().position(|c| c == "RETR a.txt").unwrap();
    assert!(
        commands[pos - 1].starts_with("EPRT |2|::1|"),
        "{}",
        commands[pos - 1]
    );
    assert_eq!(commands.iter().filter(|c| is_data_setup(c)).count(), 1);
}

#[tokio::test]
async fn wait_reply_of_driven_transfer() {
    let server = ScriptedServer::start(ServerTls::None).await;
    let mut session = logged_in(&server, true).await;

    let addr = session.pasv().await.unwrap();
    let reply = session.retr("broken.txt").await.unwrap();
    assert_eq!(reply.code(), 150);

    let mut data_stream = TcpStream::connect(addr).await.unwrap();
    let mut data = Vec::new();
    data_stream.read_to_end(&mut data).await.unwrap();
    assert_eq!(data, b"partial");

    let e = session
        .wait_reply("RETR", Some(226), TIMEOUT)
        .await
        .unwrap_err();
    match &e {
        FtpCommandError::UnexpectedReply { command, code, .. } => {
            assert_eq!(command, "RETR");
            assert_eq!(*code, 451);
        }
        e => panic!("unexpected error {e}"),
    }
    assert!(e.to_string().contains("(RETR -> 451)"));

    session.quit().await.unwrap();
    server.finish().await;
}
