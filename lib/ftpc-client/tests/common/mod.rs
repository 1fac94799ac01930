/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use rustls::ServerConfig;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

pub const USER: &str = "user";
pub const PASSWORD: &str = "secret";

pub const LISTING: &str = "drwxr-xr-x 2 user group 4096 Jan 15 2023 mydir\r\n\
-rw-r--r-- 1 user group 1234 Jan 15 2023 a file.txt\r\n\
total 2\r\n\
01-15-23  03:04PM       77 dos.txt\r\n";

/// Sent for `LIST legacy`, the second name is latin-1 encoded.
pub const LEGACY_LISTING: &[u8] = b"drwxr-xr-x 2 user group 4096 Jan 15 2023 mydir\r\n\
-rw-r--r-- 1 user group 10 Jan 15 2023 caf\xe9.txt\r\n\
-rw-r--r-- 1 user group 20 Jan 15 2023 ok.txt\r\n";

trait DataStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> DataStream for T {}

type BoxStream = Box<dyn DataStream>;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ServerTls {
    None,
    Implicit,
    Explicit,
}

#[derive(Default)]
struct ServerState {
    commands: Mutex<Vec<String>>,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

/// A single connection FTP server driven by a fixed command table.
pub struct ScriptedServer {
    addr: SocketAddr,
    certs: Vec<CertificateDer<'static>>,
    state: Arc<ServerState>,
    handle: JoinHandle<io::Result<()>>,
}

pub fn self_signed() -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
    let ck = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(ck.key_pair.serialize_der()));
    (vec![ck.cert.der().clone()], key)
}

fn tls_acceptor(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> TlsAcceptor {
    #[cfg(feature = "rustls-aws-lc")]
    let provider = rustls::crypto::aws_lc_rs::default_provider();
    #[cfg(not(feature = "rustls-aws-lc"))]
    let provider = rustls::crypto::ring::default_provider();

    let config = ServerConfig::builder_with_provider(Arc::new(provider))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();
    TlsAcceptor::from(Arc::new(config))
}

impl ScriptedServer {
    pub async fn start(tls: ServerTls) -> ScriptedServer {
        ScriptedServer::start_at(tls, IpAddr::V4(Ipv4Addr::LOCALHOST))
            .await
            .unwrap()
    }

    /// Listen on `ip`, fails if the address is not available on this host.
    pub async fn start_at(tls: ServerTls, ip: IpAddr) -> io::Result<ScriptedServer> {
        let listener = TcpListener::bind(SocketAddr::new(ip, 0)).await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(ServerState::default());
        {
            let mut files = state.files.lock().unwrap();
            files.insert("a.txt".to_string(), b"hello world\n".to_vec());
            files.insert("big.bin".to_string(), (0..200_000u32).map(|i| i as u8).collect());
        }

        let (certs, key) = self_signed();
        let acceptor = match tls {
            ServerTls::None => None,
            _ => Some(tls_acceptor(certs.clone(), key)),
        };
        let server_state = state.clone();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await?;
            serve(stream, server_state, tls, acceptor).await
        });

        Ok(ScriptedServer {
            addr,
            certs,
            state,
            handle,
        })
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// The self signed server certificate, valid for `localhost`.
    pub fn certs(&self) -> Vec<CertificateDer<'static>> {
        self.certs.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().unwrap().clone()
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.files.lock().unwrap().get(name).cloned()
    }

    pub async fn finish(self) {
        self.handle.await.unwrap().unwrap();
    }
}

enum DataSetup {
    None,
    Passive(TcpListener),
    Active(SocketAddr),
}

struct Session {
    control: BufStream<BoxStream>,
    state: Arc<ServerState>,
    acceptor: Option<TlsAcceptor>,
    local_ip: IpAddr,
    data_setup: DataSetup,
    protected: bool,
    logged_in: bool,
    user: Option<String>,
}

fn parse_port_param(param: &str) -> Option<SocketAddr> {
    let nums: Vec<u8> = param
        .split(',')
        .map(u8::from_str)
        .collect::<Result<_, _>>()
        .ok()?;
    if nums.len() != 6 {
        return None;
    }
    let ip = Ipv4Addr::new(nums[0], nums[1], nums[2], nums[3]);
    let port = ((nums[4] as u16) << 8) | nums[5] as u16;
    Some(SocketAddr::new(IpAddr::V4(ip), port))
}

fn parse_eprt_param(param: &str) -> Option<SocketAddr> {
    let parts: Vec<&str> = param.split('|').collect();
    if parts.len() != 5 {
        return None;
    }
    let ip = IpAddr::from_str(parts[2]).ok()?;
    let port = u16::from_str(parts[3]).ok()?;
    Some(SocketAddr::new(ip, port))
}

impl Session {
    async fn reply(&mut self, msg: &str) -> io::Result<()> {
        self.control.write_all(msg.as_bytes()).await?;
        self.control.write_all(b"\r\n").await?;
        self.control.flush().await
    }

    async fn open_data(&mut self) -> io::Result<BoxStream> {
        let tcp_stream = match std::mem::replace(&mut self.data_setup, DataSetup::None) {
            DataSetup::Passive(listener) => listener.accept().await?.0,
            DataSetup::Active(addr) => TcpStream::connect(addr).await?,
            DataSetup::None => return Err(io::Error::other("no data connection set up")),
        };
        if self.protected {
            if let Some(acceptor) = &self.acceptor {
                let tls_stream = acceptor.accept(tcp_stream).await?;
                return Ok(Box::new(tls_stream));
            }
        }
        Ok(Box::new(tcp_stream))
    }

    async fn send_data(&mut self, data: &[u8], end: &str) -> io::Result<()> {
        self.reply("150 opening data connection").await?;
        let mut stream = self.open_data().await?;
        stream.write_all(data).await?;
        stream.shutdown().await?;
        drop(stream);
        self.reply(end).await
    }

    async fn recv_data(&mut self, name: &str) -> io::Result<()> {
        self.reply("150 ok to send data").await?;
        let mut stream = self.open_data().await?;
        let mut data = Vec::new();
        // TLS peers may close without close_notify
        if let Err(e) = stream.read_to_end(&mut data).await {
            if e.kind() != io::ErrorKind::UnexpectedEof {
                return Err(e);
            }
        }
        drop(stream);
        self.state
            .files
            .lock()
            .unwrap()
            .insert(name.to_string(), data);
        self.reply("226 transfer complete").await
    }

    async fn upgrade_tls(&mut self) -> io::Result<()> {
        let Some(acceptor) = self.acceptor.clone() else {
            return self.reply("502 tls not available").await;
        };
        self.reply("234 proceed with negotiation").await?;
        let control = std::mem::replace(
            &mut self.control,
            BufStream::new(Box::new(tokio::io::duplex(1).0) as BoxStream),
        );
        let tls_stream = acceptor.accept(control.into_inner()).await?;
        self.control = BufStream::new(Box::new(tls_stream));
        Ok(())
    }

    async fn handle(&mut self, verb: &str, param: &str) -> io::Result<bool> {
        if !self.logged_in && !matches!(verb, "USER" | "PASS" | "AUTH" | "PBSZ" | "PROT" | "QUIT") {
            self.reply("530 please login first").await?;
            return Ok(true);
        }

        match verb {
            "AUTH" => self.upgrade_tls().await?,
            "PBSZ" => self.reply("200 PBSZ=0").await?,
            "PROT" => {
                self.protected = param == "P";
                self.reply("200 protection level set").await?;
            }
            "USER" => {
                if param == USER {
                    self.user = Some(param.to_string());
                    self.reply("331 please specify the password").await?;
                } else {
                    self.reply("530 unknown user").await?;
                }
            }
            "PASS" => {
                if self.user.is_some() && param == PASSWORD {
                    self.logged_in = true;
                    self.reply("230-welcome\r\n to the test server\r\n230 login successful")
                        .await?;
                } else {
                    self.reply("530 login incorrect").await?;
                }
            }
            "SYST" => self.reply("215 UNIX Type: L8").await?,
            "FEAT" => {
                self.reply("211-Features:\r\n EPSV\r\n PASV\r\n SIZE\r\n211 End")
                    .await?
            }
            "PWD" => {
                self.reply("257 \"/home/user\" is the current directory")
                    .await?
            }
            "CWD" => self.reply("250 directory changed").await?,
            "TYPE" => self.reply("200 switching to binary mode").await?,
            "NOOP" => self.reply("200 noop ok").await?,
            "MKD" => {
                let msg = format!("257 \"/home/user/{param}\" created");
                self.reply(&msg).await?
            }
            "DELE" => {
                let removed = self.state.files.lock().unwrap().remove(param);
                if removed.is_some() {
                    self.reply("250 delete operation successful").await?;
                } else {
                    let msg = format!("550 {param}: No such file or directory");
                    self.reply(&msg).await?;
                }
            }
            "SIZE" => {
                let size = self.state.files.lock().unwrap().get(param).map(|d| d.len());
                match size {
                    Some(n) => self.reply(&format!("213 {n}")).await?,
                    None => self.reply("550 could not get file size").await?,
                }
            }
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                self.data_setup = DataSetup::Passive(listener);
                let msg = format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{}).",
                    port >> 8,
                    port & 0xff
                );
                self.reply(&msg).await?;
            }
            "EPSV" => {
                let listener = TcpListener::bind(SocketAddr::new(self.local_ip, 0)).await?;
                let port = listener.local_addr()?.port();
                self.data_setup = DataSetup::Passive(listener);
                let msg = format!("229 Entering Extended Passive Mode (|||{port}|)");
                self.reply(&msg).await?;
            }
            "PORT" | "EPRT" => {
                let addr = if verb == "PORT" {
                    parse_port_param(param)
                } else {
                    parse_eprt_param(param)
                };
                match addr {
                    Some(addr) => {
                        self.data_setup = DataSetup::Active(addr);
                        self.reply("200 command successful").await?;
                    }
                    None => self.reply("501 illegal command").await?,
                }
            }
            "LIST" => {
                let listing = if param == "legacy" {
                    LEGACY_LISTING
                } else {
                    LISTING.as_bytes()
                };
                self.send_data(listing, "226 directory send ok").await?
            }
            "NLST" => {
                let names = self
                    .state
                    .files
                    .lock()
                    .unwrap()
                    .keys()
                    .map(|k| format!("{k}\r\n"))
                    .collect::<String>();
                self.send_data(names.as_bytes(), "226 directory send ok")
                    .await?
            }
            "RETR" => {
                if param == "broken.txt" {
                    self.send_data(b"partial", "451 local error in processing")
                        .await?;
                    return Ok(true);
                }
                let data = self.state.files.lock().unwrap().get(param).cloned();
                match data {
                    Some(data) => self.send_data(&data, "226 transfer complete").await?,
                    None => {
                        self.data_setup = DataSetup::None;
                        self.reply("550 failed to open file").await?
                    }
                }
            }
            "STOR" => self.recv_data(param).await?,
            "QUIT" => {
                self.reply("221 goodbye").await?;
                return Ok(false);
            }
            _ => self.reply("502 command not implemented").await?,
        }
        Ok(true)
    }
}

async fn serve(
    stream: TcpStream,
    state: Arc<ServerState>,
    tls: ServerTls,
    acceptor: Option<TlsAcceptor>,
) -> io::Result<()> {
    let local_ip = stream.local_addr()?.ip();
    let control: BoxStream = match (tls, &acceptor) {
        (ServerTls::Implicit, Some(acceptor)) => Box::new(acceptor.accept(stream).await?),
        _ => Box::new(stream),
    };

    let mut session = Session {
        control: BufStream::new(control),
        state,
        acceptor: if tls == ServerTls::None { None } else { acceptor },
        local_ip,
        data_setup: DataSetup::None,
        protected: tls == ServerTls::Implicit,
        logged_in: false,
        user: None,
    };
    session.reply("220 scripted server ready").await?;

    let mut line = String::new();
    loop {
        line.clear();
        if session.control.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let line = line.trim_end();
        session.state.commands.lock().unwrap().push(line.to_string());
        let (verb, param) = line.split_once(' ').unwrap_or((line, ""));
        let verb = verb.to_ascii_uppercase();
        if !session.handle(&verb, param).await? {
            return Ok(());
        }
    }
}
