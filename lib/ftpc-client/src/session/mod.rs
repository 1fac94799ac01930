/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rustls_pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsStream;

use crate::config::FtpClientConfig;
use crate::control::{FtpCommand, FtpControlChannel};
use crate::error::{FtpCommandError, FtpConnectError};
use crate::reply::FtpReply;
use crate::stream::FtpStream;
use crate::tls::FtpTlsPolicy;

mod copy;
mod negotiate;

mod transfer;
pub use transfer::FtpTransfer;

/// Split `host:port` or `[v6-host]:port`.
fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    let port = u16::from_str(port).ok()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some((host, port))
    }
}

/// A control connection to one FTP server.
///
/// Commands are issued strictly one at a time. A data transfer borrows the session
/// until it is closed, so no other command can be sent while it is in flight.
pub struct FtpSession {
    control: FtpControlChannel<FtpStream>,
    config: Arc<FtpClientConfig>,
    passive: bool,
    server_name: Option<ServerName<'static>>,
    data_protected: bool,
}

impl FtpSession {
    /// Connect to `addr` given as `host:port`, and wait for the server greeting.
    ///
    /// The control connection is encrypted right away if implicit TLS is configured.
    pub async fn connect(
        addr: &str,
        timeout: Duration,
        config: Arc<FtpClientConfig>,
    ) -> Result<Self, FtpConnectError> {
        let Some((host, port)) = split_host_port(addr) else {
            return Err(FtpConnectError::InvalidAddress(addr.to_string()));
        };

        let server_name = match config.tls_policy() {
            Some(policy) => Some(tls_server_name(policy, host)?),
            None => None,
        };

        let tcp_stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => return Err(FtpConnectError::ConnectFailed(e)),
            Err(_) => return Err(FtpConnectError::ConnectTimedOut),
        };
        crate::log_msg!(
            "connected to {addr}, local address {:?}",
            tcp_stream.local_addr()
        );

        let mut data_protected = false;
        let stream = match (config.tls_implicit(), config.tls_policy(), &server_name) {
            (true, Some(policy), Some(name)) => {
                let tls_stream = match policy.connect(name.clone(), tcp_stream).await {
                    Ok(Ok(s)) => s,
                    Ok(Err(e)) => return Err(FtpConnectError::TlsHandshakeFailed(e)),
                    Err(_) => return Err(FtpConnectError::TlsHandshakeTimedOut),
                };
                data_protected = true;
                FtpStream::Tls(Box::new(TlsStream::Client(tls_stream)))
            }
            _ => FtpStream::Plain(tcp_stream),
        };

        let mut control = FtpControlChannel::new(stream, &config);
        control
            .wait_greetings(config.rw_timeout())
            .await
            .map_err(FtpConnectError::GreetingFailed)?;

        Ok(FtpSession {
            control,
            passive: config.passive(),
            config,
            server_name,
            data_protected,
        })
    }

    /// Log in, after upgrading the control connection to TLS if explicit TLS is configured.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<(), FtpCommandError> {
        if self.config.tls_explicit() && !self.control.get_ref().is_tls() {
            self.upgrade_tls().await?;
        }

        let reply = self.control.send_username(user).await?;
        if reply.code() == 331 {
            self.control.send_password(password).await
        } else {
            Err(FtpCommandError::LoginFailed(reply.into_message()))
        }
    }

    async fn upgrade_tls(&mut self) -> Result<(), FtpCommandError> {
        let (Some(policy), Some(server_name)) = (self.config.tls.clone(), self.server_name.clone())
        else {
            return Err(FtpCommandError::TlsNotConfigured);
        };

        self.control.auth("TLS").await?;
        self.control.upgrade_tls(&policy, server_name).await?;
        self.control.pbsz("0").await?;
        self.control.prot("P").await?;
        self.data_protected = true;
        Ok(())
    }

    fn data_tls_policy(&self) -> Option<(Arc<FtpTlsPolicy>, ServerName<'static>)> {
        if !self.data_protected {
            return None;
        }
        let policy = self.config.tls.clone()?;
        let name = self.server_name.clone()?;
        Some((policy, name))
    }

    #[inline]
    pub fn config(&self) -> &FtpClientConfig {
        &self.config
    }

    #[inline]
    pub fn is_tls(&self) -> bool {
        self.control.get_ref().is_tls()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.control.get_ref().local_addr()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.control.get_ref().peer_addr()
    }

    /// Use passive (true) or active (false) mode for the following transfers.
    pub fn set_passive(&mut self, passive: bool) {
        self.passive = passive;
    }

    #[inline]
    pub fn is_passive(&self) -> bool {
        self.passive
    }

    pub async fn set_type(&mut self, param: &str) -> Result<(), FtpCommandError> {
        self.control.set_type(param).await
    }

    pub async fn cwd(&mut self, path: &str) -> Result<(), FtpCommandError> {
        self.control.cwd(path).await
    }

    pub async fn cdup(&mut self) -> Result<(), FtpCommandError> {
        self.control.cdup().await
    }

    pub async fn pwd(&mut self) -> Result<String, FtpCommandError> {
        self.control.pwd().await
    }

    pub async fn rename(&mut self, from: &str, to: &str) -> Result<(), FtpCommandError> {
        self.control.rename(from, to).await
    }

    pub async fn delete(&mut self, path: &str) -> Result<(), FtpCommandError> {
        self.control.dele(path).await
    }

    /// Create a directory, returns the path the server reported.
    pub async fn mkd(&mut self, path: &str) -> Result<String, FtpCommandError> {
        self.control.mkd(path).await
    }

    pub async fn rmd(&mut self, path: &str) -> Result<(), FtpCommandError> {
        self.control.rmd(path).await
    }

    pub async fn noop(&mut self) -> Result<(), FtpCommandError> {
        self.control.noop().await
    }

    pub async fn rest(&mut self, offset: u64) -> Result<(), FtpCommandError> {
        self.control.rest(offset).await
    }

    pub async fn rein(&mut self) -> Result<(), FtpCommandError> {
        self.control.rein().await
    }

    pub async fn abort(&mut self) -> Result<(), FtpCommandError> {
        self.control.abor().await
    }

    pub async fn syst(&mut self) -> Result<String, FtpCommandError> {
        self.control.syst().await
    }

    pub async fn size(&mut self, path: &str) -> Result<u64, FtpCommandError> {
        self.control.size(path).await
    }

    pub async fn opts(&mut self, param: &str) -> Result<(), FtpCommandError> {
        self.control.opts(param).await
    }

    pub async fn feat(&mut self) -> Result<Vec<String>, FtpCommandError> {
        self.control.feat().await
    }

    pub async fn auth(&mut self, mechanism: &str) -> Result<(), FtpCommandError> {
        self.control.auth(mechanism).await
    }

    pub async fn pbsz(&mut self, size: &str) -> Result<(), FtpCommandError> {
        self.control.pbsz(size).await
    }

    /// Set the data channel protection level.
    ///
    /// Data connections are only wrapped in TLS at level `P` over a TLS control connection.
    pub async fn prot(&mut self, level: &str) -> Result<(), FtpCommandError> {
        self.control.prot(level).await?;
        self.data_protected = self.control.get_ref().is_tls() && level.eq_ignore_ascii_case("P");
        Ok(())
    }

    /// Send any command line, the reply code is checked only if `expect` is set.
    pub async fn send_command(
        &mut self,
        expect: Option<u16>,
        line: &str,
    ) -> Result<FtpReply, FtpCommandError> {
        self.control.send_command(expect, line).await
    }

    /// Wait for one more reply, for example the end of a transfer driven elsewhere.
    ///
    /// `command` names the command the reply belongs to in errors.
    pub async fn wait_reply(
        &mut self,
        command: &str,
        expect: Option<u16>,
        timeout: Duration,
    ) -> Result<FtpReply, FtpCommandError> {
        self.control.wait_reply(command, expect, timeout).await
    }

    /// Ask the server to listen, returns the address to connect to.
    pub async fn pasv(&mut self) -> Result<SocketAddr, FtpCommandError> {
        self.control.pasv().await
    }

    /// Ask the server to listen, returns the port on the control peer address.
    pub async fn epsv(&mut self) -> Result<u16, FtpCommandError> {
        self.control.epsv().await
    }

    /// Tell the server where to connect for the next transfer, IPv4 only.
    pub async fn port(&mut self, addr: SocketAddr) -> Result<(), FtpCommandError> {
        self.control.port(addr).await
    }

    pub async fn eprt(&mut self, addr: SocketAddr) -> Result<(), FtpCommandError> {
        self.control.eprt(addr).await
    }

    /// Send RETR without opening a data connection on this side.
    pub async fn retr(&mut self, path: &str) -> Result<FtpReply, FtpCommandError> {
        let line = format!("{} {path}", FtpCommand::RETR);
        self.control.start_transfer(&line).await
    }

    /// Send STOR without opening a data connection on this side.
    pub async fn stor(&mut self, path: &str) -> Result<FtpReply, FtpCommandError> {
        let line = format!("{} {path}", FtpCommand::STOR);
        self.control.start_transfer(&line).await
    }

    /// Send QUIT and close the control connection.
    ///
    /// Failure of the QUIT exchange itself is ignored.
    pub async fn quit(mut self) -> io::Result<()> {
        if let Err(e) = self.control.send_quit().await {
            crate::log_msg!("quit failed: {e}");
        }
        self.control.shutdown().await
    }
}

fn tls_server_name(
    policy: &FtpTlsPolicy,
    host: &str,
) -> Result<ServerName<'static>, FtpConnectError> {
    if let Some(name) = policy.server_name() {
        return Ok(name.clone());
    }
    ServerName::try_from(host.to_string())
        .map_err(|_| FtpConnectError::InvalidServerName(host.to_string()))
}
