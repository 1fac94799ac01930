/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, BufStream};
use tokio_rustls::TlsStream;

use crate::config::{FtpClientConfig, FtpControlConfig};
use crate::error::{FtpCommandError, FtpReplyParseError};
use crate::reply::FtpReply;
use crate::stream::FtpStream;
use crate::tls::FtpTlsPolicy;

mod response;

mod command;
pub(crate) use command::{FtpCommand, command_verb};

pub(crate) struct FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite,
{
    stream: BufStream<T>,
    control: FtpControlConfig,
    rw_timeout: Duration,
    log_raw_io: bool,
}

fn check_reply(
    command: &str,
    reply: FtpReply,
    accepted: &[u16],
) -> Result<FtpReply, FtpCommandError> {
    if accepted.contains(&reply.code()) {
        Ok(reply)
    } else {
        Err(unexpected_reply(command, reply))
    }
}

pub(crate) fn unexpected_reply(command: &str, reply: FtpReply) -> FtpCommandError {
    FtpCommandError::UnexpectedReply {
        command: command.to_string(),
        code: reply.code(),
        message: reply.into_message(),
    }
}

fn invalid_syntax(cmd: FtpCommand, code: u16, source: FtpReplyParseError) -> FtpCommandError {
    FtpCommandError::InvalidReplySyntax {
        command: cmd.as_str().to_string(),
        code,
        source,
    }
}

/// Format the `h1,h2,h3,h4,p1,p2` parameter of PORT.
pub(crate) fn port_param(addr: SocketAddr) -> Option<String> {
    let IpAddr::V4(ip) = addr.ip() else {
        return None;
    };
    let [h1, h2, h3, h4] = ip.octets();
    let port = addr.port();
    Some(format!(
        "{h1},{h2},{h3},{h4},{},{}",
        port >> 8,
        port & 0xff
    ))
}

/// Format the `|af|host|port|` parameter of EPRT.
pub(crate) fn eprt_param(addr: SocketAddr) -> String {
    let family = match addr.ip() {
        IpAddr::V4(_) => 1,
        IpAddr::V6(_) => 2,
    };
    format!("|{family}|{}|{}|", addr.ip(), addr.port())
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: T, config: &FtpClientConfig) -> Self {
        FtpControlChannel {
            stream: BufStream::new(stream),
            control: config.control,
            rw_timeout: config.rw_timeout,
            log_raw_io: config.log_raw_io,
        }
    }

    #[inline]
    pub(crate) fn get_ref(&self) -> &T {
        self.stream.get_ref()
    }

    async fn exchange(
        &mut self,
        cmd: FtpCommand,
        param: Option<&str>,
        accepted: &[u16],
        stage: &'static str,
    ) -> Result<FtpReply, FtpCommandError> {
        match param {
            Some(p) => self.send_cmd1(cmd, p).await?,
            None => self.send_cmd(cmd).await?,
        }
        let reply = self.timed_read_reply(stage).await?;
        check_reply(cmd.as_str(), reply, accepted)
    }

    pub(crate) async fn wait_greetings(
        &mut self,
        timeout: Duration,
    ) -> Result<FtpReply, FtpCommandError> {
        loop {
            let reply = self.read_reply_with_timeout(timeout, "wait greetings").await?;
            return match reply.code() {
                120 => continue,
                220 => Ok(reply),
                _ => Err(unexpected_reply(FtpCommand::GREETING.as_str(), reply)),
            };
        }
    }

    /// Send a raw command line, the reply code is only checked if `expect` is set.
    pub(crate) async fn send_command(
        &mut self,
        expect: Option<u16>,
        line: &str,
    ) -> Result<FtpReply, FtpCommandError> {
        self.send_line(line).await?;
        let reply = self.timed_read_reply("send command").await?;
        match expect {
            Some(code) => check_reply(command_verb(line), reply, &[code]),
            None => Ok(reply),
        }
    }

    pub(crate) async fn wait_reply(
        &mut self,
        command: &str,
        expect: Option<u16>,
        timeout: Duration,
    ) -> Result<FtpReply, FtpCommandError> {
        let reply = self.read_reply_with_timeout(timeout, "wait reply").await?;
        match expect {
            Some(code) => check_reply(command, reply, &[code]),
            None => Ok(reply),
        }
    }

    pub(crate) async fn send_username(&mut self, name: &str) -> Result<FtpReply, FtpCommandError> {
        self.send_cmd1(FtpCommand::USER, name).await?;
        let reply = self.timed_read_reply("send username").await?;
        Ok(reply)
    }

    pub(crate) async fn send_password(&mut self, pass: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::PASS, Some(pass), &[230], "send password")
            .await?;
        Ok(())
    }

    pub(crate) async fn auth(&mut self, mechanism: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::AUTH, Some(mechanism), &[234], "auth")
            .await?;
        Ok(())
    }

    pub(crate) async fn pbsz(&mut self, size: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::PBSZ, Some(size), &[200], "pbsz")
            .await?;
        Ok(())
    }

    pub(crate) async fn prot(&mut self, level: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::PROT, Some(level), &[200], "prot")
            .await?;
        Ok(())
    }

    pub(crate) async fn cwd(&mut self, path: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::CWD, Some(path), &[250], "change dir")
            .await?;
        Ok(())
    }

    pub(crate) async fn cdup(&mut self) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::CDUP, None, &[250], "change to parent dir")
            .await?;
        Ok(())
    }

    pub(crate) async fn pwd(&mut self) -> Result<String, FtpCommandError> {
        let cmd = FtpCommand::PWD;
        let reply = self.exchange(cmd, None, &[257], "print working dir").await?;
        reply
            .parse_quoted_path_257()
            .map_err(|e| invalid_syntax(cmd, reply.code(), e))
    }

    pub(crate) async fn rename(&mut self, from: &str, to: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::RNFR, Some(from), &[350], "rename from")
            .await?;
        self.exchange(FtpCommand::RNTO, Some(to), &[250], "rename to")
            .await?;
        Ok(())
    }

    pub(crate) async fn dele(&mut self, path: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::DELE, Some(path), &[250, 200], "delete")
            .await?;
        Ok(())
    }

    pub(crate) async fn mkd(&mut self, path: &str) -> Result<String, FtpCommandError> {
        let cmd = FtpCommand::MKD;
        let reply = self.exchange(cmd, Some(path), &[257], "make dir").await?;
        reply
            .parse_quoted_path_257()
            .map_err(|e| invalid_syntax(cmd, reply.code(), e))
    }

    pub(crate) async fn rmd(&mut self, path: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::RMD, Some(path), &[250], "remove dir")
            .await?;
        Ok(())
    }

    pub(crate) async fn noop(&mut self) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::NOOP, None, &[200], "noop").await?;
        Ok(())
    }

    pub(crate) async fn rest(&mut self, offset: u64) -> Result<(), FtpCommandError> {
        let offset = offset.to_string();
        self.exchange(FtpCommand::REST, Some(&offset), &[350], "restart")
            .await?;
        Ok(())
    }

    pub(crate) async fn rein(&mut self) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::REIN, None, &[220], "reinitialize")
            .await?;
        Ok(())
    }

    pub(crate) async fn abor(&mut self) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::ABOR, None, &[225, 226], "abort")
            .await?;
        Ok(())
    }

    pub(crate) async fn syst(&mut self) -> Result<String, FtpCommandError> {
        let reply = self
            .exchange(FtpCommand::SYST, None, &[215], "system type")
            .await?;
        Ok(reply.into_message())
    }

    pub(crate) async fn size(&mut self, path: &str) -> Result<u64, FtpCommandError> {
        let cmd = FtpCommand::SIZE;
        let reply = self.exchange(cmd, Some(path), &[213], "file size").await?;
        reply
            .parse_size_213()
            .map_err(|e| invalid_syntax(cmd, reply.code(), e))
    }

    pub(crate) async fn set_type(&mut self, param: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::TYPE, Some(param), &[200], "transfer type")
            .await?;
        Ok(())
    }

    pub(crate) async fn opts(&mut self, param: &str) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::OPTS, Some(param), &[200], "options")
            .await?;
        Ok(())
    }

    /// Get the feature lines advertised between the first and the last reply line.
    pub(crate) async fn feat(&mut self) -> Result<Vec<String>, FtpCommandError> {
        let reply = self
            .exchange(FtpCommand::FEAT, None, &[211], "server features")
            .await?;
        let lines = reply.lines();
        if lines.len() < 3 {
            return Ok(Vec::new());
        }
        let features = lines[1..lines.len() - 1]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        Ok(features)
    }

    pub(crate) async fn pasv(&mut self) -> Result<SocketAddr, FtpCommandError> {
        let cmd = FtpCommand::PASV;
        let reply = self.exchange(cmd, None, &[227], "passive").await?;
        reply
            .parse_pasv_227()
            .map_err(|e| invalid_syntax(cmd, reply.code(), e))
    }

    pub(crate) async fn epsv(&mut self) -> Result<u16, FtpCommandError> {
        let cmd = FtpCommand::EPSV;
        let reply = self.exchange(cmd, None, &[229], "extended passive").await?;
        reply
            .parse_epsv_229()
            .map_err(|e| invalid_syntax(cmd, reply.code(), e))
    }

    pub(crate) async fn port(&mut self, addr: SocketAddr) -> Result<(), FtpCommandError> {
        let Some(param) = port_param(addr) else {
            return Err(FtpCommandError::InvalidParameter(addr.to_string()));
        };
        self.exchange(FtpCommand::PORT, Some(&param), &[200], "port")
            .await?;
        Ok(())
    }

    pub(crate) async fn eprt(&mut self, addr: SocketAddr) -> Result<(), FtpCommandError> {
        let param = eprt_param(addr);
        self.exchange(FtpCommand::EPRT, Some(&param), &[200], "extended port")
            .await?;
        Ok(())
    }

    /// Send a transfer command and wait for the data connection to be opened.
    pub(crate) async fn start_transfer(&mut self, line: &str) -> Result<FtpReply, FtpCommandError> {
        self.send_line(line).await?;
        let reply = self.timed_read_reply("start transfer").await?;
        check_reply(command_verb(line), reply, &[125, 150])
    }

    pub(crate) async fn wait_transfer_end(
        &mut self,
        command: &str,
    ) -> Result<FtpReply, FtpCommandError> {
        let reply = self.timed_read_reply("wait transfer end").await?;
        check_reply(command, reply, &[226])
    }

    pub(crate) async fn send_quit(&mut self) -> Result<(), FtpCommandError> {
        self.send_cmd(FtpCommand::QUIT).await?;
        let _ = self.timed_read_reply("quit").await?;
        Ok(())
    }
}

impl FtpControlChannel<FtpStream> {
    /// Switch the plain control connection to TLS.
    ///
    /// On handshake failure the connection is left detached and is no longer usable.
    pub(crate) async fn upgrade_tls(
        &mut self,
        policy: &FtpTlsPolicy,
        server_name: ServerName<'static>,
    ) -> Result<(), FtpCommandError> {
        let tcp_stream = match self.stream.get_mut().take() {
            FtpStream::Plain(s) => s,
            FtpStream::Tls(s) => {
                *self.stream.get_mut() = FtpStream::Tls(s);
                return Ok(());
            }
            FtpStream::Detached => return Err(FtpCommandError::NotConnected),
        };

        match policy.connect(server_name, tcp_stream).await {
            Ok(Ok(tls_stream)) => {
                crate::log_msg!(
                    "control connection to {:?} upgraded to tls",
                    tls_stream.get_ref().0.peer_addr()
                );
                *self.stream.get_mut() = FtpStream::Tls(Box::new(TlsStream::Client(tls_stream)));
                Ok(())
            }
            Ok(Err(e)) => Err(FtpCommandError::TlsHandshakeFailed(e)),
            Err(_) => Err(FtpCommandError::TlsHandshakeTimedOut),
        }
    }

    pub(crate) async fn shutdown(&mut self) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;

        self.stream.shutdown().await
    }
}
