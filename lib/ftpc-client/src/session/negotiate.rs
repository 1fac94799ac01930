/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::SocketAddr;

use rustls_pki_types::ServerName;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tokio_rustls::TlsStream;

use super::FtpSession;
use crate::error::FtpCommandError;
use crate::stream::FtpStream;
use crate::tls::FtpTlsPolicy;

enum DataChannelSetup {
    Passive(TcpStream),
    Active(TcpListener, Instant),
}

async fn tls_client_wrap(
    policy: &FtpTlsPolicy,
    server_name: ServerName<'static>,
    stream: TcpStream,
) -> Result<FtpStream, FtpCommandError> {
    match policy.connect(server_name, stream).await {
        Ok(Ok(s)) => Ok(FtpStream::Tls(Box::new(TlsStream::Client(s)))),
        Ok(Err(e)) => Err(FtpCommandError::TlsHandshakeFailed(e)),
        Err(_) => Err(FtpCommandError::TlsHandshakeTimedOut),
    }
}

async fn tls_server_wrap(
    policy: &FtpTlsPolicy,
    stream: TcpStream,
) -> Result<FtpStream, FtpCommandError> {
    match policy.accept(stream).await {
        Some(Ok(Ok(s))) => Ok(FtpStream::Tls(Box::new(TlsStream::Server(s)))),
        Some(Ok(Err(e))) => Err(FtpCommandError::TlsHandshakeFailed(e)),
        Some(Err(_)) => Err(FtpCommandError::TlsHandshakeTimedOut),
        None => Err(FtpCommandError::TlsServerIdentityMissing),
    }
}

impl FtpSession {
    /// Get a data address with PASV or EPSV, depending on the control peer address family.
    async fn passive_addr(&mut self) -> Result<SocketAddr, FtpCommandError> {
        let peer = self
            .control
            .get_ref()
            .peer_addr()
            .map_err(|_| FtpCommandError::NotConnected)?;
        let peer_ip = peer.ip().to_canonical();
        if peer_ip.is_ipv4() {
            self.control.pasv().await
        } else {
            let port = self.control.epsv().await?;
            Ok(SocketAddr::new(peer_ip, port))
        }
    }

    async fn open_passive(&mut self) -> Result<TcpStream, FtpCommandError> {
        let addr = self.passive_addr().await?;
        crate::log_msg!("connecting to data address {addr}");
        match tokio::time::timeout(self.config.rw_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(s)) => Ok(s),
            Ok(Err(e)) => Err(FtpCommandError::DataConnectFailed(e)),
            Err(_) => Err(FtpCommandError::DataConnectTimedOut),
        }
    }

    /// Create the listener in a one-shot task, on the control connection local address.
    ///
    /// The accept deadline is fixed as soon as the listener is bound.
    async fn create_listener(&self) -> Result<(TcpListener, Instant), FtpCommandError> {
        let local_ip = self
            .control
            .get_ref()
            .local_addr()
            .map_err(|_| FtpCommandError::NotConnected)?
            .ip();
        let accept_timeout = self.config.rw_timeout;

        let task = tokio::spawn(async move {
            let listener = TcpListener::bind(SocketAddr::new(local_ip, 0)).await?;
            let deadline = Instant::now() + accept_timeout;
            Ok::<_, io::Error>((listener, deadline))
        });
        match task.await {
            Ok(Ok(r)) => Ok(r),
            Ok(Err(e)) => Err(FtpCommandError::ListenFailed(e)),
            Err(e) => Err(FtpCommandError::ListenFailed(io::Error::other(e))),
        }
    }

    async fn open_active(&mut self) -> Result<(TcpListener, Instant), FtpCommandError> {
        let (listener, deadline) = self.create_listener().await?;
        let addr = listener
            .local_addr()
            .map_err(FtpCommandError::ListenFailed)?;
        let addr = SocketAddr::new(addr.ip().to_canonical(), addr.port());
        crate::log_msg!("listening on {addr} for data connection");
        if addr.is_ipv4() {
            self.control.port(addr).await?;
        } else {
            self.control.eprt(addr).await?;
        }
        Ok((listener, deadline))
    }

    /// Set up the data connection for `line`, send it and return the connected stream.
    ///
    /// Exactly one of PASV/EPSV or PORT/EPRT is sent before the transfer command.
    pub(crate) async fn transfer_cmd(&mut self, line: &str) -> Result<FtpStream, FtpCommandError> {
        let tls = self.data_tls_policy();
        if let Some((policy, _)) = &tls {
            if !self.passive && !policy.has_server_identity() {
                return Err(FtpCommandError::TlsServerIdentityMissing);
            }
        }

        let setup = if self.passive {
            DataChannelSetup::Passive(self.open_passive().await?)
        } else {
            let (listener, deadline) = self.open_active().await?;
            DataChannelSetup::Active(listener, deadline)
        };

        self.control.start_transfer(line).await?;

        let stream = match setup {
            DataChannelSetup::Passive(stream) => match tls {
                Some((policy, server_name)) => {
                    tls_client_wrap(&policy, server_name, stream).await?
                }
                None => FtpStream::Plain(stream),
            },
            DataChannelSetup::Active(listener, deadline) => {
                let accepted = tokio::time::timeout_at(deadline, listener.accept()).await;
                drop(listener);
                let stream = match accepted {
                    Ok(Ok((s, peer))) => {
                        crate::log_msg!("accepted data connection from {peer}");
                        s
                    }
                    Ok(Err(e)) => return Err(FtpCommandError::AcceptFailed(e)),
                    Err(_) => return Err(FtpCommandError::AcceptTimedOut),
                };
                match tls {
                    Some((policy, _)) => tls_server_wrap(&policy, stream).await?,
                    None => FtpStream::Plain(stream),
                }
            }
        };
        Ok(stream)
    }
}
