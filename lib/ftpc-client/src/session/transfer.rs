/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use super::FtpSession;
use crate::control::{FtpCommand, FtpControlChannel, command_verb};
use crate::error::{FtpCommandError, FtpTransferError};
use crate::io::TimedStream;
use crate::reply::FtpReply;
use crate::stream::FtpStream;

/// An open data connection.
///
/// It holds the session borrowed until [`FtpTransfer::close`] is called, which reads the
/// final reply of the transfer from the control connection. Dropping it without closing
/// leaves that reply unread.
pub struct FtpTransfer<'a> {
    session: &'a mut FtpSession,
    stream: TimedStream<FtpStream>,
    command: String,
}

impl FtpSession {
    /// Open a data connection for any transfer command line, e.g. `APPE a.log`.
    pub async fn transfer_request(&mut self, line: &str) -> Result<FtpTransfer<'_>, FtpCommandError> {
        let stream = self.transfer_cmd(line).await?;
        let timeout = self.config.rw_timeout;
        Ok(FtpTransfer {
            command: command_verb(line).to_string(),
            session: self,
            stream: TimedStream::new(stream, timeout),
        })
    }

    pub async fn list_request(&mut self, args: &[&str]) -> Result<FtpTransfer<'_>, FtpCommandError> {
        let line = command_line(FtpCommand::LIST, args);
        self.transfer_request(&line).await
    }

    pub async fn nlst_request(&mut self, args: &[&str]) -> Result<FtpTransfer<'_>, FtpCommandError> {
        let line = command_line(FtpCommand::NLST, args);
        self.transfer_request(&line).await
    }

    pub async fn retr_request(&mut self, path: &str) -> Result<FtpTransfer<'_>, FtpCommandError> {
        let line = command_line(FtpCommand::RETR, &[path]);
        self.transfer_request(&line).await
    }

    pub async fn stor_request(&mut self, path: &str) -> Result<FtpTransfer<'_>, FtpCommandError> {
        let line = command_line(FtpCommand::STOR, &[path]);
        self.transfer_request(&line).await
    }
}

fn command_line(cmd: FtpCommand, args: &[&str]) -> String {
    let mut line = cmd.as_str().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

impl FtpTransfer<'_> {
    #[inline]
    pub fn is_tls(&self) -> bool {
        self.stream.get_ref().is_tls()
    }

    /// Close the data connection and wait for the final transfer reply.
    ///
    /// If closing the socket fails, the error of reading the final reply, if any, is
    /// also returned.
    pub async fn close(self) -> Result<FtpReply, FtpTransferError> {
        let FtpTransfer {
            session,
            stream,
            command,
        } = self;
        close_transfer(stream, &mut session.control, &command).await
    }
}

async fn close_transfer<S, T>(
    mut stream: S,
    control: &mut FtpControlChannel<T>,
    command: &str,
) -> Result<FtpReply, FtpTransferError>
where
    S: AsyncWrite + Unpin,
    T: AsyncRead + AsyncWrite + Unpin,
{
    let close_result = stream.shutdown().await;
    drop(stream);
    let reply_result = control.wait_transfer_end(command).await;

    match (close_result, reply_result) {
        (Err(close), reply) => Err(FtpTransferError::CloseFailed {
            close,
            reply: reply.err(),
        }),
        (Ok(_), Err(e)) => Err(FtpTransferError::EndReplyFailed(e)),
        (Ok(_), Ok(reply)) => Ok(reply),
    }
}

impl AsyncRead for FtpTransfer<'_> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for FtpTransfer<'_> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
