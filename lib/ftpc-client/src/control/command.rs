/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::FtpControlChannel;
use crate::error::FtpCommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtpCommand(&'static str);

impl fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FtpCommand {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

macro_rules! ftp_commands {
    (
        $(
            $(#[$docs:meta])*
            ($konst:ident, $phrase:expr);
        )+
    ) => {
        impl FtpCommand {
        $(
            $(#[$docs])*
            pub const $konst: FtpCommand = FtpCommand($phrase);
        )+
        }
    };
}

ftp_commands! {
    /// a fake command for greeting
    (GREETING, "-");
    (USER, "USER");
    (PASS, "PASS");
    (AUTH, "AUTH");
    (PBSZ, "PBSZ");
    (PROT, "PROT");
    (CWD, "CWD");
    (CDUP, "CDUP");
    (PWD, "PWD");
    (RNFR, "RNFR");
    (RNTO, "RNTO");
    (DELE, "DELE");
    (MKD, "MKD");
    (RMD, "RMD");
    (NOOP, "NOOP");
    (REST, "REST");
    (REIN, "REIN");
    (ABOR, "ABOR");
    (SYST, "SYST");
    (SIZE, "SIZE");
    (TYPE, "TYPE");
    (OPTS, "OPTS");
    (FEAT, "FEAT");
    (PASV, "PASV");
    (EPSV, "EPSV");
    (PORT, "PORT");
    (EPRT, "EPRT");
    (LIST, "LIST");
    (NLST, "NLST");
    (RETR, "RETR");
    (STOR, "STOR");
    (QUIT, "QUIT");
}

/// Get the verb of a raw command line, used to label errors.
pub(crate) fn command_verb(line: &str) -> &str {
    line.split_ascii_whitespace().next().unwrap_or(line)
}

fn check_line_param(s: &str) -> Result<(), FtpCommandError> {
    if memchr::memchr2(b'\r', b'\n', s.as_bytes()).is_some() {
        Err(FtpCommandError::InvalidParameter(s.to_string()))
    } else {
        Ok(())
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn send_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.log_raw_io {
            let line = String::from_utf8_lossy(buf);
            crate::debug::log_cmd(line.trim_end());
        }

        self.stream.write_all(buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn timed_send_all(&mut self, buf: &[u8], name: &str) -> Result<(), FtpCommandError> {
        match tokio::time::timeout(self.rw_timeout, self.send_all(buf)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(FtpCommandError::SendFailed(e)),
            Err(_) => Err(FtpCommandError::SendTimedOut(name.to_string())),
        }
    }

    pub(crate) async fn send_cmd(&mut self, cmd: FtpCommand) -> Result<(), FtpCommandError> {
        let len = cmd.0.len() + 2;
        let mut buf: Vec<u8> = Vec::with_capacity(len);
        buf.extend_from_slice(cmd.0.as_bytes());
        buf.extend_from_slice(b"\r\n");

        self.timed_send_all(buf.as_ref(), cmd.0).await
    }

    pub(crate) async fn send_cmd1(
        &mut self,
        cmd: FtpCommand,
        param1: &str,
    ) -> Result<(), FtpCommandError> {
        check_line_param(param1)?;
        let len = cmd.0.len() + 1 + param1.len() + 2;
        let mut buf: Vec<u8> = Vec::with_capacity(len);
        buf.extend_from_slice(cmd.0.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(param1.as_bytes());
        buf.extend_from_slice(b"\r\n");

        self.timed_send_all(buf.as_ref(), cmd.0).await
    }

    /// Send a caller formatted command line, without the line terminator.
    pub(crate) async fn send_line(&mut self, line: &str) -> Result<(), FtpCommandError> {
        check_line_param(line)?;
        let len = line.len() + 2;
        let mut buf: Vec<u8> = Vec::with_capacity(len);
        buf.extend_from_slice(line.as_bytes());
        buf.extend_from_slice(b"\r\n");

        self.timed_send_all(buf.as_ref(), command_verb(line)).await
    }
}
