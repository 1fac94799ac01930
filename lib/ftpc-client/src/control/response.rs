/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use super::FtpControlChannel;
use crate::error::FtpRawResponseError;
use crate::io::LimitedBufReadExt;
use crate::reply::FtpReply;

fn parse_reply_code(line: &[u8]) -> Result<u16, FtpRawResponseError> {
    if line.len() < 3 || !line[..3].iter().all(|c| c.is_ascii_digit()) {
        return Err(FtpRawResponseError::InvalidLineFormat);
    }
    let code = (line[0] - b'0') as u16 * 100 + (line[1] - b'0') as u16 * 10 + (line[2] - b'0') as u16;
    if !(100..600).contains(&code) {
        return Err(FtpRawResponseError::InvalidReplyCode(code));
    }
    Ok(code)
}

fn line_to_str(line: &[u8]) -> Result<&str, FtpRawResponseError> {
    let s = std::str::from_utf8(line).map_err(|_| FtpRawResponseError::LineIsNotUtf8)?;
    Ok(s.trim_end_matches(['\r', '\n']))
}

pub(super) struct FtpMultiLineReplyParser {
    code: u16,
    prefix: [u8; 3],
    message: String,
    lines: Vec<String>,
}

impl FtpMultiLineReplyParser {
    pub(super) fn new(first_line: &[u8], code: u16) -> Result<Self, FtpRawResponseError> {
        let line = line_to_str(first_line)?;
        Ok(FtpMultiLineReplyParser {
            code,
            prefix: [first_line[0], first_line[1], first_line[2]],
            message: line[4..].to_string(),
            lines: vec![line.to_string()],
        })
    }

    /// Feed a continuation line, returns true if it ends the reply.
    pub(super) fn feed_line(&mut self, line: &[u8]) -> Result<bool, FtpRawResponseError> {
        let s = line_to_str(line)?;
        self.message.push('\n');

        let has_code = line.len() >= 4 && line.starts_with(&self.prefix);
        if has_code && line[3] == b' ' {
            self.message.push_str(&s[4..]);
            self.lines.push(s.to_string());
            Ok(true)
        } else {
            if has_code && line[3] == b'-' {
                self.message.push_str(&s[4..]);
            } else {
                // do not trim whitespace at beginning
                self.message.push_str(s);
            }
            self.lines.push(s.to_string());
            Ok(false)
        }
    }

    pub(super) fn finish(self) -> FtpReply {
        FtpReply::new(self.code, self.message, self.lines)
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn read_line(
        &mut self,
        buf: &mut Vec<u8>,
        min_len: usize,
    ) -> Result<(), FtpRawResponseError> {
        buf.clear();

        let (found, len) = self
            .stream
            .limited_read_until(b'\n', self.control.max_line_len, buf)
            .await
            .map_err(FtpRawResponseError::ReadFailed)?;
        if len == 0 {
            return Err(FtpRawResponseError::ConnectionClosed);
        }

        if self.log_raw_io {
            crate::debug::log_rsp(String::from_utf8_lossy(buf).trim_end());
        }

        if !found {
            if len >= self.control.max_line_len {
                Err(FtpRawResponseError::LineTooLong)
            } else {
                Err(FtpRawResponseError::ConnectionClosed)
            }
        } else if len < min_len {
            Err(FtpRawResponseError::InvalidLineFormat)
        } else {
            Ok(())
        }
    }

    pub(crate) async fn read_reply(&mut self) -> Result<FtpReply, FtpRawResponseError> {
        let mut buf = Vec::<u8>::with_capacity(self.control.max_line_len);
        // at least <code>\n
        self.read_line(&mut buf, 4).await?;
        let code = parse_reply_code(&buf)?;

        match buf[3] {
            b' ' | b'\r' | b'\n' => {
                let line = line_to_str(&buf)?;
                let message = line.get(4..).unwrap_or_default().to_string();
                Ok(FtpReply::new(code, message, vec![line.to_string()]))
            }
            b'-' => {
                let mut ml_parser = FtpMultiLineReplyParser::new(&buf, code)?;
                for _i in 0..self.control.max_multi_lines {
                    self.read_line(&mut buf, 1).await?;
                    if ml_parser.feed_line(&buf)? {
                        return Ok(ml_parser.finish());
                    }
                }
                Err(FtpRawResponseError::TooManyLines)
            }
            _ => Err(FtpRawResponseError::InvalidLineFormat),
        }
    }

    pub(crate) async fn timed_read_reply(
        &mut self,
        stage: &'static str,
    ) -> Result<FtpReply, FtpRawResponseError> {
        self.read_reply_with_timeout(self.rw_timeout, stage).await
    }

    pub(crate) async fn read_reply_with_timeout(
        &mut self,
        timeout: Duration,
        stage: &'static str,
    ) -> Result<FtpReply, FtpRawResponseError> {
        match tokio::time::timeout(timeout, self.read_reply()).await {
            Ok(r) => r,
            Err(_) => Err(FtpRawResponseError::ReadResponseTimedOut(stage)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FtpClientConfig;

    fn new_channel(mock: tokio_test::io::Mock) -> FtpControlChannel<tokio_test::io::Mock> {
        FtpControlChannel::new(mock, &FtpClientConfig::default())
    }

    #[tokio::test]
    async fn single_line() {
        let mock = tokio_test::io::Builder::new()
            .read(b"220 Service ready for new user.\r\n")
            .build();
        let mut channel = new_channel(mock);
        let reply = channel.read_reply().await.unwrap();
        assert_eq!(reply.code(), 220);
        assert_eq!(reply.message(), "Service ready for new user.");
        assert!(!reply.is_multi_line());
    }

    #[tokio::test]
    async fn code_only() {
        let mock = tokio_test::io::Builder::new().read(b"200\r\n").build();
        let mut channel = new_channel(mock);
        let reply = channel.read_reply().await.unwrap();
        assert_eq!(reply.code(), 200);
        assert_eq!(reply.message(), "");
    }

    #[tokio::test]
    async fn multi_line() {
        let mock = tokio_test::io::Builder::new()
            .read(b"211-Features:\r\n")
            .read(b" EPSV\r\n SIZE\r\n")
            .read(b"211-UTF8\r\n211 End\r\n")
            .build();
        let mut channel = new_channel(mock);
        let reply = channel.read_reply().await.unwrap();
        assert_eq!(reply.code(), 211);
        assert_eq!(reply.message(), "Features:\n EPSV\n SIZE\nUTF8\nEnd");
        assert_eq!(reply.lines().len(), 5);
        assert_eq!(reply.lines()[1], " EPSV");
        assert_eq!(reply.lines()[4], "211 End");
    }

    #[tokio::test]
    async fn multi_line_other_code_inside() {
        let mock = tokio_test::io::Builder::new()
            .read(b"230-Welcome\r\n220 not the end\r\n230 Logged in\r\n")
            .build();
        let mut channel = new_channel(mock);
        let reply = channel.read_reply().await.unwrap();
        assert_eq!(reply.code(), 230);
        assert_eq!(reply.message(), "Welcome\n220 not the end\nLogged in");
    }

    #[tokio::test]
    async fn invalid_code() {
        let mock = tokio_test::io::Builder::new().read(b"abc hello\r\n").build();
        let mut channel = new_channel(mock);
        assert!(matches!(
            channel.read_reply().await,
            Err(FtpRawResponseError::InvalidLineFormat)
        ));

        let mock = tokio_test::io::Builder::new().read(b"999 hello\r\n").build();
        let mut channel = new_channel(mock);
        assert!(matches!(
            channel.read_reply().await,
            Err(FtpRawResponseError::InvalidReplyCode(999))
        ));
    }

    #[tokio::test]
    async fn closed() {
        let mock = tokio_test::io::Builder::new().build();
        let mut channel = new_channel(mock);
        assert!(matches!(
            channel.read_reply().await,
            Err(FtpRawResponseError::ConnectionClosed)
        ));

        let mock = tokio_test::io::Builder::new().read(b"220 partial").build();
        let mut channel = new_channel(mock);
        assert!(matches!(
            channel.read_reply().await,
            Err(FtpRawResponseError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn too_many_lines() {
        let mut config = FtpClientConfig::default();
        let mut control = config.control;
        control.set_max_multi_lines(2);
        config.set_control(control);

        let mock = tokio_test::io::Builder::new()
            .read(b"211-a\r\n b\r\n c\r\n211 End\r\n")
            .build();
        let mut channel = FtpControlChannel::new(mock, &config);
        assert!(matches!(
            channel.read_reply().await,
            Err(FtpRawResponseError::TooManyLines)
        ));
    }
}
