/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::{FtpSession, FtpTransfer};
use crate::config::FtpTransferConfig;
use crate::error::FtpTransferError;
use crate::io::LimitedBufReadExt;
use crate::listing::{FtpFileEntry, parse_list_line};

async fn read_lines<R>(
    reader: &mut R,
    config: &FtpTransferConfig,
) -> Result<Vec<String>, FtpTransferError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut buf = Vec::with_capacity(config.list_max_line_len);
    loop {
        buf.clear();
        let (found, len) = reader
            .limited_read_until(b'\n', config.list_max_line_len, &mut buf)
            .await
            .map_err(FtpTransferError::Io)?;
        if len == 0 {
            break;
        }
        if !found && len >= config.list_max_line_len {
            return Err(FtpTransferError::ListLineTooLong(lines.len() + 1));
        }
        if lines.len() >= config.list_max_entries {
            return Err(FtpTransferError::ListTooManyLines);
        }

        // decoded per line, invalid bytes become U+FFFD
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        if !found {
            break;
        }
    }
    Ok(lines)
}

/// Copy until EOF, returns the number of bytes copied.
///
/// A write accepting no bytes at all is a short write.
async fn copy_stream<R, W>(
    reader: &mut R,
    writer: &mut W,
    buf_size: usize,
    read_error: fn(io::Error) -> FtpTransferError,
    write_error: fn(io::Error) -> FtpTransferError,
) -> Result<u64, FtpTransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buf_size];
    let mut total = 0u64;
    loop {
        let nr = reader.read(&mut buf).await.map_err(read_error)?;
        if nr == 0 {
            break;
        }

        let mut written = 0;
        while written < nr {
            let nw = writer
                .write(&buf[written..nr])
                .await
                .map_err(write_error)?;
            if nw == 0 {
                return Err(FtpTransferError::ShortWrite {
                    expected: nr,
                    written,
                });
            }
            written += nw;
        }
        total += nr as u64;
    }
    writer.flush().await.map_err(write_error)?;
    Ok(total)
}

/// Close the transfer in any case, a copy error takes precedence over a close error.
async fn finish<T>(
    transfer: FtpTransfer<'_>,
    result: Result<T, FtpTransferError>,
) -> Result<T, FtpTransferError> {
    let close_result = transfer.close().await;
    let v = result?;
    close_result?;
    Ok(v)
}

fn parse_entries(lines: &[String]) -> Vec<FtpFileEntry> {
    lines
        .iter()
        .filter_map(|line| match parse_list_line(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                if !e.is_unknown_format() {
                    crate::log_msg!("skipped listing line {line:?}: {e}");
                }
                None
            }
        })
        .collect()
}

async fn read_all_lines(
    mut transfer: FtpTransfer<'_>,
    config: &FtpTransferConfig,
) -> Result<Vec<String>, FtpTransferError> {
    let result = {
        let mut reader = BufReader::new(&mut transfer);
        read_lines(&mut reader, config).await
    };
    finish(transfer, result).await
}

impl FtpSession {
    /// LIST, returns the raw lines.
    pub async fn list(&mut self, args: &[&str]) -> Result<Vec<String>, FtpTransferError> {
        let config = self.config.transfer;
        let transfer = self.list_request(args).await?;
        read_all_lines(transfer, &config).await
    }

    /// NLST, returns the names.
    pub async fn nlst(&mut self, args: &[&str]) -> Result<Vec<String>, FtpTransferError> {
        let config = self.config.transfer;
        let transfer = self.nlst_request(args).await?;
        read_all_lines(transfer, &config).await
    }

    /// LIST, returns the entries that could be parsed.
    pub async fn dir(&mut self, args: &[&str]) -> Result<Vec<FtpFileEntry>, FtpTransferError> {
        let lines = self.list(args).await?;
        Ok(parse_entries(&lines))
    }

    /// Retrieve a remote file into `writer`, returns the number of bytes received.
    pub async fn retrieve_to<W>(&mut self, path: &str, writer: &mut W) -> Result<u64, FtpTransferError>
    where
        W: AsyncWrite + Unpin,
    {
        let buf_size = self.config.transfer.copy_buffer_size;
        let mut transfer = self.retr_request(path).await?;
        let result = copy_stream(
            &mut transfer,
            writer,
            buf_size,
            FtpTransferError::Io,
            FtpTransferError::LocalFile,
        )
        .await;
        finish(transfer, result).await
    }

    /// Store everything read from `reader` as a remote file, returns the number of bytes sent.
    pub async fn store_from<R>(&mut self, path: &str, reader: &mut R) -> Result<u64, FtpTransferError>
    where
        R: AsyncRead + Unpin,
    {
        let buf_size = self.config.transfer.copy_buffer_size;
        let mut transfer = self.stor_request(path).await?;
        let result = copy_stream(
            reader,
            &mut transfer,
            buf_size,
            FtpTransferError::LocalFile,
            FtpTransferError::Io,
        )
        .await;
        finish(transfer, result).await
    }

    pub async fn retrieve_file<P: AsRef<Path>>(
        &mut self,
        remote: &str,
        local: P,
    ) -> Result<u64, FtpTransferError> {
        let buf_size = self.config.transfer.copy_buffer_size;
        let mut transfer = self.retr_request(remote).await?;
        let result = match File::create(local.as_ref()).await {
            Ok(mut file) => {
                copy_stream(
                    &mut transfer,
                    &mut file,
                    buf_size,
                    FtpTransferError::Io,
                    FtpTransferError::LocalFile,
                )
                .await
            }
            Err(e) => Err(FtpTransferError::LocalFile(e)),
        };
        finish(transfer, result).await
    }

    pub async fn store_file<P: AsRef<Path>>(
        &mut self,
        local: P,
        remote: &str,
    ) -> Result<u64, FtpTransferError> {
        let mut file = File::open(local.as_ref())
            .await
            .map_err(FtpTransferError::LocalFile)?;
        self.store_from(remote, &mut file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn lines() {
        let mock = Builder::new()
            .read(b"a.txt\r\nb")
            .read(b".txt\r\n\r\nlast")
            .build();
        let mut reader = BufReader::new(mock);
        let lines = read_lines(&mut reader, &FtpTransferConfig::default())
            .await
            .unwrap();
        assert_eq!(lines, vec!["a.txt", "b.txt", "", "last"]);
    }

    #[tokio::test]
    async fn non_utf8_name() {
        let mock = Builder::new()
            .read(b"drwxr-xr-x 2 user group 4096 Jan 15 2023 mydir\r\n")
            .read(b"-rw-r--r-- 1 user group 10 Jan 15 2023 caf\xe9.txt\r\n")
            .read(b"-rw-r--r-- 1 user group 20 Jan 15 2023 ok.txt\r\n")
            .build();
        let mut reader = BufReader::new(mock);
        let lines = read_lines(&mut reader, &FtpTransferConfig::default())
            .await
            .unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with("caf\u{fffd}.txt"));

        let entries = parse_entries(&lines);
        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["mydir", "caf\u{fffd}.txt", "ok.txt"]);
        assert_eq!(entries[2].size(), 20);
    }

    #[test]
    fn unparsable_lines_skipped() {
        let lines = vec![
            "total 3".to_string(),
            "-rw-r--r-- 1 user group 10 Jan 15 2023 a.txt".to_string(),
            "-rw-r--r-- 1 user group xx Jan 15 2023 bad.txt".to_string(),
            "01-15-23  03:04PM       77 dos.txt".to_string(),
        ];
        let entries = parse_entries(&lines);
        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["a.txt", "dos.txt"]);
    }

    #[tokio::test]
    async fn line_limits() {
        let mut config = FtpTransferConfig::default();
        config.set_list_max_line_len(8);
        let mock = Builder::new().read(b"short\r\nsomething long\r\n").build();
        let mut reader = BufReader::new(mock);
        assert!(matches!(
            read_lines(&mut reader, &config).await,
            Err(FtpTransferError::ListLineTooLong(2))
        ));

        let mut config = FtpTransferConfig::default();
        config.set_list_max_entries(2);
        let mock = Builder::new().read(b"a\nb\nc\n").build();
        let mut reader = BufReader::new(mock);
        assert!(matches!(
            read_lines(&mut reader, &config).await,
            Err(FtpTransferError::ListTooManyLines)
        ));
    }

    #[tokio::test]
    async fn copy_all() {
        let mut reader = Builder::new().read(b"hello ").read(b"world").build();
        let mut writer = Builder::new().write(b"hello ").write(b"world").build();
        let n = copy_stream(
            &mut reader,
            &mut writer,
            1024,
            FtpTransferError::Io,
            FtpTransferError::LocalFile,
        )
        .await
        .unwrap();
        assert_eq!(n, 11);
    }

    struct ZeroWriter;

    impl AsyncWrite for ZeroWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<io::Result<usize>> {
            std::task::Poll::Ready(Ok(0))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn short_write() {
        let mut reader = Builder::new().read(b"data").build();
        let r = copy_stream(
            &mut reader,
            &mut ZeroWriter,
            1024,
            FtpTransferError::Io,
            FtpTransferError::LocalFile,
        )
        .await;
        assert!(matches!(
            r,
            Err(FtpTransferError::ShortWrite {
                expected: 4,
                written: 0
            })
        ));
    }
}
