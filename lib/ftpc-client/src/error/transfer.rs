/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::FtpCommandError;

#[derive(Debug, Error)]
pub enum FtpTransferError {
    #[error("transfer setup failed: {0}")]
    Setup(#[from] FtpCommandError),
    #[error("data connection io failed: {0:?}")]
    Io(io::Error),
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },
    #[error("local file error: {0:?}")]
    LocalFile(io::Error),
    #[error("line too long in listing at line {0}")]
    ListLineTooLong(usize),
    #[error("too many lines in listing")]
    ListTooManyLines,
    #[error("data connection close failed: {close:?}")]
    CloseFailed {
        close: io::Error,
        reply: Option<FtpCommandError>,
    },
    #[error("end of transfer reply failed: {0}")]
    EndReplyFailed(FtpCommandError),
}

impl FtpTransferError {
    /// The reply code the server sent if the transfer was rejected or failed on its side.
    pub fn reply_code(&self) -> Option<u16> {
        match self {
            FtpTransferError::Setup(e) => e.reply_code(),
            FtpTransferError::EndReplyFailed(e) => e.reply_code(),
            FtpTransferError::CloseFailed { reply: Some(e), .. } => e.reply_code(),
            _ => None,
        }
    }
}
