/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FtpRawResponseError {
    #[error("read failed: {0:?}")]
    ReadFailed(#[from] io::Error),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("invalid line format")]
    InvalidLineFormat,
    #[error("line too long")]
    LineTooLong,
    #[error("too many lines")]
    TooManyLines,
    #[error("invalid reply code {0}")]
    InvalidReplyCode(u16),
    #[error("line is not utf-8")]
    LineIsNotUtf8,
    #[error("timed out to read response at stage {0}")]
    ReadResponseTimedOut(&'static str),
}
