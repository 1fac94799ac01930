/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FtpReplyParseError {
    #[error("no matching address pattern in message: {0}")]
    NoAddressPattern(String),
    #[error("invalid number {0} in address")]
    InvalidAddressNumber(String),
    #[error("no quoted path in message: {0}")]
    NoQuotedPath(String),
    #[error("invalid integer payload: {0}")]
    InvalidInteger(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FtpListingParseError {
    #[error("unknown format")]
    UnknownFormat,
    #[error("invalid size field {0}")]
    InvalidSize(String),
    #[error("invalid date time: {0}")]
    InvalidDateTime(String),
}

impl FtpListingParseError {
    /// Whether the line was not recognised at all, as opposed to recognised but malformed.
    pub fn is_unknown_format(&self) -> bool {
        matches!(self, FtpListingParseError::UnknownFormat)
    }
}
