/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FtpReplyParseError;

static PASV_227_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+),([0-9]+),([0-9]+),([0-9]+),([0-9]+),([0-9]+)")
        .expect("static 227 pattern")
});
static EPSV_229_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\|\|([0-9]+)\|").expect("static 229 pattern"));

/// A complete server reply, single or multi line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpReply {
    code: u16,
    message: String,
    lines: Vec<String>,
}

impl FtpReply {
    pub(crate) fn new(code: u16, message: String, lines: Vec<String>) -> Self {
        FtpReply {
            code,
            message,
            lines,
        }
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The reply text with the code prefixes removed, lines joined by '\n'.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The raw reply lines as received, without line terminators.
    #[inline]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[inline]
    pub fn is_multi_line(&self) -> bool {
        self.lines.len() > 1
    }

    pub fn into_message(self) -> String {
        self.message
    }

    pub fn raw_text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn parse_pasv_227(&self) -> Result<SocketAddr, FtpReplyParseError> {
        decode_pasv_227(&self.message)
    }

    pub fn parse_epsv_229(&self) -> Result<u16, FtpReplyParseError> {
        decode_epsv_229(&self.message)
    }

    pub fn parse_quoted_path_257(&self) -> Result<String, FtpReplyParseError> {
        decode_quoted_path_257(&self.message).map(|s| s.to_string())
    }

    pub fn parse_size_213(&self) -> Result<u64, FtpReplyParseError> {
        decode_size_213(&self.message)
    }
}

/// Decode the `(h1,h2,h3,h4,p1,p2)` payload of a PASV reply.
///
/// The port is `p1 * 256 + p2`.
pub fn decode_pasv_227(msg: &str) -> Result<SocketAddr, FtpReplyParseError> {
    let Some(caps) = PASV_227_PATTERN.captures(msg) else {
        return Err(FtpReplyParseError::NoAddressPattern(msg.to_string()));
    };

    let mut nums = [0u8; 6];
    for (i, v) in nums.iter_mut().enumerate() {
        let s = &caps[i + 1];
        *v = u8::from_str(s).map_err(|_| FtpReplyParseError::InvalidAddressNumber(s.to_string()))?;
    }

    let ip = Ipv4Addr::new(nums[0], nums[1], nums[2], nums[3]);
    let port = ((nums[4] as u16) << 8) + (nums[5] as u16);
    Ok(SocketAddr::new(IpAddr::V4(ip), port))
}

/// Decode the `(|||port|)` payload of an EPSV reply.
///
/// The host is not part of the reply, the control connection peer address should be used.
pub fn decode_epsv_229(msg: &str) -> Result<u16, FtpReplyParseError> {
    let Some(caps) = EPSV_229_PATTERN.captures(msg) else {
        return Err(FtpReplyParseError::NoAddressPattern(msg.to_string()));
    };
    let s = &caps[1];
    u16::from_str(s).map_err(|_| FtpReplyParseError::InvalidAddressNumber(s.to_string()))
}

/// Get the text strictly between the first and the last double quote.
pub fn decode_quoted_path_257(msg: &str) -> Result<&str, FtpReplyParseError> {
    let bytes = msg.as_bytes();
    let start = memchr::memchr(b'"', bytes);
    let end = memchr::memrchr(b'"', bytes);
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&msg[start + 1..end]),
        _ => Err(FtpReplyParseError::NoQuotedPath(msg.to_string())),
    }
}

pub fn decode_size_213(msg: &str) -> Result<u64, FtpReplyParseError> {
    let s = msg.trim();
    u64::from_str(s).map_err(|_| FtpReplyParseError::InvalidInteger(s.to_string()))
}
