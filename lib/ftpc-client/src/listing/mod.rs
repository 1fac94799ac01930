/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::FtpListingParseError;

mod kind;
pub use kind::{FtpFileKind, FtpFileMode};

mod dos;
mod unix;

/// One entry of a LIST reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpFileEntry {
    name: String,
    size: u64,
    mode: FtpFileMode,
    mtime: DateTime<Utc>,
    raw: String,
}

impl FtpFileEntry {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn mode(&self) -> FtpFileMode {
        self.mode
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    #[inline]
    pub fn mtime(&self) -> &DateTime<Utc> {
        &self.mtime
    }

    /// The listing line this entry was parsed from.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Serialize for FtpFileEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("FtpFileEntry", 4)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("size", &self.size)?;
        s.serialize_field("dir", &self.is_dir())?;
        s.serialize_field(
            "modTime",
            &self.mtime.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        s.end()
    }
}

/// A directory listing dialect.
trait ListingFormat: Sync {
    /// Parse one line, `UnknownFormat` lets the next dialect have a try.
    fn parse_line(&self, line: &str) -> Result<FtpFileEntry, FtpListingParseError>;
}

static LISTING_FORMATS: [&dyn ListingFormat; 2] = [&unix::UnixListing, &dos::DosListing];

/// Parse one line of a LIST reply, trying the Unix `ls -l` dialect first and then the DOS one.
pub fn parse_list_line(line: &str) -> Result<FtpFileEntry, FtpListingParseError> {
    for format in LISTING_FORMATS {
        match format.parse_line(line) {
            Err(FtpListingParseError::UnknownFormat) => continue,
            r => return r,
        }
    }
    Err(FtpListingParseError::UnknownFormat)
}
