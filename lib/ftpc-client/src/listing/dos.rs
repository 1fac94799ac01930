/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};

use super::{FtpFileEntry, FtpFileKind, FtpFileMode, ListingFormat};
use crate::error::FtpListingParseError;

const DATETIME_LEN: usize = 17;
const DATETIME_FORMATS: [&str; 2] = ["%m-%d-%y  %I:%M%p", "%Y-%m-%d  %H:%M"];
const DIR_MARKER: &str = "<DIR>";

pub(super) struct DosListing;

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

impl ListingFormat for DosListing {
    fn parse_line(&self, line: &str) -> Result<FtpFileEntry, FtpListingParseError> {
        let Some(datetime) = line.get(..DATETIME_LEN) else {
            return Err(FtpListingParseError::UnknownFormat);
        };
        let Some(mtime) = parse_datetime(datetime) else {
            return Err(FtpListingParseError::UnknownFormat);
        };

        let left = line[DATETIME_LEN..].trim_start_matches(' ');
        let (kind, size, left) = if let Some(left) = left.strip_prefix(DIR_MARKER) {
            (FtpFileKind::Directory, 0, left)
        } else {
            let Some((size, left)) = left.split_once(' ') else {
                return Err(FtpListingParseError::UnknownFormat);
            };
            let size = u64::from_str(size)
                .map_err(|_| FtpListingParseError::InvalidSize(size.to_string()))?;
            (FtpFileKind::File, size, left)
        };

        Ok(FtpFileEntry {
            name: left.trim_start_matches(' ').to_string(),
            size,
            mode: FtpFileMode::new(kind, 0),
            mtime,
            raw: line.to_string(),
        })
    }
}
