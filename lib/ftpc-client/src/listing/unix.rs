/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use chrono::{DateTime, Datelike, Month, NaiveDate, Utc};

use super::{FtpFileEntry, FtpFileKind, FtpFileMode, ListingFormat};
use crate::error::FtpListingParseError;

pub(super) struct UnixListing;

impl ListingFormat for UnixListing {
    fn parse_line(&self, line: &str) -> Result<FtpFileEntry, FtpListingParseError> {
        parse_line_in_year(line, Utc::now().year())
    }
}

fn parse_perm(mode: &[u8]) -> u32 {
    let mut perm = 0u32;
    for i in 0..3 {
        let shift = 3 * (2 - i);
        if mode[i * 3 + 1] == b'r' {
            perm |= 0o4 << shift;
        }
        if mode[i * 3 + 2] == b'w' {
            perm |= 0o2 << shift;
        }
        if matches!(mode[i * 3 + 3], b'x' | b's') {
            perm |= 0o1 << shift;
        }
    }
    perm
}

/// Parse the `Mon DD HH:MM` or `Mon DD YYYY` columns.
///
/// A time of day means the entry is from `this_year`.
fn parse_datetime(
    month: &str,
    day: &str,
    time_or_year: &str,
    this_year: i32,
) -> Result<DateTime<Utc>, FtpListingParseError> {
    let invalid = || FtpListingParseError::InvalidDateTime(format!("{month} {day} {time_or_year}"));

    let month = Month::from_str(month).map_err(|_| invalid())?;
    let day = u32::from_str(day).map_err(|_| invalid())?;

    let (year, hour, minute) = match time_or_year.split_once(':') {
        Some((h, m)) => {
            let hour = u32::from_str(h).map_err(|_| invalid())?;
            let minute = u32::from_str(m).map_err(|_| invalid())?;
            (this_year, hour, minute)
        }
        None => {
            if time_or_year.len() != 4 {
                return Err(invalid());
            }
            let year = i32::from_str(time_or_year).map_err(|_| invalid())?;
            (year, 0, 0)
        }
    };

    NaiveDate::from_ymd_opt(year, month.number_from_month(), day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(invalid)
}

pub(super) fn parse_line_in_year(
    line: &str,
    this_year: i32,
) -> Result<FtpFileEntry, FtpListingParseError> {
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
    if fields.len() < 9 {
        return Err(FtpListingParseError::UnknownFormat);
    }

    // type char followed by rwxrwxrwx
    let mode_field = fields[0].as_bytes();
    if mode_field.len() < 10 {
        return Err(FtpListingParseError::UnknownFormat);
    }
    let kind = FtpFileKind::from_unix_type_char(mode_field[0]);
    let perm = parse_perm(mode_field);

    let size = u64::from_str(fields[4])
        .map_err(|_| FtpListingParseError::InvalidSize(fields[4].to_string()))?;

    let mtime = parse_datetime(fields[5], fields[6], fields[7], this_year)?;

    Ok(FtpFileEntry {
        name: fields[8..].join(" "),
        size,
        mode: FtpFileMode::new(kind, perm),
        mtime,
        raw: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory() {
        let entry =
            parse_line_in_year("drwxr-xr-x 2 user group 4096 Jan 15 2023 mydir", 2025).unwrap();
        assert_eq!(entry.name(), "mydir");
        assert!(entry.is_dir());
        assert_eq!(entry.size(), 4096);
        assert_eq!(entry.mode().perm(), 0o755);
        assert_eq!(entry.mode().perm() & 0o700, 0o700);
        assert_eq!(entry.mtime().to_rfc3339(), "2023-01-15T00:00:00+00:00");
    }

    #[test]
    fn time_of_day_means_this_year() {
        let entry = parse_line_in_year(
            "-rw-r--r--   1 ftp  ftp   1234 Mar  3 12:30 notes.txt",
            2024,
        )
        .unwrap();
        assert_eq!(entry.mode().kind(), FtpFileKind::File);
        assert_eq!(entry.mode().perm(), 0o644);
        assert_eq!(entry.mtime().to_rfc3339(), "2024-03-03T12:30:00+00:00");
    }

    #[test]
    fn name_with_spaces() {
        let entry = parse_line_in_year(
            "-rw-r--r-- 1 user group 10 Jan 15 2023 my  long file.txt",
            2025,
        )
        .unwrap();
        assert_eq!(entry.name(), "my long file.txt");
    }

    #[test]
    fn kinds() {
        let cases = [
            ("lrwxrwxrwx", FtpFileKind::Symlink),
            ("brw-rw----", FtpFileKind::BlockDevice),
            ("crw-rw-rw-", FtpFileKind::CharDevice),
            ("prw-r--r--", FtpFileKind::NamedPipe),
            ("=rw-r--r--", FtpFileKind::NamedPipe),
            ("srwxr-xr-x", FtpFileKind::Socket),
            ("-rwsr-xr-x", FtpFileKind::File),
        ];
        for (mode, kind) in cases {
            let line = format!("{mode} 1 root root 0 Jan 1 2020 x");
            let entry = parse_line_in_year(&line, 2025).unwrap();
            assert_eq!(entry.mode().kind(), kind);
        }

        let entry = parse_line_in_year("-rwsr-sr-t 1 root root 0 Jan 1 2020 x", 2025).unwrap();
        assert_eq!(entry.mode().perm(), 0o754);
    }

    #[test]
    fn too_few_fields() {
        assert_eq!(
            parse_line_in_year("drwxr-xr-x 2 user group 4096 Jan 15 mydir", 2025),
            Err(FtpListingParseError::UnknownFormat)
        );
    }

    #[test]
    fn short_mode_field() {
        assert_eq!(
            parse_line_in_year("d 2 user group 4096 Jan 15 2023 mydir", 2025),
            Err(FtpListingParseError::UnknownFormat)
        );
    }

    #[test]
    fn hard_errors() {
        assert_eq!(
            parse_line_in_year("-rw-r--r-- 1 user group -1 Jan 15 2023 a", 2025),
            Err(FtpListingParseError::InvalidSize("-1".to_string()))
        );
        assert!(matches!(
            parse_line_in_year("-rw-r--r-- 1 user group 1 Foo 15 2023 a", 2025),
            Err(FtpListingParseError::InvalidDateTime(_))
        ));
        assert!(matches!(
            parse_line_in_year("-rw-r--r-- 1 user group 1 Jan 15 23 a", 2025),
            Err(FtpListingParseError::InvalidDateTime(_))
        ));
        assert!(matches!(
            parse_line_in_year("-rw-r--r-- 1 user group 1 Feb 30 2023 a", 2025),
            Err(FtpListingParseError::InvalidDateTime(_))
        ));
    }
}
