/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpFileKind {
    File,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    NamedPipe,
    Socket,
}

impl fmt::Display for FtpFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FtpFileKind {
    /// Get the kind from the leading type character of an `ls -l` mode field.
    pub(super) fn from_unix_type_char(c: u8) -> Self {
        match c {
            b'd' => FtpFileKind::Directory,
            b'l' => FtpFileKind::Symlink,
            b'b' => FtpFileKind::BlockDevice,
            b'c' => FtpFileKind::CharDevice,
            b'p' | b'=' => FtpFileKind::NamedPipe,
            b's' => FtpFileKind::Socket,
            _ => FtpFileKind::File,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FtpFileKind::File => "file",
            FtpFileKind::Directory => "dir",
            FtpFileKind::Symlink => "symlink",
            FtpFileKind::BlockDevice => "block",
            FtpFileKind::CharDevice => "char",
            FtpFileKind::NamedPipe => "pipe",
            FtpFileKind::Socket => "socket",
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(self, FtpFileKind::Directory)
    }
}

/// Entry kind plus the `rwxrwxrwx` permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtpFileMode {
    kind: FtpFileKind,
    perm: u32,
}

impl FtpFileMode {
    pub(super) fn new(kind: FtpFileKind, perm: u32) -> Self {
        FtpFileMode { kind, perm }
    }

    #[inline]
    pub fn kind(&self) -> FtpFileKind {
        self.kind
    }

    /// The permission bits, in the 0o777 range.
    #[inline]
    pub fn perm(&self) -> u32 {
        self.perm
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

impl fmt::Display for FtpFileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = match self.kind {
            FtpFileKind::File => '-',
            FtpFileKind::Directory => 'd',
            FtpFileKind::Symlink => 'l',
            FtpFileKind::BlockDevice => 'b',
            FtpFileKind::CharDevice => 'c',
            FtpFileKind::NamedPipe => 'p',
            FtpFileKind::Socket => 's',
        };
        write!(f, "{t}")?;
        for shift in [6, 3, 0] {
            let bits = (self.perm >> shift) & 0o7;
            let r = if bits & 0o4 != 0 { 'r' } else { '-' };
            let w = if bits & 0o2 != 0 { 'w' } else { '-' };
            let x = if bits & 0o1 != 0 { 'x' } else { '-' };
            write!(f, "{r}{w}{x}")?;
        }
        Ok(())
    }
}
