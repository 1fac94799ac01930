/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub(crate) trait LimitedBufReadExt: AsyncBufRead {
    /// Read until `delimiter` is found or `max_len` bytes have been appended to `buf`.
    ///
    /// Returns whether the delimiter was found and the number of bytes read.
    async fn limited_read_until(
        &mut self,
        delimiter: u8,
        max_len: usize,
        buf: &mut Vec<u8>,
    ) -> io::Result<(bool, usize)>
    where
        Self: Unpin,
    {
        let mut nr = 0usize;
        while nr < max_len {
            let available = self.fill_buf().await?;
            if available.is_empty() {
                return Ok((false, nr));
            }

            let left = max_len - nr;
            let search = if available.len() > left {
                &available[..left]
            } else {
                available
            };
            match memchr::memchr(delimiter, search) {
                Some(p) => {
                    buf.extend_from_slice(&search[..=p]);
                    self.consume(p + 1);
                    return Ok((true, nr + p + 1));
                }
                None => {
                    let len = search.len();
                    buf.extend_from_slice(search);
                    self.consume(len);
                    nr += len;
                }
            }
        }
        Ok((false, nr))
    }
}

impl<R: AsyncBufRead + ?Sized> LimitedBufReadExt for R {}
