/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod limited_read;
pub(crate) use limited_read::LimitedBufReadExt;

mod timed;
pub use timed::TimedStream;
