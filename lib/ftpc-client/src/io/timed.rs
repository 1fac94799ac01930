/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

/// A stream wrapper that bounds every single read and write operation with a timeout.
///
/// The timer starts when an operation first returns pending and is reset once the
/// operation completes, so idle time between operations is not counted.
pub struct TimedStream<S> {
    inner: S,
    timeout: Duration,
    read_timer: Option<Pin<Box<Sleep>>>,
    write_timer: Option<Pin<Box<Sleep>>>,
}

impl<S> TimedStream<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        TimedStream {
            inner,
            timeout,
            read_timer: None,
            write_timer: None,
        }
    }

    #[inline]
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn poll_timer(
        timer: &mut Option<Pin<Box<Sleep>>>,
        timeout: Duration,
        cx: &mut Context<'_>,
        action: &'static str,
    ) -> Poll<io::Error> {
        let sleep = timer.get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
        ready!(sleep.as_mut().poll(cx));
        *timer = None;
        Poll::Ready(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("data connection {action} timed out"),
        ))
    }
}

impl<S> AsyncRead for TimedStream<S>
where
    S: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(r) => {
                this.read_timer = None;
                Poll::Ready(r)
            }
            Poll::Pending => {
                let e = ready!(Self::poll_timer(
                    &mut this.read_timer,
                    this.timeout,
                    cx,
                    "read"
                ));
                Poll::Ready(Err(e))
            }
        }
    }
}

impl<S> AsyncWrite for TimedStream<S>
where
    S: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(r) => {
                this.write_timer = None;
                Poll::Ready(r)
            }
            Poll::Pending => {
                let e = ready!(Self::poll_timer(
                    &mut this.write_timer,
                    this.timeout,
                    cx,
                    "write"
                ));
                Poll::Ready(Err(e))
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(r) => {
                this.write_timer = None;
                Poll::Ready(r)
            }
            Poll::Pending => {
                let e = ready!(Self::poll_timer(
                    &mut this.write_timer,
                    this.timeout,
                    cx,
                    "flush"
                ));
                Poll::Ready(Err(e))
            }
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_shutdown(cx) {
            Poll::Ready(r) => {
                this.write_timer = None;
                Poll::Ready(r)
            }
            Poll::Pending => {
                let e = ready!(Self::poll_timer(
                    &mut this.write_timer,
                    this.timeout,
                    cx,
                    "shutdown"
                ));
                Poll::Ready(Err(e))
            }
        }
    }
}
