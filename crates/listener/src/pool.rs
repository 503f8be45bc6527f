//! Socket ownership and per-port accept loops.

use prahari_common::{Hit, HitSink, PrahariError, PrahariResult};
use prahari_ports::PortSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Initial delay before retrying a failed accept; doubles up to the cap.
const ACCEPT_RETRY_BASE: Duration = Duration::from_millis(100);
const ACCEPT_RETRY_CAP: Duration = Duration::from_secs(5);
/// The banner write is informational; don't let a stalled peer pin the loop.
const BANNER_WRITE_TIMEOUT: Duration = Duration::from_millis(250);

/// Owns the bound listeners for one activation and the accept-loop tasks
/// draining them.
pub struct ListenerPool {
    bind_addr: IpAddr,
    banner: Option<Arc<Vec<u8>>>,
    tasks: Vec<JoinHandle<()>>,
    active_ports: Vec<u16>,
}

impl ListenerPool {
    #[must_use]
    pub fn new(bind_addr: IpAddr) -> Self {
        Self {
            bind_addr,
            banner: None,
            tasks: Vec::new(),
            active_ports: Vec::new(),
        }
    }

    /// Set the banner written to each accepted connection (`None` disables).
    #[must_use]
    pub fn with_banner(mut self, banner: Option<Vec<u8>>) -> Self {
        self.banner = banner.map(Arc::new);
        self
    }

    /// Bind every port in the set and start one accept loop per listener.
    ///
    /// If any bind fails, listeners bound earlier in this call are released
    /// before returning `Bind { port, .. }` for the first failure; no
    /// partial activation survives. Binding an empty set is a no-op
    /// success.
    pub async fn start(&mut self, ports: &PortSet, sink: Arc<dyn HitSink>) -> PrahariResult<()> {
        if self.is_active() {
            return Err(PrahariError::AlreadyStarted);
        }

        // Bind everything before spawning anything, so a failure can roll
        // back by simply dropping the listeners bound so far.
        let mut bound: Vec<(u16, TcpListener)> = Vec::with_capacity(ports.len());
        for port in ports.iter() {
            let addr = SocketAddr::new(self.bind_addr, port);
            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    debug!(port, "bound listener");
                    bound.push((port, listener));
                }
                Err(source) => {
                    warn!(port, error = %source, "bind failed, rolling back activation");
                    drop(bound);
                    return Err(PrahariError::Bind { port, source });
                }
            }
        }

        for (port, listener) in bound {
            let sink = sink.clone();
            let banner = self.banner.clone();
            self.active_ports.push(port);
            self.tasks
                .push(tokio::spawn(accept_loop(listener, port, sink, banner)));
        }

        if !self.active_ports.is_empty() {
            info!(ports = self.active_ports.len(), "listener pool active");
        }
        Ok(())
    }

    /// Close all listeners and cancel in-flight accepts. Waits for the
    /// aborted loops to wind down so every port is genuinely released when
    /// this returns. Idempotent; safe to call when nothing was started.
    pub async fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let tasks: Vec<JoinHandle<()>> = self.tasks.drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            // a cancelled join is the expected outcome here
            let _ = task.await;
        }
        self.active_ports.clear();
        info!("listener pool stopped");
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Number of ports currently bound.
    #[inline]
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.active_ports.len()
    }
}

impl Drop for ListenerPool {
    fn drop(&mut self) {
        // Drop can't await; aborting is enough to release the sockets soon
        // after. The async `stop` is the orderly path.
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Accept connections on one port until the task is aborted.
///
/// A transient accept error must not blind monitoring on this port, so the
/// loop logs, backs off, and keeps accepting. The sink delivery is
/// enqueue-and-return; the loop never waits on a threshold decision.
async fn accept_loop(
    listener: TcpListener,
    port: u16,
    sink: Arc<dyn HitSink>,
    banner: Option<Arc<Vec<u8>>>,
) {
    let mut backoff = ACCEPT_RETRY_BASE;
    loop {
        match listener.accept().await {
            Ok((mut stream, peer)) => {
                backoff = ACCEPT_RETRY_BASE;
                trace!(port, peer = %peer, "accepted probe connection");

                sink.deliver(Hit::new(peer.ip(), port)).await;

                if let Some(banner) = banner.as_deref() {
                    // Best-effort; a peer that won't read gets cut off.
                    let _ = timeout(BANNER_WRITE_TIMEOUT, stream.write_all(banner)).await;
                }
                // stream drops here: connection closed, no data exchange
            }
            Err(error) => {
                warn!(port, %error, "accept failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(ACCEPT_RETRY_CAP);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prahari_common::{ChannelSink, SCAN_REPLY_BANNER};
    use std::net::Ipv4Addr;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// Grab a currently-free loopback port by binding to port 0.
    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn sink_pair() -> (Arc<dyn HitSink>, tokio::sync::mpsc::UnboundedReceiver<Hit>) {
        let (sink, rx) = ChannelSink::new();
        (Arc::new(sink), rx)
    }

    #[tokio::test]
    async fn empty_set_is_noop_success() {
        let (sink, _rx) = sink_pair();
        let mut pool = ListenerPool::new(LOOPBACK);
        pool.start(&PortSet::default(), sink).await.unwrap();
        assert!(!pool.is_active());
        assert_eq!(pool.port_count(), 0);
    }

    #[tokio::test]
    async fn delivers_hit_per_connection() {
        let port = free_port();
        let (sink, mut rx) = sink_pair();
        let mut pool = ListenerPool::new(LOOPBACK);
        pool.start(&PortSet::from_iter([port]), sink).await.unwrap();
        assert_eq!(pool.port_count(), 1);

        let _conn = TcpStream::connect((LOOPBACK, port)).await.unwrap();
        let hit = rx.recv().await.unwrap();
        assert_eq!(hit.port, port);
        assert_eq!(hit.source, LOOPBACK);

        pool.stop().await;
    }

    #[tokio::test]
    async fn writes_banner_then_closes() {
        let port = free_port();
        let (sink, _rx) = sink_pair();
        let mut pool =
            ListenerPool::new(LOOPBACK).with_banner(Some(SCAN_REPLY_BANNER.to_vec()));
        pool.start(&PortSet::from_iter([port]), sink).await.unwrap();

        let mut conn = TcpStream::connect((LOOPBACK, port)).await.unwrap();
        let mut buf = Vec::new();
        // read_to_end also proves the listener closed the connection
        conn.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, SCAN_REPLY_BANNER);

        pool.stop().await;
    }

    #[tokio::test]
    async fn bind_failure_rolls_back_all_listeners() {
        // occupy one port so the second bind in the set fails
        let blocker = tokio::net::TcpListener::bind((LOOPBACK, 0)).await.unwrap();
        let blocked_port = blocker.local_addr().unwrap().port();
        let open_port = free_port();

        let (sink, _rx) = sink_pair();
        let mut pool = ListenerPool::new(LOOPBACK);
        let err = pool
            .start(&PortSet::from_iter([open_port, blocked_port]), sink)
            .await
            .unwrap_err();
        assert_eq!(err.bind_port(), Some(blocked_port));
        assert!(!pool.is_active());

        // the port bound before the failure was released: a fresh start on
        // it alone succeeds
        let (sink, _rx) = sink_pair();
        pool.start(&PortSet::from_iter([open_port]), sink)
            .await
            .unwrap();
        assert!(pool.is_active());
        pool.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut pool = ListenerPool::new(LOOPBACK);
        pool.stop().await; // never started

        let port = free_port();
        let (sink, _rx) = sink_pair();
        pool.start(&PortSet::from_iter([port]), sink).await.unwrap();
        pool.stop().await;
        pool.stop().await;
        assert!(!pool.is_active());

        // the port is free again after stop
        let (sink, _rx) = sink_pair();
        pool.start(&PortSet::from_iter([port]), sink).await.unwrap();
        pool.stop().await;
    }

    #[tokio::test]
    async fn start_while_active_is_rejected() {
        let port = free_port();
        let (sink, _rx) = sink_pair();
        let mut pool = ListenerPool::new(LOOPBACK);
        pool.start(&PortSet::from_iter([port]), sink).await.unwrap();

        let (sink, _rx) = sink_pair();
        let err = pool
            .start(&PortSet::from_iter([free_port()]), sink)
            .await
            .unwrap_err();
        assert!(matches!(err, PrahariError::AlreadyStarted));
        pool.stop().await;
    }
}
