//! Port-forward tunnel to a single pod
//!
//! A [`Tunnel`] binds a local listener and forwards every accepted
//! connection to a port on the target pod through the Kubernetes API. The
//! forwarding task is stopped when the tunnel is closed or dropped, so the
//! local port is released on every exit path of the code holding it.

use std::net::SocketAddr;

use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::TunnelError;

/// RAII port-forward; dropping it stops the forwarding
pub struct Tunnel {
    local_port: u16,
    pod: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Tunnel {
    /// Forward a free local port to `remote_port` on `pod`
    ///
    /// The listener is bound before this returns, so the local port can be
    /// dialled immediately.
    pub async fn open(
        client: Client,
        namespace: &str,
        pod: &str,
        remote_port: u16,
    ) -> Result<Self, TunnelError> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let local_port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let pods: Api<Pod> = Api::namespaced(client, namespace);
        let target = pod.to_string();

        let handle = tokio::spawn(async move {
            accept_loop(listener, pods, target, remote_port, shutdown_rx).await;
        });

        tracing::info!(
            namespace = namespace,
            pod = pod,
            local_port = local_port,
            remote_port = remote_port,
            "Port-forward established"
        );

        Ok(Self {
            local_port,
            pod: pod.to_string(),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Local port forwarding to the pod
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn pod(&self) -> &str {
        &self.pod
    }

    /// Stop forwarding and wait for the accept loop to exit
    pub async fn close(mut self) {
        self.signal_shutdown();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(pod = %self.pod, error = %e, "Port-forward task failed");
            }
        }
    }

    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            tracing::debug!(local_port = self.local_port, pod = %self.pod, "Stopping port-forward");
            let _ = tx.send(());
        }
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

async fn accept_loop(
    listener: TcpListener,
    pods: Api<Pod>,
    pod: String,
    remote_port: u16,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::trace!(peer = %peer, pod = %pod, "New tunnel connection");
                    let pods = pods.clone();
                    let pod = pod.clone();
                    tokio::spawn(async move {
                        if let Err(e) = forward(pods, &pod, remote_port, stream).await {
                            tracing::warn!(pod = %pod, error = %e, "Tunnel connection error");
                        }
                    });
                }
                Err(e) => tracing::warn!(error = %e, "Tunnel accept error"),
            },
        }
    }
    tracing::debug!(pod = %pod, "Port-forward listener closed");
}

/// Pipe one local connection to the pod port until either side closes
async fn forward(
    pods: Api<Pod>,
    pod: &str,
    remote_port: u16,
    mut local: TcpStream,
) -> Result<(), TunnelError> {
    let mut pf = pods.portforward(pod, &[remote_port]).await?;
    let mut upstream = pf
        .take_stream(remote_port)
        .ok_or_else(|| TunnelError::PortUnavailable {
            pod: pod.to_string(),
            port: remote_port,
        })?;

    let (sent, received) = tokio::io::copy_bidirectional(&mut local, &mut upstream).await?;
    tracing::trace!(pod = pod, sent = sent, received = received, "Tunnel connection closed");

    drop(upstream);
    pf.join()
        .await
        .map_err(|e| TunnelError::Join(e.to_string()))
}
