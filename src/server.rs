use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::client::Client;
use crate::codec::FrameCodec;
use crate::commands::Router;
use crate::config::Config;
use crate::connection::Connection;
use crate::store::Store;
use crate::Result;

/// A listening server.
///
/// Each server owns its listener, its router and its shutdown token, so any number of servers
/// can run in the same process without sharing anything but what they are given.
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    codec: FrameCodec,
    clients: Clients,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Server {
    /// Binds the listening socket. Port `0` picks a free port, see [`Server::local_addr`].
    pub async fn bind(config: &Config, store: Store) -> Result<Server> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("failed to listen on {}: {}", addr, e))?;

        Ok(Server {
            listener,
            router: Arc::new(Router::new(store)),
            codec: FrameCodec::new(config.max_frame_size),
            clients: Clients::default(),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that stops the server once cancelled. Cancelling it more than once is harmless.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accepts connections until the shutdown token is cancelled, then closes every client and
    /// waits for their tasks to finish.
    pub async fn run(self) -> Result<()> {
        let Server {
            listener,
            router,
            codec,
            clients,
            shutdown,
            tracker,
        } = self;

        info!("Server listening on {}", listener.local_addr()?);

        loop {
            let accepted = tokio::select! {
                res = listener.accept() => res,
                _ = shutdown.cancelled() => break,
            };

            let (socket, address) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let id = Uuid::new_v4();
            let token = shutdown.child_token();
            let connection = Connection::with_codec(socket, codec);
            let client = Client::new(id, address, connection, router.clone(), token.clone());

            clients.register(id, address, token);

            let clients = clients.clone();
            tracker.spawn(async move {
                client.serve().await;
                clients.deregister(&id);
            });
        }

        info!("Shutting down server");

        drop(listener);
        clients.close_all();
        tracker.close();
        tracker.wait().await;

        info!("Server stopped");

        Ok(())
    }
}

struct ClientHandle {
    address: SocketAddr,
    shutdown: CancellationToken,
}

/// Registry of the clients currently being served.
#[derive(Clone, Default)]
struct Clients {
    inner: Arc<Mutex<HashMap<Uuid, ClientHandle>>>,
}

impl Clients {
    fn register(&self, id: Uuid, address: SocketAddr, shutdown: CancellationToken) {
        self.inner
            .lock()
            .insert(id, ClientHandle { address, shutdown });
    }

    fn deregister(&self, id: &Uuid) {
        self.inner.lock().remove(id);
    }

    fn close_all(&self) {
        let clients = std::mem::take(&mut *self.inner.lock());

        for (id, client) in clients {
            debug!(client_id = %id, client_address = %client.address, "closing client");
            client.shutdown.cancel();
        }
    }
}

/// Runs a server with a fresh store until Ctrl-C is received.
pub async fn run(config: Config) -> Result<()> {
    let server = Server::bind(&config, Store::new()).await?;
    let shutdown = server.shutdown_token();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        shutdown.cancel();
    });

    server.run().await
}
