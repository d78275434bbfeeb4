use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server as GrpcServer;
use tonic::{Request, Response, Status};
use tracing::{error, info};

use crate::config::Config;
use crate::protocol::service::kv_store_interface_server::{
  KvStoreInterface, KvStoreInterfaceServer,
};
use crate::protocol::{GetKeyArg, GetKeyCmd, GetKeyRet, PutKeyArg, PutKeyCmd, PutKeyRet};
use crate::store::{Store, StoreError};

/// Errors that stop the server from starting or serving
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
  #[error("failed to open store: {0}")]
  Store(#[from] StoreError),

  #[error("failed to bind {addr}: {source}")]
  Bind {
    addr: String,
    source: std::io::Error,
  },

  #[error("transport: {0}")]
  Transport(#[from] tonic::transport::Error),
}

/// Stateless request handler in front of the store engine
#[derive(Clone)]
pub struct KvService {
  store: Arc<Store>,
}

impl KvService {
  pub fn new(store: Arc<Store>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl KvStoreInterface for KvService {
  async fn get_key(&self, request: Request<GetKeyArg>) -> Result<Response<GetKeyRet>, Status> {
    let peer = request.remote_addr();
    let cmd = GetKeyCmd::from(request.into_inner());
    info!("Received GetKey request for key: {} from {:?}", cmd.key, peer);

    // The shard read lock waits out any put holding the write lock, so the
    // lookup stays off the async workers.
    let store = Arc::clone(&self.store);
    let ret = tokio::task::spawn_blocking(move || cmd.execute(&store))
      .await
      .unwrap_or_else(|e| {
        error!("GetKey task failed: {}", e);
        GetKeyRet::failure(format!("internal kvstore error: {}", e))
      });
    Ok(Response::new(ret))
  }

  async fn put_key(&self, request: Request<PutKeyArg>) -> Result<Response<PutKeyRet>, Status> {
    let peer = request.remote_addr();
    let cmd = PutKeyCmd::from(request.into_inner());
    info!("Received PutKey request for key: {} from {:?}", cmd.key, peer);

    // A put may write to the data directory while holding its shard lock.
    let store = Arc::clone(&self.store);
    let ret = tokio::task::spawn_blocking(move || cmd.execute(&store))
      .await
      .unwrap_or_else(|e| {
        error!("PutKey task failed: {}", e);
        PutKeyRet::failure(format!("internal kvstore error: {}", e))
      });
    Ok(Response::new(ret))
  }
}

/// gRPC server hosting the key-value store
pub struct Server {
  listener: TcpListener,
  local_addr: SocketAddr,
  store: Arc<Store>,
}

impl Server {
  /// Create and start the server
  ///
  /// This function:
  /// 1. Opens the store, recovering the data directory if one is configured
  /// 2. Binds the TCP listener
  /// 3. Returns the initialized Server instance
  pub async fn start(config: &Config) -> Result<Self, ServerError> {
    let store = Arc::new(Store::open(&config.store)?);

    let listener = TcpListener::bind(&config.server_addr)
      .await
      .map_err(|source| ServerError::Bind {
        addr: config.server_addr.clone(),
        source,
      })?;
    let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
      addr: config.server_addr.clone(),
      source,
    })?;
    info!("gRPC server bound to {}", local_addr);

    Ok(Self {
      listener,
      local_addr,
      store,
    })
  }

  /// Get local listening address
  pub fn local_addr(&self) -> SocketAddr {
    self.local_addr
  }

  /// Serve requests until `signal` resolves
  pub async fn run_until<F>(self, signal: F) -> Result<(), ServerError>
  where
    F: Future<Output = ()>,
  {
    info!(
      "Server started, listening on {} ({} keys, {} shards)",
      self.local_addr,
      self.store.len(),
      self.store.shard_count()
    );

    let service = KvStoreInterfaceServer::new(KvService::new(self.store));
    GrpcServer::builder()
      .add_service(service)
      .serve_with_incoming_shutdown(TcpListenerStream::new(self.listener), signal)
      .await?;

    info!("Server on {} stopped", self.local_addr);
    Ok(())
  }
}
