pub mod api;

use crate::agent::ChatAgent;
use crate::cli::Args;
use axum_server::tls_rustls::RustlsConfig;
use log::info;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct Server {
    args: Args,
    agent: Arc<ChatAgent>,
}

impl Server {
    pub fn new(args: Args, agent: Arc<ChatAgent>) -> Self {
        Self { args, agent }
    }

    /// Serves until the listener fails. TLS is used only when enabled and
    /// both the certificate and key paths are present.
    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let app = api::build_router(self.agent.clone(), &self.args.static_dir);

        let addr = resolve_listen_addr(&self.args.listen_addr()).await?;

        match self.tls_paths()? {
            Some((cert_path, key_path)) => {
                let tls_config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
                info!("Server is running on https://{}", addr);
                axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e|
                    format!("Failed to bind HTTP server to {}: {}", addr, e)
                )?;
                info!("Server is running on http://{}", listener.local_addr()?);
                axum::serve(listener, app.into_make_service()).await?;
            }
        }

        Ok(())
    }

    pub(crate) fn tls_paths(&self) -> Result<Option<(&str, &str)>, Box<dyn Error + Send + Sync>> {
        if !self.args.enable_tls {
            return Ok(None);
        }
        match (self.args.tls_cert_path.as_deref(), self.args.tls_key_path.as_deref()) {
            (Some(cert), Some(key)) => Ok(Some((cert, key))),
            _ => Err("TLS is enabled but --tls-cert-path and --tls-key-path were not both given".into()),
        }
    }
}

/// Resolves `host:port` to the first socket address, so hostnames such as
/// `localhost` work for both plain and TLS listeners.
pub(crate) async fn resolve_listen_addr(
    listen_addr: &str
) -> Result<SocketAddr, Box<dyn Error + Send + Sync>> {
    tokio::net::lookup_host(listen_addr).await
        .map_err(|e| format!("Invalid listen address '{}': {}", listen_addr, e))?
        .next()
        .ok_or_else(|| format!("Listen address '{}' did not resolve", listen_addr).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ agent_with, RecordingStore, StubChatClient };
    use clap::Parser;

    #[tokio::test]
    async fn listen_address_accepts_ip_literals_and_hostnames() {
        let ip = resolve_listen_addr("127.0.0.1:3000").await.unwrap();
        assert_eq!(ip, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());

        let named = resolve_listen_addr("localhost:3000").await.unwrap();
        assert!(named.ip().is_loopback());
        assert_eq!(named.port(), 3000);

        assert!(resolve_listen_addr("no-port-given").await.is_err());
    }

    #[test]
    fn tls_requires_both_certificate_and_key() {
        let agent = Arc::new(
            agent_with(Arc::new(StubChatClient::replying("x")), Arc::new(RecordingStore::default()))
        );

        let plain = Server::new(Args::parse_from(["chat-relay"]), agent.clone());
        assert!(plain.tls_paths().unwrap().is_none());

        let half = Server::new(
            Args::parse_from(["chat-relay", "--enable-tls", "--tls-cert-path", "cert.pem"]),
            agent.clone()
        );
        assert!(half.tls_paths().is_err());

        let full = Server::new(
            Args::parse_from([
                "chat-relay",
                "--enable-tls",
                "--tls-cert-path",
                "cert.pem",
                "--tls-key-path",
                "key.pem",
            ]),
            agent
        );
        assert_eq!(full.tls_paths().unwrap(), Some(("cert.pem", "key.pem")));
    }
}
