//! Production [`SessionFactory`]: opens a TCP (optionally TLS-wrapped)
//! connection to the target cluster and speaks the length-prefixed
//! `bincode` protocol from [`crate::session::protocol`].
//!
//! Adapted from the teacher's `cli.rs` interactive client, which does the
//! same `TcpStream::connect` -> write request -> read response dance
//! against its own `network::protocol`; generalized here to optional TLS
//! and authentication (spec §6: "transport is optionally TLS... with
//! optional username/password authentication").

use std::sync::Arc;

use async_trait::async_trait;
use rustls_pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::config::ConnectionSettings;
use crate::error::{Result, TriremeError};
use crate::session::protocol::{self, Request, Response};
use crate::session::{Row, Session};

/// Builds [`CqlSession`]s by dialing `ConnectionSettings::host:port` and,
/// when TLS material is present, wrapping the stream in a `rustls`
/// client connection before the keyspace handshake.
#[derive(Debug, Default)]
pub struct CqlSessionFactory;

#[async_trait]
impl crate::session::SessionFactory for CqlSessionFactory {
    async fn connect(&self, conn: &ConnectionSettings, keyspace: &str) -> Result<Arc<dyn Session>> {
        let addr = format!("{}:{}", conn.host, conn.port);
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| TriremeError::Connect(format!("{}: {}", addr, e)))?;

        let transport: Transport = match &conn.tls {
            Some(tls_settings) => {
                let client_config = super::tls::build_client_config(tls_settings)?;
                let connector = TlsConnector::from(Arc::new(client_config));
                let server_name = ServerName::try_from(conn.host.clone())
                    .map_err(|e| TriremeError::Tls(format!("invalid server name {}: {}", conn.host, e)))?;
                let tls_stream = connector
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| TriremeError::Tls(e.to_string()))?;
                Transport::Tls(tokio::sync::Mutex::new(tls_stream))
            }
            None => Transport::Plain(tokio::sync::Mutex::new(tcp)),
        };

        let session = CqlSession { transport };
        // Authenticate, then pin the keyspace - mirroring the original
        // tool's `USE <keyspace>` preamble before any scan query.
        session.authenticate(&conn.user, &conn.password).await?;
        session.execute(&format!("USE {}", keyspace)).await?;
        Ok(Arc::new(session))
    }
}

enum Transport {
    Plain(tokio::sync::Mutex<TcpStream>),
    Tls(tokio::sync::Mutex<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl Transport {
    async fn roundtrip(&self, frame: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            Transport::Plain(stream) => {
                let mut stream = stream.lock().await;
                roundtrip_on(&mut *stream, frame).await
            }
            Transport::Tls(stream) => {
                let mut stream = stream.lock().await;
                roundtrip_on(&mut *stream, frame).await
            }
        }
    }
}

async fn roundtrip_on<S: AsyncReadExt + AsyncWriteExt + Unpin>(
    stream: &mut S,
    frame: Vec<u8>,
) -> Result<Vec<u8>> {
    stream
        .write_all(&frame)
        .await
        .map_err(|e| TriremeError::Connect(format!("write failed: {}", e)))?;

    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| TriremeError::Connect(format!("read failed: {}", e)))?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > protocol::MAX_FRAME_SIZE {
        return Err(TriremeError::Parse(format!(
            "server announced a frame of {} bytes, exceeding the {} byte limit",
            len,
            protocol::MAX_FRAME_SIZE
        )));
    }
    let mut body = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|e| TriremeError::Connect(format!("read failed: {}", e)))?;
    Ok(body)
}

/// A connection pinned to one host and keyspace.
struct CqlSession {
    transport: Transport,
}

impl CqlSession {
    async fn authenticate(&self, user: &str, password: &str) -> Result<()> {
        // The wire protocol carries auth as a query-shaped request - the
        // collaborator on the other end is responsible for validating
        // credentials before accepting further queries on this connection.
        let auth_cql = format!("AUTH {} {}", user, password);
        self.execute(&auth_cql).await.map(|_| ())
    }

    async fn send(&self, req: Request) -> Result<Response> {
        let frame = protocol::encode_request(&req)?;
        let body = self.transport.roundtrip(frame).await?;
        protocol::decode_body(&body)
    }
}

#[async_trait]
impl Session for CqlSession {
    async fn execute(&self, query: &str) -> Result<Vec<Row>> {
        if query.len() > protocol::MAX_QUERY_LENGTH {
            return Err(TriremeError::InvalidArgument(format!(
                "query of {} bytes exceeds {} byte limit",
                query.len(),
                protocol::MAX_QUERY_LENGTH
            )));
        }
        match self
            .send(Request::Query {
                cql: query.to_string(),
            })
            .await?
        {
            Response::Rows(wire_rows) => Ok(wire_rows
                .into_iter()
                .map(|w| Row::new(w.columns))
                .collect()),
            Response::Ok => Ok(Vec::new()),
            Response::Error(msg) => Err(TriremeError::Query(msg)),
        }
    }
}
