//! A single connection to a coordinator/meta/data-shard server, carrying
//! many concurrent in-flight calls multiplexed by call id.
//!
//! The reference client serializes each call's send under one lock, then
//! blocks the calling thread in `_receive`; if the frame that comes back
//! belongs to a *different* call, it stashes it and wakes that call's
//! thread via a semaphore, then waits on its own. Translated to async
//! Rust, that whole wait/notify dance collapses into one background
//! reader task dispatching frames to a `oneshot` rendezvous per call id —
//! first response for a given call id wins, whichever task asked for it.

use crate::error::{ClientError, ProtocolError, RequestError, TransportError};
use crate::frame;
use bytes::Bytes;
use futures::{SinkExt, TryStreamExt};
use prost::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

struct RawResponse {
    exception_class_name: Option<String>,
    payload: Bytes,
}

type PendingMap = Arc<Mutex<HashMap<u32, oneshot::Sender<RawResponse>>>>;
type FramedWriter = FramedWrite<WriteHalf<TcpStream>, LengthDelimitedCodec>;

/// One multiplexed connection. Cheap to clone-by-reference (wrap in
/// `Arc`); every in-flight `call` shares the same socket.
pub struct Channel {
    host: String,
    port: u16,
    writer: Mutex<FramedWriter>,
    pending: PendingMap,
    next_call_id: AtomicU32,
    reader_task: JoinHandle<()>,
    socket_timeout: Duration,
}

impl Channel {
    /// Connects, sends the connection preamble, and starts the
    /// background reader. `service_name` is the remote service this
    /// socket addresses (`"MasterService"` or `"ClientService"`).
    /// `socket_timeout` bounds every subsequent call's write and its
    /// wait for a response.
    #[tracing::instrument(skip(effective_user), fields(%host, %port, %service_name))]
    pub async fn connect(
        host: &str,
        port: u16,
        effective_user: &str,
        service_name: &str,
        socket_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let stream =
            TcpStream::connect((host, port))
                .await
                .map_err(|source| TransportError::Connect {
                    host: host.to_string(),
                    port,
                    source,
                })?;
        let _ = stream.set_nodelay(true);
        let (mut read_half, mut write_half) = tokio::io::split(stream);

        let preamble = frame::encode_preamble(effective_user, service_name);
        timeout(socket_timeout, write_half.write_all(&preamble))
            .await
            .map_err(|_| TransportError::Timeout {
                host: host.to_string(),
                port,
            })?
            .map_err(|source| TransportError::Write {
                host: host.to_string(),
                port,
                source,
            })?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();
        let mut reader = FramedRead::new(read_half, frame::codec());

        let reader_task = tokio::spawn(async move {
            loop {
                let raw = match reader.try_next().await {
                    Ok(Some(raw)) => raw,
                    Ok(None) => {
                        tracing::debug!("channel reader stopping: socket closed");
                        break;
                    }
                    Err(error) => {
                        tracing::debug!(%error, "channel reader stopping: read error");
                        break;
                    }
                };
                let decoded = match frame::decode_response(&raw) {
                    Ok(decoded) => decoded,
                    Err(error) => {
                        tracing::warn!(%error, "malformed response frame; closing channel reader");
                        break;
                    }
                };
                let mut map = reader_pending.lock().await;
                if let Some(sender) = map.remove(&decoded.call_id) {
                    let _ = sender.send(RawResponse {
                        exception_class_name: decoded.exception_class_name,
                        payload: decoded.payload,
                    });
                } else {
                    tracing::warn!(call_id = decoded.call_id, "response for unknown call id");
                }
            }
            reader_pending.lock().await.clear();
        });

        Ok(Channel {
            host: host.to_string(),
            port,
            writer: Mutex::new(FramedWrite::new(write_half, frame::codec())),
            pending,
            next_call_id: AtomicU32::new(0),
            reader_task,
            socket_timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// True once the background reader has exited, meaning the socket is
    /// no longer usable and the channel should be rebuilt.
    pub fn is_closed(&self) -> bool {
        self.reader_task.is_finished()
    }

    /// Sends `request` under `method_name` and awaits its matching
    /// response, decoding it as `Resp`.
    pub async fn call<Req, Resp>(&self, method_name: &str, request: &Req) -> Result<Resp, ClientError>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(call_id, tx);

        let body = frame::encode_request(call_id, method_name, request).freeze();
        {
            let mut writer = self.writer.lock().await;
            match timeout(self.socket_timeout, writer.send(body)).await {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    self.pending.lock().await.remove(&call_id);
                    return Err(TransportError::Write {
                        host: self.host.clone(),
                        port: self.port,
                        source,
                    }
                    .into());
                }
                Err(_) => {
                    self.pending.lock().await.remove(&call_id);
                    return Err(TransportError::Timeout {
                        host: self.host.clone(),
                        port: self.port,
                    }
                    .into());
                }
            }
        }

        let raw = match timeout(self.socket_timeout, rx).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(_)) => {
                return Err(TransportError::UnexpectedEof {
                    host: self.host.clone(),
                    port: self.port,
                }
                .into())
            }
            Err(_) => {
                self.pending.lock().await.remove(&call_id);
                return Err(TransportError::Timeout {
                    host: self.host.clone(),
                    port: self.port,
                }
                .into());
            }
        };

        if let Some(class_name) = raw.exception_class_name {
            return Err(RequestError::from_exception_class_name(&class_name).into());
        }

        let payload = frame::split_payload(&raw.payload).map_err(ClientError::from)?;
        Resp::decode(payload)
            .map_err(ProtocolError::from)
            .map_err(ClientError::from)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pb;
    use crate::test_support;
    use tokio::net::TcpListener;

    /// Two concurrent callers send a `Get` and a `Scan` on the same
    /// channel; the server answers the scan first. Each caller must see
    /// its own response, and the rendezvous map must be empty once both
    /// calls have completed.
    #[tokio::test]
    async fn multiplexed_calls_route_to_the_right_caller_out_of_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept connection");
            test_support::read_preamble(&mut stream).await;

            let mut requests = Vec::new();
            for _ in 0..2 {
                let frame = test_support::read_frame(&mut stream).await.expect("read request frame");
                requests.push(test_support::decode_request(&frame));
            }

            // Answer whichever request named "Scan" first, regardless of
            // the order the requests arrived in.
            requests.sort_by_key(|req| req.method_name != "Scan");
            for req in &requests {
                let body = match req.method_name.as_str() {
                    "Scan" => test_support::encode_ok_response(
                        req.call_id,
                        &pb::ScanResponse {
                            scanner_id: Some(99),
                            results: vec![],
                            more_results: Some(true),
                            more_results_in_region: Some(true),
                        },
                    ),
                    "Get" => test_support::encode_ok_response(
                        req.call_id,
                        &pb::GetResponse {
                            result: Some(pb::ResultPb {
                                cell: vec![pb::Cell {
                                    row: b"row-1".to_vec(),
                                    family: b"cf".to_vec(),
                                    qualifier: b"q".to_vec(),
                                    value: b"v".to_vec(),
                                    timestamp: None,
                                }],
                            }),
                        },
                    ),
                    other => panic!("unexpected method {other}"),
                };
                test_support::write_frame(&mut stream, &body).await;
            }
        });

        let channel = Channel::connect(
            &addr.ip().to_string(),
            addr.port(),
            "test-user",
            "ClientService",
            Duration::from_secs(5),
        )
        .await
        .expect("connect channel");

        let get_req = pb::GetRequest {
            region: Some(pb::RegionSpecifier::by_name(b"t1,,1.abc.")),
            get: Some(pb::Get {
                row: b"row-1".to_vec(),
                column: vec![],
                filter: None,
            }),
        };
        let scan_req = pb::ScanRequest {
            region: Some(pb::RegionSpecifier::by_name(b"t1,,1.abc.")),
            scan: Some(pb::Scan {
                column: vec![],
                start_row: Some(b"".to_vec()),
                stop_row: None,
                filter: None,
                reversed: Some(false),
            }),
            scanner_id: None,
            number_of_rows: Some(100),
            close_scanner: None,
        };

        let get_call = channel.call::<_, pb::GetResponse>("Get", &get_req);
        let scan_call = channel.call::<_, pb::ScanResponse>("Scan", &scan_req);
        let (get_resp, scan_resp) = tokio::join!(get_call, scan_call);

        let get_resp = get_resp.expect("get call succeeds");
        let scan_resp = scan_resp.expect("scan call succeeds");
        assert_eq!(get_resp.result.unwrap().cell[0].row, b"row-1");
        assert_eq!(scan_resp.scanner_id, Some(99));

        assert!(channel.pending.lock().await.is_empty(), "no calls left parked");
    }

    #[tokio::test]
    async fn call_times_out_and_clears_the_pending_entry_when_the_server_never_replies() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept connection");
            test_support::read_preamble(&mut stream).await;
            // Read the request but never answer it; the stream is kept
            // open until this task (and the test) drops it.
            let _ = test_support::read_frame(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let channel = Channel::connect(
            &addr.ip().to_string(),
            addr.port(),
            "test-user",
            "ClientService",
            Duration::from_millis(50),
        )
        .await
        .expect("connect channel");

        let get_req = pb::GetRequest {
            region: Some(pb::RegionSpecifier::by_name(b"t1,,1.abc.")),
            get: Some(pb::Get {
                row: b"row-1".to_vec(),
                column: vec![],
                filter: None,
            }),
        };
        let err = channel
            .call::<_, pb::GetResponse>("Get", &get_req)
            .await
            .expect_err("call times out");
        assert!(matches!(err, ClientError::Transport(TransportError::Timeout { .. })));
        assert!(channel.pending.lock().await.is_empty(), "timed-out call doesn't stay parked");
    }

    #[tokio::test]
    async fn server_exception_maps_to_the_matching_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept connection");
            test_support::read_preamble(&mut stream).await;
            let frame = test_support::read_frame(&mut stream).await.expect("read request frame");
            let req = test_support::decode_request(&frame);
            let body = test_support::encode_exception_response(
                req.call_id,
                "org.apache.hadoop.hbase.NotServingRegionException",
            );
            test_support::write_frame(&mut stream, &body).await;
        });

        let channel = Channel::connect(
            &addr.ip().to_string(),
            addr.port(),
            "test-user",
            "ClientService",
            Duration::from_secs(5),
        )
        .await
        .expect("connect channel");

        let get_req = pb::GetRequest {
            region: Some(pb::RegionSpecifier::by_name(b"t1,,1.abc.")),
            get: Some(pb::Get {
                row: b"row-1".to_vec(),
                column: vec![],
                filter: None,
            }),
        };
        let err = channel
            .call::<_, pb::GetResponse>("Get", &get_req)
            .await
            .expect_err("server exception surfaces as an error");
        assert_eq!(
            err.as_region_kind(),
            Some(crate::error::RegionErrorKind::NotServing)
        );
    }
}
