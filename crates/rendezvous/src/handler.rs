//! Per-connection handler: request decoding and dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! Every inbound envelope must carry a [`Request`]; the handler runs it
//! against the registry and answers with exactly one [`Response`]
//! envelope echoing the request's `seq`.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use rendezvous_protocol::{
    Codec, Envelope, Payload, ProtocolError, Request, Response, RoomStatus,
};
use rendezvous_room::{Clock, HostEndpoint, RoomRegistry};
use rendezvous_transport::{Connection, WebSocketConnection};

use crate::RendezvousError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), RendezvousError> {
    let conn_id = conn.id();
    let peer_ip = conn.remote_ip();
    let start = Instant::now();
    tracing::debug!(%conn_id, %peer_ip, "handling new connection");

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::debug!(%conn_id, "connection idle, closing");
                let _ = conn.close().await;
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                send(&conn, &state, 0, error_response(&e.into()), &start).await?;
                continue;
            }
        };

        let seq = envelope.seq;
        let response = match envelope.payload {
            Payload::Request(request) => {
                let kind = request.kind();
                tracing::debug!(%conn_id, seq, request = kind, "handling request");
                match dispatch(&state, peer_ip, request).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::info!(
                            %conn_id, seq, request = kind, error = %e,
                            "request refused"
                        );
                        error_response(&e)
                    }
                }
            }
            Payload::Response(_) => error_response(
                &ProtocolError::InvalidMessage(
                    "clients may only send requests".into(),
                )
                .into(),
            ),
        };

        send(&conn, &state, seq, response, &start).await?;
    }

    Ok(())
}

/// Runs one request against the registry.
async fn dispatch(
    state: &ServerState,
    peer_ip: IpAddr,
    request: Request,
) -> Result<Response, RendezvousError> {
    match request {
        Request::CreateRoom {
            room_code,
            player_name,
            host_ip,
            host_port,
        } => {
            require(
                &[room_code.as_str(), player_name.as_str()],
                "missing room_code or player_name",
            )?;
            let host = HostEndpoint {
                ip: host_ip.filter(|ip| !ip.trim().is_empty()),
                port: host_port,
                public_ip: peer_ip.to_string(),
            };
            let room_code = on_registry(state, move |registry| {
                registry.create_room(&room_code, &player_name, host)
            })
            .await??;
            Ok(Response::RoomCreated { room_code })
        }

        Request::JoinRoom {
            room_code,
            player_name,
        } => {
            require(
                &[room_code.as_str(), player_name.as_str()],
                "missing room_code or player_name",
            )?;
            let joined = on_registry(state, move |registry| {
                registry.join_room(&room_code, &player_name)
            })
            .await??;
            Ok(Response::RoomJoined {
                host_ip: joined.host.ip,
                host_port: joined.host.port,
                public_ip: joined.host.public_ip,
                players: joined.players,
                status: joined.status,
                player_name: joined.player_name,
                name_changed: joined.name_changed,
            })
        }

        Request::UpdateRoom { room_code, status } => {
            require(
                &[room_code.as_str(), status.as_str()],
                "missing room_code or status",
            )?;
            let status: RoomStatus = status.parse()?;
            on_registry(state, move |registry| {
                registry.update_room_status(&room_code, status)
            })
            .await??;
            Ok(Response::Ack)
        }

        Request::CloseRoom { room_code } => {
            require(&[room_code.as_str()], "missing room_code")?;
            on_registry(state, move |registry| registry.close_room(&room_code))
                .await??;
            Ok(Response::Ack)
        }

        Request::GetRoom { room_code } => {
            require(&[room_code.as_str()], "missing room_code")?;
            let room =
                on_registry(state, move |registry| registry.get_room(&room_code))
                    .await??;
            Ok(Response::Room {
                room: room.summary(),
            })
        }

        Request::ListRooms => {
            on_registry(state, |registry| {
                let list = registry.list_rooms();
                Response::RoomList {
                    rooms: list.rooms.iter().map(|room| room.summary()).collect(),
                    total: list.total,
                }
            })
            .await
        }

        Request::Health => {
            on_registry(state, |registry| Response::Health {
                status: "online".to_string(),
                active_rooms: registry.room_count(),
                server_time: registry.clock().now(),
            })
            .await
        }

        Request::TestConnection { player_name } => {
            tracing::info!(
                player = player_name.as_deref().unwrap_or("unknown"),
                %peer_ip,
                "connection test"
            );
            Ok(Response::ConnectionTest {
                your_ip: peer_ip.to_string(),
                server_time: state.registry.clock().now(),
            })
        }
    }
}

/// Runs a registry call on the blocking pool.
///
/// The registry sits behind a blocking mutex that mutations hold while
/// they write the snapshot to disk, so even reads can wait on file I/O.
async fn on_registry<T, F>(state: &ServerState, f: F) -> Result<T, RendezvousError>
where
    F: FnOnce(&RoomRegistry) -> T + Send + 'static,
    T: Send + 'static,
{
    let registry = Arc::clone(&state.registry);
    Ok(tokio::task::spawn_blocking(move || f(&registry)).await?)
}

/// Fails with a 400 if any field is empty or blank.
fn require(fields: &[&str], message: &str) -> Result<(), ProtocolError> {
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(ProtocolError::InvalidMessage(message.to_string()));
    }
    Ok(())
}

fn error_response(err: &RendezvousError) -> Response {
    Response::Error {
        code: err.status_code(),
        message: err.to_string(),
    }
}

/// Encodes and sends a response envelope.
async fn send(
    conn: &WebSocketConnection,
    state: &ServerState,
    seq: u64,
    response: Response,
    start: &Instant,
) -> Result<(), RendezvousError> {
    let envelope = Envelope {
        seq,
        timestamp: start.elapsed().as_millis() as u64,
        payload: Payload::Response(response),
    };
    let bytes = state.codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank_fields() {
        assert!(require(&["ABCD", "Alice"], "missing").is_ok());
        assert!(require(&["ABCD", ""], "missing").is_err());
        assert!(require(&["   ", "Alice"], "missing").is_err());
    }

    #[test]
    fn test_error_response_carries_code_and_message() {
        let err: RendezvousError =
            rendezvous_room::RoomError::RoomFull("ABCD".into()).into();
        assert_eq!(
            error_response(&err),
            Response::Error {
                code: 409,
                message: "room ABCD is full".into(),
            }
        );
    }
}
