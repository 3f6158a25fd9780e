//! Socket.IO namespace handlers.
//!
//! Clients join their user room with a `join_room` event. Joining is not
//! authenticated.

use serde::Deserialize;
use socketioxide::extract::{Data, SocketRef};
use uuid::Uuid;

use crate::services::notifications::user_room;

#[derive(Debug, Deserialize)]
pub struct JoinRoom {
    pub user_id: Uuid,
}

pub async fn on_connect(socket: SocketRef) {
    tracing::info!("Socket {} connected", socket.id);

    socket.on(
        "join_room",
        |socket: SocketRef, Data(join): Data<JoinRoom>| async move {
            let room = user_room(join.user_id);
            socket.join(room.clone());
            tracing::info!("Socket {} joined room {}", socket.id, room);
        },
    );

    socket.on_disconnect(|socket: SocketRef| async move {
        tracing::info!("Socket {} disconnected", socket.id);
    });
}
