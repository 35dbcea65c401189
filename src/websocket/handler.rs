use actix::{Actor, ActorContext, AsyncContext, Handler, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use uuid::Uuid;

use crate::models::{AppState, ClientMessage, WsPayload};

/// One websocket connection bound to a room, as player or spectator.
pub struct RoomSocket {
    pub id: String,
    pub username: String,
    pub room_id: String,
    pub app_state: web::Data<AppState>,
}

impl Actor for RoomSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.app_state
            .sessions
            .lock()
            .unwrap()
            .insert(self.id.clone(), ctx.address().recipient());
        info!(
            "connection {} ({}) attached to room {}",
            self.id, self.username, self.room_id
        );
        self.join_room(ctx);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.app_state.sessions.lock().unwrap().remove(&self.id);
        {
            let mut rooms = self.app_state.rooms.lock().unwrap();
            if let Some(room) = rooms.get_mut(&self.room_id) {
                room.remove_connection(&self.id);
            }
        }
        self.app_state.persist_rooms();
        info!("connection {} closed", self.id);
        Running::Stop
    }
}

impl Handler<WsPayload> for RoomSocket {
    type Result = ();

    fn handle(&mut self, msg: WsPayload, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RoomSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => self.handle_message(client_msg, ctx),
                Err(e) => {
                    warn!("connection {}: unparseable message: {}", self.id, e);
                    self.send_error(ctx, &format!("invalid message format: {}", e));
                }
            },
            Ok(ws::Message::Binary(_)) => {
                warn!("connection {}: binary frames are not supported", self.id);
                self.send_error(ctx, "binary messages are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                info!("connection {} closing: {:?}", self.id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}

/// Entry point for `GET /ws/{room_id}/{token}`.
///
/// The token must resolve to a known identity and the room must already
/// exist; rooms are only created through the explicit create endpoints.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<(String, String)>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (room_id, token) = path.into_inner();

    let Some(username) = app_state.authenticate(&token) else {
        warn!("rejected websocket with invalid token for room {}", room_id);
        return Ok(HttpResponse::Unauthorized().body("invalid token"));
    };
    if !app_state.rooms.lock().unwrap().contains_key(&room_id) {
        warn!("rejected websocket for unknown room {}", room_id);
        return Ok(HttpResponse::NotFound().body("no such room"));
    }

    let socket = RoomSocket {
        id: Uuid::new_v4().to_string(),
        username,
        room_id,
        app_state: app_state.clone(),
    };
    ws::start(socket, &req, stream)
}
