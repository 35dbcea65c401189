use actix_files as fs;
use actix_web::{web, HttpResponse, Responder};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::game::room::BOT_NAME;
use crate::models::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomForm {
    pub time: Option<f64>,
    pub inc: Option<f64>,
    /// Sent as 0/1 by form encodings.
    pub private: Option<u8>,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomForm {
    pub room_id: String,
    pub token: String,
}

/// HTTP handler for the index page.
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("chess-arena")
}

/// Issue a session token for an identity, creating its rating record on
/// first sight. Stands in for the external account store's
/// `authenticate` contract; password verification is not this crate's
/// concern.
pub async fn login(state: web::Data<AppState>, form: web::Form<LoginForm>) -> impl Responder {
    let username = form.username.trim();
    if username.is_empty() || username == BOT_NAME {
        return HttpResponse::BadRequest().json(json!({"ok": false, "reason": "invalid username"}));
    }
    if state.users.ensure(username).is_err() {
        return HttpResponse::InternalServerError()
            .json(json!({"ok": false, "reason": "user store unavailable"}));
    }
    let token = state.issue_token(username);
    info!("issued session token for {}", username);
    HttpResponse::Ok().json(json!({"ok": true, "token": token}))
}

/// Rating and games-played lookup.
pub async fn get_user(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let username = path.into_inner();
    match state.users.get(&username) {
        Some(record) => HttpResponse::Ok().json(json!({
            "username": username,
            "rating": record.rating,
            "games_played": record.games_played,
        })),
        None => HttpResponse::NotFound().json(json!({"ok": false, "reason": "no such user"})),
    }
}

/// Public rooms for the lobby.
pub async fn list_rooms(state: web::Data<AppState>) -> impl Responder {
    let rooms = state.rooms.lock().unwrap();
    let listing: Vec<_> = rooms
        .values()
        .filter(|room| !room.is_private)
        .map(|room| room.lobby_entry())
        .collect();
    HttpResponse::Ok().json(listing)
}

/// Create a room; the creator's identity is reserved on the white seat
/// until their websocket attaches.
pub async fn create_room(state: web::Data<AppState>, form: web::Form<CreateRoomForm>) -> impl Responder {
    let Some(username) = state.authenticate(&form.token) else {
        return HttpResponse::Unauthorized().json(json!({"ok": false, "reason": "invalid token"}));
    };
    let time = form.time.unwrap_or(300.0);
    let inc = form.inc.unwrap_or(0.0);
    let room_id = state.create_room(time, inc, form.private.unwrap_or(0) != 0);
    {
        let mut rooms = state.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(&room_id) {
            room.white.player = Some(username.clone());
        }
    }
    state.persist_rooms();
    info!("{} created room {} ({}s + {}s)", username, room_id, time, inc);
    HttpResponse::Ok().json(json!({"ok": true, "room_id": room_id}))
}

/// Create a private room with the automated opponent bound to black.
pub async fn create_ai_room(state: web::Data<AppState>, form: web::Form<CreateRoomForm>) -> impl Responder {
    let Some(username) = state.authenticate(&form.token) else {
        return HttpResponse::Unauthorized().json(json!({"ok": false, "reason": "invalid token"}));
    };
    let time = form.time.unwrap_or(300.0);
    let inc = form.inc.unwrap_or(0.0);
    let room_id = state.create_room(time, inc, true);
    {
        let mut rooms = state.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(&room_id) {
            room.white.player = Some(username.clone());
            room.black.player = Some(BOT_NAME.to_string());
        }
    }
    state.persist_rooms();
    info!("{} created bot room {}", username, room_id);
    HttpResponse::Ok().json(json!({"ok": true, "room_id": room_id}))
}

/// Pre-flight join check: reports whether the caller would get a seat or
/// spectate. The binding itself happens when the websocket attaches.
pub async fn join_room(state: web::Data<AppState>, form: web::Form<JoinRoomForm>) -> impl Responder {
    let Some(username) = state.authenticate(&form.token) else {
        return HttpResponse::Unauthorized().json(json!({"ok": false, "reason": "invalid token"}));
    };
    let rooms = state.rooms.lock().unwrap();
    let Some(room) = rooms.get(&form.room_id) else {
        return HttpResponse::NotFound().json(json!({"ok": false, "reason": "no such room"}));
    };
    let reclaims_seat = room.white.player.as_deref() == Some(username.as_str())
        || room.black.player.as_deref() == Some(username.as_str());
    let role = if reclaims_seat || room.white.player.is_none() || room.black.player.is_none() {
        "player"
    } else {
        "spectator"
    };
    HttpResponse::Ok().json(json!({"ok": true, "room_id": room.id, "role": role}))
}

/// Configure the HTTP routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/api/login").route(web::post().to(login)))
        .service(web::resource("/api/user/{username}").route(web::get().to(get_user)))
        .service(web::resource("/api/rooms").route(web::get().to(list_rooms)))
        .service(web::resource("/api/create_room").route(web::post().to(create_room)))
        .service(web::resource("/api/create_ai_room").route(web::post().to(create_ai_room)))
        .service(web::resource("/api/join_room").route(web::post().to(join_room)))
        .service(web::resource("/ws/{room_id}/{token}").route(web::get().to(crate::websocket::ws_index)))
        .service(fs::Files::new("/static", "./static"));
}
