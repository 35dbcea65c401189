pub mod bot;
pub mod config;
pub mod game;
pub mod models;
pub mod routes;
pub mod store;
pub mod websocket;
