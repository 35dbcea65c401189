use actix_web::{web, App, HttpServer};
use log::info;

use chess_arena::config::Config;
use chess_arena::models::AppState;
use chess_arena::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    info!("starting chess-arena at http://{}", config.bind_addr);

    let app_state = web::Data::new(AppState::new(&config)?);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure_routes)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
