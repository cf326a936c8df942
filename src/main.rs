use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

mod db;
mod models;
mod routes;
mod services;

use services::geocoding_service::{GeocoderConfig, GeocodingService, NominatimTransport};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    println!("Logger initialized");

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    } else {
        println!("Release mode");
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);
    println!("Attempting to bind to {}:{}", host, port);

    let mongo_uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    println!("Got MongoDB URI, attempting connection...");
    let client = db::mongo::create_mongo_client(&mongo_uri).await;
    db::mongo::ensure_listing_indexes(&client).await;
    println!("MongoDB connection established");

    let geocoder_config = GeocoderConfig::from_env();
    let transport = NominatimTransport::new(&geocoder_config)
        .expect("Failed to build geocoder HTTP client");
    let geocoder = web::Data::new(GeocodingService::new(transport));

    println!("Starting HTTP server...");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .route("/health", web::get().to(|| async { "OK" }))
            .app_data(web::Data::new(client.clone()))
            .app_data(geocoder.clone())
            .service(
                web::scope("/api").service(
                    web::scope("/listings")
                        .route("", web::get().to(routes::listing::get_all))
                        .route("", web::post().to(routes::listing::create))
                        .route("/search", web::get().to(routes::listing::search))
                        .route("/nearby", web::get().to(routes::listing::nearby))
                        .route("/{id}", web::get().to(routes::listing::get_by_id))
                        .route("/{id}", web::put().to(routes::listing::update))
                        .route("/{id}", web::delete().to(routes::listing::delete))
                        .route("/{id}/like", web::post().to(routes::listing::toggle_like)),
                ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
