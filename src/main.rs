use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenvy::dotenv;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use conges::config::Config;
use conges::db::init_db;
use conges::docs::ApiDoc;
use conges::integration::caldav::{CalDavGateway, CalendarGateway, DavClient};
use conges::integration::directory::HttpDirectory;
use conges::integration::notify::HttpNotifier;
use conges::integration::talk::TalkClient;
use conges::integration::Integrations;
use conges::service::{CalendarPush, LeaveService, NotificationFanout};
use conges::settings::SettingsStore;
use conges::routes;
use conges::store::LeaveStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;
    let store = LeaveStore::new(pool.clone());
    let settings = SettingsStore::new(pool.clone());

    let http = reqwest::Client::new();
    let directory = Arc::new(HttpDirectory::new(
        http.clone(),
        &config.platform_base_url,
        &config.platform_user,
        &config.platform_password,
    ));
    let notifier = Arc::new(HttpNotifier::new(
        http.clone(),
        &config.platform_base_url,
        &config.platform_user,
        &config.platform_password,
    ));
    let chat = Arc::new(TalkClient::new(
        http.clone(),
        &config.platform_base_url,
        &config.platform_user,
        &config.platform_password,
    ));
    let calendar_gateway: Arc<dyn CalendarGateway> = Arc::new(CalDavGateway::new(
        http.clone(),
        &config.platform_base_url,
        &config.platform_user,
        &config.platform_password,
    ));
    let dav = DavClient::new(
        http,
        &config.platform_base_url,
        &config.platform_user,
        &config.platform_password,
    );

    let integrations = Integrations {
        directory: directory.clone(),
        chat: chat.clone(),
    };
    let fanout = NotificationFanout::new(directory, notifier, chat, settings.clone());
    let calendar = CalendarPush::new(Some(calendar_gateway), dav, store.clone(), &config.host);
    let service = LeaveService::new(store.clone(), fanout, calendar);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();
    let service = Data::new(service);
    let integrations = Data::new(integrations);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .app_data(integrations.clone())
            .app_data(Data::new(store.clone()))
            .app_data(Data::new(settings.clone()))
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(server_addr)?
    .run()
    .await
}
