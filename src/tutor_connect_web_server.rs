use crate::chat::ChatHub;
use crate::core::config::{JwtAuthConfig, MessagingConfig};
use crate::core::{AppConfig, EmailService, RedisHelper};
use crate::db::users::reset_online_flags;
use crate::geo::GeocodingClient;
use crate::jobs::start_message_expiry_job;
use crate::routes::tutor_connect_routes;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::web::{Data, ServiceConfig};
use actix_web::{dev::Server, App, HttpServer};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

pub struct TutorConnectServer {
    port: u16,
    server: Server,
}

impl TutorConnectServer {
    pub async fn build(configuration: AppConfig) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            configuration.server.host, configuration.server.port
        );

        let mysql_pool = MySqlPoolOptions::new()
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(configuration.mysql.connect());

        if configuration.mysql.run_migrations {
            tracing::info!("Running database migrations");
            sqlx::migrate!("./migrations").run(&mysql_pool).await?;
        }

        // Sessions do not survive a restart, so nobody is online yet.
        match reset_online_flags(&mysql_pool).await {
            Ok(reset) if reset > 0 => tracing::info!("Cleared stale presence for {} user(s)", reset),
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not clear stale presence flags: {}", e),
        }

        start_message_expiry_job(
            mysql_pool.clone(),
            Duration::from_secs(configuration.messaging.purge_interval_secs),
        );

        let state = AppState::new(&configuration, mysql_pool)?;

        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(listener, state)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Shared handles every worker receives through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub mysql_pool: Data<MySqlPool>,
    pub jwt_config: Data<JwtAuthConfig>,
    pub redis_helper: Data<RedisHelper>,
    pub email_service: Data<EmailService>,
    pub geocoder: Data<GeocodingClient>,
    pub chat_hub: Data<ChatHub>,
    pub messaging: Data<MessagingConfig>,
}

impl AppState {
    pub fn new(configuration: &AppConfig, mysql_pool: MySqlPool) -> Result<Self, anyhow::Error> {
        let redis_helper = Arc::new(RedisHelper::new(configuration.redis.connect()?));
        let geocoder = GeocodingClient::new(&configuration.geocoding, Some(redis_helper.clone()))?;
        let chat_hub = ChatHub::new(Duration::from_secs(
            configuration.messaging.typing_timeout_secs,
        ));

        Ok(Self {
            mysql_pool: Data::new(mysql_pool),
            jwt_config: Data::new(configuration.jwt_auth_config.clone()),
            redis_helper: Data::from(redis_helper),
            email_service: Data::new(EmailService::new(configuration.smtp.clone())),
            geocoder: Data::new(geocoder),
            chat_hub: Data::new(chat_hub),
            messaging: Data::new(configuration.messaging.clone()),
        })
    }

    /// Registers the shared state and every route on an `App`.
    pub fn configure(&self, conf: &mut ServiceConfig) {
        conf.app_data(self.mysql_pool.clone())
            .app_data(self.jwt_config.clone())
            .app_data(self.redis_helper.clone())
            .app_data(self.email_service.clone())
            .app_data(self.geocoder.clone())
            .app_data(self.chat_hub.clone())
            .app_data(self.messaging.clone());
        tutor_connect_routes(conf);
    }
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, anyhow::Error> {
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allowed_headers(vec![
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
            ])
            .supports_credentials();
        let state = state.clone();

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .configure(move |conf| state.configure(conf))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
