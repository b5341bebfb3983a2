pub mod auth;
pub mod db;
pub mod error;
pub mod mailer;
pub mod models;
pub mod request_logger;
pub mod routes;

use crate::auth::{AuthConfig, AuthState};
use crate::db::BookshelfDb;
use crate::mailer::{Mailer, MailerConfig};
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_db_pools::sqlx;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(BookshelfDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match BookshelfDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        match MIGRATOR.run(&pool).await {
                            Ok(_) => {
                                log::info!("database migrations successful");
                                Ok(rocket)
                            }
                            Err(e) => {
                                log::error!("database migrations failed: {}", e);
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Fairing to clone and manage the database pool for the auth guards
        .attach(AdHoc::try_on_ignite("Manage DB Pool", |rocket| async move {
            match BookshelfDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    Ok(rocket.manage(pool))
                }
                None => Err(rocket),
            }
        }))
        .attach(AdHoc::try_on_ignite("Auth State", |rocket| async move {
            let config = match AuthConfig::from_env() {
                Ok(config) => config,
                Err(e) => {
                    log::error!("invalid auth configuration: {}", e);
                    return Err(rocket);
                }
            };

            match AuthState::initialize(config).await {
                Ok(state) => Ok(rocket.manage(state)),
                Err(e) => {
                    log::error!("failed to initialize auth state: {}", e);
                    Err(rocket)
                }
            }
        }))
        .attach(AdHoc::try_on_ignite("Mailer", |rocket| async move {
            match Mailer::from_config(&MailerConfig::from_env()) {
                Ok(mailer) => Ok(rocket.manage(mailer)),
                Err(e) => {
                    log::error!("failed to initialize mailer: {}", e);
                    Err(rocket)
                }
            }
        }))
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Session routes
                auth::routes::signup,
                auth::routes::verify_account,
                auth::routes::login,
                auth::routes::refresh_token,
                auth::routes::logout,
                auth::routes::me,
                auth::routes::send_mail,
                auth::routes::password_reset_request,
                auth::routes::password_reset_confirm,
                // Book routes
                routes::books::list_books,
                routes::books::list_user_books,
                routes::books::create_book,
                routes::books::get_book,
                routes::books::update_book,
                routes::books::delete_book,
                // Tag routes
                routes::tags::list_tags,
                routes::tags::create_tag,
                routes::tags::add_tags_to_book,
                routes::tags::update_tag,
                routes::tags::delete_tag,
                // Review routes
                routes::reviews::list_reviews,
                routes::reviews::get_review,
                routes::reviews::add_review_to_book,
                routes::reviews::delete_review,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Bookshelf API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::Database;
    use rocket_db_pools::sqlx::PgPool;

    use crate::auth::AuthState;
    use crate::mailer::Mailer;

    pub use containers::{TestDatabase, TestInfraError, TestRedis};

    pub mod containers {
        use log::LevelFilter;
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
        use testcontainers::{GenericImage, ImageExt, core::WaitFor};
        use testcontainers_modules::redis::Redis;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use uuid::Uuid;

        #[derive(Debug, Error)]
        pub enum TestInfraError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral Postgres instance for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            url: String,
            container: Option<ContainerAsync<GenericImage>>,
        }

        impl TestDatabase {
            /// Launch a disposable Postgres container and run all migrations.
            pub async fn new() -> Result<Self, TestInfraError> {
                let image = GenericImage::new("postgres", "16-alpine")
                    .with_wait_for(WaitFor::message_on_stdout(
                        "database system is ready to accept connections",
                    ))
                    .with_wait_for(WaitFor::message_on_stderr(
                        "database system is ready to accept connections",
                    ));

                let db_name = format!("bookshelf_{}", Uuid::new_v4().simple());
                let request = image
                    .with_env_var("POSTGRES_DB", db_name.clone())
                    .with_env_var("POSTGRES_USER", "postgres")
                    .with_env_var("POSTGRES_PASSWORD", "postgres");

                let container = request.start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/{}", host, port, db_name);

                let options: PgConnectOptions = url.parse().map_err(TestInfraError::Sqlx)?;
                let options = options.log_statements(LevelFilter::Off);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(options)
                    .await?;

                crate::MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    url,
                    container: Some(container),
                })
            }

            /// Connection URL, for wiring the Rocket-managed database pool.
            pub fn url(&self) -> &str {
                &self.url
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Convenience method returning a clone of the pooled connection handle.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and tear down the container.
            pub async fn close(mut self) -> Result<(), TestInfraError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                if let Some(container) = self.container.take() {
                    drop(container);
                }
                Ok(())
            }
        }

        /// Ephemeral Redis instance backing the token blocklist in tests.
        pub struct TestRedis {
            url: String,
            _container: ContainerAsync<Redis>,
        }

        impl TestRedis {
            pub async fn new() -> Result<Self, TestInfraError> {
                let container = Redis::default().start().await?;
                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(6379).await?;

                Ok(Self {
                    url: format!("redis://{}:{}", host, port),
                    _container: container,
                })
            }

            pub fn url(&self) -> &str {
                &self.url
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        auth_state: Option<AuthState>,
        mailer: Option<Mailer>,
        attach_db: bool,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
                auth_state: None,
                mailer: None,
                attach_db: false,
            }
        }

        /// Attach the application database pool, pointed at `url`, for tests
        /// that exercise `Connection`-based routes.
        pub fn attach_db(mut self, url: &str) -> Self {
            self.figment = self.figment.merge(("databases.bookshelf_db.url", url));
            self.attach_db = true;
            self
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage a `PgPool` instance for tests that exercise database-backed routes.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Manage auth services for tests that exercise guarded routes.
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Manage a mailer, usually `Mailer::disabled()`.
        pub fn manage_mailer(mut self, mailer: Mailer) -> Self {
            self.mailer = Some(mailer);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            if self.attach_db {
                rocket = rocket.attach(crate::db::BookshelfDb::init());
            }

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }
            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }
            if let Some(mailer) = self.mailer {
                rocket = rocket.manage(mailer);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
