#[macro_use]
extern crate log;

use actix_web::{middleware::Logger, rt::System, web::Data, App, HttpServer};
use diesel::r2d2::{ConnectionManager, Pool};
use dotenv::dotenv;
use env_logger::Env;
use std::{
    io::{Error, ErrorKind, Result},
    sync::Arc,
    time::Duration,
};
use structopt::StructOpt;

use flashcard_learning::{
    db::{
        memory::MemoryStore,
        pg::{run_migrations, PgBackend},
        Backend, DBConnection,
    },
    domain::dictionary::{DictionaryProvider, HttpDictionary},
    service::{json_config, jwt::Authenticator, routes, AppState},
};

#[derive(Debug, StructOpt)]
#[structopt(name = "flashcard_learning")]
struct Opt {
    /// PostgreSQL connection URL
    #[structopt(short = "u", long = "db-url", env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Keep everything in process memory instead of PostgreSQL
    #[structopt(long = "memory")]
    memory: bool,
    #[structopt(short = "s", long = "socket", default_value = "127.0.0.1:8000")]
    socket: String,
    #[structopt(long = "jwt-secret", env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,
    /// Lifetime of issued tokens in days
    #[structopt(long = "token-days", default_value = "1")]
    token_days: u64,
    #[structopt(long = "pool-size", default_value = "10")]
    pool_size: u32,
    /// Seconds to wait for each dictionary provider call
    #[structopt(long = "dictionary-timeout", default_value = "3")]
    dictionary_timeout: u64,
    #[structopt(
        long = "translate-url",
        default_value = "https://api.mymemory.translated.net"
    )]
    translate_url: String,
    #[structopt(long = "pronounce-url", default_value = "https://api.dictionaryapi.dev")]
    pronounce_url: String,
}

fn startup_error<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Error + '_ {
    move |err| Error::new(ErrorKind::Other, format!("{}: {}", context, err))
}

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();

    let dictionary: Arc<dyn DictionaryProvider> = Arc::new(
        HttpDictionary::new(
            Duration::from_secs(opt.dictionary_timeout),
            &opt.translate_url,
            &opt.pronounce_url,
        )
        .map_err(startup_error("Failed to build dictionary client"))?,
    );
    let authenticator = Authenticator::new(&opt.jwt_secret, opt.token_days);

    if opt.memory {
        warn!("Running with the in-memory store, nothing will be persisted");
        return System::new().block_on(serve(
            MemoryStore::new(),
            dictionary,
            authenticator,
            opt.socket,
        ));
    }

    let database_url = opt.database_url.ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidInput,
            "A database url is required unless --memory is given",
        )
    })?;
    let manager = ConnectionManager::<DBConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(opt.pool_size)
        .build(manager)
        .map_err(startup_error("Failed to initialize connection pool"))?;
    let mut conn = pool
        .get()
        .map_err(startup_error("Failed to get db connection"))?;
    let applied = run_migrations(&mut conn).map_err(startup_error("Failed to run migrations"))?;
    info!("Applied {} pending migrations", applied);
    drop(conn);

    System::new().block_on(serve(
        PgBackend::new(pool),
        dictionary,
        authenticator,
        opt.socket,
    ))
}

async fn serve<B: Backend>(
    backend: B,
    dictionary: Arc<dyn DictionaryProvider>,
    authenticator: Authenticator,
    socket: String,
) -> Result<()> {
    let state = Data::new(AppState::new(backend, dictionary));
    let authenticator = Data::new(authenticator);

    info!("Flashcard service running at: http://{}", socket);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(authenticator.clone())
            .app_data(json_config())
            .configure(routes::<B>)
    })
    .bind(&socket)?
    .run()
    .await
}
