mod auth;
mod config;
mod database;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod service;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::auth::token::TokenSigner;
use crate::db::{SharedUserRepository, stage_db};
use crate::middleware::RequestLogger;
use crate::routes as app_routes;
use rocket::figment::Profile;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG takes precedence over the configured level, e.g.
    //   RUST_LOG=usergate::auth=debug,info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    // A subscriber may already be installed when several instances are built in one process.
    let _ = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
}

fn check_jwt_secret(profile: &Profile, auth_config: &config::AuthConfig) -> Result<(), String> {
    if auth_config.jwt_secret.is_empty() {
        return Err("auth.jwt_secret must not be empty".to_string());
    }

    if *profile != rocket::Config::DEBUG_PROFILE && auth_config.jwt_secret == config::DEV_JWT_SECRET {
        return Err(format!(
            "JWT_SECRET is required for profile '{}'. Generate one with: openssl rand -base64 32",
            profile
        ));
    }

    Ok(())
}

/// Uses the profile Rocket itself will run under: `ROCKET_PROFILE` when set, otherwise
/// `debug` for debug builds and `release` for release builds.
fn ensure_jwt_secret(auth_config: &config::AuthConfig) {
    let figment = rocket::Config::figment();

    if let Err(message) = check_jwt_secret(figment.profile(), auth_config) {
        panic!("{}", message);
    }
}

fn build_cors(cors_config: &config::CorsConfig) -> CorsOptions {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        panic!(
            "Invalid CORS configuration: Cannot use wildcard origins (*) with credentials enabled. \
            Either set specific origins or disable credentials."
        );
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Post, Method::Options, Method::Head]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Authorization", "Accept", "X-Request-Id"]),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    }
}

fn get_swagger_config(openapi_url: &str) -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: openapi_url.to_string(),
        ..Default::default()
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

fn join_base_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", suffix)
    } else if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, suffix)
    }
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (auth_routes, auth_openapi) = app_routes::auth::routes();
    let (user_routes, user_openapi) = app_routes::user::routes();
    let (health_routes, health_openapi) = app_routes::health::routes();

    vec![
        RouteSpec {
            path: "",
            routes: auth_routes,
            openapi: auth_openapi,
        },
        RouteSpec {
            path: "/users",
            routes: user_routes,
            openapi: user_openapi,
        },
        RouteSpec {
            path: "/health",
            routes: health_routes,
            openapi: health_openapi,
        },
    ]
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Rocket<Build> {
    let route_specs = collect_route_specs();

    if enable_swagger {
        let mut openapi_list = Vec::new();
        for spec in route_specs {
            rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
            openapi_list.push((spec.path, spec.openapi));
        }

        let openapi_docs = match marge_spec_list(&openapi_list) {
            Ok(docs) => docs,
            Err(err) => panic!("Could not merge OpenAPI spec: {}", err),
        };

        let settings = rocket_okapi::settings::OpenApiSettings::default();
        rocket = rocket.mount(base_path, vec![get_openapi_route(openapi_docs, &settings)]);

        let docs_path = join_base_path(base_path, "docs");
        let openapi_url = join_base_path(base_path, "openapi.json");
        rocket = rocket.mount(docs_path, make_swagger_ui(&get_swagger_config(&openapi_url)));
    } else {
        for spec in route_specs {
            rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
        }
    }

    rocket
}

/// Everything except the user store: server settings, fairings, routes, catchers and the
/// token signer.
fn assemble_rocket(config: Config) -> Rocket<Build> {
    ensure_jwt_secret(&config.auth);

    let cors = build_cors(&config.cors).to_cors().expect("Failed to create CORS fairing");
    let base_path = normalize_base_path(&config.api.base_path);

    let figment = rocket::Config::figment()
        .merge(("port", config.server.port))
        .merge(("address", config.server.address.clone()));

    let mut rocket = rocket::custom(figment)
        .attach(cors)
        .attach(RequestLogger)
        .manage(TokenSigner::from_config(&config.auth));

    rocket = mount_api_routes(rocket, &base_path, config.api.enable_swagger);

    rocket.register(
        "/",
        catchers![
            app_routes::error::bad_request,
            app_routes::error::forbidden,
            app_routes::error::not_found,
            app_routes::error::unprocessable_entity,
            app_routes::error::internal_error
        ],
    )
}

/// Builds the server backed by PostgreSQL. The pool is created (and migrations applied) on
/// ignition.
pub fn build_rocket(config: Config) -> Rocket<Build> {
    init_tracing(&config.logging.level, config.logging.json_format);

    let database = config.database.clone();
    assemble_rocket(config).attach(stage_db(database))
}

/// Builds the server around an already constructed user store.
pub fn build_rocket_with_repository(config: Config, users: SharedUserRepository) -> Rocket<Build> {
    assemble_rocket(config).manage(users)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_paths_are_normalized() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("/"), "/");
        assert_eq!(normalize_base_path("api/"), "/api");
        assert_eq!(normalize_base_path(" /api/v1// "), "/api/v1");
    }

    #[test]
    fn joined_paths_never_double_slash() {
        assert_eq!(join_base_path("/", "docs"), "/docs");
        assert_eq!(join_base_path("/", ""), "/");
        assert_eq!(join_base_path("/", "/users"), "/users");
        assert_eq!(join_base_path("/api", "/users"), "/api/users");
        assert_eq!(join_base_path("/api", ""), "/api");
    }

    #[test]
    fn dev_secret_is_refused_outside_debug() {
        let dev = config::AuthConfig::default();
        assert!(check_jwt_secret(&rocket::Config::DEBUG_PROFILE, &dev).is_ok());
        assert!(check_jwt_secret(&rocket::Config::RELEASE_PROFILE, &dev).is_err());
        assert!(check_jwt_secret(&Profile::new("staging"), &dev).is_err());

        let custom = config::AuthConfig {
            jwt_secret: "a-real-secret".to_string(),
            ..Default::default()
        };
        assert!(check_jwt_secret(&rocket::Config::RELEASE_PROFILE, &custom).is_ok());

        let empty = config::AuthConfig {
            jwt_secret: String::new(),
            ..Default::default()
        };
        assert!(check_jwt_secret(&rocket::Config::DEBUG_PROFILE, &empty).is_err());
    }

    #[test]
    fn unset_profile_follows_build_default() {
        let dev = config::AuthConfig::default();
        let accepted = check_jwt_secret(&rocket::Config::DEFAULT_PROFILE, &dev).is_ok();
        assert_eq!(accepted, cfg!(debug_assertions));
        assert_eq!(cfg!(debug_assertions), rocket::Config::DEFAULT_PROFILE == rocket::Config::DEBUG_PROFILE);
    }

    #[test]
    fn secret_check_reads_rocket_profile() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ROCKET_PROFILE", "release");
            let figment = rocket::Config::figment();
            assert_eq!(*figment.profile(), rocket::Config::RELEASE_PROFILE);
            assert!(check_jwt_secret(figment.profile(), &config::AuthConfig::default()).is_err());
            Ok(())
        });
    }

    #[test]
    #[should_panic(expected = "Invalid CORS configuration")]
    fn wildcard_cors_with_credentials_is_rejected() {
        let cors = config::CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: true,
        };
        build_cors(&cors);
    }
}
