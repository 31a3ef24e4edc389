use rocket::{Build, Rocket};
use usergate::{Config, build_rocket};

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    dotenvy::dotenv().ok();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => panic!("Invalid configuration: {}", err),
    };

    build_rocket(config)
}
