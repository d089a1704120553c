use booking_relay::configuration::get_configuration;
use booking_relay::domain::OriginPolicy;
use booking_relay::startup::run;
use booking_relay::telemetry::{get_subscriber, init_subscriber};
use std::net::TcpListener;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(
        "booking-relay".into(),
        "info".into(),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    let config = get_configuration()
        .expect("Failed to read config file");
    let address = format!(
        "{address}:{port}",
        address = config.application.host,
        port = config.application.port
    );
    let listener = TcpListener::bind(address)?;
    let origin_policy = OriginPolicy::new(config.application.allowed_origins.clone());
    let dispatcher = config.email.dispatcher()
        .expect("Failed to build the email backend from config");

    run(listener, origin_policy, dispatcher)?.await
}
