use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};

use crate::domain::OriginPolicy;
use crate::email::EmailDispatcher;
use crate::routes;
use tracing_actix_web::TracingLogger;

pub fn run(
    listener: TcpListener,
    origin_policy: OriginPolicy,
    dispatcher: EmailDispatcher,
) -> Result<Server, std::io::Error> {
    let origin_policy = web::Data::new(origin_policy);
    let dispatcher = web::Data::new(dispatcher);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health", web::get().to(routes::health_check::health_check))
            // No method guard: the handler answers preflights and stray
            // verbs itself.
            .route("/booking-email", web::route().to(routes::booking::booking_email))
            .app_data(origin_policy.clone())
            .app_data(dispatcher.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
