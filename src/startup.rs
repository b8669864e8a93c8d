use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, middleware::Logger, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;

use crate::auth::SessionManager;
use crate::configuration::AuthSettings;
use crate::error::{AppError, ValidationError};
use crate::middleware::{Authenticator, LoggerMiddleware};
use crate::routes::{
    change_password, get_current_user, health_check, login, logout, refresh_access_token,
    register, update_account_details,
};

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(ValidationError::Rejected(format!("Invalid request body: {}", err))).into()
}

pub fn run(
    listener: TcpListener,
    sessions: SessionManager,
    auth_settings: AuthSettings,
) -> Result<Server, std::io::Error> {
    let sessions_data = web::Data::new(sessions.clone());
    let auth_settings_data = web::Data::new(auth_settings);

    let server = HttpServer::new(move || {
        let authenticator = Authenticator::new(sessions.clone());

        App::new()
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(sessions_data.clone())
            .app_data(auth_settings_data.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1/users")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh-token", web::post().to(refresh_access_token))
                    // Protected routes
                    .service(
                        web::resource("/logout")
                            .route(web::post().to(logout))
                            .wrap(authenticator.clone()),
                    )
                    .service(
                        web::resource("/change-password")
                            .route(web::post().to(change_password))
                            .wrap(authenticator.clone()),
                    )
                    .service(
                        web::resource("/current-user")
                            .route(web::get().to(get_current_user))
                            .wrap(authenticator.clone()),
                    )
                    .service(
                        web::resource("/update-account")
                            .route(web::patch().to(update_account_details))
                            .wrap(authenticator),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
