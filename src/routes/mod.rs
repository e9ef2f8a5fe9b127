use actix_web::web;

pub mod course;
pub mod health;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/generate_course", web::post().to(course::generate_course));
}
