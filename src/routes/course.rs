use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;

use crate::errors::CourseError;
use crate::models::preference::TravelPreference;
use crate::services::course_generation_service::CourseGenerator;

/*
    POST /generate_course
*/
pub async fn generate_course(
    generator: web::Data<Arc<CourseGenerator>>,
    input: web::Json<TravelPreference>,
) -> impl Responder {
    let preference = input.into_inner();
    info!(
        "Course requested for {} {:?} ({} ~ {})",
        preference.region, preference.areas, preference.start_date, preference.end_date
    );

    match generator.generate(&preference).await {
        Ok(course) => HttpResponse::Ok().json(course),
        Err(err) => {
            warn!("Course generation failed: {}", err);
            error_response(&err)
        }
    }
}

pub fn error_response(err: &CourseError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(json!({ "error": err.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let resp = error_response(&CourseError::InvalidInput("bad".to_string()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = error_response(&CourseError::NoCandidates {
            region: "서울".to_string(),
            areas: vec!["종로구".to_string()],
        });
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = error_response(&CourseError::GenerationFailed("empty".to_string()));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
