//! Job status endpoints

use actix_web::{web, HttpResponse};
use custody_types::ApiError;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;

const DEFAULT_JOB_LIST_LIMIT: usize = 100;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/jobs")
            .route("", web::get().to(list_jobs))
            .route("/{job_id}", web::get().to(get_job)),
    );
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<usize>,
}

async fn list_jobs(state: web::Data<AppState>, query: web::Query<ListParams>) -> HttpResponse {
    let limit = query.limit.unwrap_or(DEFAULT_JOB_LIST_LIMIT);
    HttpResponse::Ok().json(state.jobs.list_recent(limit))
}

async fn get_job(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let job_id = match Uuid::parse_str(&path) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().json(ApiError::new("not a valid job id")),
    };

    match state.jobs.job(&job_id) {
        Some(job) => HttpResponse::Ok().json(job.summary()),
        None => HttpResponse::NotFound().json(ApiError::new("job not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use crate::test_support::{test_state, MockLedger};
    use actix_web::{test, App};
    use custody_types::JobSummary;

    #[actix_web::test]
    async fn finished_job_is_reported() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let service = state.transactions.clone().unwrap();
        let job = service
            .create_async("0xf8d6e0586b0a20c7", "transaction {}".into(), vec![])
            .unwrap();
        job.wait().await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/jobs/{}", job.id()))
            .to_request();
        let summary: JobSummary = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.result, job.result());

        let req = test::TestRequest::get().uri("/api/jobs?limit=5").to_request();
        let listed: Vec<JobSummary> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.len(), 1);
    }

    #[actix_web::test]
    async fn unknown_and_malformed_ids() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/jobs/{}", Uuid::new_v4()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::get().uri("/api/jobs/42").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
