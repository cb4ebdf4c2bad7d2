use actix_web::{web, HttpResponse, Responder};

use super::error_response;
use crate::error::WalletError;
use crate::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/listener/status").route(web::get().to(listener_status)));
}

async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let jobs = serde_json::json!({
        "workers": state.jobs.worker_count(),
        "capacity": state.jobs.capacity(),
    });

    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": VERSION,
        "chain_id": state.config.chain_id,
        "transactions_enabled": state.transactions.is_some(),
        "jobs": jobs
    }))
}

async fn listener_status(state: web::Data<AppState>) -> HttpResponse {
    match state.status_db.listener_status() {
        Ok(Some(status)) => HttpResponse::Ok().json(status),
        Ok(None) => HttpResponse::Ok().json(serde_json::json!({
            "latest_height": null,
            "version": 0
        })),
        Err(e) => error_response(&WalletError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state, MockLedger};
    use actix_web::{test, App};

    #[actix_web::test]
    async fn health_reports_chain_and_pool() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["chain_id"], "flow-emulator");
        assert_eq!(body["jobs"]["workers"], 2);
    }

    #[actix_web::test]
    async fn listener_status_before_and_after_first_update() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/listener/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["latest_height"].is_null());

        state
            .status_db
            .with_exclusive_status(|s| {
                s.latest_height = 77;
                Ok(())
            })
            .unwrap();

        let req = test::TestRequest::get().uri("/api/listener/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["latest_height"], 77);
        assert_eq!(body["version"], 1);
    }
}
