//! Account transaction endpoints

use actix_web::{web, HttpResponse};
use custody_types::{CreateTransactionRequest, WithdrawalRequest};
use serde::Deserialize;

use super::{error_response, transaction_service};
use crate::flow::validate_address;
use crate::templates::transfer_arguments;
use crate::transactions::{self, transaction_details};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/accounts/{address}")
            .route("/transactions", web::get().to(list_transactions))
            .route("/transactions", web::post().to(create_transaction))
            .route("/transactions/{transaction_id}", web::get().to(get_transaction))
            .route(
                "/fungible-tokens/{token}/withdrawals",
                web::post().to(create_withdrawal),
            ),
    );
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    #[serde(default)]
    sync: bool,
}

async fn list_transactions(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListParams>,
) -> HttpResponse {
    let listed = transactions::list_transactions(
        &*state.db,
        state.config.chain_id,
        &path,
        query.limit.unwrap_or(0),
        query.offset.unwrap_or(0),
    );
    match listed {
        Ok(transactions) => HttpResponse::Ok().json(transactions),
        Err(e) => error_response(&e),
    }
}

async fn create_transaction(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CreateParams>,
    body: web::Json<CreateTransactionRequest>,
) -> HttpResponse {
    let service = match transaction_service(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let CreateTransactionRequest { code, arguments } = body.into_inner();

    if query.sync {
        match service.create_sync(&path, code, arguments).await {
            Ok(tx) => HttpResponse::Created().json(tx),
            Err(e) => error_response(&e),
        }
    } else {
        match service.create_async(&path, code, arguments) {
            Ok(job) => HttpResponse::Created().json(job.summary()),
            Err(e) => error_response(&e),
        }
    }
}

async fn get_transaction(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (address, transaction_id) = path.into_inner();

    match transaction_details(&*state.db, state.config.chain_id, &address, &transaction_id) {
        Ok(tx) => HttpResponse::Ok().json(tx),
        Err(e) => error_response(&e),
    }
}

/// Sends `amount` of an enabled token from the account to `recipient`.
async fn create_withdrawal(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<WithdrawalRequest>,
) -> HttpResponse {
    let service = match transaction_service(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let (address, token_name) = path.into_inner();

    let prepared = validate_address(&body.recipient, service.chain()).and_then(|recipient| {
        let token = state.templates.token(&token_name)?;
        let arguments = transfer_arguments(&body.amount, &recipient)?;
        Ok((state.templates.transfer_code(&token), arguments))
    });
    let (code, arguments) = match prepared {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    match service.create_async(&address, code, arguments) {
        Ok(job) => {
            log::info!(
                "[Transactions] Withdrawal of {} {} from {} queued as job {}",
                body.amount,
                token_name,
                address,
                job.id()
            );
            HttpResponse::Created().json(job.summary())
        }
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use crate::test_support::{read_only_state, test_state, MockLedger};
    use actix_web::{test, App};
    use custody_types::{ApiError, JobSummary};
    use uuid::Uuid;

    const ACCOUNT: &str = "0xf8d6e0586b0a20c7";

    #[actix_web::test]
    async fn sync_create_then_list_and_get() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/accounts/{}/transactions?sync=true", ACCOUNT))
            .set_json(serde_json::json!({"code": "transaction {}"}))
            .to_request();
        let created: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["state"], "sealed");
        let id = created["transaction_id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/accounts/{}/transactions?limit=10", ACCOUNT))
            .to_request();
        let listed: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.len(), 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/accounts/{}/transactions/{}", ACCOUNT, id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn async_create_returns_job() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/accounts/{}/transactions", ACCOUNT))
            .set_json(serde_json::json!({"code": "transaction {}", "arguments": []}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let summary: JobSummary = test::read_body_json(resp).await;

        let service = state.transactions.clone().unwrap();
        let job = service
            .pool()
            .job(&Uuid::parse_str(&summary.job_id).unwrap())
            .unwrap();
        assert_eq!(job.wait().await.status, JobStatus::Completed);
    }

    #[actix_web::test]
    async fn errors_use_status_codes() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::get()
            .uri("/api/accounts/0x1654653399040a61/transactions")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: ApiError = test::read_body_json(resp).await;
        assert!(!body.success);

        let req = test::TestRequest::get()
            .uri(&format!("/api/accounts/{}/transactions/{}", ACCOUNT, "cd".repeat(32)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "transaction not found");

        let req = test::TestRequest::get()
            .uri(&format!("/api/accounts/{}/transactions/not-hex", ACCOUNT))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    #[actix_web::test]
    async fn withdrawal_queues_transfer() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/accounts/{}/fungible-tokens/flow-token/withdrawals", ACCOUNT))
            .set_json(serde_json::json!({"recipient": "0x0ae53cb6e3f42a79", "amount": "1.5"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let summary: JobSummary = test::read_body_json(resp).await;

        let service = state.transactions.clone().unwrap();
        let job = service
            .pool()
            .job(&Uuid::parse_str(&summary.job_id).unwrap())
            .unwrap();
        job.wait().await;

        let stored = service.list(ACCOUNT, 10, 0).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].code.contains("import FlowToken from 0x0ae53cb6e3f42a79"));
        assert_eq!(stored[0].arguments[0]["value"], "1.50000000");
        assert_eq!(stored[0].authorizers.len(), 1);
    }

    #[actix_web::test]
    async fn reads_work_without_submission() {
        let (_dir, state) = read_only_state();
        let seeded = crate::test_support::submitted_transaction(0x2a);
        state.db.insert_transaction(&seeded).unwrap();
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/accounts/{}/transactions", ACCOUNT))
            .to_request();
        let listed: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.len(), 1);

        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/accounts/{}/transactions/{}",
                ACCOUNT,
                seeded.transaction_id.unwrap().hex()
            ))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::post()
            .uri(&format!("/api/accounts/{}/transactions", ACCOUNT))
            .set_json(serde_json::json!({"code": "transaction {}"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 503);
    }

    #[actix_web::test]
    async fn withdrawal_of_disabled_token_is_rejected() {
        let (_dir, state) = test_state(MockLedger::new());
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/accounts/{}/fungible-tokens/ExampleToken/withdrawals", ACCOUNT))
            .set_json(serde_json::json!({"recipient": "0x0ae53cb6e3f42a79", "amount": "1"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
