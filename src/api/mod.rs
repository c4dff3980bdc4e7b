mod balance;
mod chain;
pub mod models;

use actix_web::HttpResponse;
use actix_web::error::InternalError;
use actix_web::web::{self, ServiceConfig};
use log::warn;

use models::SubmitResponse;

/// Largest accepted `POST /blocks/new` body.
pub const MAX_BODY_BYTES: usize = 1_000_000;

pub fn init_routes(cfg: &mut ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .content_type_required(false)
        .error_handler(|err, _req| {
            warn!("POST /blocks/new - undecodable body: {err}");
            let response = HttpResponse::BadRequest().json(SubmitResponse {
                accepted: false,
                message: format!(
                    "Bad request. The block could not be decoded (bodies over {MAX_BODY_BYTES} bytes are refused): {err}"
                ),
            });
            InternalError::from_response(err, response).into()
        });

    cfg.app_data(json_config)
        .service(chain::get_blocks)
        .service(chain::get_newest)
        .service(chain::post_block)
        .service(chain::get_difficulty)
        .service(balance::get_balances);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Block, ChainService, REWARD};
    use crate::storage::FileStore;
    use crate::transaction::Transaction;
    use actix_web::http::StatusCode;
    use actix_web::http::header::ContentType;
    use actix_web::{App, test};
    use primitive_types::U256;
    use std::collections::HashMap;

    fn chain(dir: &tempfile::TempDir, target: U256) -> web::Data<ChainService> {
        let store = FileStore::open(dir.path()).unwrap();
        web::Data::new(ChainService::open(store, target).unwrap())
    }

    fn successor(head: &Block, solver: &str) -> Block {
        let mut b = Block::next(head, 5, "hi".into(), solver.into(), Transaction::none());
        b.solution = "0".into();
        b.hash = b.compute_hash();
        b
    }

    #[actix_web::test]
    async fn newest_block_starts_at_genesis() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(chain(&dir, U256::MAX))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/blocks/newest").to_request();
        let head: Block = test::call_and_read_body_json(&app, req).await;
        assert_eq!(head, Block::genesis());
    }

    #[actix_web::test]
    async fn difficulty_is_plain_decimal_text() {
        let dir = tempfile::tempdir().unwrap();
        let target = crate::blockchain::target::parse_hex_target(
            crate::blockchain::target::DEFAULT_TARGET_HEX,
        )
        .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(chain(&dir, target))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/difficulty").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.bytes().all(|c| c.is_ascii_digit()));
        assert_eq!(
            crate::blockchain::target::parse_published_target(text).unwrap(),
            target
        );
    }

    #[actix_web::test]
    async fn accepted_block_updates_head_balances_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let data = chain(&dir, U256::MAX);
        let app = test::init_service(App::new().app_data(data.clone()).configure(init_routes)).await;

        let block = successor(&Block::genesis(), "miner");
        let req = test::TestRequest::post()
            .uri("/blocks/new")
            .set_json(&block)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: SubmitResponse = test::read_body_json(resp).await;
        assert!(body.accepted);

        let req = test::TestRequest::get().uri("/balances").to_request();
        let balances: HashMap<String, f64> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(balances["miner"], REWARD as f64 / 1_000_000.0);

        let req = test::TestRequest::get().uri("/blocks").to_request();
        let blocks: Vec<Block> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], block);
        assert_eq!(data.head(), block);
    }

    #[actix_web::test]
    async fn rejected_block_reports_the_reason() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(chain(&dir, U256::MAX))
                .configure(init_routes),
        )
        .await;

        let mut block = successor(&Block::genesis(), "miner");
        block.index = 5;
        block.hash = block.compute_hash();
        let req = test::TestRequest::post()
            .uri("/blocks/new")
            .set_json(&block)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: SubmitResponse = test::read_body_json(resp).await;
        assert!(!body.accepted);
        assert_eq!(body.message, "Invalid block. Index should be 1");
    }

    #[actix_web::test]
    async fn malformed_and_oversized_bodies_are_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let data = chain(&dir, U256::MAX);
        let app = test::init_service(App::new().app_data(data.clone()).configure(init_routes)).await;

        let req = test::TestRequest::post()
            .uri("/blocks/new")
            .insert_header(ContentType::json())
            .set_payload("{\"index\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut huge = successor(&Block::genesis(), "miner");
        huge.data = "x".repeat(MAX_BODY_BYTES);
        let req = test::TestRequest::post()
            .uri("/blocks/new")
            .set_json(&huge)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: SubmitResponse = test::read_body_json(resp).await;
        assert!(!body.accepted);

        assert_eq!(data.head(), Block::genesis());
    }
}
