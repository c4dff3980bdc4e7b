use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, error};

use super::models::{ErrorResponse, SubmitResponse};
use crate::blockchain::{Block, ChainService};

/// Every accepted block, as a JSON array.
#[get("/blocks")]
pub async fn get_blocks(chain: web::Data<ChainService>) -> impl Responder {
    // the log grows with the chain, keep reading it off the async workers
    let chain = chain.into_inner();
    match web::block(move || chain.block_log()).await {
        Ok(Ok(body)) => HttpResponse::Ok()
            .content_type(ContentType::json())
            .body(body),
        Ok(Err(e)) => {
            error!("GET /blocks - could not read block log: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
        Err(e) => {
            error!("GET /blocks - worker failed: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

/// The current chain head.
#[get("/blocks/newest")]
pub async fn get_newest(chain: web::Data<ChainService>) -> impl Responder {
    pretty_json(&chain.head())
}

/// The current target as plain text.
#[get("/difficulty")]
pub async fn get_difficulty(chain: web::Data<ChainService>) -> impl Responder {
    match chain.published_target() {
        Ok(text) => {
            debug!("GET /difficulty - sending {text}");
            HttpResponse::Ok()
                .content_type(ContentType::plaintext())
                .body(text)
        }
        Err(e) => {
            error!("GET /difficulty - {e}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

/// Submit a mined block. Malformed or oversized bodies never reach this
/// handler; see the `JsonConfig` in [`super::init_routes`].
#[post("/blocks/new")]
pub async fn post_block(chain: web::Data<ChainService>, block: web::Json<Block>) -> impl Responder {
    let block = block.into_inner();
    debug!(
        "POST /blocks/new - block #{} from {} (hash={})",
        block.index, block.solver, block.hash
    );

    // validation, apply and fsync happen under the ledger lock
    let chain = chain.into_inner();
    let outcome = web::block(move || chain.submit_block(block)).await;

    match outcome {
        Ok(Ok(())) => HttpResponse::Created().json(SubmitResponse::accepted()),
        Ok(Err(reason)) => HttpResponse::BadRequest().json(SubmitResponse::rejected(reason)),
        Err(e) => {
            error!("POST /blocks/new - worker failed: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

pub(crate) fn pretty_json<T: serde::Serialize>(value: &T) -> HttpResponse {
    match serde_json::to_string_pretty(value) {
        Ok(body) => HttpResponse::Ok()
            .content_type(ContentType::json())
            .body(body),
        Err(e) => HttpResponse::InternalServerError().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}
