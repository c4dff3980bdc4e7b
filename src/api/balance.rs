use actix_web::{Responder, get, web};

use super::chain::pretty_json;
use crate::blockchain::ChainService;

/// Every balance, in display units.
#[get("/balances")]
pub async fn get_balances(chain: web::Data<ChainService>) -> impl Responder {
    pretty_json(&chain.display_balances())
}
