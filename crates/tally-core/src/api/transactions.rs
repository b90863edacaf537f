//! Transaction service endpoints

use tally_http::ApiRequest;

use crate::client::{ApiClient, ApiResult};
use crate::models::{
    Contractor, NewTransaction, Status, StatusUpdate, SystemAccount, Transaction,
    TransactionQuery,
};

pub const TRANSACTIONS_PATH: &str = "/transactions";

#[derive(Clone)]
pub struct TransactionsApi {
    client: ApiClient,
}

impl TransactionsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &TransactionQuery) -> ApiResult<Vec<Transaction>> {
        let request = query
            .to_pairs()
            .into_iter()
            .fold(ApiRequest::get(TRANSACTIONS_PATH), |req, (k, v)| {
                req.query(k, v)
            });

        self.client.send_json(request).await
    }

    pub async fn get(&self, id: i64) -> ApiResult<Transaction> {
        self.client
            .get_json(&format!("{TRANSACTIONS_PATH}/{id}"))
            .await
    }

    pub async fn create(&self, transaction: &NewTransaction) -> ApiResult<Transaction> {
        self.client.post_json(TRANSACTIONS_PATH, transaction).await
    }

    pub async fn update_status(&self, id: i64, status_id: i64) -> ApiResult<Transaction> {
        self.client
            .put_json(
                &format!("{TRANSACTIONS_PATH}/{id}/status"),
                &StatusUpdate { status_id },
            )
            .await
    }

    pub async fn contractors(&self) -> ApiResult<Vec<Contractor>> {
        self.client
            .get_json(&format!("{TRANSACTIONS_PATH}/contractors"))
            .await
    }

    pub async fn statuses(&self) -> ApiResult<Vec<Status>> {
        self.client
            .get_json(&format!("{TRANSACTIONS_PATH}/statuses"))
            .await
    }

    pub async fn accounts(&self) -> ApiResult<Vec<SystemAccount>> {
        self.client
            .get_json(&format!("{TRANSACTIONS_PATH}/accounts"))
            .await
    }
}
