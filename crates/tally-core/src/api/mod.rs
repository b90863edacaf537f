//! Typed endpoint wrappers over [`crate::ApiClient`]

mod auth;
mod transactions;

pub use auth::{AuthApi, DELETE_ACCOUNT_PATH, LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
pub use transactions::{TransactionsApi, TRANSACTIONS_PATH};
