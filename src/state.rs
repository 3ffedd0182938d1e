use crate::{config::CheckoutPolicy, db::OrmConn};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub policy: CheckoutPolicy,
}
