use crate::{
    db::{DbPool, OrmConn},
    mailer::Mailer,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub mailer: Option<Mailer>,
}
