// Exchange REST clients
pub mod coincheck;

pub use coincheck::{CoincheckClient, Credentials};
