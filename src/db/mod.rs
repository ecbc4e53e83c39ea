pub mod postgres;

pub use postgres::PostgresTradeJournal;
