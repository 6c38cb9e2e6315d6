//! Storage backends for QuranLens.
//!
//! Both backends implement [`QuranStore`](quranlens_core::QuranStore) and
//! [`RequestStore`](quranlens_core::RequestStore). Text queries arrive
//! already normalized (see [`quranlens_core::arabic::normalize`]).

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
