pub mod client;
pub mod dto;
pub mod normalize;
pub mod search;

pub use client::{prepare_usernames, split_usernames, LookupGateway, MemoryLolClient};
pub use dto::{AccountRecord, DateSpan, RawLookup, ScreenNameEntry, UserLookupResult};
pub use normalize::{normalize, not_found};
pub use search::{search, SearchReport};
