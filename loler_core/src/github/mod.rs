pub mod client;
pub mod dto;

pub use client::{classify_token_response, DeviceFlowGateway, GithubDeviceClient};
pub use dto::{DeviceAuthSession, TokenGrant};
