pub mod client;
pub mod rate_limit;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::BinanceClient;
pub use rate_limit::WeightSnapshot;
