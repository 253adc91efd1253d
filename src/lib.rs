pub mod aggregator;
pub mod executor;
pub mod gateway;
pub mod models;
pub mod priofee;
pub mod relay;
pub mod retry;
pub mod tx_builder;

#[cfg(test)]
pub(crate) mod test_support;
