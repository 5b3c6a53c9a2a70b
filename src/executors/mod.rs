/// Swap execution against a Uniswap V4 pool manager.
pub mod pool_manager;
