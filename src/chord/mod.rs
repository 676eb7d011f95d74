pub mod actor;
pub mod membership;
pub mod peer;
pub mod ring;
pub mod routing;
pub mod service;
pub mod types;


// Ring configuration
pub const KEYSPACE_BITS: usize = 32;
pub const DEFAULT_RPC_PORT: u16 = 12345;
pub const DEFAULT_MAX_HOPS: usize = 256;
