//! Concrete ports for the deedshare wallet core: the EIP-1193 transport
//! adapter (simulated and HTTP-proxy modes), the system clock, and the
//! static deployment configuration.

pub mod clock;
pub mod config;
pub mod eip1193;
pub mod sim;

pub use clock::SystemClockAdapter;
pub use config::{fuji_deployment, AdapterConfig};
pub use eip1193::Eip1193Adapter;
pub use sim::{SimulatedChain, SimulatedWallet};
