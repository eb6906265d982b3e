pub mod network;
pub mod snapshot;
pub mod spec;

pub use network::Network;
pub use snapshot::NetworkSnapshot;
pub use spec::NetworkSpec;
