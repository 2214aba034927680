/// First port of platform 0's block
pub const BASE_PORT: u16 = 15000;
/// Ports reserved per platform number
pub const PORTS_PER_PLATFORM: u16 = 10;
/// Highest platform number whose block still fits below 65535
pub const MAX_PLATFORM: u16 = 1000;
/// Connection attempts before a push/sub socket gives up
pub const DEFAULT_CONNECT_RETRIES: u32 = 50;
/// Pause between connection attempts (milliseconds)
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 100;
/// Topic graph updates are published under
pub const GRAPH_TOPIC: &str = "graph";
/// Default manager host
pub const DEFAULT_HOST: &str = "localhost";
