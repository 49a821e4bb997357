use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "mybridge")]
#[command(about = "mybridge - browser-facing MySQL administration relay\nOne live MySQL connection per client session, driven by named JSON events", long_about = None)]
pub struct Config {
    #[arg(short, long, default_value = "4000", env = "MYBRIDGE_PORT")]
    pub port: u16,

    #[arg(long, default_value = "0.0.0.0", env = "MYBRIDGE_BIND", help = "Address to bind the TCP listener to")]
    pub bind: String,

    #[arg(long, default_value = "info", env = "MYBRIDGE_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, default_value = "100", env = "MYBRIDGE_MAX_SESSIONS", help = "Maximum number of concurrently connected sessions")]
    pub max_sessions: usize,

    #[arg(long, default_value = "60", env = "MYBRIDGE_CONNECT_TIMEOUT", help = "MySQL connect timeout in seconds")]
    pub connect_timeout: u64,

    #[arg(long, default_value = "4194304", env = "MYBRIDGE_MAX_FRAME_BYTES", help = "Maximum inbound event frame size in bytes")]
    pub max_frame_bytes: usize,
}

impl Config {
    /// Get a configuration instance with all values resolved from CLI args and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    /// Get the MySQL connect timeout as Duration
    pub fn connect_timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout)
    }
}
