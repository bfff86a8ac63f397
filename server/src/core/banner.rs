//! Startup banner

use super::config::AppConfig;
use super::constants::APP_NAME_LOWER;

/// Check if host binds to all interfaces
fn is_all_interfaces(host: &str) -> bool {
    host == "0.0.0.0" || host == "::"
}

/// Print the startup banner with listening endpoints
pub fn print_banner(config: &AppConfig) {
    let host = config.server.host.as_str();
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };

    const W: usize = 14;

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME_LOWER,
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!(
        "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}:{} \x1b[90m(receiver {})\x1b[0m",
        "OTLP gRPC:", display_host, config.receiver.grpc_port, config.receiver.name
    );
    if let Some(port) = config.observability.metrics_port {
        println!(
            "  \x1b[35m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m http://{}:{}/metrics",
            "Metrics:", display_host, port
        );
    }
    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    }
    println!();
}
