// qtscaffold CLI entry point

use qtscaffold_cli::{output, router::CommandRouter};

fn main() {
    if let Err(e) = CommandRouter::route() {
        output::print_error(&e.user_message());
        tracing::debug!(details = %e.technical_details(), "command failed");
        std::process::exit(1);
    }
}
