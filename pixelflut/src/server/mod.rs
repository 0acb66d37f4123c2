mod connection;
mod reactor;

pub use connection::handle_connection;
pub use reactor::{Reactor, N_WORKERS};

use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to bind to listen address {listen_address:?}"))]
    BindToListenAddress {
        source: std::io::Error,
        listen_address: String,
    },

    #[snafu(display("failed to accept new client connection"))]
    AcceptNewClientConnection { source: std::io::Error },

    #[snafu(display("failed to build worker runtime"))]
    BuildWorkerRuntime { source: std::io::Error },
}
