mod cli;
mod codec;
mod errors;
mod parsers;
mod processor;
mod protocol;
mod resolver;
mod response_builder;
mod server;

use std::sync::Arc;

use anyhow::Context;
use cli::TableSource;
use resolver::{NameTable, Resolver};
use server::DnsServer;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse_args();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Refuse to start without a complete name table
    let table = match args.table_source() {
        TableSource::Json(path) => NameTable::from_json_file(&path, args.ttl)
            .with_context(|| format!("loading JSON name table {}", path.display()))?,
        TableSource::Hosts(path) => NameTable::from_hosts_file(&path, args.ttl)
            .with_context(|| format!("loading hosts file {}", path.display()))?,
    };
    info!(names = table.len(), ttl = table.ttl(), "Name table ready");
    let resolver: Arc<dyn Resolver> = Arc::new(table);

    let listen_addr = args.listen_addr();
    let server = DnsServer::bind(listen_addr, resolver, args.decode_mode())
        .await
        .with_context(|| format!("binding UDP socket on {}", listen_addr))?;

    info!(mode = ?args.decode_mode(), "Serving names");
    server.run().await;

    Ok(())
}
