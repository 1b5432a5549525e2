use exception_view::{ExceptionDecoder, LogDomain};

use crate::cmd::SnapshotOptions;
use crate::util::print_rows;
use crate::Config;

/// Print the UART log buffer kept in target RAM
#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: SnapshotOptions,

    /// Read the buffer of the non-secure image instead of the secure one
    #[clap(long)]
    non_secure: bool,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let domain = if self.non_secure {
            LogDomain::NonSecure
        } else {
            LogDomain::Secure
        };
        tracing::info!("Reading {}", domain.view_name());

        let host = self.shared.load_host()?;
        let mut decoder = ExceptionDecoder::new(host, self.shared.layout(config));
        let lines = decoder.logs(domain);

        print_rows(&lines, self.shared.json, |line| line.msg.as_str())
    }
}
