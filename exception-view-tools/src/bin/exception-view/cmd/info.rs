use exception_view::ExceptionDecoder;

use crate::cmd::SnapshotOptions;
use crate::util::print_rows;
use crate::Config;

/// Decode the pending exception and describe its cause
#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: SnapshotOptions,

    /// Do not list the captured registers below the description
    #[clap(long)]
    no_registers: bool,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let host = self.shared.load_host()?;
        let show_registers = config.show_registers && !self.no_registers;

        let mut decoder =
            ExceptionDecoder::new(host, self.shared.layout(config)).show_registers(show_registers);
        let rows = decoder.exception_info();

        print_rows(&rows, self.shared.json, |row| row.exception_info.as_str())
    }
}
